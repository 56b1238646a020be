//! Credit ledger: the only place balances are read from or written to storage.
//!
//! Guests keep their balance in the local key-value store. Authenticated
//! users keep it in a remote profile record. Reads fail soft; remote writes
//! are detached tasks whose outcome is logged and can be awaited, but which
//! nothing in the workflow waits for. Remote writes reach the profile store
//! in commit order, so the last committed balance is the one that sticks.

use std::sync::{Arc, Mutex, PoisonError};

use omni_logging::{omni_debug, omni_error, omni_info, omni_warn};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

use omni_core::{CreditBalance, CreditPolicy, Identity};

use crate::profile::{MemoryProfileStore, ProfileStore};
use crate::store::KeyValueStore;

/// Local storage key holding the guest balance.
pub const BALANCE_KEY: &str = "omni_credits";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommitOutcome {
    Persisted,
    Failed(String),
    /// The background task panicked or was cancelled with its runtime.
    Aborted(String),
}

#[derive(Debug)]
enum CommitState {
    Ready(CommitOutcome),
    Pending(JoinHandle<CommitOutcome>),
}

/// Observable result of one balance commit. Dropping it detaches the write.
#[derive(Debug)]
pub struct CommitHandle {
    state: CommitState,
}

impl CommitHandle {
    fn ready(outcome: CommitOutcome) -> Self {
        Self {
            state: CommitState::Ready(outcome),
        }
    }

    fn pending(task: JoinHandle<CommitOutcome>) -> Self {
        Self {
            state: CommitState::Pending(task),
        }
    }

    pub fn is_finished(&self) -> bool {
        match &self.state {
            CommitState::Ready(_) => true,
            CommitState::Pending(task) => task.is_finished(),
        }
    }

    pub async fn outcome(self) -> CommitOutcome {
        match self.state {
            CommitState::Ready(outcome) => outcome,
            CommitState::Pending(task) => task
                .await
                .unwrap_or_else(|err| CommitOutcome::Aborted(err.to_string())),
        }
    }
}

pub struct CreditLedger {
    local: Arc<dyn KeyValueStore>,
    profiles: Arc<dyn ProfileStore>,
    policy: CreditPolicy,
    /// Closes when the most recently committed remote write has finished.
    last_remote_write: Mutex<Option<oneshot::Receiver<()>>>,
}

impl CreditLedger {
    pub fn new(
        local: Arc<dyn KeyValueStore>,
        profiles: Arc<dyn ProfileStore>,
        policy: CreditPolicy,
    ) -> Self {
        Self {
            local,
            profiles,
            policy,
            last_remote_write: Mutex::new(None),
        }
    }

    /// Ledger without a remote profile service; every identity read fails soft.
    pub fn guest_only(local: Arc<dyn KeyValueStore>, policy: CreditPolicy) -> Self {
        Self::new(local, Arc::new(MemoryProfileStore::new()), policy)
    }

    pub fn policy(&self) -> &CreditPolicy {
        &self.policy
    }

    /// Reads the balance for `identity`, or the guest balance for `None`.
    ///
    /// Returns `None` only when a remote fetch fails; the caller keeps its
    /// current balance in that case.
    pub async fn read(&self, identity: Option<&Identity>) -> Option<CreditBalance> {
        match identity {
            None => Some(self.read_guest()),
            Some(identity) => match self.profiles.fetch_balance(identity).await {
                Ok(balance) => {
                    omni_info!("Loaded balance {} for {}", balance, identity);
                    Some(balance)
                }
                Err(err) => {
                    omni_warn!("Balance fetch for {} failed: {}", identity, err);
                    None
                }
            },
        }
    }

    fn read_guest(&self) -> CreditBalance {
        let initial = self.policy.initial_balance();
        match self.local.get(BALANCE_KEY) {
            Ok(Some(raw)) => match raw.trim().parse::<u64>() {
                Ok(credits) => {
                    omni_debug!("Loaded guest balance {}", credits);
                    CreditBalance::new(credits)
                }
                Err(err) => {
                    omni_warn!(
                        "Stored guest balance {:?} is unparsable ({}); using {}",
                        raw,
                        err,
                        initial
                    );
                    initial
                }
            },
            Ok(None) => {
                omni_debug!("No stored guest balance; using {}", initial);
                initial
            }
            Err(err) => {
                omni_warn!("Failed to read guest balance: {}; using {}", err, initial);
                initial
            }
        }
    }

    /// Writes `balance` back to where `identity`'s balance lives.
    ///
    /// Guest writes happen before this returns. Remote writes run on a
    /// detached task; the returned handle reports how it went.
    pub fn commit(&self, identity: Option<&Identity>, balance: CreditBalance) -> CommitHandle {
        match identity {
            None => {
                let outcome = match self.local.set(BALANCE_KEY, &balance.to_string()) {
                    Ok(()) => {
                        omni_debug!("Persisted guest balance {}", balance);
                        CommitOutcome::Persisted
                    }
                    Err(err) => {
                        omni_error!("Failed to persist guest balance {}: {}", balance, err);
                        CommitOutcome::Failed(err.to_string())
                    }
                };
                CommitHandle::ready(outcome)
            }
            Some(identity) => {
                let profiles = Arc::clone(&self.profiles);
                let identity = identity.clone();
                let (finished, finished_rx) = oneshot::channel::<()>();
                let previous = self
                    .last_remote_write
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .replace(finished_rx);
                let task = tokio::spawn(async move {
                    if let Some(previous) = previous {
                        // Errors once the earlier task is gone, whatever its outcome.
                        let _ = previous.await;
                    }
                    let outcome = match profiles.update_balance(&identity, balance).await {
                        Ok(()) => {
                            omni_info!("Synced balance {} for {}", balance, identity);
                            CommitOutcome::Persisted
                        }
                        Err(err) => {
                            omni_error!(
                                "Balance sync for {} failed ({}); remote copy is stale",
                                identity,
                                err
                            );
                            CommitOutcome::Failed(err.to_string())
                        }
                    };
                    drop(finished);
                    outcome
                });
                CommitHandle::pending(task)
            }
        }
    }
}
