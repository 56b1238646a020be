//! Async driver for the workflow state machine.
//!
//! The orchestrator owns the [`AppState`], feeds it messages through the pure
//! [`update`] function and executes the returned effects against the credit
//! ledger and the unit converter. Everything runs on the caller's task:
//! files are converted one after another and progress is applied as it
//! arrives.

use std::sync::Arc;

use omni_logging::{omni_debug, omni_info, omni_warn};
use tokio::sync::watch;

use omni_core::{
    update, AppState, AppViewModel, BatchId, ConversionRequest, Effect, FileEntry, Identity, Msg,
    WorkflowState,
};

use crate::batch::convert_with_progress;
use crate::converter::UnitConverter;
use crate::identity::IdentityProvider;
use crate::ledger::{CommitHandle, CreditLedger};

pub struct Orchestrator {
    state: AppState,
    ledger: CreditLedger,
    converter: Arc<dyn UnitConverter>,
    identity_provider: Option<Arc<dyn IdentityProvider>>,
    identity_rx: Option<watch::Receiver<Option<Identity>>>,
    view_tx: watch::Sender<AppViewModel>,
    pending_commit: Option<CommitHandle>,
}

impl Orchestrator {
    pub fn new(ledger: CreditLedger, converter: Arc<dyn UnitConverter>) -> Self {
        let state = AppState::with_policy(*ledger.policy());
        let (view_tx, _view_rx) = watch::channel(state.view());
        Self {
            state,
            ledger,
            converter,
            identity_provider: None,
            identity_rx: None,
            view_tx,
            pending_commit: None,
        }
    }

    pub fn with_identity_provider(mut self, provider: Arc<dyn IdentityProvider>) -> Self {
        self.identity_rx = Some(provider.subscribe());
        self.identity_provider = Some(provider);
        self
    }

    /// Starts the session: reads the balance for the current identity once.
    pub async fn start(&mut self) {
        let identity = match self.identity_rx.as_mut() {
            Some(rx) => rx.borrow_and_update().clone(),
            None => None,
        };
        omni_info!(
            "Session started as {}",
            identity.as_ref().map_or("guest", Identity::as_str)
        );
        self.dispatch(Msg::SessionStarted { identity }).await;
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    pub fn view(&self) -> AppViewModel {
        self.state.view()
    }

    /// Receiver that sees a fresh view model after every state change.
    pub fn subscribe(&self) -> watch::Receiver<AppViewModel> {
        self.view_tx.subscribe()
    }

    pub async fn capture_files(&mut self, files: Vec<FileEntry>) -> WorkflowState {
        self.dispatch(Msg::FilesCaptured(files)).await;
        self.state.workflow()
    }

    pub async fn cancel_selection(&mut self) -> WorkflowState {
        self.dispatch(Msg::SelectionCancelled).await;
        self.state.workflow()
    }

    /// Confirms `request` for the pending batch and runs it to the end.
    ///
    /// Returns `SelectionPending` when the balance does not cover the batch,
    /// otherwise `Complete` or `Error`.
    pub async fn confirm(&mut self, request: ConversionRequest) -> WorkflowState {
        self.dispatch(Msg::ConversionConfirmed(request)).await;
        self.state.workflow()
    }

    pub async fn reset(&mut self) -> WorkflowState {
        self.dispatch(Msg::ResetClicked).await;
        self.state.workflow()
    }

    /// Applies the latest identity change, if any. Returns whether one was seen.
    pub async fn sync_identity(&mut self) -> bool {
        let Some(rx) = self.identity_rx.as_mut() else {
            return false;
        };
        if !rx.has_changed().unwrap_or(false) {
            return false;
        }
        let next = rx.borrow_and_update().clone();
        omni_info!(
            "Identity changed to {}",
            next.as_ref().map_or("guest", Identity::as_str)
        );
        self.dispatch(Msg::IdentityChanged(next)).await;
        true
    }

    pub async fn sign_out(&mut self) {
        if let Some(provider) = self.identity_provider.clone() {
            provider.sign_out().await;
            self.sync_identity().await;
        }
    }

    /// Handle for the most recent balance commit, if it has not been taken.
    pub fn take_pending_commit(&mut self) -> Option<CommitHandle> {
        self.pending_commit.take()
    }

    /// Applies `msg` and executes every effect it leads to.
    pub async fn dispatch(&mut self, msg: Msg) {
        let mut pending = self.apply(msg);
        while !pending.is_empty() {
            let mut next = Vec::new();
            for effect in pending {
                next.extend(self.execute(effect).await);
            }
            pending = next;
        }
    }

    fn apply(&mut self, msg: Msg) -> Vec<Effect> {
        let state = std::mem::take(&mut self.state);
        let (mut state, effects) = update(state, msg);
        if state.consume_dirty() {
            self.view_tx.send_replace(state.view());
        }
        self.state = state;
        effects
    }

    async fn execute(&mut self, effect: Effect) -> Vec<Effect> {
        match effect {
            Effect::LoadBalance { identity } => {
                let loaded = self.ledger.read(identity.as_ref()).await;
                match loaded {
                    Some(balance) => self.apply(Msg::BalanceLoaded { identity, balance }),
                    None => Vec::new(),
                }
            }
            Effect::RunBatch {
                batch_id,
                files,
                request,
            } => self.run_batch(batch_id, &files, request).await,
            Effect::CommitBalance { identity, balance } => {
                let handle = self.ledger.commit(identity.as_ref(), balance);
                // A previous handle that was never taken is detached here.
                self.pending_commit = Some(handle);
                Vec::new()
            }
        }
    }

    async fn run_batch(
        &mut self,
        batch_id: BatchId,
        files: &[FileEntry],
        request: ConversionRequest,
    ) -> Vec<Effect> {
        omni_info!(
            "Batch {} started: {} file(s) to {}",
            batch_id,
            files.len(),
            request.target()
        );
        let converter = Arc::clone(&self.converter);
        let mut follow_up = Vec::new();

        for (index, file) in files.iter().enumerate() {
            omni_debug!("Batch {} converting {} ({} bytes)", batch_id, file.name(), file.size());
            let result = convert_with_progress(converter.as_ref(), file, &request, |progress| {
                follow_up.extend(self.apply(Msg::FileProgress {
                    batch_id,
                    index,
                    progress,
                }));
            })
            .await;

            match result {
                Ok(artifact) => {
                    follow_up.extend(self.apply(Msg::FileConverted {
                        batch_id,
                        index,
                        artifact,
                    }));
                }
                Err(err) => {
                    omni_warn!(
                        "Batch {} failed on file {} ({}): {}",
                        batch_id,
                        index + 1,
                        file.name(),
                        err
                    );
                    follow_up.extend(self.apply(Msg::FileFailed {
                        batch_id,
                        index,
                        reason: err.to_string(),
                    }));
                    return follow_up;
                }
            }
        }

        omni_info!("Batch {} complete", batch_id);
        follow_up
    }
}
