use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Once};

use omni_core::{CreditBalance, CreditPolicy, Identity};
use omni_engine::{
    CommitOutcome, CreditLedger, KeyValueStore, MemoryProfileStore, MemoryStore, ProfileError,
    ProfileStore, StoreError, BALANCE_KEY,
};

fn init_logging() {
    static INIT: Once = Once::new();
    INIT.call_once(omni_logging::initialize_for_tests);
}

struct BrokenStore;

impl KeyValueStore for BrokenStore {
    fn get(&self, _key: &str) -> Result<Option<String>, StoreError> {
        Err(StoreError::Unavailable("disk gone".into()))
    }

    fn set(&self, _key: &str, _value: &str) -> Result<(), StoreError> {
        Err(StoreError::Unavailable("disk gone".into()))
    }
}

#[derive(Default)]
struct OfflineProfiles {
    calls: AtomicUsize,
}

#[async_trait::async_trait]
impl ProfileStore for OfflineProfiles {
    async fn fetch_balance(&self, _identity: &Identity) -> Result<CreditBalance, ProfileError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(ProfileError::Network("offline".into()))
    }

    async fn update_balance(
        &self,
        _identity: &Identity,
        _balance: CreditBalance,
    ) -> Result<(), ProfileError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(ProfileError::Network("offline".into()))
    }
}

fn guest_ledger(store: Arc<dyn KeyValueStore>) -> CreditLedger {
    CreditLedger::guest_only(store, CreditPolicy::default())
}

#[tokio::test]
async fn guest_read_uses_stored_value() {
    init_logging();
    let ledger = guest_ledger(Arc::new(MemoryStore::with_entry(BALANCE_KEY, "17")));
    assert_eq!(ledger.read(None).await, Some(CreditBalance::new(17)));
}

#[tokio::test]
async fn guest_read_defaults_when_absent_unparsable_or_failing() {
    init_logging();
    let default = Some(CreditBalance::new(50));

    let empty = guest_ledger(Arc::new(MemoryStore::new()));
    assert_eq!(empty.read(None).await, default);

    let garbage = guest_ledger(Arc::new(MemoryStore::with_entry(BALANCE_KEY, "lots")));
    assert_eq!(garbage.read(None).await, default);

    let negative = guest_ledger(Arc::new(MemoryStore::with_entry(BALANCE_KEY, "-4")));
    assert_eq!(negative.read(None).await, default);

    let broken = guest_ledger(Arc::new(BrokenStore));
    assert_eq!(broken.read(None).await, default);
}

#[tokio::test]
async fn guest_commit_writes_through_synchronously() {
    init_logging();
    let store = Arc::new(MemoryStore::new());
    let ledger = guest_ledger(store.clone());

    let handle = ledger.commit(None, CreditBalance::new(44));
    assert!(handle.is_finished());
    assert_eq!(store.get(BALANCE_KEY).unwrap().as_deref(), Some("44"));
    assert_eq!(handle.outcome().await, CommitOutcome::Persisted);
}

#[tokio::test]
async fn guest_commit_failure_is_reported_not_raised() {
    init_logging();
    let ledger = guest_ledger(Arc::new(BrokenStore));
    let outcome = ledger.commit(None, CreditBalance::new(1)).outcome().await;
    assert!(matches!(outcome, CommitOutcome::Failed(_)), "{outcome:?}");
}

#[tokio::test]
async fn identity_read_and_commit_use_profile_store() {
    init_logging();
    let profiles = Arc::new(MemoryProfileStore::new());
    let alice = Identity::new("alice");
    profiles.insert(alice.clone(), CreditBalance::new(120));
    let local = Arc::new(MemoryStore::new());
    let ledger = CreditLedger::new(local.clone(), profiles.clone(), CreditPolicy::default());

    assert_eq!(ledger.read(Some(&alice)).await, Some(CreditBalance::new(120)));

    let outcome = ledger
        .commit(Some(&alice), CreditBalance::new(115))
        .outcome()
        .await;
    assert_eq!(outcome, CommitOutcome::Persisted);
    assert_eq!(profiles.balance_of(&alice), Some(CreditBalance::new(115)));
    // Authenticated balances never leak into guest storage.
    assert_eq!(local.get(BALANCE_KEY).unwrap(), None);
}

#[tokio::test]
async fn identity_read_failure_is_soft() {
    init_logging();
    let profiles = Arc::new(OfflineProfiles::default());
    let ledger = CreditLedger::new(
        Arc::new(MemoryStore::new()),
        profiles.clone(),
        CreditPolicy::default(),
    );

    assert_eq!(ledger.read(Some(&Identity::new("alice"))).await, None);
    assert_eq!(profiles.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn remote_commit_failure_is_observable_and_not_retried() {
    init_logging();
    let profiles = Arc::new(OfflineProfiles::default());
    let ledger = CreditLedger::new(
        Arc::new(MemoryStore::new()),
        profiles.clone(),
        CreditPolicy::default(),
    );

    let outcome = ledger
        .commit(Some(&Identity::new("alice")), CreditBalance::new(3))
        .outcome()
        .await;
    assert_eq!(outcome, CommitOutcome::Failed("network error: offline".to_string()));
    assert_eq!(profiles.calls.load(Ordering::SeqCst), 1);
}

/// Profile store whose first write stalls, so a later write could overtake it.
#[derive(Default)]
struct SlowFirstWrite {
    inner: MemoryProfileStore,
    writes: AtomicUsize,
}

#[async_trait::async_trait]
impl ProfileStore for SlowFirstWrite {
    async fn fetch_balance(&self, identity: &Identity) -> Result<CreditBalance, ProfileError> {
        self.inner.fetch_balance(identity).await
    }

    async fn update_balance(
        &self,
        identity: &Identity,
        balance: CreditBalance,
    ) -> Result<(), ProfileError> {
        if self.writes.fetch_add(1, Ordering::SeqCst) == 0 {
            tokio::time::sleep(std::time::Duration::from_millis(200)).await;
        }
        self.inner.update_balance(identity, balance).await
    }
}

#[tokio::test(start_paused = true)]
async fn remote_writes_land_in_commit_order() {
    init_logging();
    let alice = Identity::new("alice");
    let profiles = Arc::new(SlowFirstWrite::default());
    profiles.inner.insert(alice.clone(), CreditBalance::new(100));
    let ledger = CreditLedger::new(
        Arc::new(MemoryStore::new()),
        profiles.clone(),
        CreditPolicy::default(),
    );

    let first = ledger.commit(Some(&alice), CreditBalance::new(95));
    let second = ledger.commit(Some(&alice), CreditBalance::new(90));

    assert_eq!(second.outcome().await, CommitOutcome::Persisted);
    assert_eq!(first.outcome().await, CommitOutcome::Persisted);
    assert_eq!(profiles.inner.balance_of(&alice), Some(CreditBalance::new(90)));
    assert_eq!(ledger.read(Some(&alice)).await, Some(CreditBalance::new(90)));
}

#[tokio::test]
async fn failed_remote_write_does_not_block_the_next_one() {
    init_logging();
    let alice = Identity::new("alice");
    let profiles = Arc::new(MemoryProfileStore::new());
    let ledger = CreditLedger::new(
        Arc::new(MemoryStore::new()),
        profiles.clone(),
        CreditPolicy::default(),
    );

    let missing = ledger.commit(Some(&alice), CreditBalance::new(7));
    assert!(matches!(missing.outcome().await, CommitOutcome::Failed(_)));

    profiles.insert(alice.clone(), CreditBalance::new(10));
    let retried = ledger.commit(Some(&alice), CreditBalance::new(9));
    assert_eq!(retried.outcome().await, CommitOutcome::Persisted);
    assert_eq!(profiles.balance_of(&alice), Some(CreditBalance::new(9)));
}
