use tokio::sync::watch;

use omni_core::Identity;

/// Source of the authenticated identity.
#[async_trait::async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Receiver holding the current identity and observing every later change.
    fn subscribe(&self) -> watch::Receiver<Option<Identity>>;

    /// Ends the session. Completion is published through [`Self::subscribe`].
    async fn sign_out(&self);
}

/// Identity provider backed by a watch channel; sign-in is driven by the host.
#[derive(Debug)]
pub struct WatchIdentityProvider {
    tx: watch::Sender<Option<Identity>>,
}

impl Default for WatchIdentityProvider {
    fn default() -> Self {
        Self::new(None)
    }
}

impl WatchIdentityProvider {
    pub fn new(initial: Option<Identity>) -> Self {
        let (tx, _rx) = watch::channel(initial);
        Self { tx }
    }

    pub fn sign_in(&self, identity: Identity) {
        self.tx.send_replace(Some(identity));
    }
}

#[async_trait::async_trait]
impl IdentityProvider for WatchIdentityProvider {
    fn subscribe(&self) -> watch::Receiver<Option<Identity>> {
        self.tx.subscribe()
    }

    async fn sign_out(&self) {
        self.tx.send_replace(None);
    }
}
