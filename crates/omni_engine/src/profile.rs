use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

use omni_core::{CreditBalance, Identity};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProfileError {
    #[error("invalid profile endpoint: {0}")]
    InvalidEndpoint(String),
    #[error("profile request timed out")]
    Timeout,
    #[error("profile service returned http status {0}")]
    HttpStatus(u16),
    #[error("no profile for identity {0}")]
    MissingProfile(String),
    #[error("malformed profile response: {0}")]
    Decode(String),
    #[error("network error: {0}")]
    Network(String),
}

/// Remote per-account balance record.
#[async_trait::async_trait]
pub trait ProfileStore: Send + Sync {
    async fn fetch_balance(&self, identity: &Identity) -> Result<CreditBalance, ProfileError>;

    /// Best effort; callers do not retry.
    async fn update_balance(
        &self,
        identity: &Identity,
        balance: CreditBalance,
    ) -> Result<(), ProfileError>;
}

#[derive(Debug, Clone)]
pub struct ProfileSettings {
    /// Service root, e.g. `https://project.example.co`.
    pub base_url: String,
    /// Sent as the `apikey` header.
    pub api_key: String,
    /// Bearer token of the signed-in user; falls back to the api key.
    pub access_token: Option<String>,
    pub table: String,
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
}

impl Default for ProfileSettings {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:54321".to_string(),
            api_key: String::new(),
            access_token: None,
            table: "profiles".to_string(),
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(30),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ProfileRow {
    credits: u64,
}

#[derive(Debug, Serialize)]
struct CreditsPatch {
    credits: u64,
}

/// Profile store backed by a PostgREST-style `profiles` table.
///
/// Reads `GET {base}/rest/v1/{table}?id=eq.{id}&select=credits` and writes
/// `PATCH {base}/rest/v1/{table}?id=eq.{id}` with `{"credits": n}`.
#[derive(Debug, Clone)]
pub struct HttpProfileStore {
    settings: ProfileSettings,
    client: reqwest::Client,
}

impl HttpProfileStore {
    pub fn new(settings: ProfileSettings) -> Result<Self, ProfileError> {
        let client = reqwest::Client::builder()
            .connect_timeout(settings.connect_timeout)
            .timeout(settings.request_timeout)
            .build()
            .map_err(|err| ProfileError::Network(err.to_string()))?;
        Ok(Self { settings, client })
    }

    fn endpoint(&self, identity: &Identity, select: bool) -> Result<Url, ProfileError> {
        let mut base = Url::parse(&self.settings.base_url)
            .map_err(|err| ProfileError::InvalidEndpoint(err.to_string()))?;
        // Joining replaces the last path segment unless the base ends in `/`.
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        let mut url = base
            .join(&format!("rest/v1/{}", self.settings.table))
            .map_err(|err| ProfileError::InvalidEndpoint(err.to_string()))?;
        {
            let mut query = url.query_pairs_mut();
            query.append_pair("id", &format!("eq.{}", identity.as_str()));
            if select {
                query.append_pair("select", "credits");
            }
        }
        Ok(url)
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        let token = self
            .settings
            .access_token
            .as_deref()
            .unwrap_or(&self.settings.api_key);
        request
            .header("apikey", &self.settings.api_key)
            .header(AUTHORIZATION, format!("Bearer {token}"))
    }

    /// Sends `request` and returns the first matching profile row.
    async fn send_for_row(
        &self,
        request: reqwest::RequestBuilder,
        identity: &Identity,
    ) -> Result<ProfileRow, ProfileError> {
        let response = self.authorize(request).send().await.map_err(map_reqwest_error)?;
        let status = response.status();
        if !status.is_success() {
            return Err(ProfileError::HttpStatus(status.as_u16()));
        }
        let body = response.bytes().await.map_err(map_reqwest_error)?;
        let rows: Vec<ProfileRow> =
            serde_json::from_slice(&body).map_err(|err| ProfileError::Decode(err.to_string()))?;
        rows.into_iter()
            .next()
            .ok_or_else(|| ProfileError::MissingProfile(identity.to_string()))
    }
}

#[async_trait::async_trait]
impl ProfileStore for HttpProfileStore {
    async fn fetch_balance(&self, identity: &Identity) -> Result<CreditBalance, ProfileError> {
        let url = self.endpoint(identity, true)?;
        let row = self.send_for_row(self.client.get(url), identity).await?;
        Ok(CreditBalance::new(row.credits))
    }

    async fn update_balance(
        &self,
        identity: &Identity,
        balance: CreditBalance,
    ) -> Result<(), ProfileError> {
        let url = self.endpoint(identity, false)?;
        let body = serde_json::to_vec(&CreditsPatch {
            credits: balance.get(),
        })
        .map_err(|err| ProfileError::Decode(err.to_string()))?;
        let request = self
            .client
            .patch(url)
            .header(CONTENT_TYPE, "application/json")
            .header("Prefer", "return=representation")
            .body(body);
        self.send_for_row(request, identity).await?;
        Ok(())
    }
}

fn map_reqwest_error(err: reqwest::Error) -> ProfileError {
    if err.is_timeout() {
        return ProfileError::Timeout;
    }
    ProfileError::Network(err.to_string())
}

/// In-process profile table.
#[derive(Debug, Default)]
pub struct MemoryProfileStore {
    balances: Mutex<HashMap<Identity, CreditBalance>>,
}

impl MemoryProfileStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, identity: Identity, balance: CreditBalance) {
        if let Ok(mut balances) = self.balances.lock() {
            balances.insert(identity, balance);
        }
    }

    pub fn balance_of(&self, identity: &Identity) -> Option<CreditBalance> {
        self.balances.lock().ok()?.get(identity).copied()
    }
}

#[async_trait::async_trait]
impl ProfileStore for MemoryProfileStore {
    async fn fetch_balance(&self, identity: &Identity) -> Result<CreditBalance, ProfileError> {
        self.balance_of(identity)
            .ok_or_else(|| ProfileError::MissingProfile(identity.to_string()))
    }

    async fn update_balance(
        &self,
        identity: &Identity,
        balance: CreditBalance,
    ) -> Result<(), ProfileError> {
        let mut balances = self
            .balances
            .lock()
            .map_err(|_| ProfileError::Network("profile table poisoned".into()))?;
        match balances.get_mut(identity) {
            Some(stored) => {
                *stored = balance;
                Ok(())
            }
            None => Err(ProfileError::MissingProfile(identity.to_string())),
        }
    }
}
