//! HTTP sync client
//!
//! One GET per sync, conditional on the cached version, bounded by a hard
//! 10 s timeout. Every failure mode funnels into "keep the cached
//! snapshot and report no change"; retry cadence belongs to the scheduler
//! that calls us, not here.

use std::time::Duration;

use reqwest::header::{ACCEPT, IF_NONE_MATCH};
use reqwest::StatusCode;

use hv_core::storage::AllowlistStorage;
use hv_core::store::AllowlistStore;

use crate::payload::{apply_payload, PayloadOutcome};

/// Hard client-side timeout for the whole request.
pub const SYNC_TIMEOUT: Duration = Duration::from_millis(10_000);

/// Error type for a single sync attempt.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("server returned status {0}")]
    Status(u16),
    #[error("payload rejected: {0}")]
    InvalidPayload(String),
}

/// Client for the remote allowlist endpoint.
pub struct SyncClient {
    http: reqwest::Client,
    endpoint: String,
}

impl SyncClient {
    /// Build a client for `endpoint` (the full URL of the allowlist
    /// resource, e.g. `https://api.example.com/getCrisisAllowlist`).
    pub fn new(endpoint: impl Into<String>) -> Result<Self, SyncError> {
        let http = reqwest::Client::builder().timeout(SYNC_TIMEOUT).build()?;
        Ok(Self {
            http,
            endpoint: endpoint.into(),
        })
    }

    /// Refresh the store from the server. Returns whether the allowlist
    /// changed.
    ///
    /// Sync failure is silent by contract: any error keeps the cached
    /// snapshot and returns `false`. The caller's scheduler decides when
    /// to try again.
    pub async fn sync_from_server(
        &self,
        store: &AllowlistStore,
        storage: &dyn AllowlistStorage,
    ) -> bool {
        match self.try_sync(store, storage).await {
            Ok(changed) => changed,
            Err(e) => {
                log::debug!("allowlist sync failed ({e}); keeping cached snapshot");
                false
            }
        }
    }

    async fn try_sync(
        &self,
        store: &AllowlistStore,
        storage: &dyn AllowlistStorage,
    ) -> Result<bool, SyncError> {
        let cached_version = store.version();

        let response = self
            .http
            .get(&self.endpoint)
            .header(ACCEPT, "application/json")
            .header(IF_NONE_MATCH, format!("\"{cached_version}\""))
            .send()
            .await?;

        if response.status() == StatusCode::NOT_MODIFIED {
            store.touch(storage);
            return Ok(false);
        }

        if !response.status().is_success() {
            return Err(SyncError::Status(response.status().as_u16()));
        }

        let body = response.text().await?;

        match apply_payload(&body, store, storage) {
            PayloadOutcome::Changed => Ok(true),
            PayloadOutcome::Unchanged => Ok(false),
            PayloadOutcome::Rejected(reason) => Err(SyncError::InvalidPayload(reason)),
        }
    }
}
