//! Azure REST binding for the collaborator seams.
//!
//! Data-plane calls (Key Vault item listing, backup, restore) and
//! management-plane calls (vault resolution, role assignments) share one
//! HTTP client and one token source; tokens are cached per resource
//! scope.

pub mod arm;
pub mod auth;
pub mod keyvault;

pub use arm::AzureResourceManager;
pub use auth::{AzureAuthConfig, TokenSource};
pub use keyvault::AzureKeyVault;

use crate::config::KvGuardConfig;
use crate::core::types::IdentityRef;
use crate::error::{KvError, KvResult};
use std::sync::Arc;

/// One authenticated Azure session: the acting identity plus the two
/// service clients the pipeline needs.
pub struct AzureSession {
    pub identity: IdentityRef,
    pub vault: AzureKeyVault,
    pub arm: AzureResourceManager,
}

impl AzureSession {
    /// Authenticate from the `AZURE_*` environment and wire up the
    /// service clients. Fails before any vault is touched when
    /// credentials or the subscription id are missing.
    pub async fn connect(config: &KvGuardConfig) -> KvResult<Self> {
        if config.subscription_id.is_empty() {
            return Err(KvError::Authentication(
                "no subscription id configured (set AZURE_SUBSCRIPTION_ID or the config file)"
                    .to_string(),
            ));
        }

        let http = reqwest::Client::builder()
            .timeout(config.api_timeout())
            .build()?;
        let auth = AzureAuthConfig::from_env()?;
        let tokens = Arc::new(TokenSource::new(http.clone(), auth));
        let identity = tokens.identity().await?;

        Ok(AzureSession {
            identity,
            vault: AzureKeyVault::new(http.clone(), tokens.clone()),
            arm: AzureResourceManager::new(http, tokens, config.subscription_id.clone()),
        })
    }
}

/// Map non-success responses onto the crate error taxonomy. 409 stays
/// distinguishable so role grants can treat it as already-granted.
pub(crate) async fn check_status(resp: reqwest::Response) -> KvResult<reqwest::Response> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().await.unwrap_or_default();
    if status == reqwest::StatusCode::CONFLICT {
        return Err(KvError::Conflict(body));
    }
    Err(KvError::Service(format!("{status}: {body}")))
}
