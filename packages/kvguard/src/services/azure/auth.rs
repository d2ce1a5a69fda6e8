//! OAuth2 client-credentials token source.
//!
//! One token is requested and cached per resource scope (data plane and
//! management plane use different audiences). The acting identity is
//! read from the token's `oid` claim, so the pipeline always works with
//! an explicit identity value instead of ambient login state.

use crate::core::types::IdentityRef;
use crate::error::{KvError, KvResult};
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

const TOKEN_ENDPOINT_TEMPLATE: &str =
    "https://login.microsoftonline.com/{tenant}/oauth2/v2.0/token";

/// Token audience for Key Vault data-plane calls.
pub const VAULT_SCOPE: &str = "https://vault.azure.net/.default";
/// Token audience for Azure Resource Manager calls.
pub const ARM_SCOPE: &str = "https://management.azure.com/.default";

/// Service-principal credentials, taken from the standard `AZURE_*`
/// environment variables.
#[derive(Clone)]
pub struct AzureAuthConfig {
    pub tenant_id: String,
    pub client_id: String,
    client_secret: SecretString,
}

impl AzureAuthConfig {
    pub fn from_env() -> KvResult<Self> {
        let tenant_id = require_env("AZURE_TENANT_ID")?;
        let client_id = require_env("AZURE_CLIENT_ID")?;
        let client_secret = SecretString::from(require_env("AZURE_CLIENT_SECRET")?);

        Ok(AzureAuthConfig {
            tenant_id,
            client_id,
            client_secret,
        })
    }
}

fn require_env(name: &str) -> KvResult<String> {
    std::env::var(name).map_err(|_| KvError::Authentication(format!("missing {name}")))
}

struct CachedToken {
    bearer: String,
    expires_at: Instant,
}

pub struct TokenSource {
    http: reqwest::Client,
    config: AzureAuthConfig,
    cache: Mutex<HashMap<String, CachedToken>>,
}

impl TokenSource {
    pub fn new(http: reqwest::Client, config: AzureAuthConfig) -> Self {
        TokenSource {
            http,
            config,
            cache: Mutex::new(HashMap::new()),
        }
    }

    /// Bearer token for the given scope, refreshed when close to expiry.
    pub async fn bearer(&self, scope: &str) -> KvResult<String> {
        let mut cache = self.cache.lock().await;
        if let Some(cached) = cache.get(scope) {
            if cached.expires_at > Instant::now() {
                return Ok(cached.bearer.clone());
            }
        }

        let token = self.request_token(scope).await?;
        let bearer = token.bearer.clone();
        cache.insert(scope.to_string(), token);
        Ok(bearer)
    }

    async fn request_token(&self, scope: &str) -> KvResult<CachedToken> {
        let url = TOKEN_ENDPOINT_TEMPLATE.replace("{tenant}", &self.config.tenant_id);
        let params = [
            ("client_id", self.config.client_id.as_str()),
            ("client_secret", self.config.client_secret.expose_secret()),
            ("scope", scope),
            ("grant_type", "client_credentials"),
        ];

        let response = self.http.post(url).form(&params).send().await?;
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(KvError::Authentication(format!(
                "token endpoint rejected the request: {status} {body}"
            )));
        }

        let payload: TokenResponse = response
            .json()
            .await
            .map_err(|e| KvError::Authentication(format!("malformed token response: {e}")))?;

        // Refresh a minute early so in-flight requests never carry a
        // token that expires mid-call.
        let lifetime = payload
            .expires_in
            .unwrap_or(3600)
            .saturating_sub(60)
            .max(60);

        Ok(CachedToken {
            bearer: payload.access_token,
            expires_at: Instant::now() + Duration::from_secs(lifetime),
        })
    }

    /// The acting identity, read from the `oid` claim of an ARM token.
    pub async fn identity(&self) -> KvResult<IdentityRef> {
        let bearer = self.bearer(ARM_SCOPE).await?;
        let object_id = oid_claim(&bearer)?;
        Ok(IdentityRef::new(object_id))
    }
}

/// Extract the `oid` claim from an access token. The token came straight
/// from the token endpoint over TLS, so the signature is not re-verified
/// here.
fn oid_claim(bearer: &str) -> KvResult<String> {
    let payload = bearer
        .split('.')
        .nth(1)
        .ok_or_else(|| KvError::Authentication("access token is not a JWT".to_string()))?;
    let decoded = URL_SAFE_NO_PAD
        .decode(payload)
        .map_err(|e| KvError::Authentication(format!("malformed token payload: {e}")))?;
    let claims: serde_json::Value = serde_json::from_slice(&decoded)
        .map_err(|e| KvError::Authentication(format!("malformed token claims: {e}")))?;
    claims
        .get("oid")
        .and_then(|oid| oid.as_str())
        .map(|oid| oid.to_string())
        .ok_or_else(|| KvError::Authentication("access token has no oid claim".to_string()))
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<u64>,
}
