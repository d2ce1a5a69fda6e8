//! Azure Key Vault data-plane client.
//!
//! Listing follows `nextLink` paging; export and import use the vault's
//! own `/backup` and `/restore` operations, so item material only ever
//! moves as the service's opaque, service-encrypted blob.

use crate::core::types::{ItemKind, VaultItem, VaultRef};
use crate::error::{KvError, KvResult};
use crate::services::VaultStore;
use crate::services::azure::auth::{TokenSource, VAULT_SCOPE};
use crate::services::azure::check_status;
use serde::Deserialize;
use std::sync::Arc;
use zeroize::Zeroizing;

const API_VERSION: &str = "7.4";

pub struct AzureKeyVault {
    http: reqwest::Client,
    tokens: Arc<TokenSource>,
}

impl AzureKeyVault {
    pub fn new(http: reqwest::Client, tokens: Arc<TokenSource>) -> Self {
        AzureKeyVault { http, tokens }
    }

    async fn list_items(
        &self,
        vault: &VaultRef,
        collection: &str,
        kind: ItemKind,
    ) -> KvResult<Vec<VaultItem>> {
        let mut items = Vec::new();
        let mut next = format!(
            "{}/{}?api-version={}",
            vault.vault_uri.trim_end_matches('/'),
            collection,
            API_VERSION
        );

        loop {
            let bearer = self.tokens.bearer(VAULT_SCOPE).await?;
            let response = self.http.get(&next).bearer_auth(bearer).send().await?;
            let page: ListPage = check_status(response).await?.json().await?;

            for entry in page.value {
                match item_name_from_id(&entry.id) {
                    Some(name) => items.push(VaultItem::new(name, kind)),
                    None => {
                        return Err(KvError::Service(format!(
                            "unparseable item id in listing: {}",
                            entry.id
                        )));
                    }
                }
            }

            match page.next_link {
                Some(link) if !link.is_empty() => next = link,
                _ => break,
            }
        }

        Ok(items)
    }

    async fn export(
        &self,
        vault: &VaultRef,
        collection: &str,
        name: &str,
    ) -> KvResult<Zeroizing<Vec<u8>>> {
        let url = format!(
            "{}/{}/{}/backup?api-version={}",
            vault.vault_uri.trim_end_matches('/'),
            collection,
            name,
            API_VERSION
        );
        let bearer = self.tokens.bearer(VAULT_SCOPE).await?;
        let response = self.http.post(&url).bearer_auth(bearer).send().await?;
        let blob: BackupBlob = check_status(response).await?.json().await?;
        Ok(Zeroizing::new(blob.value.into_bytes()))
    }

    async fn import(&self, vault: &VaultRef, collection: &str, material: &[u8]) -> KvResult<()> {
        let blob = std::str::from_utf8(material)
            .map_err(|_| KvError::InvalidInput("backup blob is not valid UTF-8".to_string()))?;
        let url = format!(
            "{}/{}/restore?api-version={}",
            vault.vault_uri.trim_end_matches('/'),
            collection,
            API_VERSION
        );
        let bearer = self.tokens.bearer(VAULT_SCOPE).await?;
        let response = self
            .http
            .post(&url)
            .bearer_auth(bearer)
            .json(&serde_json::json!({ "value": blob }))
            .send()
            .await?;
        check_status(response).await?;
        Ok(())
    }
}

impl VaultStore for AzureKeyVault {
    async fn list_secrets(&self, vault: &VaultRef) -> KvResult<Vec<VaultItem>> {
        self.list_items(vault, "secrets", ItemKind::Secret).await
    }

    async fn list_certificates(&self, vault: &VaultRef) -> KvResult<Vec<VaultItem>> {
        self.list_items(vault, "certificates", ItemKind::Certificate)
            .await
    }

    async fn export_secret(&self, vault: &VaultRef, name: &str) -> KvResult<Zeroizing<Vec<u8>>> {
        self.export(vault, "secrets", name).await
    }

    async fn export_certificate(
        &self,
        vault: &VaultRef,
        name: &str,
    ) -> KvResult<Zeroizing<Vec<u8>>> {
        self.export(vault, "certificates", name).await
    }

    async fn import_secret(&self, vault: &VaultRef, _name: &str, material: &[u8]) -> KvResult<()> {
        // The restored name is embedded in the blob itself.
        self.import(vault, "secrets", material).await
    }

    async fn import_certificate(
        &self,
        vault: &VaultRef,
        _name: &str,
        material: &[u8],
    ) -> KvResult<()> {
        self.import(vault, "certificates", material).await
    }
}

/// Item name from a listing entry id such as
/// `https://kv.vault.azure.net/secrets/db-pass` (optionally with a
/// trailing version segment).
fn item_name_from_id(id: &str) -> Option<String> {
    let parsed = url::Url::parse(id).ok()?;
    let mut segments = parsed.path_segments()?;
    let _collection = segments.next()?;
    let name = segments.next()?;
    if name.is_empty() {
        return None;
    }
    Some(name.to_string())
}

#[derive(Deserialize)]
struct ListPage {
    #[serde(default)]
    value: Vec<ListEntry>,
    #[serde(rename = "nextLink")]
    next_link: Option<String>,
}

#[derive(Deserialize)]
struct ListEntry {
    id: String,
}

#[derive(Deserialize)]
struct BackupBlob {
    value: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn item_name_is_taken_from_the_id_path() {
        assert_eq!(
            item_name_from_id("https://kv.vault.azure.net/secrets/db-pass").as_deref(),
            Some("db-pass")
        );
        assert_eq!(
            item_name_from_id("https://kv.vault.azure.net/certificates/tls-cert/abc123").as_deref(),
            Some("tls-cert")
        );
        assert_eq!(item_name_from_id("https://kv.vault.azure.net/"), None);
        assert_eq!(item_name_from_id("not a url"), None);
    }
}
