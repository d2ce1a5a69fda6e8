//! Partitioned enumeration of a vault's items.

use crate::core::types::{ItemKind, PartitionFailure, VaultItem, VaultRef};
use crate::logging::log_admin_event;
use crate::services::VaultStore;
use log::info;

/// Listing result, partitioned by kind. A partition that failed to list
/// is left empty and recorded in `failures`; the other partition still
/// flows downstream.
#[derive(Debug, Default)]
pub struct Catalog {
    pub secrets: Vec<VaultItem>,
    pub certificates: Vec<VaultItem>,
    pub failures: Vec<PartitionFailure>,
}

pub struct VaultCatalog<'a, S: VaultStore> {
    store: &'a S,
}

impl<'a, S: VaultStore> VaultCatalog<'a, S> {
    pub fn new(store: &'a S) -> Self {
        VaultCatalog { store }
    }

    pub async fn list_items(&self, vault: &VaultRef) -> Catalog {
        let mut catalog = Catalog::default();

        match self.store.list_secrets(vault).await {
            Ok(items) => {
                if items.is_empty() {
                    info!("Vault '{}' holds no secrets", vault.name);
                }
                catalog.secrets = items;
            }
            Err(e) => {
                log_admin_event("LIST_SECRETS", &format!("{}: {}", vault.name, e), false);
                catalog.failures.push(PartitionFailure {
                    kind: ItemKind::Secret,
                    cause: e.to_string(),
                });
            }
        }

        match self.store.list_certificates(vault).await {
            Ok(items) => {
                if items.is_empty() {
                    info!("Vault '{}' holds no certificates", vault.name);
                }
                catalog.certificates = items;
            }
            Err(e) => {
                log_admin_event(
                    "LIST_CERTIFICATES",
                    &format!("{}: {}", vault.name, e),
                    false,
                );
                catalog.failures.push(PartitionFailure {
                    kind: ItemKind::Certificate,
                    cause: e.to_string(),
                });
            }
        }

        catalog
    }
}
