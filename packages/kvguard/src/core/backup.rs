//! Export of cataloged items to backup files.
//!
//! Items are processed sequentially, secrets first, in catalog order.
//! One item failing never aborts the run; the failure is recorded and
//! processing continues. A name collision with an existing file in the
//! target directory overwrites it (the directory is dedicated to one
//! backup run).

use crate::core::catalog::Catalog;
use crate::core::types::{BackupReport, ItemFailure, VaultItem, VaultRef, backup_file_name};
use crate::error::KvResult;
use crate::logging::log_admin_event;
use crate::services::VaultStore;
use chrono::Utc;
use std::path::{Path, PathBuf};

pub struct BackupEngine<'a, S: VaultStore> {
    store: &'a S,
}

impl<'a, S: VaultStore> BackupEngine<'a, S> {
    pub fn new(store: &'a S) -> Self {
        BackupEngine { store }
    }

    /// Export every cataloged item into `target_dir`, one file per item,
    /// the kind recorded in the file name.
    pub async fn backup(
        &self,
        vault: &VaultRef,
        catalog: &Catalog,
        target_dir: &Path,
    ) -> BackupReport {
        let mut report = BackupReport::new(&vault.name);
        report.listing_failures = catalog.failures.clone();

        for item in catalog.secrets.iter().chain(catalog.certificates.iter()) {
            match self.backup_item(vault, item, target_dir).await {
                Ok(path) => {
                    log_admin_event("ITEM_EXPORT", &format!("{} -> {}", item.name, path.display()), true);
                    report.tally_mut(item.kind).record_success();
                    report.files.push(path);
                }
                Err(e) => {
                    log_admin_event("ITEM_EXPORT", &format!("{}: {}", item.name, e), false);
                    report.tally_mut(item.kind).record_failure();
                    report.failures.push(ItemFailure {
                        name: item.name.clone(),
                        kind: Some(item.kind),
                        cause: e.to_string(),
                    });
                }
            }
        }

        report.completed_at = Utc::now();
        report
    }

    async fn backup_item(
        &self,
        vault: &VaultRef,
        item: &VaultItem,
        target_dir: &Path,
    ) -> KvResult<PathBuf> {
        let material = match item.kind {
            crate::core::types::ItemKind::Secret => {
                self.store.export_secret(vault, &item.name).await?
            }
            crate::core::types::ItemKind::Certificate => {
                self.store.export_certificate(vault, &item.name).await?
            }
        };
        let path = target_dir.join(backup_file_name(&item.name, item.kind));
        tokio::fs::write(&path, material.as_slice()).await?;
        Ok(path)
    }
}
