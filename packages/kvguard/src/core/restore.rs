//! Replay of backup files into a vault.
//!
//! The kind of each file is recovered strictly from its filename suffix;
//! nothing inside the file carries type metadata. Bulk mode scans all
//! `*.secret.backup` files, then all `*.cert.backup` files, and ignores
//! anything else in the directory. Same best-effort-per-item semantics
//! as the backup engine.

use crate::core::types::{
    ItemFailure, ItemKind, RestoreReport, VaultRef, parse_backup_path,
};
use crate::error::{KvError, KvResult};
use crate::logging::log_admin_event;
use crate::services::VaultStore;
use chrono::Utc;
use std::path::{Path, PathBuf};
use zeroize::Zeroizing;

pub struct RestoreEngine<'a, S: VaultStore> {
    store: &'a S,
}

impl<'a, S: VaultStore> RestoreEngine<'a, S> {
    pub fn new(store: &'a S) -> Self {
        RestoreEngine { store }
    }

    /// Restore one backup file, deriving name and kind from its filename.
    /// Files carrying neither kind suffix are rejected without touching
    /// the vault.
    pub async fn restore_one(&self, vault: &VaultRef, file: &Path) -> KvResult<String> {
        let (name, kind) = parse_backup_path(file)?;
        let material = Zeroizing::new(tokio::fs::read(file).await?);
        match kind {
            ItemKind::Secret => self.store.import_secret(vault, &name, &material).await?,
            ItemKind::Certificate => {
                self.store
                    .import_certificate(vault, &name, &material)
                    .await?
            }
        }
        Ok(name)
    }

    /// Restore every recognized backup file under `source_dir`, secrets
    /// first. Unrelated files are skipped silently.
    pub async fn restore_all(&self, vault: &VaultRef, source_dir: &Path) -> RestoreReport {
        let mut report = RestoreReport::new(&vault.name);

        let (secrets, certificates) = match scan_backup_files(source_dir) {
            Ok(partitions) => partitions,
            Err(e) => {
                log_admin_event(
                    "RESTORE_SCAN",
                    &format!("{}: {}", source_dir.display(), e),
                    false,
                );
                report.failures.push(ItemFailure {
                    name: source_dir.display().to_string(),
                    kind: None,
                    cause: e.to_string(),
                });
                report.completed_at = Utc::now();
                return report;
            }
        };

        for file in secrets.iter().chain(certificates.iter()) {
            self.restore_into_report(vault, file, &mut report).await;
        }

        report.completed_at = Utc::now();
        report
    }

    /// Single-file mode wrapped into a report, so unrecognized files and
    /// import failures surface the same way as in bulk mode.
    pub async fn restore_file(&self, vault: &VaultRef, file: &Path) -> RestoreReport {
        let mut report = RestoreReport::new(&vault.name);
        self.restore_into_report(vault, file, &mut report).await;
        report.completed_at = Utc::now();
        report
    }

    async fn restore_into_report(
        &self,
        vault: &VaultRef,
        file: &Path,
        report: &mut RestoreReport,
    ) {
        let kind = parse_backup_path(file).ok().map(|(_, kind)| kind);
        match self.restore_one(vault, file).await {
            Ok(name) => {
                log_admin_event("ITEM_IMPORT", &format!("{} <- {}", name, file.display()), true);
                if let Some(kind) = kind {
                    report.tally_mut(kind).record_success();
                }
                report.restored.push(name);
            }
            Err(e) => {
                log_admin_event("ITEM_IMPORT", &format!("{}: {}", file.display(), e), false);
                if let Some(kind) = kind {
                    report.tally_mut(kind).record_failure();
                }
                let name = match parse_backup_path(file) {
                    Ok((name, _)) => name,
                    Err(_) => file.display().to_string(),
                };
                report.failures.push(ItemFailure {
                    name,
                    kind,
                    cause: e.to_string(),
                });
            }
        }
    }
}

/// Scan a directory for backup files, partitioned by kind and sorted by
/// file name within each partition for deterministic processing order.
fn scan_backup_files(source_dir: &Path) -> KvResult<(Vec<PathBuf>, Vec<PathBuf>)> {
    if !source_dir.is_dir() {
        return Err(KvError::InvalidPath(format!(
            "not a directory: {}",
            source_dir.display()
        )));
    }

    let mut secrets = Vec::new();
    let mut certificates = Vec::new();
    for entry in std::fs::read_dir(source_dir)? {
        let path = entry?.path();
        if !path.is_file() {
            continue;
        }
        match parse_backup_path(&path) {
            Ok((_, ItemKind::Secret)) => secrets.push(path),
            Ok((_, ItemKind::Certificate)) => certificates.push(path),
            Err(_) => {} // unrelated file
        }
    }
    secrets.sort();
    certificates.sort();
    Ok((secrets, certificates))
}
