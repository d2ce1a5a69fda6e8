//! The run state machine shared by both engines.
//!
//! `Idle -> AccessChecking -> { AccessDenied | Cataloging/Scanning ->
//! Processing -> Reporting }`. The pipeline is the only caller of the
//! engines, so no export or import is ever issued once the access gate
//! declines. Setup failures (vault lookup, path preparation) abort
//! before any item is touched; per-item failures live in the returned
//! report.

use crate::core::access::{AccessGate, PropagationWait};
use crate::core::backup::BackupEngine;
use crate::core::catalog::VaultCatalog;
use crate::core::consent::Consent;
use crate::core::restore::RestoreEngine;
use crate::core::types::{BackupReport, IdentityRef, RestoreReport};
use crate::error::{KvError, KvResult};
use crate::services::{RoleAssignments, VaultDirectory, VaultStore};
use log::info;
use std::path::{Path, PathBuf};

/// Where a restore run takes its input from.
#[derive(Debug, Clone)]
pub enum RestoreSource {
    Directory(PathBuf),
    File(PathBuf),
}

/// Back up every item of the named vault into `target_dir`.
pub async fn run_backup<D, S, R>(
    directory: &D,
    store: &S,
    roles: &R,
    identity: &IdentityRef,
    vault_name: &str,
    target_dir: &Path,
    consent: &dyn Consent,
    wait: PropagationWait,
) -> KvResult<BackupReport>
where
    D: VaultDirectory,
    S: VaultStore,
    R: RoleAssignments,
{
    let vault = directory.resolve_vault(vault_name).await?;
    prepare_target_dir(target_dir, consent).await?;

    let gate = AccessGate::new(roles, wait);
    if !gate.ensure_access(identity, &vault.id, consent).await? {
        return Err(KvError::AccessDenied(format!(
            "required roles not granted on {}",
            vault.id
        )));
    }

    info!("Backing up vault '{}' to {}", vault.name, target_dir.display());
    let catalog = VaultCatalog::new(store).list_items(&vault).await;
    Ok(BackupEngine::new(store)
        .backup(&vault, &catalog, target_dir)
        .await)
}

/// Restore items from a backup directory or a single backup file into
/// the named vault.
pub async fn run_restore<D, S, R>(
    directory: &D,
    store: &S,
    roles: &R,
    identity: &IdentityRef,
    vault_name: &str,
    source: RestoreSource,
    consent: &dyn Consent,
    wait: PropagationWait,
) -> KvResult<RestoreReport>
where
    D: VaultDirectory,
    S: VaultStore,
    R: RoleAssignments,
{
    let vault = directory.resolve_vault(vault_name).await?;
    match &source {
        RestoreSource::Directory(dir) if !dir.is_dir() => {
            return Err(KvError::InvalidPath(format!(
                "not a directory: {}",
                dir.display()
            )));
        }
        RestoreSource::File(file) if !file.is_file() => {
            return Err(KvError::InvalidPath(format!(
                "not a file: {}",
                file.display()
            )));
        }
        _ => {}
    }

    let gate = AccessGate::new(roles, wait);
    if !gate.ensure_access(identity, &vault.id, consent).await? {
        return Err(KvError::AccessDenied(format!(
            "required roles not granted on {}",
            vault.id
        )));
    }

    let engine = RestoreEngine::new(store);
    match source {
        RestoreSource::Directory(dir) => {
            info!("Restoring vault '{}' from {}", vault.name, dir.display());
            Ok(engine.restore_all(&vault, &dir).await)
        }
        RestoreSource::File(file) => {
            info!("Restoring vault '{}' from {}", vault.name, file.display());
            Ok(engine.restore_file(&vault, &file).await)
        }
    }
}

/// Ensure the backup target directory exists and the operator accepts
/// using it. A non-empty directory is offered for clearing; declining
/// that offers proceeding into it as-is; declining both aborts.
async fn prepare_target_dir(target_dir: &Path, consent: &dyn Consent) -> KvResult<()> {
    if !target_dir.exists() {
        tokio::fs::create_dir_all(target_dir).await?;
        return Ok(());
    }
    if !target_dir.is_dir() {
        return Err(KvError::InvalidPath(format!(
            "not a directory: {}",
            target_dir.display()
        )));
    }

    let mut entries = tokio::fs::read_dir(target_dir).await?;
    if entries.next_entry().await?.is_none() {
        return Ok(());
    }

    let clear_prompt = format!(
        "Directory {} is not empty. Delete its contents?",
        target_dir.display()
    );
    if consent.confirm(&clear_prompt) {
        clear_directory(target_dir).await?;
        return Ok(());
    }

    let proceed_prompt = format!(
        "Proceed into non-empty directory {} (existing backup files may be overwritten)?",
        target_dir.display()
    );
    if consent.confirm(&proceed_prompt) {
        return Ok(());
    }

    Err(KvError::Aborted(format!(
        "operator declined to use {}",
        target_dir.display()
    )))
}

async fn clear_directory(dir: &Path) -> KvResult<()> {
    let mut entries = tokio::fs::read_dir(dir).await?;
    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        if path.is_dir() {
            tokio::fs::remove_dir_all(&path).await?;
        } else {
            tokio::fs::remove_file(&path).await?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::consent::{AutoApprove, DenyAll, ScriptedConsent};
    use crate::core::types::REQUIRED_ROLES;
    use crate::services::memory::{MemoryDirectory, MemoryRoles, MemoryVault};
    use std::time::Duration;
    use tempfile::tempdir;

    fn fast_wait() -> PropagationWait {
        PropagationWait {
            poll_interval: Duration::from_millis(1),
            deadline: Duration::from_millis(20),
        }
    }

    fn granted_roles(identity: &IdentityRef, vault_id: &str) -> MemoryRoles {
        let roles = MemoryRoles::new();
        for role in REQUIRED_ROLES {
            roles.grant(identity, vault_id, role);
        }
        roles
    }

    #[tokio::test]
    async fn denied_access_issues_no_export_calls() {
        let directory = MemoryDirectory::new();
        directory.add_vault("kv-gated");
        let store = MemoryVault::new();
        store.put_secret("db-pass", b"hunter2".to_vec());
        let roles = MemoryRoles::new();
        let identity = IdentityRef::new("oid-1");
        let temp = tempdir().unwrap();

        let result = run_backup(
            &directory,
            &store,
            &roles,
            &identity,
            "kv-gated",
            temp.path(),
            &DenyAll,
            fast_wait(),
        )
        .await;

        assert!(matches!(result, Err(KvError::AccessDenied(_))));
        assert_eq!(store.export_calls(), 0);
    }

    #[tokio::test]
    async fn denied_access_issues_no_import_calls() {
        let directory = MemoryDirectory::new();
        directory.add_vault("kv-gated");
        let store = MemoryVault::new();
        let roles = MemoryRoles::new();
        let identity = IdentityRef::new("oid-1");
        let temp = tempdir().unwrap();
        std::fs::write(temp.path().join("db-pass.secret.backup"), b"hunter2").unwrap();

        let result = run_restore(
            &directory,
            &store,
            &roles,
            &identity,
            "kv-gated",
            RestoreSource::Directory(temp.path().to_path_buf()),
            &DenyAll,
            fast_wait(),
        )
        .await;

        assert!(matches!(result, Err(KvError::AccessDenied(_))));
        assert_eq!(store.import_calls(), 0);
    }

    #[tokio::test]
    async fn unknown_vault_is_a_setup_error() {
        let directory = MemoryDirectory::new();
        let store = MemoryVault::new();
        let roles = MemoryRoles::new();
        let identity = IdentityRef::new("oid-1");
        let temp = tempdir().unwrap();

        let result = run_backup(
            &directory,
            &store,
            &roles,
            &identity,
            "kv-missing",
            temp.path(),
            &AutoApprove,
            fast_wait(),
        )
        .await;

        match result {
            Err(e) => {
                assert!(e.is_setup());
                assert!(matches!(e, KvError::VaultNotFound(_)));
            }
            Ok(_) => panic!("expected a setup error"),
        }
    }

    #[tokio::test]
    async fn non_empty_target_dir_is_cleared_with_consent() {
        let directory = MemoryDirectory::new();
        let vault = directory.add_vault("kv-clear");
        let store = MemoryVault::new();
        store.put_secret("db-pass", b"hunter2".to_vec());
        let identity = IdentityRef::new("oid-1");
        let roles = granted_roles(&identity, &vault.id);
        let temp = tempdir().unwrap();
        std::fs::write(temp.path().join("stale.secret.backup"), b"old").unwrap();

        let consent = ScriptedConsent::new([true]);
        let report = run_backup(
            &directory,
            &store,
            &roles,
            &identity,
            "kv-clear",
            temp.path(),
            &consent,
            fast_wait(),
        )
        .await
        .unwrap();

        assert!(report.is_clean());
        assert!(!temp.path().join("stale.secret.backup").exists());
        assert!(temp.path().join("db-pass.secret.backup").exists());
    }

    #[tokio::test]
    async fn declining_both_directory_offers_aborts_before_access_check() {
        let directory = MemoryDirectory::new();
        directory.add_vault("kv-abort");
        let store = MemoryVault::new();
        let roles = MemoryRoles::new();
        let identity = IdentityRef::new("oid-1");
        let temp = tempdir().unwrap();
        std::fs::write(temp.path().join("something.txt"), b"x").unwrap();

        let consent = ScriptedConsent::new([false, false]);
        let result = run_backup(
            &directory,
            &store,
            &roles,
            &identity,
            "kv-abort",
            temp.path(),
            &consent,
            fast_wait(),
        )
        .await;

        match result {
            Err(e) => assert!(matches!(e, KvError::Aborted(_))),
            Ok(_) => panic!("expected abort"),
        }
        // The existing file was left alone.
        assert!(temp.path().join("something.txt").exists());
    }

    #[tokio::test]
    async fn missing_target_dir_is_created() {
        let directory = MemoryDirectory::new();
        let vault = directory.add_vault("kv-mkdir");
        let store = MemoryVault::new();
        let identity = IdentityRef::new("oid-1");
        let roles = granted_roles(&identity, &vault.id);
        let temp = tempdir().unwrap();
        let target = temp.path().join("nested").join("backups");

        let report = run_backup(
            &directory,
            &store,
            &roles,
            &identity,
            "kv-mkdir",
            &target,
            &DenyAll,
            fast_wait(),
        )
        .await
        .unwrap();

        assert!(target.is_dir());
        assert_eq!(report.secrets.attempted, 0);
    }
}
