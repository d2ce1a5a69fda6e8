//! End-to-end pipeline properties over the in-memory service binding.

use kvguard::core::consent::{AutoApprove, DenyAll, ScriptedConsent};
use kvguard::core::pipeline::{RestoreSource, run_backup, run_restore};
use kvguard::core::types::{IdentityRef, REQUIRED_ROLES};
use kvguard::core::PropagationWait;
use kvguard::error::KvError;
use kvguard::RoleAssignments;
use kvguard::services::memory::{MemoryDirectory, MemoryRoles, MemoryVault};
use std::time::Duration;
use tempfile::tempdir;

fn fast_wait() -> PropagationWait {
    PropagationWait {
        poll_interval: Duration::from_millis(1),
        deadline: Duration::from_millis(20),
    }
}

struct Fixture {
    directory: MemoryDirectory,
    roles: MemoryRoles,
    identity: IdentityRef,
}

impl Fixture {
    /// A directory with the named vaults registered and every required
    /// role already granted on each of them.
    fn with_vaults(names: &[&str]) -> Self {
        let directory = MemoryDirectory::new();
        let roles = MemoryRoles::new();
        let identity = IdentityRef::new("aaaaaaaa-bbbb-cccc-dddd-eeeeeeeeeeee");
        for name in names {
            let vault = directory.add_vault(name);
            for role in REQUIRED_ROLES {
                roles.grant(&identity, &vault.id, role);
            }
        }
        Fixture {
            directory,
            roles,
            identity,
        }
    }
}

#[tokio::test]
async fn backup_then_restore_reproduces_all_items() {
    let fixture = Fixture::with_vaults(&["kv-src", "kv-dst"]);
    let source = MemoryVault::new();
    source.put_secret("db-pass", b"hunter2".to_vec());
    source.put_secret("api-key", b"0123456789".to_vec());
    source.put_certificate("tls-cert", b"pfx-bytes".to_vec());
    let temp = tempdir().unwrap();

    let backup = run_backup(
        &fixture.directory,
        &source,
        &fixture.roles,
        &fixture.identity,
        "kv-src",
        temp.path(),
        &AutoApprove,
        fast_wait(),
    )
    .await
    .unwrap();

    assert!(backup.is_clean());
    assert_eq!(backup.secrets.succeeded, 2);
    assert_eq!(backup.certificates.succeeded, 1);
    assert!(temp.path().join("db-pass.secret.backup").is_file());
    assert!(temp.path().join("api-key.secret.backup").is_file());
    assert!(temp.path().join("tls-cert.cert.backup").is_file());

    let target = MemoryVault::new();
    let restore = run_restore(
        &fixture.directory,
        &target,
        &fixture.roles,
        &fixture.identity,
        "kv-dst",
        RestoreSource::Directory(temp.path().to_path_buf()),
        &AutoApprove,
        fast_wait(),
    )
    .await
    .unwrap();

    assert!(restore.is_clean());
    assert_eq!(restore.restored.len(), 3);
    assert_eq!(target.secret("db-pass").unwrap(), b"hunter2");
    assert_eq!(target.secret("api-key").unwrap(), b"0123456789");
    assert_eq!(target.certificate("tls-cert").unwrap(), b"pfx-bytes");
}

#[tokio::test]
async fn one_failed_item_leaves_the_rest_intact() {
    let fixture = Fixture::with_vaults(&["kv-src"]);
    let source = MemoryVault::new();
    for name in ["alpha", "bravo", "charlie", "delta"] {
        source.put_secret(name, name.as_bytes().to_vec());
    }
    source.fail_export("charlie");
    let temp = tempdir().unwrap();

    let report = run_backup(
        &fixture.directory,
        &source,
        &fixture.roles,
        &fixture.identity,
        "kv-src",
        temp.path(),
        &AutoApprove,
        fast_wait(),
    )
    .await
    .unwrap();

    assert_eq!(report.secrets.attempted, 4);
    assert_eq!(report.secrets.succeeded, 3);
    assert_eq!(report.secrets.failed, 1);
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].name, "charlie");
    for name in ["alpha", "bravo", "delta"] {
        assert!(temp.path().join(format!("{name}.secret.backup")).is_file());
    }
}

#[tokio::test]
async fn rerunning_backup_produces_the_same_file_set() {
    let fixture = Fixture::with_vaults(&["kv-src"]);
    let source = MemoryVault::new();
    source.put_secret("db-pass", b"hunter2".to_vec());
    source.put_certificate("tls-cert", b"pfx".to_vec());
    let temp = tempdir().unwrap();

    let file_set = |dir: &std::path::Path| {
        let mut names: Vec<String> = std::fs::read_dir(dir)
            .unwrap()
            .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    };

    let run = || async {
        // Second run answers "yes" to clearing the now non-empty dir.
        let consent = ScriptedConsent::new([true]);
        run_backup(
            &fixture.directory,
            &source,
            &fixture.roles,
            &fixture.identity,
            "kv-src",
            temp.path(),
            &consent,
            fast_wait(),
        )
        .await
        .unwrap()
    };

    run().await;
    let first = file_set(temp.path());
    run().await;
    let second = file_set(temp.path());

    assert_eq!(first, second);
    assert_eq!(first, vec!["db-pass.secret.backup", "tls-cert.cert.backup"]);
}

#[tokio::test]
async fn unrelated_files_are_ignored_on_bulk_restore() {
    let fixture = Fixture::with_vaults(&["kv-dst"]);
    let target = MemoryVault::new();
    let temp = tempdir().unwrap();
    std::fs::write(temp.path().join("db-pass.secret.backup"), b"hunter2").unwrap();
    std::fs::write(temp.path().join("notes.txt"), b"unrelated").unwrap();
    std::fs::write(temp.path().join("foo.backup"), b"no kind tag").unwrap();

    let report = run_restore(
        &fixture.directory,
        &target,
        &fixture.roles,
        &fixture.identity,
        "kv-dst",
        RestoreSource::Directory(temp.path().to_path_buf()),
        &AutoApprove,
        fast_wait(),
    )
    .await
    .unwrap();

    assert!(report.is_clean());
    assert_eq!(report.secrets.attempted, 1);
    assert_eq!(target.item_count(), 1);
}

#[tokio::test]
async fn single_file_restore_rejects_unrecognized_names() {
    let fixture = Fixture::with_vaults(&["kv-dst"]);
    let target = MemoryVault::new();
    let temp = tempdir().unwrap();
    let odd_file = temp.path().join("foo.backup");
    std::fs::write(&odd_file, b"???").unwrap();

    let report = run_restore(
        &fixture.directory,
        &target,
        &fixture.roles,
        &fixture.identity,
        "kv-dst",
        RestoreSource::File(odd_file),
        &AutoApprove,
        fast_wait(),
    )
    .await
    .unwrap();

    assert_eq!(report.failures.len(), 1);
    assert!(report.failures[0].kind.is_none());
    assert!(report.failures[0].cause.contains("Unrecognized"));
    assert_eq!(target.item_count(), 0);
    assert_eq!(target.import_calls(), 0);
}

#[tokio::test]
async fn no_vault_calls_happen_when_access_is_denied() {
    let directory = MemoryDirectory::new();
    directory.add_vault("kv-locked");
    let roles = MemoryRoles::new(); // nothing granted
    let identity = IdentityRef::new("oid-x");
    let store = MemoryVault::new();
    store.put_secret("db-pass", b"hunter2".to_vec());
    let temp = tempdir().unwrap();

    let backup = run_backup(
        &directory,
        &store,
        &roles,
        &identity,
        "kv-locked",
        temp.path(),
        &DenyAll,
        fast_wait(),
    )
    .await;
    assert!(matches!(backup, Err(KvError::AccessDenied(_))));
    assert_eq!(store.export_calls(), 0);

    std::fs::write(temp.path().join("db-pass.secret.backup"), b"x").unwrap();
    let restore = run_restore(
        &directory,
        &store,
        &roles,
        &identity,
        "kv-locked",
        RestoreSource::Directory(temp.path().to_path_buf()),
        &DenyAll,
        fast_wait(),
    )
    .await;
    assert!(matches!(restore, Err(KvError::AccessDenied(_))));
    assert_eq!(store.import_calls(), 0);
}

#[tokio::test]
async fn self_elevation_grants_then_backs_up() {
    let directory = MemoryDirectory::new();
    let vault = directory.add_vault("kv-elevate");
    let roles = MemoryRoles::new();
    let identity = IdentityRef::new("oid-elevate");
    let store = MemoryVault::new();
    store.put_secret("db-pass", b"hunter2".to_vec());
    let temp = tempdir().unwrap();

    // One confirmation for the role grants; the fresh directory needs none.
    let consent = ScriptedConsent::new([true]);
    let report = run_backup(
        &directory,
        &store,
        &roles,
        &identity,
        "kv-elevate",
        temp.path(),
        &consent,
        fast_wait(),
    )
    .await
    .unwrap();

    assert!(report.is_clean());
    assert_eq!(roles.grant_calls(), 2);
    for role in REQUIRED_ROLES {
        assert!(roles.has_role(&identity, &vault.id, role).await.unwrap());
    }
    assert!(temp.path().join("db-pass.secret.backup").is_file());
}

#[tokio::test]
async fn scenario_db_pass_and_tls_cert() {
    // Vault V holds secret "db-pass" and certificate "tls-cert";
    // backup(V, dir) then restoreAll(V2, dir) reproduces both in V2.
    let fixture = Fixture::with_vaults(&["v", "v2"]);
    let v = MemoryVault::new();
    v.put_secret("db-pass", b"correct horse battery staple".to_vec());
    v.put_certificate("tls-cert", b"-----BEGIN PKCS12-----".to_vec());
    let temp = tempdir().unwrap();

    run_backup(
        &fixture.directory,
        &v,
        &fixture.roles,
        &fixture.identity,
        "v",
        temp.path(),
        &AutoApprove,
        fast_wait(),
    )
    .await
    .unwrap();

    assert!(temp.path().join("db-pass.secret.backup").is_file());
    assert!(temp.path().join("tls-cert.cert.backup").is_file());

    let v2 = MemoryVault::new();
    let report = run_restore(
        &fixture.directory,
        &v2,
        &fixture.roles,
        &fixture.identity,
        "v2",
        RestoreSource::Directory(temp.path().to_path_buf()),
        &AutoApprove,
        fast_wait(),
    )
    .await
    .unwrap();

    assert_eq!(report.restored, vec!["db-pass", "tls-cert"]);
    assert_eq!(v2.secret("db-pass").unwrap(), v.secret("db-pass").unwrap());
    assert_eq!(
        v2.certificate("tls-cert").unwrap(),
        v.certificate("tls-cert").unwrap()
    );
}
