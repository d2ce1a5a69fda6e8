//! Core data model: vault items, the on-disk filename contract, and run reports.

use crate::error::{KvError, KvResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// Kind of an item held in a vault.
///
/// The string form of the kind exists only at the filesystem boundary
/// (the backup filename tag); everything internal uses this enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemKind {
    Secret,
    Certificate,
}

impl ItemKind {
    /// Filename tag recording the kind in a backup file name.
    pub const fn tag(self) -> &'static str {
        match self {
            ItemKind::Secret => "secret",
            ItemKind::Certificate => "cert",
        }
    }

    /// Full filename suffix, the sole kind discriminator on restore.
    pub const fn suffix(self) -> &'static str {
        match self {
            ItemKind::Secret => ".secret.backup",
            ItemKind::Certificate => ".cert.backup",
        }
    }
}

impl fmt::Display for ItemKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ItemKind::Secret => write!(f, "secret"),
            ItemKind::Certificate => write!(f, "certificate"),
        }
    }
}

/// Build the backup file name for an item: `<name>.<tag>.backup`.
pub fn backup_file_name(item_name: &str, kind: ItemKind) -> String {
    format!("{}{}", item_name, kind.suffix())
}

/// Recover `(item name, kind)` from a backup file name.
///
/// Returns `None` for names carrying neither kind suffix, or whose item
/// name portion would be empty.
pub fn parse_backup_file_name(file_name: &str) -> Option<(String, ItemKind)> {
    for kind in [ItemKind::Secret, ItemKind::Certificate] {
        if let Some(stem) = file_name.strip_suffix(kind.suffix()) {
            if stem.is_empty() {
                return None;
            }
            return Some((stem.to_string(), kind));
        }
    }
    None
}

/// Recover `(item name, kind)` from a backup file path, rejecting paths
/// that do not follow the filename contract.
pub fn parse_backup_path(path: &Path) -> KvResult<(String, ItemKind)> {
    path.file_name()
        .and_then(|name| name.to_str())
        .and_then(parse_backup_file_name)
        .ok_or_else(|| KvError::UnrecognizedFormat(path.display().to_string()))
}

/// One secret or certificate held in a vault. Existence only; material is
/// fetched on demand through the vault service and never held here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VaultItem {
    pub name: String,
    pub kind: ItemKind,
}

impl VaultItem {
    pub fn new(name: impl Into<String>, kind: ItemKind) -> Self {
        VaultItem {
            name: name.into(),
            kind,
        }
    }
}

/// A resolved vault: display name, ARM resource id (the RBAC scope) and
/// the data-plane URI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VaultRef {
    pub name: String,
    pub id: String,
    pub vault_uri: String,
}

/// The acting identity, passed explicitly into every collaborator call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentityRef {
    pub object_id: String,
}

impl IdentityRef {
    pub fn new(object_id: impl Into<String>) -> Self {
        IdentityRef {
            object_id: object_id.into(),
        }
    }
}

/// The two item-level roles required on the target vault.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RoleName {
    SecretsOfficer,
    CertificatesOfficer,
}

pub const REQUIRED_ROLES: [RoleName; 2] = [RoleName::SecretsOfficer, RoleName::CertificatesOfficer];

impl RoleName {
    /// Azure built-in role display name.
    pub const fn display_name(self) -> &'static str {
        match self {
            RoleName::SecretsOfficer => "Key Vault Secrets Officer",
            RoleName::CertificatesOfficer => "Key Vault Certificates Officer",
        }
    }

    /// GUID of the built-in role definition.
    pub const fn definition_id(self) -> &'static str {
        match self {
            RoleName::SecretsOfficer => "b86a8fe4-44ce-4948-aee5-eccb2c155cd7",
            RoleName::CertificatesOfficer => "a4417e6f-fecd-4de8-b567-7b0420556985",
        }
    }
}

impl fmt::Display for RoleName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

/// Per-kind attempt counters for a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KindTally {
    pub attempted: usize,
    pub succeeded: usize,
    pub failed: usize,
}

impl KindTally {
    pub fn record_success(&mut self) {
        self.attempted += 1;
        self.succeeded += 1;
    }

    pub fn record_failure(&mut self) {
        self.attempted += 1;
        self.failed += 1;
    }
}

/// One failed item, in the order encountered.
///
/// `kind` is absent when the failure happened before the kind could be
/// determined (an unrecognized file name).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItemFailure {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<ItemKind>,
    pub cause: String,
}

/// A listing partition that could not be enumerated. The other partition
/// still flows downstream.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PartitionFailure {
    pub kind: ItemKind,
    pub cause: String,
}

/// Outcome of one backup run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackupReport {
    pub vault: String,
    pub secrets: KindTally,
    pub certificates: KindTally,
    pub failures: Vec<ItemFailure>,
    pub listing_failures: Vec<PartitionFailure>,
    pub files: Vec<PathBuf>,
    pub completed_at: DateTime<Utc>,
}

impl BackupReport {
    pub fn new(vault: impl Into<String>) -> Self {
        BackupReport {
            vault: vault.into(),
            secrets: KindTally::default(),
            certificates: KindTally::default(),
            failures: Vec::new(),
            listing_failures: Vec::new(),
            files: Vec::new(),
            completed_at: Utc::now(),
        }
    }

    pub fn tally_mut(&mut self, kind: ItemKind) -> &mut KindTally {
        match kind {
            ItemKind::Secret => &mut self.secrets,
            ItemKind::Certificate => &mut self.certificates,
        }
    }

    /// True when every attempted item succeeded and both partitions listed.
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty() && self.listing_failures.is_empty()
    }
}

/// Outcome of one restore run, symmetric to [`BackupReport`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RestoreReport {
    pub vault: String,
    pub secrets: KindTally,
    pub certificates: KindTally,
    pub failures: Vec<ItemFailure>,
    pub restored: Vec<String>,
    pub completed_at: DateTime<Utc>,
}

impl RestoreReport {
    pub fn new(vault: impl Into<String>) -> Self {
        RestoreReport {
            vault: vault.into(),
            secrets: KindTally::default(),
            certificates: KindTally::default(),
            failures: Vec::new(),
            restored: Vec::new(),
            completed_at: Utc::now(),
        }
    }

    pub fn tally_mut(&mut self, kind: ItemKind) -> &mut KindTally {
        match kind {
            ItemKind::Secret => &mut self.secrets,
            ItemKind::Certificate => &mut self.certificates,
        }
    }

    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}
