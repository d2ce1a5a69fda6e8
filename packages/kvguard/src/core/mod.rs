//! Core backup/restore pipeline: access gate, catalog, engines, reports.

pub mod access;
pub mod backup;
pub mod catalog;
pub mod consent;
pub mod pipeline;
pub mod restore;
pub mod types;

pub use access::{AccessGate, PropagationWait};
pub use backup::BackupEngine;
pub use catalog::{Catalog, VaultCatalog};
pub use consent::{AutoApprove, Consent, DenyAll, ScriptedConsent};
pub use pipeline::{RestoreSource, run_backup, run_restore};
pub use restore::RestoreEngine;
pub use types::{
    BackupReport, IdentityRef, ItemFailure, ItemKind, KindTally, REQUIRED_ROLES, RestoreReport,
    RoleName, VaultItem, VaultRef,
};
