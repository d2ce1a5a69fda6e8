pub mod cli;
pub mod config;
pub mod core;
pub mod error;
pub mod logging;
pub mod services;

// Re-export the public API
pub use crate::config::KvGuardConfig;
pub use crate::core::{
    AccessGate, BackupEngine, BackupReport, Consent, IdentityRef, ItemKind, PropagationWait,
    RestoreEngine, RestoreReport, RestoreSource, RoleName, VaultCatalog, VaultItem, VaultRef,
    run_backup, run_restore,
};
pub use crate::error::{KvError, KvResult};
pub use crate::services::{RoleAssignments, VaultDirectory, VaultStore};
