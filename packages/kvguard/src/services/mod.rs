//! Collaborator seams for the external cloud services.
//!
//! The core is a stateless transformation between a vault service and the
//! local filesystem; everything it needs from the cloud goes through
//! these traits. The production binding is the Azure REST implementation
//! in [`azure`]; [`memory`] holds in-memory doubles for tests and dry
//! runs.

use crate::core::types::{IdentityRef, RoleName, VaultItem, VaultRef};
use crate::error::KvResult;
use zeroize::Zeroizing;

pub mod azure;
pub mod memory;

/// Outcome of a role-grant request. A grant that failed because the
/// assignment already exists is success, not an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GrantOutcome {
    Granted,
    AlreadyGranted,
}

/// Resolves vault names to vault references.
pub trait VaultDirectory: Send + Sync {
    async fn resolve_vault(&self, name: &str) -> KvResult<VaultRef>;
}

/// Item listing, export and import against one vault.
///
/// Export returns the service's opaque backup blob; the caller stores it
/// verbatim and replays it byte-for-byte on import. Material is wrapped
/// in [`Zeroizing`] so it is wiped once written or replayed.
pub trait VaultStore: Send + Sync {
    async fn list_secrets(&self, vault: &VaultRef) -> KvResult<Vec<VaultItem>>;

    async fn list_certificates(&self, vault: &VaultRef) -> KvResult<Vec<VaultItem>>;

    async fn export_secret(&self, vault: &VaultRef, name: &str) -> KvResult<Zeroizing<Vec<u8>>>;

    async fn export_certificate(
        &self,
        vault: &VaultRef,
        name: &str,
    ) -> KvResult<Zeroizing<Vec<u8>>>;

    async fn import_secret(&self, vault: &VaultRef, name: &str, material: &[u8]) -> KvResult<()>;

    async fn import_certificate(
        &self,
        vault: &VaultRef,
        name: &str,
        material: &[u8],
    ) -> KvResult<()>;
}

/// Role-assignment queries and grants at a resource scope.
pub trait RoleAssignments: Send + Sync {
    async fn has_role(
        &self,
        identity: &IdentityRef,
        scope: &str,
        role: RoleName,
    ) -> KvResult<bool>;

    async fn grant_role(
        &self,
        identity: &IdentityRef,
        scope: &str,
        role: RoleName,
    ) -> KvResult<GrantOutcome>;
}
