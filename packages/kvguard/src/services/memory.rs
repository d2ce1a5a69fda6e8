//! In-memory service doubles.
//!
//! Back the test suite and dry runs with the same traits the Azure
//! binding implements. Items live in ordered maps so listing order is
//! deterministic; per-item failures can be injected and operation calls
//! are counted.

use crate::core::types::{IdentityRef, ItemKind, RoleName, VaultItem, VaultRef};
use crate::error::{KvError, KvResult};
use crate::services::{GrantOutcome, RoleAssignments, VaultDirectory, VaultStore};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use zeroize::Zeroizing;

/// In-memory vault holding secrets and certificates as raw bytes.
#[derive(Default)]
pub struct MemoryVault {
    secrets: Mutex<BTreeMap<String, Vec<u8>>>,
    certificates: Mutex<BTreeMap<String, Vec<u8>>>,
    fail_exports: Mutex<HashSet<String>>,
    fail_imports: Mutex<HashSet<String>>,
    export_calls: AtomicUsize,
    import_calls: AtomicUsize,
}

impl MemoryVault {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put_secret(&self, name: impl Into<String>, material: impl Into<Vec<u8>>) {
        if let Ok(mut secrets) = self.secrets.lock() {
            secrets.insert(name.into(), material.into());
        }
    }

    pub fn put_certificate(&self, name: impl Into<String>, material: impl Into<Vec<u8>>) {
        if let Ok(mut certificates) = self.certificates.lock() {
            certificates.insert(name.into(), material.into());
        }
    }

    pub fn secret(&self, name: &str) -> Option<Vec<u8>> {
        self.secrets.lock().ok()?.get(name).cloned()
    }

    pub fn certificate(&self, name: &str) -> Option<Vec<u8>> {
        self.certificates.lock().ok()?.get(name).cloned()
    }

    pub fn item_count(&self) -> usize {
        let secrets = self.secrets.lock().map(|s| s.len()).unwrap_or(0);
        let certificates = self.certificates.lock().map(|c| c.len()).unwrap_or(0);
        secrets + certificates
    }

    /// Make every export of the named item fail.
    pub fn fail_export(&self, name: impl Into<String>) {
        if let Ok(mut failing) = self.fail_exports.lock() {
            failing.insert(name.into());
        }
    }

    /// Make every import of the named item fail.
    pub fn fail_import(&self, name: impl Into<String>) {
        if let Ok(mut failing) = self.fail_imports.lock() {
            failing.insert(name.into());
        }
    }

    pub fn export_calls(&self) -> usize {
        self.export_calls.load(Ordering::SeqCst)
    }

    pub fn import_calls(&self) -> usize {
        self.import_calls.load(Ordering::SeqCst)
    }

    fn export_from(
        &self,
        items: &Mutex<BTreeMap<String, Vec<u8>>>,
        name: &str,
    ) -> KvResult<Zeroizing<Vec<u8>>> {
        self.export_calls.fetch_add(1, Ordering::SeqCst);
        if self
            .fail_exports
            .lock()
            .map(|failing| failing.contains(name))
            .unwrap_or(false)
        {
            return Err(KvError::Service(format!("injected export failure: {name}")));
        }
        items
            .lock()
            .ok()
            .and_then(|items| items.get(name).cloned())
            .map(Zeroizing::new)
            .ok_or_else(|| KvError::Service(format!("item not found: {name}")))
    }

    fn import_into(
        &self,
        items: &Mutex<BTreeMap<String, Vec<u8>>>,
        name: &str,
        material: &[u8],
    ) -> KvResult<()> {
        self.import_calls.fetch_add(1, Ordering::SeqCst);
        if self
            .fail_imports
            .lock()
            .map(|failing| failing.contains(name))
            .unwrap_or(false)
        {
            return Err(KvError::Service(format!("injected import failure: {name}")));
        }
        if let Ok(mut items) = items.lock() {
            items.insert(name.to_string(), material.to_vec());
        }
        Ok(())
    }

    fn list(items: &Mutex<BTreeMap<String, Vec<u8>>>, kind: ItemKind) -> Vec<VaultItem> {
        items
            .lock()
            .map(|items| {
                items
                    .keys()
                    .map(|name| VaultItem::new(name.clone(), kind))
                    .collect()
            })
            .unwrap_or_default()
    }
}

impl VaultStore for MemoryVault {
    async fn list_secrets(&self, _vault: &VaultRef) -> KvResult<Vec<VaultItem>> {
        Ok(Self::list(&self.secrets, ItemKind::Secret))
    }

    async fn list_certificates(&self, _vault: &VaultRef) -> KvResult<Vec<VaultItem>> {
        Ok(Self::list(&self.certificates, ItemKind::Certificate))
    }

    async fn export_secret(&self, _vault: &VaultRef, name: &str) -> KvResult<Zeroizing<Vec<u8>>> {
        self.export_from(&self.secrets, name)
    }

    async fn export_certificate(
        &self,
        _vault: &VaultRef,
        name: &str,
    ) -> KvResult<Zeroizing<Vec<u8>>> {
        self.export_from(&self.certificates, name)
    }

    async fn import_secret(&self, _vault: &VaultRef, name: &str, material: &[u8]) -> KvResult<()> {
        self.import_into(&self.secrets, name, material)
    }

    async fn import_certificate(
        &self,
        _vault: &VaultRef,
        name: &str,
        material: &[u8],
    ) -> KvResult<()> {
        self.import_into(&self.certificates, name, material)
    }
}

/// In-memory vault directory.
#[derive(Default)]
pub struct MemoryDirectory {
    vaults: Mutex<HashMap<String, VaultRef>>,
}

impl MemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a vault under a synthetic resource id and data-plane URI.
    pub fn add_vault(&self, name: &str) -> VaultRef {
        let vault = VaultRef {
            name: name.to_string(),
            id: format!(
                "/subscriptions/00000000-0000-0000-0000-000000000000/resourceGroups/rg/providers/Microsoft.KeyVault/vaults/{name}"
            ),
            vault_uri: format!("https://{name}.vault.example"),
        };
        if let Ok(mut vaults) = self.vaults.lock() {
            vaults.insert(name.to_string(), vault.clone());
        }
        vault
    }
}

impl VaultDirectory for MemoryDirectory {
    async fn resolve_vault(&self, name: &str) -> KvResult<VaultRef> {
        self.vaults
            .lock()
            .ok()
            .and_then(|vaults| vaults.get(name).cloned())
            .ok_or_else(|| KvError::VaultNotFound(name.to_string()))
    }
}

/// In-memory role-assignment service.
///
/// A grant for an already-present assignment reports `AlreadyGranted`,
/// matching the Conflict semantics of the real service.
#[derive(Default)]
pub struct MemoryRoles {
    grants: Mutex<HashSet<(String, String, RoleName)>>,
    fail_grants: Mutex<HashSet<RoleName>>,
    grant_calls: AtomicUsize,
}

impl MemoryRoles {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed an existing assignment.
    pub fn grant(&self, identity: &IdentityRef, scope: &str, role: RoleName) {
        if let Ok(mut grants) = self.grants.lock() {
            grants.insert((identity.object_id.clone(), scope.to_string(), role));
        }
    }

    /// Make every grant request for the role fail.
    pub fn fail_grant(&self, role: RoleName) {
        if let Ok(mut failing) = self.fail_grants.lock() {
            failing.insert(role);
        }
    }

    pub fn grant_calls(&self) -> usize {
        self.grant_calls.load(Ordering::SeqCst)
    }
}

impl RoleAssignments for MemoryRoles {
    async fn has_role(
        &self,
        identity: &IdentityRef,
        scope: &str,
        role: RoleName,
    ) -> KvResult<bool> {
        Ok(self
            .grants
            .lock()
            .map(|grants| {
                grants.contains(&(identity.object_id.clone(), scope.to_string(), role))
            })
            .unwrap_or(false))
    }

    async fn grant_role(
        &self,
        identity: &IdentityRef,
        scope: &str,
        role: RoleName,
    ) -> KvResult<GrantOutcome> {
        self.grant_calls.fetch_add(1, Ordering::SeqCst);
        if self
            .fail_grants
            .lock()
            .map(|failing| failing.contains(&role))
            .unwrap_or(false)
        {
            return Err(KvError::Service(format!(
                "injected grant failure: {}",
                role.display_name()
            )));
        }
        let key = (identity.object_id.clone(), scope.to_string(), role);
        let mut grants = self
            .grants
            .lock()
            .map_err(|_| KvError::Service("role store poisoned".to_string()))?;
        if grants.contains(&key) {
            return Ok(GrantOutcome::AlreadyGranted);
        }
        grants.insert(key);
        Ok(GrantOutcome::Granted)
    }
}
