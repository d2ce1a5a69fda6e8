//! Role verification and self-elevation for the acting identity.
//!
//! Before any item is touched, the gate checks the two required
//! item-level roles on the vault scope. Missing roles are granted only
//! with operator consent; a grant that hits an already-existing
//! assignment counts as success. Role-assignment systems in this domain
//! are eventually consistent, so after any grant the gate polls
//! visibility until a deadline before letting the run proceed.

use crate::core::consent::Consent;
use crate::core::types::{IdentityRef, REQUIRED_ROLES, RoleName};
use crate::logging::log_admin_event;
use crate::services::{GrantOutcome, RoleAssignments};
use log::{info, warn};
use std::time::Duration;

/// How long and how often to poll for role-grant visibility.
#[derive(Debug, Clone, Copy)]
pub struct PropagationWait {
    pub poll_interval: Duration,
    pub deadline: Duration,
}

impl Default for PropagationWait {
    fn default() -> Self {
        PropagationWait {
            poll_interval: Duration::from_secs(5),
            deadline: Duration::from_secs(120),
        }
    }
}

pub struct AccessGate<'a, R: RoleAssignments> {
    roles: &'a R,
    wait: PropagationWait,
}

impl<'a, R: RoleAssignments> AccessGate<'a, R> {
    pub fn new(roles: &'a R, wait: PropagationWait) -> Self {
        AccessGate { roles, wait }
    }

    /// Verify the identity holds every required role on the vault scope,
    /// offering to grant missing ones. Returns `Ok(false)` when any
    /// required role remains absent (operator declined, or a grant
    /// failed); the caller must not proceed in that case.
    pub async fn ensure_access(
        &self,
        identity: &IdentityRef,
        scope: &str,
        consent: &dyn Consent,
    ) -> crate::error::KvResult<bool> {
        let mut missing = Vec::new();
        for role in REQUIRED_ROLES {
            if self.roles.has_role(identity, scope, role).await? {
                info!("Role '{}' already present on {}", role, scope);
            } else {
                warn!("Role '{}' missing on {}", role, scope);
                missing.push(role);
            }
        }

        if missing.is_empty() {
            return Ok(true);
        }

        let role_list = missing
            .iter()
            .map(|role| role.display_name())
            .collect::<Vec<_>>()
            .join(", ");
        let prompt = format!("Grant missing role(s) [{role_list}] on {scope}?");
        if !consent.confirm(&prompt) {
            log_admin_event("ROLE_GRANT", "declined by operator", false);
            return Ok(false);
        }

        let mut still_missing = false;
        let mut granted = Vec::new();
        for role in missing {
            match self.roles.grant_role(identity, scope, role).await {
                Ok(GrantOutcome::Granted) => {
                    log_admin_event("ROLE_GRANT", role.display_name(), true);
                    granted.push(role);
                }
                Ok(GrantOutcome::AlreadyGranted) => {
                    // Lost a race with another grant; the role is there.
                    info!("Role '{}' was already granted on {}", role, scope);
                    granted.push(role);
                }
                Err(e) => {
                    log_admin_event(
                        "ROLE_GRANT",
                        &format!("{}: {}", role.display_name(), e),
                        false,
                    );
                    still_missing = true;
                }
            }
        }

        self.await_propagation(identity, scope, &granted).await;

        Ok(!still_missing)
    }

    /// Poll until every freshly granted role is visible or the deadline
    /// passes. Query errors during polling count as not-yet-visible.
    async fn await_propagation(&self, identity: &IdentityRef, scope: &str, granted: &[RoleName]) {
        if granted.is_empty() {
            return;
        }

        info!(
            "Waiting for role propagation ({} role(s), up to {:?})",
            granted.len(),
            self.wait.deadline
        );
        let deadline = tokio::time::Instant::now() + self.wait.deadline;
        loop {
            let mut all_visible = true;
            for role in granted {
                match self.roles.has_role(identity, scope, *role).await {
                    Ok(true) => {}
                    _ => {
                        all_visible = false;
                        break;
                    }
                }
            }
            if all_visible {
                info!("All granted roles are visible on {}", scope);
                return;
            }
            if tokio::time::Instant::now() >= deadline {
                warn!(
                    "Role propagation not confirmed within {:?}; proceeding anyway",
                    self.wait.deadline
                );
                return;
            }
            tokio::time::sleep(self.wait.poll_interval).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::consent::{DenyAll, ScriptedConsent};
    use crate::services::memory::MemoryRoles;

    fn fast_wait() -> PropagationWait {
        PropagationWait {
            poll_interval: Duration::from_millis(1),
            deadline: Duration::from_millis(20),
        }
    }

    fn identity() -> IdentityRef {
        IdentityRef::new("11111111-1111-1111-1111-111111111111")
    }

    const SCOPE: &str = "/subscriptions/s/resourceGroups/rg/providers/Microsoft.KeyVault/vaults/kv";

    #[tokio::test]
    async fn passes_without_side_effects_when_roles_present() {
        let roles = MemoryRoles::new();
        let identity = identity();
        for role in REQUIRED_ROLES {
            roles.grant(&identity, SCOPE, role);
        }

        let gate = AccessGate::new(&roles, fast_wait());
        let granted = gate
            .ensure_access(&identity, SCOPE, &DenyAll)
            .await
            .unwrap();

        assert!(granted);
        assert_eq!(roles.grant_calls(), 0);
    }

    #[tokio::test]
    async fn denied_consent_blocks_the_run() {
        let roles = MemoryRoles::new();
        let identity = identity();

        let gate = AccessGate::new(&roles, fast_wait());
        let granted = gate
            .ensure_access(&identity, SCOPE, &DenyAll)
            .await
            .unwrap();

        assert!(!granted);
        assert_eq!(roles.grant_calls(), 0);
    }

    #[tokio::test]
    async fn grants_missing_roles_with_consent() {
        let roles = MemoryRoles::new();
        let identity = identity();
        roles.grant(&identity, SCOPE, RoleName::SecretsOfficer);

        let consent = ScriptedConsent::new([true]);
        let gate = AccessGate::new(&roles, fast_wait());
        let granted = gate
            .ensure_access(&identity, SCOPE, &consent)
            .await
            .unwrap();

        assert!(granted);
        assert_eq!(roles.grant_calls(), 1);
        assert!(roles
            .has_role(&identity, SCOPE, RoleName::CertificatesOfficer)
            .await
            .unwrap());
        let prompts = consent.prompts();
        assert_eq!(prompts.len(), 1);
        assert!(prompts[0].contains("Key Vault Certificates Officer"));
        assert!(!prompts[0].contains("Key Vault Secrets Officer"));
    }

    #[tokio::test]
    async fn grant_conflict_counts_as_success() {
        let roles = MemoryRoles::new();
        let identity = identity();

        // Both grants race ahead of the gate's check.
        for role in REQUIRED_ROLES {
            let outcome = roles.grant_role(&identity, SCOPE, role).await.unwrap();
            assert_eq!(outcome, GrantOutcome::Granted);
        }
        for role in REQUIRED_ROLES {
            let outcome = roles.grant_role(&identity, SCOPE, role).await.unwrap();
            assert_eq!(outcome, GrantOutcome::AlreadyGranted);
        }

        let gate = AccessGate::new(&roles, fast_wait());
        assert!(gate
            .ensure_access(&identity, SCOPE, &DenyAll)
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn failed_grant_blocks_the_run() {
        let roles = MemoryRoles::new();
        let identity = identity();
        roles.fail_grant(RoleName::CertificatesOfficer);

        let consent = ScriptedConsent::new([true]);
        let gate = AccessGate::new(&roles, fast_wait());
        let granted = gate
            .ensure_access(&identity, SCOPE, &consent)
            .await
            .unwrap();

        assert!(!granted);
        // The secrets role still went through.
        assert!(roles
            .has_role(&identity, SCOPE, RoleName::SecretsOfficer)
            .await
            .unwrap());
    }
}
