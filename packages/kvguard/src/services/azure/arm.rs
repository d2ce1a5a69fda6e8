//! Azure Resource Manager client: vault resolution and role assignments.

use crate::core::types::{IdentityRef, RoleName, VaultRef};
use crate::error::{KvError, KvResult};
use crate::services::azure::auth::{ARM_SCOPE, TokenSource};
use crate::services::azure::check_status;
use crate::services::{GrantOutcome, RoleAssignments, VaultDirectory};
use serde::Deserialize;
use std::sync::Arc;
use uuid::Uuid;

const ARM_BASE: &str = "https://management.azure.com";
const RESOURCES_API_VERSION: &str = "2021-04-01";
const ROLE_ASSIGNMENTS_API_VERSION: &str = "2022-04-01";

pub struct AzureResourceManager {
    http: reqwest::Client,
    tokens: Arc<TokenSource>,
    subscription_id: String,
}

impl AzureResourceManager {
    pub fn new(http: reqwest::Client, tokens: Arc<TokenSource>, subscription_id: String) -> Self {
        AzureResourceManager {
            http,
            tokens,
            subscription_id,
        }
    }

    fn role_definition_id(&self, role: RoleName) -> String {
        format!(
            "/subscriptions/{}/providers/Microsoft.Authorization/roleDefinitions/{}",
            self.subscription_id,
            role.definition_id()
        )
    }
}

impl VaultDirectory for AzureResourceManager {
    async fn resolve_vault(&self, name: &str) -> KvResult<VaultRef> {
        let url = format!(
            "{}/subscriptions/{}/resources",
            ARM_BASE, self.subscription_id
        );
        let filter = format!(
            "resourceType eq 'Microsoft.KeyVault/vaults' and name eq '{name}'"
        );
        let bearer = self.tokens.bearer(ARM_SCOPE).await?;
        let response = self
            .http
            .get(&url)
            .query(&[("$filter", filter.as_str()), ("api-version", RESOURCES_API_VERSION)])
            .bearer_auth(bearer)
            .send()
            .await?;
        let listing: ResourceList = check_status(response).await?.json().await?;

        listing
            .value
            .into_iter()
            .find(|resource| resource.name.eq_ignore_ascii_case(name))
            .map(|resource| VaultRef {
                name: resource.name.clone(),
                id: resource.id,
                vault_uri: format!("https://{}.vault.azure.net", resource.name),
            })
            .ok_or_else(|| KvError::VaultNotFound(name.to_string()))
    }
}

impl RoleAssignments for AzureResourceManager {
    async fn has_role(
        &self,
        identity: &IdentityRef,
        scope: &str,
        role: RoleName,
    ) -> KvResult<bool> {
        let url = format!(
            "{}{}/providers/Microsoft.Authorization/roleAssignments",
            ARM_BASE, scope
        );
        let filter = format!("assignedTo('{}')", identity.object_id);
        let bearer = self.tokens.bearer(ARM_SCOPE).await?;
        let response = self
            .http
            .get(&url)
            .query(&[
                ("$filter", filter.as_str()),
                ("api-version", ROLE_ASSIGNMENTS_API_VERSION),
            ])
            .bearer_auth(bearer)
            .send()
            .await?;
        let listing: AssignmentList = check_status(response).await?.json().await?;

        Ok(listing.value.iter().any(|assignment| {
            assignment
                .properties
                .principal_id
                .eq_ignore_ascii_case(&identity.object_id)
                && assignment
                    .properties
                    .role_definition_id
                    .ends_with(role.definition_id())
        }))
    }

    async fn grant_role(
        &self,
        identity: &IdentityRef,
        scope: &str,
        role: RoleName,
    ) -> KvResult<GrantOutcome> {
        let assignment_name = Uuid::new_v4();
        let url = format!(
            "{}{}/providers/Microsoft.Authorization/roleAssignments/{}",
            ARM_BASE, scope, assignment_name
        );
        let bearer = self.tokens.bearer(ARM_SCOPE).await?;
        let response = self
            .http
            .put(&url)
            .query(&[("api-version", ROLE_ASSIGNMENTS_API_VERSION)])
            .bearer_auth(bearer)
            .json(&serde_json::json!({
                "properties": {
                    "roleDefinitionId": self.role_definition_id(role),
                    "principalId": identity.object_id,
                }
            }))
            .send()
            .await?;

        match check_status(response).await {
            Ok(_) => Ok(GrantOutcome::Granted),
            // The assignment already exists (a race or an earlier run).
            Err(KvError::Conflict(_)) => Ok(GrantOutcome::AlreadyGranted),
            Err(e) => Err(e),
        }
    }
}

#[derive(Deserialize)]
struct ResourceList {
    #[serde(default)]
    value: Vec<Resource>,
}

#[derive(Deserialize)]
struct Resource {
    id: String,
    name: String,
}

#[derive(Deserialize)]
struct AssignmentList {
    #[serde(default)]
    value: Vec<Assignment>,
}

#[derive(Deserialize)]
struct Assignment {
    properties: AssignmentProperties,
}

#[derive(Deserialize)]
struct AssignmentProperties {
    #[serde(rename = "principalId")]
    principal_id: String,
    #[serde(rename = "roleDefinitionId")]
    role_definition_id: String,
}
