//! Role resolution: maps a role name to the user collection that backs it.
//!
//! Only agents have a collection today. Adding a role's storage means adding
//! a `UserCollection` variant; the exhaustive match in
//! [`UserDirectory::collection`] then forces the new arm.

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use uuid::Uuid;

use crate::common::{AgentId, AppError};
use crate::domains::agents::models::Agent;
use crate::kernel::BaseAgentStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Customer,
    Vendor,
    Agent,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Customer => "customer",
            Role::Vendor => "vendor",
            Role::Agent => "agent",
            Role::Admin => "admin",
        }
    }

    /// Case- and whitespace-insensitive parse.
    pub fn parse(raw: &str) -> Result<Self, AppError> {
        match raw.trim().to_lowercase().as_str() {
            "customer" => Ok(Role::Customer),
            "vendor" => Ok(Role::Vendor),
            "agent" => Ok(Role::Agent),
            "admin" => Ok(Role::Admin),
            _ => Err(AppError::InvalidRole(raw.trim().to_string())),
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A loaded user of any role.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum UserAccount {
    Agent(Agent),
}

impl UserAccount {
    pub fn id(&self) -> Uuid {
        match self {
            UserAccount::Agent(agent) => agent.id.into_uuid(),
        }
    }

    pub fn phone(&self) -> &str {
        match self {
            UserAccount::Agent(agent) => &agent.phone,
        }
    }

    pub fn role(&self) -> Role {
        match self {
            UserAccount::Agent(_) => Role::Agent,
        }
    }
}

/// Storage for one role's users.
#[derive(Clone, Copy)]
pub enum UserCollection<'a> {
    Agents(&'a dyn BaseAgentStore),
}

impl UserCollection<'_> {
    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<UserAccount>> {
        match self {
            UserCollection::Agents(store) => Ok(store
                .find_by_id(AgentId::from_uuid(id))
                .await?
                .map(UserAccount::Agent)),
        }
    }

    pub async fn find_by_phone_or_email(
        &self,
        phone: Option<&str>,
        email: Option<&str>,
    ) -> Result<Option<UserAccount>> {
        match self {
            UserCollection::Agents(store) => Ok(store
                .find_by_phone_or_email(phone, email)
                .await?
                .map(UserAccount::Agent)),
        }
    }

    pub async fn record_sign_in(&self, user: &UserAccount, at: DateTime<Utc>) -> Result<()> {
        match (self, user) {
            (UserCollection::Agents(store), UserAccount::Agent(agent)) => {
                store.record_sign_in(agent.id, at).await
            }
        }
    }
}

/// Role-to-collection lookup shared by login and session verification.
#[derive(Clone)]
pub struct UserDirectory {
    agents: Arc<dyn BaseAgentStore>,
}

impl UserDirectory {
    pub fn new(agents: Arc<dyn BaseAgentStore>) -> Self {
        Self { agents }
    }

    pub fn collection(&self, role: Role) -> Result<UserCollection<'_>, AppError> {
        match role {
            Role::Agent => Ok(UserCollection::Agents(self.agents.as_ref())),
            Role::Customer | Role::Vendor | Role::Admin => Err(AppError::NotImplemented(
                format!("{} model not implemented", role),
            )),
        }
    }

    /// Parse a raw role name and return it with its collection.
    pub fn resolve(&self, raw: &str) -> Result<(Role, UserCollection<'_>), AppError> {
        let role = Role::parse(raw)?;
        Ok((role, self.collection(role)?))
    }
}
