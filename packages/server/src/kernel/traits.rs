// Trait definitions for dependency injection
//
// These are INFRASTRUCTURE traits only - no business logic.
// Business rules (OTP windows, role dispatch, policy validation) live in the
// domain actions that call these traits.
//
// Naming convention: Base* for trait names (e.g., BaseOtpStore, BaseSmsService)

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::common::{AgentId, PolicyId};
use crate::domains::agents::models::{Agent, NewAgent};
use crate::domains::auth::models::RefreshTokenRecord;
use crate::domains::otp::models::{Otp, OtpIssue};
use crate::domains::policy::models::{NewPolicy, NewPolicyApplication, Policy, PolicyApplication};

// =============================================================================
// Agent Store
// =============================================================================

#[async_trait]
pub trait BaseAgentStore: Send + Sync {
    async fn find_by_id(&self, id: AgentId) -> Result<Option<Agent>>;

    async fn find_by_phone(&self, phone: &str) -> Result<Option<Agent>>;

    /// First agent whose phone or email matches; a `None` argument never matches.
    async fn find_by_phone_or_email(
        &self,
        phone: Option<&str>,
        email: Option<&str>,
    ) -> Result<Option<Agent>>;

    async fn insert(&self, agent: NewAgent) -> Result<Agent>;

    async fn record_sign_in(&self, id: AgentId, at: DateTime<Utc>) -> Result<()>;
}

// =============================================================================
// OTP Store
// =============================================================================

#[async_trait]
pub trait BaseOtpStore: Send + Sync {
    /// Atomically store `code` for `phone` unless an unexpired code exists.
    async fn issue(&self, phone: &str, code: &str, now: DateTime<Utc>) -> Result<OtpIssue>;

    /// Atomically delete and return the matching unexpired code.
    async fn consume(&self, phone: &str, code: &str, now: DateTime<Utc>) -> Result<Option<Otp>>;

    async fn purge_expired(&self, now: DateTime<Utc>) -> Result<u64>;
}

// =============================================================================
// Refresh Token Store
// =============================================================================

#[async_trait]
pub trait BaseRefreshTokenStore: Send + Sync {
    async fn insert(&self, record: RefreshTokenRecord) -> Result<RefreshTokenRecord>;

    async fn find_by_token(&self, token: &str) -> Result<Option<RefreshTokenRecord>>;

    /// Returns the number of records removed.
    async fn delete_by_user(&self, user_id: Uuid) -> Result<u64>;
}

// =============================================================================
// Policy Store
// =============================================================================

#[async_trait]
pub trait BasePolicyStore: Send + Sync {
    async fn insert(&self, policy: NewPolicy) -> Result<Policy>;

    async fn find_by_id(&self, id: PolicyId) -> Result<Option<Policy>>;

    async fn insert_application(
        &self,
        application: NewPolicyApplication,
    ) -> Result<PolicyApplication>;
}

// =============================================================================
// SMS Trait (Infrastructure - OTP delivery)
// =============================================================================

#[async_trait]
pub trait BaseSmsService: Send + Sync {
    async fn send_sms(&self, to: &str, body: &str) -> Result<()>;
}

// =============================================================================
// Media Store Trait (Infrastructure - object storage)
// =============================================================================

/// A file received from a client, held in memory until relayed.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub field_name: String,
    pub file_name: String,
    pub content_type: Option<String>,
    pub bytes: bytes::Bytes,
}

#[async_trait]
pub trait BaseMediaStore: Send + Sync {
    /// Store the file under `folder` and return its public URL.
    async fn upload(&self, file: UploadedFile, folder: &str) -> Result<String>;
}
