//! Postgres-backed implementations of the storage traits.
//!
//! Each adapter delegates to the SQL functions on the model types.

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::common::{AgentId, PolicyId};
use crate::domains::agents::models::{Agent, NewAgent};
use crate::domains::auth::models::RefreshTokenRecord;
use crate::domains::otp::models::{Otp, OtpIssue};
use crate::domains::policy::models::{NewPolicy, NewPolicyApplication, Policy, PolicyApplication};
use crate::kernel::{BaseAgentStore, BaseOtpStore, BasePolicyStore, BaseRefreshTokenStore};

pub struct PgAgentStore {
    pool: PgPool,
}

impl PgAgentStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl BaseAgentStore for PgAgentStore {
    async fn find_by_id(&self, id: AgentId) -> Result<Option<Agent>> {
        Agent::find_by_id(id, &self.pool).await
    }

    async fn find_by_phone(&self, phone: &str) -> Result<Option<Agent>> {
        Agent::find_by_phone(phone, &self.pool).await
    }

    async fn find_by_phone_or_email(
        &self,
        phone: Option<&str>,
        email: Option<&str>,
    ) -> Result<Option<Agent>> {
        Agent::find_by_phone_or_email(phone, email, &self.pool).await
    }

    async fn insert(&self, agent: NewAgent) -> Result<Agent> {
        Agent::insert(&agent, &self.pool).await
    }

    async fn record_sign_in(&self, id: AgentId, at: DateTime<Utc>) -> Result<()> {
        Agent::record_sign_in(id, at, &self.pool).await
    }
}

pub struct PgOtpStore {
    pool: PgPool,
}

impl PgOtpStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl BaseOtpStore for PgOtpStore {
    async fn issue(&self, phone: &str, code: &str, now: DateTime<Utc>) -> Result<OtpIssue> {
        Otp::issue(phone, code, now, &self.pool).await
    }

    async fn consume(&self, phone: &str, code: &str, now: DateTime<Utc>) -> Result<Option<Otp>> {
        Otp::consume(phone, code, now, &self.pool).await
    }

    async fn purge_expired(&self, now: DateTime<Utc>) -> Result<u64> {
        Otp::purge_expired(now, &self.pool).await
    }
}

pub struct PgRefreshTokenStore {
    pool: PgPool,
}

impl PgRefreshTokenStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl BaseRefreshTokenStore for PgRefreshTokenStore {
    async fn insert(&self, record: RefreshTokenRecord) -> Result<RefreshTokenRecord> {
        record.insert(&self.pool).await
    }

    async fn find_by_token(&self, token: &str) -> Result<Option<RefreshTokenRecord>> {
        RefreshTokenRecord::find_by_token(token, &self.pool).await
    }

    async fn delete_by_user(&self, user_id: Uuid) -> Result<u64> {
        RefreshTokenRecord::delete_by_user(user_id, &self.pool).await
    }
}

pub struct PgPolicyStore {
    pool: PgPool,
}

impl PgPolicyStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl BasePolicyStore for PgPolicyStore {
    async fn insert(&self, policy: NewPolicy) -> Result<Policy> {
        Policy::insert(&policy, &self.pool).await
    }

    async fn find_by_id(&self, id: PolicyId) -> Result<Option<Policy>> {
        Policy::find_by_id(id, &self.pool).await
    }

    async fn insert_application(
        &self,
        application: NewPolicyApplication,
    ) -> Result<PolicyApplication> {
        PolicyApplication::insert(&application, &self.pool).await
    }
}
