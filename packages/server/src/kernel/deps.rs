//! Server dependencies for actions (using traits for testability)
//!
//! This module provides the central dependency container used by all domain
//! actions and HTTP handlers. Storage and external services sit behind
//! `Base*` traits so tests can swap in the in-memory versions.

use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::info;
use twilio::TwilioService;

use crate::config::Config;
use crate::domains::auth::{JwtService, UserDirectory};
use crate::kernel::{
    BaseAgentStore, BaseMediaStore, BaseOtpStore, BasePolicyStore, BaseRefreshTokenStore,
    BaseSmsService,
};

// =============================================================================
// TwilioService Adapter (implements BaseSmsService trait)
// =============================================================================

/// Wrapper around TwilioService that implements BaseSmsService trait
pub struct TwilioAdapter(pub Arc<TwilioService>);

impl TwilioAdapter {
    pub fn new(service: Arc<TwilioService>) -> Self {
        Self(service)
    }
}

#[async_trait]
impl BaseSmsService for TwilioAdapter {
    async fn send_sms(&self, to: &str, body: &str) -> Result<()> {
        self.0
            .send_sms(to, body)
            .await
            .map(|_| ())
            .map_err(|e| anyhow::anyhow!("{}", e))
    }
}

/// Fallback when no SMS provider is configured: the message goes to the log.
pub struct LoggingSmsService;

#[async_trait]
impl BaseSmsService for LoggingSmsService {
    async fn send_sms(&self, to: &str, body: &str) -> Result<()> {
        info!(to = %to, body = %body, "SMS delivery not configured, logging message");
        Ok(())
    }
}

// =============================================================================
// ServerDeps
// =============================================================================

/// Server dependencies accessible to actions (using traits for testability)
#[derive(Clone)]
pub struct ServerDeps {
    pub config: Arc<Config>,
    pub agents: Arc<dyn BaseAgentStore>,
    pub otps: Arc<dyn BaseOtpStore>,
    pub refresh_tokens: Arc<dyn BaseRefreshTokenStore>,
    pub policies: Arc<dyn BasePolicyStore>,
    pub sms: Arc<dyn BaseSmsService>,
    /// Object storage for uploads; `None` when credentials are absent.
    pub media: Option<Arc<dyn BaseMediaStore>>,
    /// Token issuance and revocation (shares `refresh_tokens`)
    pub jwt_service: Arc<JwtService>,
    /// Role-to-collection lookup (shares `agents`)
    pub users: UserDirectory,
}

impl ServerDeps {
    /// Create new ServerDeps with the given dependencies
    pub fn new(
        config: Config,
        agents: Arc<dyn BaseAgentStore>,
        otps: Arc<dyn BaseOtpStore>,
        refresh_tokens: Arc<dyn BaseRefreshTokenStore>,
        policies: Arc<dyn BasePolicyStore>,
        sms: Arc<dyn BaseSmsService>,
        media: Option<Arc<dyn BaseMediaStore>>,
    ) -> Self {
        let jwt_service = Arc::new(JwtService::new(&config, refresh_tokens.clone()));
        let users = UserDirectory::new(agents.clone());

        Self {
            config: Arc::new(config),
            agents,
            otps,
            refresh_tokens,
            policies,
            sms,
            media,
            jwt_service,
            users,
        }
    }
}
