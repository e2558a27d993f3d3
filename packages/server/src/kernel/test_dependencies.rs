// TestDependencies - in-memory implementations for testing
//
// Provides store and service fakes that can be injected into ServerDeps so
// actions and the HTTP router run without Postgres or network access.

use anyhow::{bail, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use uuid::Uuid;

use super::{
    BaseAgentStore, BaseMediaStore, BaseOtpStore, BasePolicyStore, BaseRefreshTokenStore,
    BaseSmsService, ServerDeps, UploadedFile,
};
use crate::common::{AgentId, PolicyId};
use crate::config::Config;
use crate::domains::agents::models::{Agent, NewAgent};
use crate::domains::auth::models::RefreshTokenRecord;
use crate::domains::otp::models::{Otp, OtpIssue};
use crate::domains::policy::models::{NewPolicy, NewPolicyApplication, Policy, PolicyApplication};

// =============================================================================
// Agent Store
// =============================================================================

#[derive(Default)]
pub struct InMemoryAgentStore {
    agents: Mutex<Vec<Agent>>,
    reject_inserts: AtomicBool,
}

impl InMemoryAgentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed an agent directly, bypassing registration.
    pub fn seed(&self, name: &str, email: &str, phone: &str) -> Agent {
        let agent = Agent::from_new(
            NewAgent {
                name: name.to_string(),
                email: email.to_string(),
                phone: phone.to_string(),
                metadata: HashMap::new(),
            },
            Utc::now(),
        );
        self.agents.lock().unwrap().push(agent.clone());
        agent
    }

    /// Make later inserts fail as if another request took the phone first.
    pub fn reject_inserts(&self) {
        self.reject_inserts.store(true, Ordering::SeqCst);
    }

    pub fn all(&self) -> Vec<Agent> {
        self.agents.lock().unwrap().clone()
    }

    pub fn get(&self, id: AgentId) -> Option<Agent> {
        self.agents.lock().unwrap().iter().find(|a| a.id == id).cloned()
    }
}

#[async_trait]
impl BaseAgentStore for InMemoryAgentStore {
    async fn find_by_id(&self, id: AgentId) -> Result<Option<Agent>> {
        Ok(self.get(id))
    }

    async fn find_by_phone(&self, phone: &str) -> Result<Option<Agent>> {
        Ok(self
            .agents
            .lock()
            .unwrap()
            .iter()
            .find(|a| a.phone == phone)
            .cloned())
    }

    async fn find_by_phone_or_email(
        &self,
        phone: Option<&str>,
        email: Option<&str>,
    ) -> Result<Option<Agent>> {
        Ok(self
            .agents
            .lock()
            .unwrap()
            .iter()
            .find(|a| phone == Some(a.phone.as_str()) || email == Some(a.email.as_str()))
            .cloned())
    }

    async fn insert(&self, agent: NewAgent) -> Result<Agent> {
        let mut agents = self.agents.lock().unwrap();
        if self.reject_inserts.load(Ordering::SeqCst)
            || agents
            .iter()
            .any(|a| a.phone == agent.phone || a.email == agent.email)
        {
            bail!("duplicate key value violates unique constraint on agents");
        }
        let agent = Agent::from_new(agent, Utc::now());
        agents.push(agent.clone());
        Ok(agent)
    }

    async fn record_sign_in(&self, id: AgentId, at: DateTime<Utc>) -> Result<()> {
        if let Some(agent) = self.agents.lock().unwrap().iter_mut().find(|a| a.id == id) {
            agent.last_signed_in = Some(at);
            agent.updated_at = at;
        }
        Ok(())
    }
}

// =============================================================================
// OTP Store
// =============================================================================

/// Keyed by phone, mirroring the unique `phone` column.
#[derive(Default)]
pub struct InMemoryOtpStore {
    otps: Mutex<HashMap<String, Otp>>,
}

impl InMemoryOtpStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a row as-is (e.g. an already expired one).
    pub fn insert_raw(&self, otp: Otp) {
        self.otps.lock().unwrap().insert(otp.phone.clone(), otp);
    }

    pub fn get(&self, phone: &str) -> Option<Otp> {
        self.otps.lock().unwrap().get(phone).cloned()
    }

    pub fn len(&self) -> usize {
        self.otps.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl BaseOtpStore for InMemoryOtpStore {
    async fn issue(&self, phone: &str, code: &str, now: DateTime<Utc>) -> Result<OtpIssue> {
        let mut otps = self.otps.lock().unwrap();
        if let Some(existing) = otps.get(phone) {
            if existing.is_active(now) {
                return Ok(OtpIssue::Active(existing.clone()));
            }
        }
        let otp = Otp::new(phone, code, now);
        otps.insert(phone.to_string(), otp.clone());
        Ok(OtpIssue::Issued(otp))
    }

    async fn consume(&self, phone: &str, code: &str, now: DateTime<Utc>) -> Result<Option<Otp>> {
        let mut otps = self.otps.lock().unwrap();
        let matches = otps
            .get(phone)
            .map(|otp| otp.code == code && otp.is_active(now))
            .unwrap_or(false);
        Ok(if matches { otps.remove(phone) } else { None })
    }

    async fn purge_expired(&self, now: DateTime<Utc>) -> Result<u64> {
        let mut otps = self.otps.lock().unwrap();
        let before = otps.len();
        otps.retain(|_, otp| otp.is_active(now));
        Ok((before - otps.len()) as u64)
    }
}

// =============================================================================
// Refresh Token Store
// =============================================================================

#[derive(Default)]
pub struct InMemoryRefreshTokenStore {
    records: Mutex<Vec<RefreshTokenRecord>>,
}

impl InMemoryRefreshTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<RefreshTokenRecord> {
        self.records.lock().unwrap().clone()
    }

    pub fn records_for(&self, user_id: Uuid) -> Vec<RefreshTokenRecord> {
        self.records
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.user_id == user_id)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl BaseRefreshTokenStore for InMemoryRefreshTokenStore {
    async fn insert(&self, record: RefreshTokenRecord) -> Result<RefreshTokenRecord> {
        self.records.lock().unwrap().push(record.clone());
        Ok(record)
    }

    async fn find_by_token(&self, token: &str) -> Result<Option<RefreshTokenRecord>> {
        Ok(self
            .records
            .lock()
            .unwrap()
            .iter()
            .find(|r| r.token == token)
            .cloned())
    }

    async fn delete_by_user(&self, user_id: Uuid) -> Result<u64> {
        let mut records = self.records.lock().unwrap();
        let before = records.len();
        records.retain(|r| r.user_id != user_id);
        Ok((before - records.len()) as u64)
    }
}

// =============================================================================
// Policy Store
// =============================================================================

#[derive(Default)]
pub struct InMemoryPolicyStore {
    policies: Mutex<Vec<Policy>>,
    applications: Mutex<Vec<PolicyApplication>>,
}

impl InMemoryPolicyStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn policies(&self) -> Vec<Policy> {
        self.policies.lock().unwrap().clone()
    }

    pub fn applications(&self) -> Vec<PolicyApplication> {
        self.applications.lock().unwrap().clone()
    }
}

#[async_trait]
impl BasePolicyStore for InMemoryPolicyStore {
    async fn insert(&self, policy: NewPolicy) -> Result<Policy> {
        let policy = Policy::from_new(policy, Utc::now());
        self.policies.lock().unwrap().push(policy.clone());
        Ok(policy)
    }

    async fn find_by_id(&self, id: PolicyId) -> Result<Option<Policy>> {
        Ok(self
            .policies
            .lock()
            .unwrap()
            .iter()
            .find(|p| p.id == id)
            .cloned())
    }

    async fn insert_application(
        &self,
        application: NewPolicyApplication,
    ) -> Result<PolicyApplication> {
        let application = PolicyApplication::from_new(application, Utc::now());
        self.applications.lock().unwrap().push(application.clone());
        Ok(application)
    }
}

// =============================================================================
// Mock SMS Service
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentSms {
    pub to: String,
    pub body: String,
}

#[derive(Default)]
pub struct MockSmsService {
    sent: Mutex<Vec<SentSms>>,
    fail: bool,
}

impl MockSmsService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every send returns an error (nothing is recorded).
    pub fn failing() -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            fail: true,
        }
    }

    pub fn sent(&self) -> Vec<SentSms> {
        self.sent.lock().unwrap().clone()
    }

    /// The six-digit code in the most recent message to `phone`.
    pub fn last_code_for(&self, phone: &str) -> Option<String> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .rev()
            .find(|m| m.to == phone)
            .and_then(|m| {
                m.body
                    .split(|c: char| !c.is_ascii_digit())
                    .find(|chunk| chunk.len() == 6)
                    .map(str::to_string)
            })
    }
}

#[async_trait]
impl BaseSmsService for MockSmsService {
    async fn send_sms(&self, to: &str, body: &str) -> Result<()> {
        if self.fail {
            bail!("SMS provider unavailable");
        }
        self.sent.lock().unwrap().push(SentSms {
            to: to.to_string(),
            body: body.to_string(),
        });
        Ok(())
    }
}

// =============================================================================
// Mock Media Store
// =============================================================================

#[derive(Default)]
pub struct MockMediaStore {
    uploads: Mutex<Vec<(String, UploadedFile)>>,
    fail: bool,
}

impl MockMediaStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            uploads: Mutex::new(Vec::new()),
            fail: true,
        }
    }

    /// (folder, file) pairs in upload order.
    pub fn uploads(&self) -> Vec<(String, UploadedFile)> {
        self.uploads.lock().unwrap().clone()
    }
}

#[async_trait]
impl BaseMediaStore for MockMediaStore {
    async fn upload(&self, file: UploadedFile, folder: &str) -> Result<String> {
        if self.fail {
            bail!("media store unavailable");
        }
        let url = format!("https://media.test/{}/{}", folder, file.file_name);
        self.uploads.lock().unwrap().push((folder.to_string(), file));
        Ok(url)
    }
}

// =============================================================================
// TestDependencies
// =============================================================================

/// Handles to every fake, plus the ServerDeps built over them.
pub struct TestDependencies {
    pub config: Config,
    pub agents: Arc<InMemoryAgentStore>,
    pub otps: Arc<InMemoryOtpStore>,
    pub refresh_tokens: Arc<InMemoryRefreshTokenStore>,
    pub policies: Arc<InMemoryPolicyStore>,
    pub sms: Arc<MockSmsService>,
    /// `None` simulates missing media-store credentials.
    pub media: Option<Arc<MockMediaStore>>,
}

impl Default for TestDependencies {
    fn default() -> Self {
        Self::new()
    }
}

impl TestDependencies {
    pub fn new() -> Self {
        Self {
            config: Config::for_tests(),
            agents: Arc::new(InMemoryAgentStore::new()),
            otps: Arc::new(InMemoryOtpStore::new()),
            refresh_tokens: Arc::new(InMemoryRefreshTokenStore::new()),
            policies: Arc::new(InMemoryPolicyStore::new()),
            sms: Arc::new(MockSmsService::new()),
            media: Some(Arc::new(MockMediaStore::new())),
        }
    }

    pub fn with_config(mut self, config: Config) -> Self {
        self.config = config;
        self
    }

    pub fn with_sms(mut self, sms: MockSmsService) -> Self {
        self.sms = Arc::new(sms);
        self
    }

    pub fn with_media(mut self, media: Option<MockMediaStore>) -> Self {
        self.media = media.map(Arc::new);
        self
    }

    pub fn server_deps(&self) -> ServerDeps {
        ServerDeps::new(
            self.config.clone(),
            self.agents.clone(),
            self.otps.clone(),
            self.refresh_tokens.clone(),
            self.policies.clone(),
            self.sms.clone(),
            self.media
                .clone()
                .map(|m| m as Arc<dyn BaseMediaStore>),
        )
    }
}
