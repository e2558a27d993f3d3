//! Postgres store tests. Run with `cargo test -- --ignored` when Docker is
//! available.

mod common;

use chrono::{Duration, Utc};
use portal_core::common::AppError;
use portal_core::domains::agents::NewAgent;
use portal_core::domains::auth::models::RefreshTokenRecord;
use portal_core::domains::otp::models::OtpIssue;
use portal_core::domains::policy::models::{
    FieldResponse, FieldValue, NewPolicy, NewPolicyApplication, PolicyField,
};
use portal_core::kernel::{
    BaseAgentStore, BaseOtpStore, BasePolicyStore, BaseRefreshTokenStore, PgAgentStore,
    PgOtpStore, PgPolicyStore, PgRefreshTokenStore,
};
use std::collections::HashMap;
use uuid::Uuid;

use common::postgres::test_pool;

/// A valid-looking mobile number unique to this run.
fn unique_phone() -> String {
    format!("9{:09}", Uuid::new_v4().as_u128() % 1_000_000_000)
}

fn new_agent(phone: &str) -> NewAgent {
    NewAgent {
        name: "Test Agent".to_string(),
        email: format!("{}@agents.test", phone),
        phone: phone.to_string(),
        metadata: HashMap::from([("source".to_string(), "test".to_string())]),
    }
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn agent_insert_and_lookup() {
    let store = PgAgentStore::new(test_pool().await);
    let phone = unique_phone();

    let agent = store.insert(new_agent(&phone)).await.unwrap();
    assert!(!agent.is_verified);
    assert_eq!(agent.metadata.0.get("source").map(String::as_str), Some("test"));

    let by_phone = store.find_by_phone(&phone).await.unwrap().unwrap();
    assert_eq!(by_phone.id, agent.id);

    let by_email = store
        .find_by_phone_or_email(None, Some(&agent.email))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(by_email.id, agent.id);

    assert!(store
        .find_by_phone_or_email(None, None)
        .await
        .unwrap()
        .is_none());

    let at = Utc::now();
    store.record_sign_in(agent.id, at).await.unwrap();
    let reloaded = store.find_by_id(agent.id).await.unwrap().unwrap();
    assert!(reloaded.last_signed_in.is_some());
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn duplicate_agent_phone_is_duplicate_error() {
    let store = PgAgentStore::new(test_pool().await);
    let phone = unique_phone();

    store.insert(new_agent(&phone)).await.unwrap();
    let mut again = new_agent(&phone);
    again.email = format!("other-{}@agents.test", phone);

    let err: AppError = store.insert(again).await.unwrap_err().into();
    assert!(matches!(err, AppError::Duplicate(ref c) if c == "agents_phone_key"));
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn otp_issue_is_exclusive_until_expiry() {
    let store = PgOtpStore::new(test_pool().await);
    let phone = unique_phone();
    let now = Utc::now();

    assert!(matches!(
        store.issue(&phone, "111111", now).await.unwrap(),
        OtpIssue::Issued(_)
    ));
    match store.issue(&phone, "222222", now).await.unwrap() {
        OtpIssue::Active(existing) => assert_eq!(existing.code, "111111"),
        OtpIssue::Issued(_) => panic!("active OTP was overwritten"),
    }

    let later = now + Duration::minutes(4);
    match store.issue(&phone, "333333", later).await.unwrap() {
        OtpIssue::Issued(fresh) => assert_eq!(fresh.code, "333333"),
        OtpIssue::Active(_) => panic!("expired OTP blocked issuance"),
    }
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn otp_consume_is_single_use() {
    let store = PgOtpStore::new(test_pool().await);
    let phone = unique_phone();
    let now = Utc::now();
    store.issue(&phone, "424242", now).await.unwrap();

    assert!(store.consume(&phone, "000000", now).await.unwrap().is_none());
    assert!(store.consume(&phone, "424242", now).await.unwrap().is_some());
    assert!(store.consume(&phone, "424242", now).await.unwrap().is_none());
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn otp_purge_removes_only_expired() {
    let store = PgOtpStore::new(test_pool().await);
    let stale = unique_phone();
    let fresh = unique_phone();
    let now = Utc::now();

    store
        .issue(&stale, "111111", now - Duration::minutes(10))
        .await
        .unwrap();
    store.issue(&fresh, "222222", now).await.unwrap();

    assert!(store.purge_expired(now).await.unwrap() >= 1);
    assert!(store.consume(&fresh, "222222", now).await.unwrap().is_some());
    assert!(store
        .consume(&stale, "111111", now - Duration::minutes(9))
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn refresh_tokens_revoke_per_user() {
    let store = PgRefreshTokenStore::new(test_pool().await);
    let user = Uuid::now_v7();
    let other = Uuid::now_v7();

    for (owner, token) in [(user, "t-1"), (user, "t-2"), (other, "t-3")] {
        let token = format!("{}-{}", token, Uuid::new_v4());
        store
            .insert(RefreshTokenRecord::new(token, owner, "agent", "ua"))
            .await
            .unwrap();
    }

    assert_eq!(store.delete_by_user(user).await.unwrap(), 2);
    assert_eq!(store.delete_by_user(other).await.unwrap(), 1);
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn policy_and_application_roundtrip_through_jsonb() {
    let store = PgPolicyStore::new(test_pool().await);
    let field: PolicyField = serde_json::from_value(serde_json::json!({
        "key": "acres",
        "name": "Acres",
        "type": "number",
        "required": true,
        "min": 1.0
    }))
    .unwrap();

    let policy = store
        .insert(NewPolicy {
            title: "Cover".to_string(),
            description: "Seasonal cover".to_string(),
            requirements: vec![field.clone()],
            target_audience: "farmers".to_string(),
            expiry_date: None,
            validity_period: None,
            rules: Some(vec!["one per farmer".to_string()]),
            created_by: Uuid::now_v7(),
        })
        .await
        .unwrap();

    let loaded = store.find_by_id(policy.id).await.unwrap().unwrap();
    assert_eq!(loaded.requirements.0, vec![field]);
    assert_eq!(loaded.rules, Some(vec!["one per farmer".to_string()]));

    let application = store
        .insert_application(NewPolicyApplication {
            policy_id: policy.id,
            user_id: None,
            field_responses: vec![FieldResponse {
                key: "acres".to_string(),
                value: FieldValue::Number(3.0),
            }],
        })
        .await
        .unwrap();
    assert_eq!(application.policy_id, policy.id);
    assert_eq!(application.field_responses.0.len(), 1);
}
