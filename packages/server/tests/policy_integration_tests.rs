//! Integration tests for policies and policy applications.

mod common;

use common::*;
use serde_json::{json, Value};

fn valid_policy() -> Value {
    json!({
        "title": "Crop insurance 2025",
        "description": "Kharif season cover for smallholders",
        "targetAudience": "farmers",
        "validityPeriod": {
            "start": "2025-06-01T00:00:00Z",
            "end": "2025-12-31T00:00:00Z"
        },
        "rules": ["One application per farmer"],
        "requirements": [
            {
                "key": "land_record",
                "name": "Land record",
                "type": "document",
                "exampleUrl": "https://example.com/land.pdf",
                "required": true
            },
            {
                "key": "acres",
                "name": "Acres farmed",
                "type": "number",
                "required": true,
                "min": 0.5,
                "max": 50.0
            },
            {
                "key": "crop",
                "name": "Primary crop",
                "type": "select",
                "options": ["rice", "cotton", "soybean"],
                "required": false
            }
        ]
    })
}

async fn signed_in_app() -> (TestApp, Session) {
    let app = TestApp::new();
    seed_agent(&app);
    let session = sign_in(&app, AGENT_PHONE).await;
    (app, session)
}

async fn create(app: &TestApp, session: &Session, body: Value) -> TestResponse {
    app.post_json_with("/policy", body, &[bearer(&session.access_token)])
        .await
}

#[tokio::test]
async fn create_policy_requires_session() {
    let app = TestApp::new();

    let response = app.post_json("/policy", valid_policy()).await;
    assert_eq!(response.status, 401);
    assert!(app.deps.policies.policies().is_empty());
}

#[tokio::test]
async fn create_policy_records_creator() {
    let (app, session) = signed_in_app().await;
    let agent = &app.deps.agents.all()[0];

    let response = create(&app, &session, valid_policy()).await;

    assert_eq!(response.status, 201, "{}", response.text);
    assert_eq!(response.message(), "Policy created successfully");
    let data = &response.body["data"];
    assert_eq!(data["title"], "Crop insurance 2025");
    assert_eq!(data["created_by"], agent.id.to_string());
    assert_eq!(data["requirements"][0]["type"], "document");
    assert_eq!(data["requirements"].as_array().unwrap().len(), 3);

    assert_eq!(app.deps.policies.policies().len(), 1);
}

#[tokio::test]
async fn document_requirement_without_example_url_is_rejected() {
    let (app, session) = signed_in_app().await;

    let mut body = valid_policy();
    body["requirements"][0]
        .as_object_mut()
        .unwrap()
        .remove("exampleUrl");

    let response = create(&app, &session, body).await;

    assert_eq!(response.status, 400);
    assert_eq!(response.body["success"], false);
    assert_eq!(
        response.body["error"][0]["path"],
        "requirements[0].exampleUrl"
    );
    assert_eq!(
        response.message(),
        "Validation failed: exampleUrl is required when type is 'document'."
    );
    assert!(app.deps.policies.policies().is_empty());
}

#[tokio::test]
async fn validation_collects_all_errors() {
    let (app, session) = signed_in_app().await;

    let response = create(
        &app,
        &session,
        json!({
            "title": "",
            "requirements": [
                { "key": "a", "name": "A", "type": "colour", "required": true },
                { "key": "b", "name": "B", "type": "select", "required": "yes" }
            ]
        }),
    )
    .await;

    assert_eq!(response.status, 400);
    let paths: Vec<&str> = response.body["error"]
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["path"].as_str().unwrap())
        .collect();
    assert!(paths.contains(&"title"));
    assert!(paths.contains(&"description"));
    assert!(paths.contains(&"targetAudience"));
    assert!(paths.contains(&"requirements[0].type"));
    assert!(paths.contains(&"requirements[1].required"));
    assert!(paths.contains(&"requirements[1].options"));
}

#[tokio::test]
async fn date_only_expiry_is_accepted() {
    let (app, session) = signed_in_app().await;
    let mut body = valid_policy();
    body["expiryDate"] = json!("2025-12-31");
    body["validityPeriod"] = json!({ "start": "2025-06-01", "end": "2025-12-31" });

    let response = create(&app, &session, body).await;

    assert_eq!(response.status, 201, "{}", response.text);
    assert_eq!(response.body["data"]["expiryDate"], "2025-12-31T00:00:00Z");
    assert_eq!(
        response.body["data"]["validityPeriod"]["start"],
        "2025-06-01T00:00:00Z"
    );
}

#[tokio::test]
async fn unparseable_expiry_is_a_field_error() {
    let (app, session) = signed_in_app().await;
    let mut body = valid_policy();
    body["expiryDate"] = json!("someday");

    let response = create(&app, &session, body).await;

    assert_eq!(response.status, 400);
    assert_eq!(response.body["error"][0]["path"], "expiryDate");
    assert!(app.deps.policies.policies().is_empty());
}

#[tokio::test]
async fn get_policy_by_id() {
    let (app, session) = signed_in_app().await;
    let created = create(&app, &session, valid_policy()).await;
    let id = created.body["data"]["id"].as_str().unwrap().to_string();

    let response = app
        .get_with(&format!("/policy/{}", id), &[bearer(&session.access_token)])
        .await;
    assert_eq!(response.status, 200, "{}", response.text);
    assert_eq!(response.body["data"]["id"], id.as_str());

    let missing = app
        .get_with(
            "/policy/0190f1c2-0000-7000-8000-000000000000",
            &[bearer(&session.access_token)],
        )
        .await;
    assert_eq!(missing.status, 303);
    assert_eq!(missing.message(), "Policy does not exist");

    let malformed = app
        .get_with("/policy/not-a-uuid", &[bearer(&session.access_token)])
        .await;
    assert_eq!(malformed.status, 303);
}

#[tokio::test]
async fn submit_application_against_policy() {
    let (app, session) = signed_in_app().await;
    let created = create(&app, &session, valid_policy()).await;
    let id = created.body["data"]["id"].as_str().unwrap().to_string();
    let agent = &app.deps.agents.all()[0];

    let response = app
        .post_json_with(
            &format!("/policy/{}/applications", id),
            json!({
                "fieldResponses": [
                    { "key": "land_record", "value": "https://media.test/files/land.pdf" },
                    { "key": "acres", "value": 4.5 },
                    { "key": "crop", "value": "cotton" }
                ]
            }),
            &[bearer(&session.access_token)],
        )
        .await;

    assert_eq!(response.status, 201, "{}", response.text);
    assert_eq!(response.message(), "Application submitted successfully");

    let applications = app.deps.policies.applications();
    assert_eq!(applications.len(), 1);
    assert_eq!(applications[0].user_id, Some(agent.id.into_uuid()));
}

#[tokio::test]
async fn application_answers_must_match_schema() {
    let (app, session) = signed_in_app().await;
    let created = create(&app, &session, valid_policy()).await;
    let id = created.body["data"]["id"].as_str().unwrap().to_string();

    let response = app
        .post_json_with(
            &format!("/policy/{}/applications", id),
            json!({
                "fieldResponses": [
                    { "key": "acres", "value": 500 },
                    { "key": "crop", "value": "wheat" },
                    { "key": "pets", "value": true }
                ]
            }),
            &[bearer(&session.access_token)],
        )
        .await;

    assert_eq!(response.status, 400);
    let messages: Vec<&str> = response.body["error"]
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["msg"].as_str().unwrap())
        .collect();
    assert!(messages.contains(&"Field 'acres' must be at most 50"));
    assert!(messages.contains(&"Unknown field 'pets'"));
    assert!(messages.contains(&"Field 'land_record' is required"));
    assert!(app.deps.policies.applications().is_empty());
}
