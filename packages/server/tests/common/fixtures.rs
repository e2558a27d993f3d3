//! Test fixtures: seeded users, signed-in sessions and multipart bodies.

use portal_core::domains::agents::Agent;
use serde_json::json;

use super::{role_header, TestApp};

pub const AGENT_NAME: &str = "jagdish";
pub const AGENT_EMAIL: &str = "omk54r@gmail.com";
pub const AGENT_PHONE: &str = "7038823053";

pub const BOUNDARY: &str = "----portal-test-boundary";

pub fn seed_agent(app: &TestApp) -> Agent {
    app.deps.agents.seed(AGENT_NAME, AGENT_EMAIL, AGENT_PHONE)
}

/// Request an OTP over HTTP and read the code back from the fake SMS log.
pub async fn request_otp(app: &TestApp, phone: &str) -> String {
    let response = app.post_json("/auth/send-otp", json!({ "phone": phone })).await;
    assert_eq!(response.status, 200, "send-otp failed: {}", response.text);
    app.deps
        .sms
        .last_code_for(phone)
        .expect("no OTP was sent")
}

pub struct Session {
    pub access_token: String,
    pub refresh_token: String,
}

/// Full role-scoped login for an existing agent.
pub async fn sign_in(app: &TestApp, phone: &str) -> Session {
    let otp = request_otp(app, phone).await;
    let response = app
        .post_json_with(
            "/auth/login",
            json!({ "phone": phone, "otp": otp }),
            &[role_header("agent")],
        )
        .await;
    assert_eq!(response.status, 200, "login failed: {}", response.text);

    Session {
        access_token: response.body["data"]["accessToken"]
            .as_str()
            .unwrap()
            .to_string(),
        refresh_token: response.body["data"]["refreshToken"]
            .as_str()
            .unwrap()
            .to_string(),
    }
}

/// Hand-built `multipart/form-data` body.
#[derive(Default)]
pub struct MultipartBuilder {
    body: Vec<u8>,
}

impl MultipartBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn text(mut self, name: &str, value: &str) -> Self {
        self.body.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"{}\"\r\n\r\n{}\r\n",
                BOUNDARY, name, value
            )
            .as_bytes(),
        );
        self
    }

    pub fn file(mut self, name: &str, file_name: &str, content_type: &str, bytes: &[u8]) -> Self {
        self.body.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\nContent-Type: {}\r\n\r\n",
                BOUNDARY, name, file_name, content_type
            )
            .as_bytes(),
        );
        self.body.extend_from_slice(bytes);
        self.body.extend_from_slice(b"\r\n");
        self
    }

    pub fn finish(mut self) -> Vec<u8> {
        self.body
            .extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());
        self.body
    }
}
