// Minimal Twilio Programmable Messaging client used for OTP delivery.

use std::collections::HashMap;

pub mod models;
use reqwest::Client;

use crate::models::{MessageResponse, TwilioErrorBody};

const DEFAULT_BASE_URL: &str = "https://api.twilio.com/2010-04-01";

#[derive(Debug, Clone)]
pub struct TwilioOptions {
    pub account_sid: String,
    pub auth_token: String,
    /// Sender number in E.164 format (or a messaging service SID).
    pub from_number: String,
}

#[derive(Debug, Clone)]
pub struct TwilioService {
    options: TwilioOptions,
    base_url: String,
    client: Client,
}

impl TwilioService {
    pub fn new(options: TwilioOptions) -> Self {
        Self {
            options,
            base_url: DEFAULT_BASE_URL.to_string(),
            client: Client::new(),
        }
    }

    /// Point the client at a different API host (local fakes, regional edges).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn messages_url(&self) -> String {
        format!(
            "{base}/Accounts/{sid}/Messages.json",
            base = self.base_url,
            sid = self.options.account_sid
        )
    }

    /// Send a plain SMS to `recipient`.
    pub async fn send_sms(&self, recipient: &str, body: &str) -> Result<MessageResponse, String> {
        let from_key = if self.options.from_number.starts_with("MG") {
            "MessagingServiceSid"
        } else {
            "From"
        };

        let mut form_body: HashMap<&str, &str> = HashMap::new();
        form_body.insert("To", recipient);
        form_body.insert(from_key, &self.options.from_number);
        form_body.insert("Body", body);

        let res = self
            .client
            .post(self.messages_url())
            .basic_auth(&self.options.account_sid, Some(&self.options.auth_token))
            .form(&form_body)
            .send()
            .await
            .map_err(|e| format!("Request to Twilio failed: {}", e))?;

        let status = res.status();
        if !status.is_success() {
            let message = match res.json::<TwilioErrorBody>().await {
                Ok(body) => match body.code {
                    Some(code) => format!("{} (code {})", body.message, code),
                    None => body.message,
                },
                Err(_) => "unreadable error body".to_string(),
            };
            return Err(format!("Twilio returned {}: {}", status, message));
        }

        let message = res
            .json::<MessageResponse>()
            .await
            .map_err(|e| format!("Failed to parse Twilio response: {}", e))?;

        if let Some(code) = message.error_code {
            return Err(format!(
                "Twilio rejected message {} (code {}): {}",
                message.sid,
                code,
                message.error_message.clone().unwrap_or_default()
            ));
        }

        Ok(message)
    }
}
