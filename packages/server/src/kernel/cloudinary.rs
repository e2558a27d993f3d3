use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use sha2::{Digest, Sha256};

use super::{BaseMediaStore, UploadedFile};
use crate::config::CloudinarySettings;

/// Cloudinary upload API client (signed uploads, `auto` resource type)
pub struct CloudinaryClient {
    settings: CloudinarySettings,
    base_url: String,
    client: reqwest::Client,
}

/// Cloudinary upload response (only the fields we use)
#[derive(Debug, Deserialize)]
struct UploadResponse {
    secure_url: String,
}

impl CloudinaryClient {
    /// Create a new Cloudinary client
    pub fn new(settings: CloudinarySettings) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(120))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            settings,
            base_url: "https://api.cloudinary.com/v1_1".to_string(),
            client,
        })
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn upload_url(&self) -> String {
        format!("{}/{}/auto/upload", self.base_url, self.settings.cloud_name)
    }
}

/// SHA-256 request signature: params sorted by name, joined as `k=v&k=v`,
/// followed by the API secret.
pub fn sign_params(params: &[(&str, String)], api_secret: &str) -> String {
    let mut sorted: Vec<&(&str, String)> = params.iter().collect();
    sorted.sort_by(|a, b| a.0.cmp(b.0));

    let to_sign = sorted
        .iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join("&");

    let mut hasher = Sha256::new();
    hasher.update(to_sign.as_bytes());
    hasher.update(api_secret.as_bytes());
    hex::encode(hasher.finalize())
}

#[async_trait]
impl BaseMediaStore for CloudinaryClient {
    async fn upload(&self, file: UploadedFile, folder: &str) -> Result<String> {
        let params = vec![
            ("folder", folder.to_string()),
            ("timestamp", Utc::now().timestamp().to_string()),
            ("unique_filename", "true".to_string()),
            ("use_filename", "true".to_string()),
        ];
        let signature = sign_params(&params, &self.settings.api_secret);

        let mut part = Part::bytes(file.bytes.to_vec()).file_name(file.file_name.clone());
        if let Some(content_type) = &file.content_type {
            part = part
                .mime_str(content_type)
                .context("Invalid upload content type")?;
        }

        let mut form = Form::new()
            .part("file", part)
            .text("api_key", self.settings.api_key.clone())
            .text("signature", signature)
            .text("signature_algorithm", "sha256");
        for (key, value) in params {
            form = form.text(key, value);
        }

        let response = self
            .client
            .post(self.upload_url())
            .multipart(form)
            .send()
            .await
            .context("Failed to send Cloudinary upload request")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Cloudinary API error {}: {}", status, body);
        }

        let uploaded: UploadResponse = response
            .json()
            .await
            .context("Failed to parse Cloudinary response")?;

        Ok(uploaded.secure_url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signature_sorts_params_and_appends_secret() {
        let params = vec![
            ("timestamp", "1315060510".to_string()),
            ("folder", "files".to_string()),
        ];
        let expected = {
            let mut hasher = Sha256::new();
            hasher.update(b"folder=files&timestamp=1315060510abcd");
            hex::encode(hasher.finalize())
        };

        assert_eq!(sign_params(&params, "abcd"), expected);
        assert_eq!(expected.len(), 64);
    }

    #[test]
    fn test_upload_url_includes_cloud_name() {
        let client = CloudinaryClient::new(CloudinarySettings {
            cloud_name: "portal".to_string(),
            api_key: "key".to_string(),
            api_secret: "secret".to_string(),
        })
        .unwrap()
        .with_base_url("http://localhost:9000");

        assert_eq!(client.upload_url(), "http://localhost:9000/portal/auto/upload");
    }
}
