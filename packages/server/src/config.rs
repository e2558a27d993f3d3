use anyhow::{bail, Context, Result};
use chrono::Duration;
use dotenvy::dotenv;
use std::env;

/// Signing material for one kind of session token.
#[derive(Debug, Clone)]
pub struct TokenSettings {
    pub secret: String,
    pub expiry: Duration,
}

/// Twilio credentials for OTP delivery by SMS.
#[derive(Debug, Clone)]
pub struct TwilioSettings {
    pub account_sid: String,
    pub auth_token: String,
    pub from_number: String,
}

/// Cloudinary credentials for the file relay.
#[derive(Debug, Clone)]
pub struct CloudinarySettings {
    pub cloud_name: String,
    pub api_key: String,
    pub api_secret: String,
}

/// Application configuration loaded from environment variables
///
/// Built once at startup and shared read-only; nothing below the server
/// layer reads the environment directly.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub port: u16,
    pub access_token: TokenSettings,
    /// Missing secret or expiry only fails refresh-token issuance, not startup.
    pub refresh_token_secret: Option<String>,
    pub refresh_token_expiry: Option<Duration>,
    pub cors_origins: Vec<String>,
    pub development: bool,
    pub enforce_device_match: bool,
    pub otp_fixed_code: Option<String>,
    pub twilio: Option<TwilioSettings>,
    pub cloudinary: Option<CloudinarySettings>,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        // Load .env file if present (development)
        let _ = dotenv();

        let development = env::var("APP_ENV")
            .map(|v| v.eq_ignore_ascii_case("development"))
            .unwrap_or(false);

        let access_expiry = env::var("ACCESS_TOKEN_EXPIRY").unwrap_or_else(|_| "15m".to_string());

        let refresh_token_expiry = match env::var("REFRESH_TOKEN_EXPIRY") {
            Ok(raw) => Some(
                parse_expiry(&raw).context("REFRESH_TOKEN_EXPIRY must be a duration like 7d")?,
            ),
            Err(_) => None,
        };

        let twilio = match (
            env::var("TWILIO_ACCOUNT_SID"),
            env::var("TWILIO_AUTH_TOKEN"),
            env::var("TWILIO_FROM_NUMBER"),
        ) {
            (Ok(account_sid), Ok(auth_token), Ok(from_number)) => Some(TwilioSettings {
                account_sid,
                auth_token,
                from_number,
            }),
            _ => None,
        };

        let cloudinary = match (
            env::var("CLOUDINARY_CLOUD_NAME"),
            env::var("CLOUDINARY_API_KEY"),
            env::var("CLOUDINARY_API_SECRET"),
        ) {
            (Ok(cloud_name), Ok(api_key), Ok(api_secret)) => Some(CloudinarySettings {
                cloud_name,
                api_key,
                api_secret,
            }),
            _ => None,
        };

        Ok(Self {
            database_url: env::var("DATABASE_URL").context("DATABASE_URL must be set")?,
            port: env::var("PORT")
                .unwrap_or_else(|_| "5000".to_string())
                .parse()
                .context("PORT must be a valid number")?,
            access_token: TokenSettings {
                secret: env::var("ACCESS_TOKEN_SECRET")
                    .context("ACCESS_TOKEN_SECRET must be set")?,
                expiry: parse_expiry(&access_expiry)
                    .context("ACCESS_TOKEN_EXPIRY must be a duration like 15m")?,
            },
            refresh_token_secret: env::var("REFRESH_TOKEN_SECRET")
                .ok()
                .filter(|s| !s.is_empty()),
            refresh_token_expiry,
            cors_origins: env::var("CORS_ORIGIN")
                .unwrap_or_else(|_| "*".to_string())
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect(),
            development,
            enforce_device_match: env::var("ENFORCE_DEVICE_MATCH")
                .map(|v| v == "true" || v == "1")
                .unwrap_or(false),
            otp_fixed_code: env::var("OTP_FIXED_CODE").ok().filter(|s| !s.is_empty()),
            twilio,
            cloudinary,
        })
    }

    /// Refresh-token settings, if both halves are configured.
    pub fn refresh_token(&self) -> Option<TokenSettings> {
        match (&self.refresh_token_secret, self.refresh_token_expiry) {
            (Some(secret), Some(expiry)) => Some(TokenSettings {
                secret: secret.clone(),
                expiry,
            }),
            _ => None,
        }
    }

    /// Configuration for tests and local tooling; no external services.
    pub fn for_tests() -> Self {
        Self {
            database_url: "postgres://localhost/portal_test".to_string(),
            port: 0,
            access_token: TokenSettings {
                secret: "test_access_secret".to_string(),
                expiry: Duration::minutes(15),
            },
            refresh_token_secret: Some("test_refresh_secret".to_string()),
            refresh_token_expiry: Some(Duration::days(7)),
            cors_origins: vec!["*".to_string()],
            development: true,
            enforce_device_match: false,
            otp_fixed_code: None,
            twilio: None,
            cloudinary: None,
        }
    }
}

/// Parse a token lifetime: `30s`, `15m`, `12h`, `7d`, or bare seconds.
pub fn parse_expiry(raw: &str) -> Result<Duration> {
    let raw = raw.trim();
    if raw.is_empty() {
        bail!("empty duration");
    }

    let (digits, unit) = match raw.char_indices().last() {
        Some((idx, c)) if c.is_ascii_alphabetic() => (&raw[..idx], Some(c)),
        _ => (raw, None),
    };

    let value: i64 = digits
        .trim()
        .parse()
        .with_context(|| format!("invalid duration '{}'", raw))?;
    if value <= 0 {
        bail!("duration must be positive: '{}'", raw);
    }

    let duration = match unit.map(|c| c.to_ascii_lowercase()) {
        None | Some('s') => Duration::try_seconds(value),
        Some('m') => Duration::try_minutes(value),
        Some('h') => Duration::try_hours(value),
        Some('d') => Duration::try_days(value),
        Some(other) => bail!("unknown duration unit '{}' in '{}'", other, raw),
    };

    duration.with_context(|| format!("duration out of range: '{}'", raw))
}
