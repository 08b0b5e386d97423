// Authentication types

use std::fmt;

use chrono::{DateTime, FixedOffset, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

/// Production REST API host
pub const PRODUCTION_DOMAIN: &str = "https://api.kiwoom.com";

/// Mock (paper trading) REST API host
pub const MOCK_DOMAIN: &str = "https://mockapi.kiwoom.com";

/// Token issuance path (au10001)
pub const TOKEN_ENDPOINT: &str = "/oauth2/token";

/// `expires_dt` layout, e.g. `20250101235959`
pub const EXPIRES_DT_FORMAT: &str = "%Y%m%d%H%M%S";

/// `expires_dt` is broker wall-clock time (KST)
const EXPIRES_DT_UTC_OFFSET_SECS: i32 = 9 * 3600;

/// Target API environment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Production,
    #[default]
    Mock,
}

impl Environment {
    /// Resolve a tag; only the exact tag `production` selects production
    pub fn from_tag(tag: &str) -> Self {
        match tag {
            "production" => Environment::Production,
            "mock" => Environment::Mock,
            other => {
                tracing::warn!("Unknown environment '{}', falling back to mock", other);
                Environment::Mock
            }
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Production => "production",
            Environment::Mock => "mock",
        }
    }

    /// The other environment, used by the dashboard toggle
    pub fn toggled(&self) -> Self {
        match self {
            Environment::Production => Environment::Mock,
            Environment::Mock => Environment::Production,
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&str> for Environment {
    fn from(tag: &str) -> Self {
        Environment::from_tag(tag)
    }
}

/// Base address table keyed by environment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    pub production: String,
    pub mock: String,
}

impl Endpoints {
    pub fn new(production: impl Into<String>, mock: impl Into<String>) -> Self {
        Self {
            production: production.into(),
            mock: mock.into(),
        }
    }

    pub fn base_url(&self, environment: Environment) -> &str {
        match environment {
            Environment::Production => &self.production,
            Environment::Mock => &self.mock,
        }
    }
}

impl Default for Endpoints {
    fn default() -> Self {
        Self::new(PRODUCTION_DOMAIN, MOCK_DOMAIN)
    }
}

/// App key / secret key pair
#[derive(Clone)]
pub struct Credentials {
    appkey: String,
    secretkey: String,
}

impl Credentials {
    pub fn new(appkey: impl Into<String>, secretkey: impl Into<String>) -> Self {
        Self {
            appkey: appkey.into(),
            secretkey: secretkey.into(),
        }
    }

    pub(crate) fn appkey(&self) -> &str {
        &self.appkey
    }

    pub(crate) fn secretkey(&self) -> &str {
        &self.secretkey
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("appkey", &redact(&self.appkey))
            .field("secretkey", &"[REDACTED]")
            .finish()
    }
}

/// Client credentials grant request body
#[derive(Serialize)]
pub struct TokenRequest<'a> {
    pub grant_type: &'static str,
    pub appkey: &'a str,
    pub secretkey: &'a str,
}

impl<'a> TokenRequest<'a> {
    pub fn client_credentials(credentials: &'a Credentials) -> Self {
        Self {
            grant_type: "client_credentials",
            appkey: credentials.appkey(),
            secretkey: credentials.secretkey(),
        }
    }
}

/// Token endpoint response (fields the manager relies on)
#[derive(Deserialize)]
pub struct TokenResponse {
    pub token: Option<String>,
    pub token_type: Option<String>,
    pub expires_dt: Option<String>,
    /// Number or string depending on the API; informational only
    pub return_code: Option<serde_json::Value>,
    pub return_msg: Option<serde_json::Value>,
}

/// Currently held token. Token and expiry always travel together.
#[derive(Clone)]
pub struct IssuedToken {
    pub token: String,
    pub token_type: String,
    pub expires_dt: String,
}

impl fmt::Debug for IssuedToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IssuedToken")
            .field("token", &redact(&self.token))
            .field("token_type", &self.token_type)
            .field("expires_dt", &self.expires_dt)
            .finish()
    }
}

/// Read model handed to the display layer
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct TokenInfo {
    pub token: String,
    pub token_type: String,
    pub expires: String,
    pub is_valid: bool,
}

/// Successful issuance: raw response payload
#[derive(Debug, Clone)]
pub struct IssueSuccess {
    pub payload: serde_json::Value,
}

/// Parse a 14-digit `YYYYMMDDHHMMSS` KST timestamp into an absolute instant
pub fn parse_expires_dt(value: &str) -> Option<DateTime<Utc>> {
    if value.len() != 14 || !value.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }

    let naive = NaiveDateTime::parse_from_str(value, EXPIRES_DT_FORMAT).ok()?;
    let offset = FixedOffset::east_opt(EXPIRES_DT_UTC_OFFSET_SECS)?;

    naive
        .and_local_timezone(offset)
        .single()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Render `expires_dt` as `YYYY-MM-DD HH:MM:SS`, or return it unchanged
pub fn format_expires_dt(value: &str) -> String {
    NaiveDateTime::parse_from_str(value, EXPIRES_DT_FORMAT)
        .map(|dt| dt.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|_| value.to_string())
}

/// Short preview for logs: first few characters, never the whole secret
pub fn redact(value: &str) -> String {
    if value.chars().count() > 12 {
        let head: String = value.chars().take(6).collect();
        format!("{}...", head)
    } else {
        "[REDACTED]".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_environment_from_tag() {
        assert_eq!(Environment::from_tag("production"), Environment::Production);
        assert_eq!(Environment::from_tag("mock"), Environment::Mock);
        assert_eq!(Environment::from_tag(""), Environment::Mock);
        assert_eq!(Environment::from_tag("Production"), Environment::Mock);
        assert_eq!(Environment::from_tag("staging"), Environment::Mock);
    }

    fn warnings_from(f: impl FnOnce()) -> Vec<String> {
        use crate::dashboard::log_layer::DashboardLayer;
        use std::collections::VecDeque;
        use std::sync::{Arc, Mutex};
        use tracing_subscriber::prelude::*;

        let buffer = Arc::new(Mutex::new(VecDeque::new()));
        let subscriber = tracing_subscriber::registry().with(DashboardLayer::new(buffer.clone()));
        tracing::subscriber::with_default(subscriber, f);

        let warnings: Vec<String> = buffer
            .lock()
            .unwrap()
            .iter()
            .filter(|entry| entry.level == tracing::Level::WARN)
            .map(|entry| entry.message.clone())
            .collect();
        warnings
    }

    #[test]
    fn test_unknown_tag_warns() {
        let warnings = warnings_from(|| {
            assert_eq!(Environment::from_tag("staging"), Environment::Mock);
        });
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("staging"));
        assert!(warnings[0].contains("mock"));
    }

    #[test]
    fn test_known_tags_do_not_warn() {
        let warnings = warnings_from(|| {
            Environment::from_tag("production");
            Environment::from_tag("mock");
        });
        assert!(warnings.is_empty());
    }

    #[test]
    fn test_environment_toggle() {
        assert_eq!(Environment::Mock.toggled(), Environment::Production);
        assert_eq!(Environment::Production.toggled(), Environment::Mock);
    }

    #[test]
    fn test_default_endpoints() {
        let endpoints = Endpoints::default();
        assert_eq!(
            endpoints.base_url(Environment::Production),
            "https://api.kiwoom.com"
        );
        assert_eq!(
            endpoints.base_url(Environment::Mock),
            "https://mockapi.kiwoom.com"
        );
    }

    #[test]
    fn test_parse_expires_dt_is_kst() {
        let parsed = parse_expires_dt("20250101090000").unwrap();
        assert_eq!(parsed, Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap());
    }

    #[test]
    fn test_parse_expires_dt_rejects_malformed() {
        assert!(parse_expires_dt("").is_none());
        assert!(parse_expires_dt("2025010109000").is_none());
        assert!(parse_expires_dt("202501010900001").is_none());
        assert!(parse_expires_dt("2025-01-01 09:00").is_none());
        assert!(parse_expires_dt("20251301090000").is_none());
        assert!(parse_expires_dt("2025010109000x").is_none());
    }

    #[test]
    fn test_format_expires_dt() {
        assert_eq!(format_expires_dt("20250102030405"), "2025-01-02 03:04:05");
        assert_eq!(format_expires_dt("garbage"), "garbage");
    }

    #[test]
    fn test_credentials_debug_redacts() {
        let creds = Credentials::new("app-key-0123456789", "super-secret-value");
        let debug_str = format!("{:?}", creds);
        assert!(debug_str.contains("[REDACTED]"));
        assert!(!debug_str.contains("super-secret-value"));
        assert!(!debug_str.contains("app-key-0123456789"));
    }

    #[test]
    fn test_issued_token_debug_redacts() {
        let token = IssuedToken {
            token: "WQJCwyqInphKnR3bSRtB9NE1lv".to_string(),
            token_type: "bearer".to_string(),
            expires_dt: "20250101090000".to_string(),
        };
        let debug_str = format!("{:?}", token);
        assert!(!debug_str.contains("WQJCwyqInphKnR3bSRtB9NE1lv"));
        assert!(debug_str.contains("bearer"));
    }

    #[test]
    fn test_token_request_body() {
        let creds = Credentials::new("key", "secret");
        let body = serde_json::to_value(TokenRequest::client_credentials(&creds)).unwrap();
        assert_eq!(
            body,
            serde_json::json!({
                "grant_type": "client_credentials",
                "appkey": "key",
                "secretkey": "secret"
            })
        );
    }
}
