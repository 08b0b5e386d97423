use std::fmt;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;

use chrono::{DateTime, Utc};

use super::clock::{Clock, SystemClock};
use super::transport::{ReqwestTransport, TokenTransport, DEFAULT_REQUEST_TIMEOUT};
use super::types::{
    parse_expires_dt, redact, Credentials, Endpoints, Environment, IssueSuccess, IssuedToken,
    TokenInfo, TokenRequest, TokenResponse, TOKEN_ENDPOINT,
};
use crate::error::{Result, TokenError};

/// Where the next issuance request goes
#[derive(Debug, Clone)]
struct Target {
    environment: Environment,
    base_url: String,
}

/// Token manager
/// Owns credentials, environment selection and the single held token.
///
/// State and target sit behind short-lived locks; no lock is held across
/// the network call, so the manager can be shared as `Arc<TokenManager>`
/// between the UI loop and an issuing task.
pub struct TokenManager {
    /// App key / secret key
    credentials: Credentials,

    /// Base address table
    endpoints: Endpoints,

    /// Current environment and resolved base address
    target: RwLock<Target>,

    /// Held token, if any
    state: RwLock<Option<IssuedToken>>,

    /// HTTP transport for issuance
    transport: Arc<dyn TokenTransport>,

    /// Time source for validity checks
    clock: Arc<dyn Clock>,
}

impl TokenManager {
    /// Create a manager against the default hosts with the default timeout
    pub fn new(
        appkey: impl Into<String>,
        secretkey: impl Into<String>,
        environment: impl Into<Environment>,
    ) -> anyhow::Result<Self> {
        Self::with_endpoints(
            Credentials::new(appkey, secretkey),
            environment.into(),
            Endpoints::default(),
            DEFAULT_REQUEST_TIMEOUT,
        )
    }

    /// Create a manager with a custom host table and request timeout
    pub fn with_endpoints(
        credentials: Credentials,
        environment: Environment,
        endpoints: Endpoints,
        timeout: Duration,
    ) -> anyhow::Result<Self> {
        let transport = ReqwestTransport::new(timeout)?;
        Ok(Self::with_parts(
            credentials,
            environment,
            endpoints,
            Arc::new(transport),
            Arc::new(SystemClock),
        ))
    }

    /// Create a manager from explicit transport and clock
    pub fn with_parts(
        credentials: Credentials,
        environment: Environment,
        endpoints: Endpoints,
        transport: Arc<dyn TokenTransport>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let target = Target {
            environment,
            base_url: endpoints.base_url(environment).to_string(),
        };

        Self {
            credentials,
            endpoints,
            target: RwLock::new(target),
            state: RwLock::new(None),
            transport,
            clock,
        }
    }

    fn read_state(&self) -> RwLockReadGuard<'_, Option<IssuedToken>> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_state(&self) -> RwLockWriteGuard<'_, Option<IssuedToken>> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn read_target(&self) -> Target {
        self.target
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Request a new access token (au10001).
    ///
    /// Makes exactly one attempt. On success the held token is replaced as a
    /// whole; on any failure it is left untouched.
    pub async fn issue(&self) -> Result<IssueSuccess> {
        let target = self.read_target();
        let url = format!("{}{}", target.base_url, TOKEN_ENDPOINT);

        tracing::info!(
            environment = %target.environment,
            "Requesting access token"
        );
        tracing::debug!(url = %url, "Token request URL");

        let body = TokenRequest::client_credentials(&self.credentials);

        let response = match self.transport.post_json(&url, &body).await {
            Ok(response) => response,
            Err(e) => {
                tracing::error!("Token request failed: {}", e);
                return Err(e);
            }
        };

        tracing::info!(status = response.status, "Token endpoint responded");

        if response.status != 200 {
            let err = TokenError::HttpStatus {
                status: response.status,
                body: response.body,
                url,
            };
            tracing::error!("Token issuance failed: {}", err);
            return Err(err);
        }

        let payload: serde_json::Value = serde_json::from_str(&response.body).map_err(|e| {
            tracing::error!("Token response is not JSON: {}", e);
            TokenError::InvalidResponse(format!("body is not JSON: {}", e))
        })?;

        let issued = extract_token(&payload)?;

        if parse_expires_dt(&issued.expires_dt).is_none() {
            tracing::warn!(
                "Token expiry '{}' is not a YYYYMMDDHHMMSS timestamp; token will report invalid",
                issued.expires_dt
            );
        }

        tracing::info!(
            token = %redact(&issued.token),
            expires_dt = %issued.expires_dt,
            "Access token issued"
        );

        *self.write_state() = Some(issued);

        Ok(IssueSuccess { payload })
    }

    /// True iff a token is held and now is strictly before its expiry
    pub fn is_valid(&self) -> bool {
        self.read_state()
            .as_ref()
            .is_some_and(|issued| self.is_unexpired(issued))
    }

    // Polled on every dashboard frame; a bad expiry is reported once by issue()
    fn is_unexpired(&self, issued: &IssuedToken) -> bool {
        parse_expires_dt(&issued.expires_dt)
            .is_some_and(|expires_at| self.clock.now() < expires_at)
    }

    /// Parsed expiry instant of the held token
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.read_state()
            .as_ref()
            .and_then(|issued| parse_expires_dt(&issued.expires_dt))
    }

    /// `Authorization` header value: `"<token_type> <token>"`
    pub fn authorization_header(&self) -> Result<String> {
        self.read_state()
            .as_ref()
            .map(|issued| format!("{} {}", issued.token_type, issued.token))
            .ok_or(TokenError::NoToken)
    }

    /// Snapshot for display; validity is evaluated now
    pub fn current_info(&self) -> TokenInfo {
        let snapshot = self.read_state().clone();
        match snapshot {
            Some(issued) => TokenInfo {
                is_valid: self.is_unexpired(&issued),
                token: issued.token,
                token_type: issued.token_type,
                expires: issued.expires_dt,
            },
            None => TokenInfo::default(),
        }
    }

    /// Drop the held token.
    ///
    /// Local only: the broker is not told, so the token itself stays usable
    /// server-side until it expires.
    pub fn revoke(&self) {
        if self.write_state().take().is_some() {
            tracing::info!("Access token cleared");
        }
    }

    /// Switch the target environment for the next `issue()`
    pub fn set_environment(&self, environment: impl Into<Environment>) {
        let environment = environment.into();
        let mut target = self.target.write().unwrap_or_else(PoisonError::into_inner);
        target.environment = environment;
        target.base_url = self.endpoints.base_url(environment).to_string();

        tracing::info!(
            environment = %environment,
            base_url = %target.base_url,
            "Environment changed"
        );
    }

    pub fn environment(&self) -> Environment {
        self.read_target().environment
    }

    pub fn base_url(&self) -> String {
        self.read_target().base_url
    }

    pub fn token_url(&self) -> String {
        format!("{}{}", self.read_target().base_url, TOKEN_ENDPOINT)
    }
}

impl fmt::Debug for TokenManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenManager")
            .field("credentials", &self.credentials)
            .field("target", &self.read_target())
            .field("state", &*self.read_state())
            .finish()
    }
}

/// Pull the token triple out of a 200 payload
fn extract_token(payload: &serde_json::Value) -> Result<IssuedToken> {
    let data: TokenResponse = serde_json::from_value(payload.clone())
        .map_err(|e| TokenError::InvalidResponse(format!("unexpected shape: {}", e)))?;

    let broker_message = || match (
        data.return_code.as_ref().map(broker_field),
        data.return_msg.as_ref().map(broker_field),
    ) {
        (Some(code), Some(msg)) => format!(" (return_code={}, return_msg={})", code, msg),
        (Some(code), None) => format!(" (return_code={})", code),
        (None, Some(msg)) => format!(" (return_msg={})", msg),
        (None, None) => String::new(),
    };

    let token = data
        .token
        .clone()
        .filter(|t| !t.is_empty())
        .ok_or_else(|| {
            TokenError::InvalidResponse(format!("response has no token{}", broker_message()))
        })?;

    let expires_dt = data
        .expires_dt
        .clone()
        .filter(|e| !e.is_empty())
        .ok_or_else(|| {
            TokenError::InvalidResponse(format!("response has no expires_dt{}", broker_message()))
        })?;

    let token_type = data
        .token_type
        .clone()
        .filter(|t| !t.is_empty())
        .unwrap_or_else(|| "Bearer".to_string());

    Ok(IssuedToken {
        token,
        token_type,
        expires_dt,
    })
}

/// Broker status fields arrive as numbers or strings
fn broker_field(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
