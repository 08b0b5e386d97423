// Authentication module
// Manages the access token lifecycle: issuance, expiry, validity

mod clock;
mod manager;
mod transport;
mod types;

pub use clock::{Clock, SystemClock};
pub use manager::TokenManager;
pub use transport::{
    ReqwestTransport, TokenTransport, TransportResponse, DEFAULT_REQUEST_TIMEOUT,
    JSON_CONTENT_TYPE,
};
pub use types::{
    format_expires_dt, parse_expires_dt, redact, Credentials, Endpoints, Environment,
    IssueSuccess, TokenInfo, TokenRequest, MOCK_DOMAIN, PRODUCTION_DOMAIN, TOKEN_ENDPOINT,
};
