// Kiwoom token manager - library root

pub mod auth;
pub mod config;
pub mod dashboard;
pub mod error;
pub mod logging;

pub use auth::TokenManager;
pub use error::{TokenError, TransportErrorKind};
