//! Gated Translator - concurrent translation dispatch behind a bearer token
//!
//! Many callers can dispatch translation requests at once. Token-based
//! requests share one cached bearer credential which is refreshed ahead of
//! its real expiry, by at most one caller at a time; everyone else waits for
//! that refresh and re-checks. Failed calls hand the original text to a
//! caller-supplied fallback after a configured delay.

#![forbid(unsafe_code)]

pub mod cli;
pub mod core;

// Re-export key types for convenience
pub use crate::core::{
    clock::{Clock, ManualClock, SystemClock},
    config::ProviderConfig,
    dispatcher::{DispatchContext, DispatchHandle, TranslationDispatcher},
    errors::TranslationError,
    models::{ProviderKind, TokenStatus, TranslationRequest, TranslationResponse},
    transport::{HttpTransport, OutboundCall, TransportFactory, Transports},
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");
