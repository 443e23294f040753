//! Core data models for translation dispatch

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Which remote provider a translate call goes to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderKind {
    /// Bearer-token provider: every call needs a credential from the issuance endpoint
    #[default]
    TokenBased,
    /// API-key provider: the key travels as a query parameter, no token machinery
    TokenFree,
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProviderKind::TokenBased => write!(f, "token-based"),
            ProviderKind::TokenFree => write!(f, "token-free"),
        }
    }
}

/// Raw response of a translate call, handed to the request's result handler
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranslationResponse {
    pub status: u16,
    pub body: String,
}

impl TranslationResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Called with the raw response once the translate call completes.
pub type ResultHandler<C> = Box<dyn FnOnce(TranslationResponse, C) + Send>;

/// Called with the untranslated text when dispatch cannot complete.
pub type FallbackHandler<C> = Box<dyn FnOnce(String, C) + Send>;

/// A single translation attempt.
///
/// Owned by the dispatch call it is handed to; exactly one of the result
/// handler or the fallback consumes it, unless fallback is disallowed and the
/// call fails, in which case it is dropped.
pub struct TranslationRequest<C> {
    pub(crate) text: String,
    pub(crate) user_context: C,
    pub(crate) on_result: ResultHandler<C>,
    pub(crate) fallback: FallbackHandler<C>,
    pub(crate) fallback_allowed: bool,
}

impl<C> TranslationRequest<C> {
    pub fn new<R, F>(text: impl Into<String>, user_context: C, on_result: R, fallback: F) -> Self
    where
        R: FnOnce(TranslationResponse, C) + Send + 'static,
        F: FnOnce(String, C) + Send + 'static,
    {
        Self {
            text: text.into(),
            user_context,
            on_result: Box::new(on_result),
            fallback: Box::new(fallback),
            fallback_allowed: true,
        }
    }

    /// Abandon the request silently on failure instead of calling the fallback.
    pub fn without_fallback(mut self) -> Self {
        self.fallback_allowed = false;
        self
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn user_context(&self) -> &C {
        &self.user_context
    }

    pub fn fallback_allowed(&self) -> bool {
        self.fallback_allowed
    }
}

impl<C: fmt::Debug> fmt::Debug for TranslationRequest<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TranslationRequest")
            .field("text", &self.text)
            .field("user_context", &self.user_context)
            .field("fallback_allowed", &self.fallback_allowed)
            .finish_non_exhaustive()
    }
}

/// Snapshot of the cached bearer credential
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TokenStatus {
    pub has_credential: bool,
    pub fresh: bool,
    /// Time left before the cached credential is treated as stale
    pub expires_in: Option<Duration>,
}
