//! Translation dispatch with single-flight token refresh and delayed fallback

use std::borrow::Cow;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tracing::{debug, error, warn};

use crate::core::clock::{Clock, SystemClock};
use crate::core::config::ProviderConfig;
use crate::core::errors::{Result, TranslationError};
use crate::core::gate::RefreshGate;
use crate::core::models::{ProviderKind, TokenStatus, TranslationRequest};
use crate::core::refresher::TokenRefresher;
use crate::core::transport::{
    HttpResponse, HttpTransport, OutboundCall, ReqwestTransportFactory, TransportFactory,
    Transports,
};

/// Percent-encode a query value. Both providers go through this.
pub fn encode_query_value(value: &str) -> Cow<'_, str> {
    urlencoding::encode(value)
}

/// Shared state behind every dispatcher that should use the same token:
/// the refresh gate, the clock and the transport factory.
pub struct DispatchContext {
    gate: RefreshGate,
    clock: Arc<dyn Clock>,
    factory: Arc<dyn TransportFactory>,
}

impl DispatchContext {
    pub fn new(factory: Arc<dyn TransportFactory>, clock: Arc<dyn Clock>) -> Self {
        Self {
            gate: RefreshGate::new(),
            clock,
            factory,
        }
    }

    /// Production context: `reqwest` transports and the runtime clock
    pub fn with_reqwest(timeout: Duration) -> Self {
        Self::new(
            Arc::new(ReqwestTransportFactory::new(timeout)),
            Arc::new(SystemClock),
        )
    }

    pub fn gate(&self) -> &RefreshGate {
        &self.gate
    }
}

/// Completion handle of one dispatch.
///
/// Dropping it detaches the dispatch; it still runs to a result or fallback.
#[derive(Debug)]
pub struct DispatchHandle {
    task: JoinHandle<()>,
}

impl DispatchHandle {
    /// Wait until the result handler ran, or the failure was handled.
    ///
    /// A scheduled fallback runs later, after the configured delay.
    pub async fn finished(self) {
        if let Err(e) = self.task.await {
            error!("Dispatch task ended abnormally: {}", e);
        }
    }
}

/// Dispatches translation requests to the configured provider
#[derive(Clone)]
pub struct TranslationDispatcher {
    config: Arc<ProviderConfig>,
    context: Arc<DispatchContext>,
}

impl TranslationDispatcher {
    /// Create a dispatcher with its own context
    pub fn new(config: ProviderConfig) -> Result<Self> {
        config.validate()?;
        let context = Arc::new(DispatchContext::with_reqwest(config.timeout()));
        Ok(Self::with_context(config, context))
    }

    /// Create from environment
    pub fn from_env() -> Result<Self> {
        let config = ProviderConfig::from_env()?;
        Self::new(config)
    }

    /// Create a dispatcher sharing `context` (and so its token) with others
    pub fn with_context(config: ProviderConfig, context: Arc<DispatchContext>) -> Self {
        Self {
            config: Arc::new(config),
            context,
        }
    }

    pub fn config(&self) -> &ProviderConfig {
        &self.config
    }

    pub fn context(&self) -> Arc<DispatchContext> {
        self.context.clone()
    }

    /// Accept a request for dispatch.
    ///
    /// Never fails synchronously: the request ends in its result handler, its
    /// fallback, or, with fallback disallowed, is dropped after logging.
    pub fn dispatch<C: Send + 'static>(&self, request: TranslationRequest<C>) -> DispatchHandle {
        let dispatcher = self.clone();
        // detached so no caller cancellation can abandon the gate mid-refresh
        let task = tokio::spawn(async move { dispatcher.run(request).await });
        DispatchHandle { task }
    }

    async fn run<C: Send + 'static>(&self, request: TranslationRequest<C>) {
        let transports = match self.transports().await {
            Ok(transports) => transports,
            Err(e) => {
                error!("Could not construct HTTP transports: {}", e);
                self.fail(request, e.into_dispatch());
                return;
            }
        };

        let result = match self.config.effective_provider() {
            ProviderKind::TokenFree => self.send_token_free(&transports, &request.text).await,
            ProviderKind::TokenBased => {
                let credential = self.credential(&transports).await;
                self.send_token_based(&transports, &request.text, credential.as_deref())
                    .await
            }
        };

        match result {
            Ok(response) => {
                debug!("Got translate response {} for: {}", response.status, request.text);
                let TranslationRequest {
                    user_context,
                    on_result,
                    ..
                } = request;
                on_result(response.into(), user_context);
            }
            Err(e) => {
                warn!("Translate call failed for '{}': {}", request.text, e);
                self.fail(request, e);
            }
        }
    }

    async fn transports(&self) -> Result<Transports> {
        let mut state = self.context.gate.enter().await;
        state.transports(self.context.factory.as_ref())
    }

    /// Freshness check, refreshing inside the gate when stale.
    ///
    /// Callers queued behind a refresh re-check once they get the gate, and
    /// by then normally find a fresh token.
    async fn credential(&self, transports: &Transports) -> Option<String> {
        let mut state = self.context.gate.enter().await;

        if !state.token.is_fresh(self.context.clock.now()) {
            let refresher = TokenRefresher::new(&self.config, self.context.clock.as_ref());
            if let Err(e) = refresher
                .refresh(transports.encrypted.as_ref(), &mut state.token)
                .await
            {
                warn!("{}; dispatching with previously cached credential", e);
            }
        }

        state.token.credential().map(str::to_string)
    }

    /// Translate call of the token-free provider
    pub fn token_free_call(&self, text: &str) -> OutboundCall {
        let config = &self.config;
        OutboundCall::get(format!(
            "{}?key={}&text={}&lang={}-{}",
            config.token_free_endpoint,
            encode_query_value(&config.subscription_key),
            encode_query_value(text),
            encode_query_value(&config.source_lang),
            encode_query_value(&config.target_lang),
        ))
    }

    /// Translate call of the token-based provider
    pub fn token_based_call(&self, text: &str, credential: Option<&str>) -> OutboundCall {
        let config = &self.config;
        let call = OutboundCall::get(format!(
            "{}?text={}&from={}&to={}",
            config.token_based_endpoint,
            encode_query_value(text),
            encode_query_value(&config.source_lang),
            encode_query_value(&config.target_lang),
        ));

        match credential {
            Some(credential) => call.header("Authorization", format!("Bearer {}", credential)),
            None => {
                warn!("No bearer credential available, sending unauthenticated request");
                call
            }
        }
    }

    async fn send_token_free(&self, transports: &Transports, text: &str) -> Result<HttpResponse> {
        debug!("Enqueuing token-free translation for: {}", text);
        transports
            .encrypted
            .submit(self.token_free_call(text))
            .await
            .map_err(TranslationError::into_dispatch)
    }

    async fn send_token_based(
        &self,
        transports: &Transports,
        text: &str,
        credential: Option<&str>,
    ) -> Result<HttpResponse> {
        debug!("Enqueuing token-based translation for: {}", text);
        transports
            .plaintext
            .submit(self.token_based_call(text, credential))
            .await
            .map_err(TranslationError::into_dispatch)
    }

    fn fail<C: Send + 'static>(&self, request: TranslationRequest<C>, err: TranslationError) {
        if !request.fallback_allowed {
            warn!("Dropping translation of '{}' without fallback: {}", request.text, err);
            return;
        }

        let delay = self.config.fallback_delay();
        let TranslationRequest {
            text,
            user_context,
            fallback,
            ..
        } = request;

        // never inline: a failing provider must not recurse or spin
        tokio::spawn(async move {
            sleep(delay).await;
            debug!("Falling back to original text: {}", text);
            fallback(text, user_context);
        });
    }

    /// Current credential, refreshing it first when stale
    pub async fn current_credential(&self) -> Result<Option<String>> {
        let transports = self.transports().await?;
        Ok(self.credential(&transports).await)
    }

    /// Snapshot of the cached token
    pub async fn token_status(&self) -> TokenStatus {
        let state = self.context.gate.enter().await;
        state.token.status(self.context.clock.now())
    }
}
