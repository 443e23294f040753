//! Bearer token refresh, run while the refresh gate is held

use tracing::{debug, info};

use crate::core::clock::Clock;
use crate::core::config::ProviderConfig;
use crate::core::errors::{Result, TranslationError};
use crate::core::token_cache::TokenCache;
use crate::core::transport::{HttpTransport, OutboundCall};

/// Issues the token call and installs its result.
pub struct TokenRefresher<'a> {
    config: &'a ProviderConfig,
    clock: &'a dyn Clock,
}

impl<'a> TokenRefresher<'a> {
    pub fn new(config: &'a ProviderConfig, clock: &'a dyn Clock) -> Self {
        Self { config, clock }
    }

    /// The issuance call: empty POST authenticated by the subscription key.
    pub fn refresh_call(&self) -> OutboundCall {
        OutboundCall::post(&self.config.token_endpoint)
            .header("Ocp-Apim-Subscription-Key", &self.config.subscription_key)
            .header("Content-Type", "application/json")
            .header("Accept", "application/jwt")
            .header("Cache-Control", "no-cache")
    }

    /// Fetch a new credential and install it into `cache`.
    ///
    /// The caller must hold the refresh gate for the whole call. On error the
    /// cache is left untouched. Only a 2xx response with a non-empty body is
    /// installed; any other body is a failed refresh, never a credential.
    pub async fn refresh(&self, transport: &dyn HttpTransport, cache: &mut TokenCache) -> Result<()> {
        debug!("Requesting new token from {}", self.config.token_endpoint);

        let response = transport
            .submit(self.refresh_call())
            .await
            .map_err(TranslationError::into_refresh)?;

        if !response.is_success() {
            return Err(TranslationError::RefreshTransportError {
                message: format!("token endpoint answered {}", response.status),
            });
        }

        let credential = response.body.trim();
        if credential.is_empty() {
            return Err(TranslationError::RefreshTransportError {
                message: "token endpoint returned an empty body".to_string(),
            });
        }

        // window starts once the token is in hand
        let now = self.clock.now();
        cache.install(credential, now, self.config.token_validity());
        info!("Refreshed bearer token, trusted for {:?}", self.config.token_validity());
        Ok(())
    }
}
