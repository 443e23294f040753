//! Fair mutual-exclusion gate around transport construction and token state

use tokio::sync::{Mutex, MutexGuard};
use tracing::{debug, info};

use crate::core::errors::Result;
use crate::core::token_cache::TokenCache;
use crate::core::transport::{TransportFactory, Transports};

/// State that may only be touched while the gate is held
#[derive(Debug, Default)]
pub struct GateState {
    transports: Option<Transports>,
    pub token: TokenCache,
}

impl GateState {
    /// Return the transport pair, building it on first use.
    pub fn transports(&mut self, factory: &dyn TransportFactory) -> Result<Transports> {
        if let Some(transports) = &self.transports {
            return Ok(transports.clone());
        }

        let transports = factory.build()?;
        info!("Constructed plaintext and encrypted transports");
        self.transports = Some(transports.clone());
        Ok(transports)
    }

    pub fn has_transports(&self) -> bool {
        self.transports.is_some()
    }
}

/// Single permit, handed out in FIFO order.
///
/// `tokio::sync::Mutex` queues waiters fairly, and its guard may be held
/// across `.await`, which is how a refresh keeps every later caller waiting
/// without blocking a runtime thread. Leaving the gate is dropping the guard.
#[derive(Debug, Default)]
pub struct RefreshGate {
    state: Mutex<GateState>,
}

/// Held permit
pub type GateGuard<'a> = MutexGuard<'a, GateState>;

impl RefreshGate {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn enter(&self) -> GateGuard<'_> {
        let guard = self.state.lock().await;
        debug!("Entered refresh gate");
        guard
    }
}
