//! Core dispatch engine module

pub mod clock;
pub mod config;
pub mod dispatcher;
pub mod errors;
pub mod gate;
pub mod models;
pub mod refresher;
pub mod token_cache;
pub mod transport;
