//! Core infrastructure: configuration, errors, logging, metrics and shared helpers

pub mod config;
pub mod cooldown;
pub mod error;
pub mod logging;
pub mod metrics;
pub mod process;
pub mod utils;
pub mod web_server;

pub use cooldown::{CooldownDecision, CooldownGate};
pub use error::{AppError, AppResult};
pub use logging::{init_logger, log_startup_configuration};
