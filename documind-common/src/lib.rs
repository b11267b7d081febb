//! DocuMind Common - Shared configuration, errors, and logging for the DocuMind client.
//!
//! This crate provides:
//! - Configuration types and loading (`~/.documind/config.json` + `DOCUMIND_*` env)
//! - Configuration validation
//! - Error types and handling utilities
//! - Logging setup with noise filtering
//! - Small formatting helpers used by front ends

#![warn(clippy::all)]
#![allow(clippy::pedantic)]

pub mod config;
pub mod error;
pub mod logging;
pub mod util;
pub mod validation;

pub use config::{ApiConfig, Config, ObservabilityConfig, PollingConfig};
pub use error::{Error, Result};
pub use validation::{Validate, ValidationError, ValidationResult};

