//! # vidgate-core
//!
//! Core types and utilities for the rack video gateway.
//!
//! This crate provides the shared error taxonomy, HTTP client settings, gateway
//! configuration and the health report type used by the mapping, video and
//! health crates.
//!
//! ## Modules
//!
//! - [`error`] - Error taxonomy shared by every gateway crate
//! - [`client`] - HTTP client settings, timeouts and retry policy
//! - [`config`] - Gateway configuration with validation
//! - [`query`] - Query-string assembly for synthesized device URLs
//! - [`types`] - Shared domain types (per-device health report)

#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod client;
pub mod config;
pub mod error;
pub mod query;
pub mod types;

// Re-export commonly used types
pub use error::{Error, Result};
pub use types::HealthReport;
