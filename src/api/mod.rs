//! Client for the claude.ai usage endpoints.
//!
//! - `transport` sends browser-fingerprinted GET requests
//! - `client` holds the session credential, classifies responses, retries once
//! - `models` normalizes the usage payload into a [`UsageSnapshot`]

pub mod client;
pub mod error;
pub mod models;
pub mod transport;

#[cfg(test)]
pub mod testing;

pub use client::ApiClient;
pub use error::ApiError;
pub use models::{OrganizationInfo, UsageSnapshot, UsageStat};
