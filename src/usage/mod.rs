//! claude.ai plan usage integration.
//!
//! This module provides:
//! - API client for the organizations and usage endpoints (session-cookie auth)
//! - Normalization of the loosely-typed usage payload
//! - Data structures and the error taxonomy shared with the presentation layer
//!
//! Requires a claude.ai `sessionKey` cookie value.

mod client;
mod error;
mod normalize;
mod types;

pub use client::{Session, UsageClient};
pub use error::UsageError;
pub use normalize::{parse_reset_time, parse_usage_response, parse_utilization};
pub use types::{percent_to_fraction, UsageRecord};
