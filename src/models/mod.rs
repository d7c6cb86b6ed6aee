//! # Data Models
//!
//! This module contains the data models used throughout the Pagecraft API.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

pub mod record;

pub use record::Entity as Record;

/// Basic service information response
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ServiceInfo {
    /// The name of the service
    pub service: String,
    /// The version of the service
    pub version: String,
}

impl Default for ServiceInfo {
    fn default() -> Self {
        Self {
            service: "pagecraft".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}
