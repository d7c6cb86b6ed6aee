//! # Pagecraft API Library
//!
//! Core functionality for the Pagecraft API service: the pagination engine
//! (cursor codecs, count strategies, count reconciliation), the data access
//! layer, and the HTTP surface.

pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod models;
pub mod pagination;
pub mod repositories;
pub mod server;
pub mod telemetry;
pub use migration;
