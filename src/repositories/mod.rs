//! # Repositories
//!
//! Data access layer. Repositories own the query building; the pagination
//! engine only sees the collaborator interfaces (`PageFetchResult` from the
//! over-fetching page query, `CountableQuery` for the strategy chain).

pub mod record;

pub use record::RecordRepository;
