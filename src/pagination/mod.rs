//! # Pagination Engine
//!
//! Offset pagination with opaque cursors and honest totals. The pieces fit
//! together like this: a [`CursorCodec`] turns the caller's opaque cursor into
//! a [`PageRequest`], the repository fetches `page_size + 1` rows and builds a
//! [`PageFetchResult`], and [`ReconciledPage`] merges that page-local evidence
//! with a lazily invoked [`ItemCountStrategy`] into a total that is either
//! exact or explicitly flagged as an estimate.

pub mod count;
pub mod cursor;
pub mod page;
pub mod request;

pub use count::{
    AggregateFallback, CountableQuery, ItemCount, ItemCountStrategy, PlannerEstimate,
    SelectCountQuery, TimedDirectCount,
};
pub use cursor::{CursorCodec, CursorDecodeError, IntegrityCheckedCursorCodec, SimplePageCursorCodec};
pub use page::{PageFetchResult, ReconciledPage};
pub use request::{CursorContext, PageRequest, RequestContext, SortDirection, SortField, SortSpec};
