//! # Common API Types
//!
//! Shared response structures for list endpoints, including the paginated
//! response wrapper and the exact-vs-estimated total rendering.

use serde::{Serialize, Serializer};
use serde_json::json;
use utoipa::ToSchema;

use crate::pagination::{CursorCodec, ItemCount, ReconciledPage};

/// Total item count as rendered at the API boundary.
///
/// Exact counts serialize as a plain JSON integer, estimates as a `~`-prefixed
/// string (`"~120"`), so the two can never be confused by a client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TotalItems(pub ItemCount);

impl Serialize for TotalItems {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        if self.0.is_estimated {
            serializer.serialize_str(&format!("~{}", self.0.count))
        } else {
            serializer.serialize_u64(self.0.count)
        }
    }
}

/// Generic paginated response wrapper for list endpoints
#[derive(Debug, Serialize, ToSchema)]
pub struct PaginatedResponse<T: ToSchema> {
    /// List of items for the current page
    pub data: Vec<T>,
    /// Total number of items: integer when exact, "~N" string when estimated
    #[schema(value_type = Object, example = json!("~120"))]
    pub total_items: TotalItems,
    /// Total number of pages at the current page size
    pub total_pages: u64,
    /// Whether more pages exist after this one
    pub has_next: bool,
    /// Whether pages exist before this one
    pub has_previous: bool,
    /// Opaque cursor for fetching the next page (null on the last page)
    pub next_cursor: Option<String>,
    /// Opaque cursor for fetching the previous page (null on the first page)
    pub prev_cursor: Option<String>,
}

impl<T: ToSchema> PaginatedResponse<T> {
    /// Render a reconciled page, issuing next/previous cursors through the
    /// same codec that will decode them.
    pub fn from_page<C: CursorCodec>(page: ReconciledPage<T>, codec: &C) -> Self {
        let next_cursor = page
            .has_next()
            .then(|| codec.encode_cursor(&page.request().next()).cursor)
            .flatten();
        let prev_cursor = page
            .request()
            .previous()
            .map(|previous| codec.encode_cursor(&previous).cursor)
            .unwrap_or_default();

        Self {
            total_items: TotalItems(page.total_item_count()),
            total_pages: page.total_pages(),
            has_next: page.has_next(),
            has_previous: page.has_previous(),
            next_cursor,
            prev_cursor,
            data: page.into_items(),
        }
    }
}
