//! Value types describing a single page request.
//!
//! All types here are per-request, immutable values with no identity beyond
//! their fields; they are built at the HTTP boundary and discarded once the
//! response is rendered.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Direction of a single sort key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    Desc,
}

impl fmt::Display for SortDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SortDirection::Asc => write!(f, "asc"),
            SortDirection::Desc => write!(f, "desc"),
        }
    }
}

/// One `(field, direction)` pair of a sort specification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortField {
    pub field: String,
    pub direction: SortDirection,
}

impl SortField {
    pub fn asc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: SortDirection::Asc,
        }
    }

    pub fn desc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: SortDirection::Desc,
        }
    }
}

/// Ordered sequence of sort keys.
///
/// The [`fmt::Display`] form (`"created_at:desc,id:desc"`) is part of the
/// cursor checksum material, so it must stay stable across releases.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SortSpec(pub Vec<SortField>);

impl SortSpec {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn fields(&self) -> &[SortField] {
        &self.0
    }
}

impl fmt::Display for SortSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, key) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ",")?;
            }
            write!(f, "{}:{}", key.field, key.direction)?;
        }
        Ok(())
    }
}

/// A fully resolved page request.
///
/// Invariant: `offset == page_number * page_size`, so the offset is always
/// page-aligned and `page_number()` is a plain division.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRequest {
    pub offset: u64,
    pub page_size: u64,
    pub sort: SortSpec,
}

impl PageRequest {
    pub fn first_page(page_size: u64, sort: SortSpec) -> Self {
        Self {
            offset: 0,
            page_size,
            sort,
        }
    }

    /// Zero-based page number this request addresses.
    pub fn page_number(&self) -> u64 {
        self.offset / self.page_size
    }

    /// Request for the page after this one.
    pub fn next(&self) -> Self {
        Self {
            offset: self.offset + self.page_size,
            page_size: self.page_size,
            sort: self.sort.clone(),
        }
    }

    /// Request for the page before this one, if there is one.
    pub fn previous(&self) -> Option<Self> {
        if self.offset == 0 {
            return None;
        }
        Some(Self {
            offset: self.offset.saturating_sub(self.page_size),
            page_size: self.page_size,
            sort: self.sort.clone(),
        })
    }
}

/// Pagination state as it crosses the HTTP boundary.
///
/// The cursor string is opaque to callers; only the codec that issued it may
/// interpret it. `None` or an empty string addresses the first page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CursorContext {
    pub cursor: Option<String>,
    pub page_size: u64,
    pub sort: SortSpec,
}

impl CursorContext {
    pub fn first_page(page_size: u64, sort: SortSpec) -> Self {
        Self {
            cursor: None,
            page_size,
            sort,
        }
    }

    /// The cursor string, with `None` and `""` collapsed to "absent".
    pub fn cursor_str(&self) -> Option<&str> {
        self.cursor.as_deref().filter(|c| !c.is_empty())
    }
}

/// The incoming request's path and raw query string.
///
/// Consumed only as checksum material by the integrity-checked codec; the
/// query string is deliberately kept unparsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestContext {
    pub path: String,
    pub query: String,
}

impl RequestContext {
    pub fn new(path: impl Into<String>, query: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            query: query.into(),
        }
    }
}
