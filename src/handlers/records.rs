//! # Records Endpoint Handler
//!
//! Handler for the GET /records endpoint: decodes the caller's cursor,
//! fetches one over-sized page, reconciles the total through the lazily
//! invoked count strategy chain, and issues integrity-checked cursors for
//! the neighbouring pages.

use axum::{
    extract::{OriginalUri, Query, State},
    response::Json,
};
use serde::Deserialize;
use serde_json::json;
use utoipa::{IntoParams, ToSchema};

use crate::error::{ApiError, validation_error};
use crate::models::record::Model;
use crate::pagination::{
    CursorCodec, CursorContext, IntegrityCheckedCursorCodec, ItemCountStrategy, ReconciledPage,
    RequestContext, SimplePageCursorCodec, SortDirection, SortField, SortSpec,
};
use crate::repositories::RecordRepository;
use crate::repositories::record::sort_column;
use crate::server::AppState;

use super::types::PaginatedResponse;

/// Query parameters for listing records
#[derive(Debug, Deserialize, IntoParams, ToSchema)]
pub struct ListRecordsQuery {
    /// Filter by category
    pub category: Option<String>,
    /// Sort specification, e.g. `created_at:desc,title` (default: `created_at:desc`)
    pub sort: Option<String>,
    /// Number of records per page (default: 25, max: 100)
    pub page_size: Option<u64>,
    /// Opaque cursor for pagination continuation
    pub cursor: Option<String>,
}

/// Record information for API responses
#[derive(Debug, serde::Serialize, ToSchema)]
pub struct RecordInfo {
    /// Unique identifier for the record
    #[schema(example = "550e8400-e29b-41d4-a716-446655440000")]
    pub id: String,
    /// Human-readable title
    pub title: String,
    /// Category the record belongs to
    #[schema(example = "books")]
    pub category: String,
    /// Timestamp when the record was created
    #[schema(example = "2024-01-15T10:30:00Z")]
    pub created_at: String,
}

impl From<Model> for RecordInfo {
    fn from(model: Model) -> Self {
        Self {
            id: model.id.to_string(),
            title: model.title,
            category: model.category,
            created_at: model.created_at.to_rfc3339(),
        }
    }
}

/// List records with cursor pagination and reconciled totals
#[utoipa::path(
    get,
    path = "/records",
    params(ListRecordsQuery),
    responses(
        (status = 200, description = "Records listed successfully", body = PaginatedResponse<RecordInfo>),
        (status = 400, description = "Invalid query parameters or cursor", body = ApiError, example = json!({
            "code": "CURSOR_STALE",
            "message": "cursor integrity checksum mismatch; the request shape has changed since it was issued",
            "trace_id": "corr-12345678"
        })),
        (status = 500, description = "Internal server error", body = ApiError),
        (status = 503, description = "Database unavailable", body = ApiError)
    ),
    tag = "records"
)]
pub async fn list_records(
    State(state): State<AppState>,
    OriginalUri(uri): OriginalUri,
    Query(query): Query<ListRecordsQuery>,
) -> Result<Json<PaginatedResponse<RecordInfo>>, ApiError> {
    let limits = &state.config.pagination;
    let page_size = query.page_size.unwrap_or(limits.default_page_size);
    if page_size < 1 || page_size > limits.max_page_size {
        return Err(validation_error(
            "page_size out of range",
            json!({ "page_size": format!("must be between 1 and {}", limits.max_page_size) }),
        ));
    }

    let sort = parse_sort(query.sort.as_deref())?;

    // Cursors are scoped to the request shape; the cursor parameter itself is
    // excluded from the material so paging forward does not invalidate them.
    let request_context = RequestContext::new(
        uri.path().to_string(),
        strip_cursor_param(uri.query().unwrap_or("")),
    );
    let codec = IntegrityCheckedCursorCodec::new(SimplePageCursorCodec, request_context);

    let page_request = codec.decode_cursor(&CursorContext {
        cursor: query.cursor,
        page_size,
        sort,
    })?;

    let repository = RecordRepository::new(&state.db);
    let fetched = repository
        .fetch_page(query.category.as_deref(), &page_request)
        .await?;

    let count_query = repository.count_query(query.category.as_deref());
    let chain = state.count_chain.clone();
    let page = ReconciledPage::reconcile(page_request, fetched, || async move {
        chain.count(&count_query).await
    })
    .await;

    Ok(Json(PaginatedResponse::from_page(
        page.map(RecordInfo::from),
        &codec,
    )))
}

/// Parse `field:direction` pairs into a [`SortSpec`], defaulting to newest
/// first. Unknown fields and directions are client errors.
fn parse_sort(raw: Option<&str>) -> Result<SortSpec, ApiError> {
    let Some(raw) = raw.filter(|s| !s.trim().is_empty()) else {
        return Ok(SortSpec(vec![SortField::desc("created_at")]));
    };

    let mut fields = Vec::new();
    for part in raw.split(',') {
        let part = part.trim();
        let (field, direction) = match part.split_once(':') {
            Some((field, direction)) => (field, direction),
            None => (part, "asc"),
        };

        if sort_column(field).is_none() {
            return Err(validation_error(
                "unknown sort field",
                json!({ "sort": format!("`{field}` is not sortable") }),
            ));
        }
        let direction = match direction {
            "asc" => SortDirection::Asc,
            "desc" => SortDirection::Desc,
            other => {
                return Err(validation_error(
                    "invalid sort direction",
                    json!({ "sort": format!("`{other}` is not a direction (asc|desc)") }),
                ));
            }
        };
        fields.push(SortField {
            field: field.to_string(),
            direction,
        });
    }
    Ok(SortSpec(fields))
}

/// Remove the `cursor` parameter from a raw query string, leaving the rest
/// byte-for-byte intact.
fn strip_cursor_param(raw_query: &str) -> String {
    raw_query
        .split('&')
        .filter(|pair| !pair.is_empty() && !pair.starts_with("cursor="))
        .collect::<Vec<_>>()
        .join("&")
}
