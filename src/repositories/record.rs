//! # Record Repository
//!
//! Query building for the records collection: the `page_size + 1`
//! over-fetching page query and the matching count query handed to the
//! count strategy chain.

use sea_orm::{
    ColumnTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter, QueryOrder, QuerySelect,
    Select,
};

use crate::models::record::{Column, Entity as Record, Model};
use crate::pagination::{PageFetchResult, PageRequest, SelectCountQuery, SortDirection, SortSpec};

/// Repository for record database operations
pub struct RecordRepository<'a> {
    db: &'a DatabaseConnection,
}

impl<'a> RecordRepository<'a> {
    /// Create a new RecordRepository with the given database connection
    pub fn new(db: &'a DatabaseConnection) -> Self {
        Self { db }
    }

    /// Fetch one page of records.
    ///
    /// Requests `page_size + 1` rows at the given offset; the extra row only
    /// proves whether a next page exists and is trimmed before the result is
    /// built.
    pub async fn fetch_page(
        &self,
        category: Option<&str>,
        request: &PageRequest,
    ) -> Result<PageFetchResult<Model>, DbErr> {
        let mut query = base_select(category);
        query = apply_sort(query, &request.sort);

        let rows = query
            .offset(request.offset)
            .limit(request.page_size + 1)
            .all(self.db)
            .await?;

        Ok(PageFetchResult::from_rows(rows, request.page_size))
    }

    /// The count query matching `fetch_page`'s filter, for the strategy chain.
    pub fn count_query(&self, category: Option<&str>) -> SelectCountQuery<Record> {
        SelectCountQuery::new(base_select(category))
    }
}

fn base_select(category: Option<&str>) -> Select<Record> {
    let mut query = Record::find();
    if let Some(category) = category {
        query = query.filter(Column::Category.eq(category));
    }
    query
}

fn apply_sort(mut query: Select<Record>, sort: &SortSpec) -> Select<Record> {
    let mut saw_id = false;
    for key in sort.fields() {
        let Some(column) = sort_column(&key.field) else {
            continue;
        };
        saw_id |= matches!(column, Column::Id);
        query = match key.direction {
            SortDirection::Asc => query.order_by_asc(column),
            SortDirection::Desc => query.order_by_desc(column),
        };
    }
    // Stable total order: break remaining ties on the primary key.
    if !saw_id {
        query = query.order_by_asc(Column::Id);
    }
    query
}

/// Map an externally supplied sort field name to a record column.
///
/// Handlers validate names before building a [`SortSpec`]; unknown names are
/// rejected at the boundary, never silently applied.
pub fn sort_column(field: &str) -> Option<Column> {
    match field {
        "id" => Some(Column::Id),
        "title" => Some(Column::Title),
        "category" => Some(Column::Category),
        "created_at" => Some(Column::CreatedAt),
        _ => None,
    }
}
