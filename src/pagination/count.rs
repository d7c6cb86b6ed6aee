//! Item count strategies.
//!
//! A strategy answers "how many rows does this query match" with
//! `Option<ItemCount>`: `None` means "no answer from this strategy", never an
//! error. Strategies are assembled into an explicit ordered chain at startup
//! ([`AggregateFallback`]), cheapest first, and the chain is only invoked when
//! the reconciliation step actually needs a count.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use sea_orm::{
    ConnectionTrait, DatabaseConnection, DbBackend, DbErr, EntityTrait, FromQueryResult,
    PaginatorTrait, QueryTrait, Select, Statement,
};
use serde_json::Value as JsonValue;

/// A total that is either proven exact or explicitly an estimate.
///
/// Equality is field-wise: an exact 10 and an estimated 10 are different
/// values and must never be rendered identically.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ItemCount {
    pub count: u64,
    pub is_estimated: bool,
}

impl ItemCount {
    pub fn exact(count: u64) -> Self {
        Self {
            count,
            is_estimated: false,
        }
    }

    pub fn estimated(count: u64) -> Self {
        Self {
            count,
            is_estimated: true,
        }
    }
}

/// A query that the count strategies can work with.
///
/// `plan_statement` is the capability check for planner introspection: a
/// backend/query shape that cannot be `EXPLAIN`ed returns `None` and the
/// planner strategy falls back to an exact count.
#[async_trait]
pub trait CountableQuery: Send + Sync {
    /// Execute the exact `COUNT(*)` for this query.
    async fn execute_count(&self, db: &DatabaseConnection) -> Result<u64, DbErr>;

    /// Statement asking the store's planner for its row estimate, if this
    /// query supports plan introspection on the given backend.
    fn plan_statement(&self, backend: DbBackend) -> Option<Statement>;
}

/// A pluggable counting algorithm.
#[async_trait]
pub trait ItemCountStrategy: Send + Sync {
    /// Count the rows matched by `query`, or `None` if this strategy cannot
    /// produce an answer for it.
    async fn count(&self, query: &dyn CountableQuery) -> Option<ItemCount>;
}

/// Exact `COUNT(*)` under a wall-clock budget.
///
/// A count that does not finish within the budget is abandoned: the query
/// future is dropped, which cancels the in-flight statement, and the strategy
/// answers `None`. An exact count is never returned late, and there is no
/// retry.
pub struct TimedDirectCount {
    db: DatabaseConnection,
    budget: Duration,
}

impl TimedDirectCount {
    pub fn new(db: DatabaseConnection, budget: Duration) -> Self {
        Self { db, budget }
    }
}

#[async_trait]
impl ItemCountStrategy for TimedDirectCount {
    async fn count(&self, query: &dyn CountableQuery) -> Option<ItemCount> {
        match tokio::time::timeout(self.budget, query.execute_count(&self.db)).await {
            Ok(Ok(count)) => Some(ItemCount::exact(count)),
            Ok(Err(err)) => {
                tracing::warn!(error = %err, "direct count query failed");
                None
            }
            Err(_) => {
                tracing::debug!(budget_ms = self.budget.as_millis() as u64, "direct count exceeded budget, abandoning query");
                None
            }
        }
    }
}

/// Row estimate from the store's own query planner.
///
/// On backends with plan introspection this never materializes the result
/// set. When introspection is unsupported for the query shape it degrades to
/// a full exact count, so the strategy always answers unless the store
/// itself errors.
pub struct PlannerEstimate {
    db: DatabaseConnection,
}

impl PlannerEstimate {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    async fn exact_fallback(&self, query: &dyn CountableQuery) -> Option<ItemCount> {
        // The whole point of this strategy is to avoid the full count on big
        // tables; make the cost cliff visible when it happens anyway.
        tracing::warn!("planner introspection unavailable, degrading to full exact count");
        match query.execute_count(&self.db).await {
            Ok(count) => Some(ItemCount::exact(count)),
            Err(err) => {
                tracing::warn!(error = %err, "fallback exact count failed");
                None
            }
        }
    }
}

#[async_trait]
impl ItemCountStrategy for PlannerEstimate {
    async fn count(&self, query: &dyn CountableQuery) -> Option<ItemCount> {
        let Some(statement) = query.plan_statement(self.db.get_database_backend()) else {
            return self.exact_fallback(query).await;
        };

        let row = match self.db.query_one(statement).await {
            Ok(Some(row)) => row,
            Ok(None) => return self.exact_fallback(query).await,
            Err(err) => {
                tracing::warn!(error = %err, "planner introspection query failed");
                return self.exact_fallback(query).await;
            }
        };

        let plan: JsonValue = match row.try_get("", "QUERY PLAN") {
            Ok(value) => value,
            Err(err) => {
                tracing::warn!(error = %err, "planner output missing QUERY PLAN column");
                return self.exact_fallback(query).await;
            }
        };

        match planned_rows(&plan) {
            Some(rows) => Some(ItemCount::estimated(rows)),
            None => self.exact_fallback(query).await,
        }
    }
}

/// Extract the top-level `Plan Rows` figure from `EXPLAIN (FORMAT JSON)`
/// output (a one-element array wrapping the root plan node).
fn planned_rows(plan: &JsonValue) -> Option<u64> {
    let rows = plan.get(0)?.get("Plan")?.get("Plan Rows")?;
    rows.as_u64()
        .or_else(|| rows.as_f64().map(|f| f.max(0.0) as u64))
}

/// Ordered strategy chain; the first strategy that answers wins.
pub struct AggregateFallback {
    strategies: Vec<Arc<dyn ItemCountStrategy>>,
}

impl AggregateFallback {
    pub fn new(strategies: Vec<Arc<dyn ItemCountStrategy>>) -> Self {
        Self { strategies }
    }

    /// The standard chain: a budgeted exact count first, so small result sets
    /// get exact totals for free, then the planner estimate for everything
    /// that blew the budget.
    pub fn standard(db: DatabaseConnection, direct_count_budget: Duration) -> Self {
        Self::new(vec![
            Arc::new(TimedDirectCount::new(db.clone(), direct_count_budget)),
            Arc::new(PlannerEstimate::new(db)),
        ])
    }
}

#[async_trait]
impl ItemCountStrategy for AggregateFallback {
    async fn count(&self, query: &dyn CountableQuery) -> Option<ItemCount> {
        for strategy in &self.strategies {
            if let Some(count) = strategy.count(query).await {
                return Some(count);
            }
        }
        None
    }
}

/// [`CountableQuery`] over a sea-orm select.
///
/// Plan introspection is a Postgres capability; other backends answer `None`
/// from `plan_statement` and the planner strategy degrades to an exact count.
pub struct SelectCountQuery<E: EntityTrait> {
    select: Select<E>,
}

impl<E: EntityTrait> SelectCountQuery<E> {
    pub fn new(select: Select<E>) -> Self {
        Self { select }
    }
}

#[async_trait]
impl<E> CountableQuery for SelectCountQuery<E>
where
    E: EntityTrait,
    E::Model: FromQueryResult + Send + Sync,
{
    async fn execute_count(&self, db: &DatabaseConnection) -> Result<u64, DbErr> {
        self.select.clone().count(db).await
    }

    fn plan_statement(&self, backend: DbBackend) -> Option<Statement> {
        match backend {
            DbBackend::Postgres => {
                let mut statement = self.select.build(backend);
                statement.sql = format!("EXPLAIN (FORMAT JSON) {}", statement.sql);
                Some(statement)
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct StubQuery {
        count: u64,
        latency: Duration,
        executions: AtomicUsize,
    }

    impl StubQuery {
        fn instant(count: u64) -> Self {
            Self {
                count,
                latency: Duration::ZERO,
                executions: AtomicUsize::new(0),
            }
        }

        fn slow(count: u64, latency: Duration) -> Self {
            Self {
                count,
                latency,
                executions: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl CountableQuery for StubQuery {
        async fn execute_count(&self, _db: &DatabaseConnection) -> Result<u64, DbErr> {
            self.executions.fetch_add(1, Ordering::SeqCst);
            if !self.latency.is_zero() {
                tokio::time::sleep(self.latency).await;
            }
            Ok(self.count)
        }

        fn plan_statement(&self, _backend: DbBackend) -> Option<Statement> {
            None
        }
    }

    struct FixedStrategy {
        answer: Option<ItemCount>,
        calls: AtomicUsize,
    }

    impl FixedStrategy {
        fn new(answer: Option<ItemCount>) -> Self {
            Self {
                answer,
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl ItemCountStrategy for FixedStrategy {
        async fn count(&self, _query: &dyn CountableQuery) -> Option<ItemCount> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.answer
        }
    }

    #[test]
    fn exact_and_estimated_counts_are_distinct_values() {
        assert_ne!(ItemCount::exact(10), ItemCount::estimated(10));
        assert_eq!(ItemCount::exact(10), ItemCount::exact(10));
    }

    #[tokio::test]
    async fn timed_direct_count_answers_within_budget() {
        let strategy =
            TimedDirectCount::new(DatabaseConnection::default(), Duration::from_millis(100));
        let query = StubQuery::instant(42);

        assert_eq!(strategy.count(&query).await, Some(ItemCount::exact(42)));
    }

    #[tokio::test(start_paused = true)]
    async fn timed_direct_count_abandons_slow_queries() {
        let strategy =
            TimedDirectCount::new(DatabaseConnection::default(), Duration::from_millis(50));
        let query = StubQuery::slow(42, Duration::from_secs(5));

        assert_eq!(strategy.count(&query).await, None);
        // The single attempt was made and not retried.
        assert_eq!(query.executions.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn planner_estimate_degrades_to_exact_when_unsupported() {
        let strategy = PlannerEstimate::new(DatabaseConnection::default());
        let query = StubQuery::instant(7);

        // StubQuery never supports introspection, so this is the exact path.
        assert_eq!(strategy.count(&query).await, Some(ItemCount::exact(7)));
        assert_eq!(query.executions.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn planned_rows_reads_explain_json() {
        let plan = json!([{
            "Plan": {
                "Node Type": "Seq Scan",
                "Relation Name": "records",
                "Plan Rows": 1234,
                "Plan Width": 64
            }
        }]);
        assert_eq!(planned_rows(&plan), Some(1234));

        assert_eq!(planned_rows(&json!([])), None);
        assert_eq!(planned_rows(&json!({"Plan": {}})), None);
    }

    #[tokio::test]
    async fn aggregate_fallback_returns_first_answer() {
        let first = Arc::new(FixedStrategy::new(None));
        let second = Arc::new(FixedStrategy::new(Some(ItemCount::estimated(120))));
        let third = Arc::new(FixedStrategy::new(Some(ItemCount::exact(99))));
        let chain = AggregateFallback::new(vec![first.clone(), second.clone(), third.clone()]);

        let query = StubQuery::instant(0);
        assert_eq!(chain.count(&query).await, Some(ItemCount::estimated(120)));
        assert_eq!(first.calls.load(Ordering::SeqCst), 1);
        assert_eq!(second.calls.load(Ordering::SeqCst), 1);
        assert_eq!(third.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn aggregate_fallback_with_no_answers_is_none() {
        let chain = AggregateFallback::new(vec![
            Arc::new(FixedStrategy::new(None)),
            Arc::new(FixedStrategy::new(None)),
        ]);
        let query = StubQuery::instant(0);
        assert_eq!(chain.count(&query).await, None);
    }
}
