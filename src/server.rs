//! # Server Configuration
//!
//! Server setup for the Pagecraft API: shared state, router, and the
//! OpenAPI document.

use std::sync::Arc;
use std::time::Duration;

use axum::{Router, routing::get};
use sea_orm::DatabaseConnection;
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::config::AppConfig;
use crate::handlers;
use crate::pagination::AggregateFallback;

/// Application state containing shared resources
#[derive(Clone)]
pub struct AppState {
    pub db: DatabaseConnection,
    pub config: AppConfig,
    /// Count strategy chain, ordered cheapest-first, built once at startup.
    pub count_chain: Arc<AggregateFallback>,
}

impl AppState {
    pub fn new(db: DatabaseConnection, config: AppConfig) -> Self {
        let count_chain = Arc::new(AggregateFallback::standard(
            db.clone(),
            Duration::from_millis(config.count.timeout_ms),
        ));
        Self {
            db,
            config,
            count_chain,
        }
    }
}

/// Creates and configures the Axum application router
pub fn create_app(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::root))
        .route("/records", get(handlers::list_records))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
        .merge(SwaggerUi::new("/docs").url("/openapi.json", ApiDoc::openapi()))
}

/// Starts the server with the given configuration
pub async fn run_server(
    config: AppConfig,
    db: DatabaseConnection,
) -> Result<(), Box<dyn std::error::Error>> {
    let addr = config
        .bind_addr()
        .map_err(|e| format!("Invalid server address: {}", e))?;
    let profile = config.profile.clone();

    let state = AppState::new(db, config);
    let app = create_app(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    println!("Server listening on: {}", addr);
    println!("Running in profile: {}", profile);

    axum::serve(listener, app).await?;

    Ok(())
}

/// OpenAPI documentation
#[derive(OpenApi)]
#[openapi(
    paths(
        crate::handlers::root,
        crate::handlers::records::list_records,
    ),
    components(
        schemas(
            crate::models::ServiceInfo,
            crate::handlers::records::RecordInfo,
        )
    ),
    info(
        title = "Pagecraft API",
        description = "Paginated collection browsing with reconciled totals",
        version = env!("CARGO_PKG_VERSION"),
    )
)]
pub struct ApiDoc;
