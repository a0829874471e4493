//! # stockline-server: Back-office HTTP API
//!
//! Thin axum layer over the inventory ledger.
//!
//! ## Request Path
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Browser                                                                │
//! │     │  JSON (camelCase)                                                 │
//! │     ▼                                                                   │
//! │  ┌──────────────────────────────────────────────────────────────────┐  │
//! │  │  TraceLayer ─► Cache-Control ─► (CORS) ─► Router                 │  │
//! │  └──────────────────────────────────────────────────────────────────┘  │
//! │     │                                                                   │
//! │     ▼                                                                   │
//! │  handler: ApiJson / ApiQuery / ApiPath (rejections → 400)              │
//! │     │                                                                   │
//! │     ├── reads  ──► Database repositories                               │
//! │     └── writes ──► InventoryLedger / Catalog (unit of work)            │
//! │     │                                                                   │
//! │     ▼                                                                   │
//! │  JSON body, or { kind, message } via ApiError                          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

pub mod config;
pub mod error;
pub mod extract;
pub mod routes;
pub mod state;

use axum::http::{header, HeaderValue};
use axum::Router;
use stockline_core::ErrorKind;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::trace::TraceLayer;

pub use config::ServerConfig;
pub use error::ApiError;
pub use state::AppState;

const NO_CACHE: &str = "no-cache, no-store, must-revalidate";

/// Builds the full application router.
pub fn build_app(state: AppState, config: &ServerConfig) -> Router {
    let middleware = ServiceBuilder::new()
        .layer(TraceLayer::new_for_http())
        .layer(SetResponseHeaderLayer::overriding(
            header::CACHE_CONTROL,
            HeaderValue::from_static(NO_CACHE),
        ));

    let app = routes::api_router()
        .fallback(route_not_found)
        .with_state(state)
        .layer(middleware);

    if config.cors_allow_any {
        app.layer(CorsLayer::permissive())
    } else {
        app
    }
}

async fn route_not_found() -> ApiError {
    ApiError::new(ErrorKind::NotFound, "Route not found")
}
