//! # HTTP Routes
//!
//! One module per resource, each exposing a `router()` merged here.
//!
//! ## Route Map
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Module        │  Routes                                               │
//! │  ─────────────────────────────────────────────────────────────────────  │
//! │  health        │  GET  /health                                         │
//! │  products      │  GET|POST /api/products, POST /api/products/quote     │
//! │                │  GET|PUT|DELETE /api/products/:id                     │
//! │  movements     │  GET|POST /api/movements                              │
//! │  sales         │  GET|POST|DELETE /api/sales                           │
//! │                │  GET|DELETE /api/sales/:id                            │
//! │  categories    │  GET|POST /api/categories, GET|PUT|DELETE ../:id      │
//! │  suppliers     │  GET|POST /api/suppliers, GET|PUT|DELETE ../:id       │
//! │  dashboard     │  GET  /api/dashboard                                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

pub mod categories;
pub mod dashboard;
pub mod health;
pub mod movements;
pub mod products;
pub mod sales;
pub mod suppliers;

use axum::Router;
use serde::Serialize;

use crate::state::AppState;

/// Every route, still waiting for its state.
pub fn api_router() -> Router<AppState> {
    Router::new()
        .merge(health::router())
        .merge(products::router())
        .merge(movements::router())
        .merge(sales::router())
        .merge(categories::router())
        .merge(suppliers::router())
        .merge(dashboard::router())
}

/// Body of deletes that have nothing else to return.
#[derive(Debug, Clone, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        MessageResponse {
            message: message.into(),
        }
    }
}
