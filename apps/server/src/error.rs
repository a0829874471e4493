//! # API Error Type
//!
//! Unified error type for HTTP handlers.
//!
//! ## Error Handling Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Flow in Stockline                              │
//! │                                                                         │
//! │  Frontend                    Rust Backend                               │
//! │  ────────                    ────────────                               │
//! │                                                                         │
//! │  fetch('/api/sales', POST)                                             │
//! │         │                                                               │
//! │         ▼                                                               │
//! │  ┌──────────────────────────────────────────────────────────────────┐  │
//! │  │  Handler                                                         │  │
//! │  │  Result<T, ApiError>                                             │  │
//! │  │         │                                                        │  │
//! │  │         ▼                                                        │  │
//! │  │  Body rejected? ─── unknown field / bad JSON ───────┐           │  │
//! │  │         │                                           │           │  │
//! │  │         ▼                                           ▼           │  │
//! │  │  Ledger Error? ─── LedgerError::Domain(..) ──────► ApiError ───►│  │
//! │  │         │          LedgerError::Persistence(..)     (logged)    │  │
//! │  │         ▼                                                        │  │
//! │  │  Success ──────────────────────────────────────────────────────►│  │
//! │  └──────────────────────────────────────────────────────────────────┘  │
//! │                                                                         │
//! │  if (!res.ok) {                                                         │
//! │    const e = await res.json()                                           │
//! │    // e.kind = "INSUFFICIENT_STOCK"                                     │
//! │    // e.message = "Insufficient stock for RICE-1KG: available 3, ..."   │
//! │  }                                                                      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Status Codes
//! | Kind | Status |
//! |---|---|
//! | `INVALID_INPUT`, `DUPLICATE_KEY`, `INSUFFICIENT_STOCK` | 400 |
//! | `PRODUCT_NOT_FOUND`, `SALE_NOT_FOUND`, `NOT_FOUND` | 404 |
//! | `PERSISTENCE_ERROR` | 500 |

use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use stockline_core::{CoreError, ErrorKind, ValidationError};
use stockline_db::{DbError, LedgerError};

/// API error returned from handlers.
///
/// ## Serialization
/// This is what the frontend receives when a request fails:
/// ```json
/// {
///   "kind": "PRODUCT_NOT_FOUND",
///   "message": "Product not found: 42"
/// }
/// ```
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiError {
    /// Machine-readable error kind for programmatic handling
    pub kind: ErrorKind,

    /// Human-readable error message for display
    pub message: String,
}

impl ApiError {
    /// Creates a new API error.
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        ApiError {
            kind,
            message: message.into(),
        }
    }

    /// Creates an invalid input error.
    pub fn invalid(message: impl Into<String>) -> Self {
        ApiError::new(ErrorKind::InvalidInput, message)
    }

    /// Creates a not found error for a category or supplier.
    pub fn not_found(entity: &str, id: i64) -> Self {
        ApiError::new(ErrorKind::NotFound, format!("{entity} not found: {id}"))
    }

    /// HTTP status for this error's kind.
    pub fn status(&self) -> StatusCode {
        match self.kind {
            ErrorKind::InvalidInput | ErrorKind::DuplicateKey | ErrorKind::InsufficientStock => {
                StatusCode::BAD_REQUEST
            }
            ErrorKind::ProductNotFound | ErrorKind::SaleNotFound | ErrorKind::NotFound => {
                StatusCode::NOT_FOUND
            }
            ErrorKind::PersistenceError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status(), Json(self)).into_response()
    }
}

/// Converts database errors to API errors.
///
/// Details are logged; the response carries a generic message.
impl From<DbError> for ApiError {
    fn from(err: DbError) -> Self {
        tracing::error!(error = %err, "Database operation failed");
        ApiError::new(ErrorKind::PersistenceError, "Database operation failed")
    }
}

/// Converts core errors to API errors.
impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        let message = match &err {
            CoreError::Validation(e) => e.to_string(),
            other => other.to_string(),
        };
        ApiError::new(err.kind(), message)
    }
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        ApiError::invalid(err.to_string())
    }
}

/// Converts ledger errors to API errors.
impl From<LedgerError> for ApiError {
    fn from(err: LedgerError) -> Self {
        match err {
            LedgerError::Domain(e) => e.into(),
            LedgerError::Persistence(e) => e.into(),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::invalid(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::invalid(rejection.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        ApiError::invalid(rejection.body_text())
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{:?}] {}", self.kind, self.message)
    }
}

impl std::error::Error for ApiError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        let cases = [
            (ErrorKind::InvalidInput, StatusCode::BAD_REQUEST),
            (ErrorKind::DuplicateKey, StatusCode::BAD_REQUEST),
            (ErrorKind::InsufficientStock, StatusCode::BAD_REQUEST),
            (ErrorKind::ProductNotFound, StatusCode::NOT_FOUND),
            (ErrorKind::SaleNotFound, StatusCode::NOT_FOUND),
            (ErrorKind::NotFound, StatusCode::NOT_FOUND),
            (ErrorKind::PersistenceError, StatusCode::INTERNAL_SERVER_ERROR),
        ];

        for (kind, status) in cases {
            assert_eq!(ApiError::new(kind, "x").status(), status);
        }
    }

    #[test]
    fn test_persistence_details_are_hidden() {
        let err: ApiError = LedgerError::Persistence(DbError::QueryFailed(
            "disk I/O error at page 7".to_string(),
        ))
        .into();

        assert_eq!(err.kind, ErrorKind::PersistenceError);
        assert!(!err.message.contains("page 7"));
    }

    #[test]
    fn test_serialized_shape() {
        let err: ApiError = CoreError::ProductNotFound(42).into();
        let json = serde_json::to_value(&err).unwrap();
        assert_eq!(json["kind"], "PRODUCT_NOT_FOUND");
        assert!(json.get("code").is_none());
        assert_eq!(json["message"], "Product not found: 42");
    }
}
