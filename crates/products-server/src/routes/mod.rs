pub mod products;

use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::{Json, Router};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use products_core::model::Envelope;

use crate::AppState;
use crate::db::DbError;

/// Every route, with CORS and request tracing applied.
pub fn app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .merge(products::router())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Shared error type for route handlers. Every failure becomes a 500 with the
/// error envelope; the kind is only visible in the logs.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error(transparent)]
    Db(#[from] DbError),
    #[error("invalid request body: {0}")]
    Body(#[from] JsonRejection),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let message = self.to_string();
        tracing::error!(error = ?self, "request failed");
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(Envelope::error(message)),
        )
            .into_response()
    }
}

/// Convenience type alias for route handler results.
pub type ApiResult<T> = Result<T, ApiError>;
