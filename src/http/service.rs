//! Request handlers.

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use axum::routing::{get, post};
use axum::Router;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, error, instrument, warn};

use crate::error::WardenError;
use crate::ratelimit::{Algorithm, Policy, RateLimitMetrics, RateLimitResult, RateLimiterManager};

/// Prefix the API routes are additionally mounted under.
pub const API_PREFIX: &str = "/api";

/// Build the router serving the rate limit API, both at the root and under
/// [`API_PREFIX`].
pub fn router(manager: Arc<RateLimiterManager>) -> Router {
    let api = Router::new()
        .route("/config", post(configure))
        .route("/request", post(request))
        .route("/metrics", get(metrics));

    Router::new()
        .merge(api.clone())
        .nest(API_PREFIX, api)
        .route("/health", get(|| async { "OK" }))
        .with_state(manager)
}

/// Body returned after a policy is installed.
#[derive(Debug, Serialize, Deserialize)]
pub struct ConfigureResponse {
    pub status: String,
    pub algorithm: Algorithm,
}

/// Error body format.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Error message
    pub error: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RequestParams {
    client_id: String,
}

struct ApiError(WardenError);

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            WardenError::NotConfigured => StatusCode::SERVICE_UNAVAILABLE,
            WardenError::InvalidAlgorithm(_) | WardenError::InvalidPolicy(_) => {
                StatusCode::BAD_REQUEST
            }
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };

        if status.is_server_error() {
            error!(error = %self.0, "Rate limiter error");
        } else {
            warn!(error = %self.0, "Rejected rate limit call");
        }

        (
            status,
            Json(ErrorResponse {
                error: self.0.to_string(),
            }),
        )
            .into_response()
    }
}

impl From<WardenError> for ApiError {
    fn from(e: WardenError) -> Self {
        Self(e)
    }
}

#[instrument(skip(manager, policy), fields(algorithm = %policy.algorithm))]
async fn configure(
    manager: State<Arc<RateLimiterManager>>,
    policy: Json<Policy>,
) -> Result<Json<ConfigureResponse>, ApiError> {
    let algorithm = manager.configure(&policy)?;
    Ok(Json(ConfigureResponse {
        status: "configured".to_string(),
        algorithm,
    }))
}

#[instrument(skip(manager, params), fields(client_id = %params.client_id))]
async fn request(
    manager: State<Arc<RateLimiterManager>>,
    params: Query<RequestParams>,
) -> Result<(StatusCode, Json<RateLimitResult>), ApiError> {
    let result = manager.handle(&params.client_id)?;

    let status = if result.allowed {
        StatusCode::OK
    } else {
        debug!(retry_after_millis = result.retry_after_millis, "Request rate limited");
        StatusCode::TOO_MANY_REQUESTS
    };
    Ok((status, Json(result)))
}

async fn metrics(State(manager): State<Arc<RateLimiterManager>>) -> Json<RateLimitMetrics> {
    Json(manager.metrics())
}
