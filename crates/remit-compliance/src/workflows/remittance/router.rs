use std::sync::Arc;

use axum::{
    extract::State,
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use chrono::Utc;
use serde_json::json;
use tracing::{error, warn};

use super::service::RemittanceComplianceService;
use crate::error::AppError;

pub const RUN_PATH: &str = "/api/v1/remittance/compliance/run";

#[derive(Clone)]
pub struct ComplianceRouterState {
    pub service: Arc<RemittanceComplianceService>,
    /// Bearer token the scheduler must present. `None` rejects every trigger.
    pub trigger_secret: Option<Arc<str>>,
}

/// Router exposing the scheduled run trigger. Schedulers differ on verb, so GET and POST both run.
pub fn compliance_router(
    service: Arc<RemittanceComplianceService>,
    trigger_secret: Option<String>,
) -> Router {
    let state = ComplianceRouterState {
        service,
        trigger_secret: trigger_secret.map(Arc::from),
    };

    Router::new()
        .route(RUN_PATH, get(run_handler).post(run_handler))
        .with_state(state)
}

pub(crate) async fn run_handler(
    State(state): State<ComplianceRouterState>,
    headers: HeaderMap,
) -> Response {
    if let Err(reason) = authorize(&headers, state.trigger_secret.as_deref()) {
        warn!(reason, "rejected compliance run trigger");
        let payload = json!({ "error": "unauthorized" });
        return (StatusCode::UNAUTHORIZED, axum::Json(payload)).into_response();
    }

    let service = state.service.clone();
    let now = Utc::now();
    match tokio::task::spawn_blocking(move || service.run(now)).await {
        Ok(Ok(report)) => (StatusCode::OK, axum::Json(report)).into_response(),
        Ok(Err(run_error)) => {
            error!(%run_error, "compliance run aborted");
            AppError::from(run_error).into_response()
        }
        Err(join_error) => {
            error!(%join_error, "compliance run task failed");
            let payload = json!({ "error": "compliance run task failed" });
            (StatusCode::INTERNAL_SERVER_ERROR, axum::Json(payload)).into_response()
        }
    }
}

fn authorize(headers: &HeaderMap, secret: Option<&str>) -> Result<(), &'static str> {
    let secret = secret.ok_or("no trigger secret configured")?;
    let value = headers
        .get(header::AUTHORIZATION)
        .ok_or("missing authorization header")?
        .to_str()
        .map_err(|_| "authorization header is not valid ascii")?;

    let (scheme, token) = value
        .trim()
        .split_once(' ')
        .ok_or("malformed authorization header")?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return Err("authorization scheme must be bearer");
    }

    if constant_time_eq(token.trim().as_bytes(), secret.as_bytes()) {
        Ok(())
    } else {
        Err("bearer token mismatch")
    }
}

fn constant_time_eq(left: &[u8], right: &[u8]) -> bool {
    if left.len() != right.len() {
        return false;
    }
    left.iter()
        .zip(right)
        .fold(0u8, |diff, (a, b)| diff | (a ^ b))
        == 0
}
