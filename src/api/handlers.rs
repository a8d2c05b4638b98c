//! HTTP request handlers for the Tariff Engine API.
//!
//! This module contains the handler functions for all API endpoints.

use std::time::Instant;

use axum::{
    Json, Router,
    extract::{State, rejection::JsonRejection},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use chrono::Utc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::calculation::compute_fee;
use crate::error::{EngineError, EngineResult};
use crate::models::FeeCalculationResult;

use super::request::FeeRequest;
use super::response::{ApiError, ApiErrorResponse, TariffListResponse, TariffSummary};
use super::state::AppState;

/// Creates the API router with all endpoints.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/calculate", post(calculate_handler))
        .route("/tariffs", get(tariffs_handler))
        .with_state(state)
}

fn json_response<T: serde::Serialize>(status: StatusCode, body: T) -> Response {
    (
        status,
        [(header::CONTENT_TYPE, "application/json")],
        Json(body),
    )
        .into_response()
}

fn error_response(err: EngineError) -> Response {
    let api_error: ApiErrorResponse = err.into();
    json_response(api_error.status, api_error.error)
}

/// Handler for POST /calculate endpoint.
///
/// Accepts a fee request and returns the computed fee with its breakdown.
async fn calculate_handler(
    State(state): State<AppState>,
    payload: Result<Json<FeeRequest>, JsonRejection>,
) -> Response {
    let correlation_id = Uuid::new_v4();
    info!(correlation_id = %correlation_id, "Processing fee request");

    let request = match payload {
        Ok(Json(req)) => req,
        Err(rejection) => {
            let error = match rejection {
                JsonRejection::JsonDataError(err) => {
                    let body_text = err.body_text();
                    warn!(
                        correlation_id = %correlation_id,
                        error = %body_text,
                        "JSON data error"
                    );
                    if body_text.contains("missing field") {
                        ApiError::validation_error(body_text)
                    } else {
                        ApiError::malformed_json(body_text)
                    }
                }
                JsonRejection::JsonSyntaxError(err) => {
                    warn!(
                        correlation_id = %correlation_id,
                        error = %err,
                        "JSON syntax error"
                    );
                    ApiError::malformed_json(format!("Invalid JSON syntax: {}", err))
                }
                JsonRejection::MissingJsonContentType(_) => {
                    ApiError::new("MISSING_CONTENT_TYPE", "Content-Type must be application/json")
                }
                _ => ApiError::malformed_json("Failed to parse request body"),
            };
            return json_response(StatusCode::BAD_REQUEST, error);
        }
    };

    let start_time = Instant::now();
    let outcome = tokio::task::spawn_blocking(move || perform_calculation(&request, &state))
        .await
        .unwrap_or_else(|err| {
            Err(EngineError::CalculationError {
                message: format!("calculation task failed: {}", err),
            })
        });
    match outcome {
        Ok(mut result) => {
            let duration_us = u64::try_from(start_time.elapsed().as_micros()).unwrap_or(u64::MAX);
            result.duration_us = duration_us;
            info!(
                correlation_id = %correlation_id,
                lot_id = result.lot_id.as_deref().unwrap_or("-"),
                duration_minutes = result.duration_minutes,
                total_fee = result.breakdown.total_fee,
                caps_applied = result.breakdown.caps_applied.len(),
                warnings = result.breakdown.warnings.len(),
                duration_us,
                "Fee computed"
            );
            json_response(StatusCode::OK, result)
        }
        Err(err) => {
            warn!(
                correlation_id = %correlation_id,
                error = %err,
                "Fee calculation failed"
            );
            error_response(err)
        }
    }
}

/// Handler for GET /tariffs endpoint.
async fn tariffs_handler(State(state): State<AppState>) -> Response {
    let config = state.config();
    let tariffs = config
        .config()
        .tariffs()
        .values()
        .map(|tariff| TariffSummary {
            lot_id: tariff.lot_id.clone(),
            name: tariff.name.clone(),
            rule_count: tariff.rules.len(),
        })
        .collect();

    json_response(
        StatusCode::OK,
        TariffListResponse {
            currency: config.metadata().currency.clone(),
            tariffs,
        },
    )
}

/// Resolves the request's tariff, calendar and session, then computes the fee.
///
/// Runs on the blocking pool: long sessions with many cap windows keep the
/// optimizer busy for a while.
fn perform_calculation(request: &FeeRequest, state: &AppState) -> EngineResult<FeeCalculationResult> {
    let rules = state.rules_for(request)?;
    state.check_duration(request.duration_minutes)?;

    let calendar = state.calendar_for(request);
    let session = request.session();
    let breakdown = compute_fee(&rules, &session, &calendar)?;

    Ok(FeeCalculationResult {
        calculation_id: Uuid::new_v4(),
        timestamp: Utc::now(),
        engine_version: env!("CARGO_PKG_VERSION").to_string(),
        lot_id: request.lot_id.clone(),
        parking_start: request.parking_start,
        duration_minutes: request.duration_minutes,
        breakdown,
        duration_us: 0,
    })
}
