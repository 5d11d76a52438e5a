use axum::extract::rejection::FormRejection;
use axum::extract::State;
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{Html, IntoResponse, Response};
use axum::{Form, Json};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::Error;
use crate::model::features::{FeatureVector, PropertyInput};
use crate::model::predictor::FeatureImportance;
use crate::pipeline::Estimate;
use crate::server::error::ApiError;
use crate::server::render::{render_page, Outcome, PageView};
use crate::server::session::{expired_session_cookie, session_cookie, session_from_headers};
use crate::server::AppState;
use crate::session::history::{PredictionHistory, PredictionResult};

fn with_cookie(id: Uuid, response: impl IntoResponse) -> Response {
    ([(header::SET_COOKIE, session_cookie(id))], response).into_response()
}

/// Refreshes the cookie only when the request belongs to a live session.
fn with_optional_cookie(id: Option<Uuid>, response: impl IntoResponse) -> Response {
    match id {
        Some(id) => with_cookie(id, response),
        None => response.into_response(),
    }
}

fn history_of(state: &AppState, id: Option<Uuid>) -> PredictionHistory {
    id.map(|id| state.sessions.snapshot(id)).unwrap_or_default()
}

/// Runs the estimate off the async workers; only this session's history is
/// locked while the model runs.
async fn estimate_in_session(state: &AppState, id: Uuid, input: &PropertyInput) -> crate::error::Result<Estimate> {
    let sessions = Arc::clone(&state.sessions);
    let estimator = state.estimator.clone();
    let input = input.clone();
    tokio::task::spawn_blocking(move || sessions.with_history(id, |history| estimator.estimate(&input, history)))
        .await
        .unwrap_or_else(|e| Err(Error::Prediction(format!("estimate task failed: {}", e))))
}

fn page(state: &AppState, input: &PropertyInput, outcome: Option<Outcome<'_>>, history: &PredictionHistory) -> Html<String> {
    let importances = state.estimator.importances();
    let currency = state.estimator.currency();
    Html(render_page(&PageView {
        encoder: state.estimator.encoder(),
        input,
        outcome,
        history,
        importances: &importances,
        show_chart: state.importance_svg.is_some(),
        currency,
    }))
}

/// GET /
pub async fn index(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let id = state.sessions.resume(session_from_headers(&headers));
    let history = history_of(&state, id);
    with_optional_cookie(id, page(&state, &PropertyInput::default(), None, &history))
}

/// POST /predict
pub async fn submit_form(
    State(state): State<AppState>,
    headers: HeaderMap,
    form: Result<Form<PropertyInput>, FormRejection>,
) -> Response {
    let input = match form {
        Ok(Form(input)) => input,
        Err(rejection) => {
            warn!(error = %rejection, "Rejected form submission");
            let id = state.sessions.resume(session_from_headers(&headers));
            let history = history_of(&state, id);
            let outcome = Outcome::Warning(rejection.body_text());
            return with_optional_cookie(id, page(&state, &PropertyInput::default(), Some(outcome), &history));
        }
    };

    let id = state.sessions.resume_or_start(session_from_headers(&headers));
    let result = estimate_in_session(&state, id, &input).await;
    let history = state.sessions.snapshot(id);

    let body = match &result {
        Ok(estimate) => page(&state, &input, Some(Outcome::Estimate(estimate)), &history),
        Err(Error::Validation(message)) => page(&state, &input, Some(Outcome::Warning(message.clone())), &history),
        Err(e) => page(&state, &input, Some(Outcome::Failure(e.to_string())), &history),
    };
    with_cookie(id, body)
}

/// POST /api/predict
pub async fn predict_json(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(input): Json<PropertyInput>,
) -> Response {
    let id = state.sessions.resume_or_start(session_from_headers(&headers));
    let result = estimate_in_session(&state, id, &input).await.map_err(ApiError::from);

    match result {
        Ok(estimate) => with_cookie(id, Json(estimate)),
        Err(e) => with_cookie(id, e),
    }
}

#[derive(Debug, Serialize)]
pub struct HistoryEntry {
    pub timestamp: String,
    pub predicted_price: f64,
    pub formatted_price: String,
    pub input: FeatureVector,
}

/// GET /api/history
///
/// A request without a live session gets an empty list and no new session.
pub async fn history(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let id = state.sessions.resume(session_from_headers(&headers));
    let history = history_of(&state, id);
    let entries: Vec<HistoryEntry> = history
        .entries()
        .iter()
        .map(|entry: &PredictionResult| HistoryEntry {
            timestamp: entry.display_time(),
            predicted_price: entry.predicted_price,
            formatted_price: state.estimator.format_price(entry.predicted_price),
            input: entry.input.clone(),
        })
        .collect();
    with_optional_cookie(id, Json(entries))
}

/// DELETE /api/session
pub async fn end_session(State(state): State<AppState>, headers: HeaderMap) -> Response {
    if let Some(id) = session_from_headers(&headers) {
        let ended = state.sessions.end(id);
        debug!(session = %id, ended, "End session requested");
    }
    (
        StatusCode::NO_CONTENT,
        [(header::SET_COOKIE, expired_session_cookie())],
    )
        .into_response()
}

/// GET /api/importances
pub async fn importances(State(state): State<AppState>) -> Json<Vec<FeatureImportance>> {
    Json(state.estimator.importances())
}

/// GET /importances.svg
pub async fn importance_chart(State(state): State<AppState>) -> Response {
    match &state.importance_svg {
        Some(svg) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "image/svg+xml")],
            svg.as_str().to_owned(),
        )
            .into_response(),
        None => ApiError(Error::Plot("feature importance chart unavailable".to_string())).into_response(),
    }
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub reference_records: usize,
}

/// GET /health
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        reference_records: state.estimator.dataset().len(),
    })
}
