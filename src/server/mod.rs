//! HTTP form server
//!
//! Serves the estimation form, a JSON API over the same pipeline and the
//! feature-importance chart. Each browser session is identified by the
//! `rumah_session` cookie and owns its own prediction history.

use axum::routing::{delete, get, post};
use axum::Router;
use std::sync::Arc;
use tracing::warn;

use crate::pipeline::Estimator;
use crate::session::store::SessionStore;
use crate::utils::plot::importance_chart_svg;

pub mod error;
pub mod handlers;
pub mod render;
pub mod session;

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    pub estimator: Estimator,
    pub sessions: Arc<SessionStore>,
    /// Pre-rendered importance chart; `None` when rendering failed
    pub importance_svg: Option<Arc<String>>,
}

impl AppState {
    pub fn new(estimator: Estimator) -> Self {
        let importance_svg = match importance_chart_svg(&estimator.importances()) {
            Ok(svg) => Some(Arc::new(svg)),
            Err(e) => {
                warn!(error = %e, "Feature importance chart unavailable");
                None
            }
        };

        AppState {
            estimator,
            sessions: Arc::new(SessionStore::new()),
            importance_svg,
        }
    }

    /// Replaces the default session store, e.g. to apply configured limits.
    pub fn with_sessions(mut self, sessions: SessionStore) -> Self {
        self.sessions = Arc::new(sessions);
        self
    }
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::index))
        .route("/predict", post(handlers::submit_form))
        .route("/importances.svg", get(handlers::importance_chart))
        .route("/api/predict", post(handlers::predict_json))
        .route("/api/history", get(handlers::history))
        .route("/api/importances", get(handlers::importances))
        .route("/api/session", delete(handlers::end_session))
        .route("/health", get(handlers::health))
        .with_state(state)
}
