// src/api.rs
use std::collections::BTreeMap;
use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::get,
    Json, Router,
};
use metrics_exporter_prometheus::PrometheusHandle;
use tower_http::cors::CorsLayer;

use crate::alert::{AlertGate, AlertKind, LatchState};
use crate::board::{Board, SectionView};

#[derive(Clone)]
pub struct AppState {
    pub board: Arc<Board>,
    pub gate: Arc<AlertGate>,
    pub metrics: Option<PrometheusHandle>,
}

impl AppState {
    pub fn new(board: Arc<Board>, gate: Arc<AlertGate>) -> Self {
        Self {
            board,
            gate,
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.metrics = Some(handle);
        self
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { "OK" }))
        .route("/", get(index))
        .route("/clock", get(clock))
        .route("/sections", get(list_sections))
        .route("/sections/{id}", get(section))
        .route("/alerts", get(alerts))
        .route("/metrics", get(metrics))
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}

async fn index(State(state): State<AppState>) -> Html<String> {
    Html(state.board.page_html())
}

async fn clock(State(state): State<AppState>) -> String {
    state.board.clock()
}

async fn list_sections(State(state): State<AppState>) -> Json<Vec<SectionView>> {
    Json(state.board.sections())
}

async fn section(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    match state.board.section(&id) {
        Some(s) => Html(s.html).into_response(),
        None => (StatusCode::NOT_FOUND, format!("unknown section `{id}`")).into_response(),
    }
}

async fn alerts(State(state): State<AppState>) -> Json<BTreeMap<AlertKind, LatchState>> {
    Json(state.gate.snapshot())
}

async fn metrics(State(state): State<AppState>) -> Response {
    match &state.metrics {
        Some(h) => h.render().into_response(),
        None => (StatusCode::NOT_FOUND, "metrics recorder not installed").into_response(),
    }
}
