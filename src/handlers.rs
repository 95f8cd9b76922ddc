use std::sync::Arc;

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tower_http::cors::CorsLayer;

use crate::annotate::{AnnotateRequest, Annotation, Annotator};
use crate::candidates::DEFAULT_MAX_CANDIDATES;
use crate::snowstorm::SnowstormClient;

#[derive(Clone)]
pub struct AppState {
    pub annotator: Arc<Annotator<SnowstormClient>>,
    /// Upper bound applied to caller-supplied `max_candidates`.
    pub max_candidates_limit: usize,
}

/// Body of `POST /annotate`. Every field is optional; a missing or null
/// `text` is treated as empty text.
#[derive(Debug, Deserialize)]
pub struct AnnotateBody {
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default, alias = "maxCandidates")]
    pub max_candidates: Option<usize>,
    #[serde(default)]
    pub lang: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AnnotateQuery {
    pub q: String,
}

#[derive(Serialize)]
struct HealthResponse<'a> {
    ok: bool,
    snowstorm: &'a str,
    lang: &'a str,
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/annotate", get(annotate_query).post(annotate))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn healthz(State(state): State<AppState>) -> Response {
    Json(HealthResponse {
        ok: true,
        snowstorm: state.annotator.source(),
        lang: state.annotator.default_lang(),
    })
    .into_response()
}

async fn annotate(
    State(state): State<AppState>,
    payload: Result<Json<AnnotateBody>, JsonRejection>,
) -> Result<Json<Annotation>, ApiError> {
    let Json(body) = payload.map_err(|e| ApiError::bad_request(e.body_text()))?;
    let max_candidates = resolve_max_candidates(body.max_candidates, state.max_candidates_limit)?;

    let annotation = state
        .annotator
        .annotate(AnnotateRequest {
            text: body.text.unwrap_or_default(),
            max_candidates: Some(max_candidates),
            lang: body.lang,
        })
        .await;
    Ok(Json(annotation))
}

/// `GET /annotate?q=...`, same as posting `{"text": q}`.
async fn annotate_query(
    State(state): State<AppState>,
    params: Result<Query<AnnotateQuery>, QueryRejection>,
) -> Result<Json<Annotation>, ApiError> {
    let Query(params) = params.map_err(|e| ApiError::bad_request(e.body_text()))?;
    let max_candidates = resolve_max_candidates(None, state.max_candidates_limit)?;

    let annotation = state
        .annotator
        .annotate(AnnotateRequest {
            text: params.q,
            max_candidates: Some(max_candidates),
            lang: None,
        })
        .await;
    Ok(Json(annotation))
}

fn resolve_max_candidates(requested: Option<usize>, limit: usize) -> Result<usize, ApiError> {
    let requested = requested.unwrap_or(DEFAULT_MAX_CANDIDATES);
    if requested == 0 {
        return Err(ApiError::bad_request("max_candidates must be >= 1"));
    }
    Ok(requested.min(limit))
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),
}

impl ApiError {
    fn bad_request<T: Into<String>>(msg: T) -> Self {
        ApiError::BadRequest(msg.into())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::BadRequest(msg) => {
                let body = Json(ErrorResponse { error: msg });
                (StatusCode::BAD_REQUEST, body).into_response()
            }
        }
    }
}
