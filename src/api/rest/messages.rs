use std::sync::Arc;

use axum::Json;
use axum::Router;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::routing::post;
use serde::Deserialize;
use serde_json::Value;

use crate::error::AppError;
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/rpc", post(request))
        .route("/events", post(event))
}

/// A pattern name and its payload, as published by the other services.
#[derive(Debug, Deserialize)]
pub struct Envelope {
    pub pattern: String,
    #[serde(default)]
    pub data: Value,
}

async fn request(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<Envelope>, JsonRejection>,
) -> Result<Json<Value>, AppError> {
    let Json(envelope) = payload.map_err(|err| AppError::BadRequest(err.body_text()))?;
    let response = state
        .dispatcher
        .handle(&envelope.pattern, envelope.data)
        .await?;

    Ok(Json(response))
}

async fn event(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<Envelope>, JsonRejection>,
) -> Result<StatusCode, AppError> {
    let Json(envelope) = payload.map_err(|err| AppError::BadRequest(err.body_text()))?;
    state.dispatcher.emit(&envelope.pattern, envelope.data).await;

    Ok(StatusCode::ACCEPTED)
}
