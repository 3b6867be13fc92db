use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::Response,
};
use serde::Deserialize;

use super::{text, ApiError};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct CleanupParams {
    token: Option<String>,
}

pub async fn api_cleanup(
    State(state): State<Arc<AppState>>,
    Query(params): Query<CleanupParams>,
) -> Result<Response, ApiError> {
    let deleted = state.receiver.cleanup(params.token.as_deref()).await?;
    Ok(text(StatusCode::OK, format!("Deleted {deleted} items")))
}

#[derive(Debug, Deserialize)]
pub struct ImportParams {
    token: Option<String>,
    /// webmention.io API token.
    webmentionio: Option<String>,
}

pub async fn api_import(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ImportParams>,
) -> Result<Response, ApiError> {
    let summary = state
        .receiver
        .import(params.token.as_deref(), params.webmentionio.as_deref())
        .await?;
    Ok(text(StatusCode::OK, summary.to_string()))
}
