use std::collections::BTreeMap;
use std::sync::Arc;

use axum::{
    extract::{rejection::FormRejection, Form, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::Deserialize;

use webmention_common::Mention;

use super::{text, ApiError};
use crate::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct SubmitParams {
    source: Option<String>,
    target: Option<String>,
}

/// `POST /webmention`. Fields come from the form body, falling back to the
/// query string.
pub async fn api_submit(
    State(state): State<Arc<AppState>>,
    Query(query): Query<SubmitParams>,
    form: Result<Form<SubmitParams>, FormRejection>,
) -> Result<Response, ApiError> {
    let form = form.map(|Form(f)| f).unwrap_or_default();
    let source = form.source.or(query.source);
    let target = form.target.or(query.target);

    let disposition = state
        .receiver
        .submit(source.as_deref(), target.as_deref())
        .await?;

    let status = StatusCode::from_u16(disposition.code()).unwrap_or(StatusCode::ACCEPTED);
    Ok(text(status, "accepted"))
}

#[derive(Debug, Deserialize)]
pub struct LookupParams {
    url: Option<String>,
    #[serde(rename = "type")]
    mention_type: Option<String>,
    token: Option<String>,
}

/// `GET /webmentions?url=&type=`, or `?token=` for everything.
pub async fn api_webmentions(
    State(state): State<Arc<AppState>>,
    Query(params): Query<LookupParams>,
) -> Result<impl IntoResponse, ApiError> {
    let mentions: BTreeMap<String, Vec<Mention>> = state
        .receiver
        .lookup(
            params.url.as_deref(),
            params.mention_type.as_deref(),
            params.token.as_deref(),
        )
        .await?;
    Ok(Json(mentions))
}
