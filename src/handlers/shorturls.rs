use crate::{
    error::LinkError,
    models::LinkStats,
    service::CreateLink,
    AppState,
};
use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Deserialize)]
pub struct CreateShortUrl {
    #[serde(default)]
    url: String,
    validity: Option<i64>,
    shortcode: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatedShortUrl {
    short_link: String,
    expiry: DateTime<Utc>,
}

/// POST /shorturls
pub async fn create(
    State(state): State<Arc<AppState>>,
    body: Result<Json<CreateShortUrl>, JsonRejection>,
) -> Result<(StatusCode, Json<CreatedShortUrl>), LinkError> {
    // Malformed bodies get the same JSON error shape as every other rejection.
    let Json(body) = body.map_err(|rejection| {
        tracing::warn!("Rejected create body: {}", rejection.body_text());
        LinkError::InvalidRequest(rejection.body_text())
    })?;

    let shortcode = body
        .shortcode
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_owned);

    let record = state.service.create(CreateLink {
        url: body.url.trim().to_owned(),
        validity_minutes: body.validity,
        shortcode,
    })?;

    Ok((
        StatusCode::CREATED,
        Json(CreatedShortUrl {
            short_link: state.config.short_link(&record.shortcode),
            expiry: record.expiry_at,
        }),
    ))
}

/// GET /shorturls/:code
pub async fn stats(
    State(state): State<Arc<AppState>>,
    Path(code): Path<String>,
) -> Result<Json<LinkStats>, LinkError> {
    Ok(Json(state.service.stats(&code)?))
}
