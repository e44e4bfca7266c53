use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use geodict_db::Gazetteer;
use geodict_parser::{GeoParser, LocatedPhrase};
use serde::{Deserialize, Serialize};
use serde_json::json;
use thiserror::Error;
use tracing::error;

#[derive(Clone)]
pub struct AppState {
    pub parser: Arc<GeoParser<Gazetteer>>,
    pub max_text_bytes: usize,
}

#[derive(Deserialize)]
pub struct LocationsRequest {
    pub text: String,
}

#[derive(Serialize)]
pub struct LocationsResponse {
    locations: Vec<LocatedPhrase>,
}

#[derive(Serialize)]
pub struct StatsResponse {
    countries: usize,
    regions: usize,
    cities: usize,
    country_keys: usize,
    region_keys: usize,
    city_keys: usize,
    cached_city_queries: usize,
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/v1/locations", get(locations_query).post(locations_body))
        .route("/v1/stats", get(stats))
        .with_state(state)
}

async fn healthz() -> impl IntoResponse {
    "ok"
}

async fn locations_query(
    State(state): State<AppState>,
    Query(params): Query<LocationsRequest>,
) -> Result<Json<LocationsResponse>, ApiError> {
    find_locations(state, params.text).await
}

async fn locations_body(
    State(state): State<AppState>,
    Json(body): Json<LocationsRequest>,
) -> Result<Json<LocationsResponse>, ApiError> {
    find_locations(state, body.text).await
}

async fn find_locations(
    state: AppState,
    text: String,
) -> Result<Json<LocationsResponse>, ApiError> {
    if text.trim().is_empty() {
        return Err(ApiError::bad_request("text is required"));
    }
    if text.len() > state.max_text_bytes {
        return Err(ApiError::bad_request(format!(
            "text must be at most {} bytes",
            state.max_text_bytes
        )));
    }

    // City lookups are synchronous and may touch the page cache.
    let parser = Arc::clone(&state.parser);
    let locations = tokio::task::spawn_blocking(move || parser.find_locations(&text))
        .await
        .map_err(|err| {
            error!("parse task failed: {err}");
            ApiError::Internal
        })?
        .map_err(|err| {
            error!("location parse failed: {err}");
            ApiError::Internal
        })?;

    Ok(Json(LocationsResponse { locations }))
}

async fn stats(State(state): State<AppState>) -> Json<StatsResponse> {
    let stats = state.parser.store().stats();
    Json(StatsResponse {
        countries: stats.countries,
        regions: stats.regions,
        cities: stats.cities,
        country_keys: stats.country_keys,
        region_keys: stats.region_keys,
        city_keys: stats.city_keys,
        cached_city_queries: stats.cached_city_queries,
    })
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),
    #[error("internal server error")]
    Internal,
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
            ApiError::Internal => {
                let body = Json(json!({ "error": "internal server error" }));
                (StatusCode::INTERNAL_SERVER_ERROR, body).into_response()
            }
        }
    }
}
