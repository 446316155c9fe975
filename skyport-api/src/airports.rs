use axum::{
    extract::{Path, Query, RawQuery, State},
    http::StatusCode,
    response::Response,
    routing::get,
    Json, Router,
};
use uuid::Uuid;

use skyport_core::fleet::Airport;
use skyport_store::airport_repo::{AirportFilter, AirportPayload};

use crate::cache;
use crate::error::AppError;
use crate::middleware::auth::{require_staff, require_user, MaybeClaims};
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/v1/airports", get(list_airports).post(create_airport))
        .route("/v1/airports/{id}", get(get_airport).put(update_airport))
}

async fn list_airports(
    State(state): State<AppState>,
    RawQuery(raw): RawQuery,
    Query(filter): Query<AirportFilter>,
) -> Result<Response, AppError> {
    let key = cache::view_key("airports", raw.as_deref());
    if let Some(body) = cache::lookup(&state, &key).await {
        return Ok(cache::json_body(body));
    }

    let airports = state.airports.list(&filter).await?;
    let body = serde_json::to_string(&airports).map_err(anyhow::Error::from)?;
    cache::store(&state, &key, &body).await;
    Ok(cache::json_body(body))
}

async fn get_airport(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Airport>, AppError> {
    let airport = state
        .airports
        .get(id)
        .await?
        .ok_or_else(|| AppError::NotFoundError("Airport not found".to_string()))?;
    Ok(Json(airport))
}

async fn create_airport(
    State(state): State<AppState>,
    MaybeClaims(claims): MaybeClaims,
    Json(payload): Json<AirportPayload>,
) -> Result<(StatusCode, Json<Airport>), AppError> {
    require_user(claims.as_ref())?;

    let airport = state.airports.create(&payload).await?;
    cache::invalidate(&state, "airport").await;
    Ok((StatusCode::CREATED, Json(airport)))
}

async fn update_airport(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    MaybeClaims(claims): MaybeClaims,
    Json(payload): Json<AirportPayload>,
) -> Result<Json<Airport>, AppError> {
    require_staff(claims.as_ref())?;

    let airport = state
        .airports
        .update(id, &payload)
        .await?
        .ok_or_else(|| AppError::NotFoundError("Airport not found".to_string()))?;
    cache::invalidate(&state, "airport").await;
    Ok(Json(airport))
}
