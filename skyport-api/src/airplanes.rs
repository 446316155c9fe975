use axum::{
    extract::{Path, Query, RawQuery, State},
    http::StatusCode,
    response::Response,
    routing::get,
    Json, Router,
};
use uuid::Uuid;

use skyport_core::fleet::{Airplane, AirplaneType};
use skyport_store::fleet_repo::{
    AirplaneFilter, AirplanePayload, AirplaneTypeFilter, AirplaneTypePayload, AirplaneTypeView,
    AirplaneView,
};

use crate::cache;
use crate::error::AppError;
use crate::middleware::auth::{require_staff, require_user, MaybeClaims};
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/v1/airplane-types", get(list_types).post(create_type))
        .route("/v1/airplane-types/{id}", get(get_type).put(update_type))
        .route("/v1/airplanes", get(list_airplanes).post(create_airplane))
        .route("/v1/airplanes/{id}", get(get_airplane).put(update_airplane))
}

// ----------------------------------------------------------------------
// Airplane types
// ----------------------------------------------------------------------

async fn list_types(
    State(state): State<AppState>,
    RawQuery(raw): RawQuery,
    Query(filter): Query<AirplaneTypeFilter>,
) -> Result<Response, AppError> {
    let key = cache::view_key("airplane-types", raw.as_deref());
    if let Some(body) = cache::lookup(&state, &key).await {
        return Ok(cache::json_body(body));
    }

    let types = state.fleet.list_types(&filter).await?;
    let body = serde_json::to_string(&types).map_err(anyhow::Error::from)?;
    cache::store(&state, &key, &body).await;
    Ok(cache::json_body(body))
}

async fn get_type(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<AirplaneTypeView>, AppError> {
    let view = state
        .fleet
        .get_type(id)
        .await?
        .ok_or_else(|| AppError::NotFoundError("Airplane type not found".to_string()))?;
    Ok(Json(view))
}

async fn create_type(
    State(state): State<AppState>,
    MaybeClaims(claims): MaybeClaims,
    Json(payload): Json<AirplaneTypePayload>,
) -> Result<(StatusCode, Json<AirplaneType>), AppError> {
    require_user(claims.as_ref())?;

    let airplane_type = state.fleet.create_type(&payload).await?;
    cache::invalidate(&state, "airplane_type").await;
    Ok((StatusCode::CREATED, Json(airplane_type)))
}

async fn update_type(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    MaybeClaims(claims): MaybeClaims,
    Json(payload): Json<AirplaneTypePayload>,
) -> Result<Json<AirplaneType>, AppError> {
    require_staff(claims.as_ref())?;

    let airplane_type = state
        .fleet
        .update_type(id, &payload)
        .await?
        .ok_or_else(|| AppError::NotFoundError("Airplane type not found".to_string()))?;
    cache::invalidate(&state, "airplane_type").await;
    Ok(Json(airplane_type))
}

// ----------------------------------------------------------------------
// Airplanes
// ----------------------------------------------------------------------

async fn list_airplanes(
    State(state): State<AppState>,
    RawQuery(raw): RawQuery,
    Query(filter): Query<AirplaneFilter>,
) -> Result<Response, AppError> {
    let key = cache::view_key("airplanes", raw.as_deref());
    if let Some(body) = cache::lookup(&state, &key).await {
        return Ok(cache::json_body(body));
    }

    let airplanes = state.fleet.list_airplanes(&filter).await?;
    let body = serde_json::to_string(&airplanes).map_err(anyhow::Error::from)?;
    cache::store(&state, &key, &body).await;
    Ok(cache::json_body(body))
}

async fn get_airplane(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<AirplaneView>, AppError> {
    let view = state
        .fleet
        .get_airplane(id)
        .await?
        .ok_or_else(|| AppError::NotFoundError("Airplane not found".to_string()))?;
    Ok(Json(view))
}

async fn create_airplane(
    State(state): State<AppState>,
    MaybeClaims(claims): MaybeClaims,
    Json(payload): Json<AirplanePayload>,
) -> Result<(StatusCode, Json<Airplane>), AppError> {
    require_user(claims.as_ref())?;

    let airplane = state.fleet.create_airplane(&payload).await?;
    cache::invalidate(&state, "airplane").await;
    Ok((StatusCode::CREATED, Json(airplane)))
}

async fn update_airplane(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    MaybeClaims(claims): MaybeClaims,
    Json(payload): Json<AirplanePayload>,
) -> Result<Json<Airplane>, AppError> {
    require_staff(claims.as_ref())?;

    let airplane = state
        .fleet
        .update_airplane(id, &payload)
        .await?
        .ok_or_else(|| AppError::NotFoundError("Airplane not found".to_string()))?;
    cache::invalidate(&state, "airplane").await;
    Ok(Json(airplane))
}
