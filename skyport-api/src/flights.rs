use axum::{
    extract::{Path, Query, RawQuery, State},
    http::StatusCode,
    response::Response,
    routing::get,
    Json, Router,
};
use uuid::Uuid;

use skyport_core::flight::{Flight, Route};
use skyport_store::flight_repo::{FlightFilter, FlightPayload, FlightView};
use skyport_store::route_repo::{RouteFilter, RoutePayload, RouteView};

use crate::cache;
use crate::error::AppError;
use crate::middleware::auth::{require_staff, require_user, MaybeClaims};
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/v1/routes", get(list_routes).post(create_route))
        .route("/v1/routes/{id}", get(get_route).put(update_route))
        .route("/v1/flights", get(list_flights).post(create_flight))
        .route("/v1/flights/{id}", get(get_flight).put(update_flight))
}

// ----------------------------------------------------------------------
// Routes
// ----------------------------------------------------------------------

async fn list_routes(
    State(state): State<AppState>,
    RawQuery(raw): RawQuery,
    Query(filter): Query<RouteFilter>,
) -> Result<Response, AppError> {
    let key = cache::view_key("routes", raw.as_deref());
    if let Some(body) = cache::lookup(&state, &key).await {
        return Ok(cache::json_body(body));
    }

    let routes = state.routes.list(&filter).await?;
    let body = serde_json::to_string(&routes).map_err(anyhow::Error::from)?;
    cache::store(&state, &key, &body).await;
    Ok(cache::json_body(body))
}

async fn get_route(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<RouteView>, AppError> {
    let route = state
        .routes
        .get(id)
        .await?
        .ok_or_else(|| AppError::NotFoundError("Route not found".to_string()))?;
    Ok(Json(route))
}

async fn create_route(
    State(state): State<AppState>,
    MaybeClaims(claims): MaybeClaims,
    Json(payload): Json<RoutePayload>,
) -> Result<(StatusCode, Json<Route>), AppError> {
    require_user(claims.as_ref())?;

    let route = state.routes.create(&payload).await?;
    cache::invalidate(&state, "route").await;
    Ok((StatusCode::CREATED, Json(route)))
}

async fn update_route(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    MaybeClaims(claims): MaybeClaims,
    Json(payload): Json<RoutePayload>,
) -> Result<Json<Route>, AppError> {
    require_staff(claims.as_ref())?;

    let route = state
        .routes
        .update(id, &payload)
        .await?
        .ok_or_else(|| AppError::NotFoundError("Route not found".to_string()))?;
    cache::invalidate(&state, "route").await;
    Ok(Json(route))
}

// ----------------------------------------------------------------------
// Flights
// ----------------------------------------------------------------------

async fn list_flights(
    State(state): State<AppState>,
    RawQuery(raw): RawQuery,
    Query(filter): Query<FlightFilter>,
) -> Result<Response, AppError> {
    let key = cache::view_key("flights", raw.as_deref());
    if let Some(body) = cache::lookup(&state, &key).await {
        return Ok(cache::json_body(body));
    }

    let flights = state.flights.list(&filter).await?;
    let body = serde_json::to_string(&flights).map_err(anyhow::Error::from)?;
    cache::store(&state, &key, &body).await;
    Ok(cache::json_body(body))
}

async fn get_flight(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<FlightView>, AppError> {
    let flight = state
        .flights
        .get(id)
        .await?
        .ok_or_else(|| AppError::NotFoundError("Flight not found".to_string()))?;
    Ok(Json(flight))
}

async fn create_flight(
    State(state): State<AppState>,
    MaybeClaims(claims): MaybeClaims,
    Json(payload): Json<FlightPayload>,
) -> Result<(StatusCode, Json<Flight>), AppError> {
    require_user(claims.as_ref())?;

    let flight = state.flights.create(&payload).await?;
    cache::invalidate(&state, "flight").await;
    Ok((StatusCode::CREATED, Json(flight)))
}

async fn update_flight(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    MaybeClaims(claims): MaybeClaims,
    Json(payload): Json<FlightPayload>,
) -> Result<Json<Flight>, AppError> {
    require_staff(claims.as_ref())?;

    let flight = state
        .flights
        .update(id, &payload)
        .await?
        .ok_or_else(|| AppError::NotFoundError("Flight not found".to_string()))?;
    cache::invalidate(&state, "flight").await;
    Ok(Json(flight))
}
