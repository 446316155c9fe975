use axum::{
    extract::{Path, Query, RawQuery, State},
    http::StatusCode,
    response::Response,
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use uuid::Uuid;

use skyport_core::booking::{SeatRequest, Ticket};
use skyport_store::order_repo::{TicketFilter, TicketView};

use crate::cache;
use crate::error::AppError;
use crate::middleware::auth::{require_staff, require_user, user_scope, MaybeClaims};
use crate::orders::precheck_seats;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
struct CreateTicketRequest {
    order_id: Uuid,
    flight_id: Uuid,
    row: i32,
    seat: i32,
}

#[derive(Debug, Deserialize)]
struct TicketUpdatePayload {
    flight_id: Uuid,
    row: i32,
    seat: i32,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/v1/tickets", get(list_tickets).post(create_ticket))
        .route("/v1/tickets/{id}", get(get_ticket).put(update_ticket))
}

async fn list_tickets(
    State(state): State<AppState>,
    MaybeClaims(claims): MaybeClaims,
    RawQuery(raw): RawQuery,
    Query(filter): Query<TicketFilter>,
) -> Result<Response, AppError> {
    let scope = user_scope(claims.as_ref())?;

    let scope_tag = scope.map(|id| id.to_string()).unwrap_or_else(|| "staff".to_string());
    let key = cache::view_key("tickets", Some(&format!("{}:{}", scope_tag, raw.as_deref().unwrap_or(""))));
    if let Some(body) = cache::lookup(&state, &key).await {
        return Ok(cache::json_body(body));
    }

    let tickets = state.orders.list_tickets(&filter, scope).await?;
    let body = serde_json::to_string(&tickets).map_err(anyhow::Error::from)?;
    cache::store(&state, &key, &body).await;
    Ok(cache::json_body(body))
}

async fn get_ticket(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    MaybeClaims(claims): MaybeClaims,
) -> Result<Json<TicketView>, AppError> {
    let scope = user_scope(claims.as_ref())?;

    let ticket = state
        .orders
        .get_ticket(id, scope)
        .await?
        .ok_or_else(|| AppError::NotFoundError("Ticket not found".to_string()))?;
    Ok(Json(ticket))
}

/// Add one more seat to an existing order of the caller's.
async fn create_ticket(
    State(state): State<AppState>,
    MaybeClaims(claims): MaybeClaims,
    Json(req): Json<CreateTicketRequest>,
) -> Result<(StatusCode, Json<Ticket>), AppError> {
    let claims = require_user(claims.as_ref())?;

    let seat = SeatRequest {
        flight_id: req.flight_id,
        row: req.row,
        seat: req.seat,
    };
    precheck_seats(&state, std::slice::from_ref(&seat)).await?;

    let ticket = state
        .orders
        .add_ticket(claims.sub, req.order_id, &seat)
        .await?
        .ok_or_else(|| AppError::NotFoundError("Order not found".to_string()))?;

    cache::invalidate(&state, "ticket").await;
    Ok((StatusCode::CREATED, Json(ticket)))
}

/// Staff move of a ticket to another flight or seat.
async fn update_ticket(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    MaybeClaims(claims): MaybeClaims,
    Json(payload): Json<TicketUpdatePayload>,
) -> Result<Json<Ticket>, AppError> {
    require_staff(claims.as_ref())?;

    let seat = SeatRequest {
        flight_id: payload.flight_id,
        row: payload.row,
        seat: payload.seat,
    };
    precheck_seats(&state, std::slice::from_ref(&seat)).await?;

    let ticket = state
        .orders
        .update_ticket(id, &seat)
        .await?
        .ok_or_else(|| AppError::NotFoundError("Ticket not found".to_string()))?;

    cache::invalidate(&state, "ticket").await;
    Ok(Json(ticket))
}
