use axum::{
    extract::{Path, Query, RawQuery, State},
    http::StatusCode,
    response::Response,
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use skyport_core::booking::{
    validate_departure_window, validate_seat_requests, CreateOrderRequest, Order, SeatRequest,
    Ticket,
};
use skyport_store::order_repo::{OrderDetail, OrderFilter};

use crate::cache;
use crate::error::AppError;
use crate::middleware::auth::{require_staff, require_user, user_scope, MaybeClaims};
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct OrderCreatedResponse {
    pub order: Order,
    pub tickets: Vec<Ticket>,
}

#[derive(Debug, Deserialize)]
struct OrderUpdatePayload {
    user_id: Uuid,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/v1/orders", get(list_orders).post(create_order))
        .route("/v1/orders/{id}", get(get_order).put(update_order))
}

async fn list_orders(
    State(state): State<AppState>,
    MaybeClaims(claims): MaybeClaims,
    RawQuery(raw): RawQuery,
    Query(filter): Query<OrderFilter>,
) -> Result<Response, AppError> {
    let scope = user_scope(claims.as_ref())?;

    // Order listings are user-scoped, so the cache key has to carry the
    // caller's visibility alongside the filters.
    let scope_tag = scope.map(|id| id.to_string()).unwrap_or_else(|| "staff".to_string());
    let key = cache::view_key("orders", Some(&format!("{}:{}", scope_tag, raw.as_deref().unwrap_or(""))));
    if let Some(body) = cache::lookup(&state, &key).await {
        return Ok(cache::json_body(body));
    }

    let orders = state.orders.list_orders(&filter, scope).await?;
    let body = serde_json::to_string(&orders).map_err(anyhow::Error::from)?;
    cache::store(&state, &key, &body).await;
    Ok(cache::json_body(body))
}

async fn get_order(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    MaybeClaims(claims): MaybeClaims,
) -> Result<Json<OrderDetail>, AppError> {
    let scope = user_scope(claims.as_ref())?;

    let order = state
        .orders
        .get_order(id, scope)
        .await?
        .ok_or_else(|| AppError::NotFoundError("Order not found".to_string()))?;
    Ok(Json(order))
}

/// Staff reassignment of an order to another user.
async fn update_order(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    MaybeClaims(claims): MaybeClaims,
    Json(payload): Json<OrderUpdatePayload>,
) -> Result<Json<Order>, AppError> {
    require_staff(claims.as_ref())?;

    let order = state
        .orders
        .update_order(id, payload.user_id)
        .await?
        .ok_or_else(|| AppError::NotFoundError("Order not found".to_string()))?;
    cache::invalidate(&state, "order").await;
    Ok(Json(order))
}

/// The booking operation: validates every requested seat against its
/// flight, then hands the whole set to the transactional repository. A
/// losing race on any seat rolls the order back and surfaces 409.
async fn create_order(
    State(state): State<AppState>,
    MaybeClaims(claims): MaybeClaims,
    Json(req): Json<CreateOrderRequest>,
) -> Result<(StatusCode, Json<OrderCreatedResponse>), AppError> {
    let claims = require_user(claims.as_ref())?;

    if req.tickets.is_empty() {
        return Err(AppError::ValidationError(
            "An order must contain at least one ticket".to_string(),
        ));
    }

    precheck_seats(&state, &req.tickets).await?;

    let (order, tickets) = state.booking_repo.create_order(claims.sub, &req.tickets).await?;

    tracing::info!(
        "Order {} created with {} ticket(s) for user {}",
        order.id,
        tickets.len(),
        claims.sub
    );
    cache::invalidate(&state, "order").await;
    cache::invalidate(&state, "ticket").await;

    Ok((StatusCode::CREATED, Json(OrderCreatedResponse { order, tickets })))
}

/// Request-level validation before the transaction is opened: unknown
/// flights become 404 and malformed seats 400 without touching the order
/// table. The repository re-checks inside the transaction; the database
/// constraint settles races.
pub(crate) async fn precheck_seats(
    state: &AppState,
    requests: &[SeatRequest],
) -> Result<(), AppError> {
    let now = chrono::Utc::now();
    let mut flight_ids: Vec<Uuid> = requests.iter().map(|r| r.flight_id).collect();
    flight_ids.sort();
    flight_ids.dedup();

    for flight_id in flight_ids {
        let (flight, airplane) = state
            .flight_repo
            .flight_with_airplane(flight_id)
            .await?
            .ok_or_else(|| {
                AppError::NotFoundError(format!("Flight {} not found", flight_id))
            })?;

        validate_departure_window(flight.departure_time, now)?;

        let for_flight: Vec<SeatRequest> = requests
            .iter()
            .filter(|r| r.flight_id == flight_id)
            .cloned()
            .collect();
        validate_seat_requests(&for_flight, &airplane)?;
    }
    Ok(())
}
