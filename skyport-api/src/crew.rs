use axum::{
    extract::{Path, Query, RawQuery, State},
    http::StatusCode,
    response::Response,
    routing::get,
    Json, Router,
};
use uuid::Uuid;

use skyport_core::fleet::CrewMember;
use skyport_store::crew_repo::{CrewFilter, CrewPayload, CrewView};

use crate::cache;
use crate::error::AppError;
use crate::middleware::auth::{require_staff, require_user, MaybeClaims};
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/v1/crew", get(list_crew).post(create_crew_member))
        .route("/v1/crew/{id}", get(get_crew_member).put(update_crew_member))
}

async fn list_crew(
    State(state): State<AppState>,
    RawQuery(raw): RawQuery,
    Query(filter): Query<CrewFilter>,
) -> Result<Response, AppError> {
    let key = cache::view_key("crew", raw.as_deref());
    if let Some(body) = cache::lookup(&state, &key).await {
        return Ok(cache::json_body(body));
    }

    let members = state.crew.list(&filter).await?;
    let body = serde_json::to_string(&members).map_err(anyhow::Error::from)?;
    cache::store(&state, &key, &body).await;
    Ok(cache::json_body(body))
}

async fn get_crew_member(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<CrewView>, AppError> {
    let member = state
        .crew
        .get(id)
        .await?
        .ok_or_else(|| AppError::NotFoundError("Crew member not found".to_string()))?;
    Ok(Json(member))
}

async fn create_crew_member(
    State(state): State<AppState>,
    MaybeClaims(claims): MaybeClaims,
    Json(payload): Json<CrewPayload>,
) -> Result<(StatusCode, Json<CrewMember>), AppError> {
    require_user(claims.as_ref())?;

    let member = state.crew.create(&payload).await?;
    cache::invalidate(&state, "crew").await;
    Ok((StatusCode::CREATED, Json(member)))
}

async fn update_crew_member(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    MaybeClaims(claims): MaybeClaims,
    Json(payload): Json<CrewPayload>,
) -> Result<Json<CrewMember>, AppError> {
    require_staff(claims.as_ref())?;

    let member = state
        .crew
        .update(id, &payload)
        .await?
        .ok_or_else(|| AppError::NotFoundError("Crew member not found".to_string()))?;
    cache::invalidate(&state, "crew").await;
    Ok(Json(member))
}
