use serde::Serialize;
use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use skyport_core::flight::{validate_route, Route};
use skyport_core::{CoreError, CoreResult};

use crate::database::{db_err, is_unique_violation};
use crate::paging::Page;

pub struct RouteRepository {
    pool: PgPool,
}

#[derive(sqlx::FromRow)]
struct RouteRow {
    id: Uuid,
    source_id: Uuid,
    destination_id: Uuid,
    distance_km: i32,
    created_at: chrono::DateTime<chrono::Utc>,
    updated_at: chrono::DateTime<chrono::Utc>,
}

impl From<RouteRow> for Route {
    fn from(row: RouteRow) -> Self {
        Route {
            id: row.id,
            source_id: row.source_id,
            destination_id: row.destination_id,
            distance_km: row.distance_km,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Listing/detail row with both endpoint airports resolved.
#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct RouteView {
    pub id: Uuid,
    pub source_id: Uuid,
    pub source_name: String,
    pub source_city: String,
    pub destination_id: Uuid,
    pub destination_name: String,
    pub destination_city: String,
    pub distance_km: i32,
}

#[derive(Debug, Default, serde::Deserialize)]
pub struct RouteFilter {
    pub source_name: Option<String>,
    pub destination_name: Option<String>,
    pub distance: Option<i32>,
    pub distance_gt: Option<i32>,
    pub distance_lt: Option<i32>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[derive(Debug, serde::Deserialize)]
pub struct RoutePayload {
    pub source_id: Uuid,
    pub destination_id: Uuid,
    pub distance_km: i32,
}

const ROUTE_VIEW: &str = "SELECT r.id, r.source_id, s.name AS source_name, \
     s.closest_big_city AS source_city, r.destination_id, d.name AS destination_name, \
     d.closest_big_city AS destination_city, r.distance_km \
     FROM routes r \
     JOIN airports s ON r.source_id = s.id \
     JOIN airports d ON r.destination_id = d.id WHERE TRUE";

impl RouteRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn list(&self, filter: &RouteFilter) -> CoreResult<Vec<RouteView>> {
        let page = Page::new(filter.limit, filter.offset);

        let mut qb: QueryBuilder<Postgres> = QueryBuilder::new(ROUTE_VIEW);
        if let Some(name) = &filter.source_name {
            qb.push(" AND s.name ILIKE ").push_bind(format!("%{}%", name));
        }
        if let Some(name) = &filter.destination_name {
            qb.push(" AND d.name ILIKE ").push_bind(format!("%{}%", name));
        }
        for (value, clause) in [
            (filter.distance, " AND r.distance_km = "),
            (filter.distance_gt, " AND r.distance_km > "),
            (filter.distance_lt, " AND r.distance_km < "),
        ] {
            if let Some(v) = value {
                qb.push(clause).push_bind(v);
            }
        }
        qb.push(" ORDER BY s.name, d.name LIMIT ")
            .push_bind(page.limit)
            .push(" OFFSET ")
            .push_bind(page.offset);

        qb.build_query_as()
            .fetch_all(&self.pool)
            .await
            .map_err(db_err)
    }

    pub async fn get(&self, id: Uuid) -> CoreResult<Option<RouteView>> {
        sqlx::query_as(&format!("{} AND r.id = $1", ROUTE_VIEW))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)
    }

    pub async fn create(&self, payload: &RoutePayload) -> CoreResult<Route> {
        validate_route(payload.source_id, payload.destination_id, payload.distance_km)?;

        let row: RouteRow = sqlx::query_as(
            "INSERT INTO routes (source_id, destination_id, distance_km) VALUES ($1, $2, $3) \
             RETURNING id, source_id, destination_id, distance_km, created_at, updated_at",
        )
        .bind(payload.source_id)
        .bind(payload.destination_id)
        .bind(payload.distance_km)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| Self::map_err(e))?;

        Ok(row.into())
    }

    pub async fn update(&self, id: Uuid, payload: &RoutePayload) -> CoreResult<Option<Route>> {
        validate_route(payload.source_id, payload.destination_id, payload.distance_km)?;

        let row: Option<RouteRow> = sqlx::query_as(
            "UPDATE routes SET source_id = $1, destination_id = $2, distance_km = $3, \
             updated_at = NOW() WHERE id = $4 \
             RETURNING id, source_id, destination_id, distance_km, created_at, updated_at",
        )
        .bind(payload.source_id)
        .bind(payload.destination_id)
        .bind(payload.distance_km)
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| Self::map_err(e))?;

        Ok(row.map(Into::into))
    }

    fn map_err(e: sqlx::Error) -> CoreError {
        if is_unique_violation(&e) {
            CoreError::Conflict("Route between these airports already exists".to_string())
        } else if matches!(
            e.as_database_error().map(|d| d.kind()),
            Some(sqlx::error::ErrorKind::ForeignKeyViolation)
        ) {
            CoreError::ValidationError("Unknown source or destination airport".to_string())
        } else {
            db_err(e)
        }
    }
}
