use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use skyport_core::fleet::{validate_name, Airport};
use skyport_core::{CoreError, CoreResult};

use crate::database::{db_err, is_unique_violation};
use crate::paging::Page;

pub struct AirportRepository {
    pool: PgPool,
}

#[derive(sqlx::FromRow)]
struct AirportRow {
    id: Uuid,
    name: String,
    closest_big_city: String,
    created_at: chrono::DateTime<chrono::Utc>,
    updated_at: chrono::DateTime<chrono::Utc>,
}

impl From<AirportRow> for Airport {
    fn from(row: AirportRow) -> Self {
        Airport {
            id: row.id,
            name: row.name,
            closest_big_city: row.closest_big_city,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, Default, serde::Deserialize)]
pub struct AirportFilter {
    pub name: Option<String>,
    pub closest_big_city: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[derive(Debug, serde::Deserialize)]
pub struct AirportPayload {
    pub name: String,
    pub closest_big_city: String,
}

const COLUMNS: &str = "id, name, closest_big_city, created_at, updated_at";

impl AirportRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn list(&self, filter: &AirportFilter) -> CoreResult<Vec<Airport>> {
        let page = Page::new(filter.limit, filter.offset);

        let mut qb: QueryBuilder<Postgres> =
            QueryBuilder::new(format!("SELECT {} FROM airports WHERE TRUE", COLUMNS));
        if let Some(name) = &filter.name {
            qb.push(" AND name ILIKE ").push_bind(format!("%{}%", name));
        }
        if let Some(city) = &filter.closest_big_city {
            qb.push(" AND closest_big_city ILIKE ")
                .push_bind(format!("%{}%", city));
        }
        qb.push(" ORDER BY name LIMIT ")
            .push_bind(page.limit)
            .push(" OFFSET ")
            .push_bind(page.offset);

        let rows: Vec<AirportRow> = qb
            .build_query_as()
            .fetch_all(&self.pool)
            .await
            .map_err(db_err)?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    pub async fn get(&self, id: Uuid) -> CoreResult<Option<Airport>> {
        let row: Option<AirportRow> =
            sqlx::query_as(&format!("SELECT {} FROM airports WHERE id = $1", COLUMNS))
                .bind(id)
                .fetch_optional(&self.pool)
                .await
                .map_err(db_err)?;

        Ok(row.map(Into::into))
    }

    pub async fn create(&self, payload: &AirportPayload) -> CoreResult<Airport> {
        validate_name("name", &payload.name)?;
        validate_name("closest_big_city", &payload.closest_big_city)?;

        let row: AirportRow = sqlx::query_as(&format!(
            "INSERT INTO airports (name, closest_big_city) VALUES ($1, $2) RETURNING {}",
            COLUMNS
        ))
        .bind(payload.name.trim())
        .bind(payload.closest_big_city.trim())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                CoreError::Conflict("Airport with this name already exists".to_string())
            } else {
                db_err(e)
            }
        })?;

        Ok(row.into())
    }

    pub async fn update(&self, id: Uuid, payload: &AirportPayload) -> CoreResult<Option<Airport>> {
        validate_name("name", &payload.name)?;
        validate_name("closest_big_city", &payload.closest_big_city)?;

        let row: Option<AirportRow> = sqlx::query_as(&format!(
            "UPDATE airports SET name = $1, closest_big_city = $2, updated_at = NOW() \
             WHERE id = $3 RETURNING {}",
            COLUMNS
        ))
        .bind(payload.name.trim())
        .bind(payload.closest_big_city.trim())
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                CoreError::Conflict("Airport with this name already exists".to_string())
            } else {
                db_err(e)
            }
        })?;

        Ok(row.map(Into::into))
    }
}
