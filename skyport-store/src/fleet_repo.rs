use serde::Serialize;
use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use skyport_core::fleet::{validate_name, validate_seat_grid, Airplane, AirplaneType};
use skyport_core::{CoreError, CoreResult};

use crate::database::{db_err, is_unique_violation};
use crate::paging::Page;

pub struct FleetRepository {
    pool: PgPool,
}

// ----------------------------------------------------------------------
// Airplane types
// ----------------------------------------------------------------------

#[derive(sqlx::FromRow)]
struct AirplaneTypeRow {
    id: Uuid,
    name: String,
    created_at: chrono::DateTime<chrono::Utc>,
    updated_at: chrono::DateTime<chrono::Utc>,
}

impl From<AirplaneTypeRow> for AirplaneType {
    fn from(row: AirplaneTypeRow) -> Self {
        AirplaneType {
            id: row.id,
            name: row.name,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// List/detail view with the related-airplane count, as the type listing
/// reports it.
#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct AirplaneTypeView {
    pub id: Uuid,
    pub name: String,
    pub airplanes_count: i64,
}

#[derive(Debug, Default, serde::Deserialize)]
pub struct AirplaneTypeFilter {
    pub name: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[derive(Debug, serde::Deserialize)]
pub struct AirplaneTypePayload {
    pub name: String,
}

// ----------------------------------------------------------------------
// Airplanes
// ----------------------------------------------------------------------

#[derive(sqlx::FromRow)]
struct AirplaneRow {
    id: Uuid,
    name: String,
    rows: i32,
    seats_in_row: i32,
    airplane_type_id: Uuid,
    created_at: chrono::DateTime<chrono::Utc>,
    updated_at: chrono::DateTime<chrono::Utc>,
}

impl From<AirplaneRow> for Airplane {
    fn from(row: AirplaneRow) -> Self {
        Airplane {
            id: row.id,
            name: row.name,
            rows: row.rows,
            seats_in_row: row.seats_in_row,
            airplane_type_id: row.airplane_type_id,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Denormalized listing row: airplane plus its type name and seat total.
#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct AirplaneView {
    pub id: Uuid,
    pub name: String,
    pub rows: i32,
    pub seats_in_row: i32,
    pub total_seats: i32,
    pub airplane_type_id: Uuid,
    pub airplane_type_name: String,
}

#[derive(Debug, Default, serde::Deserialize)]
pub struct AirplaneFilter {
    pub name: Option<String>,
    pub airplane_type_name: Option<String>,
    pub rows: Option<i32>,
    pub rows_gt: Option<i32>,
    pub rows_lt: Option<i32>,
    pub seats_in_row: Option<i32>,
    pub seats_in_row_gt: Option<i32>,
    pub seats_in_row_lt: Option<i32>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[derive(Debug, serde::Deserialize)]
pub struct AirplanePayload {
    pub name: String,
    pub rows: i32,
    pub seats_in_row: i32,
    pub airplane_type_id: Uuid,
}

const AIRPLANE_VIEW: &str = "SELECT a.id, a.name, a.rows, a.seats_in_row, \
     a.rows * a.seats_in_row AS total_seats, a.airplane_type_id, t.name AS airplane_type_name \
     FROM airplanes a JOIN airplane_types t ON a.airplane_type_id = t.id WHERE TRUE";

impl FleetRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn list_types(&self, filter: &AirplaneTypeFilter) -> CoreResult<Vec<AirplaneTypeView>> {
        let page = Page::new(filter.limit, filter.offset);

        let mut qb: QueryBuilder<Postgres> = QueryBuilder::new(
            "SELECT t.id, t.name, COUNT(a.id) AS airplanes_count \
             FROM airplane_types t LEFT JOIN airplanes a ON a.airplane_type_id = t.id WHERE TRUE",
        );
        if let Some(name) = &filter.name {
            qb.push(" AND t.name ILIKE ").push_bind(format!("%{}%", name));
        }
        qb.push(" GROUP BY t.id, t.name ORDER BY t.name LIMIT ")
            .push_bind(page.limit)
            .push(" OFFSET ")
            .push_bind(page.offset);

        qb.build_query_as()
            .fetch_all(&self.pool)
            .await
            .map_err(db_err)
    }

    pub async fn get_type(&self, id: Uuid) -> CoreResult<Option<AirplaneTypeView>> {
        sqlx::query_as(
            "SELECT t.id, t.name, COUNT(a.id) AS airplanes_count \
             FROM airplane_types t LEFT JOIN airplanes a ON a.airplane_type_id = t.id \
             WHERE t.id = $1 GROUP BY t.id, t.name",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)
    }

    pub async fn create_type(&self, payload: &AirplaneTypePayload) -> CoreResult<AirplaneType> {
        validate_name("name", &payload.name)?;

        let row: AirplaneTypeRow = sqlx::query_as(
            "INSERT INTO airplane_types (name) VALUES ($1) \
             RETURNING id, name, created_at, updated_at",
        )
        .bind(payload.name.trim())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| Self::map_type_err(e))?;

        Ok(row.into())
    }

    pub async fn update_type(
        &self,
        id: Uuid,
        payload: &AirplaneTypePayload,
    ) -> CoreResult<Option<AirplaneType>> {
        validate_name("name", &payload.name)?;

        let row: Option<AirplaneTypeRow> = sqlx::query_as(
            "UPDATE airplane_types SET name = $1, updated_at = NOW() WHERE id = $2 \
             RETURNING id, name, created_at, updated_at",
        )
        .bind(payload.name.trim())
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| Self::map_type_err(e))?;

        Ok(row.map(Into::into))
    }

    fn map_type_err(e: sqlx::Error) -> CoreError {
        if is_unique_violation(&e) {
            CoreError::Conflict("Airplane type with this name already exists".to_string())
        } else {
            db_err(e)
        }
    }

    pub async fn list_airplanes(&self, filter: &AirplaneFilter) -> CoreResult<Vec<AirplaneView>> {
        let page = Page::new(filter.limit, filter.offset);

        let mut qb: QueryBuilder<Postgres> = QueryBuilder::new(AIRPLANE_VIEW);
        if let Some(name) = &filter.name {
            qb.push(" AND a.name ILIKE ").push_bind(format!("%{}%", name));
        }
        if let Some(type_name) = &filter.airplane_type_name {
            qb.push(" AND t.name ILIKE ")
                .push_bind(format!("%{}%", type_name));
        }
        for (value, clause) in [
            (filter.rows, " AND a.rows = "),
            (filter.rows_gt, " AND a.rows > "),
            (filter.rows_lt, " AND a.rows < "),
            (filter.seats_in_row, " AND a.seats_in_row = "),
            (filter.seats_in_row_gt, " AND a.seats_in_row > "),
            (filter.seats_in_row_lt, " AND a.seats_in_row < "),
        ] {
            if let Some(v) = value {
                qb.push(clause).push_bind(v);
            }
        }
        qb.push(" ORDER BY t.name, a.name LIMIT ")
            .push_bind(page.limit)
            .push(" OFFSET ")
            .push_bind(page.offset);

        qb.build_query_as()
            .fetch_all(&self.pool)
            .await
            .map_err(db_err)
    }

    pub async fn get_airplane(&self, id: Uuid) -> CoreResult<Option<AirplaneView>> {
        sqlx::query_as(&format!("{} AND a.id = $1", AIRPLANE_VIEW))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)
    }

    pub async fn create_airplane(&self, payload: &AirplanePayload) -> CoreResult<Airplane> {
        validate_name("name", &payload.name)?;
        validate_seat_grid(payload.rows, payload.seats_in_row)?;

        let row: AirplaneRow = sqlx::query_as(
            "INSERT INTO airplanes (name, rows, seats_in_row, airplane_type_id) \
             VALUES ($1, $2, $3, $4) \
             RETURNING id, name, rows, seats_in_row, airplane_type_id, created_at, updated_at",
        )
        .bind(payload.name.trim())
        .bind(payload.rows)
        .bind(payload.seats_in_row)
        .bind(payload.airplane_type_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| Self::map_airplane_err(e))?;

        Ok(row.into())
    }

    pub async fn update_airplane(
        &self,
        id: Uuid,
        payload: &AirplanePayload,
    ) -> CoreResult<Option<Airplane>> {
        validate_name("name", &payload.name)?;
        validate_seat_grid(payload.rows, payload.seats_in_row)?;

        let row: Option<AirplaneRow> = sqlx::query_as(
            "UPDATE airplanes SET name = $1, rows = $2, seats_in_row = $3, \
             airplane_type_id = $4, updated_at = NOW() WHERE id = $5 \
             RETURNING id, name, rows, seats_in_row, airplane_type_id, created_at, updated_at",
        )
        .bind(payload.name.trim())
        .bind(payload.rows)
        .bind(payload.seats_in_row)
        .bind(payload.airplane_type_id)
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| Self::map_airplane_err(e))?;

        Ok(row.map(Into::into))
    }

    fn map_airplane_err(e: sqlx::Error) -> CoreError {
        if is_unique_violation(&e) {
            CoreError::Conflict(
                "Airplane with this name already exists for this airplane type".to_string(),
            )
        } else if matches!(
            e.as_database_error().map(|d| d.kind()),
            Some(sqlx::error::ErrorKind::ForeignKeyViolation)
        ) {
            CoreError::ValidationError("Unknown airplane type".to_string())
        } else {
            db_err(e)
        }
    }
}
