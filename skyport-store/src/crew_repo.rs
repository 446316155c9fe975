use serde::Serialize;
use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use skyport_core::fleet::CrewMember;
use skyport_core::identity::validate_person_name;
use skyport_core::CoreResult;

use crate::database::db_err;
use crate::paging::Page;

pub struct CrewRepository {
    pool: PgPool,
}

#[derive(sqlx::FromRow)]
struct CrewRow {
    id: Uuid,
    first_name: String,
    last_name: String,
    created_at: chrono::DateTime<chrono::Utc>,
    updated_at: chrono::DateTime<chrono::Utc>,
}

impl From<CrewRow> for CrewMember {
    fn from(row: CrewRow) -> Self {
        CrewMember {
            id: row.id,
            first_name: row.first_name,
            last_name: row.last_name,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Listing row with the assigned-flight count.
#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct CrewView {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub full_name: String,
    pub flights_count: i64,
}

#[derive(Debug, Default, serde::Deserialize)]
pub struct CrewFilter {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[derive(Debug, serde::Deserialize)]
pub struct CrewPayload {
    pub first_name: String,
    pub last_name: String,
}

const CREW_VIEW: &str = "SELECT c.id, c.first_name, c.last_name, \
     c.first_name || ' ' || c.last_name AS full_name, COUNT(fc.flight_id) AS flights_count \
     FROM crew_members c LEFT JOIN flight_crew fc ON fc.crew_member_id = c.id WHERE TRUE";

const CREW_GROUP: &str = " GROUP BY c.id, c.first_name, c.last_name";

impl CrewRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn list(&self, filter: &CrewFilter) -> CoreResult<Vec<CrewView>> {
        let page = Page::new(filter.limit, filter.offset);

        let mut qb: QueryBuilder<Postgres> = QueryBuilder::new(CREW_VIEW);
        if let Some(first) = &filter.first_name {
            qb.push(" AND c.first_name ILIKE ")
                .push_bind(format!("%{}%", first));
        }
        if let Some(last) = &filter.last_name {
            qb.push(" AND c.last_name ILIKE ")
                .push_bind(format!("%{}%", last));
        }
        qb.push(CREW_GROUP)
            .push(" ORDER BY c.last_name, c.first_name LIMIT ")
            .push_bind(page.limit)
            .push(" OFFSET ")
            .push_bind(page.offset);

        qb.build_query_as()
            .fetch_all(&self.pool)
            .await
            .map_err(db_err)
    }

    pub async fn get(&self, id: Uuid) -> CoreResult<Option<CrewView>> {
        sqlx::query_as(&format!("{} AND c.id = $1{}", CREW_VIEW, CREW_GROUP))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)
    }

    pub async fn create(&self, payload: &CrewPayload) -> CoreResult<CrewMember> {
        validate_person_name("first_name", &payload.first_name)?;
        validate_person_name("last_name", &payload.last_name)?;

        let row: CrewRow = sqlx::query_as(
            "INSERT INTO crew_members (first_name, last_name) VALUES ($1, $2) \
             RETURNING id, first_name, last_name, created_at, updated_at",
        )
        .bind(payload.first_name.trim())
        .bind(payload.last_name.trim())
        .fetch_one(&self.pool)
        .await
        .map_err(db_err)?;

        Ok(row.into())
    }

    pub async fn update(&self, id: Uuid, payload: &CrewPayload) -> CoreResult<Option<CrewMember>> {
        validate_person_name("first_name", &payload.first_name)?;
        validate_person_name("last_name", &payload.last_name)?;

        let row: Option<CrewRow> = sqlx::query_as(
            "UPDATE crew_members SET first_name = $1, last_name = $2, updated_at = NOW() \
             WHERE id = $3 RETURNING id, first_name, last_name, created_at, updated_at",
        )
        .bind(payload.first_name.trim())
        .bind(payload.last_name.trim())
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;

        Ok(row.map(Into::into))
    }
}
