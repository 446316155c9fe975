use async_trait::async_trait;
use serde::Serialize;
use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use skyport_core::fleet::Airplane;
use skyport_core::flight::{validate_flight_times, Flight};
use skyport_core::repository::FlightRepository;
use skyport_core::{CoreError, CoreResult};

use crate::database::db_err;
use crate::paging::Page;

pub struct PostgresFlightRepository {
    pool: PgPool,
}

#[derive(sqlx::FromRow)]
struct FlightRow {
    id: Uuid,
    route_id: Uuid,
    airplane_id: Uuid,
    departure_time: chrono::DateTime<chrono::Utc>,
    arrival_time: chrono::DateTime<chrono::Utc>,
    created_at: chrono::DateTime<chrono::Utc>,
    updated_at: chrono::DateTime<chrono::Utc>,
}

impl From<FlightRow> for Flight {
    fn from(row: FlightRow) -> Self {
        Flight {
            id: row.id,
            route_id: row.route_id,
            airplane_id: row.airplane_id,
            departure_time: row.departure_time,
            arrival_time: row.arrival_time,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct FlightAirplaneRow {
    flight_id: Uuid,
    route_id: Uuid,
    departure_time: chrono::DateTime<chrono::Utc>,
    arrival_time: chrono::DateTime<chrono::Utc>,
    flight_created_at: chrono::DateTime<chrono::Utc>,
    flight_updated_at: chrono::DateTime<chrono::Utc>,
    airplane_id: Uuid,
    airplane_name: String,
    rows: i32,
    seats_in_row: i32,
    airplane_type_id: Uuid,
    airplane_created_at: chrono::DateTime<chrono::Utc>,
    airplane_updated_at: chrono::DateTime<chrono::Utc>,
}

/// Denormalized flight with route endpoints, airplane, live availability
/// and assigned crew names.
#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct FlightView {
    pub id: Uuid,
    pub route_id: Uuid,
    pub source_airport: String,
    pub destination_airport: String,
    pub airplane_id: Uuid,
    pub airplane_name: String,
    pub departure_time: chrono::DateTime<chrono::Utc>,
    pub arrival_time: chrono::DateTime<chrono::Utc>,
    pub available_seats: i64,
    pub crew_names: Vec<String>,
}

#[derive(Debug, Default, serde::Deserialize)]
pub struct FlightFilter {
    pub source_name: Option<String>,
    pub destination_name: Option<String>,
    pub departure_after: Option<chrono::DateTime<chrono::Utc>>,
    pub departure_before: Option<chrono::DateTime<chrono::Utc>>,
    pub arrival_after: Option<chrono::DateTime<chrono::Utc>>,
    pub arrival_before: Option<chrono::DateTime<chrono::Utc>>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[derive(Debug, serde::Deserialize)]
pub struct FlightPayload {
    pub route_id: Uuid,
    pub airplane_id: Uuid,
    pub departure_time: chrono::DateTime<chrono::Utc>,
    pub arrival_time: chrono::DateTime<chrono::Utc>,
    #[serde(default)]
    pub crew_ids: Vec<Uuid>,
}

const FLIGHT_VIEW: &str = "SELECT f.id, f.route_id, s.name AS source_airport, \
     d.name AS destination_airport, f.airplane_id, a.name AS airplane_name, \
     f.departure_time, f.arrival_time, \
     (a.rows * a.seats_in_row)::BIGINT - \
       (SELECT COUNT(*) FROM tickets t WHERE t.flight_id = f.id) AS available_seats, \
     COALESCE((SELECT ARRAY_AGG(c.first_name || ' ' || c.last_name ORDER BY c.last_name) \
       FROM flight_crew fc JOIN crew_members c ON c.id = fc.crew_member_id \
       WHERE fc.flight_id = f.id), '{}') AS crew_names \
     FROM flights f \
     JOIN routes r ON f.route_id = r.id \
     JOIN airports s ON r.source_id = s.id \
     JOIN airports d ON r.destination_id = d.id \
     JOIN airplanes a ON f.airplane_id = a.id WHERE TRUE";

impl PostgresFlightRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn list(&self, filter: &FlightFilter) -> CoreResult<Vec<FlightView>> {
        let page = Page::new(filter.limit, filter.offset);

        let mut qb: QueryBuilder<Postgres> = QueryBuilder::new(FLIGHT_VIEW);
        if let Some(name) = &filter.source_name {
            qb.push(" AND s.name ILIKE ").push_bind(format!("%{}%", name));
        }
        if let Some(name) = &filter.destination_name {
            qb.push(" AND d.name ILIKE ").push_bind(format!("%{}%", name));
        }
        for (value, clause) in [
            (filter.departure_after, " AND f.departure_time > "),
            (filter.departure_before, " AND f.departure_time < "),
            (filter.arrival_after, " AND f.arrival_time > "),
            (filter.arrival_before, " AND f.arrival_time < "),
        ] {
            if let Some(v) = value {
                qb.push(clause).push_bind(v);
            }
        }
        qb.push(" ORDER BY f.departure_time LIMIT ")
            .push_bind(page.limit)
            .push(" OFFSET ")
            .push_bind(page.offset);

        qb.build_query_as()
            .fetch_all(&self.pool)
            .await
            .map_err(db_err)
    }

    pub async fn get(&self, id: Uuid) -> CoreResult<Option<FlightView>> {
        sqlx::query_as(&format!("{} AND f.id = $1", FLIGHT_VIEW))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)
    }

    pub async fn create(&self, payload: &FlightPayload) -> CoreResult<Flight> {
        validate_flight_times(payload.departure_time, payload.arrival_time)?;

        let mut tx = self.pool.begin().await.map_err(db_err)?;

        let row: FlightRow = sqlx::query_as(
            "INSERT INTO flights (route_id, airplane_id, departure_time, arrival_time) \
             VALUES ($1, $2, $3, $4) \
             RETURNING id, route_id, airplane_id, departure_time, arrival_time, created_at, updated_at",
        )
        .bind(payload.route_id)
        .bind(payload.airplane_id)
        .bind(payload.departure_time)
        .bind(payload.arrival_time)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| Self::map_err(e))?;

        Self::assign_crew(&mut tx, row.id, &payload.crew_ids).await?;

        tx.commit().await.map_err(db_err)?;
        Ok(row.into())
    }

    pub async fn update(&self, id: Uuid, payload: &FlightPayload) -> CoreResult<Option<Flight>> {
        validate_flight_times(payload.departure_time, payload.arrival_time)?;

        let mut tx = self.pool.begin().await.map_err(db_err)?;

        let row: Option<FlightRow> = sqlx::query_as(
            "UPDATE flights SET route_id = $1, airplane_id = $2, departure_time = $3, \
             arrival_time = $4, updated_at = NOW() WHERE id = $5 \
             RETURNING id, route_id, airplane_id, departure_time, arrival_time, created_at, updated_at",
        )
        .bind(payload.route_id)
        .bind(payload.airplane_id)
        .bind(payload.departure_time)
        .bind(payload.arrival_time)
        .bind(id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| Self::map_err(e))?;

        let Some(row) = row else {
            return Ok(None);
        };

        // Crew assignments are replaced wholesale on update.
        sqlx::query("DELETE FROM flight_crew WHERE flight_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(db_err)?;
        Self::assign_crew(&mut tx, id, &payload.crew_ids).await?;

        tx.commit().await.map_err(db_err)?;
        Ok(Some(row.into()))
    }

    async fn assign_crew(
        tx: &mut sqlx::Transaction<'_, Postgres>,
        flight_id: Uuid,
        crew_ids: &[Uuid],
    ) -> CoreResult<()> {
        for crew_id in crew_ids {
            sqlx::query(
                "INSERT INTO flight_crew (flight_id, crew_member_id) VALUES ($1, $2) \
                 ON CONFLICT DO NOTHING",
            )
            .bind(flight_id)
            .bind(crew_id)
            .execute(&mut **tx)
            .await
            .map_err(|e| Self::map_err(e))?;
        }
        Ok(())
    }

    fn map_err(e: sqlx::Error) -> CoreError {
        if matches!(
            e.as_database_error().map(|d| d.kind()),
            Some(sqlx::error::ErrorKind::ForeignKeyViolation)
        ) {
            CoreError::ValidationError("Unknown route, airplane or crew member".to_string())
        } else {
            db_err(e)
        }
    }
}

#[async_trait]
impl FlightRepository for PostgresFlightRepository {
    async fn flight_with_airplane(
        &self,
        flight_id: Uuid,
    ) -> CoreResult<Option<(Flight, Airplane)>> {
        let row: Option<FlightAirplaneRow> = sqlx::query_as(
            "SELECT f.id AS flight_id, f.route_id, f.departure_time, f.arrival_time, \
             f.created_at AS flight_created_at, f.updated_at AS flight_updated_at, \
             a.id AS airplane_id, a.name AS airplane_name, a.rows, a.seats_in_row, \
             a.airplane_type_id, a.created_at AS airplane_created_at, \
             a.updated_at AS airplane_updated_at \
             FROM flights f JOIN airplanes a ON f.airplane_id = a.id WHERE f.id = $1",
        )
        .bind(flight_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;

        Ok(row.map(|r| {
            let flight = Flight {
                id: r.flight_id,
                route_id: r.route_id,
                airplane_id: r.airplane_id,
                departure_time: r.departure_time,
                arrival_time: r.arrival_time,
                created_at: r.flight_created_at,
                updated_at: r.flight_updated_at,
            };
            let airplane = Airplane {
                id: r.airplane_id,
                name: r.airplane_name,
                rows: r.rows,
                seats_in_row: r.seats_in_row,
                airplane_type_id: r.airplane_type_id,
                created_at: r.airplane_created_at,
                updated_at: r.airplane_updated_at,
            };
            (flight, airplane)
        }))
    }
}
