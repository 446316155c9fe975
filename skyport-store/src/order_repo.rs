use async_trait::async_trait;
use serde::Serialize;
use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use skyport_core::booking::{
    validate_departure_window, validate_seat_requests, Order, SeatRequest, Ticket,
};
use skyport_core::fleet::Airplane;
use skyport_core::repository::BookingRepository;
use skyport_core::{CoreError, CoreResult};

use crate::database::{db_err, is_unique_violation};
use crate::paging::Page;

pub struct PostgresOrderRepository {
    pool: PgPool,
}

#[derive(sqlx::FromRow)]
struct OrderRow {
    id: Uuid,
    user_id: Uuid,
    created_at: chrono::DateTime<chrono::Utc>,
    updated_at: chrono::DateTime<chrono::Utc>,
}

impl From<OrderRow> for Order {
    fn from(row: OrderRow) -> Self {
        Order {
            id: row.id,
            user_id: row.user_id,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct TicketRow {
    id: Uuid,
    flight_id: Uuid,
    order_id: Uuid,
    seat_row: i32,
    seat_num: i32,
    created_at: chrono::DateTime<chrono::Utc>,
    updated_at: chrono::DateTime<chrono::Utc>,
}

impl From<TicketRow> for Ticket {
    fn from(row: TicketRow) -> Self {
        Ticket {
            id: row.id,
            flight_id: row.flight_id,
            order_id: row.order_id,
            row: row.seat_row,
            seat: row.seat_num,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct OrderView {
    pub id: Uuid,
    pub user_id: Uuid,
    pub user_full_name: String,
    pub tickets_count: i64,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct TicketView {
    pub id: Uuid,
    pub order_id: Uuid,
    pub flight_id: Uuid,
    pub row: i32,
    pub seat: i32,
    pub seat_number: String,
    pub source_city: String,
    pub destination_city: String,
    pub departure_time: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, Serialize)]
pub struct OrderDetail {
    pub id: Uuid,
    pub user_id: Uuid,
    pub user_full_name: String,
    pub tickets: Vec<TicketView>,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, Default, serde::Deserialize)]
pub struct OrderFilter {
    pub created_after: Option<chrono::DateTime<chrono::Utc>>,
    pub created_before: Option<chrono::DateTime<chrono::Utc>>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[derive(Debug, Default, serde::Deserialize)]
pub struct TicketFilter {
    pub source_name: Option<String>,
    pub destination_name: Option<String>,
    pub row: Option<i32>,
    pub row_gt: Option<i32>,
    pub row_lt: Option<i32>,
    pub seat: Option<i32>,
    pub seat_gt: Option<i32>,
    pub seat_lt: Option<i32>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

const TICKET_VIEW: &str = "SELECT t.id, t.order_id, t.flight_id, t.seat_row AS row, \
     t.seat_num AS seat, t.seat_row || '-' || t.seat_num AS seat_number, \
     s.closest_big_city AS source_city, d.closest_big_city AS destination_city, \
     f.departure_time \
     FROM tickets t \
     JOIN flights f ON t.flight_id = f.id \
     JOIN routes r ON f.route_id = r.id \
     JOIN airports s ON r.source_id = s.id \
     JOIN airports d ON r.destination_id = d.id WHERE TRUE";

impl PostgresOrderRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// `scope_user` restricts results to that user's orders; staff callers
    /// pass `None`.
    pub async fn list_orders(
        &self,
        filter: &OrderFilter,
        scope_user: Option<Uuid>,
    ) -> CoreResult<Vec<OrderView>> {
        let page = Page::new(filter.limit, filter.offset);

        let mut qb: QueryBuilder<Postgres> = QueryBuilder::new(
            "SELECT o.id, o.user_id, u.first_name || ' ' || u.last_name AS user_full_name, \
             (SELECT COUNT(*) FROM tickets t WHERE t.order_id = o.id) AS tickets_count, \
             o.created_at \
             FROM orders o JOIN users u ON o.user_id = u.id WHERE TRUE",
        );
        if let Some(user_id) = scope_user {
            qb.push(" AND o.user_id = ").push_bind(user_id);
        }
        if let Some(after) = filter.created_after {
            qb.push(" AND o.created_at > ").push_bind(after);
        }
        if let Some(before) = filter.created_before {
            qb.push(" AND o.created_at < ").push_bind(before);
        }
        qb.push(" ORDER BY o.created_at DESC LIMIT ")
            .push_bind(page.limit)
            .push(" OFFSET ")
            .push_bind(page.offset);

        qb.build_query_as()
            .fetch_all(&self.pool)
            .await
            .map_err(db_err)
    }

    pub async fn get_order(
        &self,
        id: Uuid,
        scope_user: Option<Uuid>,
    ) -> CoreResult<Option<OrderDetail>> {
        let mut qb: QueryBuilder<Postgres> = QueryBuilder::new(
            "SELECT o.id, o.user_id, u.first_name || ' ' || u.last_name AS user_full_name, \
             0::BIGINT AS tickets_count, o.created_at \
             FROM orders o JOIN users u ON o.user_id = u.id WHERE o.id = ",
        );
        qb.push_bind(id);
        if let Some(user_id) = scope_user {
            qb.push(" AND o.user_id = ").push_bind(user_id);
        }

        let header: Option<OrderView> = qb
            .build_query_as()
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?;

        let Some(header) = header else {
            return Ok(None);
        };

        let tickets: Vec<TicketView> =
            sqlx::query_as(&format!("{} AND t.order_id = $1 ORDER BY t.seat_row, t.seat_num", TICKET_VIEW))
                .bind(id)
                .fetch_all(&self.pool)
                .await
                .map_err(db_err)?;

        Ok(Some(OrderDetail {
            id: header.id,
            user_id: header.user_id,
            user_full_name: header.user_full_name,
            tickets,
            created_at: header.created_at,
        }))
    }

    pub async fn list_tickets(
        &self,
        filter: &TicketFilter,
        scope_user: Option<Uuid>,
    ) -> CoreResult<Vec<TicketView>> {
        let page = Page::new(filter.limit, filter.offset);

        let mut qb: QueryBuilder<Postgres> = QueryBuilder::new(TICKET_VIEW);
        if let Some(user_id) = scope_user {
            qb.push(" AND t.order_id IN (SELECT id FROM orders WHERE user_id = ")
                .push_bind(user_id)
                .push(")");
        }
        if let Some(name) = &filter.source_name {
            qb.push(" AND s.name ILIKE ").push_bind(format!("%{}%", name));
        }
        if let Some(name) = &filter.destination_name {
            qb.push(" AND d.name ILIKE ").push_bind(format!("%{}%", name));
        }
        for (value, clause) in [
            (filter.row, " AND t.seat_row = "),
            (filter.row_gt, " AND t.seat_row > "),
            (filter.row_lt, " AND t.seat_row < "),
            (filter.seat, " AND t.seat_num = "),
            (filter.seat_gt, " AND t.seat_num > "),
            (filter.seat_lt, " AND t.seat_num < "),
        ] {
            if let Some(v) = value {
                qb.push(clause).push_bind(v);
            }
        }
        qb.push(" ORDER BY f.departure_time, t.seat_row, t.seat_num LIMIT ")
            .push_bind(page.limit)
            .push(" OFFSET ")
            .push_bind(page.offset);

        qb.build_query_as()
            .fetch_all(&self.pool)
            .await
            .map_err(db_err)
    }

    pub async fn get_ticket(
        &self,
        id: Uuid,
        scope_user: Option<Uuid>,
    ) -> CoreResult<Option<TicketView>> {
        let mut qb: QueryBuilder<Postgres> =
            QueryBuilder::new(format!("{} AND t.id = ", TICKET_VIEW));
        qb.push_bind(id);
        if let Some(user_id) = scope_user {
            qb.push(" AND t.order_id IN (SELECT id FROM orders WHERE user_id = ")
                .push_bind(user_id)
                .push(")");
        }

        qb.build_query_as()
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)
    }

    /// Staff reassignment of an order to another user. Returns `None` when
    /// the order does not exist.
    pub async fn update_order(&self, id: Uuid, user_id: Uuid) -> CoreResult<Option<Order>> {
        let row: Option<OrderRow> = sqlx::query_as(
            "UPDATE orders SET user_id = $1, updated_at = NOW() WHERE id = $2 \
             RETURNING id, user_id, created_at, updated_at",
        )
        .bind(user_id)
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            if matches!(
                e.as_database_error().map(|d| d.kind()),
                Some(sqlx::error::ErrorKind::ForeignKeyViolation)
            ) {
                CoreError::ValidationError("Unknown user".to_string())
            } else {
                db_err(e)
            }
        })?;

        Ok(row.map(Into::into))
    }

    /// Staff move of a ticket to another flight or seat. The new position is
    /// validated against the target flight's airplane, and a losing race on
    /// the seat surfaces as `SeatTaken`.
    pub async fn update_ticket(&self, id: Uuid, req: &SeatRequest) -> CoreResult<Option<Ticket>> {
        let mut tx = self.pool.begin().await.map_err(db_err)?;

        let (airplane, departure_time) = Self::load_airplane(&mut tx, req.flight_id).await?;
        validate_departure_window(departure_time, chrono::Utc::now())?;
        validate_seat_requests(std::slice::from_ref(req), &airplane)?;

        let row: Option<TicketRow> = sqlx::query_as(
            "UPDATE tickets SET flight_id = $1, seat_row = $2, seat_num = $3, updated_at = NOW() \
             WHERE id = $4 \
             RETURNING id, flight_id, order_id, seat_row, seat_num, created_at, updated_at",
        )
        .bind(req.flight_id)
        .bind(req.row)
        .bind(req.seat)
        .bind(id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                CoreError::SeatTaken {
                    row: req.row,
                    seat: req.seat,
                }
            } else {
                db_err(e)
            }
        })?;

        tx.commit().await.map_err(db_err)?;
        Ok(row.map(Into::into))
    }

    /// Add a single ticket to an existing order. The order must belong to
    /// `user_id`; returns `None` when the order does not exist.
    pub async fn add_ticket(
        &self,
        user_id: Uuid,
        order_id: Uuid,
        req: &SeatRequest,
    ) -> CoreResult<Option<Ticket>> {
        let mut tx = self.pool.begin().await.map_err(db_err)?;

        let owner: Option<(Uuid,)> = sqlx::query_as("SELECT user_id FROM orders WHERE id = $1")
            .bind(order_id)
            .fetch_optional(&mut *tx)
            .await
            .map_err(db_err)?;

        let Some((owner_id,)) = owner else {
            return Ok(None);
        };
        if owner_id != user_id {
            return Err(CoreError::ValidationError(
                "You can't create tickets for other user orders".to_string(),
            ));
        }

        let (airplane, departure_time) = Self::load_airplane(&mut tx, req.flight_id).await?;
        validate_departure_window(departure_time, chrono::Utc::now())?;
        validate_seat_requests(std::slice::from_ref(req), &airplane)?;

        let ticket = Self::insert_ticket(&mut tx, order_id, req).await?;
        tx.commit().await.map_err(db_err)?;

        Ok(Some(ticket))
    }

    async fn load_airplane(
        tx: &mut sqlx::Transaction<'_, Postgres>,
        flight_id: Uuid,
    ) -> CoreResult<(Airplane, chrono::DateTime<chrono::Utc>)> {
        #[derive(sqlx::FromRow)]
        struct Row {
            id: Uuid,
            name: String,
            rows: i32,
            seats_in_row: i32,
            airplane_type_id: Uuid,
            created_at: chrono::DateTime<chrono::Utc>,
            updated_at: chrono::DateTime<chrono::Utc>,
            departure_time: chrono::DateTime<chrono::Utc>,
        }

        let row: Option<Row> = sqlx::query_as(
            "SELECT a.id, a.name, a.rows, a.seats_in_row, a.airplane_type_id, \
             a.created_at, a.updated_at, f.departure_time \
             FROM flights f JOIN airplanes a ON f.airplane_id = a.id WHERE f.id = $1",
        )
        .bind(flight_id)
        .fetch_optional(&mut **tx)
        .await
        .map_err(db_err)?;

        let row = row.ok_or_else(|| {
            CoreError::ValidationError(format!("Flight {} does not exist", flight_id))
        })?;

        Ok((
            Airplane {
                id: row.id,
                name: row.name,
                rows: row.rows,
                seats_in_row: row.seats_in_row,
                airplane_type_id: row.airplane_type_id,
                created_at: row.created_at,
                updated_at: row.updated_at,
            },
            row.departure_time,
        ))
    }

    async fn insert_ticket(
        tx: &mut sqlx::Transaction<'_, Postgres>,
        order_id: Uuid,
        req: &SeatRequest,
    ) -> CoreResult<Ticket> {
        let row: TicketRow = sqlx::query_as(
            "INSERT INTO tickets (flight_id, order_id, seat_row, seat_num) \
             VALUES ($1, $2, $3, $4) \
             RETURNING id, flight_id, order_id, seat_row, seat_num, created_at, updated_at",
        )
        .bind(req.flight_id)
        .bind(order_id)
        .bind(req.row)
        .bind(req.seat)
        .fetch_one(&mut **tx)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                // A concurrent order won the race for this seat.
                CoreError::SeatTaken {
                    row: req.row,
                    seat: req.seat,
                }
            } else {
                db_err(e)
            }
        })?;

        Ok(row.into())
    }
}

#[async_trait]
impl BookingRepository for PostgresOrderRepository {
    async fn create_order(
        &self,
        user_id: Uuid,
        requests: &[SeatRequest],
    ) -> CoreResult<(Order, Vec<Ticket>)> {
        if requests.is_empty() {
            return Err(CoreError::ValidationError(
                "An order must contain at least one ticket".to_string(),
            ));
        }

        let mut tx = self.pool.begin().await.map_err(db_err)?;

        // Validate every seat against its flight's geometry and departure
        // window before writing anything.
        let now = chrono::Utc::now();
        let mut flight_ids: Vec<Uuid> = requests.iter().map(|r| r.flight_id).collect();
        flight_ids.sort();
        flight_ids.dedup();

        for flight_id in &flight_ids {
            let (airplane, departure_time) = Self::load_airplane(&mut tx, *flight_id).await?;
            validate_departure_window(departure_time, now)?;

            let for_flight: Vec<SeatRequest> = requests
                .iter()
                .filter(|r| r.flight_id == *flight_id)
                .cloned()
                .collect();
            validate_seat_requests(&for_flight, &airplane)?;
        }

        let order_row: OrderRow = sqlx::query_as(
            "INSERT INTO orders (user_id) VALUES ($1) \
             RETURNING id, user_id, created_at, updated_at",
        )
        .bind(user_id)
        .fetch_one(&mut *tx)
        .await
        .map_err(db_err)?;

        let mut tickets = Vec::with_capacity(requests.len());
        for req in requests {
            // Any failure here aborts the transaction; partial orders never
            // reach the database.
            tickets.push(Self::insert_ticket(&mut tx, order_row.id, req).await?);
        }

        tx.commit().await.map_err(db_err)?;

        Ok((order_row.into(), tickets))
    }
}
