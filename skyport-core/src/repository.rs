use async_trait::async_trait;
use uuid::Uuid;

use crate::booking::{Order, SeatRequest, Ticket};
use crate::fleet::Airplane;
use crate::flight::Flight;
use crate::CoreResult;

/// Flight lookups needed by the booking path.
#[async_trait]
pub trait FlightRepository: Send + Sync {
    /// A flight together with the airplane operating it, or `None` when
    /// the flight does not exist.
    async fn flight_with_airplane(&self, flight_id: Uuid)
        -> CoreResult<Option<(Flight, Airplane)>>;
}

/// The transactional check-and-insert at the heart of seat reservation.
#[async_trait]
pub trait BookingRepository: Send + Sync {
    /// Create the order and all of its tickets atomically. Implementations
    /// must roll the whole order back on any seat conflict and surface it
    /// as `CoreError::SeatTaken`.
    async fn create_order(
        &self,
        user_id: Uuid,
        requests: &[SeatRequest],
    ) -> CoreResult<(Order, Vec<Ticket>)>;
}
