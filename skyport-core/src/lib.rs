pub mod booking;
pub mod fleet;
pub mod flight;
pub mod identity;
pub mod repository;

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Validation failed: {0}")]
    ValidationError(String),
    #[error("Seat {row}-{seat} is already taken on this flight")]
    SeatTaken { row: i32, seat: i32 },
    #[error("{0}")]
    Conflict(String),
    #[error("Internal service error: {0}")]
    InternalError(String),
}

pub type CoreResult<T> = Result<T, CoreError>;
