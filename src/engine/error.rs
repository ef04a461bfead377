use thiserror::Error;

/// Postgres SQLSTATE raised when `lock_timeout` expires.
const LOCK_NOT_AVAILABLE: &str = "55P03";

/// Postgres SQLSTATE raised when the server kills a deadlock victim.
const DEADLOCK_DETECTED: &str = "40P01";

/// Typed outcome of a failed booking operation. Every variant aborts the
/// enclosing transaction; the HTTP layer maps kinds to status codes.
#[derive(Debug, Error)]
pub enum BookingError {
    #[error("requested resource does not exist")]
    NotFound,

    #[error("actor lacks the role or ownership required")]
    Forbidden,

    #[error("referenced resource {0} does not resolve")]
    UnavailableResource(i64),

    #[error("event window is inconsistent with its timeslots")]
    RestrictionViolation,

    #[error("timeslot {0} is already bound to another event")]
    SlotConflict(i64),

    #[error("user {user_id} already holds a reservation for event {event_id}")]
    DuplicateReservation { user_id: i64, event_id: i64 },

    #[error("admitting {requested} seats would exceed capacity {capacity}")]
    CapacityExceeded { requested: i32, capacity: i32 },

    #[error("row locks could not be acquired within the bounded wait")]
    LockContention,

    #[error("database error")]
    Database(#[source] sqlx::Error),
}

impl BookingError {
    /// Lock-wait timeouts and deadlock aborts are the transient failures;
    /// the engine gives them one immediate retry before surfacing a conflict.
    pub fn is_retryable(&self) -> bool {
        matches!(self, BookingError::LockContention)
    }
}

impl From<sqlx::Error> for BookingError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::Database(db)
                if matches!(
                    db.code().as_deref(),
                    Some(LOCK_NOT_AVAILABLE) | Some(DEADLOCK_DETECTED)
                ) =>
            {
                BookingError::LockContention
            }
            _ => BookingError::Database(err),
        }
    }
}
