//! Capacity ledger: admits reservations against a venue's fixed ceiling.
//!
//! The caller holds the parent event row `FOR UPDATE`, so all admissions for
//! one event are serialized and the read-check-insert sequence below cannot
//! interleave with another admit for the same event.

use sqlx::PgConnection;

use crate::engine::error::BookingError;
use crate::models::Reservation;

/// Postgres SQLSTATE for a unique constraint violation.
const UNIQUE_VIOLATION: &str = "23505";

pub async fn admit(
    conn: &mut PgConnection,
    event_id: i64,
    user_id: i64,
    seats: i32,
    capacity: i32,
) -> Result<Reservation, BookingError> {
    let existing: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM reservations WHERE event_id = $1 AND user_id = $2",
    )
    .bind(event_id)
    .bind(user_id)
    .fetch_one(&mut *conn)
    .await?;
    if existing > 0 {
        return Err(BookingError::DuplicateReservation { user_id, event_id });
    }

    let reserved: i64 =
        sqlx::query_scalar("SELECT COALESCE(SUM(seats), 0) FROM reservations WHERE event_id = $1")
            .bind(event_id)
            .fetch_one(&mut *conn)
            .await?;
    if reserved + i64::from(seats) > i64::from(capacity) {
        return Err(BookingError::CapacityExceeded {
            requested: seats,
            capacity,
        });
    }

    // UNIQUE (user_id, event_id) backstops the duplicate check above.
    let reservation = sqlx::query_as::<_, Reservation>(
        "INSERT INTO reservations (user_id, event_id, seats) VALUES ($1, $2, $3) RETURNING *",
    )
    .bind(user_id)
    .bind(event_id)
    .bind(seats)
    .fetch_one(&mut *conn)
    .await
    .map_err(|err| match &err {
        sqlx::Error::Database(db) if db.code().as_deref() == Some(UNIQUE_VIOLATION) => {
            BookingError::DuplicateReservation { user_id, event_id }
        }
        _ => err.into(),
    })?;

    Ok(reservation)
}
