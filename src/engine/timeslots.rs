//! Timeslot ledger: exclusivity state of venue time windows.
//!
//! All mutations run against rows already read `FOR UPDATE` by
//! [`lock_for_update`], inside the caller's transaction.

use sqlx::PgConnection;

use crate::engine::error::BookingError;
use crate::models::Timeslot;

/// Reads the requested timeslot rows with exclusive row locks, always in
/// ascending id order so every operation acquires overlapping lock sets in
/// the same total order. Missing ids are simply absent from the result; the
/// timeline validator reports them.
pub async fn lock_for_update(
    conn: &mut PgConnection,
    ids: &[i64],
) -> Result<Vec<Timeslot>, BookingError> {
    let mut ordered: Vec<i64> = ids.to_vec();
    ordered.sort_unstable();
    ordered.dedup();

    let mut slots = Vec::with_capacity(ordered.len());
    for id in ordered {
        let slot = sqlx::query_as::<_, Timeslot>(
            "SELECT * FROM timeslots WHERE id = $1 FOR UPDATE",
        )
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;
        if let Some(slot) = slot {
            slots.push(slot);
        }
    }
    Ok(slots)
}

/// Binds every locked slot to the event. The `event_id IS NULL` guard makes
/// a concurrent binding visible as zero affected rows; any such slot aborts
/// the whole batch so partial assignment is never committed.
pub async fn assign(
    conn: &mut PgConnection,
    event_id: i64,
    slots: &[Timeslot],
) -> Result<(), BookingError> {
    for slot in slots {
        let affected = sqlx::query(
            "UPDATE timeslots SET event_id = $1, updated_at = NOW() \
             WHERE id = $2 AND event_id IS NULL",
        )
        .bind(event_id)
        .bind(slot.id)
        .execute(&mut *conn)
        .await?
        .rows_affected();

        if affected == 0 {
            return Err(BookingError::SlotConflict(slot.id));
        }
    }
    Ok(())
}

/// Frees every slot currently bound to the event. Safe only inside the same
/// transaction that immediately re-assigns, with the new set's locks held.
pub async fn release(conn: &mut PgConnection, event_id: i64) -> Result<(), BookingError> {
    sqlx::query("UPDATE timeslots SET event_id = NULL, updated_at = NOW() WHERE event_id = $1")
        .bind(event_id)
        .execute(conn)
        .await?;
    Ok(())
}
