//! Pure consistency check between an event's window and the timeslots that
//! are supposed to back it. Runs against the locked rows so it sees the
//! state the transaction will commit on top of.

use std::collections::HashSet;

use chrono::{DateTime, Utc};

use crate::engine::error::BookingError;
use crate::models::Timeslot;

/// Validates a proposed (window, timeslots) combination and returns the
/// common venue id.
///
/// Checks, in order: every requested id resolved, single venue, single
/// calendar day shared with the event's start and end, and containment of
/// the window in the union span of the slots.
pub fn validate(
    requested_ids: &[i64],
    slots: &[Timeslot],
    start_at: DateTime<Utc>,
    end_at: DateTime<Utc>,
) -> Result<i64, BookingError> {
    let mut wanted: Vec<i64> = requested_ids.to_vec();
    wanted.sort_unstable();
    wanted.dedup();

    if slots.len() != wanted.len() {
        let found: HashSet<i64> = slots.iter().map(|s| s.id).collect();
        let missing = wanted
            .iter()
            .copied()
            .find(|id| !found.contains(id))
            .unwrap_or_default();
        return Err(BookingError::UnavailableResource(missing));
    }
    let Some(first) = slots.first() else {
        return Err(BookingError::RestrictionViolation);
    };

    let venue_id = first.venue_id;
    if slots.iter().any(|s| s.venue_id != venue_id) {
        return Err(BookingError::RestrictionViolation);
    }

    let day = first.start_at.date_naive();
    if slots.iter().any(|s| s.start_at.date_naive() != day) {
        return Err(BookingError::RestrictionViolation);
    }
    if start_at.date_naive() != day || end_at.date_naive() != day {
        return Err(BookingError::RestrictionViolation);
    }

    // Slots are non-empty here, so min/max always exist.
    let earliest = slots.iter().map(|s| s.start_at).min().unwrap();
    let latest = slots.iter().map(|s| s.end_at).max().unwrap();
    if !(earliest <= start_at && start_at < end_at && end_at <= latest) {
        return Err(BookingError::RestrictionViolation);
    }

    Ok(venue_id)
}
