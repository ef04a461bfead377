use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A bookable window at a venue. `event_id` is the assignment flag: `None`
/// means free, `Some` means exclusively bound to that event. Only the
/// booking engine mutates it.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Timeslot {
    pub id: i64,
    pub venue_id: i64,
    pub event_id: Option<i64>,
    pub start_at: DateTime<Utc>,
    pub end_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Shape served by the free-timeslot listing; venue and assignment are
/// implied by the query.
#[derive(Debug, Clone, Serialize)]
pub struct TimeslotView {
    pub id: i64,
    pub start_at: DateTime<Utc>,
    pub end_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Timeslot> for TimeslotView {
    fn from(slot: Timeslot) -> Self {
        Self {
            id: slot.id,
            start_at: slot.start_at,
            end_at: slot.end_at,
            created_at: slot.created_at,
            updated_at: slot.updated_at,
        }
    }
}
