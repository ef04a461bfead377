use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// One per (user, event); `seats` counts against the venue capacity.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Reservation {
    pub id: i64,
    pub user_id: i64,
    pub event_id: i64,
    pub seats: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Reservation enriched with event and venue context for API responses.
#[derive(Debug, Clone, Serialize)]
pub struct ReservationView {
    pub id: i64,
    pub user_id: i64,
    pub event_id: i64,
    pub event_name: String,
    pub event_price: Decimal,
    pub event_start_at: DateTime<Utc>,
    pub event_end_at: DateTime<Utc>,
    pub venue_name: String,
    pub seats: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
