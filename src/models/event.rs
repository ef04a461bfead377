use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Event {
    pub id: i64,
    pub artist_id: i64,
    pub venue_id: i64,
    pub genre_id: i64,
    pub name: String,
    pub price: Decimal,
    pub start_at: DateTime<Utc>,
    pub end_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Event enriched with venue and reservation context for API responses.
#[derive(Debug, Clone, Serialize)]
pub struct EventView {
    pub id: i64,
    #[serde(rename = "event_name")]
    pub name: String,
    #[serde(rename = "event_genre_id")]
    pub genre_id: i64,
    pub artist_id: i64,
    pub venue_id: i64,
    pub venue_name: String,
    pub start_at: DateTime<Utc>,
    pub end_at: DateTime<Utc>,
    pub price: Decimal,
    pub timeslot_ids: Vec<i64>,
    pub capacity: i32,
    #[serde(rename = "current_resv")]
    pub reserved: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
