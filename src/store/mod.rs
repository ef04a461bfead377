//! Plain row lookups and listing queries shared by the engine and the
//! handlers. Read-side listings run unsynchronized against the pool;
//! engine-facing helpers execute inside the caller's transaction.

use chrono::{DateTime, Utc};
use sqlx::{PgConnection, PgExecutor, PgPool};

use crate::models::{
    Event, EventView, Genre, Reservation, ReservationView, Timeslot, Venue,
};

pub async fn find_event<'e>(db: impl PgExecutor<'e>, id: i64) -> sqlx::Result<Option<Event>> {
    sqlx::query_as::<_, Event>("SELECT * FROM events WHERE id = $1")
        .bind(id)
        .fetch_optional(db)
        .await
}

/// Reads the event row with an exclusive lock; holding it serializes every
/// reservation admission for the event.
pub async fn find_event_for_update(
    conn: &mut PgConnection,
    id: i64,
) -> sqlx::Result<Option<Event>> {
    sqlx::query_as::<_, Event>("SELECT * FROM events WHERE id = $1 FOR UPDATE")
        .bind(id)
        .fetch_optional(conn)
        .await
}

pub async fn find_venue<'e>(db: impl PgExecutor<'e>, id: i64) -> sqlx::Result<Option<Venue>> {
    sqlx::query_as::<_, Venue>("SELECT * FROM venues WHERE id = $1")
        .bind(id)
        .fetch_optional(db)
        .await
}

pub async fn genre_exists<'e>(db: impl PgExecutor<'e>, id: i64) -> sqlx::Result<bool> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM genres WHERE id = $1")
        .bind(id)
        .fetch_one(db)
        .await?;
    Ok(count > 0)
}

pub async fn find_reservation<'e>(
    db: impl PgExecutor<'e>,
    id: i64,
) -> sqlx::Result<Option<Reservation>> {
    sqlx::query_as::<_, Reservation>("SELECT * FROM reservations WHERE id = $1")
        .bind(id)
        .fetch_optional(db)
        .await
}

pub async fn find_reservation_for_update(
    conn: &mut PgConnection,
    id: i64,
) -> sqlx::Result<Option<Reservation>> {
    sqlx::query_as::<_, Reservation>("SELECT * FROM reservations WHERE id = $1 FOR UPDATE")
        .bind(id)
        .fetch_optional(conn)
        .await
}

pub async fn list_genres(pool: &PgPool) -> sqlx::Result<Vec<Genre>> {
    sqlx::query_as::<_, Genre>("SELECT * FROM genres ORDER BY id")
        .fetch_all(pool)
        .await
}

pub async fn list_venues(pool: &PgPool, limit: i64, offset: i64) -> sqlx::Result<Vec<Venue>> {
    sqlx::query_as::<_, Venue>("SELECT * FROM venues ORDER BY id LIMIT $1 OFFSET $2")
        .bind(limit)
        .bind(offset)
        .fetch_all(pool)
        .await
}

/// Upcoming events, optionally restricted to one artist.
pub async fn list_upcoming_events(
    pool: &PgPool,
    artist_id: Option<i64>,
    limit: i64,
    offset: i64,
) -> sqlx::Result<Vec<Event>> {
    match artist_id {
        Some(artist_id) => {
            sqlx::query_as::<_, Event>(
                "SELECT * FROM events WHERE start_at >= CURRENT_DATE AND artist_id = $1 \
                 ORDER BY id LIMIT $2 OFFSET $3",
            )
            .bind(artist_id)
            .bind(limit)
            .bind(offset)
            .fetch_all(pool)
            .await
        }
        None => {
            sqlx::query_as::<_, Event>(
                "SELECT * FROM events WHERE start_at >= CURRENT_DATE \
                 ORDER BY id LIMIT $1 OFFSET $2",
            )
            .bind(limit)
            .bind(offset)
            .fetch_all(pool)
            .await
        }
    }
}

/// Free timeslots at a venue whose start falls inside the window.
pub async fn list_free_timeslots(
    pool: &PgPool,
    venue_id: i64,
    from: DateTime<Utc>,
    to: DateTime<Utc>,
) -> sqlx::Result<Vec<Timeslot>> {
    sqlx::query_as::<_, Timeslot>(
        "SELECT * FROM timeslots WHERE venue_id = $1 AND event_id IS NULL \
         AND start_at >= $2 AND start_at <= $3 ORDER BY start_at",
    )
    .bind(venue_id)
    .bind(from)
    .bind(to)
    .fetch_all(pool)
    .await
}

pub async fn list_reservations_by_user(
    pool: &PgPool,
    user_id: i64,
    limit: i64,
    offset: i64,
) -> sqlx::Result<Vec<Reservation>> {
    sqlx::query_as::<_, Reservation>(
        "SELECT * FROM reservations WHERE user_id = $1 ORDER BY id LIMIT $2 OFFSET $3",
    )
    .bind(user_id)
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await
}

pub async fn list_reservations_by_event(
    pool: &PgPool,
    event_id: i64,
    limit: i64,
    offset: i64,
) -> sqlx::Result<Vec<Reservation>> {
    sqlx::query_as::<_, Reservation>(
        "SELECT * FROM reservations WHERE event_id = $1 ORDER BY id LIMIT $2 OFFSET $3",
    )
    .bind(event_id)
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await
}

pub async fn reserved_seats<'e>(db: impl PgExecutor<'e>, event_id: i64) -> sqlx::Result<i64> {
    sqlx::query_scalar("SELECT COALESCE(SUM(seats), 0) FROM reservations WHERE event_id = $1")
        .bind(event_id)
        .fetch_one(db)
        .await
}

pub async fn timeslot_ids_for_event<'e>(
    db: impl PgExecutor<'e>,
    event_id: i64,
) -> sqlx::Result<Vec<i64>> {
    sqlx::query_scalar("SELECT id FROM timeslots WHERE event_id = $1 ORDER BY id")
        .bind(event_id)
        .fetch_all(db)
        .await
}

/// Assembles the API shape for an event. Capacity is derived, never cached.
pub async fn event_view(pool: &PgPool, event: &Event) -> sqlx::Result<EventView> {
    let venue = find_venue(pool, event.venue_id)
        .await?
        .ok_or(sqlx::Error::RowNotFound)?;
    let reserved = reserved_seats(pool, event.id).await?;
    let timeslot_ids = timeslot_ids_for_event(pool, event.id).await?;

    Ok(EventView {
        id: event.id,
        name: event.name.clone(),
        genre_id: event.genre_id,
        artist_id: event.artist_id,
        venue_id: event.venue_id,
        venue_name: venue.name,
        start_at: event.start_at,
        end_at: event.end_at,
        price: event.price,
        timeslot_ids,
        capacity: venue.capacity,
        reserved,
        created_at: event.created_at,
        updated_at: event.updated_at,
    })
}

pub async fn reservation_view(
    pool: &PgPool,
    reservation: &Reservation,
) -> sqlx::Result<ReservationView> {
    let event = find_event(pool, reservation.event_id)
        .await?
        .ok_or(sqlx::Error::RowNotFound)?;
    let venue = find_venue(pool, event.venue_id)
        .await?
        .ok_or(sqlx::Error::RowNotFound)?;

    Ok(ReservationView {
        id: reservation.id,
        user_id: reservation.user_id,
        event_id: reservation.event_id,
        event_name: event.name,
        event_price: event.price,
        event_start_at: event.start_at,
        event_end_at: event.end_at,
        venue_name: venue.name,
        seats: reservation.seats,
        created_at: reservation.created_at,
        updated_at: reservation.updated_at,
    })
}
