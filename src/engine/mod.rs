//! Booking engine: the four booking operations, each one atomic
//! transaction over the relational store.
//!
//! The engine is stateless between requests; all coordination lives in
//! Postgres row locks. Timeslot locks are taken in ascending id order by
//! every operation, and reservation admission serializes on the parent
//! event row, so no two transactions can circular-wait.

pub mod capacity;
pub mod error;
pub mod timeline;
pub mod timeslots;

use std::future::Future;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{PgPool, Postgres, Transaction};

use crate::auth::Principal;
use crate::models::{Event, Reservation, Role};
use crate::store;

pub use error::BookingError;

/// Upper bound on waiting for a row lock before the transaction aborts with
/// a retryable conflict instead of blocking indefinitely.
const LOCK_TIMEOUT: &str = "2s";

/// One immediate retry for lock-wait timeouts and deadlock aborts;
/// everything else is terminal.
const LOCK_RETRIES: u32 = 1;

/// Validated input for CreateEvent and UpdateEvent.
#[derive(Debug, Clone)]
pub struct EventDraft {
    pub name: String,
    pub genre_id: i64,
    pub price: Decimal,
    pub timeslot_ids: Vec<i64>,
    pub start_at: DateTime<Utc>,
    pub end_at: DateTime<Utc>,
}

#[derive(Clone)]
pub struct BookingEngine {
    pool: PgPool,
}

impl BookingEngine {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Exclusively binds the requested timeslots to a new event owned by
    /// `artist_id`. Fully rolled back on any failure after locks are taken.
    pub async fn create_event(
        &self,
        artist_id: i64,
        draft: &EventDraft,
    ) -> Result<Event, BookingError> {
        self.with_lock_retry(|| self.create_event_once(artist_id, draft))
            .await
    }

    /// Re-points an existing event at a new timeslot set and fields.
    /// Authorization: the owning artist, or the privileged owner role.
    pub async fn update_event(
        &self,
        event_id: i64,
        actor: Principal,
        draft: &EventDraft,
    ) -> Result<Event, BookingError> {
        self.with_lock_retry(|| self.update_event_once(event_id, actor, draft))
            .await
    }

    /// Admits `seats` for `actor` against the event's venue capacity.
    /// Audience capability only.
    pub async fn create_reservation(
        &self,
        event_id: i64,
        actor: Principal,
        seats: i32,
    ) -> Result<Reservation, BookingError> {
        self.with_lock_retry(|| self.create_reservation_once(event_id, actor, seats))
            .await
    }

    /// Deletes a reservation. Authorization: the reserving user, the
    /// privileged owner role, or the artist owning the parent event.
    pub async fn cancel_reservation(
        &self,
        reservation_id: i64,
        actor: Principal,
    ) -> Result<(), BookingError> {
        self.with_lock_retry(|| self.cancel_reservation_once(reservation_id, actor))
            .await
    }

    async fn create_event_once(
        &self,
        artist_id: i64,
        draft: &EventDraft,
    ) -> Result<Event, BookingError> {
        let mut tx = self.begin().await?;

        if !store::genre_exists(&mut *tx, draft.genre_id).await? {
            return Err(BookingError::UnavailableResource(draft.genre_id));
        }

        let slots = timeslots::lock_for_update(&mut *tx, &draft.timeslot_ids).await?;
        let venue_id =
            timeline::validate(&draft.timeslot_ids, &slots, draft.start_at, draft.end_at)?;

        let event = sqlx::query_as::<_, Event>(
            "INSERT INTO events (artist_id, venue_id, genre_id, name, price, start_at, end_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) RETURNING *",
        )
        .bind(artist_id)
        .bind(venue_id)
        .bind(draft.genre_id)
        .bind(&draft.name)
        .bind(draft.price)
        .bind(draft.start_at)
        .bind(draft.end_at)
        .fetch_one(&mut *tx)
        .await?;

        timeslots::assign(&mut *tx, event.id, &slots).await?;

        tx.commit().await?;
        tracing::info!(event_id = event.id, artist_id, "event created");
        Ok(event)
    }

    async fn update_event_once(
        &self,
        event_id: i64,
        actor: Principal,
        draft: &EventDraft,
    ) -> Result<Event, BookingError> {
        let mut tx = self.begin().await?;

        let event = store::find_event(&mut *tx, event_id)
            .await?
            .ok_or(BookingError::NotFound)?;
        match actor.role {
            Role::Artist if actor.user_id == event.artist_id => {}
            Role::Owner => {}
            _ => return Err(BookingError::Forbidden),
        }

        if !store::genre_exists(&mut *tx, draft.genre_id).await? {
            return Err(BookingError::UnavailableResource(draft.genre_id));
        }

        let slots = timeslots::lock_for_update(&mut *tx, &draft.timeslot_ids).await?;
        let venue_id =
            timeline::validate(&draft.timeslot_ids, &slots, draft.start_at, draft.end_at)?;

        // Release-then-reassign is safe here: the new set's locks are held
        // and both steps commit or roll back together.
        timeslots::release(&mut *tx, event_id).await?;
        timeslots::assign(&mut *tx, event_id, &slots).await?;

        let updated = sqlx::query_as::<_, Event>(
            "UPDATE events SET venue_id = $1, genre_id = $2, name = $3, price = $4, \
             start_at = $5, end_at = $6, updated_at = NOW() WHERE id = $7 RETURNING *",
        )
        .bind(venue_id)
        .bind(draft.genre_id)
        .bind(&draft.name)
        .bind(draft.price)
        .bind(draft.start_at)
        .bind(draft.end_at)
        .bind(event_id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        tracing::info!(event_id, "event updated");
        Ok(updated)
    }

    async fn create_reservation_once(
        &self,
        event_id: i64,
        actor: Principal,
        seats: i32,
    ) -> Result<Reservation, BookingError> {
        if actor.role != Role::Audience {
            return Err(BookingError::Forbidden);
        }
        if seats <= 0 {
            return Err(BookingError::RestrictionViolation);
        }

        let mut tx = self.begin().await?;

        // The event row lock serializes all admissions for this event.
        let event = store::find_event_for_update(&mut *tx, event_id)
            .await?
            .ok_or(BookingError::NotFound)?;
        let venue = store::find_venue(&mut *tx, event.venue_id)
            .await?
            .ok_or(BookingError::NotFound)?;

        let reservation =
            capacity::admit(&mut *tx, event_id, actor.user_id, seats, venue.capacity).await?;

        tx.commit().await?;
        tracing::info!(
            reservation_id = reservation.id,
            event_id,
            seats,
            "reservation admitted"
        );
        Ok(reservation)
    }

    async fn cancel_reservation_once(
        &self,
        reservation_id: i64,
        actor: Principal,
    ) -> Result<(), BookingError> {
        let mut tx = self.begin().await?;

        let reservation = store::find_reservation_for_update(&mut *tx, reservation_id)
            .await?
            .ok_or(BookingError::NotFound)?;

        match actor.role {
            Role::Audience if actor.user_id == reservation.user_id => {}
            Role::Owner => {}
            Role::Artist => {
                let event = store::find_event(&mut *tx, reservation.event_id)
                    .await?
                    .ok_or(BookingError::NotFound)?;
                if event.artist_id != actor.user_id {
                    return Err(BookingError::Forbidden);
                }
            }
            _ => return Err(BookingError::Forbidden),
        }

        sqlx::query("DELETE FROM reservations WHERE id = $1")
            .bind(reservation_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        tracing::info!(reservation_id, "reservation cancelled");
        Ok(())
    }

    /// Opens a transaction with the bounded lock wait applied.
    async fn begin(&self) -> Result<Transaction<'static, Postgres>, BookingError> {
        let mut tx = self.pool.begin().await?;
        sqlx::query(&format!("SET LOCAL lock_timeout = '{LOCK_TIMEOUT}'"))
            .execute(&mut *tx)
            .await?;
        Ok(tx)
    }

    async fn with_lock_retry<T, F, Fut>(&self, mut op: F) -> Result<T, BookingError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, BookingError>>,
    {
        let mut attempts = 0;
        loop {
            match op().await {
                Err(err) if err.is_retryable() && attempts < LOCK_RETRIES => {
                    attempts += 1;
                    tracing::debug!(attempts, "retrying after lock contention");
                }
                result => return result,
            }
        }
    }
}