//! End-to-end checks of the booking engine's transactional guarantees
//! against a real Postgres instance.

use std::time::Duration;

use chrono::{DateTime, NaiveDateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;

use encore_server::auth::Principal;
use encore_server::engine::{BookingEngine, BookingError, EventDraft};
use encore_server::models::Role;

const ARTIST: Principal = Principal {
    user_id: 11,
    role: Role::Artist,
};
const OTHER_ARTIST: Principal = Principal {
    user_id: 12,
    role: Role::Artist,
};
const OWNER: Principal = Principal {
    user_id: 1,
    role: Role::Owner,
};

fn audience(user_id: i64) -> Principal {
    Principal {
        user_id,
        role: Role::Audience,
    }
}

fn at(s: &str) -> DateTime<Utc> {
    NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S")
        .unwrap()
        .and_utc()
}

fn draft(timeslot_ids: Vec<i64>, start: &str, end: &str) -> EventDraft {
    EventDraft {
        name: "Midnight Quartet".to_string(),
        genre_id: 1,
        price: Decimal::new(3500, 0),
        timeslot_ids,
        start_at: at(start),
        end_at: at(end),
    }
}

async fn slot_binding(pool: &PgPool, slot_id: i64) -> Option<i64> {
    sqlx::query_scalar("SELECT event_id FROM timeslots WHERE id = $1")
        .bind(slot_id)
        .fetch_one(pool)
        .await
        .unwrap()
}

async fn total_seats(pool: &PgPool, event_id: i64) -> i64 {
    sqlx::query_scalar("SELECT COALESCE(SUM(seats), 0) FROM reservations WHERE event_id = $1")
        .bind(event_id)
        .fetch_one(pool)
        .await
        .unwrap()
}

#[sqlx::test(fixtures("seed"))]
async fn create_event_binds_its_timeslots(pool: PgPool) {
    let engine = BookingEngine::new(pool.clone());

    let event = engine
        .create_event(
            ARTIST.user_id,
            &draft(vec![1, 2], "2024-05-01 10:30:00", "2024-05-01 13:30:00"),
        )
        .await
        .unwrap();

    assert_eq!(event.venue_id, 1);
    assert_eq!(slot_binding(&pool, 1).await, Some(event.id));
    assert_eq!(slot_binding(&pool, 2).await, Some(event.id));
}

#[sqlx::test(fixtures("seed"))]
async fn concurrent_create_event_has_one_winner(pool: PgPool) {
    let engine = BookingEngine::new(pool.clone());
    let d = draft(vec![1], "2024-05-01 10:00:00", "2024-05-01 12:00:00");

    let a = tokio::spawn({
        let engine = engine.clone();
        let d = d.clone();
        async move { engine.create_event(ARTIST.user_id, &d).await }
    });
    let b = tokio::spawn({
        let engine = engine.clone();
        let d = d.clone();
        async move { engine.create_event(OTHER_ARTIST.user_id, &d).await }
    });

    let results = [a.await.unwrap(), b.await.unwrap()];
    let wins = results.iter().filter(|r| r.is_ok()).count();
    assert_eq!(wins, 1, "exactly one creation may bind the slot");

    let loss = results.iter().find(|r| r.is_err()).unwrap();
    assert!(matches!(
        loss.as_ref().unwrap_err(),
        BookingError::SlotConflict(1)
    ));

    let event_count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM events")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(event_count, 1);
}

#[sqlx::test(fixtures("seed"))]
async fn create_event_rejects_unknown_genre(pool: PgPool) {
    let engine = BookingEngine::new(pool.clone());
    let mut d = draft(vec![1], "2024-05-01 10:00:00", "2024-05-01 12:00:00");
    d.genre_id = 999;

    let err = engine.create_event(ARTIST.user_id, &d).await.unwrap_err();
    assert!(matches!(err, BookingError::UnavailableResource(999)));
    assert_eq!(slot_binding(&pool, 1).await, None);
}

#[sqlx::test(fixtures("seed"))]
async fn create_event_rejects_cross_venue_slots(pool: PgPool) {
    let engine = BookingEngine::new(pool.clone());

    // Slots 2 and 4 are the same day but different venues.
    let err = engine
        .create_event(
            ARTIST.user_id,
            &draft(vec![2, 4], "2024-05-01 10:30:00", "2024-05-01 13:00:00"),
        )
        .await
        .unwrap_err();

    assert!(matches!(err, BookingError::RestrictionViolation));
    assert_eq!(slot_binding(&pool, 2).await, None);
    assert_eq!(slot_binding(&pool, 4).await, None);
}

#[sqlx::test(fixtures("seed"))]
async fn create_event_rejects_window_outside_slots(pool: PgPool) {
    let engine = BookingEngine::new(pool.clone());

    let err = engine
        .create_event(
            ARTIST.user_id,
            &draft(vec![1], "2024-05-01 10:00:00", "2024-05-01 13:00:00"),
        )
        .await
        .unwrap_err();

    assert!(matches!(err, BookingError::RestrictionViolation));
    assert_eq!(slot_binding(&pool, 1).await, None);
}

#[sqlx::test(fixtures("seed"))]
async fn update_event_moves_bindings_atomically(pool: PgPool) {
    let engine = BookingEngine::new(pool.clone());
    let event = engine
        .create_event(
            ARTIST.user_id,
            &draft(vec![1], "2024-05-01 10:00:00", "2024-05-01 12:00:00"),
        )
        .await
        .unwrap();

    let updated = engine
        .update_event(
            event.id,
            ARTIST,
            &draft(vec![2], "2024-05-01 12:30:00", "2024-05-01 13:30:00"),
        )
        .await
        .unwrap();

    assert_eq!(updated.id, event.id);
    assert_eq!(slot_binding(&pool, 1).await, None);
    assert_eq!(slot_binding(&pool, 2).await, Some(event.id));
}

#[sqlx::test(fixtures("seed"))]
async fn update_event_wrong_day_leaves_bindings_untouched(pool: PgPool) {
    let engine = BookingEngine::new(pool.clone());
    let event = engine
        .create_event(
            ARTIST.user_id,
            &draft(vec![1], "2024-05-01 10:00:00", "2024-05-01 12:00:00"),
        )
        .await
        .unwrap();

    // Slot 3 is on 2024-05-02; the requested window stays on 2024-05-01.
    let err = engine
        .update_event(
            event.id,
            ARTIST,
            &draft(vec![3], "2024-05-01 10:00:00", "2024-05-01 12:00:00"),
        )
        .await
        .unwrap_err();

    assert!(matches!(err, BookingError::RestrictionViolation));
    assert_eq!(slot_binding(&pool, 1).await, Some(event.id));
    assert_eq!(slot_binding(&pool, 3).await, None);
}

#[sqlx::test(fixtures("seed"))]
async fn update_event_conflict_keeps_original_bindings(pool: PgPool) {
    let engine = BookingEngine::new(pool.clone());
    let first = engine
        .create_event(
            ARTIST.user_id,
            &draft(vec![1], "2024-05-01 10:00:00", "2024-05-01 12:00:00"),
        )
        .await
        .unwrap();
    let second = engine
        .create_event(
            OTHER_ARTIST.user_id,
            &draft(vec![2], "2024-05-01 12:30:00", "2024-05-01 13:30:00"),
        )
        .await
        .unwrap();

    let err = engine
        .update_event(
            first.id,
            ARTIST,
            &draft(vec![2], "2024-05-01 12:30:00", "2024-05-01 13:30:00"),
        )
        .await
        .unwrap_err();

    assert!(matches!(err, BookingError::SlotConflict(2)));
    // The failed reassignment rolled back fully.
    assert_eq!(slot_binding(&pool, 1).await, Some(first.id));
    assert_eq!(slot_binding(&pool, 2).await, Some(second.id));
}

#[sqlx::test(fixtures("seed"))]
async fn update_event_requires_ownership(pool: PgPool) {
    let engine = BookingEngine::new(pool.clone());
    let event = engine
        .create_event(
            ARTIST.user_id,
            &draft(vec![1], "2024-05-01 10:00:00", "2024-05-01 12:00:00"),
        )
        .await
        .unwrap();

    let d = draft(vec![2], "2024-05-01 12:30:00", "2024-05-01 13:30:00");
    let err = engine
        .update_event(event.id, OTHER_ARTIST, &d)
        .await
        .unwrap_err();
    assert!(matches!(err, BookingError::Forbidden));

    // The privileged role may update any event.
    engine.update_event(event.id, OWNER, &d).await.unwrap();
}

#[sqlx::test(fixtures("seed"))]
async fn held_slot_lock_times_out_as_lock_contention(pool: PgPool) {
    let engine = BookingEngine::new(pool.clone());

    // Pin the slot from a separate transaction for longer than the engine
    // is willing to wait, retry included.
    let mut tx = pool.begin().await.unwrap();
    sqlx::query("SELECT id FROM timeslots WHERE id = 1 FOR UPDATE")
        .fetch_one(&mut *tx)
        .await
        .unwrap();

    let d = draft(vec![1], "2024-05-01 10:00:00", "2024-05-01 12:00:00");
    let err = engine.create_event(ARTIST.user_id, &d).await.unwrap_err();
    assert!(matches!(err, BookingError::LockContention));
    assert_eq!(slot_binding(&pool, 1).await, None);

    // The failure is transient; the same request succeeds once the lock
    // holder is gone.
    tx.rollback().await.unwrap();
    engine.create_event(ARTIST.user_id, &d).await.unwrap();
}

#[sqlx::test(fixtures("seed"))]
async fn update_event_deadlock_surfaces_as_lock_contention(pool: PgPool) {
    let engine = BookingEngine::new(pool.clone());
    let event = engine
        .create_event(
            ARTIST.user_id,
            &draft(vec![1], "2024-05-01 10:00:00", "2024-05-01 12:00:00"),
        )
        .await
        .unwrap();

    // Hold the event's current slot from a separate transaction. The large
    // deadlock_timeout keeps this side from being picked as the victim.
    let mut tx = pool.begin().await.unwrap();
    sqlx::query("SET LOCAL deadlock_timeout = '10s'")
        .execute(&mut *tx)
        .await
        .unwrap();
    sqlx::query("SELECT id FROM timeslots WHERE id = 1 FOR UPDATE")
        .fetch_one(&mut *tx)
        .await
        .unwrap();

    // The reassignment locks slot 2 first, then blocks on slot 1 while
    // unbinding it.
    let update = tokio::spawn({
        let engine = engine.clone();
        let event_id = event.id;
        async move {
            engine
                .update_event(
                    event_id,
                    ARTIST,
                    &draft(vec![2], "2024-05-01 12:30:00", "2024-05-01 13:30:00"),
                )
                .await
        }
    });
    tokio::time::sleep(Duration::from_millis(300)).await;

    // Requesting slot 2 closes the wait cycle. Postgres aborts the
    // reassignment, and this transaction ends up holding both slots, so
    // the retry runs into the bounded wait as well.
    sqlx::query("SELECT id FROM timeslots WHERE id = 2 FOR UPDATE")
        .fetch_one(&mut *tx)
        .await
        .unwrap();

    let err = update.await.unwrap().unwrap_err();
    assert!(
        matches!(err, BookingError::LockContention),
        "deadlock victim must surface as contention, got {err:?}"
    );

    // The aborted attempt left no partial state behind.
    tx.rollback().await.unwrap();
    assert_eq!(slot_binding(&pool, 1).await, Some(event.id));
    assert_eq!(slot_binding(&pool, 2).await, None);
}

#[sqlx::test(fixtures("seed"))]
async fn concurrent_reservations_never_oversell(pool: PgPool) {
    let engine = BookingEngine::new(pool.clone());
    // Venue 1 capacity is 10.
    let event = engine
        .create_event(
            ARTIST.user_id,
            &draft(vec![1], "2024-05-01 10:00:00", "2024-05-01 12:00:00"),
        )
        .await
        .unwrap();

    let a = tokio::spawn({
        let engine = engine.clone();
        let event_id = event.id;
        async move { engine.create_reservation(event_id, audience(21), 6).await }
    });
    let b = tokio::spawn({
        let engine = engine.clone();
        let event_id = event.id;
        async move { engine.create_reservation(event_id, audience(22), 6).await }
    });

    let results = [a.await.unwrap(), b.await.unwrap()];
    let admitted = results.iter().filter(|r| r.is_ok()).count();
    assert_eq!(admitted, 1, "capacity 10 cannot admit 6 + 6");

    let rejected = results.iter().find(|r| r.is_err()).unwrap();
    assert!(matches!(
        rejected.as_ref().unwrap_err(),
        BookingError::CapacityExceeded { .. }
    ));

    assert!(total_seats(&pool, event.id).await <= 10);
}

#[sqlx::test(fixtures("seed"))]
async fn reservation_can_fill_capacity_exactly(pool: PgPool) {
    let engine = BookingEngine::new(pool.clone());
    let event = engine
        .create_event(
            ARTIST.user_id,
            &draft(vec![1], "2024-05-01 10:00:00", "2024-05-01 12:00:00"),
        )
        .await
        .unwrap();

    engine
        .create_reservation(event.id, audience(21), 10)
        .await
        .unwrap();

    let err = engine
        .create_reservation(event.id, audience(22), 1)
        .await
        .unwrap_err();
    assert!(matches!(err, BookingError::CapacityExceeded { .. }));
    assert_eq!(total_seats(&pool, event.id).await, 10);
}

#[sqlx::test(fixtures("seed"))]
async fn duplicate_reservation_is_rejected(pool: PgPool) {
    let engine = BookingEngine::new(pool.clone());
    let event = engine
        .create_event(
            ARTIST.user_id,
            &draft(vec![1], "2024-05-01 10:00:00", "2024-05-01 12:00:00"),
        )
        .await
        .unwrap();

    engine
        .create_reservation(event.id, audience(21), 2)
        .await
        .unwrap();
    let err = engine
        .create_reservation(event.id, audience(21), 1)
        .await
        .unwrap_err();

    assert!(matches!(err, BookingError::DuplicateReservation { .. }));

    let rows: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM reservations WHERE event_id = $1")
            .bind(event.id)
            .fetch_one(&pool)
            .await
            .unwrap();
    assert_eq!(rows, 1);
}

#[sqlx::test(fixtures("seed"))]
async fn reservation_requires_audience_role(pool: PgPool) {
    let engine = BookingEngine::new(pool.clone());
    let event = engine
        .create_event(
            ARTIST.user_id,
            &draft(vec![1], "2024-05-01 10:00:00", "2024-05-01 12:00:00"),
        )
        .await
        .unwrap();

    let err = engine
        .create_reservation(event.id, ARTIST, 2)
        .await
        .unwrap_err();
    assert!(matches!(err, BookingError::Forbidden));
}

#[sqlx::test(fixtures("seed"))]
async fn reservation_for_missing_event_not_found(pool: PgPool) {
    let engine = BookingEngine::new(pool);

    let err = engine
        .create_reservation(999, audience(21), 2)
        .await
        .unwrap_err();
    assert!(matches!(err, BookingError::NotFound));
}

#[sqlx::test(fixtures("seed"))]
async fn cancel_reservation_authorization(pool: PgPool) {
    let engine = BookingEngine::new(pool.clone());
    let event = engine
        .create_event(
            ARTIST.user_id,
            &draft(vec![1], "2024-05-01 10:00:00", "2024-05-01 12:00:00"),
        )
        .await
        .unwrap();

    let reservation = engine
        .create_reservation(event.id, audience(21), 2)
        .await
        .unwrap();

    // Another audience member may not cancel it.
    let err = engine
        .cancel_reservation(reservation.id, audience(22))
        .await
        .unwrap_err();
    assert!(matches!(err, BookingError::Forbidden));

    // An artist who does not own the parent event may not either.
    let err = engine
        .cancel_reservation(reservation.id, OTHER_ARTIST)
        .await
        .unwrap_err();
    assert!(matches!(err, BookingError::Forbidden));

    // The artist owning the event may.
    engine
        .cancel_reservation(reservation.id, ARTIST)
        .await
        .unwrap();
    let err = engine
        .cancel_reservation(reservation.id, OWNER)
        .await
        .unwrap_err();
    assert!(matches!(err, BookingError::NotFound));
}

#[sqlx::test(fixtures("seed"))]
async fn cancel_frees_capacity_for_new_admissions(pool: PgPool) {
    let engine = BookingEngine::new(pool.clone());
    let event = engine
        .create_event(
            ARTIST.user_id,
            &draft(vec![1], "2024-05-01 10:00:00", "2024-05-01 12:00:00"),
        )
        .await
        .unwrap();

    let reservation = engine
        .create_reservation(event.id, audience(21), 10)
        .await
        .unwrap();
    engine
        .cancel_reservation(reservation.id, audience(21))
        .await
        .unwrap();

    // Capacity is derived from live rows, so the freed seats are reusable.
    engine
        .create_reservation(event.id, audience(22), 10)
        .await
        .unwrap();
    assert_eq!(total_seats(&pool, event.id).await, 10);
}
