use axum::routing::get;
use axum::Router;
use sqlx::PgPool;
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::trace::TraceLayer;

use crate::config::{create_cors_layer, security_headers};
use crate::engine::BookingEngine;
use crate::handlers::{self, health_check};

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub engine: BookingEngine,
}

impl AppState {
    pub fn new(pool: PgPool) -> Self {
        let engine = BookingEngine::new(pool.clone());
        Self { pool, engine }
    }
}

pub fn create_routes(state: AppState) -> Router {
    let api = Router::new()
        // events
        .route(
            "/events",
            get(handlers::events::list_events).post(handlers::events::create_event),
        )
        .route(
            "/events/:event_id",
            get(handlers::events::get_event).put(handlers::events::update_event),
        )
        // reservations
        .route(
            "/events/:event_id/reservations",
            get(handlers::reservations::list_reservations_by_event)
                .post(handlers::reservations::create_reservation),
        )
        .route(
            "/users/:user_id/reservations",
            get(handlers::reservations::list_reservations_by_user),
        )
        .route(
            "/reservations/:reservation_id",
            get(handlers::reservations::get_reservation)
                .delete(handlers::reservations::cancel_reservation),
        )
        // venues & genres
        .route("/venues", get(handlers::venues::list_venues))
        .route(
            "/venues/:venue_id/timeslots",
            get(handlers::venues::list_timeslots),
        )
        .route("/genres", get(handlers::genres::list_genres));

    let mut router = Router::new()
        .route("/health", get(health_check))
        .nest("/api", api)
        .layer(TraceLayer::new_for_http())
        .layer(create_cors_layer());

    for (name, value) in security_headers() {
        router = router.layer(SetResponseHeaderLayer::if_not_present(name, value));
    }

    router.with_state(state)
}
