use axum::extract::{Path, Query, State};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;

use crate::auth::Principal;
use crate::models::Role;
use crate::routes::AppState;
use crate::store;
use crate::utils::error::AppError;
use crate::utils::response::{created, no_content, success};

use super::Pagination;

const DEFAULT_USER_RESERVATION_LIMIT: i64 = 5;
const DEFAULT_EVENT_RESERVATION_LIMIT: i64 = 10;

#[derive(Debug, Deserialize)]
pub struct ReservationBody {
    pub seats: i32,
}

pub async fn create_reservation(
    State(state): State<AppState>,
    principal: Principal,
    Path(event_id): Path<i64>,
    Json(body): Json<ReservationBody>,
) -> Result<Response, AppError> {
    if body.seats <= 0 {
        return Err(AppError::ValidationError(
            "Restriction violation(s) occur.".to_string(),
        ));
    }

    let reservation = state
        .engine
        .create_reservation(event_id, principal, body.seats)
        .await?;
    let view = store::reservation_view(&state.pool, &reservation).await?;

    Ok(created(view, "Reservation created").into_response())
}

pub async fn get_reservation(
    State(state): State<AppState>,
    principal: Principal,
    Path(reservation_id): Path<i64>,
) -> Result<Response, AppError> {
    let reservation = store::find_reservation(&state.pool, reservation_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Requested resource is not found.".to_string()))?;

    match principal.role {
        Role::Audience if principal.user_id == reservation.user_id => {}
        Role::Owner => {}
        _ => return Err(AppError::Forbidden("Access declined.".to_string())),
    }

    let view = store::reservation_view(&state.pool, &reservation).await?;
    Ok(success(view, "Reservation found").into_response())
}

pub async fn cancel_reservation(
    State(state): State<AppState>,
    principal: Principal,
    Path(reservation_id): Path<i64>,
) -> Result<Response, AppError> {
    state
        .engine
        .cancel_reservation(reservation_id, principal)
        .await?;

    Ok(no_content().into_response())
}

pub async fn list_reservations_by_user(
    State(state): State<AppState>,
    principal: Principal,
    Path(user_id): Path<i64>,
    Query(page): Query<Pagination>,
) -> Result<Response, AppError> {
    match principal.role {
        Role::Audience if principal.user_id == user_id => {}
        Role::Owner => {}
        _ => return Err(AppError::Forbidden("Access declined.".to_string())),
    }
    let (limit, offset) = page.resolve(DEFAULT_USER_RESERVATION_LIMIT)?;

    let reservations =
        store::list_reservations_by_user(&state.pool, user_id, limit, offset).await?;
    let mut views = Vec::with_capacity(reservations.len());
    for reservation in &reservations {
        views.push(store::reservation_view(&state.pool, reservation).await?);
    }

    Ok(success(views, "Reservations listed").into_response())
}

pub async fn list_reservations_by_event(
    State(state): State<AppState>,
    principal: Principal,
    Path(event_id): Path<i64>,
    Query(page): Query<Pagination>,
) -> Result<Response, AppError> {
    let event = store::find_event(&state.pool, event_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Requested resource is not found.".to_string()))?;

    match principal.role {
        Role::Artist if principal.user_id == event.artist_id => {}
        Role::Owner => {}
        _ => return Err(AppError::Forbidden("Access declined.".to_string())),
    }
    let (limit, offset) = page.resolve(DEFAULT_EVENT_RESERVATION_LIMIT)?;

    let reservations =
        store::list_reservations_by_event(&state.pool, event_id, limit, offset).await?;
    let mut views = Vec::with_capacity(reservations.len());
    for reservation in &reservations {
        views.push(store::reservation_view(&state.pool, reservation).await?);
    }

    Ok(success(views, "Reservations listed").into_response())
}
