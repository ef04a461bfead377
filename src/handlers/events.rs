use axum::extract::{Path, Query, State};
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;

use crate::auth::Principal;
use crate::engine::EventDraft;
use crate::models::Role;
use crate::routes::AppState;
use crate::store;
use crate::utils::error::AppError;
use crate::utils::response::{created, success};

use super::Pagination;

const DEFAULT_EVENT_LIMIT: i64 = 12;

/// The venues rent out at most two consecutive slots per event.
const MAX_TIMESLOTS_PER_EVENT: usize = 2;

#[derive(Debug, Deserialize)]
pub struct EventBody {
    #[serde(rename = "event_name")]
    pub name: String,
    #[serde(rename = "event_genre_id")]
    pub genre_id: i64,
    pub price: Decimal,
    pub timeslot_ids: Vec<i64>,
    pub start_at: DateTime<Utc>,
    pub end_at: DateTime<Utc>,
}

impl EventBody {
    fn into_draft(self) -> Result<EventDraft, AppError> {
        if self.name.is_empty() || self.timeslot_ids.is_empty() {
            return Err(AppError::ValidationError(
                "Mandatory parameter(s) are missing.".to_string(),
            ));
        }
        if self.price <= Decimal::ZERO || self.timeslot_ids.len() > MAX_TIMESLOTS_PER_EVENT {
            return Err(AppError::ValidationError(
                "Restriction violation(s) occur.".to_string(),
            ));
        }
        Ok(EventDraft {
            name: self.name,
            genre_id: self.genre_id,
            price: self.price,
            timeslot_ids: self.timeslot_ids,
            start_at: self.start_at,
            end_at: self.end_at,
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct EventListQuery {
    #[serde(rename = "user_id")]
    pub artist_id: Option<i64>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

pub async fn list_events(
    State(state): State<AppState>,
    Query(query): Query<EventListQuery>,
) -> Result<Response, AppError> {
    let page = Pagination {
        limit: query.limit,
        offset: query.offset,
    };
    let (limit, offset) = page.resolve(DEFAULT_EVENT_LIMIT)?;

    let events = store::list_upcoming_events(&state.pool, query.artist_id, limit, offset).await?;
    let mut views = Vec::with_capacity(events.len());
    for event in &events {
        views.push(store::event_view(&state.pool, event).await?);
    }

    Ok(success(views, "Events listed").into_response())
}

pub async fn get_event(
    State(state): State<AppState>,
    Path(event_id): Path<i64>,
) -> Result<Response, AppError> {
    let event = store::find_event(&state.pool, event_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Requested resource is not found.".to_string()))?;
    let view = store::event_view(&state.pool, &event).await?;

    Ok(success(view, "Event found").into_response())
}

pub async fn create_event(
    State(state): State<AppState>,
    principal: Principal,
    Json(body): Json<EventBody>,
) -> Result<Response, AppError> {
    if principal.role != Role::Artist {
        return Err(AppError::Forbidden("Access declined.".to_string()));
    }
    let draft = body.into_draft()?;

    let event = state.engine.create_event(principal.user_id, &draft).await?;
    let view = store::event_view(&state.pool, &event).await?;

    Ok(created(view, "Event created").into_response())
}

pub async fn update_event(
    State(state): State<AppState>,
    principal: Principal,
    Path(event_id): Path<i64>,
    Json(body): Json<EventBody>,
) -> Result<Response, AppError> {
    let draft = body.into_draft()?;

    let event = state
        .engine
        .update_event(event_id, principal, &draft)
        .await?;
    let view = store::event_view(&state.pool, &event).await?;

    Ok(success(view, "Event updated").into_response())
}
