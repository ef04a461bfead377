use axum::extract::{Path, Query, State};
use axum::response::{IntoResponse, Response};
use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc};
use serde::Deserialize;

use crate::auth::Principal;
use crate::models::{Role, TimeslotView};
use crate::routes::AppState;
use crate::store;
use crate::utils::error::AppError;
use crate::utils::response::success;

use super::Pagination;

const DEFAULT_VENUE_LIMIT: i64 = 5;

pub async fn list_venues(
    State(state): State<AppState>,
    _principal: Principal,
    Query(page): Query<Pagination>,
) -> Result<Response, AppError> {
    let (limit, offset) = page.resolve(DEFAULT_VENUE_LIMIT)?;

    let venues = store::list_venues(&state.pool, limit, offset).await?;
    Ok(success(venues, "Venues listed").into_response())
}

#[derive(Debug, Deserialize)]
pub struct TimeslotWindow {
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}

pub async fn list_timeslots(
    State(state): State<AppState>,
    principal: Principal,
    Path(venue_id): Path<i64>,
    Query(window): Query<TimeslotWindow>,
) -> Result<Response, AppError> {
    if store::find_venue(&state.pool, venue_id).await?.is_none() {
        return Err(AppError::NotFound(
            "Requested resource is not found.".to_string(),
        ));
    }
    if !matches!(principal.role, Role::Artist | Role::Owner) {
        return Err(AppError::Forbidden("Access declined.".to_string()));
    }

    let from = window.from.unwrap_or_else(Utc::now);
    let to = window.to.unwrap_or_else(end_of_current_month);

    let slots = store::list_free_timeslots(&state.pool, venue_id, from, to).await?;
    let views: Vec<TimeslotView> = slots.into_iter().map(TimeslotView::from).collect();

    Ok(success(views, "Timeslots listed").into_response())
}

/// Last second of the current calendar month, the listing's default horizon.
fn end_of_current_month() -> DateTime<Utc> {
    let today = Utc::now().date_naive();
    let first_of_next = if today.month() == 12 {
        NaiveDate::from_ymd_opt(today.year() + 1, 1, 1)
    } else {
        NaiveDate::from_ymd_opt(today.year(), today.month() + 1, 1)
    }
    .expect("first day of a month is always valid");

    first_of_next
        .and_hms_opt(0, 0, 0)
        .expect("midnight is always valid")
        .and_utc()
        - Duration::seconds(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn month_horizon_is_in_the_future() {
        let horizon = end_of_current_month();
        assert!(horizon >= Utc::now() - Duration::days(1));
    }

    #[test]
    fn month_horizon_ends_a_month() {
        let horizon = end_of_current_month();
        let next_day = (horizon + Duration::seconds(1)).date_naive();
        assert_eq!(next_day.day(), 1);
    }
}
