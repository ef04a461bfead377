use axum::extract::State;
use axum::response::{IntoResponse, Response};

use crate::auth::Principal;
use crate::models::Role;
use crate::routes::AppState;
use crate::store;
use crate::utils::error::AppError;
use crate::utils::response::success;

pub async fn list_genres(
    State(state): State<AppState>,
    principal: Principal,
) -> Result<Response, AppError> {
    if !matches!(principal.role, Role::Artist | Role::Owner) {
        return Err(AppError::Forbidden("Access declined.".to_string()));
    }

    let genres = store::list_genres(&state.pool).await?;
    Ok(success(genres, "Genres listed").into_response())
}
