use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;
use tracing::error;

use crate::engine::BookingError;
use crate::utils::response::error as error_response;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Authentication error: {0}")]
    AuthError(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Database error")]
    DatabaseError(#[from] sqlx::Error),

    #[error("Internal server error")]
    InternalServerError(String),
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::ValidationError(_) => StatusCode::BAD_REQUEST,
            AppError::AuthError(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::DatabaseError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::InternalServerError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            AppError::ValidationError(_) => "VALIDATION_ERROR",
            AppError::AuthError(_) => "AUTH_ERROR",
            AppError::Forbidden(_) => "FORBIDDEN",
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::Conflict(_) => "CONFLICT",
            AppError::DatabaseError(_) => "DATABASE_ERROR",
            AppError::InternalServerError(_) => "INTERNAL_SERVER_ERROR",
        }
    }

    fn log(&self) {
        match self {
            AppError::ValidationError(msg)
            | AppError::AuthError(msg)
            | AppError::Forbidden(msg)
            | AppError::NotFound(msg)
            | AppError::Conflict(msg)
            | AppError::InternalServerError(msg) => {
                error!(error = ?self, message = %msg, "Application error");
            }
            AppError::DatabaseError(e) => {
                error!(error = ?e, "Database error");
            }
        }
    }
}

/// Engine failures surface verbatim as typed kinds; this is the single
/// place they pick up an HTTP meaning.
impl From<BookingError> for AppError {
    fn from(err: BookingError) -> Self {
        match err {
            BookingError::NotFound => {
                AppError::NotFound("Requested resource is not found.".to_string())
            }
            BookingError::Forbidden => AppError::Forbidden("Access declined.".to_string()),
            BookingError::UnavailableResource(id) => AppError::ValidationError(format!(
                "Specified resource ({id}) is unavailable."
            )),
            BookingError::RestrictionViolation => {
                AppError::ValidationError("Restriction violation(s) occur.".to_string())
            }
            BookingError::SlotConflict(_) => {
                AppError::Conflict("Selected timeslots are already reserved.".to_string())
            }
            BookingError::DuplicateReservation { .. } => AppError::Conflict(
                "You've already reserved this event. To change the content, cancel and reserve it again."
                    .to_string(),
            ),
            BookingError::CapacityExceeded { .. } => {
                AppError::Conflict("Tickets are all gone.".to_string())
            }
            BookingError::LockContention => {
                AppError::Conflict("Resource is contended, please retry.".to_string())
            }
            BookingError::Database(e) => AppError::DatabaseError(e),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let code = self.code();

        // Log internal details
        self.log();

        // Only expose high-level message to the client
        let public_message = match &self {
            AppError::ValidationError(msg)
            | AppError::AuthError(msg)
            | AppError::Forbidden(msg)
            | AppError::NotFound(msg)
            | AppError::Conflict(msg)
            | AppError::InternalServerError(msg) => msg.clone(),
            AppError::DatabaseError(_) => "A database error occurred".to_string(),
        };

        // Do not expose internal details in the API response
        let details = None;

        error_response(code, public_message, details, status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn booking_errors_map_to_expected_statuses() {
        let cases = [
            (BookingError::NotFound, StatusCode::NOT_FOUND),
            (BookingError::Forbidden, StatusCode::FORBIDDEN),
            (BookingError::UnavailableResource(7), StatusCode::BAD_REQUEST),
            (BookingError::RestrictionViolation, StatusCode::BAD_REQUEST),
            (BookingError::SlotConflict(3), StatusCode::CONFLICT),
            (
                BookingError::DuplicateReservation {
                    user_id: 1,
                    event_id: 2,
                },
                StatusCode::CONFLICT,
            ),
            (
                BookingError::CapacityExceeded {
                    requested: 6,
                    capacity: 10,
                },
                StatusCode::CONFLICT,
            ),
            (BookingError::LockContention, StatusCode::CONFLICT),
        ];

        for (err, status) in cases {
            assert_eq!(AppError::from(err).status_code(), status);
        }
    }
}
