use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};

use crate::utils::error::AppError;
use crate::utils::response::success;

pub mod events;
pub mod genres;
pub mod reservations;
pub mod venues;

#[derive(Serialize)]
struct HealthPayload {
    status: &'static str,
    service: &'static str,
}

pub async fn health_check() -> Response {
    let payload = HealthPayload {
        status: "ok",
        service: "encore-api",
    };

    success(payload, "Health check successful").into_response()
}

/// Common `limit`/`offset` query parameters. Listings that diverge in the
/// upstream backends use the stricter default.
#[derive(Debug, Default, Deserialize)]
pub struct Pagination {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

impl Pagination {
    pub fn resolve(&self, default_limit: i64) -> Result<(i64, i64), AppError> {
        let limit = self.limit.unwrap_or(default_limit);
        let offset = self.offset.unwrap_or(0);
        if limit < 0 || offset < 0 {
            return Err(AppError::ValidationError(
                "Restriction violation(s) occur.".to_string(),
            ));
        }
        Ok((limit, offset))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pagination_falls_back_to_defaults() {
        let page = Pagination::default();
        assert_eq!(page.resolve(12).unwrap(), (12, 0));
    }

    #[test]
    fn pagination_rejects_negative_values() {
        let page = Pagination {
            limit: Some(-1),
            offset: None,
        };
        assert!(page.resolve(12).is_err());
    }
}
