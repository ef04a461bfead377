//! Authenticated principal, as handed to us by the identity gateway.
//!
//! Token issuance, validation and revocation live entirely outside this
//! service; the gateway verifies the bearer token and forwards the verified
//! identity in trusted headers. We parse those headers and nothing more.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use crate::models::Role;
use crate::utils::error::AppError;

pub const USER_ID_HEADER: &str = "x-user-id";
pub const USER_ROLE_HEADER: &str = "x-user-role";

#[derive(Debug, Clone, Copy)]
pub struct Principal {
    pub user_id: i64,
    pub role: Role,
}

#[axum::async_trait]
impl<S> FromRequestParts<S> for Principal
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user_id = header_value(parts, USER_ID_HEADER)?
            .parse::<i64>()
            .map_err(|_| malformed(USER_ID_HEADER))?;
        let role = header_value(parts, USER_ROLE_HEADER)?
            .parse::<Role>()
            .map_err(|_| malformed(USER_ROLE_HEADER))?;

        Ok(Principal { user_id, role })
    }
}

fn header_value<'a>(parts: &'a Parts, name: &str) -> Result<&'a str, AppError> {
    parts
        .headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .ok_or_else(|| AppError::AuthError(format!("Missing identity header '{name}'")))
}

fn malformed(name: &str) -> AppError {
    AppError::AuthError(format!("Malformed identity header '{name}'"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    fn parts(id: Option<&str>, role: Option<&str>) -> Parts {
        let mut builder = Request::builder().uri("/");
        if let Some(id) = id {
            builder = builder.header(USER_ID_HEADER, id);
        }
        if let Some(role) = role {
            builder = builder.header(USER_ROLE_HEADER, role);
        }
        builder.body(()).unwrap().into_parts().0
    }

    #[tokio::test]
    async fn extracts_identity_from_headers() {
        let mut parts = parts(Some("42"), Some("artist"));
        let principal = Principal::from_request_parts(&mut parts, &()).await.unwrap();
        assert_eq!(principal.user_id, 42);
        assert_eq!(principal.role, Role::Artist);
    }

    #[tokio::test]
    async fn rejects_missing_headers() {
        let mut parts = parts(None, None);
        assert!(Principal::from_request_parts(&mut parts, &()).await.is_err());
    }

    #[tokio::test]
    async fn rejects_unknown_role() {
        let mut parts = parts(Some("42"), Some("superuser"));
        assert!(Principal::from_request_parts(&mut parts, &()).await.is_err());
    }
}
