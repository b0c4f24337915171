//! Request extractors
//!
//! Identity comes from the hosted auth layer in front of this service,
//! which injects the verified user id as the `X-User-Id` header. The
//! extractor only checks presence; requests without it are rejected
//! before any handler runs.

use axum::extract::FromRequestParts;
use http::request::Parts;
use shared::error::AppError;

pub const USER_ID_HEADER: &str = "x-user-id";

/// The authenticated user, taken from `X-User-Id`
#[derive(Debug, Clone)]
pub struct CurrentUser(pub String);

impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user_id = parts
            .headers
            .get(USER_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .ok_or_else(AppError::not_authenticated)?;
        Ok(CurrentUser(user_id.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::error::ErrorCode;

    fn parts_with_header(value: Option<&str>) -> Parts {
        let mut builder = http::Request::builder().uri("/api/cart");
        if let Some(v) = value {
            builder = builder.header(USER_ID_HEADER, v);
        }
        let (parts, _) = builder.body(()).unwrap().into_parts();
        parts
    }

    #[tokio::test]
    async fn test_extracts_user_id() {
        let mut parts = parts_with_header(Some("user-1"));
        let user = CurrentUser::from_request_parts(&mut parts, &()).await.unwrap();
        assert_eq!(user.0, "user-1");
    }

    #[tokio::test]
    async fn test_missing_or_blank_header_rejected() {
        let mut parts = parts_with_header(None);
        let err = CurrentUser::from_request_parts(&mut parts, &()).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::NotAuthenticated);

        let mut parts = parts_with_header(Some("  "));
        assert!(CurrentUser::from_request_parts(&mut parts, &()).await.is_err());
    }
}
