//! Acting principal resolved from request headers.
//!
//! The fronting auth layer sets `x-campus-user` and `x-campus-role`; nothing
//! here verifies them. A request without either header acts as an
//! administrator.

use crate::error::DashboardError;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use campus_core::Role;
use campus_policy::Principal;

pub const USER_HEADER: &str = "x-campus-user";
pub const ROLE_HEADER: &str = "x-campus-role";

/// Extractor wrapping the [`Principal`] of the request.
#[derive(Debug, Clone)]
pub struct Actor(pub Principal);

fn header<'a>(parts: &'a Parts, name: &str) -> Result<Option<&'a str>, DashboardError> {
    match parts.headers.get(name) {
        None => Ok(None),
        Some(value) => value
            .to_str()
            .map(|v| Some(v.trim()).filter(|v| !v.is_empty()))
            .map_err(|_| DashboardError::InvalidRequest(format!("{} is not valid text", name))),
    }
}

impl<S> FromRequestParts<S> for Actor
where
    S: Send + Sync,
{
    type Rejection = DashboardError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user = header(parts, USER_HEADER)?;
        let role = match header(parts, ROLE_HEADER)? {
            Some(raw) => raw
                .parse::<Role>()
                .map_err(DashboardError::InvalidRequest)?,
            None => Role::Admin,
        };

        Ok(Actor(Principal {
            user_id: user.map(str::to_string),
            role,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    async fn resolve(request: Request<()>) -> Result<Principal, DashboardError> {
        let (mut parts, _) = request.into_parts();
        Actor::from_request_parts(&mut parts, &())
            .await
            .map(|Actor(p)| p)
    }

    #[tokio::test]
    async fn test_missing_headers_mean_admin() {
        let principal = resolve(Request::new(())).await.unwrap();
        assert_eq!(principal, Principal::admin());
    }

    #[tokio::test]
    async fn test_teacher_headers() {
        let request = Request::builder()
            .header(USER_HEADER, "t1")
            .header(ROLE_HEADER, "Teacher")
            .body(())
            .unwrap();
        let principal = resolve(request).await.unwrap();
        assert_eq!(principal, Principal::new("t1", Role::Teacher));
    }

    #[tokio::test]
    async fn test_unknown_role_is_rejected() {
        let request = Request::builder()
            .header(ROLE_HEADER, "janitor")
            .body(())
            .unwrap();
        let err = resolve(request).await.unwrap_err();
        assert!(matches!(err, DashboardError::InvalidRequest(_)));
    }
}
