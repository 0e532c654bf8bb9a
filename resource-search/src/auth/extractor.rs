use std::str::FromStr;

use axum::{async_trait, extract::FromRequestParts, http::request::Parts};

use crate::{
    domain::search::{RequesterScope, Role},
    routes::ApiError,
};

pub const ROLE_HEADER: &str = "x-requester-role";
pub const BRANCH_HEADER: &str = "x-requester-branch";
pub const SEMESTER_HEADER: &str = "x-requester-semester";

/// The caller as resolved by the upstream identity layer.
///
/// Built from forwarded headers; credentials are never checked here. Returns
/// 401 Unauthorized when the role is missing or unknown, or when a restricted
/// role arrives without its branch and semester.
#[derive(Debug, Clone, PartialEq)]
pub struct Requester {
    pub role: Role,
    pub scope: RequesterScope,
}

fn header(parts: &Parts, name: &str) -> Option<String> {
    parts
        .headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

#[async_trait]
impl<S> FromRequestParts<S> for Requester
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let role = header(parts, ROLE_HEADER)
            .and_then(|role| Role::from_str(&role).ok())
            .ok_or_else(|| ApiError::unauthorized("Not authenticated"))?;

        let scope = RequesterScope::for_role(
            role,
            header(parts, BRANCH_HEADER),
            header(parts, SEMESTER_HEADER),
        )
        .ok_or_else(|| ApiError::unauthorized("Requester branch and semester are required"))?;

        Ok(Requester { role, scope })
    }
}
