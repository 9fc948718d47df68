//! Request extractors.
//!
//! Wrappers around axum's extractors that reject with [`ApiError`], so
//! malformed input gets the same JSON error envelope as everything else.

use crate::error::ApiError;
use crate::state::AppState;
use axum::extract::{FromRequest, FromRequestParts, Path, Query, Request};
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use axum::Json;
use campushare_core::models::User;
use campushare_core::{Actor, CoreError};
use serde::de::DeserializeOwned;

/// An authenticated, active account.
#[derive(Debug, Clone)]
pub struct AuthUser(pub User);

impl AuthUser {
    /// The account as a permission subject, with its current role.
    pub fn actor(&self) -> Actor {
        Actor::new(self.0.id, self.0.role)
    }
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts)?.ok_or(CoreError::Unauthenticated)?;
        Ok(AuthUser(state.authenticate(token).await?))
    }
}

/// An account if credentials were sent, `None` for anonymous requests.
///
/// Credentials that are sent but invalid are still rejected.
#[derive(Debug, Clone)]
pub struct MaybeUser(pub Option<User>);

impl MaybeUser {
    /// The account as a permission subject.
    pub fn actor(&self) -> Option<Actor> {
        self.0.as_ref().map(|user| Actor::new(user.id, user.role))
    }
}

impl FromRequestParts<AppState> for MaybeUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        match bearer_token(parts)? {
            Some(token) => Ok(MaybeUser(Some(state.authenticate(token).await?))),
            None => Ok(MaybeUser(None)),
        }
    }
}

fn bearer_token(parts: &Parts) -> Result<Option<&str>, ApiError> {
    let Some(value) = parts.headers.get(AUTHORIZATION) else {
        return Ok(None);
    };
    let value = value.to_str().map_err(|_| CoreError::Unauthenticated)?;
    let (scheme, token) = value.split_once(' ').ok_or(CoreError::Unauthenticated)?;
    if !scheme.eq_ignore_ascii_case("bearer") || token.trim().is_empty() {
        return Err(CoreError::Unauthenticated.into());
    }
    Ok(Some(token.trim()))
}

/// JSON request body.
#[derive(Debug, Clone)]
pub struct JsonBody<T>(pub T);

impl<S, T> FromRequest<S> for JsonBody<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|rejection| ApiError::bad_request(rejection.body_text()))?;
        Ok(JsonBody(value))
    }
}

/// Query string parameters.
#[derive(Debug, Clone)]
pub struct Params<T>(pub T);

impl<S, T> FromRequestParts<S> for Params<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Query(value) = Query::<T>::from_request_parts(parts, state)
            .await
            .map_err(|rejection| ApiError::bad_request(rejection.body_text()))?;
        Ok(Params(value))
    }
}

/// The numeric `{id}` path segment.
#[derive(Debug, Clone, Copy)]
pub struct IdParam(pub i64);

impl<S> FromRequestParts<S> for IdParam
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(id) = Path::<i64>::from_request_parts(parts, state)
            .await
            .map_err(|rejection| ApiError::bad_request(rejection.body_text()))?;
        Ok(IdParam(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request as HttpRequest;

    fn parts(authorization: Option<&str>) -> Parts {
        let mut builder = HttpRequest::builder().uri("/api/auth/me");
        if let Some(value) = authorization {
            builder = builder.header(AUTHORIZATION, value);
        }
        builder.body(()).unwrap().into_parts().0
    }

    #[test]
    fn no_header_is_anonymous() {
        assert!(bearer_token(&parts(None)).unwrap().is_none());
    }

    #[test]
    fn reads_bearer_token() {
        let parts = parts(Some("Bearer abc.def.ghi"));
        assert_eq!(bearer_token(&parts).unwrap(), Some("abc.def.ghi"));

        let parts = self::parts(Some("bearer abc.def.ghi"));
        assert_eq!(bearer_token(&parts).unwrap(), Some("abc.def.ghi"));
    }

    #[test]
    fn rejects_other_schemes() {
        for value in ["Basic dXNlcjpwYXNz", "Bearer", "Bearer   ", "token"] {
            let err = bearer_token(&parts(Some(value))).unwrap_err();
            assert_eq!(err.code(), "unauthenticated", "{value}");
        }
    }
}
