use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::{header::AUTHORIZATION, request::Parts},
};
use tracing::warn;

use super::claims::Claims;
use super::cookies::{read_cookie, ACCESS_COOKIE, REFRESH_COOKIE};
use super::jwt::TokenIssuer;
use crate::error::AppError;

/// Validated access token, read from the `accessToken` cookie or a Bearer header.
pub struct AuthUser(pub Claims);

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    TokenIssuer: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let tokens = TokenIssuer::from_ref(state);
        let from_cookie =
            read_cookie(&parts.headers, ACCESS_COOKIE).map(|c| verify_access(&tokens, c));
        if let Some(Ok(claims)) = from_cookie {
            return Ok(AuthUser(claims));
        }

        // A stale cookie must not shadow a valid Bearer header.
        let claims = match (bearer_token(parts)?, from_cookie) {
            (Some(token), _) => verify_access(&tokens, token)?,
            (None, Some(Err(e))) => return Err(e),
            (None, _) => return Err(AppError::unauthorized("Missing access token")),
        };

        Ok(AuthUser(claims))
    }
}

fn bearer_token(parts: &Parts) -> Result<Option<&str>, AppError> {
    let Some(value) = parts.headers.get(AUTHORIZATION) else {
        return Ok(None);
    };
    value
        .to_str()
        .ok()
        .and_then(|h| h.strip_prefix("Bearer ").or_else(|| h.strip_prefix("bearer ")))
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(Some)
        .ok_or_else(|| AppError::unauthorized("Invalid Authorization header"))
}

fn verify_access(tokens: &TokenIssuer, token: &str) -> Result<Claims, AppError> {
    tokens.verify_access(token).map_err(|e| {
        warn!(error = %e, "invalid or expired access token");
        AppError::unauthorized("Invalid or expired token")
    })
}

/// Validated refresh-token cookie plus the raw token for hash comparison.
pub struct RefreshUser {
    pub claims: Claims,
    pub token: String,
}

#[async_trait]
impl<S> FromRequestParts<S> for RefreshUser
where
    S: Send + Sync,
    TokenIssuer: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let tokens = TokenIssuer::from_ref(state);
        let token = read_cookie(&parts.headers, REFRESH_COOKIE)
            .ok_or_else(|| AppError::unauthorized("Missing refresh token"))?;

        let claims = tokens.verify_refresh(token).map_err(|e| {
            warn!(error = %e, "invalid or expired refresh token");
            AppError::unauthorized("Invalid or expired refresh token")
        })?;

        Ok(RefreshUser {
            claims,
            token: token.to_string(),
        })
    }
}

/// Access token whose role claim is `admin`.
pub struct RequireAdmin(pub Claims);

#[async_trait]
impl<S> FromRequestParts<S> for RequireAdmin
where
    S: Send + Sync,
    TokenIssuer: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let AuthUser(claims) = AuthUser::from_request_parts(parts, state).await?;
        if !claims.is_admin() {
            warn!(user_id = %claims.sub, "admin route denied");
            return Err(AppError::forbidden("Admin role required"));
        }
        Ok(RequireAdmin(claims))
    }
}
