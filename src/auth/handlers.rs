use axum::{
    extract::{rejection::JsonRejection, State},
    http::{header::SET_COOKIE, StatusCode},
    response::AppendHeaders,
    routing::{get, post},
    Json, Router,
};
use tracing::instrument;

use crate::{
    auth::{
        claims::TokenKind,
        cookies::{ACCESS_COOKIE, REFRESH_COOKIE},
        dto::{LoginRequest, LoginResponse, MessageResponse, SignupRequest, SignupResponse},
        extractors::{AuthUser, RefreshUser},
        jwt::TokenPair,
    },
    error::AppError,
    state::AppState,
    users::model::PublicUser,
};

type CookieHeaders = AppendHeaders<[(axum::http::HeaderName, String); 2]>;

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/signup", post(signup))
        .route("/auth/login", post(login))
        .route("/auth/refresh", post(refresh))
        .route("/auth/logout", post(logout))
        .route("/auth/me", get(get_me))
}

fn token_cookies(state: &AppState, pair: &TokenPair) -> CookieHeaders {
    let tokens = state.auth.tokens();
    AppendHeaders([
        (
            SET_COOKIE,
            state
                .cookies
                .set(ACCESS_COOKIE, &pair.access_token, tokens.ttl(TokenKind::Access)),
        ),
        (
            SET_COOKIE,
            state
                .cookies
                .set(REFRESH_COOKIE, &pair.refresh_token, tokens.ttl(TokenKind::Refresh)),
        ),
    ])
}

fn cleared_cookies(state: &AppState) -> CookieHeaders {
    AppendHeaders([
        (SET_COOKIE, state.cookies.clear(ACCESS_COOKIE)),
        (SET_COOKIE, state.cookies.clear(REFRESH_COOKIE)),
    ])
}

#[instrument(skip(state, payload))]
pub async fn signup(
    State(state): State<AppState>,
    payload: Result<Json<SignupRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<SignupResponse>), AppError> {
    let Json(payload) = payload?;
    let req = payload.validate()?;
    let out = state
        .auth
        .signup(req.email, req.password, req.full_name)
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(SignupResponse {
            user: out.user,
            message: out.message,
        }),
    ))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<(CookieHeaders, Json<LoginResponse>), AppError> {
    let Json(payload) = payload?;
    let req = payload.validate()?;
    let out = state.auth.login(&req.email, req.password).await?;
    Ok((
        token_cookies(&state, &out.tokens),
        Json(LoginResponse { user: out.user }),
    ))
}

#[instrument(skip(state, rt), fields(user_id = %rt.claims.sub))]
pub async fn refresh(
    State(state): State<AppState>,
    rt: RefreshUser,
) -> Result<(CookieHeaders, Json<MessageResponse>), AppError> {
    let pair = state.auth.refresh(rt.claims.sub, rt.token).await?;
    Ok((
        token_cookies(&state, &pair),
        Json(MessageResponse {
            message: "Tokens refreshed successfully",
        }),
    ))
}

#[instrument(skip(state, rt), fields(user_id = %rt.claims.sub))]
pub async fn logout(
    State(state): State<AppState>,
    rt: RefreshUser,
) -> Result<(CookieHeaders, Json<MessageResponse>), AppError> {
    let message = state.auth.logout(rt.claims.sub).await?;
    Ok((cleared_cookies(&state), Json(MessageResponse { message })))
}

#[instrument(skip(state, user), fields(user_id = %user.0.sub))]
pub async fn get_me(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<PublicUser>, AppError> {
    Ok(Json(state.auth.get_me(user.0.sub).await?))
}
