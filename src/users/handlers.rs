use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection},
        Path, State,
    },
    routing::get,
    Json, Router,
};
use tracing::instrument;
use uuid::Uuid;

use super::dto::{DeletedResponse, UpdateProfileRequest, UpdateUserRequest};
use super::model::PublicUser;
use crate::{
    auth::extractors::{AuthUser, RequireAdmin},
    error::AppError,
    state::AppState,
};

pub fn profile_routes() -> Router<AppState> {
    Router::new().route("/users/me", get(get_profile).patch(update_profile))
}

pub fn admin_routes() -> Router<AppState> {
    Router::new()
        .route("/users", get(list_users))
        .route(
            "/users/:id",
            get(get_user).patch(update_user).delete(delete_user),
        )
}

#[instrument(skip(state, user), fields(user_id = %user.0.sub))]
pub async fn get_profile(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<PublicUser>, AppError> {
    Ok(Json(state.users.get_profile(user.0.sub).await?))
}

#[instrument(skip(state, user, payload), fields(user_id = %user.0.sub))]
pub async fn update_profile(
    State(state): State<AppState>,
    user: AuthUser,
    payload: Result<Json<UpdateProfileRequest>, JsonRejection>,
) -> Result<Json<PublicUser>, AppError> {
    let Json(payload) = payload?;
    let patch = payload.into_patch()?;
    Ok(Json(state.users.update_profile(user.0.sub, patch).await?))
}

#[instrument(skip(state, admin), fields(admin_id = %admin.0.sub))]
pub async fn list_users(
    State(state): State<AppState>,
    admin: RequireAdmin,
) -> Result<Json<Vec<PublicUser>>, AppError> {
    Ok(Json(state.users.list_active().await?))
}

#[instrument(skip(state, admin), fields(admin_id = %admin.0.sub))]
pub async fn get_user(
    State(state): State<AppState>,
    admin: RequireAdmin,
    id: Result<Path<Uuid>, PathRejection>,
) -> Result<Json<PublicUser>, AppError> {
    let Path(id) = id?;
    Ok(Json(state.users.get_user(id).await?))
}

#[instrument(skip(state, admin, payload), fields(admin_id = %admin.0.sub))]
pub async fn update_user(
    State(state): State<AppState>,
    admin: RequireAdmin,
    id: Result<Path<Uuid>, PathRejection>,
    payload: Result<Json<UpdateUserRequest>, JsonRejection>,
) -> Result<Json<PublicUser>, AppError> {
    let Path(id) = id?;
    let Json(payload) = payload?;
    let patch = payload.into_patch()?;
    Ok(Json(state.users.update_user(id, patch).await?))
}

#[instrument(skip(state, admin), fields(admin_id = %admin.0.sub))]
pub async fn delete_user(
    State(state): State<AppState>,
    admin: RequireAdmin,
    id: Result<Path<Uuid>, PathRejection>,
) -> Result<Json<DeletedResponse>, AppError> {
    let Path(id) = id?;
    let message = state.users.delete_user(id).await?;
    Ok(Json(DeletedResponse { message }))
}
