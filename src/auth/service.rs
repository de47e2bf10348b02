//! Signup, login, refresh-token rotation and logout.
//!
//! Session state per user lives in `refresh_token_hash`: `None` means no
//! session; otherwise it is the hash of the only refresh token that may be
//! exchanged. Every successful refresh swaps it, so a token can be used once.

use std::sync::Arc;

use anyhow::Context;
use tracing::{info, warn};
use uuid::Uuid;

use super::jwt::{TokenIssuer, TokenPair};
use super::password::Hasher;
use crate::error::AppError;
use crate::users::model::{NewUser, PublicUser};
use crate::users::repo::UserStore;

#[derive(Debug)]
pub struct SignupOutcome {
    pub user: PublicUser,
    pub message: &'static str,
}

#[derive(Debug)]
pub struct LoginOutcome {
    pub user: PublicUser,
    pub tokens: TokenPair,
}

#[derive(Clone)]
pub struct AuthService {
    users: Arc<dyn UserStore>,
    hasher: Arc<dyn Hasher>,
    tokens: TokenIssuer,
}

impl AuthService {
    pub fn new(users: Arc<dyn UserStore>, hasher: Arc<dyn Hasher>, tokens: TokenIssuer) -> Self {
        Self {
            users,
            hasher,
            tokens,
        }
    }

    pub fn tokens(&self) -> &TokenIssuer {
        &self.tokens
    }

    async fn hash(&self, plain: String) -> anyhow::Result<String> {
        let hasher = self.hasher.clone();
        tokio::task::spawn_blocking(move || hasher.hash(&plain))
            .await
            .context("hash task")?
    }

    async fn verify(&self, plain: String, hash: String) -> anyhow::Result<bool> {
        let hasher = self.hasher.clone();
        tokio::task::spawn_blocking(move || hasher.verify(&plain, &hash))
            .await
            .context("verify task")?
    }

    /// Inputs are expected to be validated and normalized already.
    pub async fn signup(
        &self,
        email: String,
        password: String,
        full_name: String,
    ) -> Result<SignupOutcome, AppError> {
        if self.users.find_by_email(&email).await?.is_some() {
            warn!(%email, "signup with registered email");
            return Err(AppError::conflict("Email already in use"));
        }

        let password_hash = self.hash(password).await?;
        let user = self
            .users
            .create(NewUser {
                email,
                password_hash,
                full_name,
            })
            .await?;

        info!(user_id = %user.id, email = %user.email, "user registered");
        Ok(SignupOutcome {
            user: user.into(),
            message: "User registered successfully",
        })
    }

    pub async fn login(&self, email: &str, password: String) -> Result<LoginOutcome, AppError> {
        let Some(user) = self.users.find_by_email(email).await? else {
            warn!(%email, "login unknown email");
            return Err(AppError::not_found("User not found"));
        };

        if !self.verify(password, user.password_hash.clone()).await? {
            warn!(user_id = %user.id, "login invalid password");
            return Err(AppError::unauthorized("Invalid credentials"));
        }

        let tokens = self.tokens.issue_pair(&user).await?;
        let refresh_hash = self.hash(tokens.refresh_token.clone()).await?;
        self.users
            .set_refresh_token_hash(user.id, Some(&refresh_hash))
            .await?;

        info!(user_id = %user.id, email = %user.email, "user logged in");
        Ok(LoginOutcome {
            user: user.into(),
            tokens,
        })
    }

    /// Exchange the current refresh token for a new pair, invalidating it.
    pub async fn refresh(&self, user_id: Uuid, presented: String) -> Result<TokenPair, AppError> {
        let user = self.users.find_by_id(user_id).await?;
        let Some((user, stored)) =
            user.and_then(|u| u.refresh_token_hash.clone().map(|h| (u, h)))
        else {
            warn!(%user_id, "refresh without active session");
            return Err(AppError::forbidden("Invalid refresh token"));
        };

        if !self.verify(presented, stored.clone()).await? {
            warn!(%user_id, "refresh token does not match stored hash");
            return Err(AppError::unauthorized("Invalid refresh token"));
        }

        let tokens = self.tokens.issue_pair(&user).await?;
        let new_hash = self.hash(tokens.refresh_token.clone()).await?;

        // Compare-and-set: a concurrent refresh with the same token loses here.
        if !self
            .users
            .rotate_refresh_token_hash(user_id, &stored, &new_hash)
            .await?
        {
            warn!(%user_id, "refresh token rotated concurrently");
            return Err(AppError::unauthorized("Invalid refresh token"));
        }

        info!(%user_id, "tokens refreshed");
        Ok(tokens)
    }

    pub async fn logout(&self, user_id: Uuid) -> Result<&'static str, AppError> {
        self.users.set_refresh_token_hash(user_id, None).await?;
        info!(%user_id, "user logged out");
        Ok("Logged out successfully")
    }

    pub async fn get_me(&self, user_id: Uuid) -> Result<PublicUser, AppError> {
        self.users
            .find_by_id(user_id)
            .await?
            .map(PublicUser::from)
            .ok_or_else(|| AppError::not_found("User not found"))
    }
}
