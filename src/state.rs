use std::sync::Arc;

use axum::extract::FromRef;

use crate::auth::cookies::CookiePolicy;
use crate::auth::jwt::TokenIssuer;
use crate::auth::password::{Argon2Hasher, Hasher};
use crate::auth::service::AuthService;
use crate::config::AppConfig;
use crate::db;
use crate::users::repo::{PgUserStore, UserStore};
use crate::users::service::UsersService;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub auth: AuthService,
    pub users: UsersService,
    pub cookies: CookiePolicy,
}

impl AppState {
    /// Load config from the environment, connect, migrate and wire services.
    pub async fn init() -> anyhow::Result<Self> {
        let config = Arc::new(AppConfig::from_env()?);
        let pool = db::connect(&config).await?;
        db::migrate(&pool).await?;
        let users = Arc::new(PgUserStore::new(pool)) as Arc<dyn UserStore>;
        Ok(Self::from_parts(config, users, Arc::new(Argon2Hasher)))
    }

    pub fn from_parts(
        config: Arc<AppConfig>,
        users: Arc<dyn UserStore>,
        hasher: Arc<dyn Hasher>,
    ) -> Self {
        let tokens = TokenIssuer::from_config(&config.jwt);
        let cookies = CookiePolicy {
            secure: config.cookie_secure,
        };
        Self {
            auth: AuthService::new(users.clone(), hasher, tokens),
            users: UsersService::new(users),
            cookies,
            config,
        }
    }
}

impl FromRef<AppState> for TokenIssuer {
    fn from_ref(state: &AppState) -> Self {
        state.auth.tokens().clone()
    }
}

#[cfg(test)]
impl AppState {
    /// State backed by an in-memory store.
    pub fn fake(store: Arc<crate::users::memory::MemoryUserStore>) -> Self {
        Self::from_parts(
            Arc::new(crate::config::test_config()),
            store,
            Arc::new(Argon2Hasher),
        )
    }
}
