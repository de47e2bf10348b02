use std::sync::Arc;

use tracing::info;
use uuid::Uuid;

use super::model::{PublicUser, UserPatch};
use super::repo::UserStore;
use crate::error::AppError;

/// Profile and admin operations over the user store.
#[derive(Clone)]
pub struct UsersService {
    users: Arc<dyn UserStore>,
}

impl UsersService {
    pub fn new(users: Arc<dyn UserStore>) -> Self {
        Self { users }
    }

    pub async fn get_profile(&self, user_id: Uuid) -> Result<PublicUser, AppError> {
        self.get_user(user_id).await
    }

    pub async fn update_profile(
        &self,
        user_id: Uuid,
        patch: UserPatch,
    ) -> Result<PublicUser, AppError> {
        let patch = UserPatch {
            role: None,
            is_active: None,
            ..patch
        };
        self.update_user(user_id, patch).await
    }

    pub async fn list_active(&self) -> Result<Vec<PublicUser>, AppError> {
        let users = self.users.list_active().await?;
        Ok(users.into_iter().map(PublicUser::from).collect())
    }

    pub async fn get_user(&self, user_id: Uuid) -> Result<PublicUser, AppError> {
        self.users
            .find_by_id(user_id)
            .await?
            .map(PublicUser::from)
            .ok_or_else(|| AppError::not_found("User not found"))
    }

    pub async fn update_user(
        &self,
        user_id: Uuid,
        patch: UserPatch,
    ) -> Result<PublicUser, AppError> {
        let user = self
            .users
            .update(user_id, &patch)
            .await?
            .ok_or_else(|| AppError::not_found("User not found"))?;
        info!(%user_id, "user updated");
        Ok(user.into())
    }

    pub async fn delete_user(&self, user_id: Uuid) -> Result<&'static str, AppError> {
        if !self.users.delete(user_id).await? {
            return Err(AppError::not_found("User not found"));
        }
        info!(%user_id, "user deleted");
        Ok("User deleted successfully")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::users::memory::MemoryUserStore;
    use crate::users::model::{NewUser, Role};

    async fn seed(store: &MemoryUserStore, email: &str) -> Uuid {
        store
            .create(NewUser {
                email: email.into(),
                password_hash: "hash".into(),
                full_name: "Seed".into(),
            })
            .await
            .unwrap()
            .id
    }

    #[tokio::test]
    async fn profile_update_ignores_privileged_fields() {
        let store = Arc::new(MemoryUserStore::new());
        let id = seed(&store, "a@x.com").await;
        let svc = UsersService::new(store.clone());

        let patch = UserPatch {
            full_name: Some("New Name".into()),
            role: Some(Role::Admin),
            is_active: Some(false),
            ..Default::default()
        };
        let user = svc.update_profile(id, patch).await.unwrap();
        assert_eq!(user.full_name, "New Name");
        assert_eq!(user.role, Role::User);
        assert!(user.is_active);
    }

    #[tokio::test]
    async fn list_only_returns_active_users() {
        let store = Arc::new(MemoryUserStore::new());
        let a = seed(&store, "a@x.com").await;
        let b = seed(&store, "b@x.com").await;
        let svc = UsersService::new(store.clone());

        svc.update_user(
            b,
            UserPatch {
                is_active: Some(false),
                ..Default::default()
            },
        )
        .await
        .unwrap();

        let users = svc.list_active().await.unwrap();
        assert_eq!(users.len(), 1);
        assert_eq!(users[0].id, a);
    }

    #[tokio::test]
    async fn duplicate_email_update_conflicts() {
        let store = Arc::new(MemoryUserStore::new());
        seed(&store, "a@x.com").await;
        let b = seed(&store, "b@x.com").await;
        let svc = UsersService::new(store.clone());

        let err = svc
            .update_profile(
                b,
                UserPatch {
                    email: Some("a@x.com".into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[tokio::test]
    async fn missing_users_are_not_found() {
        let svc = UsersService::new(Arc::new(MemoryUserStore::new()));
        let id = Uuid::new_v4();
        assert!(matches!(svc.get_user(id).await, Err(AppError::NotFound(_))));
        assert!(matches!(svc.delete_user(id).await, Err(AppError::NotFound(_))));
        assert!(matches!(
            svc.update_user(
                id,
                UserPatch {
                    full_name: Some("Nobody".into()),
                    ..Default::default()
                }
            )
            .await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn delete_removes_user() {
        let store = Arc::new(MemoryUserStore::new());
        let id = seed(&store, "a@x.com").await;
        let svc = UsersService::new(store.clone());
        assert_eq!(svc.delete_user(id).await.unwrap(), "User deleted successfully");
        assert!(store.find_by_id(id).await.unwrap().is_none());
    }
}
