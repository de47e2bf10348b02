use std::collections::HashMap;

use async_trait::async_trait;
use time::OffsetDateTime;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::model::{NewUser, Role, User, UserPatch};
use super::repo::{DuplicateEmail, UserStore};

/// In-process user store used by the test suites.
#[derive(Default)]
pub struct MemoryUserStore {
    users: RwLock<HashMap<Uuid, User>>,
}

impl MemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Test hook: change a role without going through the admin API.
    pub async fn set_role(&self, id: Uuid, role: Role) {
        if let Some(u) = self.users.write().await.get_mut(&id) {
            u.role = role;
        }
    }
}

fn email_taken(users: &HashMap<Uuid, User>, email: &str, except: Option<Uuid>) -> bool {
    users
        .values()
        .any(|u| u.email == email && Some(u.id) != except)
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn find_by_id(&self, id: Uuid) -> anyhow::Result<Option<User>> {
        Ok(self.users.read().await.get(&id).cloned())
    }

    async fn find_by_email(&self, email: &str) -> anyhow::Result<Option<User>> {
        Ok(self
            .users
            .read()
            .await
            .values()
            .find(|u| u.email == email)
            .cloned())
    }

    async fn create(&self, new_user: NewUser) -> anyhow::Result<User> {
        let mut users = self.users.write().await;
        if email_taken(&users, &new_user.email, None) {
            return Err(DuplicateEmail.into());
        }
        let now = OffsetDateTime::now_utc();
        let user = User {
            id: Uuid::new_v4(),
            email: new_user.email,
            password_hash: new_user.password_hash,
            refresh_token_hash: None,
            full_name: new_user.full_name,
            role: Role::User,
            is_active: true,
            created_at: now,
            updated_at: now,
        };
        users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn set_refresh_token_hash(&self, id: Uuid, hash: Option<&str>) -> anyhow::Result<()> {
        if let Some(u) = self.users.write().await.get_mut(&id) {
            u.refresh_token_hash = hash.map(String::from);
            u.updated_at = OffsetDateTime::now_utc();
        }
        Ok(())
    }

    async fn rotate_refresh_token_hash(
        &self,
        id: Uuid,
        expected: &str,
        new_hash: &str,
    ) -> anyhow::Result<bool> {
        let mut users = self.users.write().await;
        match users.get_mut(&id) {
            Some(u) if u.refresh_token_hash.as_deref() == Some(expected) => {
                u.refresh_token_hash = Some(new_hash.to_string());
                u.updated_at = OffsetDateTime::now_utc();
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn update(&self, id: Uuid, patch: &UserPatch) -> anyhow::Result<Option<User>> {
        let mut users = self.users.write().await;
        if let Some(email) = &patch.email {
            if email_taken(&users, email, Some(id)) {
                return Err(DuplicateEmail.into());
            }
        }
        let Some(u) = users.get_mut(&id) else {
            return Ok(None);
        };
        if let Some(name) = &patch.full_name {
            u.full_name = name.clone();
        }
        if let Some(email) = &patch.email {
            u.email = email.clone();
        }
        if let Some(role) = patch.role {
            u.role = role;
        }
        if let Some(active) = patch.is_active {
            u.is_active = active;
        }
        u.updated_at = OffsetDateTime::now_utc();
        Ok(Some(u.clone()))
    }

    async fn list_active(&self) -> anyhow::Result<Vec<User>> {
        let mut out: Vec<User> = self
            .users
            .read()
            .await
            .values()
            .filter(|u| u.is_active)
            .cloned()
            .collect();
        out.sort_by_key(|u| u.created_at);
        Ok(out)
    }

    async fn delete(&self, id: Uuid) -> anyhow::Result<bool> {
        Ok(self.users.write().await.remove(&id).is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_user(email: &str) -> NewUser {
        NewUser {
            email: email.into(),
            password_hash: "hash".into(),
            full_name: "Test".into(),
        }
    }

    #[tokio::test]
    async fn create_rejects_duplicate_email() {
        let store = MemoryUserStore::new();
        store.create(new_user("a@x.com")).await.unwrap();
        let err = store.create(new_user("a@x.com")).await.unwrap_err();
        assert!(err.downcast_ref::<DuplicateEmail>().is_some());
    }

    #[tokio::test]
    async fn rotate_only_swaps_expected_hash() {
        let store = MemoryUserStore::new();
        let user = store.create(new_user("a@x.com")).await.unwrap();
        store.set_refresh_token_hash(user.id, Some("h0")).await.unwrap();

        assert!(!store.rotate_refresh_token_hash(user.id, "stale", "h1").await.unwrap());
        assert!(store.rotate_refresh_token_hash(user.id, "h0", "h1").await.unwrap());
        assert!(!store.rotate_refresh_token_hash(user.id, "h0", "h2").await.unwrap());

        let stored = store.find_by_id(user.id).await.unwrap().unwrap();
        assert_eq!(stored.refresh_token_hash.as_deref(), Some("h1"));
    }

    #[tokio::test]
    async fn update_to_taken_email_conflicts() {
        let store = MemoryUserStore::new();
        store.create(new_user("a@x.com")).await.unwrap();
        let b = store.create(new_user("b@x.com")).await.unwrap();
        let patch = UserPatch {
            email: Some("a@x.com".into()),
            ..Default::default()
        };
        let err = store.update(b.id, &patch).await.unwrap_err();
        assert!(err.downcast_ref::<DuplicateEmail>().is_some());
    }
}
