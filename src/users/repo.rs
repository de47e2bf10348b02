use anyhow::Context;
use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use super::model::{NewUser, User, UserPatch, UserRow};

/// Raised by a store when an insert or update hits the unique email index.
#[derive(Debug, thiserror::Error)]
#[error("email already registered")]
pub struct DuplicateEmail;

/// Persistence of user records.
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> anyhow::Result<Option<User>>;
    async fn find_by_email(&self, email: &str) -> anyhow::Result<Option<User>>;
    async fn create(&self, new_user: NewUser) -> anyhow::Result<User>;

    /// Overwrite (or clear, with `None`) the stored refresh-token hash.
    /// Unknown ids are a no-op.
    async fn set_refresh_token_hash(&self, id: Uuid, hash: Option<&str>) -> anyhow::Result<()>;

    /// Replace `expected` with `new_hash` only if `expected` is still the stored
    /// hash. Returns whether the swap happened.
    async fn rotate_refresh_token_hash(
        &self,
        id: Uuid,
        expected: &str,
        new_hash: &str,
    ) -> anyhow::Result<bool>;

    async fn update(&self, id: Uuid, patch: &UserPatch) -> anyhow::Result<Option<User>>;
    async fn list_active(&self) -> anyhow::Result<Vec<User>>;
    async fn delete(&self, id: Uuid) -> anyhow::Result<bool>;
}

const USER_COLUMNS: &str = "id, email, password_hash, refresh_token_hash, full_name, role, \
                            is_active, created_at, updated_at";

#[derive(Clone)]
pub struct PgUserStore {
    db: PgPool,
}

impl PgUserStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

fn map_unique(e: sqlx::Error) -> anyhow::Error {
    if let sqlx::Error::Database(db) = &e {
        if db.is_unique_violation() {
            return anyhow::Error::new(DuplicateEmail);
        }
    }
    anyhow::Error::new(e).context("write user")
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn find_by_id(&self, id: Uuid) -> anyhow::Result<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.db)
        .await
        .context("find user by id")?;
        row.map(User::try_from).transpose()
    }

    async fn find_by_email(&self, email: &str) -> anyhow::Result<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = $1"
        ))
        .bind(email)
        .fetch_optional(&self.db)
        .await
        .context("find user by email")?;
        row.map(User::try_from).transpose()
    }

    async fn create(&self, new_user: NewUser) -> anyhow::Result<User> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            r#"
            INSERT INTO users (email, password_hash, full_name)
            VALUES ($1, $2, $3)
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(&new_user.email)
        .bind(&new_user.password_hash)
        .bind(&new_user.full_name)
        .fetch_one(&self.db)
        .await
        .map_err(map_unique)?;
        User::try_from(row)
    }

    async fn set_refresh_token_hash(&self, id: Uuid, hash: Option<&str>) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            UPDATE users
               SET refresh_token_hash = $2, updated_at = now()
             WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(hash)
        .execute(&self.db)
        .await
        .context("set refresh token hash")?;
        Ok(())
    }

    async fn rotate_refresh_token_hash(
        &self,
        id: Uuid,
        expected: &str,
        new_hash: &str,
    ) -> anyhow::Result<bool> {
        let res = sqlx::query(
            r#"
            UPDATE users
               SET refresh_token_hash = $3, updated_at = now()
             WHERE id = $1 AND refresh_token_hash = $2
            "#,
        )
        .bind(id)
        .bind(expected)
        .bind(new_hash)
        .execute(&self.db)
        .await
        .context("rotate refresh token hash")?;
        Ok(res.rows_affected() == 1)
    }

    async fn update(&self, id: Uuid, patch: &UserPatch) -> anyhow::Result<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            r#"
            UPDATE users
               SET full_name  = COALESCE($2, full_name),
                   email      = COALESCE($3, email),
                   role       = COALESCE($4, role),
                   is_active  = COALESCE($5, is_active),
                   updated_at = now()
             WHERE id = $1
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(patch.full_name.as_deref())
        .bind(patch.email.as_deref())
        .bind(patch.role.map(|r| r.as_str()))
        .bind(patch.is_active)
        .fetch_optional(&self.db)
        .await
        .map_err(map_unique)?;
        row.map(User::try_from).transpose()
    }

    async fn list_active(&self) -> anyhow::Result<Vec<User>> {
        let rows = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE is_active = true ORDER BY created_at ASC"
        ))
        .fetch_all(&self.db)
        .await
        .context("list active users")?;
        rows.into_iter().map(User::try_from).collect()
    }

    async fn delete(&self, id: Uuid) -> anyhow::Result<bool> {
        let res = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.db)
            .await
            .context("delete user")?;
        Ok(res.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::users::model::Role;

    fn new_user(email: &str) -> NewUser {
        NewUser {
            email: email.into(),
            password_hash: "$argon2id$stub".into(),
            full_name: "Ada".into(),
        }
    }

    // Needs a Postgres server at DATABASE_URL; run with `--ignored`.
    #[sqlx::test]
    #[ignore]
    async fn pg_unique_email_and_rotation(pool: PgPool) {
        let store = PgUserStore::new(pool);
        let user = store.create(new_user("a@x.com")).await.unwrap();
        assert_eq!(user.role, Role::User);
        assert!(user.is_active);

        let err = store.create(new_user("a@x.com")).await.unwrap_err();
        assert!(err.downcast_ref::<DuplicateEmail>().is_some());

        store.set_refresh_token_hash(user.id, Some("h0")).await.unwrap();
        assert!(!store.rotate_refresh_token_hash(user.id, "stale", "h1").await.unwrap());
        assert!(store.rotate_refresh_token_hash(user.id, "h0", "h1").await.unwrap());
        assert!(!store.rotate_refresh_token_hash(user.id, "h0", "h2").await.unwrap());

        let stored = store.find_by_id(user.id).await.unwrap().unwrap();
        assert_eq!(stored.refresh_token_hash.as_deref(), Some("h1"));

        store.set_refresh_token_hash(user.id, None).await.unwrap();
        let stored = store.find_by_email("a@x.com").await.unwrap().unwrap();
        assert!(stored.refresh_token_hash.is_none());
    }

    #[sqlx::test]
    #[ignore]
    async fn pg_patch_keeps_unset_columns(pool: PgPool) {
        let store = PgUserStore::new(pool);
        let user = store.create(new_user("a@x.com")).await.unwrap();
        store.create(new_user("b@x.com")).await.unwrap();

        let patch = UserPatch {
            role: Some(Role::Admin),
            is_active: Some(false),
            ..Default::default()
        };
        let updated = store.update(user.id, &patch).await.unwrap().unwrap();
        assert_eq!(updated.role, Role::Admin);
        assert!(!updated.is_active);
        assert_eq!(updated.email, "a@x.com");
        assert_eq!(updated.full_name, "Ada");

        let taken = UserPatch {
            email: Some("b@x.com".into()),
            ..Default::default()
        };
        let err = store.update(user.id, &taken).await.unwrap_err();
        assert!(err.downcast_ref::<DuplicateEmail>().is_some());

        let active = store.list_active().await.unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].email, "b@x.com");

        assert!(store.delete(user.id).await.unwrap());
        assert!(!store.delete(user.id).await.unwrap());
        assert!(store.update(user.id, &patch).await.unwrap().is_none());
    }
}
