// db/userdb.rs
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::db::DBClient;
use crate::models::usermodel::{Session, User, UserRole};

#[async_trait]
pub trait UserExt {
    async fn get_user(
        &self,
        user_id: Option<Uuid>,
        phone: Option<&str>,
        email: Option<&str>,
    ) -> Result<Option<User>, sqlx::Error>;

    async fn get_users(&self, page: u32, limit: usize) -> Result<Vec<User>, sqlx::Error>;

    async fn get_user_count(&self) -> Result<i64, sqlx::Error>;

    async fn save_user(
        &self,
        name: String,
        phone: String,
        email: Option<String>,
        password: String,
        role: UserRole,
    ) -> Result<User, sqlx::Error>;

    /// Persists the editable profile fields of `user`.
    async fn save_profile(&self, user: &User) -> Result<User, sqlx::Error>;

    async fn mark_phone_verified(&self, user_id: Uuid) -> Result<User, sqlx::Error>;

    async fn mark_email_verified(&self, email: &str) -> Result<Option<User>, sqlx::Error>;

    async fn set_pan_verified(&self, user_id: Uuid, pan: &str) -> Result<User, sqlx::Error>;

    async fn set_gstin_verified(&self, user_id: Uuid, gstin: &str) -> Result<User, sqlx::Error>;

    async fn create_session(
        &self,
        user_id: Uuid,
        token_hash: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<Session, sqlx::Error>;

    async fn get_session_by_hash(&self, token_hash: &str) -> Result<Option<Session>, sqlx::Error>;

    async fn delete_session(&self, session_id: Uuid) -> Result<(), sqlx::Error>;

    async fn delete_user_sessions(
        &self,
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        user_id: Uuid,
    ) -> Result<(), sqlx::Error>;

    async fn delete_expired_sessions(&self) -> Result<u64, sqlx::Error>;
}

#[async_trait]
impl UserExt for DBClient {
    async fn get_user(
        &self,
        user_id: Option<Uuid>,
        phone: Option<&str>,
        email: Option<&str>,
    ) -> Result<Option<User>, sqlx::Error> {
        let mut user: Option<User> = None;

        if let Some(user_id) = user_id {
            user = sqlx::query_as::<_, User>(r#"SELECT * FROM users WHERE id = $1"#)
                .bind(user_id)
                .fetch_optional(&self.pool)
                .await?;
        } else if let Some(phone) = phone {
            user = sqlx::query_as::<_, User>(r#"SELECT * FROM users WHERE phone = $1"#)
                .bind(phone)
                .fetch_optional(&self.pool)
                .await?;
        } else if let Some(email) = email {
            user = sqlx::query_as::<_, User>(r#"SELECT * FROM users WHERE LOWER(email) = LOWER($1)"#)
                .bind(email)
                .fetch_optional(&self.pool)
                .await?;
        }

        Ok(user)
    }

    async fn get_users(&self, page: u32, limit: usize) -> Result<Vec<User>, sqlx::Error> {
        let offset = (page.max(1) - 1) as i64 * limit as i64;

        sqlx::query_as::<_, User>(
            r#"SELECT * FROM users ORDER BY created_at DESC LIMIT $1 OFFSET $2"#,
        )
        .bind(limit as i64)
        .bind(offset)
        .fetch_all(&self.pool)
        .await
    }

    async fn get_user_count(&self) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar::<_, i64>(r#"SELECT COUNT(*) FROM users"#)
            .fetch_one(&self.pool)
            .await
    }

    async fn save_user(
        &self,
        name: String,
        phone: String,
        email: Option<String>,
        password: String,
        role: UserRole,
    ) -> Result<User, sqlx::Error> {
        sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (name, phone, email, password, role)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#,
        )
        .bind(name)
        .bind(phone)
        .bind(email)
        .bind(password)
        .bind(role)
        .fetch_one(&self.pool)
        .await
    }

    async fn save_profile(&self, user: &User) -> Result<User, sqlx::Error> {
        sqlx::query_as::<_, User>(
            r#"
            UPDATE users
            SET bio = $2, skills = $3, city = $4, pincode = $5,
                latitude = $6, longitude = $7, profile_complete = $8,
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(user.id)
        .bind(&user.bio)
        .bind(&user.skills)
        .bind(&user.city)
        .bind(&user.pincode)
        .bind(user.latitude)
        .bind(user.longitude)
        .bind(user.profile_complete)
        .fetch_one(&self.pool)
        .await
    }

    async fn mark_phone_verified(&self, user_id: Uuid) -> Result<User, sqlx::Error> {
        sqlx::query_as::<_, User>(
            r#"UPDATE users SET phone_verified = TRUE, updated_at = NOW() WHERE id = $1 RETURNING *"#,
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await
    }

    async fn mark_email_verified(&self, email: &str) -> Result<Option<User>, sqlx::Error> {
        sqlx::query_as::<_, User>(
            r#"
            UPDATE users SET email_verified = TRUE, updated_at = NOW()
            WHERE LOWER(email) = LOWER($1)
            RETURNING *
            "#,
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await
    }

    async fn set_pan_verified(&self, user_id: Uuid, pan: &str) -> Result<User, sqlx::Error> {
        sqlx::query_as::<_, User>(
            r#"
            UPDATE users SET pan_number = $2, pan_verified = TRUE, updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(user_id)
        .bind(pan)
        .fetch_one(&self.pool)
        .await
    }

    async fn set_gstin_verified(&self, user_id: Uuid, gstin: &str) -> Result<User, sqlx::Error> {
        sqlx::query_as::<_, User>(
            r#"
            UPDATE users SET gstin = $2, gstin_verified = TRUE, updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(user_id)
        .bind(gstin)
        .fetch_one(&self.pool)
        .await
    }

    async fn create_session(
        &self,
        user_id: Uuid,
        token_hash: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<Session, sqlx::Error> {
        sqlx::query_as::<_, Session>(
            r#"
            INSERT INTO sessions (user_id, token_hash, expires_at)
            VALUES ($1, $2, $3)
            RETURNING id, user_id, token_hash, expires_at, created_at
            "#,
        )
        .bind(user_id)
        .bind(token_hash)
        .bind(expires_at)
        .fetch_one(&self.pool)
        .await
    }

    async fn get_session_by_hash(&self, token_hash: &str) -> Result<Option<Session>, sqlx::Error> {
        sqlx::query_as::<_, Session>(
            r#"
            SELECT id, user_id, token_hash, expires_at, created_at
            FROM sessions WHERE token_hash = $1
            "#,
        )
        .bind(token_hash)
        .fetch_optional(&self.pool)
        .await
    }

    async fn delete_session(&self, session_id: Uuid) -> Result<(), sqlx::Error> {
        sqlx::query(r#"DELETE FROM sessions WHERE id = $1"#)
            .bind(session_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn delete_user_sessions(
        &self,
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        user_id: Uuid,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(r#"DELETE FROM sessions WHERE user_id = $1"#)
            .bind(user_id)
            .execute(&mut **tx)
            .await?;
        Ok(())
    }

    async fn delete_expired_sessions(&self) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(r#"DELETE FROM sessions WHERE expires_at <= NOW()"#)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}
