// db/chatdb.rs
use async_trait::async_trait;
use sqlx::Error;
use uuid::Uuid;

use super::db::DBClient;
use crate::models::chatmodel::*;

#[async_trait]
pub trait ChatExt {
    async fn create_or_get_conversation(
        &self,
        user_one_id: Uuid,
        user_two_id: Uuid,
        job_id: Option<Uuid>,
    ) -> Result<Conversation, Error>;

    async fn get_user_conversations(
        &self,
        user_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Conversation>, Error>;

    async fn get_conversation(&self, conversation_id: Uuid) -> Result<Option<Conversation>, Error>;

    async fn send_message(
        &self,
        conversation_id: Uuid,
        sender_id: Uuid,
        content: String,
    ) -> Result<ChatMessage, Error>;

    async fn get_messages(
        &self,
        conversation_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<ChatMessage>, Error>;

    /// Marks the other participant's messages as read; returns how many changed.
    async fn mark_messages_as_read(&self, conversation_id: Uuid, reader_id: Uuid)
        -> Result<u64, Error>;
}

#[async_trait]
impl ChatExt for DBClient {
    async fn create_or_get_conversation(
        &self,
        user_one_id: Uuid,
        user_two_id: Uuid,
        job_id: Option<Uuid>,
    ) -> Result<Conversation, Error> {
        let existing = sqlx::query_as::<_, Conversation>(
            r#"
            SELECT * FROM chat_conversations
            WHERE ((participant_one_id = $1 AND participant_two_id = $2)
                OR (participant_one_id = $2 AND participant_two_id = $1))
            AND job_id IS NOT DISTINCT FROM $3
            LIMIT 1
            "#,
        )
        .bind(user_one_id)
        .bind(user_two_id)
        .bind(job_id)
        .fetch_optional(&self.pool)
        .await?;

        if let Some(conversation) = existing {
            return Ok(conversation);
        }

        sqlx::query_as::<_, Conversation>(
            r#"
            INSERT INTO chat_conversations (participant_one_id, participant_two_id, job_id)
            VALUES ($1, $2, $3)
            RETURNING *
            "#,
        )
        .bind(user_one_id)
        .bind(user_two_id)
        .bind(job_id)
        .fetch_one(&self.pool)
        .await
    }

    async fn get_user_conversations(
        &self,
        user_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Conversation>, Error> {
        sqlx::query_as::<_, Conversation>(
            r#"
            SELECT * FROM chat_conversations
            WHERE participant_one_id = $1 OR participant_two_id = $1
            ORDER BY COALESCE(last_message_at, created_at) DESC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(user_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await
    }

    async fn get_conversation(&self, conversation_id: Uuid) -> Result<Option<Conversation>, Error> {
        sqlx::query_as::<_, Conversation>(r#"SELECT * FROM chat_conversations WHERE id = $1"#)
            .bind(conversation_id)
            .fetch_optional(&self.pool)
            .await
    }

    async fn send_message(
        &self,
        conversation_id: Uuid,
        sender_id: Uuid,
        content: String,
    ) -> Result<ChatMessage, Error> {
        let mut tx = self.pool.begin().await?;

        let message = sqlx::query_as::<_, ChatMessage>(
            r#"
            INSERT INTO chat_messages (conversation_id, sender_id, content)
            VALUES ($1, $2, $3)
            RETURNING *
            "#,
        )
        .bind(conversation_id)
        .bind(sender_id)
        .bind(content)
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query(r#"UPDATE chat_conversations SET last_message_at = NOW() WHERE id = $1"#)
            .bind(conversation_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        Ok(message)
    }

    async fn get_messages(
        &self,
        conversation_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<ChatMessage>, Error> {
        sqlx::query_as::<_, ChatMessage>(
            r#"
            SELECT * FROM chat_messages
            WHERE conversation_id = $1
            ORDER BY created_at ASC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(conversation_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await
    }

    async fn mark_messages_as_read(
        &self,
        conversation_id: Uuid,
        reader_id: Uuid,
    ) -> Result<u64, Error> {
        let result = sqlx::query(
            r#"
            UPDATE chat_messages SET is_read = TRUE
            WHERE conversation_id = $1 AND sender_id <> $2 AND is_read = FALSE
            "#,
        )
        .bind(conversation_id)
        .bind(reader_id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }
}
