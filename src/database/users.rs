use super::Database;
use crate::models::ChatUser;
use crate::ChatRagError;
use crate::Result;

impl Database {
    /// Fetch the user for a (user_id, platform) pair, creating it on first
    /// contact. Idempotent under concurrent first messages.
    pub async fn get_or_create_user(&self, user_id: &str, platform: &str) -> Result<ChatUser> {
        let user = sqlx::query_as::<_, ChatUser>(
            r"
            INSERT INTO users (user_id, platform)
            VALUES ($1, $2)
            ON CONFLICT (user_id, platform) DO UPDATE SET updated_at = NOW()
            RETURNING *
            ",
        )
        .bind(user_id)
        .bind(platform)
        .fetch_one(&self.pool)
        .await?;

        Ok(user)
    }

    /// Look up a user without creating it
    pub async fn get_user(&self, user_id: &str, platform: &str) -> Result<Option<ChatUser>> {
        let user = sqlx::query_as::<_, ChatUser>(
            "SELECT * FROM users WHERE user_id = $1 AND platform = $2",
        )
        .bind(user_id)
        .bind(platform)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    /// List all known users, most recently seen first
    pub async fn list_users(&self) -> Result<Vec<ChatUser>> {
        let users = sqlx::query_as::<_, ChatUser>("SELECT * FROM users ORDER BY updated_at DESC")
            .fetch_all(&self.pool)
            .await?;

        Ok(users)
    }

    /// Delete a user and everything it owns.
    ///
    /// The cascade is explicit: conversation turns go first, then the user
    /// row, in one transaction. Returns the number of turns removed.
    pub async fn delete_user(&self, user_id: &str, platform: &str) -> Result<u64> {
        let mut tx = self.pool.begin().await?;

        let turns_deleted =
            sqlx::query("DELETE FROM conversations WHERE user_id = $1 AND platform = $2")
                .bind(user_id)
                .bind(platform)
                .execute(&mut *tx)
                .await?
                .rows_affected();

        let users_deleted = sqlx::query("DELETE FROM users WHERE user_id = $1 AND platform = $2")
            .bind(user_id)
            .bind(platform)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        if users_deleted == 0 {
            tx.rollback().await?;
            return Err(ChatRagError::UserNotFound(
                user_id.to_string(),
                platform.to_string(),
            ));
        }

        tx.commit().await?;

        tracing::info!(
            "Deleted user {} on {} with {} conversation turns",
            user_id,
            platform,
            turns_deleted
        );
        Ok(turns_deleted)
    }
}
