use chrono::{DateTime, Duration, Utc};

use super::Database;
use crate::models::{ConversationStats, ConversationTurn, TurnRole, UserContextStats};
use crate::Result;

impl Database {
    /// Append one turn to a user's conversation.
    ///
    /// The user row is created on first contact; the turn timestamp is
    /// assigned by the database so ordering follows insertion order.
    pub async fn append_turn(
        &self,
        user_id: &str,
        platform: &str,
        role: TurnRole,
        message: &str,
    ) -> Result<ConversationTurn> {
        self.get_or_create_user(user_id, platform).await?;

        let turn = sqlx::query_as::<_, ConversationTurn>(
            r"
            INSERT INTO conversations (user_id, platform, role, message)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            ",
        )
        .bind(user_id)
        .bind(platform)
        .bind(role.as_str())
        .bind(message)
        .fetch_one(&self.pool)
        .await?;

        Ok(turn)
    }

    /// Turns inside the lookback window, oldest first
    pub async fn recent_window(
        &self,
        user_id: &str,
        platform: &str,
        lookback_hours: i64,
    ) -> Result<Vec<ConversationTurn>> {
        let cutoff = Utc::now() - Duration::hours(lookback_hours);

        let turns = sqlx::query_as::<_, ConversationTurn>(
            r#"
            SELECT * FROM conversations
            WHERE user_id = $1 AND platform = $2 AND "timestamp" >= $3
            ORDER BY "timestamp" ASC, id ASC
            "#,
        )
        .bind(user_id)
        .bind(platform)
        .bind(cutoff)
        .fetch_all(&self.pool)
        .await?;

        Ok(turns)
    }

    /// The most recent `max_turns` turns in chronological order.
    ///
    /// Fetched newest-first with a LIMIT, then reversed, so the cap applies
    /// to the newest turns rather than the oldest.
    pub async fn bounded_history(
        &self,
        user_id: &str,
        platform: &str,
        max_turns: usize,
    ) -> Result<Vec<ConversationTurn>> {
        let mut turns = sqlx::query_as::<_, ConversationTurn>(
            r#"
            SELECT * FROM conversations
            WHERE user_id = $1 AND platform = $2
            ORDER BY "timestamp" DESC, id DESC
            LIMIT $3
            "#,
        )
        .bind(user_id)
        .bind(platform)
        .bind(max_turns as i64)
        .fetch_all(&self.pool)
        .await?;

        turns.reverse();
        Ok(turns)
    }

    /// History for prompt assembly: windowed AND capped, chronological.
    ///
    /// Both bounds apply so stale turns age out while a burst of recent
    /// messages cannot blow up the prompt.
    pub async fn history_for_prompt(
        &self,
        user_id: &str,
        platform: &str,
        lookback_hours: i64,
        max_turns: usize,
    ) -> Result<Vec<ConversationTurn>> {
        let cutoff = Utc::now() - Duration::hours(lookback_hours);

        let mut turns = sqlx::query_as::<_, ConversationTurn>(
            r#"
            SELECT * FROM conversations
            WHERE user_id = $1 AND platform = $2 AND "timestamp" >= $3
            ORDER BY "timestamp" DESC, id DESC
            LIMIT $4
            "#,
        )
        .bind(user_id)
        .bind(platform)
        .bind(cutoff)
        .bind(max_turns as i64)
        .fetch_all(&self.pool)
        .await?;

        turns.reverse();
        Ok(turns)
    }

    /// Delete every turn for a (user_id, platform) pair.
    /// Clearing an unknown pair deletes nothing and is not an error.
    pub async fn clear_history(&self, user_id: &str, platform: &str) -> Result<u64> {
        let deleted = sqlx::query("DELETE FROM conversations WHERE user_id = $1 AND platform = $2")
            .bind(user_id)
            .bind(platform)
            .execute(&self.pool)
            .await?
            .rows_affected();

        tracing::info!(
            "Cleared {} conversation turns for {} on {}",
            deleted,
            user_id,
            platform
        );
        Ok(deleted)
    }

    /// Retention sweep: delete turns older than the cutoff timestamp
    pub async fn purge_older_than(&self, cutoff: DateTime<Utc>) -> Result<u64> {
        let deleted = sqlx::query(r#"DELETE FROM conversations WHERE "timestamp" < $1"#)
            .bind(cutoff)
            .execute(&self.pool)
            .await?
            .rows_affected();

        tracing::info!("Retention purge removed {} turns older than {}", deleted, cutoff);
        Ok(deleted)
    }

    /// Conversation statistics for one user; `None` when the pair is unknown
    pub async fn user_stats(
        &self,
        user_id: &str,
        platform: &str,
    ) -> Result<Option<UserContextStats>> {
        let Some(user) = self.get_user(user_id, platform).await? else {
            return Ok(None);
        };

        let (message_count, last_seen): (i64, Option<DateTime<Utc>>) = sqlx::query_as(
            r#"
            SELECT COUNT(*), MAX("timestamp")
            FROM conversations
            WHERE user_id = $1 AND platform = $2
            "#,
        )
        .bind(user_id)
        .bind(platform)
        .fetch_one(&self.pool)
        .await?;

        Ok(Some(UserContextStats {
            user_id: user.user_id,
            platform: user.platform,
            message_count,
            first_seen: user.created_at,
            last_seen,
        }))
    }

    /// Admin full reset: drop all conversation turns, keep user identities.
    /// Returns the turn counts before and after.
    pub async fn reset_all_conversations(&self) -> Result<(i64, i64)> {
        let before = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM conversations")
            .fetch_one(&self.pool)
            .await?;

        sqlx::query("DELETE FROM conversations")
            .execute(&self.pool)
            .await?;

        let after = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM conversations")
            .fetch_one(&self.pool)
            .await?;

        tracing::warn!("Full conversation reset: {} turns -> {}", before, after);
        Ok((before, after))
    }

    /// Store-wide totals
    pub async fn conversation_stats(&self) -> Result<ConversationStats> {
        let total_users = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM users")
            .fetch_one(&self.pool)
            .await?;

        let total_turns = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM conversations")
            .fetch_one(&self.pool)
            .await?;

        Ok(ConversationStats {
            total_users,
            total_turns,
        })
    }
}
