use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Role attached to a persisted conversation turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TurnRole {
    User,
    Assistant,
    System,
}

impl TurnRole {
    pub fn as_str(self) -> &'static str {
        match self {
            TurnRole::User => "user",
            TurnRole::Assistant => "assistant",
            TurnRole::System => "system",
        }
    }
}

impl From<&str> for TurnRole {
    fn from(value: &str) -> Self {
        match value {
            "assistant" => TurnRole::Assistant,
            "system" => TurnRole::System,
            _ => TurnRole::User,
        }
    }
}

/// A chat user, identified by the (user_id, platform) pair
///
/// The same external identifier on two platforms is two distinct users.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ChatUser {
    pub id: i64,
    pub user_id: String,
    pub platform: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One persisted conversation turn
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ConversationTurn {
    pub id: i64,
    pub user_id: String,
    pub platform: String,
    pub role: String,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

impl ConversationTurn {
    pub fn role(&self) -> TurnRole {
        TurnRole::from(self.role.as_str())
    }
}

/// Conversation statistics for a single user
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserContextStats {
    pub user_id: String,
    pub platform: String,
    pub message_count: i64,
    pub first_seen: DateTime<Utc>,
    pub last_seen: Option<DateTime<Utc>>,
}

/// Store-wide conversation totals
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationStats {
    pub total_users: i64,
    pub total_turns: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_turn_role_round_trip() {
        assert_eq!(TurnRole::from("user"), TurnRole::User);
        assert_eq!(TurnRole::from("assistant"), TurnRole::Assistant);
        assert_eq!(TurnRole::from("system"), TurnRole::System);
        assert_eq!(TurnRole::Assistant.as_str(), "assistant");
    }

    #[test]
    fn test_unknown_role_defaults_to_user() {
        assert_eq!(TurnRole::from("bot"), TurnRole::User);
        assert_eq!(TurnRole::from(""), TurnRole::User);
    }
}
