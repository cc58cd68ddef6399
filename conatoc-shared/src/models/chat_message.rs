/// Chat channels and messages
///
/// Chat is a plain append-only table polled by clients. Channel membership is
/// decided by role in [`crate::auth::authorization`]; this module only stores
/// and reads rows.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;

/// Chat channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Channel {
    /// Open to every member
    General,

    /// Researchers, doctors and admins
    Research,

    /// Patients and admins
    Patients,
}

impl Channel {
    /// All channels, in display order
    pub const ALL: [Channel; 3] = [Channel::General, Channel::Research, Channel::Patients];

    /// Converts channel to its stored string
    pub fn as_str(&self) -> &'static str {
        match self {
            Channel::General => "general",
            Channel::Research => "research",
            Channel::Patients => "patients",
        }
    }

    /// Parses a channel name (exact, lowercase)
    pub fn parse(value: &str) -> Option<Channel> {
        Channel::ALL.into_iter().find(|channel| channel.as_str() == value)
    }
}

impl std::fmt::Display for Channel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A chat message joined with its author's name
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct ChatMessage {
    pub id: i64,
    pub channel: Channel,
    pub message: String,
    pub created_by: i64,
    pub author_name: Option<String>,
    pub created_at: DateTime<Utc>,
}

const MESSAGE_SELECT: &str = r#"
    SELECT m.id, m.channel, m.message, m.created_by, u.name AS author_name, m.created_at
    FROM chat_messages m
    LEFT JOIN users u ON u.id = m.created_by
"#;

impl ChatMessage {
    /// Appends a message to a channel
    pub async fn create(
        pool: &SqlitePool,
        channel: Channel,
        message: &str,
        created_by: i64,
    ) -> Result<Self, sqlx::Error> {
        let id = sqlx::query_scalar::<_, i64>(
            r#"
            INSERT INTO chat_messages (channel, message, created_by, created_at)
            VALUES (?1, ?2, ?3, ?4)
            RETURNING id
            "#,
        )
        .bind(channel)
        .bind(message)
        .bind(created_by)
        .bind(Utc::now())
        .fetch_one(pool)
        .await?;

        sqlx::query_as::<_, ChatMessage>(&format!("{MESSAGE_SELECT} WHERE m.id = ?1"))
            .bind(id)
            .fetch_one(pool)
            .await
    }

    /// Lists the latest messages of a channel, newest first
    pub async fn list_latest(
        pool: &SqlitePool,
        channel: Channel,
        limit: i64,
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, ChatMessage>(&format!(
            "{MESSAGE_SELECT} WHERE m.channel = ?1 ORDER BY m.created_at DESC, m.id DESC LIMIT ?2"
        ))
        .bind(channel)
        .bind(limit)
        .fetch_all(pool)
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_parse() {
        for channel in Channel::ALL {
            assert_eq!(Channel::parse(channel.as_str()), Some(channel));
        }
        assert_eq!(Channel::parse("random"), None);
        assert_eq!(Channel::parse("General"), None);
    }
}
