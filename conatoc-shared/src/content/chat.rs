/// Channel chat
///
/// Clients poll [`read_channel`]; there is no push.

use sqlx::SqlitePool;
use tracing::debug;

use super::required_text;
use crate::auth::authorization::{accessible_channels, authorize, Action, Actor};
use crate::error::PortalResult;
use crate::models::chat_message::{Channel, ChatMessage};

/// Number of messages returned by [`read_channel`]
pub const CHAT_HISTORY_LIMIT: i64 = 60;

/// Channels the actor may use, in display order
///
/// # Errors
///
/// `LoginRequired` for anonymous actors.
pub fn list_channels(actor: &Actor) -> PortalResult<Vec<Channel>> {
    actor.require_member()?;
    Ok(accessible_channels(actor))
}

/// Posts a message to a channel
///
/// # Errors
///
/// - `LoginRequired` for anonymous actors
/// - `Unauthorized` when the actor's role may not use the channel
/// - `MissingField("message")` for blank text
pub async fn send_message(
    pool: &SqlitePool,
    actor: &Actor,
    channel: Channel,
    text: &str,
) -> PortalResult<ChatMessage> {
    authorize(actor, Action::PostChannel(channel))?;
    let (user_id, _) = actor.require_member()?;

    let text = required_text(text, "message")?;
    let message = ChatMessage::create(pool, channel, &text, user_id).await?;

    debug!(message_id = message.id, %channel, user_id, "Chat message sent");
    Ok(message)
}

/// Latest messages of a channel, newest first, with author names
///
/// # Errors
///
/// - `LoginRequired` for anonymous actors
/// - `Forbidden` when the actor's role may not use the channel
pub async fn read_channel(
    pool: &SqlitePool,
    actor: &Actor,
    channel: Channel,
) -> PortalResult<Vec<ChatMessage>> {
    authorize(actor, Action::ReadChannel(channel))?;

    Ok(ChatMessage::list_latest(pool, channel, CHAT_HISTORY_LIMIT).await?)
}
