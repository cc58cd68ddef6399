/// Chat endpoints
///
/// - `GET  /v1/chat/channels` - Channels the caller may read
/// - `GET  /v1/chat/:channel` - Latest messages, newest first
/// - `POST /v1/chat/:channel` - Send a message
///
/// Anonymous callers are redirected to login before the channel name is
/// looked at. Unknown channel names are 404s; known channels the caller's
/// role may not use are 403s.

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use conatoc_shared::{
    auth::authorization::Actor,
    content::chat,
    models::chat_message::{Channel, ChatMessage},
};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct SendMessageRequest {
    #[serde(default)]
    pub message: String,
}

fn channel(actor: &Actor, name: &str) -> ApiResult<Channel> {
    actor.require_member()?;

    Channel::parse(name).ok_or_else(|| ApiError::NotFound(format!("Unknown channel: {}", name)))
}

pub async fn list_channels(Extension(actor): Extension<Actor>) -> ApiResult<Json<Vec<Channel>>> {
    Ok(Json(chat::list_channels(&actor)?))
}

pub async fn read_channel(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(name): Path<String>,
) -> ApiResult<Json<Vec<ChatMessage>>> {
    let channel = channel(&actor, &name)?;
    Ok(Json(chat::read_channel(&state.db, &actor, channel).await?))
}

pub async fn send_message(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(name): Path<String>,
    Json(req): Json<SendMessageRequest>,
) -> ApiResult<(StatusCode, Json<ChatMessage>)> {
    let channel = channel(&actor, &name)?;
    let message = chat::send_message(&state.db, &actor, channel, &req.message).await?;

    Ok((StatusCode::CREATED, Json(message)))
}
