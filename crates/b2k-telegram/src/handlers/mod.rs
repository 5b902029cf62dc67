//! Telegram update handlers.
//!
//! Each handler converts the teloxide update into a core `IncomingUpdate` and
//! hands it to the dispatcher on its own task, so a slow conversion never holds
//! up the next update.

use std::sync::Arc;

use teloxide::{
    prelude::*,
    types::{CallbackQuery, Message, UpdateKind},
};
use tracing::error;

use b2k_core::{
    domain::{ChatId, MessageId, MessageRef},
    messaging::types::{self as core_types, IncomingUpdate, RepliedMessage},
};

use crate::router::AppState;

pub async fn handle_message(msg: Message, state: Arc<AppState>) -> ResponseResult<()> {
    spawn_dispatch(state, incoming_from_message(&msg));
    Ok(())
}

pub async fn handle_callback(q: CallbackQuery, state: Arc<AppState>) -> ResponseResult<()> {
    spawn_dispatch(state, incoming_from_callback(&q));
    Ok(())
}

pub async fn handle_unsupported(update: Update, state: Arc<AppState>) -> ResponseResult<()> {
    spawn_dispatch(
        state,
        IncomingUpdate::Unsupported {
            kind: update_kind_name(&update.kind).to_string(),
        },
    );
    Ok(())
}

fn spawn_dispatch(state: Arc<AppState>, update: IncomingUpdate) {
    let task = tokio::spawn(async move {
        state.dispatcher.dispatch(update).await;
    });
    tokio::spawn(async move {
        if let Err(e) = task.await {
            error!(error = %e, "update task crashed");
        }
    });
}

fn document_message(msg: &Message) -> Option<core_types::DocumentMessage> {
    let doc = msg.document()?;
    Some(core_types::DocumentMessage {
        chat_id: ChatId(msg.chat.id.0),
        message_id: MessageId(msg.id.0),
        file_id: doc.file.id.clone(),
        file_name: doc.file_name.clone(),
    })
}

pub(crate) fn incoming_from_message(msg: &Message) -> IncomingUpdate {
    match document_message(msg) {
        Some(doc) => IncomingUpdate::Document(doc),
        None => IncomingUpdate::Other(core_types::OtherMessage {
            chat_id: ChatId(msg.chat.id.0),
            message_id: MessageId(msg.id.0),
            text: msg.text().map(|s| s.to_string()),
        }),
    }
}

/// The prompt carrying the keyboard replies to the user's document; that reply
/// reference is how the choice finds its way back to the book.
pub(crate) fn incoming_from_callback(q: &CallbackQuery) -> IncomingUpdate {
    let prompt = q.message.as_ref();
    let reply_to = prompt
        .and_then(|m| m.reply_to_message())
        .map(|original| match document_message(original) {
            Some(doc) => RepliedMessage::Document(doc),
            None => RepliedMessage::Other {
                message_id: MessageId(original.id.0),
            },
        });

    IncomingUpdate::Callback(core_types::CallbackQuery {
        callback_id: q.id.clone(),
        data: q.data.clone().unwrap_or_default(),
        prompt: prompt.map(|m| MessageRef {
            chat_id: ChatId(m.chat.id.0),
            message_id: MessageId(m.id.0),
        }),
        reply_to,
    })
}

fn update_kind_name(kind: &UpdateKind) -> &'static str {
    match kind {
        UpdateKind::Message(_) => "message",
        UpdateKind::EditedMessage(_) => "edited_message",
        UpdateKind::ChannelPost(_) => "channel_post",
        UpdateKind::EditedChannelPost(_) => "edited_channel_post",
        UpdateKind::InlineQuery(_) => "inline_query",
        UpdateKind::CallbackQuery(_) => "callback_query",
        UpdateKind::Poll(_) => "poll",
        UpdateKind::PollAnswer(_) => "poll_answer",
        _ => "other",
    }
}
