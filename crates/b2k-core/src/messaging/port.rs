use std::path::Path;

use async_trait::async_trait;

use crate::{
    domain::{ChatId, MessageId, MessageRef},
    messaging::types::{ChatAction, InlineKeyboard},
    Result,
};

/// Outbound side of the chat transport.
///
/// Text is Telegram HTML. Implementations must be safe to share across
/// concurrently running requests.
#[async_trait]
pub trait MessagingPort: Send + Sync {
    async fn send_html(
        &self,
        chat_id: ChatId,
        html: &str,
        reply_to: Option<MessageId>,
    ) -> Result<MessageRef>;

    async fn send_inline_keyboard(
        &self,
        chat_id: ChatId,
        html: &str,
        keyboard: InlineKeyboard,
        reply_to: Option<MessageId>,
    ) -> Result<MessageRef>;

    async fn delete_message(&self, msg: MessageRef) -> Result<()>;

    async fn send_chat_action(&self, chat_id: ChatId, action: ChatAction) -> Result<()>;

    /// Upload a local file as a document.
    async fn send_document(
        &self,
        chat_id: ChatId,
        path: &Path,
        file_name: &str,
        caption_html: &str,
    ) -> Result<MessageRef>;

    /// Fetch a document's bytes by its transport handle into `dest`.
    async fn download_file(&self, file_id: &str, dest: &Path) -> Result<()>;

    async fn answer_callback_query(&self, callback_id: &str) -> Result<()>;
}
