use crate::domain::{ChatId, MessageId, MessageRef};

/// Incoming update, already classified by the transport adapter.
#[derive(Clone, Debug)]
pub enum IncomingUpdate {
    Document(DocumentMessage),
    Other(OtherMessage),
    Callback(CallbackQuery),
    /// Anything else the transport delivers (edited messages, polls, ...).
    Unsupported { kind: String },
}

#[derive(Clone, Debug)]
pub struct DocumentMessage {
    pub chat_id: ChatId,
    pub message_id: MessageId,
    pub file_id: String,
    pub file_name: Option<String>,
}

impl DocumentMessage {
    /// Name shown to the user; Telegram may omit it.
    pub fn display_name(&self) -> &str {
        self.file_name
            .as_deref()
            .filter(|s| !s.trim().is_empty())
            .unwrap_or("book")
    }
}

/// Any non-document message (text, sticker, photo, ...).
#[derive(Clone, Debug)]
pub struct OtherMessage {
    pub chat_id: ChatId,
    pub message_id: MessageId,
    pub text: Option<String>,
}

impl OtherMessage {
    /// Command name without the slash or `@botname` suffix (`/start@bot x` -> `start`).
    pub fn command(&self) -> Option<&str> {
        let text = self.text.as_deref()?.trim_start();
        let rest = text.strip_prefix('/')?;
        let word = rest.split_whitespace().next().unwrap_or("");
        let name = word.split('@').next().unwrap_or("");
        if name.is_empty() {
            None
        } else {
            Some(name)
        }
    }
}

/// The message a prompt replied to, as seen when the choice comes back.
#[derive(Clone, Debug)]
pub enum RepliedMessage {
    Document(DocumentMessage),
    Other { message_id: MessageId },
}

/// Choice made on an inline keyboard.
#[derive(Clone, Debug)]
pub struct CallbackQuery {
    pub callback_id: String,
    pub data: String,
    /// The prompt message carrying the keyboard.
    pub prompt: Option<MessageRef>,
    /// What the prompt was replying to.
    pub reply_to: Option<RepliedMessage>,
}

/// Outgoing "chat action" (upload indicator, etc).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChatAction {
    UploadDocument,
}

/// Inline keyboard (buttons) laid out in rows.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct InlineKeyboard {
    pub rows: Vec<Vec<InlineButton>>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InlineButton {
    pub label: String,
    pub callback_data: String,
}

impl InlineKeyboard {
    pub fn single_row(buttons: Vec<InlineButton>) -> Self {
        Self {
            rows: vec![buttons],
        }
    }

    pub fn buttons(&self) -> impl Iterator<Item = &InlineButton> {
        self.rows.iter().flatten()
    }
}
