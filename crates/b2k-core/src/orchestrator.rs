//! Conversion request lifecycle.
//!
//! A request starts with a document message (we answer with a format prompt)
//! and continues when the user taps a button. The choice is correlated back to
//! the document through the prompt's reply-to reference, then the book is
//! downloaded, converted, delivered and its temp files released. Every failure
//! past correlation becomes one generic message to the user.

use std::sync::Arc;

use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::{
    book::{split_file_name, Book, BookFormat},
    config::Config,
    domain::{ChatId, MessageRef},
    errors::Error,
    formatting::bold,
    messaging::{
        port::MessagingPort,
        types::{CallbackQuery, ChatAction, DocumentMessage, RepliedMessage},
    },
    registry::FormatRegistry,
    temp_files::TempFiles,
    utils::MeasuredOperation,
    Result,
};

/// Terminal state of one handled update.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RequestOutcome {
    /// Format prompt sent for a new document.
    Prompted,
    /// A plain text reply was sent.
    Replied,
    Delivered { file_name: String },
    AlreadyGood,
    /// The user was told something went wrong.
    Failed,
    /// Uncorrelated or malformed choice; logged only.
    Dropped,
    Ignored,
}

enum Prepared {
    AlreadyGood(Book),
    Converted(Book),
}

pub struct ConversionOrchestrator {
    cfg: Arc<Config>,
    registry: Arc<FormatRegistry>,
    messenger: Arc<dyn MessagingPort>,
}

impl ConversionOrchestrator {
    pub fn new(
        cfg: Arc<Config>,
        registry: Arc<FormatRegistry>,
        messenger: Arc<dyn MessagingPort>,
    ) -> Self {
        Self {
            cfg,
            registry,
            messenger,
        }
    }

    /// Ask which format the document should be converted to. Nothing is downloaded yet.
    pub async fn handle_document(&self, doc: &DocumentMessage) -> RequestOutcome {
        let text = format!(
            "Received {}. Which format would you like to convert to?",
            bold(doc.display_name())
        );
        match self
            .messenger
            .send_inline_keyboard(
                doc.chat_id,
                &text,
                self.registry.keyboard(),
                Some(doc.message_id),
            )
            .await
        {
            Ok(_) => {
                info!(chat_id = doc.chat_id.0, file_id = %doc.file_id, file_name = doc.display_name(), "format prompt sent");
                RequestOutcome::Prompted
            }
            Err(e) => {
                warn!(chat_id = doc.chat_id.0, file_id = %doc.file_id, error = %e, "failed to send format prompt");
                RequestOutcome::Failed
            }
        }
    }

    /// Handle a format choice. Each call is an independent request; repeated
    /// taps on the same button convert again.
    pub async fn handle_choice(&self, q: &CallbackQuery) -> RequestOutcome {
        let (doc, format) = match correlate(q) {
            Ok(v) => v,
            Err(e @ Error::UncorrelatedChoice(_)) => {
                info!(callback_id = %q.callback_id, error = %e, "dropping choice");
                return RequestOutcome::Dropped;
            }
            Err(e) => {
                error!(callback_id = %q.callback_id, data = %q.data, error = %e, "can't parse choice");
                return RequestOutcome::Dropped;
            }
        };

        if let Err(e) = self.messenger.answer_callback_query(&q.callback_id).await {
            debug!(callback_id = %q.callback_id, error = %e, "answer_callback_query failed");
        }

        if let Some(prompt) = q.prompt {
            self.delete_quietly(prompt).await;
        }

        self.process_book(&doc, &format).await
    }

    async fn process_book(&self, doc: &DocumentMessage, desired: &BookFormat) -> RequestOutcome {
        let chat_id = doc.chat_id;
        let file_name = doc.display_name();

        let notice = match self
            .messenger
            .send_html(
                chat_id,
                &format!("Wait a bit. My dwarfs are working on {}", bold(file_name)),
                None,
            )
            .await
        {
            Ok(m) => Some(m),
            Err(e) => {
                warn!(chat_id = chat_id.0, error = %e, "failed to send progress notice");
                None
            }
        };

        let mut temp = TempFiles::new();
        let prepared = self.prepare(doc, desired, &mut temp).await;

        if let Some(notice) = notice {
            self.delete_quietly(notice).await;
        }

        let result = match prepared {
            Ok(p) => self.deliver(chat_id, p).await,
            Err(e) => Err(e),
        };

        let outcome = match result {
            Ok(outcome) => {
                info!(chat_id = chat_id.0, file_id = %doc.file_id, ?outcome, "conversion request finished");
                outcome
            }
            Err(e) => {
                error!(chat_id = chat_id.0, file_id = %doc.file_id, file_name, format = %desired, error = %e, "conversion request failed");
                self.report_failure(chat_id, file_name).await;
                RequestOutcome::Failed
            }
        };

        let failed = temp.cleanup().await;
        if failed > 0 {
            warn!(file_id = %doc.file_id, failed, "some temp files were left behind");
        }
        outcome
    }

    async fn prepare(
        &self,
        doc: &DocumentMessage,
        desired: &BookFormat,
        temp: &mut TempFiles,
    ) -> Result<Prepared> {
        let original = self.download(doc, temp).await?;

        let converter = self
            .registry
            .resolve(desired)
            .ok_or_else(|| Error::UnsupportedFormat(desired.clone()))?;

        // Track the output before the tool runs so partial output is removed too.
        temp.add(converter.output_path(&original));
        let converted = {
            let _op = MeasuredOperation::start(format!(
                "Converting {} to {}",
                original.title,
                desired.name()
            ));
            converter.convert(&original).await?
        };
        temp.add(&converted.path);

        if converted == original {
            Ok(Prepared::AlreadyGood(original))
        } else {
            Ok(Prepared::Converted(converted))
        }
    }

    async fn download(&self, doc: &DocumentMessage, temp: &mut TempFiles) -> Result<Book> {
        let (title, format) = split_file_name(doc.display_name());
        let path = self
            .cfg
            .storage_dir
            .join(format!("{}{}", Uuid::new_v4(), format.extension()));
        temp.add(&path);

        self.messenger
            .download_file(&doc.file_id, &path)
            .await
            .map_err(|e| Error::DownloadFailed(e.to_string()))?;
        debug!(file_id = %doc.file_id, path = %path.display(), "document downloaded");

        Ok(Book::new(title, format, path))
    }

    async fn deliver(&self, chat_id: ChatId, prepared: Prepared) -> Result<RequestOutcome> {
        match prepared {
            Prepared::AlreadyGood(book) => {
                self.messenger
                    .send_html(
                        chat_id,
                        &format!("Your book {} is already good!", bold(&book.title)),
                        None,
                    )
                    .await
                    .map_err(|e| Error::DeliveryFailed(e.to_string()))?;
                Ok(RequestOutcome::AlreadyGood)
            }
            Prepared::Converted(book) => {
                if let Err(e) = self
                    .messenger
                    .send_chat_action(chat_id, ChatAction::UploadDocument)
                    .await
                {
                    debug!(chat_id = chat_id.0, error = %e, "send_chat_action failed");
                }

                let file_name = book.file_name();
                let caption = format!("Here you go! Your {} is ready. Enjoy.", bold(&book.title));
                self.messenger
                    .send_document(chat_id, &book.path, &file_name, &caption)
                    .await
                    .map_err(|e| Error::DeliveryFailed(e.to_string()))?;
                Ok(RequestOutcome::Delivered { file_name })
            }
        }
    }

    async fn report_failure(&self, chat_id: ChatId, file_name: &str) {
        let text = format!(
            "Sorry, something went wrong with {}. Try sending the book again.",
            bold(file_name)
        );
        if let Err(e) = self.messenger.send_html(chat_id, &text, None).await {
            warn!(chat_id = chat_id.0, error = %e, "failed to report conversion failure");
        }
    }

    async fn delete_quietly(&self, msg: MessageRef) {
        if let Err(e) = self.messenger.delete_message(msg).await {
            debug!(chat_id = msg.chat_id.0, message_id = msg.message_id.0, error = %e, "delete_message failed");
        }
    }
}

/// Trace a choice back to its document and decode the requested format.
fn correlate(q: &CallbackQuery) -> Result<(DocumentMessage, BookFormat)> {
    let doc = match &q.reply_to {
        Some(RepliedMessage::Document(doc)) => doc.clone(),
        Some(RepliedMessage::Other { message_id }) => {
            return Err(Error::UncorrelatedChoice(format!(
                "message {} is not a document",
                message_id.0
            )))
        }
        None => {
            return Err(Error::UncorrelatedChoice(
                "original message is missing".to_string(),
            ))
        }
    };

    let format =
        BookFormat::parse_token(&q.data).ok_or_else(|| Error::MalformedChoice(q.data.clone()))?;
    Ok((doc, format))
}
