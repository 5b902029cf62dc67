use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::{
    messaging::{
        port::MessagingPort,
        types::{IncomingUpdate, OtherMessage},
    },
    orchestrator::{ConversionOrchestrator, RequestOutcome},
};

const GREETING: &str =
    "Hey! Send me a book file (mobi, epub, fb2, txt) and I will convert it to Kindle supported format.";
const CANT_WORK_WITH_THAT: &str =
    "Sorry, I can't work with that. Send me a book file (mobi, epub, fb2, txt), please.";

/// Routes classified updates to the orchestrator.
///
/// Never returns an error: every failure is handled (and logged) inside the
/// request it belongs to.
pub struct UpdateDispatcher {
    orchestrator: Arc<ConversionOrchestrator>,
    messenger: Arc<dyn MessagingPort>,
}

impl UpdateDispatcher {
    pub fn new(orchestrator: Arc<ConversionOrchestrator>, messenger: Arc<dyn MessagingPort>) -> Self {
        Self {
            orchestrator,
            messenger,
        }
    }

    pub async fn dispatch(&self, update: IncomingUpdate) -> RequestOutcome {
        let outcome = match update {
            IncomingUpdate::Document(doc) => self.orchestrator.handle_document(&doc).await,
            IncomingUpdate::Callback(q) => self.orchestrator.handle_choice(&q).await,
            IncomingUpdate::Other(msg) => self.handle_other(&msg).await,
            IncomingUpdate::Unsupported { kind } => {
                info!(kind = %kind, "can't process update");
                RequestOutcome::Ignored
            }
        };
        debug!(?outcome, "update handled");
        outcome
    }

    async fn handle_other(&self, msg: &OtherMessage) -> RequestOutcome {
        let reply = match msg.command() {
            Some("start") | Some("help") => GREETING,
            Some(cmd) => {
                debug!(cmd, "ignoring unknown command");
                return RequestOutcome::Ignored;
            }
            None => CANT_WORK_WITH_THAT,
        };

        match self
            .messenger
            .send_html(msg.chat_id, reply, Some(msg.message_id))
            .await
        {
            Ok(_) => RequestOutcome::Replied,
            Err(e) => {
                warn!(chat_id = msg.chat_id.0, error = %e, "failed to reply");
                RequestOutcome::Failed
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::converter::tests::{tmp_dir, FakeTool};
    use crate::domain::{ChatId, MessageId};
    use crate::orchestrator::tests::{choice, document, test_config, FakeMessenger, Sent};
    use crate::registry::FormatRegistry;

    struct Fixture {
        dir: std::path::PathBuf,
        messenger: Arc<FakeMessenger>,
        tool: Arc<FakeTool>,
        dispatcher: UpdateDispatcher,
    }

    impl Fixture {
        fn new() -> Self {
            let dir = tmp_dir("dispatch");
            let messenger = Arc::new(FakeMessenger::default());
            let tool = Arc::new(FakeTool::default());
            let orch = ConversionOrchestrator::new(
                test_config(dir.clone()),
                Arc::new(FormatRegistry::kindle(tool.clone())),
                messenger.clone(),
            );
            let dispatcher = UpdateDispatcher::new(Arc::new(orch), messenger.clone());
            Self {
                dir,
                messenger,
                tool,
                dispatcher,
            }
        }
    }

    impl Drop for Fixture {
        fn drop(&mut self) {
            let _ = std::fs::remove_dir_all(&self.dir);
        }
    }

    fn other(text: Option<&str>) -> IncomingUpdate {
        IncomingUpdate::Other(OtherMessage {
            chat_id: ChatId(5),
            message_id: MessageId(9),
            text: text.map(|s| s.to_string()),
        })
    }

    #[tokio::test]
    async fn plain_messages_get_the_cant_work_reply() {
        let f = Fixture::new();
        let (m, d) = (&f.messenger, &f.dispatcher);

        assert_eq!(d.dispatch(other(Some("hi"))).await, RequestOutcome::Replied);
        assert_eq!(d.dispatch(other(None)).await, RequestOutcome::Replied);

        let sent = m.sent();
        assert_eq!(sent.len(), 2);
        assert!(sent.iter().all(|s| matches!(
            s,
            Sent::Html { text, reply_to: Some(MessageId(9)), .. } if text == CANT_WORK_WITH_THAT
        )));
    }

    #[tokio::test]
    async fn start_gets_a_greeting_and_other_commands_are_ignored() {
        let f = Fixture::new();
        let (m, d) = (&f.messenger, &f.dispatcher);

        assert_eq!(d.dispatch(other(Some("/start"))).await, RequestOutcome::Replied);
        assert_eq!(d.dispatch(other(Some("/settings"))).await, RequestOutcome::Ignored);
        assert_eq!(m.html_texts(), vec![GREETING.to_string()]);
    }

    #[tokio::test]
    async fn unsupported_updates_are_ignored_without_reply() {
        let f = Fixture::new();
        let (m, d) = (&f.messenger, &f.dispatcher);

        let outcome = d
            .dispatch(IncomingUpdate::Unsupported {
                kind: "edited_message".to_string(),
            })
            .await;
        assert_eq!(outcome, RequestOutcome::Ignored);
        assert!(m.sent().is_empty());
    }

    #[tokio::test]
    async fn documents_and_choices_reach_the_orchestrator() {
        let f = Fixture::new();
        let (tool, d) = (&f.tool, &f.dispatcher);
        let doc = document(3, "story.fb2");

        assert_eq!(
            d.dispatch(IncomingUpdate::Document(doc.clone())).await,
            RequestOutcome::Prompted
        );
        assert_eq!(
            d.dispatch(IncomingUpdate::Callback(choice(&doc, "AZW3|.azw3")))
                .await,
            RequestOutcome::Delivered {
                file_name: "story.azw3".to_string()
            }
        );
        assert_eq!(tool.call_count(), 1);
    }
}
