use std::sync::Arc;

use teloxide::{
    dispatching::{DefaultKey, Dispatcher},
    dptree,
    prelude::*,
};
use tracing::{info, warn};

use b2k_core::{
    config::Config, dispatch::UpdateDispatcher, messaging::port::MessagingPort,
    orchestrator::ConversionOrchestrator, registry::FormatRegistry,
};

use crate::handlers;
use crate::TelegramMessenger;

pub struct AppState {
    pub dispatcher: Arc<UpdateDispatcher>,
}

pub async fn run_polling(cfg: Arc<Config>, registry: Arc<FormatRegistry>) -> anyhow::Result<()> {
    let bot = Bot::new(cfg.telegram_bot_token.clone());

    match bot.get_me().await {
        Ok(me) => info!(username = %me.username(), "bot started"),
        Err(e) => warn!(error = %e, "get_me failed"),
    }
    info!(
        storage_dir = %cfg.storage_dir.display(),
        ebook_convert = %cfg.ebook_convert_path.display(),
        formats = ?registry.formats().map(|f| f.name()).collect::<Vec<_>>(),
        "ready"
    );

    let messenger: Arc<dyn MessagingPort> = Arc::new(TelegramMessenger::new(bot.clone()));
    let orchestrator = Arc::new(ConversionOrchestrator::new(
        cfg.clone(),
        registry,
        messenger.clone(),
    ));
    let state = Arc::new(AppState {
        dispatcher: Arc::new(UpdateDispatcher::new(orchestrator, messenger)),
    });

    build_dispatcher(bot, state).dispatch().await;

    Ok(())
}

fn build_dispatcher(
    bot: Bot,
    state: Arc<AppState>,
) -> Dispatcher<Bot, teloxide::RequestError, DefaultKey> {
    let handler = dptree::entry()
        .branch(Update::filter_callback_query().endpoint(handlers::handle_callback))
        .branch(Update::filter_message().endpoint(handlers::handle_message))
        .branch(dptree::endpoint(handlers::handle_unsupported));

    Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![state])
        .build()
}
