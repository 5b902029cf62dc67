use std::sync::Arc;

use b2k_calibre::CalibreTool;
use b2k_core::{config::Config, registry::FormatRegistry};

#[tokio::main]
async fn main() -> Result<(), b2k_core::Error> {
    b2k_core::logging::init("b2k")?;

    let cfg = Arc::new(Config::load()?);
    let tool = Arc::new(CalibreTool::new(cfg.calibre()));
    let registry = Arc::new(FormatRegistry::kindle(tool));

    b2k_telegram::router::run_polling(cfg, registry)
        .await
        .map_err(|e| b2k_core::Error::External(format!("telegram bot failed: {e}")))?;

    tracing::info!("bot stopped");
    Ok(())
}
