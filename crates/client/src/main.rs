//! Terminal client entry point.
mod app;
mod config;
mod input;
mod logging;
mod presentation;

use anyhow::Result;

use app::App;
use config::ClientConfig;

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if it exists (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let config = ClientConfig::from_env();
    let _log_guard = logging::setup_logging(config.session_id.as_deref())?;

    tracing::info!(
        level = <&'static str>::from(config.runtime.level),
        width = config.runtime.game.width,
        height = config.runtime.game.height,
        "starting PuG"
    );

    App::new(config).run().await
}
