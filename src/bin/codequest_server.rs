//! Code Quest HTTP server.
//!
//! Configuration comes from `.env`, the TOML file named by
//! `CODEQUEST_CONFIG`, and environment overrides. See [`codequest::config`].

use codequest::config::load_dotenv;
use codequest::{AppConfig, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let env_file = load_dotenv();
    let config = AppConfig::load()?;
    let _log_guard = codequest::logging::init(&config.logging)?;

    tracing::info!("codequest starting");
    if let Some(path) = env_file {
        tracing::debug!(path = %path.display(), "loaded .env");
    }
    if config.mail.default_sender.is_none() {
        tracing::warn!("MAIL_DEFAULT_SENDER is not set; digest emails will fail");
    }

    let state = AppState::from_config(&config)?;
    codequest::server::serve(&config, state)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "codequest exited with error");
            anyhow::anyhow!("codequest failed: {e}")
        })?;

    tracing::info!("codequest shut down cleanly");
    Ok(())
}
