//! Gemini Bot entry point.
//!
//! Startup sequence:
//!   1. Load .env (if present)
//!   2. Load config (file + env overrides + secrets)
//!   3. Init logger at configured level
//!   4. Build the LLM provider and response generator
//!   5. Run the Telegram channel until Ctrl-C / SIGTERM

use std::time::Duration;

use gemini_bot::error::AppError;
use gemini_bot::generator::ResponseGenerator;
use gemini_bot::{config, llm, logger, telegram};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

fn main() {
    if let Err(e) = run() {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), AppError> {
    // Load .env if present; the file is optional.
    let _ = dotenvy::dotenv();

    let config = config::load()?;
    logger::init(&config.log_level)?;

    info!(
        bot_name = %config.bot_name,
        log_level = %config.log_level,
        provider = %config.llm.provider,
        "config loaded"
    );

    // Fail before touching the network if a secret is missing.
    config.require_telegram_token()?;
    let provider = llm::providers::build(&config.llm, config.gemini_api_key.clone())
        .map_err(|e| AppError::Config(e.to_string()))?;
    info!(provider = provider.name(), model = provider.model(), "llm provider ready");

    let generator = ResponseGenerator::new(provider, Duration::from_secs(config.llm.timeout_seconds));

    let runtime = tokio::runtime::Builder::new_multi_thread().enable_all().build()?;
    runtime.block_on(async {
        let shutdown = CancellationToken::new();
        tokio::spawn(watch_signals(shutdown.clone()));

        let result = telegram::run(&config, generator, shutdown).await;
        match &result {
            Ok(()) => info!("shutdown complete"),
            Err(e) => error!(error = %e, "telegram channel failed"),
        }
        result
    })
}

/// Cancel `shutdown` on Ctrl-C or, on Unix, SIGTERM.
async fn watch_signals(shutdown: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                error!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("ctrl-c received"),
        _ = terminate => info!("SIGTERM received"),
    }
    shutdown.cancel();
}
