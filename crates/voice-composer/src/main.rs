//! Voice-Composer: record, upload, preview, and send voice clips from the
//! terminal.

mod app;
mod app_command;
mod command_reader;
mod config;
mod error;
mod status_line;

pub(crate) use {
    app::App,
    app_command::AppCommand,
    command_reader::CommandReader,
    error::{AppError, Result as AppResult},
};

use crate::config::Config;

use std::time::Duration;

use tokio::{
    io::BufReader,
    sync::{mpsc, watch},
};
use tracing::error;
use tracing_subscriber::EnvFilter;

const DEFAULT_LOG_FILTER: &str = "voice_composer=info,voice_composer_core=warn";

/// Application entry point.
fn main() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let config = match Config::load() {
        Ok(c) => c,
        Err(e) => {
            error!("Failed to load config: {:?}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = config.validate() {
        error!("Config validation failed: {:?}", e);
        std::process::exit(1);
    }

    // The composer owns the capture stream, which is !Send on some hosts, so
    // everything runs on this thread.
    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(rt) => rt,
        Err(e) => {
            error!("Failed to create tokio runtime: {:?}", e);
            std::process::exit(1);
        }
    };

    runtime.block_on(async {
        let (command_tx, command_rx) = mpsc::channel(32);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let command_reader = CommandReader::new(command_tx);
        let app = App::new(&config, command_rx, shutdown_tx);

        tokio::join!(
            async {
                let stdin = BufReader::new(tokio::io::stdin());
                if let Err(e) = command_reader.run(stdin, shutdown_rx).await {
                    error!(error = ?e, "Command reader error");
                }
            },
            async {
                if let Err(e) = app.run().await {
                    error!(error = ?e, "App error");
                }
            }
        );
    });

    // Stdin reads block a runtime thread until the next line arrives.
    runtime.shutdown_timeout(Duration::from_millis(100));
}
