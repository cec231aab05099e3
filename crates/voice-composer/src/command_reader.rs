//! Line-oriented command input.
//!
//! Reads one command per line and forwards parsed commands to the main
//! application over an async channel.

use crate::{AppCommand, AppError, AppResult};

use std::panic::Location;

use error_location::ErrorLocation;
use tokio::{
    io::{AsyncBufRead, AsyncBufReadExt},
    sync::{mpsc, watch},
};
use tracing::{debug, info, instrument, warn};

/// Forwards parsed input lines to the application.
pub struct CommandReader {
    command_tx: mpsc::Sender<AppCommand>,
}

impl CommandReader {
    /// Reader forwarding parsed commands to `command_tx`.
    pub fn new(command_tx: mpsc::Sender<AppCommand>) -> Self {
        Self { command_tx }
    }

    /// Read commands from `input` until end of input, `quit`, or shutdown.
    ///
    /// End of input is forwarded as [`AppCommand::Quit`].
    #[instrument(skip(self, input, shutdown_rx))]
    pub async fn run<R>(&self, input: R, mut shutdown_rx: watch::Receiver<bool>) -> AppResult<()>
    where
        R: AsyncBufRead + Unpin,
    {
        let mut lines = input.lines();

        loop {
            tokio::select! {
                _ = shutdown_rx.changed() => {
                    info!("Command reader shutting down");
                    break;
                }
                line = lines.next_line() => {
                    match line? {
                        Some(line) if line.trim().is_empty() => continue,
                        Some(line) => match line.parse::<AppCommand>() {
                            Ok(command) => {
                                let quit = command == AppCommand::Quit;
                                self.forward(command).await?;
                                if quit {
                                    break;
                                }
                            }
                            Err(e) => {
                                warn!(input = %line.trim(), error = %e, "Ignoring input line");
                                self.forward(AppCommand::Help).await?;
                            }
                        },
                        None => {
                            debug!("End of input");
                            self.forward(AppCommand::Quit).await?;
                            break;
                        }
                    }
                }
            }
        }

        Ok(())
    }

    async fn forward(&self, command: AppCommand) -> AppResult<()> {
        let location = ErrorLocation::from(Location::caller());
        self.command_tx
            .send(command)
            .await
            .map_err(|e| AppError::ChannelSendFailed {
                message: format!("Failed to forward {:?}", e.0),
                location,
            })
    }
}
