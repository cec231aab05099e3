use crate::{
    AppCommand, AppResult,
    app_command::HELP,
    config::Config,
    status_line::{CLEAR_LINE, StatusLine, clip_line},
};

use std::{
    io::{Stdout, Write},
    path::Path,
    sync::mpsc as std_mpsc,
    time::{Duration, Instant},
};

use tokio::{
    sync::{mpsc, watch},
    task::{JoinError, JoinSet},
    time::MissedTickBehavior,
};
use tracing::{debug, error, info, instrument, warn};
use voice_composer_core::{
    CapturedAudio, ClipId, Composer, CpalInputDevice, CpalPlayback, Extraction, HostEvent,
    SymphoniaDecoder, UploadedFile,
};

type CpalComposer = Composer<CpalInputDevice, CpalPlayback>;

/// Waveform work finished off the frame loop.
enum Extracted {
    Recording {
        captured: CapturedAudio,
        extraction: Extraction,
    },
    Upload {
        file: UploadedFile,
        extraction: Extraction,
    },
}

/// Main application state.
///
/// Owns the composer on the runtime thread. Input arrives on `command_rx`;
/// the composer reports back through `events_rx`, drained after every step.
pub struct App {
    composer: CpalComposer,
    events_rx: std_mpsc::Receiver<HostEvent>,
    command_rx: mpsc::Receiver<AppCommand>,
    shutdown_tx: watch::Sender<bool>,
    frame_interval: Duration,
    status: StatusLine,
    extractions: JoinSet<Extracted>,
    out: Stdout,
}

impl App {
    /// Build the composer against the configured input device and the
    /// default output device.
    pub(crate) fn new(
        config: &Config,
        command_rx: mpsc::Receiver<AppCommand>,
        shutdown_tx: watch::Sender<bool>,
    ) -> Self {
        let (events_tx, events_rx) = std_mpsc::channel();
        let composer = Composer::new(
            CpalInputDevice::new(config.audio.selected_device.clone()),
            CpalPlayback::default(),
            SymphoniaDecoder,
            config.composer_settings(),
            events_tx,
        );

        Self {
            composer,
            events_rx,
            command_rx,
            shutdown_tx,
            frame_interval: config.behavior.frame_interval(),
            status: StatusLine::new(config.visualizer.height),
            extractions: JoinSet::new(),
            out: std::io::stdout(),
        }
    }

    /// Run the main application event loop.
    #[instrument(skip(self))]
    pub(crate) async fn run(mut self) -> AppResult<()> {
        info!("Voice-Composer starting");
        self.print(HELP)?;

        let mut frames = tokio::time::interval(self.frame_interval);
        frames.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                cmd = self.command_rx.recv() => {
                    match cmd {
                        Some(AppCommand::Quit) => {
                            info!("Shutdown requested");
                            break;
                        }
                        Some(cmd) => self.handle_command(cmd).await?,
                        None => {
                            info!("Command channel closed, shutting down");
                            break;
                        }
                    }
                }

                Some(joined) = self.extractions.join_next(), if !self.extractions.is_empty() => {
                    self.complete_extraction(joined);
                }

                _ = frames.tick() => {
                    self.composer.on_frame(Instant::now());
                }
            }

            self.render()?;
        }

        self.composer.teardown();
        self.render()?;

        if self.shutdown_tx.send(true).is_err() {
            debug!("No shutdown listeners remaining");
        }

        // Blocking waveform tasks cannot be cancelled; they finish on their own.
        self.extractions.detach_all();

        info!("Voice-Composer stopped");
        Ok(())
    }

    #[instrument(skip(self))]
    async fn handle_command(&mut self, cmd: AppCommand) -> AppResult<()> {
        match cmd {
            AppCommand::Mic => {
                if let Some(captured) = self.composer.activate_mic(Instant::now()) {
                    self.spawn_recording_extraction(captured);
                }
            }
            AppCommand::Record => {
                if self.composer.is_recording() {
                    if let Some(captured) = self.composer.stop_recording() {
                        self.spawn_recording_extraction(captured);
                    }
                } else {
                    self.composer.start_recording(Instant::now());
                }
            }
            AppCommand::Upload { path } => self.upload(&path).await?,
            AppCommand::Preview => {
                if let Err(e) = self.composer.toggle_pending_playback() {
                    debug!(error = %e, "Pending clip playback failed");
                }
            }
            AppCommand::Seek { progress } => {
                if self.composer.stage().is_playing() {
                    self.composer.seek_pending(progress);
                } else {
                    self.composer.seek_playback(progress);
                }
            }
            AppCommand::Discard => {
                if self.composer.discard_pending().is_none() {
                    self.print("Nothing pending")?;
                }
            }
            AppCommand::Send => {
                if self.composer.send_pending().is_none() {
                    self.print("Nothing pending")?;
                }
            }
            AppCommand::Play { index } => match self.clip_at(index) {
                Some(id) => {
                    if let Err(e) = self.composer.toggle_playback(id) {
                        debug!(error = %e, "Library clip playback failed");
                    }
                }
                None => self.print(&format!("No clip #{}", index))?,
            },
            AppCommand::Remove { index } => match self.clip_at(index) {
                Some(id) => {
                    self.composer.remove(id);
                }
                None => self.print(&format!("No clip #{}", index))?,
            },
            AppCommand::Menu => {
                let open = self.composer.toggle_menu();
                self.print(if open {
                    "Attachment menu open"
                } else {
                    "Attachment menu closed"
                })?;
            }
            AppCommand::List => self.print_library()?,
            AppCommand::Help => self.print(HELP)?,
            AppCommand::Quit => {}
        }
        Ok(())
    }

    async fn upload(&mut self, path: &Path) -> AppResult<()> {
        let bytes = match tokio::fs::read(path).await {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!(path = ?path, error = %e, "Upload could not be read");
                return self.print(&format!("Could not read {}", path.display()));
            }
        };

        let file = UploadedFile::from_path(path, bytes);
        if self.composer.accept_upload(&file) {
            let extractor = self.composer.extractor().clone();
            self.extractions.spawn_blocking(move || {
                let extraction = extractor.extract(&file.bytes);
                Extracted::Upload { file, extraction }
            });
        }
        Ok(())
    }

    fn spawn_recording_extraction(&mut self, captured: CapturedAudio) {
        let extractor = self.composer.extractor().clone();
        self.extractions.spawn_blocking(move || {
            let extraction = extractor.extract(captured.payload.bytes());
            Extracted::Recording {
                captured,
                extraction,
            }
        });
    }

    fn complete_extraction(&mut self, joined: Result<Extracted, JoinError>) {
        match joined {
            Ok(Extracted::Recording {
                captured,
                extraction,
            }) => {
                self.composer.complete_recording(captured, extraction);
            }
            Ok(Extracted::Upload { file, extraction }) => {
                self.composer.complete_upload(file, extraction);
            }
            Err(e) => {
                error!(error = ?e, "Waveform task failed");
                self.composer.abandon_computing();
            }
        }
    }

    fn clip_at(&self, index: usize) -> Option<ClipId> {
        let clips = self.composer.library().clips();
        index.checked_sub(1).and_then(|i| clips.get(i)).map(|c| c.id())
    }

    /// Drain composer events and redraw.
    fn render(&mut self) -> AppResult<()> {
        let events: Vec<HostEvent> = self.events_rx.try_iter().collect();
        for event in &events {
            if let Some(message) = self.status.apply(event) {
                self.print(&message)?;
            }
            match event {
                HostEvent::PendingChanged(Some(_)) => {
                    if let Some(clip) = self.composer.stage().clip() {
                        let line = clip_line("[pending]", clip, 0.0);
                        self.print(&line)?;
                    }
                }
                HostEvent::LibraryChanged => self.print_library()?,
                HostEvent::CommitRequested(clip) => {
                    info!(clip_id = %clip.id(), bytes = clip.payload().len(), "Clip handed off");
                }
                _ => {}
            }
        }

        if let Some(live) = self.status.take_live() {
            write!(self.out, "{}{}", CLEAR_LINE, live)?;
            self.out.flush()?;
        }
        Ok(())
    }

    fn print_library(&mut self) -> AppResult<()> {
        let lines: Vec<String> = {
            let library = self.composer.library();
            library
                .clips()
                .iter()
                .enumerate()
                .map(|(i, clip)| {
                    clip_line(&format!("[{}]", i + 1), clip, library.progress_of(clip.id()))
                })
                .collect()
        };

        if lines.is_empty() {
            return self.print("Library is empty");
        }
        for line in &lines {
            self.print(line)?;
        }
        Ok(())
    }

    fn print(&mut self, message: &str) -> AppResult<()> {
        writeln!(self.out, "{}{}", CLEAR_LINE, message)?;
        self.out.flush()?;
        Ok(())
    }
}
