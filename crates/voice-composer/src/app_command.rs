use crate::{AppError, AppResult};

use std::{panic::Location, path::PathBuf, str::FromStr};

use error_location::ErrorLocation;

/// Usage text printed for `help` and after an unrecognized line.
pub(crate) const HELP: &str = "\
commands:
  mic            press the mic (arm, then toggle listening/muted)
  record         start or stop a recording directly
  upload <path>  stage an audio file
  preview        play/stop the pending clip
  seek <0..1>    seek whatever is playing
  discard        throw away the pending clip
  send           commit the pending clip to the library
  play <n>       play/stop library clip n
  remove <n>     remove library clip n
  menu           open/close the attachment menu
  list           show the library
  help           show this text
  quit           exit";

/// Commands sent from the input reader to the main application.
#[derive(Debug, Clone, PartialEq)]
pub enum AppCommand {
    /// Press the mic affordance.
    Mic,
    /// Start or stop a recording without the affordance.
    Record,
    /// Stage the audio file at `path`.
    Upload {
        /// File to ingest.
        path: PathBuf,
    },
    /// Toggle playback of the pending clip.
    Preview,
    /// Seek the playing clip.
    Seek {
        /// Normalized target position.
        progress: f32,
    },
    /// Discard the pending clip.
    Discard,
    /// Commit the pending clip.
    Send,
    /// Toggle playback of a library clip.
    Play {
        /// 1-based position in the library listing.
        index: usize,
    },
    /// Remove a library clip.
    Remove {
        /// 1-based position in the library listing.
        index: usize,
    },
    /// Open or close the attachment menu.
    Menu,
    /// Print the library.
    List,
    /// Print usage.
    Help,
    /// Request application shutdown.
    Quit,
}

impl FromStr for AppCommand {
    type Err = AppError;

    #[track_caller]
    fn from_str(line: &str) -> AppResult<Self> {
        let line = line.trim();
        let (word, rest) = line
            .split_once(char::is_whitespace)
            .map(|(w, r)| (w, r.trim()))
            .unwrap_or((line, ""));

        let command = match word.to_ascii_lowercase().as_str() {
            "mic" => AppCommand::Mic,
            "record" | "rec" => AppCommand::Record,
            "upload" => {
                if rest.is_empty() {
                    return Err(invalid("upload needs a file path"));
                }
                AppCommand::Upload {
                    path: PathBuf::from(rest),
                }
            }
            "preview" => AppCommand::Preview,
            "seek" => {
                let progress: f32 = rest
                    .parse()
                    .map_err(|_| invalid(&format!("seek position '{}' is not a number", rest)))?;
                if !(0.0..=1.0).contains(&progress) {
                    return Err(invalid("seek position must be between 0 and 1"));
                }
                AppCommand::Seek { progress }
            }
            "discard" => AppCommand::Discard,
            "send" => AppCommand::Send,
            "play" => AppCommand::Play {
                index: parse_index(rest)?,
            },
            "remove" | "rm" => AppCommand::Remove {
                index: parse_index(rest)?,
            },
            "menu" => AppCommand::Menu,
            "list" | "ls" => AppCommand::List,
            "help" | "?" => AppCommand::Help,
            "quit" | "exit" => AppCommand::Quit,
            "" => return Err(invalid("empty line")),
            other => return Err(invalid(&format!("unknown command '{}'", other))),
        };

        Ok(command)
    }
}

#[track_caller]
fn parse_index(text: &str) -> AppResult<usize> {
    match text.parse::<usize>() {
        Ok(index) if index > 0 => Ok(index),
        _ => Err(invalid(&format!("'{}' is not a clip number", text))),
    }
}

#[track_caller]
fn invalid(reason: &str) -> AppError {
    AppError::InvalidCommand {
        reason: reason.to_string(),
        location: ErrorLocation::from(Location::caller()),
    }
}
