use std::time::{Duration, Instant};

use tracing::debug;

/// Delay between arming the mic and the automatic recording start.
pub const DEFAULT_SETTLE_DELAY: Duration = Duration::from_millis(500);

const LEVEL_SCALE_GAIN: f32 = 10.0;

/// Mic affordance state: `Dormant -> Armed -> {Listening, Muted}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MicState {
    /// Never activated.
    Dormant,
    /// Activated once; recording starts automatically at `start_at`.
    Armed {
        /// When the automatic start is due.
        start_at: Instant,
    },
    /// Recording session active.
    Listening,
    /// Recording session stopped by the user.
    Muted,
}

/// Side effect the owner must perform after a transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MicAction {
    /// Nothing to do.
    None,
    /// Reveal the staging surface; recording follows after the settle delay.
    RevealStaging,
    /// Start the recording session.
    StartRecording,
    /// Stop the recording session.
    StopRecording,
}

/// Visual emphasis of the affordance.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MicVisual {
    /// Scale factor, 1.0 when inert.
    pub scale: f32,
    /// Whether the pulse animation runs.
    pub pulsing: bool,
}

impl MicVisual {
    /// Resting appearance.
    pub const INERT: MicVisual = MicVisual {
        scale: 1.0,
        pulsing: false,
    };
}

/// The microphone button's state machine.
#[derive(Debug, Clone)]
pub struct MicAffordance {
    state: MicState,
    settle_delay: Duration,
}

impl Default for MicAffordance {
    fn default() -> Self {
        Self::new(DEFAULT_SETTLE_DELAY)
    }
}

impl MicAffordance {
    /// Dormant affordance with the given settle delay.
    pub fn new(settle_delay: Duration) -> Self {
        Self {
            state: MicState::Dormant,
            settle_delay,
        }
    }

    /// Current state.
    pub fn state(&self) -> MicState {
        self.state
    }

    /// Handles a user activation.
    ///
    /// Activations while armed are ignored until the automatic start resolves.
    pub fn activate(&mut self, now: Instant) -> MicAction {
        match self.state {
            MicState::Dormant => {
                self.state = MicState::Armed {
                    start_at: now + self.settle_delay,
                };
                debug!(settle_ms = self.settle_delay.as_millis(), "Mic armed");
                MicAction::RevealStaging
            }
            MicState::Armed { .. } => MicAction::None,
            MicState::Listening => MicAction::StopRecording,
            MicState::Muted => MicAction::StartRecording,
        }
    }

    /// Fires the automatic start once the settle delay has passed.
    pub fn poll(&mut self, now: Instant) -> MicAction {
        match self.state {
            MicState::Armed { start_at } if now >= start_at => MicAction::StartRecording,
            _ => MicAction::None,
        }
    }

    /// The session started. A dormant mic ignores sessions started elsewhere.
    pub fn on_started(&mut self) {
        if self.state != MicState::Dormant {
            self.state = MicState::Listening;
        }
    }

    /// The session failed to start: an armed mic falls back to dormant, a
    /// muted one stays muted.
    pub fn on_start_failed(&mut self) {
        if let MicState::Armed { .. } = self.state {
            self.state = MicState::Dormant;
        }
    }

    /// The session stopped.
    pub fn on_stopped(&mut self) {
        if self.state == MicState::Listening {
            self.state = MicState::Muted;
        }
    }

    /// Scale grows with the live level while listening; inert otherwise.
    pub fn visual(&self, level: f32) -> MicVisual {
        match self.state {
            MicState::Listening => MicVisual {
                scale: 1.0 + level.max(0.0) * LEVEL_SCALE_GAIN,
                pulsing: true,
            },
            _ => MicVisual::INERT,
        }
    }
}
