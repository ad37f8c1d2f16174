use audio_panel_models::{PlaylistId, TrackId};
use tokio::sync::mpsc::UnboundedSender;
use tracing::warn;

use crate::session::Mode;

#[derive(Debug, Clone, PartialEq)]
pub enum ControlCommand {
    Play,
    Pause,
    Stop,
    Next,
    Previous,
    JumpForward,
    JumpBackward,
    ToggleLoop,
    ToggleShuffle,
    ToggleSingle,
    /// Fraction of the current track, `0.0..=1.0`.
    Seek { fraction: f64 },
    SetVolume { volume: u8 },
    SelectTrack { id: TrackId },
    SelectPlaylist { id: PlaylistId },
    SetMode { mode: Mode },
    Quit,
}

#[derive(Debug, Clone)]
pub struct Controls {
    tx: UnboundedSender<ControlCommand>,
}

impl Controls {
    pub fn new(tx: UnboundedSender<ControlCommand>) -> Self {
        Self { tx }
    }

    pub fn send(&self, command: ControlCommand) {
        if self.tx.send(command).is_err() {
            warn!("session has shut down, dropping command");
        }
    }

    /// Starts playback, or toggles pause once playing.
    pub fn play(&self) {
        self.send(ControlCommand::Play);
    }

    pub fn pause(&self) {
        self.send(ControlCommand::Pause);
    }

    pub fn stop(&self) {
        self.send(ControlCommand::Stop);
    }

    pub fn next(&self) {
        self.send(ControlCommand::Next);
    }

    pub fn previous(&self) {
        self.send(ControlCommand::Previous);
    }

    pub fn jump_forward(&self) {
        self.send(ControlCommand::JumpForward);
    }

    pub fn jump_backward(&self) {
        self.send(ControlCommand::JumpBackward);
    }

    pub fn toggle_loop(&self) {
        self.send(ControlCommand::ToggleLoop);
    }

    pub fn toggle_shuffle(&self) {
        self.send(ControlCommand::ToggleShuffle);
    }

    pub fn toggle_single(&self) {
        self.send(ControlCommand::ToggleSingle);
    }

    pub fn seek(&self, fraction: f64) {
        self.send(ControlCommand::Seek { fraction });
    }

    pub fn set_volume(&self, volume: u8) {
        self.send(ControlCommand::SetVolume { volume });
    }

    pub fn select_track(&self, id: TrackId) {
        self.send(ControlCommand::SelectTrack { id });
    }

    pub fn select_playlist(&self, id: PlaylistId) {
        self.send(ControlCommand::SelectPlaylist { id });
    }

    pub fn set_mode(&self, mode: Mode) {
        self.send(ControlCommand::SetMode { mode });
    }

    pub fn quit(&self) {
        self.send(ControlCommand::Quit);
    }
}
