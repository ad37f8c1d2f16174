use std::sync::Arc;

use audio_panel_client::PlayerCommand;
use audio_panel_models::PlaylistId;
use tracing::{debug, warn};

use crate::{
    controls::ControlCommand, notification::NotificationBroadcast, service::PlayerService,
};

/// Forwards commands to the remote player.
///
/// Nothing is applied locally; the effect of a command shows up in the next broadcast.
#[derive(Debug, Clone)]
pub struct RemoteTransport {
    service: Arc<dyn PlayerService>,
    broadcast: Arc<NotificationBroadcast>,
}

impl RemoteTransport {
    pub fn new(service: Arc<dyn PlayerService>, broadcast: Arc<NotificationBroadcast>) -> Self {
        Self { service, broadcast }
    }

    pub fn command_for(command: &ControlCommand) -> Option<PlayerCommand> {
        let command = match command {
            ControlCommand::Play => PlayerCommand::Play,
            ControlCommand::Pause => PlayerCommand::Pause,
            ControlCommand::Stop => PlayerCommand::Stop,
            ControlCommand::Next => PlayerCommand::Next,
            ControlCommand::Previous => PlayerCommand::Previous,
            ControlCommand::JumpForward => PlayerCommand::FastForward,
            ControlCommand::JumpBackward => PlayerCommand::FastBackward,
            ControlCommand::ToggleLoop => PlayerCommand::ToggleLoop,
            ControlCommand::ToggleShuffle => PlayerCommand::ToggleShuffle,
            ControlCommand::ToggleSingle => PlayerCommand::ToggleSingle,
            ControlCommand::Seek { fraction } => {
                let fraction = if fraction.is_finite() { *fraction } else { 0.0 };
                PlayerCommand::ToPosition((fraction.clamp(0.0, 1.0) * 100.0).round() as u8)
            }
            ControlCommand::SetVolume { volume } => PlayerCommand::Volume((*volume).min(100)),
            ControlCommand::SelectTrack { id } => PlayerCommand::Select(id.clone()),
            ControlCommand::SelectPlaylist { .. }
            | ControlCommand::SetMode { .. }
            | ControlCommand::Quit => return None,
        };

        Some(command)
    }

    /// Fire and forget. Failures surface as a warning.
    pub fn send(&self, command: PlayerCommand) {
        let service = self.service.clone();
        let broadcast = self.broadcast.clone();

        tokio::spawn(async move {
            debug!("sending {command:?}");
            if let Err(error) = service.player(&command).await {
                warn!("command {command:?} failed: {error}");
                broadcast.send_warning(format!("Player did not accept command: {error}"));
            }
        });
    }

    pub fn select_playlist(&self, id: PlaylistId) {
        let service = self.service.clone();
        let broadcast = self.broadcast.clone();

        tokio::spawn(async move {
            if let Err(error) = service.change_playlist(&id).await {
                warn!("changing playlist to {id} failed: {error}");
                broadcast.send_error(error.to_string());
            }
        });
    }
}
