use audio_panel_models::{NowPlaying, Playlist, PlaylistId, TrackId};
use tokio::sync::broadcast::{self, Receiver, Sender};

use crate::{Result, reconciler::DisplayMirror, session::Mode};

#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    Error(String),
    Warning(String),
    Success(String),
    Info(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Notification {
    /// The canonical playlist changed. Its tracks follow with [`Notification::PlaylistLoaded`].
    PlaylistChanged { playlist: Option<PlaylistId> },
    PlaylistLoaded { playlist: Playlist },
    PlaylistCleared,
    SongChanged {
        track: TrackId,
        now_playing: NowPlaying,
    },
    NowPlayingCleared,
    Display { display: DisplayMirror },
    Networks { ssids: Vec<String> },
    ModeChanged { mode: Mode },
    Message { message: Message },
}

#[derive(Debug)]
pub struct NotificationBroadcast {
    tx: Sender<Notification>,
    rx: Receiver<Notification>,
}

impl NotificationBroadcast {
    pub fn new() -> Self {
        let (tx, rx) = broadcast::channel(64);
        Self { tx, rx }
    }

    pub fn send(&self, notification: Notification) -> Result<()> {
        self.tx.send(notification)?;
        Ok(())
    }

    pub fn subscribe(&self) -> Receiver<Notification> {
        self.rx.resubscribe()
    }

    pub fn send_message(&self, message: Message) {
        _ = self.tx.send(Notification::Message { message });
    }

    pub fn send_error(&self, message: String) {
        self.send_message(Message::Error(message));
    }

    pub fn send_warning(&self, message: String) {
        self.send_message(Message::Warning(message));
    }
}

impl Default for NotificationBroadcast {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn subscribers_receive_messages_sent_after_subscribing() {
        let broadcast = NotificationBroadcast::new();
        let mut rx = broadcast.subscribe();

        broadcast.send_error("boom".to_string());

        assert_eq!(
            rx.recv().await.unwrap(),
            Notification::Message {
                message: Message::Error("boom".to_string())
            }
        );
    }
}
