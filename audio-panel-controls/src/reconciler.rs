use std::time::Duration;

use audio_panel_models::{NowPlaying, PlaylistId, Track, TrackId};
use tracing::{debug, instrument};

use crate::{
    Error, Result,
    notification::Notification,
    playlist::PlaylistCache,
    state::{PlayerState, PlayerStateUpdate, Position, StateStore, Status},
};

/// What the display surface shows. Only re-emitted when it differs from the last projection.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct DisplayMirror {
    pub status: Status,
    pub track: Option<TrackId>,
    pub playlist: Option<PlaylistId>,
    pub now_playing: NowPlaying,
    pub position: Position,
    pub duration: Duration,
    pub volume: u8,
    pub shuffle: bool,
    pub loop_enabled: bool,
    pub single: bool,
    pub playing: bool,
    pub paused: bool,
}

impl From<&PlayerState> for DisplayMirror {
    fn from(state: &PlayerState) -> Self {
        Self {
            status: state.status(),
            track: state.track.clone(),
            playlist: state.playlist.clone(),
            now_playing: state.now_playing.clone(),
            position: state.position,
            duration: state.duration,
            volume: state.volume,
            shuffle: state.shuffle,
            loop_enabled: state.loop_enabled,
            single: state.single,
            playing: state.playing,
            paused: state.paused,
        }
    }
}

/// Side effects requested by the reconciler. The session carries them out.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    Notify(Notification),
    FetchPlaylist(PlaylistId),
}

/// What follows the end of the current track.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackEnd {
    Next { cursor: usize },
    Stop,
}

pub fn after_track_end(state: &PlayerState, playlist_len: usize) -> TrackEnd {
    if state.single {
        return TrackEnd::Stop;
    }

    let cursor = state.cursor + 1;
    if cursor < playlist_len {
        TrackEnd::Next { cursor }
    } else if state.loop_enabled && playlist_len > 0 {
        TrackEnd::Next { cursor: 0 }
    } else {
        TrackEnd::Stop
    }
}

/// Turns incoming snapshots into state transitions and the effects they imply.
#[derive(Debug, Default)]
pub struct Reconciler {
    store: StateStore,
    playlist: PlaylistCache,
    display: DisplayMirror,
}

impl Reconciler {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn state(&self) -> &PlayerState {
        self.store.state()
    }

    pub fn playlist(&self) -> &PlaylistCache {
        &self.playlist
    }

    pub fn playlist_mut(&mut self) -> &mut PlaylistCache {
        &mut self.playlist
    }

    pub fn display(&self) -> &DisplayMirror {
        &self.display
    }

    /// Applies one snapshot. Feeding the same snapshot twice yields no effects the second time.
    #[instrument(skip_all)]
    pub fn reconcile(&mut self, update: PlayerStateUpdate) -> Vec<Effect> {
        let old = self.store.state().clone();
        let new = self.store.apply(update);
        let mut effects = Vec::new();
        let mut cleared = false;

        if old.playing && !new.playing {
            debug!("playback stopped");
            effects.push(Effect::Notify(Notification::NowPlayingCleared));
            cleared = true;
        }

        if old.playlist != new.playlist {
            effects.push(Effect::Notify(Notification::PlaylistChanged {
                playlist: new.playlist.clone(),
            }));
            self.playlist.clear();

            match &new.playlist {
                Some(id) => {
                    debug!("playlist changed to {id}");
                    effects.push(Effect::FetchPlaylist(id.clone()));
                }
                None => {
                    debug!("playlist cleared");
                    effects.push(Effect::Notify(Notification::PlaylistCleared));
                }
            }

            if !cleared {
                effects.push(Effect::Notify(Notification::NowPlayingCleared));
            }
        } else if new.playing && (old.track != new.track || !old.playing) {
            if let Some(track) = &new.track {
                effects.push(Effect::Notify(Notification::SongChanged {
                    track: track.clone(),
                    now_playing: new.now_playing.clone(),
                }));
            }
        }

        if self.playlist.is_shuffled() != new.shuffle {
            self.playlist.shuffle(new.shuffle);
        }

        let display = DisplayMirror::from(&new);
        if display != self.display {
            self.display = display.clone();
            effects.push(Effect::Notify(Notification::Display { display }));
        }

        effects
    }

    /// Installs the tracks of a fetched playlist, provided it is still the current one.
    #[instrument(skip(self, tracks), fields(tracks = tracks.len()))]
    pub fn playlist_loaded(&mut self, id: PlaylistId, tracks: Vec<Track>) -> Result<Vec<Effect>> {
        let state = self.store.state();

        if state.playlist.as_ref() != Some(&id) {
            return Err(Error::StaleResponse {
                playlist: id.to_string(),
            });
        }

        let playing = state.playing;
        let track = state.track.clone();
        let now_playing = state.now_playing.clone();

        self.playlist.load(Some(id), tracks);

        let mut effects = Vec::new();
        if let Some(playlist) = self.playlist.playlist() {
            effects.push(Effect::Notify(Notification::PlaylistLoaded {
                playlist: playlist.clone(),
            }));
        }

        if playing && let Some(track) = track {
            effects.push(Effect::Notify(Notification::SongChanged { track, now_playing }));
        }

        Ok(effects)
    }

    /// Whether a fetch for `id` still matters.
    pub fn is_current(&self, id: &PlaylistId) -> bool {
        self.store.state().playlist.as_ref() == Some(id)
    }
}
