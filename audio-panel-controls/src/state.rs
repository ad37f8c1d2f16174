use std::time::Duration;

use audio_panel_client::SongBroadcast;
use audio_panel_models::{NowPlaying, PlaylistId, TrackId};

/// Upper bound of [`Position`]. The server reports progress in hundredths of a percent.
pub const POSITION_SCALE: u16 = 10_000;

/// Progress through the current track on a fixed `0..=10000` scale.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Position(u16);

impl Position {
    pub const START: Position = Position(0);

    pub fn new(value: u16) -> Self {
        Self(value.min(POSITION_SCALE))
    }

    /// Clamps a raw wire value. Values that are not numbers count as the start of the track.
    pub fn from_raw(raw: f64) -> Self {
        if raw.is_nan() {
            return Self::START;
        }

        Self(raw.round().clamp(0.0, POSITION_SCALE as f64) as u16)
    }

    pub fn from_progress(elapsed: Duration, duration: Duration) -> Self {
        if duration.is_zero() {
            return Self::START;
        }

        Self::from_raw(elapsed.as_secs_f64() / duration.as_secs_f64() * POSITION_SCALE as f64)
    }

    pub fn value(self) -> u16 {
        self.0
    }

    pub fn fraction(self) -> f64 {
        self.0 as f64 / POSITION_SCALE as f64
    }

    pub fn percent(self) -> u8 {
        (self.0 / 100) as u8
    }
}

#[derive(Default, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    #[default]
    Idle,
    PlaylistLoaded,
    Playing,
    Paused,
}

/// Everything known about the player, local or remote.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct PlayerState {
    pub track: Option<TrackId>,
    pub playlist: Option<PlaylistId>,
    pub now_playing: NowPlaying,
    pub position: Position,
    /// Zero while unknown.
    pub duration: Duration,
    pub volume: u8,
    pub shuffle: bool,
    pub loop_enabled: bool,
    pub single: bool,
    pub playing: bool,
    pub paused: bool,
    /// Index into the play order of the loaded playlist.
    pub cursor: usize,
}

impl PlayerState {
    pub fn status(&self) -> Status {
        match (self.playing, self.paused, &self.playlist) {
            (true, true, _) => Status::Paused,
            (true, false, _) => Status::Playing,
            (false, _, Some(_)) => Status::PlaylistLoaded,
            (false, _, None) => Status::Idle,
        }
    }

    /// Resets playback. The playlist and the toggles survive.
    pub fn stop(&mut self) {
        self.playing = false;
        self.paused = false;
        self.position = Position::START;
        self.duration = Duration::ZERO;
        self.cursor = 0;
        self.track = None;
        self.now_playing = NowPlaying::default();
    }
}

/// Partial update of a [`PlayerState`]. Fields left as `None` keep their current value.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct PlayerStateUpdate {
    pub track: Option<Option<TrackId>>,
    pub playlist: Option<Option<PlaylistId>>,
    pub now_playing: Option<NowPlaying>,
    pub position: Option<Position>,
    pub duration: Option<Duration>,
    pub volume: Option<u8>,
    pub shuffle: Option<bool>,
    pub loop_enabled: Option<bool>,
    pub single: Option<bool>,
    pub playing: Option<bool>,
    pub paused: Option<bool>,
    pub cursor: Option<usize>,
}

impl From<SongBroadcast> for PlayerStateUpdate {
    fn from(song: SongBroadcast) -> Self {
        Self {
            track: Some(TrackId::parse(&song.song_id)),
            playlist: Some(PlaylistId::parse(&song.playlist_id)),
            now_playing: Some(NowPlaying {
                title: song.title,
                album: song.album,
                performer: song.performer,
                cover: song.cover.filter(|cover| !cover.is_empty()),
            }),
            position: Some(Position::from_raw(song.position)),
            duration: song
                .duration
                .filter(|seconds| *seconds > 0.0)
                .and_then(|seconds| Duration::try_from_secs_f64(seconds).ok()),
            volume: song
                .volume
                .filter(|volume| volume.is_finite())
                .map(|volume| volume.round().clamp(0.0, 100.0) as u8),
            shuffle: song.shuffle,
            loop_enabled: song.loop_enabled,
            single: song.single,
            playing: Some(song.playing),
            paused: Some(song.paused),
            cursor: None,
        }
    }
}

impl From<&PlayerState> for PlayerStateUpdate {
    fn from(state: &PlayerState) -> Self {
        Self {
            track: Some(state.track.clone()),
            playlist: Some(state.playlist.clone()),
            now_playing: Some(state.now_playing.clone()),
            position: Some(state.position),
            duration: Some(state.duration),
            volume: Some(state.volume),
            shuffle: Some(state.shuffle),
            loop_enabled: Some(state.loop_enabled),
            single: Some(state.single),
            playing: Some(state.playing),
            paused: Some(state.paused),
            cursor: Some(state.cursor),
        }
    }
}

/// The single canonical [`PlayerState`] of a session.
#[derive(Debug, Default)]
pub struct StateStore {
    state: PlayerState,
}

impl StateStore {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn state(&self) -> &PlayerState {
        &self.state
    }

    /// Merges `update` field by field and returns the resulting state.
    ///
    /// A zero duration never replaces a known one, except when playback stops.
    /// Stopping also rewinds position and cursor and forgets the current track.
    pub fn apply(&mut self, update: PlayerStateUpdate) -> PlayerState {
        let was_playing = self.state.playing;
        let state = &mut self.state;

        if let Some(track) = update.track {
            state.track = track;
        }
        if let Some(playlist) = update.playlist {
            state.playlist = playlist;
        }
        if let Some(now_playing) = update.now_playing {
            state.now_playing = now_playing;
        }
        if let Some(position) = update.position {
            state.position = position;
        }
        if let Some(duration) = update.duration.filter(|duration| !duration.is_zero()) {
            state.duration = duration;
        }
        if let Some(volume) = update.volume {
            state.volume = volume.min(100);
        }
        if let Some(shuffle) = update.shuffle {
            state.shuffle = shuffle;
        }
        if let Some(loop_enabled) = update.loop_enabled {
            state.loop_enabled = loop_enabled;
        }
        if let Some(single) = update.single {
            state.single = single;
        }
        if let Some(playing) = update.playing {
            state.playing = playing;
        }
        if let Some(paused) = update.paused {
            state.paused = paused;
        }
        if let Some(cursor) = update.cursor {
            state.cursor = cursor;
        }

        if !state.playing {
            state.paused = false;
        }

        if was_playing && !state.playing {
            state.position = Position::START;
            state.duration = Duration::ZERO;
            state.cursor = 0;
            state.track = None;
        }

        self.state.clone()
    }
}
