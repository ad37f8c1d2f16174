use std::time::Duration;

use audio_panel_models::{NowPlaying, PlaylistId, Track, TrackId};
use tracing::{debug, info, instrument};

use crate::{
    Error, Result,
    output::AudioOutput,
    playlist::PlaylistCache,
    reconciler::{TrackEnd, after_track_end},
    state::{PlayerState, PlayerStateUpdate, Position},
};

const JUMP: Duration = Duration::from_secs(10);
const RESTART_THRESHOLD: Duration = Duration::from_secs(1);

/// Plays the cached playlist on this device.
///
/// Commands update the local mirror optimistically; the session feeds
/// [`LocalTransport::snapshot`] through the reconciler afterwards.
pub struct LocalTransport<O> {
    output: O,
    base_url: String,
    mirror: PlayerState,
    generation: u64,
    ended: Option<u64>,
}

impl<O: AudioOutput> LocalTransport<O> {
    pub fn new(mut output: O, base_url: &str, volume: u8) -> Self {
        let volume = volume.min(100);
        output.set_volume(volume);

        Self {
            output,
            base_url: base_url.to_string(),
            mirror: PlayerState {
                volume,
                ..Default::default()
            },
            generation: 0,
            ended: None,
        }
    }

    pub fn mirror(&self) -> &PlayerState {
        &self.mirror
    }

    pub fn snapshot(&self) -> PlayerStateUpdate {
        PlayerStateUpdate::from(&self.mirror)
    }

    pub fn output(&self) -> &O {
        &self.output
    }

    /// Refreshes position and duration from the output.
    pub fn sample(&mut self) {
        if self.mirror.playing {
            let duration = self.output.duration().unwrap_or_default();
            self.mirror.duration = duration;
            self.mirror.position = Position::from_progress(self.output.position(), duration);
        } else {
            self.mirror.position = Position::START;
            self.mirror.duration = Duration::ZERO;
        }
    }

    #[instrument(skip(self, track), fields(id = %track.id))]
    fn play_track(&mut self, track: &Track, cursor: usize) -> Result<()> {
        self.generation += 1;

        self.mirror.position = Position::START;
        self.mirror.duration = Duration::ZERO;
        self.mirror.playing = true;
        self.mirror.paused = false;
        self.mirror.cursor = cursor;
        self.mirror.track = Some(track.id.clone());
        self.mirror.now_playing = NowPlaying::from(track);

        let url = track.stream_url(&self.base_url);
        if let Err(error) = self.output.load(&url, self.generation) {
            self.stop();
            return Err(error);
        }
        self.output.play();

        Ok(())
    }

    fn play_cursor(&mut self, playlist: &PlaylistCache, cursor: usize) -> Result<()> {
        let track = playlist.track_at(cursor)?.clone();
        self.play_track(&track, cursor)
    }

    /// Starts from the current cursor when stopped, otherwise toggles pause.
    pub fn play_pause(&mut self, playlist: &PlaylistCache) -> Result<()> {
        if !self.mirror.playing {
            self.play_cursor(playlist, self.mirror.cursor)
        } else if self.mirror.paused {
            self.resume();
            Ok(())
        } else {
            self.pause();
            Ok(())
        }
    }

    pub fn pause(&mut self) {
        if self.mirror.playing && !self.mirror.paused {
            self.output.pause();
            self.mirror.paused = true;
        }
    }

    pub fn resume(&mut self) {
        if self.mirror.playing && self.mirror.paused {
            self.output.play();
            self.mirror.paused = false;
        }
    }

    pub fn stop(&mut self) {
        self.output.stop();
        self.mirror.stop();
    }

    /// Seeks to a fraction of the current track. Ignored until the duration is known.
    pub fn seek(&mut self, fraction: f64) -> Result<()> {
        let Some(duration) = self.output.duration() else {
            debug!("duration unknown, not seeking");
            return Ok(());
        };
        if !self.mirror.playing {
            return Ok(());
        }

        let fraction = if fraction.is_finite() {
            fraction.clamp(0.0, 1.0)
        } else {
            0.0
        };
        self.output.seek(duration.mul_f64(fraction))
    }

    pub fn jump_forward(&mut self) -> Result<()> {
        if !self.mirror.playing {
            return Ok(());
        }

        let target = self.output.position() + JUMP;
        match self.output.duration() {
            Some(duration) if target >= duration => Ok(()),
            _ => self.output.seek(target),
        }
    }

    pub fn jump_backward(&mut self) -> Result<()> {
        if !self.mirror.playing {
            return Ok(());
        }

        let target = self.output.position().saturating_sub(JUMP);
        self.output.seek(target)
    }

    pub fn set_volume(&mut self, volume: u8) {
        let volume = volume.min(100);
        self.mirror.volume = volume;
        self.output.set_volume(volume);
    }

    pub fn next(&mut self, playlist: &PlaylistCache) -> Result<()> {
        if !self.mirror.playing {
            return Ok(());
        }

        self.advance(playlist)
    }

    /// Restarts the track when past its first second, otherwise steps back.
    pub fn previous(&mut self, playlist: &PlaylistCache) -> Result<()> {
        if !self.mirror.playing {
            return Ok(());
        }

        if self.output.position() > RESTART_THRESHOLD {
            return self.output.seek(Duration::ZERO);
        }

        let cursor = self.mirror.cursor.saturating_sub(1);
        self.play_cursor(playlist, cursor)
    }

    pub fn toggle_loop(&mut self) {
        self.mirror.loop_enabled = !self.mirror.loop_enabled;
    }

    pub fn toggle_single(&mut self) {
        self.mirror.single = !self.mirror.single;
    }

    /// Reorders the playlist, keeping the cursor on the playing track.
    pub fn toggle_shuffle(&mut self, playlist: &mut PlaylistCache) {
        let playing_index = self
            .mirror
            .playing
            .then(|| playlist.index_at(self.mirror.cursor))
            .flatten();

        self.mirror.shuffle = !self.mirror.shuffle;
        playlist.shuffle(self.mirror.shuffle);

        self.mirror.cursor = playing_index
            .and_then(|index| playlist.cursor_of_index(index))
            .unwrap_or(0);
    }

    pub fn select_track(&mut self, id: &TrackId, playlist: &PlaylistCache) -> Result<()> {
        let cursor = playlist.cursor_of(id).ok_or_else(|| Error::NotFound {
            what: format!("Track {id}"),
        })?;

        self.play_cursor(playlist, cursor)
    }

    /// Switches playlists. Playback stops; the tracks arrive once the reconciler has fetched them.
    pub fn select_playlist(&mut self, id: PlaylistId) {
        info!("selecting playlist {id}");
        self.stop();
        self.mirror.playlist = Some(id);
    }

    /// Handles the end of a track. Each load ends at most once; anything else is ignored.
    pub fn track_ended(&mut self, generation: u64, playlist: &PlaylistCache) -> Result<bool> {
        if generation != self.generation
            || self.ended == Some(generation)
            || !self.mirror.playing
        {
            debug!("ignoring end of track {generation}");
            return Ok(false);
        }

        self.ended = Some(generation);
        self.advance(playlist)?;

        Ok(true)
    }

    fn advance(&mut self, playlist: &PlaylistCache) -> Result<()> {
        match after_track_end(&self.mirror, playlist.len()) {
            TrackEnd::Next { cursor } => self.play_cursor(playlist, cursor),
            TrackEnd::Stop => {
                self.stop();
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::tests::{Call, FakeOutput};
    use crate::playlist::tests::tracks;

    fn loaded(n: usize) -> PlaylistCache {
        let mut playlist = PlaylistCache::new();
        playlist.load(PlaylistId::parse("p1"), tracks(n));
        playlist
    }

    fn transport() -> LocalTransport<FakeOutput> {
        let mut transport = LocalTransport::new(FakeOutput::default(), "http://host", 50);
        transport.select_playlist(PlaylistId::parse("p1").unwrap());
        transport
    }

    fn loads(transport: &LocalTransport<FakeOutput>) -> Vec<String> {
        transport
            .output()
            .calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::Load { url, .. } => Some(url),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn play_resets_mirror_before_output_plays() {
        let playlist = loaded(3);
        let mut transport = transport();
        transport.mirror.position = Position::new(4000);

        transport.play_pause(&playlist).unwrap();

        let mirror = transport.mirror();
        assert!(mirror.playing);
        assert!(!mirror.paused);
        assert_eq!(mirror.position, Position::START);
        assert_eq!(mirror.track, TrackId::parse("t0"));
        assert_eq!(mirror.now_playing.title, "Title t0");
        assert_eq!(loads(&transport), vec!["http://host/audio/t0".to_string()]);
        assert_eq!(transport.output().calls().last(), Some(&Call::Play));
    }

    #[test]
    fn play_pause_toggles() {
        let playlist = loaded(2);
        let mut transport = transport();

        transport.play_pause(&playlist).unwrap();
        transport.play_pause(&playlist).unwrap();
        assert!(transport.mirror().paused);

        transport.play_pause(&playlist).unwrap();
        assert!(!transport.mirror().paused);
        assert_eq!(loads(&transport).len(), 1);
    }

    #[test]
    fn ended_events_walk_playlist_then_stop() {
        let playlist = loaded(3);
        let mut transport = transport();
        transport.play_pause(&playlist).unwrap();

        let mut cursors = vec![transport.mirror().cursor];
        while transport.mirror().playing {
            let generation = transport.generation;
            assert!(transport.track_ended(generation, &playlist).unwrap());
            if transport.mirror().playing {
                cursors.push(transport.mirror().cursor);
            }
        }

        assert_eq!(cursors, vec![0, 1, 2]);
        let mirror = transport.mirror();
        assert_eq!(mirror.cursor, 0);
        assert_eq!(mirror.track, None);
        assert_eq!(mirror.position, Position::START);
        assert_eq!(mirror.duration, Duration::ZERO);
    }

    #[test]
    fn single_mode_stops_after_one_track() {
        let playlist = loaded(4);
        let mut transport = transport();
        transport.toggle_single();
        transport.play_pause(&playlist).unwrap();

        let generation = transport.generation;
        transport.track_ended(generation, &playlist).unwrap();

        assert!(!transport.mirror().playing);
        assert_eq!(loads(&transport).len(), 1);
    }

    #[test]
    fn duplicate_and_stale_end_events_are_ignored() {
        let playlist = loaded(4);
        let mut transport = transport();
        transport.play_pause(&playlist).unwrap();
        let first = transport.generation;

        assert!(transport.track_ended(first, &playlist).unwrap());
        assert!(!transport.track_ended(first, &playlist).unwrap());
        assert_eq!(transport.mirror().cursor, 1);

        let second = transport.generation;
        assert!(transport.track_ended(second, &playlist).unwrap());
        assert!(!transport.track_ended(second, &playlist).unwrap());
        assert_eq!(transport.mirror().cursor, 2);
    }

    #[test]
    fn loop_wraps_to_first_track() {
        let playlist = loaded(2);
        let mut transport = transport();
        transport.toggle_loop();
        transport.play_pause(&playlist).unwrap();

        transport.next(&playlist).unwrap();
        transport.next(&playlist).unwrap();

        assert!(transport.mirror().playing);
        assert_eq!(transport.mirror().cursor, 0);
    }

    #[test]
    fn previous_restarts_or_steps_back() {
        let playlist = loaded(3);
        let mut transport = transport();
        transport.select_track(&TrackId::parse("t2").unwrap(), &playlist).unwrap();

        transport.output.position = Duration::from_secs(5);
        transport.previous(&playlist).unwrap();
        assert_eq!(transport.mirror().cursor, 2);
        assert_eq!(
            transport.output().calls().last(),
            Some(&Call::Seek(Duration::ZERO))
        );

        transport.previous(&playlist).unwrap();
        assert_eq!(transport.mirror().cursor, 1);
    }

    #[test]
    fn unknown_track_is_not_found() {
        let playlist = loaded(2);
        let mut transport = transport();

        let result = transport.select_track(&TrackId::parse("nope").unwrap(), &playlist);
        assert!(matches!(result, Err(Error::NotFound { .. })));
        assert!(!transport.mirror().playing);
    }

    #[test]
    fn play_on_empty_playlist_is_not_found() {
        let playlist = loaded(0);
        let mut transport = transport();

        assert!(matches!(
            transport.play_pause(&playlist),
            Err(Error::NotFound { .. })
        ));
    }

    #[test]
    fn seek_waits_for_duration() {
        let playlist = loaded(1);
        let mut transport = transport();
        transport.play_pause(&playlist).unwrap();

        transport.seek(0.5).unwrap();
        assert!(!transport.output().calls().iter().any(|c| matches!(c, Call::Seek(_))));

        transport.output.duration = Some(Duration::from_secs(100));
        transport.seek(0.5).unwrap();
        assert_eq!(
            transport.output().calls().last(),
            Some(&Call::Seek(Duration::from_secs(50)))
        );
    }

    #[test]
    fn sample_tracks_output_progress() {
        let playlist = loaded(1);
        let mut transport = transport();
        transport.play_pause(&playlist).unwrap();
        transport.output.duration = Some(Duration::from_secs(200));
        transport.output.position = Duration::from_secs(50);

        transport.sample();
        assert_eq!(transport.mirror().position.value(), 2500);
        assert_eq!(transport.mirror().duration, Duration::from_secs(200));
    }

    #[test]
    fn shuffle_keeps_playing_track_under_cursor() {
        let mut playlist = loaded(8);
        let mut transport = transport();
        transport.select_track(&TrackId::parse("t5").unwrap(), &playlist).unwrap();

        transport.toggle_shuffle(&mut playlist);

        let cursor = transport.mirror().cursor;
        assert_eq!(playlist.track_at(cursor).unwrap().id, TrackId::parse("t5").unwrap());
        assert!(transport.mirror().shuffle);
    }

    #[test]
    fn selecting_playlist_stops_and_resets() {
        let playlist = loaded(3);
        let mut transport = transport();
        transport.select_track(&TrackId::parse("t1").unwrap(), &playlist).unwrap();

        transport.select_playlist(PlaylistId::parse("p2").unwrap());

        let mirror = transport.mirror();
        assert!(!mirror.playing);
        assert_eq!(mirror.cursor, 0);
        assert_eq!(mirror.playlist, PlaylistId::parse("p2"));
        assert_eq!(transport.output().calls().last(), Some(&Call::Stop));
    }
}
