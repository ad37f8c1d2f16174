use audio_panel_models::{Playlist, PlaylistId, Track, TrackId};
use rand::{Rng, seq::SliceRandom};
use tracing::{debug, instrument};

use crate::{Error, Result};

/// The tracks of the current playlist and the order they are played in.
///
/// The playlist itself is only ever replaced as a whole. Shuffling permutes
/// the play order, never the tracks.
#[derive(Default, Debug, Clone, PartialEq)]
pub struct PlaylistCache {
    playlist: Option<Playlist>,
    order: Vec<usize>,
    shuffled: bool,
}

impl PlaylistCache {
    pub fn new() -> Self {
        Default::default()
    }

    /// Replaces the cached playlist. A missing id leaves the cache empty.
    #[instrument(skip(self, tracks), fields(tracks = tracks.len()))]
    pub fn load(&mut self, id: Option<PlaylistId>, tracks: Vec<Track>) {
        self.load_with(id, tracks, &mut rand::rng());
    }

    pub fn load_with<R: Rng + ?Sized>(
        &mut self,
        id: Option<PlaylistId>,
        tracks: Vec<Track>,
        rng: &mut R,
    ) {
        let Some(id) = id else {
            self.clear();
            return;
        };

        if tracks.is_empty() {
            debug!("playlist {id} is empty");
        }

        self.playlist = Some(Playlist { id, tracks });
        self.derive_order(rng);
    }

    pub fn clear(&mut self) {
        self.playlist = None;
        self.order.clear();
    }

    pub fn id(&self) -> Option<&PlaylistId> {
        self.playlist.as_ref().map(|playlist| &playlist.id)
    }

    pub fn playlist(&self) -> Option<&Playlist> {
        self.playlist.as_ref()
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn is_shuffled(&self) -> bool {
        self.shuffled
    }

    /// Track indices in play order.
    pub fn order(&self) -> &[usize] {
        &self.order
    }

    /// Recomputes the play order: a fresh random permutation when enabled, the
    /// identity otherwise.
    pub fn shuffle(&mut self, enabled: bool) -> &[usize] {
        self.shuffle_with(enabled, &mut rand::rng())
    }

    pub fn shuffle_with<R: Rng + ?Sized>(&mut self, enabled: bool, rng: &mut R) -> &[usize] {
        self.shuffled = enabled;
        self.derive_order(rng);
        &self.order
    }

    fn derive_order<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        let len = self.playlist.as_ref().map_or(0, Playlist::len);
        self.order = (0..len).collect();

        if self.shuffled {
            self.order.shuffle(rng);
        }
    }

    /// Track index at `cursor` in the play order.
    pub fn index_at(&self, cursor: usize) -> Option<usize> {
        self.order.get(cursor).copied()
    }

    pub fn track_at(&self, cursor: usize) -> Result<&Track> {
        self.index_at(cursor)
            .and_then(|index| self.playlist.as_ref()?.tracks.get(index))
            .ok_or_else(|| Error::NotFound {
                what: format!("Track at position {cursor}"),
            })
    }

    /// Play order position of the track at `index`.
    pub fn cursor_of_index(&self, index: usize) -> Option<usize> {
        self.order.iter().position(|i| *i == index)
    }

    /// Play order position of a track.
    pub fn cursor_of(&self, id: &TrackId) -> Option<usize> {
        let index = self
            .playlist
            .as_ref()?
            .tracks
            .iter()
            .position(|track| &track.id == id)?;

        self.cursor_of_index(index)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use rand::{SeedableRng, rngs::StdRng};

    pub(crate) fn track(id: &str) -> Track {
        Track {
            id: TrackId::parse(id).unwrap(),
            title: format!("Title {id}"),
            album: "Album".into(),
            performer: "Performer".into(),
            cover: None,
            url: None,
            track_number: None,
        }
    }

    pub(crate) fn tracks(n: usize) -> Vec<Track> {
        (0..n).map(|i| track(&format!("t{i}"))).collect()
    }

    #[test]
    fn shuffle_disabled_is_identity() {
        for n in [0, 1, 2, 7] {
            let mut cache = PlaylistCache::new();
            cache.load(PlaylistId::parse("p1"), tracks(n));
            let order = cache.shuffle(false).to_vec();
            assert_eq!(order, (0..n).collect::<Vec<_>>());
        }
    }

    #[test]
    fn shuffle_is_a_permutation() {
        let mut rng = StdRng::seed_from_u64(7);

        for n in [0, 1, 2, 10, 57] {
            let mut cache = PlaylistCache::new();
            cache.load(PlaylistId::parse("p1"), tracks(n));

            let mut order = cache.shuffle_with(true, &mut rng).to_vec();
            assert_eq!(order.len(), n);

            order.sort_unstable();
            assert_eq!(order, (0..n).collect::<Vec<_>>());
        }
    }

    #[test]
    fn shuffle_never_touches_tracks() {
        let mut cache = PlaylistCache::new();
        cache.load(PlaylistId::parse("p1"), tracks(5));
        let before = cache.playlist().cloned();

        cache.shuffle_with(true, &mut StdRng::seed_from_u64(1));
        assert_eq!(cache.playlist().cloned(), before);
    }

    #[test]
    fn load_keeps_shuffle_setting() {
        let mut cache = PlaylistCache::new();
        cache.shuffle(true);
        cache.load(PlaylistId::parse("p1"), tracks(4));

        assert!(cache.is_shuffled());
        assert_eq!(cache.len(), 4);
    }

    #[test]
    fn missing_id_clears_cache() {
        let mut cache = PlaylistCache::new();
        cache.load(PlaylistId::parse("p1"), tracks(3));
        cache.load(None, tracks(3));

        assert!(cache.playlist().is_none());
        assert!(cache.is_empty());
    }

    #[test]
    fn empty_playlist_is_loaded_but_has_no_tracks() {
        let mut cache = PlaylistCache::new();
        cache.load(PlaylistId::parse("p1"), vec![]);

        assert_eq!(cache.id(), PlaylistId::parse("p1").as_ref());
        assert!(matches!(cache.track_at(0), Err(Error::NotFound { .. })));
    }

    #[test]
    fn lookups_follow_play_order() {
        let mut cache = PlaylistCache::new();
        cache.load(PlaylistId::parse("p1"), tracks(6));
        cache.shuffle_with(true, &mut StdRng::seed_from_u64(42));

        for cursor in 0..6 {
            let track = cache.track_at(cursor).unwrap().clone();
            assert_eq!(cache.cursor_of(&track.id), Some(cursor));
        }
        assert!(cache.track_at(6).is_err());
        assert_eq!(cache.cursor_of(&TrackId::parse("missing").unwrap()), None);
    }
}
