use std::fmt;

/// Identifier the server uses to mean "nothing selected".
pub const NIL_ID: &str = "00000000-0000-0000-0000-000000000000";

macro_rules! identifier {
    ($name:ident) => {
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Deserialize, serde::Serialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Parses a raw identifier. Empty strings and the nil UUID yield `None`.
            pub fn parse(raw: &str) -> Option<Self> {
                let raw = raw.trim();
                if raw.is_empty() || raw == NIL_ID {
                    None
                } else {
                    Some(Self(raw.to_string()))
                }
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

identifier!(TrackId);
identifier!(PlaylistId);

#[derive(Debug, Clone, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
pub struct Track {
    pub id: TrackId,
    pub title: String,
    pub album: String,
    pub performer: String,
    pub cover: Option<String>,
    pub url: Option<String>,
    pub track_number: Option<u32>,
}

impl Track {
    /// Location the audio for this track is streamed from.
    pub fn stream_url(&self, base: &str) -> String {
        match &self.url {
            Some(url) if url.starts_with("http://") || url.starts_with("https://") => url.clone(),
            _ => format!("{}/audio/{}", base.trim_end_matches('/'), self.id),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
pub struct Playlist {
    pub id: PlaylistId,
    pub tracks: Vec<Track>,
}

impl Playlist {
    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
pub struct AlbumSummary {
    pub id: PlaylistId,
    pub album: String,
    pub performer: String,
    pub cover: Option<String>,
    /// Set for performer groups; selecting one narrows the album search instead of playing.
    pub selector: Option<String>,
}

/// What the now-playing panel shows.
#[derive(Debug, Default, Clone, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
pub struct NowPlaying {
    pub title: String,
    pub album: String,
    pub performer: String,
    pub cover: Option<String>,
}

impl From<&Track> for NowPlaying {
    fn from(track: &Track) -> Self {
        Self {
            title: track.title.clone(),
            album: track.album.clone(),
            performer: track.performer.clone(),
            cover: track.cover.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn track(url: Option<&str>) -> Track {
        Track {
            id: TrackId::parse("a1").unwrap(),
            title: "Title".into(),
            album: "Album".into(),
            performer: "Performer".into(),
            cover: None,
            url: url.map(str::to_string),
            track_number: Some(1),
        }
    }

    #[test]
    fn nil_and_empty_identifiers_are_none() {
        assert_eq!(TrackId::parse(NIL_ID), None);
        assert_eq!(PlaylistId::parse(""), None);
        assert_eq!(PlaylistId::parse(" p1 ").unwrap().as_str(), "p1");
    }

    #[test]
    fn stream_url_prefers_absolute_track_url() {
        assert_eq!(
            track(Some("https://radio.example/stream")).stream_url("http://host"),
            "https://radio.example/stream"
        );
        assert_eq!(
            track(Some("/music/a.mp3")).stream_url("http://host/"),
            "http://host/audio/a1"
        );
        assert_eq!(track(None).stream_url("http://host"), "http://host/audio/a1");
    }

    #[test]
    fn identifiers_serialize_as_plain_strings() {
        let id = TrackId::parse("abc").unwrap();
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"abc\"");
    }
}
