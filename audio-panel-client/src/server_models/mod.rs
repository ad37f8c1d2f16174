use audio_panel_models::{AlbumSummary, PlaylistId, Track, TrackId};
use serde::{Deserialize, Serialize};
use tracing::debug;

pub mod broadcast;

/// Track metadata as the database and playlist endpoints report it.
///
/// Server revisions disagree on casing (`uid` / `Uid`) and even spelling
/// (`titel`), so every field accepts all variants seen in the wild.
#[derive(Default, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackInfo {
    #[serde(default, alias = "Uid")]
    pub uid: String,
    #[serde(default, alias = "Title", alias = "titel")]
    pub title: String,
    #[serde(default, alias = "Album")]
    pub album: String,
    #[serde(default, alias = "Performer")]
    pub performer: String,
    #[serde(default, alias = "Cover")]
    pub cover: Option<String>,
    #[serde(default, alias = "Url")]
    pub url: Option<String>,
    #[serde(default, rename = "trackNo", alias = "TrackNo")]
    pub track_no: Option<TrackNumber>,
}

/// Track numbers arrive either as numbers or as strings like `"3/12"`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TrackNumber {
    Number(u32),
    Text(String),
}

impl TrackNumber {
    fn value(&self) -> Option<u32> {
        match self {
            TrackNumber::Number(number) => Some(*number),
            TrackNumber::Text(text) => text.split('/').next()?.trim().parse().ok(),
        }
    }
}

impl TrackInfo {
    pub fn into_track(self) -> Option<Track> {
        let Some(id) = TrackId::parse(&self.uid) else {
            debug!("dropping track without identifier: {}", self.title);
            return None;
        };

        Some(Track {
            id,
            title: self.title,
            album: self.album,
            performer: self.performer,
            cover: self.cover.filter(|c| !c.is_empty()),
            url: self.url.filter(|u| !u.is_empty()),
            track_number: self.track_no.and_then(|n| n.value()),
        })
    }
}

#[derive(Default, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlbumInfo {
    #[serde(default, alias = "Uid")]
    pub uid: String,
    #[serde(default, alias = "Album")]
    pub album: String,
    #[serde(default, alias = "Performer")]
    pub performer: String,
    #[serde(default, alias = "Cover")]
    pub cover: Option<String>,
}

const PERFORMER_GROUP_SUFFIX: &str = " u";

/// Orders albums by performer, then album name, and unfolds performer groups.
pub fn parse_album_list(mut albums: Vec<AlbumInfo>) -> Vec<AlbumSummary> {
    albums.sort_by(|a, b| {
        a.performer
            .cmp(&b.performer)
            .then_with(|| a.album.cmp(&b.album))
    });

    albums
        .into_iter()
        .filter_map(|info| {
            let id = PlaylistId::parse(&info.uid)?;

            let (album, performer, selector) = match info.album.strip_suffix(PERFORMER_GROUP_SUFFIX)
            {
                Some(album) => (album.to_string(), String::new(), Some(info.performer)),
                None => (info.album, info.performer, None),
            };

            Some(AlbumSummary {
                id,
                album,
                performer,
                cover: info.cover.filter(|c| !c.is_empty()),
                selector,
            })
        })
        .collect()
}

/// Reply of the command style endpoints.
#[derive(Default, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandResult {
    pub result: String,
}

impl CommandResult {
    pub fn is_ok(&self) -> bool {
        self.result == "ok"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn track_info_accepts_both_casings() {
        let lower: TrackInfo = serde_json::from_str(
            r#"{"uid":"t1","titel":"Song","album":"A","performer":"P","cover":"/c.png","trackNo":"3/12"}"#,
        )
        .unwrap();
        let upper: TrackInfo = serde_json::from_str(
            r#"{"Uid":"t1","Title":"Song","Album":"A","Performer":"P","Cover":"/c.png","TrackNo":3}"#,
        )
        .unwrap();

        let lower = lower.into_track().unwrap();
        let upper = upper.into_track().unwrap();
        assert_eq!(lower, upper);
        assert_eq!(lower.track_number, Some(3));
    }

    #[test]
    fn tracks_without_identifier_are_dropped() {
        let info = TrackInfo {
            uid: audio_panel_models::NIL_ID.into(),
            ..Default::default()
        };
        assert!(info.into_track().is_none());
    }

    #[test]
    fn album_list_is_sorted_and_groups_unfolded() {
        let albums = vec![
            AlbumInfo {
                uid: "2".into(),
                album: "Zeta".into(),
                performer: "Band".into(),
                cover: None,
            },
            AlbumInfo {
                uid: "3".into(),
                album: "Collection u".into(),
                performer: "Artist".into(),
                cover: Some(String::new()),
            },
            AlbumInfo {
                uid: "1".into(),
                album: "Alpha".into(),
                performer: "Band".into(),
                cover: Some("/a.png".into()),
            },
        ];

        let parsed = parse_album_list(albums);
        let ids: Vec<_> = parsed.iter().map(|a| a.id.as_str()).collect();
        assert_eq!(ids, vec!["3", "1", "2"]);

        assert_eq!(parsed[0].album, "Collection");
        assert_eq!(parsed[0].performer, "");
        assert_eq!(parsed[0].selector.as_deref(), Some("Artist"));
        assert_eq!(parsed[0].cover, None);
        assert_eq!(parsed[1].selector, None);
    }
}
