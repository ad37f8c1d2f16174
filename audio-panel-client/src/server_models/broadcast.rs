use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Snapshot of the remote player, pushed to every connected client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SongBroadcast {
    #[serde(rename = "songID", alias = "SongID", alias = "songId")]
    pub song_id: String,
    #[serde(rename = "playlistID", alias = "PlaylistID", alias = "playlistId")]
    pub playlist_id: String,
    #[serde(default, alias = "Title")]
    pub title: String,
    #[serde(default, alias = "Album")]
    pub album: String,
    #[serde(default, alias = "Performer")]
    pub performer: String,
    #[serde(default, alias = "Cover")]
    pub cover: Option<String>,
    /// Hundredths of a percent through the track, 0 to 10000.
    #[serde(default, alias = "Position")]
    pub position: f64,
    #[serde(default, alias = "Duration")]
    pub duration: Option<f64>,
    #[serde(default, alias = "Volume")]
    pub volume: Option<f64>,
    #[serde(default, rename = "loop", alias = "Loop")]
    pub loop_enabled: Option<bool>,
    #[serde(default, alias = "Shuffle")]
    pub shuffle: Option<bool>,
    #[serde(default, alias = "Single")]
    pub single: Option<bool>,
    #[serde(alias = "Playing")]
    pub playing: bool,
    #[serde(alias = "Paused")]
    pub paused: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ServerMessage {
    Song(SongBroadcast),
    Networks(Vec<String>),
}

#[derive(Deserialize)]
struct Envelope {
    #[serde(rename = "SongBroadcastMessage")]
    song: Option<serde_json::Value>,
    #[serde(rename = "SsidMessage")]
    ssid: Option<Vec<String>>,
}

impl ServerMessage {
    /// Decodes one text frame. Either the whole message is valid or an error is returned.
    pub fn parse(text: &str) -> Result<Self> {
        let envelope: Envelope =
            serde_json::from_str(text).map_err(|error| Error::MalformedMessage {
                message: error.to_string(),
            })?;

        if let Some(song) = envelope.song {
            let song = serde_json::from_value(song).map_err(|error| Error::MalformedMessage {
                message: error.to_string(),
            })?;
            return Ok(ServerMessage::Song(song));
        }

        if let Some(ssids) = envelope.ssid {
            return Ok(ServerMessage::Networks(ssids));
        }

        Err(Error::MalformedMessage {
            message: "unknown message type".to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_lowercase_song_broadcast() {
        let message = ServerMessage::parse(
            r#"{"SongBroadcastMessage":{"songID":"s1","playlistID":"p1","curPlaylistID":"p1",
                "title":"Song","album":"Album","performer":"Band","cover":"/c.png",
                "position":2500,"loop":false,"shuffle":true,"playing":true,"paused":false,
                "volume":40,"single":false}}"#,
        )
        .unwrap();

        let ServerMessage::Song(song) = message else {
            panic!("expected song broadcast");
        };
        assert_eq!(song.song_id, "s1");
        assert_eq!(song.position, 2500.0);
        assert_eq!(song.shuffle, Some(true));
        assert_eq!(song.volume, Some(40.0));
        assert_eq!(song.duration, None);
    }

    #[test]
    fn parses_capitalised_song_broadcast() {
        let message = ServerMessage::parse(
            r#"{"SongBroadcastMessage":{"SongID":"s1","PlaylistID":"p1","Playing":false,"Paused":false,"Loop":true}}"#,
        )
        .unwrap();

        let ServerMessage::Song(song) = message else {
            panic!("expected song broadcast");
        };
        assert_eq!(song.playlist_id, "p1");
        assert_eq!(song.loop_enabled, Some(true));
        assert_eq!(song.title, "");
    }

    #[test]
    fn parses_ssid_message() {
        let message = ServerMessage::parse(r#"{"SsidMessage":["home","guest"]}"#).unwrap();
        assert_eq!(
            message,
            ServerMessage::Networks(vec!["home".to_string(), "guest".to_string()])
        );
    }

    #[test]
    fn rejects_missing_required_fields() {
        let result =
            ServerMessage::parse(r#"{"SongBroadcastMessage":{"songID":"s1","playing":true}}"#);
        assert!(matches!(result, Err(Error::MalformedMessage { .. })));
    }

    #[test]
    fn rejects_non_json_and_unknown_envelopes() {
        assert!(matches!(
            ServerMessage::parse("not json"),
            Err(Error::MalformedMessage { .. })
        ));
        assert!(matches!(
            ServerMessage::parse(r#"{"Other":1}"#),
            Err(Error::MalformedMessage { .. })
        ));
    }
}
