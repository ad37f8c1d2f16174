use crate::{
    Error, Result,
    server_models::{AlbumInfo, CommandResult, TrackInfo, parse_album_list},
    socket::Socket,
};
use audio_panel_models::{AlbumSummary, PlaylistId, Track, TrackId};
use reqwest::{Method, Response, StatusCode, multipart};
use std::{fmt::Display, path::Path};
use tracing::{debug, instrument, warn};
use url::Url;

const UPLOAD_CHUNK_SIZE: usize = 64 * 1024;

#[derive(Debug, Clone)]
pub struct Client {
    base_url: Url,
    client: reqwest::Client,
}

pub fn new(base_url: &str) -> Result<Client> {
    let base_url = Url::parse(base_url)?;

    if !matches!(base_url.scheme(), "http" | "https") {
        return Err(Error::InvalidUrl {
            message: format!("unsupported scheme {}", base_url.scheme()),
        });
    }

    let http_client = reqwest::Client::builder().build()?;

    Ok(Client {
        base_url,
        client: http_client,
    })
}

enum Endpoint {
    Database,
    Playlist,
    Player,
    Upload,
    Wifi,
    Dynamic,
}

impl Display for Endpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let endpoint = match self {
            Endpoint::Database => "database",
            Endpoint::Playlist => "playlist",
            Endpoint::Player => "player",
            Endpoint::Upload => "upload",
            Endpoint::Wifi => "wifi",
            Endpoint::Dynamic => "dynamic",
        };

        f.write_str(endpoint)
    }
}

/// Fire-and-forget commands understood by the remote player.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlayerCommand {
    Play,
    Stop,
    Pause,
    Next,
    Previous,
    ToggleLoop,
    ToggleShuffle,
    ToggleSingle,
    FastForward,
    FastBackward,
    Volume(u8),
    /// Percent through the current track.
    ToPosition(u8),
    Select(TrackId),
}

impl PlayerCommand {
    pub fn query(&self) -> (&'static str, String) {
        let flag = |name: &'static str| (name, "true".to_string());

        match self {
            PlayerCommand::Play => flag("play"),
            PlayerCommand::Stop => flag("stop"),
            PlayerCommand::Pause => flag("pause"),
            PlayerCommand::Next => flag("next"),
            PlayerCommand::Previous => flag("prev"),
            PlayerCommand::ToggleLoop => flag("toggleLoop"),
            PlayerCommand::ToggleShuffle => flag("toggleShuffle"),
            PlayerCommand::ToggleSingle => flag("toggleSingle"),
            PlayerCommand::FastForward => flag("fastForward"),
            PlayerCommand::FastBackward => flag("fastBackward"),
            PlayerCommand::Volume(volume) => ("volume", (*volume).min(100).to_string()),
            PlayerCommand::ToPosition(percent) => ("toPosition", (*percent).min(100).to_string()),
            PlayerCommand::Select(id) => ("select", id.to_string()),
        }
    }
}

macro_rules! get {
    ($self:ident, $endpoint:expr, $params:expr) => {
        match $self.make_call(Method::GET, $endpoint, $params).await {
            Ok(response) => match serde_json::from_str(response.as_str()) {
                Ok(item) => Ok(item),
                Err(error) => Err(Error::DeserializeJSON {
                    message: error.to_string(),
                }),
            },
            Err(error) => Err(error),
        }
    };
}

macro_rules! post {
    ($self:ident, $endpoint:expr, $params:expr) => {
        match $self.make_call(Method::POST, $endpoint, $params).await {
            Ok(response) => match serde_json::from_str(response.as_str()) {
                Ok(item) => Ok(item),
                Err(error) => Err(Error::DeserializeJSON {
                    message: error.to_string(),
                }),
            },
            Err(error) => Err(error),
        }
    };
}

impl Client {
    pub fn base_url(&self) -> &str {
        self.base_url.as_str()
    }

    /// Where the audio of a track can be fetched from.
    pub fn stream_url(&self, track: &Track) -> String {
        track.stream_url(self.base_url.as_str())
    }

    #[instrument(skip(self))]
    pub async fn track(&self, id: &TrackId) -> Result<Option<Track>> {
        let params = [("uid", id.as_str())];
        let tracks: Option<Vec<TrackInfo>> = get!(self, Endpoint::Database, &params)?;

        Ok(tracks
            .unwrap_or_default()
            .into_iter()
            .next()
            .and_then(TrackInfo::into_track))
    }

    #[instrument(skip(self))]
    pub async fn album_list(&self, query: &str) -> Result<Vec<AlbumSummary>> {
        let query = match query {
            "" => "Playlist:",
            "*" => "",
            query => query,
        };

        let params = [("albumList", query)];
        let albums: Option<Vec<AlbumInfo>> = get!(self, Endpoint::Database, &params)?;

        Ok(parse_album_list(albums.unwrap_or_default()))
    }

    /// Contents of a playlist. A playlist unknown to the server is empty.
    #[instrument(skip(self))]
    pub async fn playlist(&self, id: &PlaylistId) -> Result<Vec<Track>> {
        let params = [("show", id.as_str())];
        let tracks: Option<Vec<TrackInfo>> = get!(self, Endpoint::Playlist, &params)?;

        Ok(tracks
            .unwrap_or_default()
            .into_iter()
            .filter_map(TrackInfo::into_track)
            .collect())
    }

    /// Makes `id` the playlist of the remote player.
    #[instrument(skip(self))]
    pub async fn change_playlist(&self, id: &PlaylistId) -> Result<()> {
        let params = [("change", id.as_str())];
        let result: CommandResult = get!(self, Endpoint::Playlist, &params)?;
        ensure_ok(result)
    }

    #[instrument(skip(self))]
    pub async fn create_playlist(&self, name: &str) -> Result<()> {
        let params = [("create", name)];
        let result: CommandResult = get!(self, Endpoint::Playlist, &params)?;
        ensure_ok(result)
    }

    #[instrument(skip(self))]
    pub async fn player(&self, command: &PlayerCommand) -> Result<()> {
        let (action, value) = command.query();
        let params = [(action, value.as_str())];
        let result: CommandResult = post!(self, Endpoint::Player, &params)?;
        ensure_ok(result)
    }

    #[instrument(skip(self, psk))]
    pub async fn set_wifi(&self, ssid: &str, psk: &str) -> Result<()> {
        let params = [("ssid", ssid), ("psk", psk)];
        self.make_call(Method::POST, Endpoint::Wifi, &params).await?;
        Ok(())
    }

    /// Uploads a file, reporting percent complete as the body is streamed.
    #[instrument(skip(self, progress))]
    pub async fn upload<F>(&self, path: &Path, mut progress: F) -> Result<()>
    where
        F: FnMut(u8) + Send + 'static,
    {
        let bytes = tokio::fs::read(path).await.map_err(|error| Error::File {
            path: path.display().to_string(),
            message: error.to_string(),
        })?;

        let total = bytes.len() as u64;
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().to_string())
            .unwrap_or_else(|| "upload".to_string());

        let chunks: Vec<Vec<u8>> = bytes.chunks(UPLOAD_CHUNK_SIZE).map(<[u8]>::to_vec).collect();
        let mut sent = 0u64;
        let stream = futures::stream::iter(chunks.into_iter().map(move |chunk| {
            sent += chunk.len() as u64;
            progress(percent(sent, total));
            Ok::<_, std::io::Error>(chunk)
        }));

        let part = multipart::Part::stream_with_length(reqwest::Body::wrap_stream(stream), total)
            .file_name(file_name);
        let form = multipart::Form::new().part("file", part);

        let url = self.endpoint_url(Endpoint::Upload)?;
        debug!("uploading {} bytes to {url}", total);
        let response = self.client.post(url).multipart(form).send().await?;
        self.handle_response(response).await?;

        Ok(())
    }

    /// Opens the broadcast channel of the remote player.
    pub async fn socket(&self) -> Result<Socket> {
        let mut url = self.endpoint_url(Endpoint::Dynamic)?;
        let scheme = if url.scheme() == "https" { "wss" } else { "ws" };
        url.set_scheme(scheme).map_err(|_| Error::InvalidUrl {
            message: format!("cannot derive websocket url from {}", self.base_url),
        })?;

        Socket::connect(url.as_str()).await
    }

    fn endpoint_url(&self, endpoint: Endpoint) -> Result<Url> {
        Ok(self.base_url.join(&endpoint.to_string())?)
    }

    async fn make_call(
        &self,
        method: Method,
        endpoint: Endpoint,
        params: &[(&str, &str)],
    ) -> Result<String> {
        let url = self.endpoint_url(endpoint)?;

        debug!("calling {} {url}, with params {params:?}", method);
        let response = self
            .client
            .request(method, url)
            .query(params)
            .send()
            .await?;

        self.handle_response(response).await
    }

    async fn handle_response(&self, response: Response) -> Result<String> {
        if response.status() == StatusCode::OK {
            Ok(response.text().await?)
        } else {
            Err(Error::Api {
                message: response.status().to_string(),
            })
        }
    }
}

fn ensure_ok(result: CommandResult) -> Result<()> {
    if result.is_ok() {
        Ok(())
    } else {
        warn!("server rejected request: {}", result.result);
        Err(Error::Rejected {
            result: result.result,
        })
    }
}

fn percent(sent: u64, total: u64) -> u8 {
    if total == 0 {
        100
    } else {
        (sent.min(total) * 100 / total) as u8
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn player_commands_map_to_query_pairs() {
        assert_eq!(PlayerCommand::Previous.query(), ("prev", "true".to_string()));
        assert_eq!(
            PlayerCommand::ToggleShuffle.query(),
            ("toggleShuffle", "true".to_string())
        );
        assert_eq!(PlayerCommand::Volume(140).query(), ("volume", "100".to_string()));
        assert_eq!(
            PlayerCommand::ToPosition(42).query(),
            ("toPosition", "42".to_string())
        );
        assert_eq!(
            PlayerCommand::Select(TrackId::parse("t9").unwrap()).query(),
            ("select", "t9".to_string())
        );
    }

    #[test]
    fn endpoints_resolve_against_base_url() {
        let client = new("http://player.local:8080/").unwrap();
        assert_eq!(
            client.endpoint_url(Endpoint::Playlist).unwrap().as_str(),
            "http://player.local:8080/playlist"
        );
    }

    #[test]
    fn rejects_non_http_base_url() {
        assert!(matches!(new("ftp://host"), Err(Error::InvalidUrl { .. })));
        assert!(matches!(new("not a url"), Err(Error::InvalidUrl { .. })));
    }

    #[test]
    fn rejected_results_carry_server_text() {
        let error = ensure_ok(CommandResult {
            result: "playlist not found".into(),
        })
        .unwrap_err();
        assert_eq!(error.to_string(), "playlist not found");
    }

    #[test]
    fn upload_progress_is_bounded() {
        assert_eq!(percent(0, 0), 100);
        assert_eq!(percent(50, 200), 25);
        assert_eq!(percent(300, 200), 100);
    }
}
