use snafu::prelude::*;

pub mod client;
pub mod server_models;
pub mod socket;

pub use client::{Client, PlayerCommand};
pub use server_models::broadcast::{ServerMessage, SongBroadcast};
pub use socket::Socket;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Snafu, Debug)]
pub enum Error {
    #[snafu(display("{message}"))]
    Api { message: String },
    #[snafu(display("failed to deserialize json: {message}"))]
    DeserializeJSON { message: String },
    #[snafu(display("malformed message: {message}"))]
    MalformedMessage { message: String },
    #[snafu(display("{result}"))]
    Rejected { result: String },
    #[snafu(display("connection to player unavailable: {message}"))]
    TransportUnavailable { message: String },
    #[snafu(display("invalid server url: {message}"))]
    InvalidUrl { message: String },
    #[snafu(display("unable to read {path}: {message}"))]
    File { path: String, message: String },
}

impl From<reqwest::Error> for Error {
    fn from(error: reqwest::Error) -> Self {
        Error::Api {
            message: error.to_string(),
        }
    }
}

impl From<url::ParseError> for Error {
    fn from(error: url::ParseError) -> Self {
        Error::InvalidUrl {
            message: error.to_string(),
        }
    }
}

impl From<tokio_tungstenite::tungstenite::Error> for Error {
    fn from(error: tokio_tungstenite::tungstenite::Error) -> Self {
        Error::TransportUnavailable {
            message: error.to_string(),
        }
    }
}
