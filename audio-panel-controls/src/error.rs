use crate::notification::Notification;
use snafu::prelude::*;

#[derive(Snafu, Debug)]
pub enum Error {
    #[snafu(display("Discarded malformed message: {message}"))]
    MalformedMessage { message: String },
    #[snafu(display("Response for playlist {playlist} is no longer current"))]
    StaleResponse { playlist: String },
    #[snafu(display("{what} not found"))]
    NotFound { what: String },
    #[snafu(display("Connection to player unavailable: {message}"))]
    TransportUnavailable { message: String },
    #[snafu(display("{message}"))]
    Client { message: String },
    #[snafu(display("Audio output error: {message}"))]
    Output { message: String },
    #[snafu(display("Unable to broadcast notification"))]
    Notification,
}

impl From<audio_panel_client::Error> for Error {
    fn from(error: audio_panel_client::Error) -> Self {
        match error {
            audio_panel_client::Error::MalformedMessage { message } => {
                Error::MalformedMessage { message }
            }
            audio_panel_client::Error::TransportUnavailable { message } => {
                Error::TransportUnavailable { message }
            }
            error => Error::Client {
                message: error.to_string(),
            },
        }
    }
}

impl From<rodio::StreamError> for Error {
    fn from(value: rodio::StreamError) -> Self {
        Self::Output {
            message: value.to_string(),
        }
    }
}

impl From<rodio::source::SeekError> for Error {
    fn from(value: rodio::source::SeekError) -> Self {
        Self::Output {
            message: value.to_string(),
        }
    }
}

impl From<tokio::sync::broadcast::error::SendError<Notification>> for Error {
    fn from(_value: tokio::sync::broadcast::error::SendError<Notification>) -> Self {
        Self::Notification
    }
}
