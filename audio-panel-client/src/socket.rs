use futures::StreamExt;
use tokio::net::TcpStream;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, tungstenite::Message};
use tracing::{debug, info};

use crate::{Error, Result, ServerMessage};

/// Inbound side of the player's broadcast channel.
pub struct Socket {
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

impl Socket {
    pub async fn connect(url: &str) -> Result<Self> {
        debug!("connecting to {url}");
        let (stream, _) = tokio_tungstenite::connect_async(url).await?;
        info!("websocket connection open");

        Ok(Self { stream })
    }

    /// Next decoded message. `None` once the server has closed the connection.
    ///
    /// A frame that fails to decode is returned as an error without closing the socket.
    pub async fn next_message(&mut self) -> Option<Result<ServerMessage>> {
        loop {
            let message = match self.stream.next().await? {
                Ok(message) => message,
                Err(error) => return Some(Err(error.into())),
            };

            match message {
                Message::Close(_) => {
                    info!("websocket closed by server");
                    return None;
                }
                Message::Text(_) => {
                    let decoded = message
                        .to_text()
                        .map_err(Error::from)
                        .and_then(ServerMessage::parse);
                    return Some(decoded);
                }
                _ => continue,
            }
        }
    }
}
