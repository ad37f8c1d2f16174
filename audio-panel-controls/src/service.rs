use async_trait::async_trait;
use audio_panel_client::{Client, PlayerCommand};
use audio_panel_models::{PlaylistId, Track};
use std::fmt::Debug;

use crate::Result;

/// The parts of the player server a session talks to.
#[async_trait]
pub trait PlayerService: Send + Sync + Debug {
    fn base_url(&self) -> &str;
    async fn playlist(&self, id: &PlaylistId) -> Result<Vec<Track>>;
    async fn change_playlist(&self, id: &PlaylistId) -> Result<()>;
    async fn player(&self, command: &PlayerCommand) -> Result<()>;
}

#[async_trait]
impl PlayerService for Client {
    fn base_url(&self) -> &str {
        Client::base_url(self)
    }

    async fn playlist(&self, id: &PlaylistId) -> Result<Vec<Track>> {
        Ok(Client::playlist(self, id).await?)
    }

    async fn change_playlist(&self, id: &PlaylistId) -> Result<()> {
        Ok(Client::change_playlist(self, id).await?)
    }

    async fn player(&self, command: &PlayerCommand) -> Result<()> {
        Ok(Client::player(self, command).await?)
    }
}
