use std::{fmt, sync::Arc, time::Duration};

use audio_panel_client::{Client, ServerMessage};
use audio_panel_models::{PlaylistId, Track};
use tokio::{
    select,
    sync::{
        broadcast,
        mpsc::{self, UnboundedReceiver, UnboundedSender},
        watch,
    },
};
use tracing::{debug, info, instrument, trace, warn};

use crate::{
    Error, Result,
    controls::{ControlCommand, Controls},
    local::LocalTransport,
    notification::{Notification, NotificationBroadcast},
    output::AudioOutput,
    reconciler::{DisplayMirror, Effect, Reconciler},
    remote::RemoteTransport,
    service::PlayerService,
    state::PlayerStateUpdate,
};

/// Which player the session controls.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum Mode {
    /// Play audio on this device.
    Local,
    /// Drive the player on the server.
    #[default]
    Remote,
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mode::Local => f.write_str("local"),
            Mode::Remote => f.write_str("remote"),
        }
    }
}

/// Events arriving from the server's broadcast channel.
#[derive(Debug)]
pub enum Inbound {
    Message(Result<ServerMessage>),
    Unavailable(String),
}

#[derive(Debug)]
struct PlaylistFetch {
    id: PlaylistId,
    result: Result<Vec<Track>>,
}

#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub mode: Mode,
    /// How often local playback progress is sampled.
    pub tick: Duration,
    /// Initial volume of local playback, in percent.
    pub volume: u8,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            mode: Mode::default(),
            tick: Duration::from_millis(500),
            volume: 50,
        }
    }
}

/// Owns all playback state. Every mutation happens on the task running [`Session::run`].
pub struct Session<O> {
    mode: Mode,
    tick_interval: Duration,
    service: Arc<dyn PlayerService>,
    reconciler: Reconciler,
    local: LocalTransport<O>,
    remote: RemoteTransport,
    last_remote: Option<PlayerStateUpdate>,
    unavailable_reported: bool,
    broadcast: Arc<NotificationBroadcast>,
    display_tx: watch::Sender<DisplayMirror>,
    command_rx: UnboundedReceiver<ControlCommand>,
    inbound_tx: UnboundedSender<Inbound>,
    inbound_rx: UnboundedReceiver<Inbound>,
    fetch_tx: UnboundedSender<PlaylistFetch>,
    fetch_rx: UnboundedReceiver<PlaylistFetch>,
    ended_rx: UnboundedReceiver<u64>,
}

impl<O: AudioOutput> Session<O> {
    /// `ended_rx` receives the generations reported by `output` when a track finishes.
    pub fn new(
        service: Arc<dyn PlayerService>,
        output: O,
        ended_rx: UnboundedReceiver<u64>,
        broadcast: Arc<NotificationBroadcast>,
        config: SessionConfig,
    ) -> (Self, Controls) {
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let (inbound_tx, inbound_rx) = mpsc::unbounded_channel();
        let (fetch_tx, fetch_rx) = mpsc::unbounded_channel();
        let (display_tx, _) = watch::channel(DisplayMirror::default());

        let local = LocalTransport::new(output, service.base_url(), config.volume);
        let remote = RemoteTransport::new(service.clone(), broadcast.clone());

        let session = Self {
            mode: config.mode,
            tick_interval: config.tick,
            service,
            reconciler: Reconciler::new(),
            local,
            remote,
            last_remote: None,
            unavailable_reported: false,
            broadcast,
            display_tx,
            command_rx,
            inbound_tx,
            inbound_rx,
            fetch_tx,
            fetch_rx,
            ended_rx,
        };

        (session, Controls::new(command_tx))
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// Sender for the server's broadcasts, see [`forward_broadcasts`].
    pub fn inbound(&self) -> UnboundedSender<Inbound> {
        self.inbound_tx.clone()
    }

    pub fn display(&self) -> watch::Receiver<DisplayMirror> {
        self.display_tx.subscribe()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Notification> {
        self.broadcast.subscribe()
    }

    pub fn reconciler(&self) -> &Reconciler {
        &self.reconciler
    }

    pub async fn run(&mut self) -> Result<()> {
        info!("session started in {} mode", self.mode);
        let mut interval = tokio::time::interval(self.tick_interval);

        loop {
            select! {
                _ = interval.tick() => {
                    self.tick();
                }

                Some(command) = self.command_rx.recv() => {
                    if self.handle_command(command) {
                        break;
                    }
                }

                Some(inbound) = self.inbound_rx.recv() => {
                    self.handle_inbound(inbound);
                }

                Some(fetch) = self.fetch_rx.recv() => {
                    self.handle_fetch(fetch);
                }

                Some(generation) = self.ended_rx.recv() => {
                    self.handle_ended(generation);
                }
            }
        }

        self.local.stop();
        info!("session stopped");
        Ok(())
    }

    fn tick(&mut self) {
        if self.mode == Mode::Local {
            self.local.sample();
            self.apply_local();
        }
    }

    /// Returns `true` when the session should stop.
    #[instrument(skip(self))]
    fn handle_command(&mut self, command: ControlCommand) -> bool {
        match command {
            ControlCommand::Quit => return true,
            ControlCommand::SetMode { mode } => self.set_mode(mode),
            command => match self.mode {
                Mode::Remote => self.remote_command(command),
                Mode::Local => self.local_command(command),
            },
        }

        false
    }

    fn remote_command(&mut self, command: ControlCommand) {
        if let ControlCommand::SelectPlaylist { id } = command {
            self.remote.select_playlist(id);
        } else if let Some(command) = RemoteTransport::command_for(&command) {
            self.remote.send(command);
        }
    }

    fn local_command(&mut self, command: ControlCommand) {
        let result = match command {
            ControlCommand::Play => self.local.play_pause(self.reconciler.playlist()),
            ControlCommand::Pause => {
                self.local.pause();
                Ok(())
            }
            ControlCommand::Stop => {
                self.local.stop();
                Ok(())
            }
            ControlCommand::Next => self.local.next(self.reconciler.playlist()),
            ControlCommand::Previous => self.local.previous(self.reconciler.playlist()),
            ControlCommand::JumpForward => self.local.jump_forward(),
            ControlCommand::JumpBackward => self.local.jump_backward(),
            ControlCommand::ToggleLoop => {
                self.local.toggle_loop();
                Ok(())
            }
            ControlCommand::ToggleShuffle => {
                self.local.toggle_shuffle(self.reconciler.playlist_mut());
                Ok(())
            }
            ControlCommand::ToggleSingle => {
                self.local.toggle_single();
                Ok(())
            }
            ControlCommand::Seek { fraction } => self.local.seek(fraction),
            ControlCommand::SetVolume { volume } => {
                self.local.set_volume(volume);
                Ok(())
            }
            ControlCommand::SelectTrack { id } => {
                self.local.select_track(&id, self.reconciler.playlist())
            }
            ControlCommand::SelectPlaylist { id } => {
                self.local.select_playlist(id);
                Ok(())
            }
            ControlCommand::SetMode { .. } | ControlCommand::Quit => Ok(()),
        };

        if let Err(error) = result {
            warn!("{error}");
            self.broadcast.send_error(error.to_string());
        }

        self.apply_local();
    }

    fn set_mode(&mut self, mode: Mode) {
        if mode == self.mode {
            return;
        }

        info!("switching to {mode} mode");
        if self.mode == Mode::Local {
            self.local.stop();
            self.apply_local();
        }
        self.mode = mode;
        self.notify(Notification::ModeChanged { mode });

        match mode {
            Mode::Local => {
                if self.local.mirror().playlist.is_none()
                    && let Some(id) = self.reconciler.state().playlist.clone()
                {
                    self.local.select_playlist(id);
                }
                self.apply_local();
            }
            Mode::Remote => {
                if let Some(update) = self.last_remote.clone() {
                    self.apply(update);
                }
            }
        }
    }

    fn handle_inbound(&mut self, inbound: Inbound) {
        match inbound {
            Inbound::Message(Ok(ServerMessage::Song(song))) => {
                let update = PlayerStateUpdate::from(song);
                self.last_remote = Some(update.clone());

                if self.mode == Mode::Remote {
                    self.apply(update);
                } else {
                    trace!("playing locally, ignoring broadcast");
                }
            }
            Inbound::Message(Ok(ServerMessage::Networks(ssids))) => {
                self.notify(Notification::Networks { ssids });
            }
            Inbound::Message(Err(error)) => {
                warn!("{error}");
            }
            Inbound::Unavailable(message) => {
                if !self.unavailable_reported {
                    self.unavailable_reported = true;
                    let error = Error::TransportUnavailable { message };
                    warn!("{error}");
                    self.broadcast.send_error(error.to_string());
                }
            }
        }
    }

    fn handle_fetch(&mut self, fetch: PlaylistFetch) {
        let PlaylistFetch { id, result } = fetch;

        match result {
            Ok(tracks) => match self.reconciler.playlist_loaded(id, tracks) {
                Ok(effects) => self.dispatch(effects),
                Err(error) => debug!("{error}"),
            },
            Err(error) if self.reconciler.is_current(&id) => {
                warn!("loading playlist {id} failed: {error}");
                self.broadcast
                    .send_error(format!("Unable to load playlist: {error}"));
            }
            Err(error) => debug!("ignoring failed fetch of playlist {id}: {error}"),
        }
    }

    fn handle_ended(&mut self, generation: u64) {
        if self.mode != Mode::Local {
            debug!("track {generation} ended while not playing locally");
            return;
        }

        match self.local.track_ended(generation, self.reconciler.playlist()) {
            Ok(true) => self.apply_local(),
            Ok(false) => {}
            Err(error) => {
                warn!("{error}");
                self.broadcast.send_error(error.to_string());
                self.apply_local();
            }
        }
    }

    fn apply_local(&mut self) {
        let update = self.local.snapshot();
        self.apply(update);
    }

    fn apply(&mut self, update: PlayerStateUpdate) {
        let effects = self.reconciler.reconcile(update);
        self.dispatch(effects);
    }

    fn dispatch(&mut self, effects: Vec<Effect>) {
        for effect in effects {
            match effect {
                Effect::Notify(notification) => {
                    if let Notification::Display { display } = &notification {
                        self.display_tx.send_replace(display.clone());
                    }
                    self.notify(notification);
                }
                Effect::FetchPlaylist(id) => self.fetch_playlist(id),
            }
        }
    }

    fn notify(&self, notification: Notification) {
        if self.broadcast.send(notification).is_err() {
            debug!("no one is listening for notifications");
        }
    }

    fn fetch_playlist(&self, id: PlaylistId) {
        let service = self.service.clone();
        let fetch_tx = self.fetch_tx.clone();

        tokio::spawn(async move {
            debug!("fetching playlist {id}");
            let result = service.playlist(&id).await;
            _ = fetch_tx.send(PlaylistFetch { id, result });
        });
    }
}

/// Reads the server's broadcast channel into a session until the connection ends.
///
/// The connection is not re-established; its loss is reported once as [`Inbound::Unavailable`].
pub async fn forward_broadcasts(client: Client, inbound: UnboundedSender<Inbound>) {
    let mut socket = match client.socket().await {
        Ok(socket) => socket,
        Err(error) => {
            _ = inbound.send(Inbound::Unavailable(unavailable_reason(error)));
            return;
        }
    };

    while let Some(message) = socket.next_message().await {
        let message = match message {
            Err(error @ audio_panel_client::Error::TransportUnavailable { .. }) => {
                _ = inbound.send(Inbound::Unavailable(unavailable_reason(error)));
                return;
            }
            message => Inbound::Message(message.map_err(Error::from)),
        };

        if inbound.send(message).is_err() {
            return;
        }
    }

    _ = inbound.send(Inbound::Unavailable("connection closed".to_string()));
}

fn unavailable_reason(error: audio_panel_client::Error) -> String {
    match error {
        audio_panel_client::Error::TransportUnavailable { message } => message,
        error => error.to_string(),
    }
}
