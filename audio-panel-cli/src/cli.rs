use std::{path::PathBuf, sync::Arc, time::Duration};

use audio_panel_client::Client;
use audio_panel_controls::{
    controls::{ControlCommand, Controls},
    notification::{Message, Notification, NotificationBroadcast},
    output::RodioOutput,
    session::{Mode, Session, SessionConfig, forward_broadcasts},
};
use audio_panel_models::{PlaylistId, TrackId};
use clap::{Parser, Subcommand, ValueEnum};
use snafu::prelude::*;
use tokio::{
    io::{AsyncBufReadExt, BufReader},
    sync::{broadcast::Receiver, broadcast::error::RecvError, mpsc},
};
use tracing::debug;

#[derive(Parser)]
#[clap(author, version, about, long_about = None)]
struct Cli {
    #[clap(
        short,
        long,
        env = "AUDIO_PANEL_SERVER",
        default_value = "http://127.0.0.1:8080"
    )]
    /// Address of the player server.
    server: String,

    #[clap(short, long, value_enum, default_value_t = Mode::Remote)]
    /// Control the player on the server or play on this device.
    mode: Mode,

    #[clap(short, long)]
    /// Log level
    verbosity: Option<tracing::Level>,

    #[clap(long, default_value_t = 500)]
    /// How often local playback progress is sampled, in milliseconds.
    tick_ms: u64,

    #[clap(long, default_value_t = 50)]
    /// Initial volume for local playback, in percent.
    volume: u8,

    #[clap(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Open an interactive session. Commands are read from stdin.
    Open,
    /// List albums. An empty query lists playlists, `*` lists everything.
    Albums { query: Option<String> },
    /// Show the tracks of a playlist.
    Playlist { id: String },
    /// Show a single track and where it streams from.
    Track { id: String },
    /// Upload audio files to the server.
    Upload {
        #[clap(required = true)]
        files: Vec<PathBuf>,
    },
    /// Create an empty playlist.
    CreatePlaylist { name: String },
    /// Join the player to a wifi network.
    Wifi { ssid: String, psk: String },
}

#[derive(Debug, Snafu)]
pub enum Error {
    #[snafu(display("{error}"))]
    ClientError { error: String },
    #[snafu(display("{error}"))]
    PlayerError { error: String },
    #[snafu(display("{error}"))]
    InputError { error: String },
}

impl From<audio_panel_client::Error> for Error {
    fn from(error: audio_panel_client::Error) -> Self {
        Error::ClientError {
            error: error.to_string(),
        }
    }
}

impl From<audio_panel_controls::Error> for Error {
    fn from(error: audio_panel_controls::Error) -> Self {
        Error::PlayerError {
            error: error.to_string(),
        }
    }
}

pub async fn run() -> Result<(), Error> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_max_level(cli.verbosity)
        .with_target(false)
        .compact()
        .init();

    let client = audio_panel_client::client::new(&cli.server)?;

    match cli.command {
        Commands::Open => {
            let broadcast = Arc::new(NotificationBroadcast::new());
            let (ended_tx, ended_rx) = mpsc::unbounded_channel();
            let output = RodioOutput::new(ended_tx, broadcast.clone());

            let (mut session, controls) = Session::new(
                Arc::new(client.clone()),
                output,
                ended_rx,
                broadcast,
                SessionConfig {
                    mode: cli.mode,
                    tick: Duration::from_millis(cli.tick_ms.max(1)),
                    volume: cli.volume,
                },
            );

            tokio::spawn(forward_broadcasts(client, session.inbound()));
            tokio::spawn(print_notifications(session.subscribe()));
            tokio::spawn(read_commands(controls));

            session.run().await?;
            Ok(())
        }
        Commands::Albums { query } => {
            let albums = client.album_list(query.as_deref().unwrap_or_default()).await?;
            for album in albums {
                match album.selector {
                    Some(selector) => println!("{}\t{} [{selector}]", album.id, album.album),
                    None => println!("{}\t{} - {}", album.id, album.performer, album.album),
                }
            }
            Ok(())
        }
        Commands::Playlist { id } => {
            let id = parse_playlist_id(&id)?;
            let tracks = client.playlist(&id).await?;
            for (index, track) in tracks.iter().enumerate() {
                println!(
                    "{:>3}. {}\t{} - {}",
                    index + 1,
                    track.id,
                    track.performer,
                    track.title
                );
            }
            Ok(())
        }
        Commands::Track { id } => {
            let id = TrackId::parse(&id).ok_or_else(|| Error::InputError {
                error: format!("invalid track id {id:?}"),
            })?;
            let track = client.track(&id).await?.ok_or_else(|| Error::InputError {
                error: format!("track {id} not found"),
            })?;
            println!("{}\t{} - {}", track.id, track.performer, track.title);
            println!("{}", track.album);
            println!("{}", client.stream_url(&track));
            Ok(())
        }
        Commands::Upload { files } => {
            for file in files {
                let name = file.display().to_string();
                let label = name.clone();
                client
                    .upload(&file, move |percent| eprint!("\r{label}: {percent}%"))
                    .await?;
                eprintln!();
                println!("Uploaded {name}.");
            }
            Ok(())
        }
        Commands::CreatePlaylist { name } => {
            client.create_playlist(&name).await?;
            println!("Playlist {name} created.");
            Ok(())
        }
        Commands::Wifi { ssid, psk } => {
            client.set_wifi(&ssid, &psk).await?;
            println!("Wifi credentials sent.");
            Ok(())
        }
    }
}

fn parse_playlist_id(id: &str) -> Result<PlaylistId, Error> {
    PlaylistId::parse(id).ok_or_else(|| Error::InputError {
        error: format!("invalid playlist id {id:?}"),
    })
}

async fn read_commands(controls: Controls) {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    while let Ok(Some(line)) = lines.next_line().await {
        match parse_command(&line) {
            Ok(Some(command)) => {
                let quit = command == ControlCommand::Quit;
                controls.send(command);
                if quit {
                    return;
                }
            }
            Ok(None) => {}
            Err(error) => println!("{error}"),
        }
    }

    controls.quit();
}

fn parse_command(line: &str) -> Result<Option<ControlCommand>, Error> {
    let mut words = line.split_whitespace();
    let Some(command) = words.next() else {
        return Ok(None);
    };
    let argument = words.next();

    let command = match command {
        "play" => ControlCommand::Play,
        "pause" => ControlCommand::Pause,
        "stop" => ControlCommand::Stop,
        "next" => ControlCommand::Next,
        "prev" | "previous" => ControlCommand::Previous,
        "ff" | "forward" => ControlCommand::JumpForward,
        "rew" | "back" => ControlCommand::JumpBackward,
        "loop" => ControlCommand::ToggleLoop,
        "shuffle" => ControlCommand::ToggleShuffle,
        "single" => ControlCommand::ToggleSingle,
        "seek" => {
            let percent: f64 = number(command, argument)?;
            ControlCommand::Seek {
                fraction: percent / 100.0,
            }
        }
        "volume" => ControlCommand::SetVolume {
            volume: number(command, argument)?,
        },
        "select" => ControlCommand::SelectTrack {
            id: required(command, argument.and_then(TrackId::parse))?,
        },
        "playlist" => ControlCommand::SelectPlaylist {
            id: required(command, argument.and_then(PlaylistId::parse))?,
        },
        "mode" => {
            let mode = required(command, argument)?;
            ControlCommand::SetMode {
                mode: Mode::from_str(mode, true).map_err(|error| Error::InputError { error })?,
            }
        }
        "quit" | "exit" => ControlCommand::Quit,
        other => {
            return Err(Error::InputError {
                error: format!("unknown command {other:?}"),
            });
        }
    };

    Ok(Some(command))
}

fn required<T>(command: &str, value: Option<T>) -> Result<T, Error> {
    value.ok_or_else(|| Error::InputError {
        error: format!("{command} needs an argument"),
    })
}

fn number<T: std::str::FromStr>(command: &str, argument: Option<&str>) -> Result<T, Error> {
    required(command, argument)?
        .parse()
        .map_err(|_| Error::InputError {
            error: format!("{command} needs a number"),
        })
}

async fn print_notifications(mut receiver: Receiver<Notification>) {
    loop {
        match receiver.recv().await {
            Ok(notification) => {
                if let Some(line) = describe(&notification) {
                    println!("{line}");
                }
            }
            Err(RecvError::Lagged(skipped)) => debug!("skipped {skipped} notifications"),
            Err(RecvError::Closed) => return,
        }
    }
}

fn describe(notification: &Notification) -> Option<String> {
    let line = match notification {
        Notification::PlaylistChanged { playlist: Some(id) } => format!("Playlist {id}"),
        Notification::PlaylistChanged { playlist: None } => return None,
        Notification::PlaylistLoaded { playlist } => {
            let mut line = format!("Playlist {} has {} tracks", playlist.id, playlist.len());
            for (index, track) in playlist.tracks.iter().enumerate() {
                line.push_str(&format!("\n{:>3}. {} - {}", index + 1, track.performer, track.title));
            }
            line
        }
        Notification::PlaylistCleared => "No playlist".to_string(),
        Notification::SongChanged { now_playing, .. } => format!(
            "Now playing: {} - {} ({})",
            now_playing.performer, now_playing.title, now_playing.album
        ),
        Notification::NowPlayingCleared => "Stopped".to_string(),
        Notification::Display { .. } => return None,
        Notification::Networks { ssids } => format!("Networks: {}", ssids.join(", ")),
        Notification::ModeChanged { mode } => format!("Mode: {mode}"),
        Notification::Message { message } => match message {
            Message::Error(message) => format!("Error: {message}"),
            Message::Warning(message) => format!("Warning: {message}"),
            Message::Success(message) | Message::Info(message) => message.clone(),
        },
    };

    Some(line)
}
