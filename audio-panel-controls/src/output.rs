use std::io::Cursor;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use rodio::{Source, decoder::DecoderBuilder, queue::queue};
use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;
use tracing::{debug, instrument};

use crate::Result;
use crate::notification::NotificationBroadcast;

/// Audio playback on this device.
///
/// `load` replaces whatever was playing. When the loaded track plays to its
/// end, the `generation` it was loaded with is reported back to the session.
pub trait AudioOutput {
    fn load(&mut self, url: &str, generation: u64) -> Result<()>;
    fn play(&mut self);
    fn pause(&mut self);
    fn stop(&mut self);
    fn seek(&mut self, position: Duration) -> Result<()>;
    /// Volume in percent.
    fn set_volume(&mut self, volume: u8);
    fn position(&self) -> Duration;
    /// `None` until the track has been decoded far enough to know.
    fn duration(&self) -> Option<Duration>;
}

pub struct RodioOutput {
    stream_handle: Option<rodio::OutputStream>,
    sink: Option<rodio::Sink>,
    current_download: Option<JoinHandle<()>>,
    duration: Arc<Mutex<Option<Duration>>>,
    ended_tx: UnboundedSender<u64>,
    broadcast: Arc<NotificationBroadcast>,
    volume: u8,
}

impl RodioOutput {
    pub fn new(ended_tx: UnboundedSender<u64>, broadcast: Arc<NotificationBroadcast>) -> Self {
        Self {
            stream_handle: Default::default(),
            sink: Default::default(),
            current_download: Default::default(),
            duration: Default::default(),
            ended_tx,
            broadcast,
            volume: 100,
        }
    }

    fn clear(&mut self) {
        if let Some(handle) = self.current_download.take() {
            handle.abort();
        }

        self.sink = None;
        if let Ok(mut duration) = self.duration.lock() {
            *duration = None;
        }
    }
}

impl AudioOutput for RodioOutput {
    #[instrument(skip(self))]
    fn load(&mut self, url: &str, generation: u64) -> Result<()> {
        self.clear();

        if self.stream_handle.is_none() {
            let mut stream_handle = rodio::OutputStreamBuilder::from_default_device()?.open_stream()?;
            stream_handle.log_on_drop(false);
            self.stream_handle = Some(stream_handle);
        }

        let Some(stream_handle) = &self.stream_handle else {
            return Ok(());
        };

        let (sender, receiver) = queue(true);
        let sink = rodio::Sink::connect_new(stream_handle.mixer());
        sink.append(receiver);
        set_volume(&sink, self.volume);
        self.sink = Some(sink);

        let url = url.to_string();
        let duration = self.duration.clone();
        let ended_tx = self.ended_tx.clone();
        let broadcast = self.broadcast.clone();

        let handle = tokio::spawn(async move {
            let Ok(resp) = reqwest::get(&url)
                .await
                .and_then(reqwest::Response::error_for_status)
            else {
                broadcast.send_error("Unable to get track audio file".to_string());
                return;
            };
            let Ok(body) = resp.bytes().await else {
                broadcast.send_error("Unable to get audio file bytes".to_string());
                return;
            };

            let cursor = Cursor::new(body.to_vec());
            let Ok(source) = DecoderBuilder::new()
                .with_data(cursor)
                .with_seekable(true)
                .build()
            else {
                broadcast.send_error("Unable to decode audio file".to_string());
                return;
            };

            if let Ok(mut duration) = duration.lock() {
                *duration = source.total_duration();
            }

            let signal = sender.append_with_signal(source);
            debug!("track {generation} buffered");

            tokio::task::spawn_blocking(move || {
                if signal.recv().is_ok() {
                    _ = ended_tx.send(generation);
                }
            });
        });

        self.current_download = Some(handle);

        Ok(())
    }

    fn play(&mut self) {
        if let Some(sink) = &self.sink {
            sink.play();
        }
    }

    fn pause(&mut self) {
        if let Some(sink) = &self.sink {
            sink.pause();
        }
    }

    fn stop(&mut self) {
        self.clear();
    }

    fn seek(&mut self, position: Duration) -> Result<()> {
        if let Some(sink) = &self.sink {
            sink.try_seek(position)?;
        }

        Ok(())
    }

    fn set_volume(&mut self, volume: u8) {
        self.volume = volume.min(100);
        if let Some(sink) = &self.sink {
            set_volume(sink, self.volume);
        }
    }

    fn position(&self) -> Duration {
        self.sink
            .as_ref()
            .map(rodio::Sink::get_pos)
            .unwrap_or_default()
    }

    fn duration(&self) -> Option<Duration> {
        self.duration.lock().ok().and_then(|duration| *duration)
    }
}

fn set_volume(sink: &rodio::Sink, volume: u8) {
    let volume = (volume as f32 / 100.0).clamp(0.0, 1.0).powi(3);
    sink.set_volume(volume);
}
