//! Camera snapshot service.
//!
//! `Idle -> Acquiring -> Streaming -> Stopped`, or `Acquiring -> Failed` when the camera cannot
//! be acquired. While streaming, a frame is captured once the video reports metadata and then on
//! every interval tick.
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use chrono::Utc;
use serde_json::json;
use tokio::{
    runtime::Handle,
    sync::watch,
    task::JoinHandle,
    time::{Instant, MissedTickBehavior},
};
use tracing::{debug, info, instrument};

use crate::{
    activity::ActivityLogger,
    config::MonitorSettings,
    diagnostics::Failure,
    error::Error,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MediaConstraints {
    pub video: bool,
    pub audio: bool,
}

impl MediaConstraints {
    pub const VIDEO_ONLY: MediaConstraints = MediaConstraints {
        video: true,
        audio: false,
    };
}

/// Native resolution reported by the video track, when known
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TrackSettings {
    pub width: Option<u32>,
    pub height: Option<u32>,
}

/// Raw RGBA pixels drawn from the video element
#[derive(Clone, Debug)]
pub struct Frame {
    pub width: u32,
    pub height: u32,
    pub rgba: Vec<u8>,
}

/// `navigator.mediaDevices`
#[async_trait]
pub trait MediaDevices: Send + Sync {
    async fn get_user_media(
        &self,
        constraints: MediaConstraints,
    ) -> Result<Arc<dyn MediaStream>, Error>;
}

/// A media stream bound to a hidden video element and an off-screen canvas.
#[async_trait]
pub trait MediaStream: Send + Sync {
    fn active(&self) -> bool;

    fn tracks(&self) -> Vec<Arc<dyn MediaTrack>>;

    fn settings(&self) -> TrackSettings;

    /// Resolves once the video element has loaded metadata.
    async fn loaded_metadata(&self) -> Result<(), Error>;

    /// Draws the current video frame onto a canvas of `width` x `height`.
    fn draw_frame(&self, width: u32, height: u32) -> Result<Frame, Error>;
}

pub trait MediaTrack: Send + Sync {
    fn stop(&self);
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CameraState {
    Idle,
    Acquiring,
    Streaming,
    Failed,
    Stopped,
}

struct Shared {
    state: CameraState,
    stream: Option<Arc<dyn MediaStream>>,
}

/// Owns the session's media stream exclusively.
pub struct CameraSnapshotService {
    devices: Arc<dyn MediaDevices>,
    logger: ActivityLogger,
    settings: MonitorSettings,
    runtime: Handle,
    shared: Arc<Mutex<Shared>>,
    shutdown: watch::Sender<bool>,
    task: Option<JoinHandle<()>>,
}

impl CameraSnapshotService {
    pub fn new(
        devices: Arc<dyn MediaDevices>,
        logger: ActivityLogger,
        settings: MonitorSettings,
        runtime: Handle,
    ) -> Self {
        let (shutdown, _) = watch::channel(false);
        Self {
            devices,
            logger,
            settings,
            runtime,
            shared: Arc::new(Mutex::new(Shared {
                state: CameraState::Idle,
                stream: None,
            })),
            shutdown,
            task: None,
        }
    }

    pub fn state(&self) -> CameraState {
        lock(&self.shared).state
    }

    /// Logs `camera_enabled` and starts acquiring in the background. Only the first call from
    /// `Idle` has any effect.
    #[instrument(skip_all, fields(route = %self.logger.route().path()))]
    pub fn start(&mut self) {
        {
            let mut shared = lock(&self.shared);
            if shared.state != CameraState::Idle {
                return;
            }
            shared.state = CameraState::Acquiring;
        }
        self.logger.log("camera_enabled");

        let run = run(
            Arc::clone(&self.devices),
            self.logger.clone(),
            Arc::clone(&self.shared),
            self.settings.clone(),
            self.shutdown.subscribe(),
        );
        self.task = Some(self.runtime.spawn(run));
    }

    /// Clears the snapshot interval and stops every track. Safe in any state and on repeat calls.
    pub fn stop(&mut self) {
        self.shutdown.send_replace(true);
        // The task is left to observe shutdown so a pending acquisition can release its stream.
        self.task.take();

        let stream = {
            let mut shared = lock(&self.shared);
            shared.state = CameraState::Stopped;
            shared.stream.take()
        };
        if let Some(stream) = stream {
            stop_tracks(stream.as_ref());
            info!("camera stream released");
        }
    }
}

impl Drop for CameraSnapshotService {
    fn drop(&mut self) {
        self.stop();
    }
}

fn lock(shared: &Mutex<Shared>) -> MutexGuard<'_, Shared> {
    shared.lock().unwrap_or_else(PoisonError::into_inner)
}

fn stop_tracks(stream: &dyn MediaStream) {
    for track in stream.tracks() {
        track.stop();
    }
}

async fn run(
    devices: Arc<dyn MediaDevices>,
    logger: ActivityLogger,
    shared: Arc<Mutex<Shared>>,
    settings: MonitorSettings,
    mut shutdown: watch::Receiver<bool>,
) {
    let stream = match devices.get_user_media(MediaConstraints::VIDEO_ONLY).await {
        Ok(stream) => stream,
        Err(error) => {
            {
                let mut shared = lock(&shared);
                if shared.state == CameraState::Acquiring {
                    shared.state = CameraState::Failed;
                }
            }
            logger.diagnostics().record(Failure::CameraUnavailable(&error));
            logger.log_activity("camera_disabled", json!({"error": error.to_string()}));
            return;
        }
    };

    {
        let mut shared = lock(&shared);
        if shared.state == CameraState::Stopped {
            debug!("session ended during acquisition");
            stop_tracks(stream.as_ref());
            return;
        }
        shared.state = CameraState::Streaming;
        shared.stream = Some(Arc::clone(&stream));
    }

    tokio::select! {
        ready = stream.loaded_metadata() => match ready {
            Ok(()) => take_snapshot(stream.as_ref(), &logger, settings.fallback_resolution),
            Err(error) => logger.diagnostics().record(Failure::Capture(&error)),
        },
        _ = shutdown.changed() => return,
    }

    let period = settings.snapshot_interval;
    let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                take_snapshot(stream.as_ref(), &logger, settings.fallback_resolution);
            }
            _ = shutdown.changed() => break,
        }
    }
    debug!("snapshot interval cleared");
}

/// One capture tick. Failures skip this tick only.
fn take_snapshot(stream: &dyn MediaStream, logger: &ActivityLogger, fallback: (u32, u32)) {
    if !stream.active() {
        let error = Error::Capture("media stream is no longer active".to_string());
        logger.diagnostics().record(Failure::Capture(&error));
        return;
    }
    let timestamp = Utc::now();
    match capture_png(stream, fallback) {
        Ok(png) => logger.upload_snapshot(png, timestamp),
        Err(error) => logger.diagnostics().record(Failure::Capture(&error)),
    }
}

/// Draws a frame at the stream's native resolution (or `fallback`) and encodes it.
pub fn capture_png(stream: &dyn MediaStream, fallback: (u32, u32)) -> Result<Vec<u8>, Error> {
    let (width, height) = canvas_size(stream.settings(), fallback);
    let frame = stream.draw_frame(width, height)?;
    encode_png(&frame)
}

pub fn canvas_size(settings: TrackSettings, fallback: (u32, u32)) -> (u32, u32) {
    match (settings.width, settings.height) {
        (Some(width), Some(height)) if width > 0 && height > 0 => (width, height),
        _ => fallback,
    }
}

pub fn encode_png(frame: &Frame) -> Result<Vec<u8>, Error> {
    let expected = frame.width as usize * frame.height as usize * 4;
    if frame.rgba.len() != expected {
        return Err(Error::Capture(format!(
            "frame holds {} bytes, expected {expected} for {}x{}",
            frame.rgba.len(),
            frame.width,
            frame.height
        )));
    }

    let mut encoded = Vec::new();
    {
        let mut encoder = png::Encoder::new(&mut encoded, frame.width, frame.height);
        encoder.set_color(png::ColorType::Rgba);
        encoder.set_depth(png::BitDepth::Eight);
        let mut writer = encoder.write_header()?;
        writer.write_image_data(&frame.rgba)?;
        writer.finish()?;
    }
    Ok(encoded)
}
