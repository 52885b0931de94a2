#![allow(dead_code)]
use std::sync::{
    Arc, Mutex,
    atomic::{AtomicBool, AtomicUsize, Ordering},
};

use async_trait::async_trait;
use proctor_core::{
    ActivityEvent, ActivityTransport, AssessmentType, Error, MonitorDeps, ProctoringMonitor,
    SessionContext, SnapshotUpload,
    activity::StaticToken,
    camera::{Frame, MediaConstraints, MediaDevices, MediaStream, MediaTrack, TrackSettings},
    config::MonitorSettings,
    diagnostics::{Diagnostics, Failure},
    platform::{Document, SyntheticDocument},
    session::ActivityRoute,
};
use tokio::sync::Notify;

/// Lets every spawned send and the camera task run to their next suspension point.
pub async fn settle() {
    for _ in 0..20 {
        tokio::task::yield_now().await;
    }
}

#[derive(Default)]
pub struct RecordingTransport {
    activities: Mutex<Vec<(ActivityRoute, ActivityEvent)>>,
    snapshots: Mutex<Vec<(ActivityRoute, SnapshotUpload, Option<String>)>>,
    fail: bool,
}

impl RecordingTransport {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Default::default()
        }
    }

    pub fn activities(&self) -> Vec<(ActivityRoute, ActivityEvent)> {
        self.activities.lock().unwrap().clone()
    }

    pub fn activity_types(&self) -> Vec<String> {
        self.activities()
            .into_iter()
            .map(|(_, e)| e.activity_type)
            .collect()
    }

    pub fn events_of(&self, activity_type: &str) -> Vec<ActivityEvent> {
        self.activities()
            .into_iter()
            .map(|(_, e)| e)
            .filter(|e| e.activity_type == activity_type)
            .collect()
    }

    pub fn snapshots(&self) -> Vec<(ActivityRoute, SnapshotUpload, Option<String>)> {
        self.snapshots.lock().unwrap().clone()
    }
}

#[async_trait]
impl ActivityTransport for RecordingTransport {
    async fn post_activity(&self, route: &ActivityRoute, event: &ActivityEvent) -> Result<(), Error> {
        self.activities
            .lock()
            .unwrap()
            .push((route.clone(), event.clone()));
        if self.fail {
            return Err(Error::Status(503));
        }
        Ok(())
    }

    async fn post_snapshot(
        &self,
        route: &ActivityRoute,
        snapshot: &SnapshotUpload,
        bearer: Option<&str>,
    ) -> Result<(), Error> {
        self.snapshots.lock().unwrap().push((
            route.clone(),
            snapshot.clone(),
            bearer.map(str::to_string),
        ));
        if self.fail {
            return Err(Error::Transport("connection refused".to_string()));
        }
        Ok(())
    }
}

#[derive(Default)]
pub struct RecordingDiagnostics {
    entries: Mutex<Vec<String>>,
}

impl RecordingDiagnostics {
    pub fn entries(&self) -> Vec<String> {
        self.entries.lock().unwrap().clone()
    }

    pub fn count(&self, prefix: &str) -> usize {
        self.entries()
            .iter()
            .filter(|e| e.starts_with(prefix))
            .count()
    }
}

impl Diagnostics for RecordingDiagnostics {
    fn record(&self, failure: Failure<'_>) {
        let entry = match failure {
            Failure::Delivery {
                activity_type,
                error,
            } => format!("delivery:{activity_type}:{error}"),
            Failure::Capture(error) => format!("capture:{error}"),
            Failure::CameraUnavailable(error) => format!("camera:{error}"),
        };
        self.entries.lock().unwrap().push(entry);
    }
}

#[derive(Default)]
pub struct FakeTrack {
    stops: AtomicUsize,
}

impl FakeTrack {
    pub fn stops(&self) -> usize {
        self.stops.load(Ordering::SeqCst)
    }
}

impl MediaTrack for FakeTrack {
    fn stop(&self) {
        self.stops.fetch_add(1, Ordering::SeqCst);
    }
}

pub struct FakeStream {
    pub track: Arc<FakeTrack>,
    draws: AtomicUsize,
    fail_draws: AtomicBool,
    fail_metadata: AtomicBool,
    inactive: AtomicBool,
    settings: TrackSettings,
}

impl FakeStream {
    pub fn new() -> Self {
        Self {
            track: Arc::new(FakeTrack::default()),
            draws: AtomicUsize::new(0),
            fail_draws: AtomicBool::new(false),
            fail_metadata: AtomicBool::new(false),
            inactive: AtomicBool::new(false),
            settings: TrackSettings {
                width: Some(4),
                height: Some(3),
            },
        }
    }

    pub fn draws(&self) -> usize {
        self.draws.load(Ordering::SeqCst)
    }

    pub fn fail_draws(&self, fail: bool) {
        self.fail_draws.store(fail, Ordering::SeqCst);
    }

    pub fn fail_metadata(&self, fail: bool) {
        self.fail_metadata.store(fail, Ordering::SeqCst);
    }

    /// Simulates the device going away without the track being stopped
    pub fn set_inactive(&self, inactive: bool) {
        self.inactive.store(inactive, Ordering::SeqCst);
    }
}

#[async_trait]
impl MediaStream for FakeStream {
    fn active(&self) -> bool {
        self.track.stops() == 0 && !self.inactive.load(Ordering::SeqCst)
    }

    fn tracks(&self) -> Vec<Arc<dyn MediaTrack>> {
        vec![self.track.clone() as Arc<dyn MediaTrack>]
    }

    fn settings(&self) -> TrackSettings {
        self.settings
    }

    async fn loaded_metadata(&self) -> Result<(), Error> {
        if self.fail_metadata.load(Ordering::SeqCst) {
            return Err(Error::Capture("metadata never loaded".to_string()));
        }
        Ok(())
    }

    fn draw_frame(&self, width: u32, height: u32) -> Result<Frame, Error> {
        self.draws.fetch_add(1, Ordering::SeqCst);
        if self.fail_draws.load(Ordering::SeqCst) {
            return Err(Error::Capture("video not ready".to_string()));
        }
        Ok(Frame {
            width,
            height,
            rgba: vec![128; (width * height * 4) as usize],
        })
    }
}

pub struct FakeMedia {
    pub stream: Arc<FakeStream>,
    denied: Option<String>,
    gate: Option<Notify>,
    calls: AtomicUsize,
}

impl FakeMedia {
    pub fn streaming() -> Self {
        Self {
            stream: Arc::new(FakeStream::new()),
            denied: None,
            gate: None,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn denied(reason: &str) -> Self {
        Self {
            denied: Some(reason.to_string()),
            ..Self::streaming()
        }
    }

    /// Acquisition blocks until [`FakeMedia::release`]
    pub fn gated() -> Self {
        Self {
            gate: Some(Notify::new()),
            ..Self::streaming()
        }
    }

    pub fn release(&self) {
        if let Some(gate) = &self.gate {
            gate.notify_one();
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MediaDevices for FakeMedia {
    async fn get_user_media(
        &self,
        constraints: MediaConstraints,
    ) -> Result<Arc<dyn MediaStream>, Error> {
        assert_eq!(constraints, MediaConstraints::VIDEO_ONLY);
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
        match &self.denied {
            Some(reason) => Err(Error::Camera(reason.clone())),
            None => Ok(self.stream.clone() as Arc<dyn MediaStream>),
        }
    }
}

pub struct Harness {
    pub document: Arc<SyntheticDocument>,
    pub transport: Arc<RecordingTransport>,
    pub media: Arc<FakeMedia>,
    pub diagnostics: Arc<RecordingDiagnostics>,
}

impl Harness {
    pub fn new(media: FakeMedia) -> Self {
        Self::with_transport(media, RecordingTransport::default())
    }

    pub fn with_transport(media: FakeMedia, transport: RecordingTransport) -> Self {
        Self {
            document: Arc::new(SyntheticDocument::new()),
            transport: Arc::new(transport),
            media: Arc::new(media),
            diagnostics: Arc::new(RecordingDiagnostics::default()),
        }
    }

    pub fn deps(&self) -> MonitorDeps {
        MonitorDeps::new(
            self.document.clone() as Arc<dyn Document>,
            self.media.clone(),
            self.transport.clone(),
            Arc::new(StaticToken(Some("token-1".to_string()))),
        )
        .with_diagnostics(self.diagnostics.clone())
    }

    pub fn monitor(&self, context: SessionContext) -> ProctoringMonitor {
        ProctoringMonitor::new(context, self.deps(), MonitorSettings::default()).unwrap()
    }

    /// Observers only, so assertions are not interleaved with camera activity
    pub fn monitor_without_camera(&self, context: SessionContext) -> ProctoringMonitor {
        let settings = MonitorSettings {
            camera_enabled: false,
            ..Default::default()
        };
        ProctoringMonitor::new(context, self.deps(), settings).unwrap()
    }
}

pub fn skill_test(enabled: bool) -> SessionContext {
    SessionContext::new("123", AssessmentType::SkillTest, enabled)
}
