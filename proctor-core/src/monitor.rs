//! Session lifecycle controller.
use std::sync::Arc;

use serde_json::Value;
use tokio::runtime::Handle;
use tracing::{debug, info, instrument};

use crate::{
    activity::{ActivityLogger, ActivityTransport, TokenProvider},
    camera::{CameraSnapshotService, CameraState, MediaDevices},
    config::MonitorSettings,
    diagnostics::{Diagnostics, TracingDiagnostics},
    error::Error,
    platform::Document,
    session::SessionContext,
    surveillance::{AttachedSurveillance, SurveillanceSet},
};

/// Collaborators injected into a monitor.
#[derive(Clone)]
pub struct MonitorDeps {
    pub document: Arc<dyn Document>,
    pub media: Arc<dyn MediaDevices>,
    pub transport: Arc<dyn ActivityTransport>,
    pub tokens: Arc<dyn TokenProvider>,
    pub diagnostics: Arc<dyn Diagnostics>,
}

impl MonitorDeps {
    pub fn new(
        document: Arc<dyn Document>,
        media: Arc<dyn MediaDevices>,
        transport: Arc<dyn ActivityTransport>,
        tokens: Arc<dyn TokenProvider>,
    ) -> Self {
        Self {
            document,
            media,
            transport,
            tokens,
            diagnostics: Arc::new(TracingDiagnostics),
        }
    }

    pub fn with_diagnostics(mut self, diagnostics: Arc<dyn Diagnostics>) -> Self {
        self.diagnostics = diagnostics;
        self
    }
}

struct ActiveSession {
    surveillance: AttachedSurveillance,
    camera: Option<CameraSnapshotService>,
}

/// Proctors one assessment attempt for as long as it lives.
///
/// Observers and the camera attach on construction when the session is enabled. Any change of
/// assessment id, assessment type or the enabled gate tears everything down and attaches afresh.
pub struct ProctoringMonitor {
    deps: MonitorDeps,
    settings: MonitorSettings,
    surveillance: SurveillanceSet,
    runtime: Handle,
    context: SessionContext,
    logger: ActivityLogger,
    active: Option<ActiveSession>,
}

impl ProctoringMonitor {
    /// Must be called from within a tokio runtime.
    pub fn new(
        context: SessionContext,
        deps: MonitorDeps,
        settings: MonitorSettings,
    ) -> Result<Self, Error> {
        Self::with_surveillance(context, deps, settings, SurveillanceSet::standard())
    }

    pub fn with_surveillance(
        context: SessionContext,
        deps: MonitorDeps,
        settings: MonitorSettings,
        surveillance: SurveillanceSet,
    ) -> Result<Self, Error> {
        let runtime = Handle::try_current()?;
        let logger = new_logger(&context, &deps, &runtime);
        let mut monitor = Self {
            deps,
            settings,
            surveillance,
            runtime,
            context,
            logger,
            active: None,
        };
        monitor.setup();
        Ok(monitor)
    }

    pub fn context(&self) -> &SessionContext {
        &self.context
    }

    /// The session's logger. Stable until the session identity changes.
    pub fn logger(&self) -> ActivityLogger {
        self.logger.clone()
    }

    /// Lets the exam screen emit its own events through the same pipe.
    pub fn log_activity(&self, activity_type: &str, meta_data: Value) {
        self.logger.log_activity(activity_type, meta_data);
    }

    pub fn is_active(&self) -> bool {
        self.active.is_some()
    }

    pub fn camera_state(&self) -> Option<CameraState> {
        self.active
            .as_ref()
            .and_then(|active| active.camera.as_ref())
            .map(CameraSnapshotService::state)
    }

    /// Names of observers currently holding listeners
    pub fn observing(&self) -> Vec<&'static str> {
        self.active
            .as_ref()
            .map(|active| active.surveillance.attached())
            .unwrap_or_default()
    }

    /// Applies a new session context. A changed question id only retags future events;
    /// any other change is a full teardown followed by a fresh setup.
    #[instrument(skip_all, fields(assessment_id = %context.assessment_id))]
    pub fn update(&mut self, context: SessionContext) {
        if self.context.same_session(&context) {
            if self.context.question_id != context.question_id {
                self.logger.set_question_id(context.question_id.clone());
            }
            self.context = context;
            return;
        }

        info!(
            from = %self.context.assessment_id,
            to = %context.assessment_id,
            enabled = context.enabled,
            "session changed, re-initialising"
        );
        self.teardown();
        self.logger = new_logger(&context, &self.deps, &self.runtime);
        self.context = context;
        self.setup();
    }

    fn setup(&mut self) {
        if !self.context.enabled {
            debug!("session disabled, nothing to observe");
            return;
        }

        let surveillance = self.surveillance.attach(&self.deps.document, &self.logger);
        let camera = self.settings.camera_enabled.then(|| {
            let mut camera = CameraSnapshotService::new(
                Arc::clone(&self.deps.media),
                self.logger.clone(),
                self.settings.clone(),
                self.runtime.clone(),
            );
            camera.start();
            camera
        });
        info!(
            route = %self.logger.route().path(),
            observers = ?surveillance.attached(),
            "proctoring attached"
        );
        self.active = Some(ActiveSession {
            surveillance,
            camera,
        });
    }

    /// Detaches every observer, clears the snapshot interval and releases the camera.
    /// Idempotent, and safe whatever state setup reached.
    pub fn teardown(&mut self) {
        self.logger.disable();
        let Some(mut active) = self.active.take() else {
            return;
        };
        active.surveillance.detach();
        if let Some(mut camera) = active.camera {
            camera.stop();
        }
        info!(route = %self.logger.route().path(), "proctoring detached");
    }
}

impl Drop for ProctoringMonitor {
    fn drop(&mut self) {
        self.teardown();
    }
}

fn new_logger(context: &SessionContext, deps: &MonitorDeps, runtime: &Handle) -> ActivityLogger {
    ActivityLogger::new(
        context,
        Arc::clone(&deps.transport),
        Arc::clone(&deps.tokens),
        Arc::clone(&deps.diagnostics),
        runtime.clone(),
    )
}
