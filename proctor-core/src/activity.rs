use std::sync::{
    Arc, Mutex, PoisonError,
    atomic::{AtomicBool, Ordering},
};

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Serialize, Serializer};
use serde_json::{Map, Value};
use tokio::runtime::Handle;
use tracing::debug;

use crate::{
    diagnostics::{Diagnostics, Failure},
    error::Error,
    session::{ActivityRoute, SessionContext},
};

pub const SNAPSHOT_ACTIVITY_TYPE: &str = "snapshot";

/// One observed action. The timestamp is taken when the action is observed, never at send time.
#[derive(Clone, Debug, Serialize)]
pub struct ActivityEvent {
    pub activity_type: String,
    pub meta_data: Value,
    #[serde(serialize_with = "serialize_timestamp")]
    pub timestamp: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub question_id: Option<String>,
}

/// A captured camera frame, already PNG encoded.
#[derive(Clone, Debug)]
pub struct SnapshotUpload {
    pub png: Vec<u8>,
    pub timestamp: DateTime<Utc>,
    pub question_id: Option<String>,
}

impl SnapshotUpload {
    pub fn timestamp_iso8601(&self) -> String {
        iso8601(&self.timestamp)
    }
}

/// `2024-05-01T10:00:00.000Z`
pub fn iso8601(timestamp: &DateTime<Utc>) -> String {
    timestamp.to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn serialize_timestamp<S>(timestamp: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(&iso8601(timestamp))
}

/// Authenticated POST primitives the monitor needs from the outside world.
///
/// Token refresh and any retry policy belong to the implementor. The monitor calls each method
/// at most once per event and never awaits the result on the event path.
#[async_trait]
pub trait ActivityTransport: Send + Sync {
    /// JSON variant. Authentication is the implementor's concern.
    async fn post_activity(
        &self,
        route: &ActivityRoute,
        event: &ActivityEvent,
    ) -> Result<(), Error>;

    /// Multipart variant. `bearer` is read from the [`TokenProvider`] at send time.
    async fn post_snapshot(
        &self,
        route: &ActivityRoute,
        snapshot: &SnapshotUpload,
        bearer: Option<&str>,
    ) -> Result<(), Error>;
}

/// Synchronous accessor for whatever auth token is current. Never refreshes.
pub trait TokenProvider: Send + Sync {
    fn auth_token(&self) -> Option<String>;
}

impl<F> TokenProvider for F
where
    F: Fn() -> Option<String> + Send + Sync,
{
    fn auth_token(&self) -> Option<String> {
        self()
    }
}

#[derive(Clone, Debug, Default)]
pub struct StaticToken(pub Option<String>);

impl TokenProvider for StaticToken {
    fn auth_token(&self) -> Option<String> {
        self.0.clone()
    }
}

/// Fire-and-forget activity pipe for one session.
///
/// Clones share state, so a clone handed to an observer is the same logger the monitor disables
/// on teardown.
#[derive(Clone)]
pub struct ActivityLogger {
    inner: Arc<LoggerInner>,
}

struct LoggerInner {
    route: ActivityRoute,
    enabled: AtomicBool,
    question_id: Mutex<Option<String>>,
    transport: Arc<dyn ActivityTransport>,
    tokens: Arc<dyn TokenProvider>,
    diagnostics: Arc<dyn Diagnostics>,
    runtime: Handle,
}

impl ActivityLogger {
    pub fn new(
        context: &SessionContext,
        transport: Arc<dyn ActivityTransport>,
        tokens: Arc<dyn TokenProvider>,
        diagnostics: Arc<dyn Diagnostics>,
        runtime: Handle,
    ) -> Self {
        Self {
            inner: Arc::new(LoggerInner {
                route: context.route(),
                enabled: AtomicBool::new(context.enabled),
                question_id: Mutex::new(context.question_id.clone()),
                transport,
                tokens,
                diagnostics,
                runtime,
            }),
        }
    }

    pub fn route(&self) -> &ActivityRoute {
        &self.inner.route
    }

    pub fn is_enabled(&self) -> bool {
        self.inner.enabled.load(Ordering::Acquire)
    }

    /// Closes the gate. A disabled logger never dispatches again, and sends queued before the
    /// gate closed are dropped.
    pub fn disable(&self) {
        self.inner.enabled.store(false, Ordering::Release);
    }

    pub fn question_id(&self) -> Option<String> {
        self.inner
            .question_id
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn set_question_id(&self, question_id: Option<String>) {
        *self
            .inner
            .question_id
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = question_id;
    }

    /// Whether both handles are the same logger
    pub fn ptr_eq(&self, other: &ActivityLogger) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Stamps an event, or `None` when the session is disabled.
    pub fn event(&self, activity_type: &str, meta_data: Value) -> Option<ActivityEvent> {
        if !self.is_enabled() {
            return None;
        }
        let meta_data = match meta_data {
            Value::Null => Value::Object(Map::new()),
            other => other,
        };
        Some(ActivityEvent {
            activity_type: activity_type.to_string(),
            meta_data,
            timestamp: Utc::now(),
            question_id: self.question_id(),
        })
    }

    pub fn log(&self, activity_type: &str) {
        self.log_activity(activity_type, Value::Object(Map::new()));
    }

    /// Sends one activity in the background. Returns immediately; failures go to diagnostics.
    pub fn log_activity(&self, activity_type: &str, meta_data: Value) {
        let Some(event) = self.event(activity_type, meta_data) else {
            debug!(activity_type, "session disabled, dropping activity");
            return;
        };

        let inner = Arc::clone(&self.inner);
        self.inner.runtime.spawn(async move {
            if !inner.enabled.load(Ordering::Acquire) {
                debug!(activity_type = %event.activity_type, "session closed before send");
                return;
            }
            if let Err(error) = inner.transport.post_activity(&inner.route, &event).await {
                inner.diagnostics.record(Failure::Delivery {
                    activity_type: &event.activity_type,
                    error: &error,
                });
            }
        });
    }

    /// Sends a PNG frame through the multipart path, authenticated with the token current at
    /// send time.
    pub fn upload_snapshot(&self, png: Vec<u8>, timestamp: DateTime<Utc>) {
        if !self.is_enabled() {
            debug!("session disabled, dropping snapshot");
            return;
        }
        let snapshot = SnapshotUpload {
            png,
            timestamp,
            question_id: self.question_id(),
        };

        let inner = Arc::clone(&self.inner);
        self.inner.runtime.spawn(async move {
            if !inner.enabled.load(Ordering::Acquire) {
                debug!("session closed before snapshot send");
                return;
            }
            let token = inner.tokens.auth_token();
            if let Err(error) = inner
                .transport
                .post_snapshot(&inner.route, &snapshot, token.as_deref())
                .await
            {
                inner.diagnostics.record(Failure::Delivery {
                    activity_type: SNAPSHOT_ACTIVITY_TYPE,
                    error: &error,
                });
            }
        });
    }

    pub(crate) fn diagnostics(&self) -> &Arc<dyn Diagnostics> {
        &self.inner.diagnostics
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use serde_json::json;

    use super::*;
    use crate::{diagnostics::TracingDiagnostics, session::AssessmentType};

    struct NullTransport;

    #[async_trait]
    impl ActivityTransport for NullTransport {
        async fn post_activity(
            &self,
            _route: &ActivityRoute,
            _event: &ActivityEvent,
        ) -> Result<(), Error> {
            Ok(())
        }

        async fn post_snapshot(
            &self,
            _route: &ActivityRoute,
            _snapshot: &SnapshotUpload,
            _bearer: Option<&str>,
        ) -> Result<(), Error> {
            Ok(())
        }
    }

    #[derive(Default)]
    struct CountingTransport {
        sent: Mutex<usize>,
    }

    impl CountingTransport {
        fn sent(&self) -> usize {
            *self.sent.lock().unwrap()
        }
    }

    #[async_trait]
    impl ActivityTransport for CountingTransport {
        async fn post_activity(
            &self,
            _route: &ActivityRoute,
            _event: &ActivityEvent,
        ) -> Result<(), Error> {
            *self.sent.lock().unwrap() += 1;
            Ok(())
        }

        async fn post_snapshot(
            &self,
            _route: &ActivityRoute,
            _snapshot: &SnapshotUpload,
            _bearer: Option<&str>,
        ) -> Result<(), Error> {
            *self.sent.lock().unwrap() += 1;
            Ok(())
        }
    }

    fn logger(context: &SessionContext) -> ActivityLogger {
        logger_with(context, Arc::new(NullTransport))
    }

    fn logger_with(
        context: &SessionContext,
        transport: Arc<dyn ActivityTransport>,
    ) -> ActivityLogger {
        ActivityLogger::new(
            context,
            transport,
            Arc::new(StaticToken::default()),
            Arc::new(TracingDiagnostics),
            Handle::current(),
        )
    }

    #[test]
    fn event_serializes_to_wire_shape() {
        let event = ActivityEvent {
            activity_type: "tab_switched".to_string(),
            meta_data: json!({"type": "hidden"}),
            timestamp: Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap(),
            question_id: None,
        };
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(
            value,
            json!({
                "activity_type": "tab_switched",
                "meta_data": {"type": "hidden"},
                "timestamp": "2024-05-01T10:00:00.000Z",
            })
        );
    }

    #[tokio::test]
    async fn disabled_logger_stamps_nothing() {
        let context = SessionContext::new("7", AssessmentType::Contest, false);
        let logger = logger(&context);
        assert!(logger.event("copy_detected", json!({})).is_none());
    }

    #[tokio::test]
    async fn events_carry_current_question_id() {
        let context = SessionContext::new("7", AssessmentType::Contest, true).with_question_id("q1");
        let logger = logger(&context);
        let first = logger.event("window_blur", Value::Null).unwrap();
        assert_eq!(first.question_id.as_deref(), Some("q1"));
        assert_eq!(first.meta_data, json!({}));

        logger.set_question_id(Some("q2".to_string()));
        let second = logger.event("window_blur", Value::Null).unwrap();
        assert_eq!(second.question_id.as_deref(), Some("q2"));
        assert!(second.timestamp >= first.timestamp);
    }

    #[tokio::test]
    async fn disable_is_seen_by_every_clone() {
        let context = SessionContext::new("7", AssessmentType::JobTest, true);
        let logger = logger(&context);
        let observer_copy = logger.clone();
        logger.disable();
        assert!(!observer_copy.is_enabled());
        assert!(observer_copy.ptr_eq(&logger));
    }

    #[tokio::test]
    async fn queued_sends_are_dropped_once_disabled() {
        let context = SessionContext::new("7", AssessmentType::SkillTest, true);
        let transport = Arc::new(CountingTransport::default());
        let logger = logger_with(&context, transport.clone());

        logger.log_activity("tab_switched", json!({"type": "hidden"}));
        logger.upload_snapshot(vec![0x89], Utc::now());
        logger.disable();
        for _ in 0..5 {
            tokio::task::yield_now().await;
        }
        assert_eq!(transport.sent(), 0);

        let live = logger_with(&context, transport.clone());
        live.log("window_blur");
        live.upload_snapshot(vec![0x89], Utc::now());
        for _ in 0..5 {
            tokio::task::yield_now().await;
        }
        assert_eq!(transport.sent(), 2);
    }
}
