//! Local diagnostic channel.
//!
//! Failures inside the monitor are never surfaced to the exam screen. They are handed to a
//! [`Diagnostics`] sink and dropped: no retry, no queue, no state change.
use tracing::{error, warn};

use crate::error::Error;

#[derive(Debug)]
pub enum Failure<'a> {
    /// Activity log or snapshot upload did not reach the backend
    Delivery {
        activity_type: &'a str,
        error: &'a Error,
    },
    /// A single snapshot tick could not produce a frame
    Capture(&'a Error),
    /// `getUserMedia` rejected; the session continues without camera coverage
    CameraUnavailable(&'a Error),
}

pub trait Diagnostics: Send + Sync {
    fn record(&self, failure: Failure<'_>);
}

/// Swallow-and-log policy backed by `tracing`.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingDiagnostics;

impl Diagnostics for TracingDiagnostics {
    fn record(&self, failure: Failure<'_>) {
        match failure {
            Failure::Delivery {
                activity_type,
                error,
            } => {
                warn!(activity_type, error = %error, "unable to deliver activity");
            }
            Failure::Capture(error) => {
                warn!(error = %error, "snapshot skipped");
            }
            Failure::CameraUnavailable(error) => {
                error!(error = %error, "camera unavailable for session");
            }
        }
    }
}
