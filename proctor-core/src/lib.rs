//! Exam Proctoring Monitor
//!
//! ## Current API
//!
//! - Log assessment activity to the backend (fire-and-forget)
//! - Observe and suppress browser affordances during an attempt
//! - Capture periodic camera snapshots
//! - Tie all of the above to the lifetime of an assessment session
//!
pub mod activity;
pub mod camera;
pub mod config;
pub mod diagnostics;
pub mod error;
pub mod keyboard;
pub mod monitor;
pub mod platform;
pub mod session;
pub mod surveillance;

pub use activity::{ActivityEvent, ActivityLogger, ActivityTransport, SnapshotUpload, TokenProvider};
pub use error::Error;
pub use monitor::{MonitorDeps, ProctoringMonitor};
pub use session::{AssessmentType, SessionContext};
