use std::time::Duration;

pub const DEFAULT_SNAPSHOT_INTERVAL: Duration = Duration::from_secs(15);
pub const FALLBACK_RESOLUTION: (u32, u32) = (640, 480);

/// Tunables of a monitor. The suppression key sets are fixed and not part of this.
#[derive(Clone, Debug)]
pub struct MonitorSettings {
    pub snapshot_interval: Duration,
    /// Canvas size used when the stream does not report its native resolution
    pub fallback_resolution: (u32, u32),
    pub camera_enabled: bool,
}

impl Default for MonitorSettings {
    fn default() -> Self {
        Self {
            snapshot_interval: DEFAULT_SNAPSHOT_INTERVAL,
            fallback_resolution: FALLBACK_RESOLUTION,
            camera_enabled: true,
        }
    }
}
