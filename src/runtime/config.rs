use serde::Deserialize;
use tokio::time::Duration;

/// Tuning for [`super::handle::spawn_table_view`].
///
/// Missing keys fall back to [`RuntimeConfig::default`].
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Quiet period before raw search input is committed.
    pub debounce_ms: u64,
    /// Initial rows per page.
    pub page_size: usize,
    /// Bound of the command queue.
    pub command_queue_bound: usize,
    /// Capacity of the broadcast event channel.
    pub event_capacity: usize,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            debounce_ms: 500,
            page_size: 5,
            command_queue_bound: 256,
            event_capacity: 1024,
        }
    }
}

impl RuntimeConfig {
    /// Parses a JSON object; absent keys keep their defaults.
    pub fn from_json_str(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Search debounce window.
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}
