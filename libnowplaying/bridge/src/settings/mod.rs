use std::time::Duration;

#[derive(Clone, Debug)]
pub struct Settings {
    pub fetch_timeout: Duration,
    pub max_artwork_bytes: usize,
    pub fetch_retries: u32,
    /// Cancel an in-flight artwork fetch as soon as a newer publish or clear supersedes it.
    /// Stale results are discarded either way.
    pub cancel_stale_fetches: bool,
    /// Keep already-resolved artwork when a publish repeats the current artwork URL.
    pub reuse_resolved_artwork: bool,
    /// Clamped to at least 1.
    pub event_capacity: usize,
    /// Transport signals queued for the application before new ones are dropped.
    /// Clamped to at least 1.
    pub signal_capacity: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            fetch_timeout: Duration::from_secs(10),
            max_artwork_bytes: 10 * 1024 * 1024,
            fetch_retries: 2,
            cancel_stale_fetches: true,
            reuse_resolved_artwork: true,
            event_capacity: 32,
            signal_capacity: 32,
        }
    }
}
