use chrono::Duration;

/// Tunables for the bidding engine.
#[derive(Clone, Debug)]
pub struct EngineConfig {
    /// A bid landing closer than this to the closing time pushes the close
    /// out to `bid time + window`.
    pub soft_close_window: Duration,
    /// Increment applied when neither the lot nor the active stage defines
    /// one, in minor units.
    pub default_increment_minor: u64,
    /// How long a bid request may wait for its lot's turn before failing
    /// with `LockTimeout`.
    pub lock_timeout: std::time::Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            soft_close_window: Duration::minutes(5),
            default_increment_minor: 1,
            lock_timeout: std::time::Duration::from_secs(5),
        }
    }
}

impl EngineConfig {
    /// Config with a custom soft-close window, other fields at defaults.
    pub fn with_soft_close_window(window: Duration) -> Self {
        Self {
            soft_close_window: window,
            ..Self::default()
        }
    }
}
