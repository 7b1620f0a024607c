use once_cell::sync::Lazy;

const DEFAULT_POLL_INTERVAL_MS: u64 = 5;
const DEFAULT_FLOAT_PRECISION: usize = 6;

#[derive(Debug)]
pub struct Config {
    /// Period of the passive bus poll.
    pub poll_interval_ms: u64,
    /// Digits after the decimal point for decoded float16 values.
    pub float_precision: usize,
    /// Emit a debug log line for every monitored frame.
    pub log_frames: bool,
    /// Log the request header bytes when a request fails.
    pub dump_on_error: bool,
}

impl Config {
    fn from_env() -> Self {
        let poll_interval_ms = std::env::var("MBMON_POLL_INTERVAL_MS")
            .ok()
            .and_then(|s| s.parse().ok())
            .filter(|v: &u64| *v > 0)
            .unwrap_or(DEFAULT_POLL_INTERVAL_MS);
        let float_precision = std::env::var("MBMON_FLOAT_PRECISION")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(DEFAULT_FLOAT_PRECISION);
        let log_frames = std::env::var("MBMON_LOG_FRAMES")
            .map(|v| v == "1")
            .unwrap_or(false);
        let dump_on_error = std::env::var("MBMON_DUMP_ON_ERROR")
            .map(|v| v == "1")
            .unwrap_or(false);
        Self {
            poll_interval_ms,
            float_precision,
            log_frames,
            dump_on_error,
        }
    }

    #[must_use]
    pub const fn poll_interval(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.poll_interval_ms)
    }
}

/// Global config loaded once from environment at first access.
pub static GLOBAL_CONFIG: Lazy<Config> = Lazy::new(Config::from_env);

/// Convenience accessor
pub fn config() -> &'static Config {
    &GLOBAL_CONFIG
}
