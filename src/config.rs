//! Application configuration
//!
//! Env-var backed with sensible defaults. Timeout budgets and the poll
//! interval are tunable policy, not correctness knobs.

use crate::detection::DebouncePolicy;
use crate::normalize::SymbologySet;
use std::time::Duration;

/// Application configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Registry base URL
    pub registry_url: String,
    /// Caller-identifying tag sent with every submission
    pub client_info: String,
    /// Native detection poll interval in milliseconds (100..=1000)
    pub poll_interval_ms: u64,
    /// Zoom step per button press, in the device's native unit
    pub zoom_step: f64,
    /// Init budget for the native backend
    pub native_init_timeout: Duration,
    /// Init budget for the fallback library on iOS-like platforms
    /// (shorter; the library is known unreliable there)
    pub fallback_init_timeout_ios: Duration,
    /// Init budget for the fallback library elsewhere
    pub fallback_init_timeout_other: Duration,
    /// Capture resolution hints
    pub width_hint: u32,
    pub height_hint: u32,
    /// Enabled symbology subset
    pub symbologies: SymbologySet,
    /// Repeat-emission policy for the detection loop
    pub debounce: DebouncePolicy,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            registry_url: std::env::var("REGISTRY_URL")
                .unwrap_or_else(|_| "http://localhost:8080".to_string()),
            client_info: std::env::var("CLIENT_INFO")
                .unwrap_or_else(|_| format!("scanpost/{}", env!("CARGO_PKG_VERSION"))),
            poll_interval_ms: std::env::var("POLL_INTERVAL_MS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(1000),
            zoom_step: 0.2,
            native_init_timeout: Duration::from_secs(10),
            fallback_init_timeout_ios: Duration::from_secs(5),
            fallback_init_timeout_other: Duration::from_secs(10),
            width_hint: 640,
            height_hint: 480,
            symbologies: SymbologySet::ean13_only(),
            debounce: DebouncePolicy::EmitEveryTick,
        }
    }
}

impl AppConfig {
    /// Clamp the poll interval into its supported range
    pub fn effective_poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.clamp(100, 1000))
    }

    /// Fallback init budget for the probed platform
    pub fn fallback_init_timeout(&self, ios_like: bool) -> Duration {
        if ios_like {
            self.fallback_init_timeout_ios
        } else {
            self.fallback_init_timeout_other
        }
    }
}
