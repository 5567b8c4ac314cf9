//! Capability probe
//!
//! Inspects the runtime once at startup: is a native symbol detector
//! available, and does the platform look iOS-like. The hint only picks
//! timeout budgets and status wording; it never changes decoding
//! behavior.

/// Coarse platform classification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlatformHint {
    /// iOS-family device; library fallback is known unreliable here
    IosLike,
    Other,
}

impl PlatformHint {
    /// Classify from a user-agent style string
    pub fn from_user_agent(user_agent: &str) -> Self {
        if ["iPad", "iPhone", "iPod"]
            .iter()
            .any(|m| user_agent.contains(m))
        {
            PlatformHint::IosLike
        } else {
            PlatformHint::Other
        }
    }
}

/// Capability snapshot, computed once and immutable for the session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CapabilitySnapshot {
    pub has_native_detector: bool,
    pub platform_hint: PlatformHint,
}

impl CapabilitySnapshot {
    pub fn probe(has_native_detector: bool, user_agent: &str) -> Self {
        let snapshot = Self {
            has_native_detector,
            platform_hint: PlatformHint::from_user_agent(user_agent),
        };
        tracing::info!(
            has_native_detector = snapshot.has_native_detector,
            platform_hint = ?snapshot.platform_hint,
            "Capability snapshot"
        );
        snapshot
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_iphone_is_ios_like() {
        let hint = PlatformHint::from_user_agent(
            "Mozilla/5.0 (iPhone; CPU iPhone OS 17_0 like Mac OS X)",
        );
        assert_eq!(hint, PlatformHint::IosLike);
    }

    #[test]
    fn test_ipad_is_ios_like() {
        let hint = PlatformHint::from_user_agent("Mozilla/5.0 (iPad; CPU OS 16_6)");
        assert_eq!(hint, PlatformHint::IosLike);
    }

    #[test]
    fn test_android_is_other() {
        let hint = PlatformHint::from_user_agent("Mozilla/5.0 (Linux; Android 14)");
        assert_eq!(hint, PlatformHint::Other);
    }

    #[test]
    fn test_snapshot_carries_native_flag() {
        let snapshot = CapabilitySnapshot::probe(true, "Mozilla/5.0 (X11; Linux x86_64)");
        assert!(snapshot.has_native_detector);
        assert_eq!(snapshot.platform_hint, PlatformHint::Other);
    }
}
