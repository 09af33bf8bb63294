//! Escalation thresholds and per-method enforcement mapping.

use serde::{Deserialize, Serialize};

use crate::domain::{ProtectiveAction, TrackingMethods};

/// How quickly observation turns into enforcement, and what enforcement
/// each tracking technique earns.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EscalationPolicy {
    /// Distinct tracking loads before a domain is reported as a potential
    /// tracker.
    pub loads_before_potential: u32,
    /// Distinct tracking loads before the protective action is enforced.
    pub loads_before_enforce: u32,
    pub cookie_action: ProtectiveAction,
    pub local_storage_action: ProtectiveAction,
    pub fingerprint_action: ProtectiveAction,
}

impl Default for EscalationPolicy {
    fn default() -> Self {
        Self {
            loads_before_potential: 2,
            loads_before_enforce: 3,
            cookie_action: ProtectiveAction::BlockUrl,
            local_storage_action: ProtectiveAction::BlockUrl,
            fingerprint_action: ProtectiveAction::BlockUrl,
        }
    }
}

impl EscalationPolicy {
    /// Strongest action mapped to any of the observed methods.
    pub fn action_for(&self, methods: TrackingMethods) -> ProtectiveAction {
        let mut action = ProtectiveAction::Unblock;
        if methods.contains(TrackingMethods::HTTP_COOKIES) {
            action = action.max(self.cookie_action);
        }
        if methods.contains(TrackingMethods::HTML5_LOCAL_STORAGE) {
            action = action.max(self.local_storage_action);
        }
        if methods.contains(TrackingMethods::CANVAS_FINGERPRINT) {
            action = action.max(self.fingerprint_action);
        }
        action
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_thresholds() {
        let policy = EscalationPolicy::default();
        assert_eq!(policy.loads_before_potential, 2);
        assert_eq!(policy.loads_before_enforce, 3);
    }

    #[test]
    fn test_strongest_action_wins() {
        let policy = EscalationPolicy {
            cookie_action: ProtectiveAction::BlockCookies,
            fingerprint_action: ProtectiveAction::BlockUrl,
            ..EscalationPolicy::default()
        };
        assert_eq!(
            policy.action_for(TrackingMethods::HTTP_COOKIES),
            ProtectiveAction::BlockCookies
        );
        assert_eq!(
            policy.action_for(
                TrackingMethods::HTTP_COOKIES | TrackingMethods::CANVAS_FINGERPRINT
            ),
            ProtectiveAction::BlockUrl
        );
        assert_eq!(
            policy.action_for(TrackingMethods::NONE),
            ProtectiveAction::Unblock
        );
    }
}
