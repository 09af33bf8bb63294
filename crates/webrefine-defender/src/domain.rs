//! Tracker domain model: methods observed, protective actions, reports.

use serde::{Deserialize, Serialize};

/// Enforcement applied to a tracker domain's requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProtectiveAction {
    /// Requests pass through untouched.
    Unblock,
    /// Requests go out with cookie headers stripped.
    BlockCookies,
    /// Requests to the domain are dropped entirely.
    BlockUrl,
}

impl ProtectiveAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProtectiveAction::Unblock => "unblock",
            ProtectiveAction::BlockCookies => "block_cookies",
            ProtectiveAction::BlockUrl => "block_url",
        }
    }
}

impl std::fmt::Display for ProtectiveAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for ProtectiveAction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "unblock" => Ok(ProtectiveAction::Unblock),
            "block_cookies" => Ok(ProtectiveAction::BlockCookies),
            "block_url" => Ok(ProtectiveAction::BlockUrl),
            other => Err(format!("unknown protective action: {other}")),
        }
    }
}

/// Bitmask of tracking techniques observed for a domain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TrackingMethods(pub u32);

impl TrackingMethods {
    pub const NONE: TrackingMethods = TrackingMethods(0);
    pub const HTTP_COOKIES: TrackingMethods = TrackingMethods(1);
    pub const HTML5_LOCAL_STORAGE: TrackingMethods = TrackingMethods(1 << 1);
    pub const CANVAS_FINGERPRINT: TrackingMethods = TrackingMethods(1 << 2);

    pub fn contains(&self, other: TrackingMethods) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn insert(&mut self, other: TrackingMethods) {
        self.0 |= other.0;
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    pub fn names(&self) -> Vec<&'static str> {
        let mut out = Vec::new();
        if self.contains(Self::HTTP_COOKIES) {
            out.push("cookies");
        }
        if self.contains(Self::HTML5_LOCAL_STORAGE) {
            out.push("local_storage");
        }
        if self.contains(Self::CANVAS_FINGERPRINT) {
            out.push("canvas_fingerprint");
        }
        out
    }
}

impl std::ops::BitOr for TrackingMethods {
    type Output = TrackingMethods;

    fn bitor(self, rhs: TrackingMethods) -> TrackingMethods {
        TrackingMethods(self.0 | rhs.0)
    }
}

impl std::fmt::Display for TrackingMethods {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.names().join("|"))
    }
}

/// What a canvas did before its pixels were read back. Read-backs from a
/// canvas that was drawn to but never attached to the DOM are the
/// fingerprinting signal.
#[derive(Debug, Clone, Copy, Default)]
pub struct CanvasActivity {
    pub wrote_content: bool,
    pub inserted_into_dom: bool,
}

impl CanvasActivity {
    pub fn is_fingerprint_read(&self) -> bool {
        self.wrote_content && !self.inserted_into_dom
    }
}

/// One tracker domain as reported for the current page.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackerDomain {
    pub name: String,
    /// Action currently enforced for the domain.
    pub protective_action: ProtectiveAction,
    pub tracking_methods: TrackingMethods,
    /// Action the user chose, meaningful when `uses_user_defined_action`.
    pub user_defined_action: ProtectiveAction,
    pub uses_user_defined_action: bool,
    /// Seen tracking but not yet on enough loads to enforce.
    pub potential_tracker: bool,
}

/// Per-page tracking report, domains in first-observed order.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProtectionStatus {
    pub tracker_domains: Vec<TrackerDomain>,
    pub tracking_protection_enabled: bool,
}

/// Count summary of a page's tracker domains.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct TrackerDomainStats {
    /// Flagged potential but not yet enforced.
    pub potential: u32,
    /// Cookie-stripped domains.
    pub yellow: u32,
    /// Fully blocked domains.
    pub red: u32,
    pub total: u32,
    pub tracking_protection_enabled: bool,
}

impl TrackerDomainStats {
    pub fn from_status(status: &ProtectionStatus) -> Self {
        let mut stats = TrackerDomainStats {
            tracking_protection_enabled: status.tracking_protection_enabled,
            ..TrackerDomainStats::default()
        };
        for tracker in &status.tracker_domains {
            stats.total += 1;
            match tracker.protective_action {
                ProtectiveAction::Unblock if tracker.potential_tracker => stats.potential += 1,
                ProtectiveAction::Unblock => {}
                ProtectiveAction::BlockCookies => stats.yellow += 1,
                ProtectiveAction::BlockUrl => stats.red += 1,
            }
        }
        stats
    }
}
