//! WebRefine Core
//!
//! Central wiring for the page-resource filter and the tracker engine.
//! Embedders construct a [`Shield`] and drive it with navigation events.

mod config;
mod error;
mod shield;

pub use config::Config;
pub use error::ShieldError;
pub use shield::{FeatureName, Shield, DEFENDER_FEATURE, REFINER_FEATURE};

// Re-export core components
pub use webrefine_defender::{
    CanvasActivity, Defender, EscalationPolicy, ProtectionStatus, ProtectiveAction, TrackerDomain,
    TrackerDomainStats, TrackingMethods,
};
pub use webrefine_permissions::{Permission, PermissionOverlay};
pub use webrefine_refiner::{
    FrameContext, InlineScriptVerdict, MatchedUrlInfo, PageInfo, Refiner, Verdict,
};
pub use webrefine_rules::{
    Action, Categories, RequestInfo, ResourceType, RuleError, RuleSetDescriptor, TabId,
};

pub type Result<T> = std::result::Result<T, ShieldError>;

/// Initialize logging
pub fn init_logging() {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    fmt().with_env_filter(filter).with_target(true).init();
}
