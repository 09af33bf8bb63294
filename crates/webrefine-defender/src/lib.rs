//! Tracker detection and progressive enforcement.
//!
//! Observes third-party tracking behavior (cookies, local storage, canvas
//! fingerprinting) across page loads and escalates from observation to a
//! protective action once a domain has tracked on enough distinct loads.

mod domain;
mod engine;
mod policy;

pub use domain::{
    CanvasActivity, ProtectionStatus, ProtectiveAction, TrackerDomain, TrackerDomainStats,
    TrackingMethods,
};
pub use engine::Defender;
pub use policy::EscalationPolicy;
