//! WebRefine permission overlays
//!
//! Origin-scoped and incognito-scoped enable/disable overrides layered on
//! top of a default permission, shared by the filtering engine and the
//! tracker engine (each carries its own overlay instance).

mod overlay;

pub use overlay::{Permission, PermissionOverlay};
