//! Permission overlay
//!
//! Resolution order per request: origin-specific incognito entry (when the
//! session is incognito) > origin-specific general entry > global default.
//! General and incognito entries for the same origin are independent;
//! resetting incognito permissions leaves general entries intact.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::debug;

use webrefine_rules::normalize_origin;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Permission {
    /// Fall through to the next resolution layer.
    UseDefault,
    Enable,
    Disable,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PermissionOverlay {
    default_enabled: bool,
    /// Origin -> explicit permission, all sessions.
    general: HashMap<String, Permission>,
    /// Origin -> explicit permission, incognito sessions only.
    incognito: HashMap<String, Permission>,
}

impl PermissionOverlay {
    pub fn new(default_enabled: bool) -> Self {
        Self {
            default_enabled,
            general: HashMap::new(),
            incognito: HashMap::new(),
        }
    }

    /// Enables or disables the engine by default on all origins.
    pub fn set_default(&mut self, enabled: bool) {
        debug!(enabled, "Set default permission");
        self.default_enabled = enabled;
    }

    pub fn default_enabled(&self) -> bool {
        self.default_enabled
    }

    /// Sets an explicit permission for each origin. `UseDefault` removes
    /// the entry from the targeted scope.
    pub fn set_for_origins<I, S>(&mut self, origins: I, permission: Permission, incognito_only: bool)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for origin in origins {
            let key = normalize_origin(origin.as_ref());
            let scope = if incognito_only {
                &mut self.incognito
            } else {
                &mut self.general
            };
            match permission {
                Permission::UseDefault => {
                    scope.remove(&key);
                }
                p => {
                    scope.insert(key, p);
                }
            }
        }
    }

    /// Removes every incognito-scoped entry.
    pub fn reset_incognito(&mut self) {
        debug!(entries = self.incognito.len(), "Reset incognito permissions");
        self.incognito.clear();
    }

    /// Resolves whether the engine is enabled for an origin.
    pub fn resolve(&self, origin: &str, incognito: bool) -> bool {
        let key = normalize_origin(origin);
        if incognito {
            if let Some(p) = self.incognito.get(&key) {
                return matches!(p, Permission::Enable);
            }
        }
        if let Some(p) = self.general.get(&key) {
            return matches!(p, Permission::Enable);
        }
        self.default_enabled
    }
}

impl Default for PermissionOverlay {
    fn default() -> Self {
        Self::new(true)
    }
}
