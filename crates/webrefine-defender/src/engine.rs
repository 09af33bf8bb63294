//! Tracking observation engine.
//!
//! Domain histories accumulate across page loads and tabs; per-tab state
//! tracks the current page and which domains were observed on it. A domain
//! becomes a potential tracker on its second tracking load and gets its
//! protective action enforced from the third.

use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, info};

use webrefine_permissions::{Permission, PermissionOverlay};
use webrefine_rules::{base_domain, normalize_origin, TabId};

use crate::domain::{
    CanvasActivity, ProtectionStatus, ProtectiveAction, TrackerDomain, TrackerDomainStats,
    TrackingMethods,
};
use crate::policy::EscalationPolicy;

#[derive(Debug, Default)]
struct DomainHistory {
    methods: TrackingMethods,
    /// Distinct page loads on which the domain tracked.
    tracking_loads: u32,
    /// Monotonic load id of the last counted load, for dedup within a load.
    last_load: u64,
    user_action: Option<ProtectiveAction>,
}

struct TabState {
    load_id: u64,
    page_base: String,
    enabled: bool,
    /// Tracker base domains observed on this page, first-observed order.
    observed: Vec<String>,
}

pub struct Defender {
    policy: EscalationPolicy,
    permissions: RwLock<PermissionOverlay>,
    history: RwLock<HashMap<String, DomainHistory>>,
    tabs: RwLock<HashMap<TabId, TabState>>,
    next_load: AtomicU64,
}

impl Defender {
    pub fn new(default_enabled: bool, policy: EscalationPolicy) -> Self {
        Self {
            policy,
            permissions: RwLock::new(PermissionOverlay::new(default_enabled)),
            history: RwLock::new(HashMap::new()),
            tabs: RwLock::new(HashMap::new()),
            next_load: AtomicU64::new(1),
        }
    }

    // --- permissions ----------------------------------------------------

    pub fn set_default_permission(&self, enabled: bool) {
        self.permissions.write().set_default(enabled);
    }

    pub fn set_permission_for_origins<I, S>(
        &self,
        origins: I,
        permission: Permission,
        incognito_only: bool,
    ) where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.permissions
            .write()
            .set_for_origins(origins, permission, incognito_only);
    }

    pub fn reset_all_incognito_permissions(&self) {
        self.permissions.write().reset_incognito();
    }

    // --- navigation -----------------------------------------------------

    pub fn navigation_committed(&self, tab: TabId, page_url: &str, incognito: bool) {
        let origin = normalize_origin(page_url);
        let enabled = self.permissions.read().resolve(&origin, incognito);
        let load_id = self.next_load.fetch_add(1, Ordering::Relaxed);
        debug!(%tab, page = page_url, enabled, load_id, "Tracking session committed");
        self.tabs.write().insert(
            tab,
            TabState {
                load_id,
                page_base: request_domain(page_url),
                enabled,
                observed: Vec::new(),
            },
        );
    }

    pub fn tab_closed(&self, tab: TabId) {
        self.tabs.write().remove(&tab);
    }

    // --- observations ---------------------------------------------------

    pub fn observe_cookie_use(&self, tab: TabId, frame_url: &str) {
        self.observe(tab, frame_url, TrackingMethods::HTTP_COOKIES);
    }

    pub fn observe_local_storage(&self, tab: TabId, frame_url: &str) {
        self.observe(tab, frame_url, TrackingMethods::HTML5_LOCAL_STORAGE);
    }

    pub fn observe_canvas_readback(&self, tab: TabId, frame_url: &str, activity: CanvasActivity) {
        if activity.is_fingerprint_read() {
            self.observe(tab, frame_url, TrackingMethods::CANVAS_FINGERPRINT);
        }
    }

    fn observe(&self, tab: TabId, frame_url: &str, method: TrackingMethods) {
        let domain = request_domain(frame_url);
        if domain.is_empty() {
            return;
        }
        let mut tabs = self.tabs.write();
        let state = match tabs.get_mut(&tab) {
            Some(state) if state.enabled => state,
            _ => return,
        };
        // First-party storage use is not tracking.
        if domain == state.page_base {
            return;
        }
        if !state.observed.iter().any(|d| d == &domain) {
            state.observed.push(domain.clone());
        }

        let mut history = self.history.write();
        let entry = history.entry(domain.clone()).or_default();
        entry.methods.insert(method);
        if entry.last_load != state.load_id {
            entry.last_load = state.load_id;
            entry.tracking_loads += 1;
            if entry.tracking_loads >= self.policy.loads_before_enforce {
                info!(
                    domain = %domain,
                    loads = entry.tracking_loads,
                    methods = %entry.methods,
                    "Tracker enforcement active"
                );
            }
        }
    }

    // --- enforcement ----------------------------------------------------

    /// Action to apply to a request going to `url` from the tab's page.
    /// Unknown tabs and first-party requests are left alone.
    pub fn enforcement_for(&self, tab: TabId, url: &str) -> ProtectiveAction {
        let domain = request_domain(url);
        let tabs = self.tabs.read();
        let state = match tabs.get(&tab) {
            Some(state) if state.enabled => state,
            _ => return ProtectiveAction::Unblock,
        };
        if domain == state.page_base {
            return ProtectiveAction::Unblock;
        }
        let history = self.history.read();
        match history.get(&domain) {
            Some(entry) => self.action_for_entry(entry),
            None => ProtectiveAction::Unblock,
        }
    }

    fn action_for_entry(&self, entry: &DomainHistory) -> ProtectiveAction {
        if let Some(action) = entry.user_action {
            return action;
        }
        if entry.tracking_loads >= self.policy.loads_before_enforce {
            self.policy.action_for(entry.methods)
        } else {
            ProtectiveAction::Unblock
        }
    }

    // --- reporting ------------------------------------------------------

    /// Report for the tab's current page, domains in first-observed order.
    pub fn protection_status(&self, tab: TabId) -> ProtectionStatus {
        let tabs = self.tabs.read();
        let state = match tabs.get(&tab) {
            Some(state) => state,
            None => return ProtectionStatus::default(),
        };
        let history = self.history.read();
        let tracker_domains = state
            .observed
            .iter()
            .filter_map(|name| {
                let entry = history.get(name)?;
                Some(TrackerDomain {
                    name: name.clone(),
                    protective_action: self.action_for_entry(entry),
                    tracking_methods: entry.methods,
                    user_defined_action: entry.user_action.unwrap_or(ProtectiveAction::Unblock),
                    uses_user_defined_action: entry.user_action.is_some(),
                    potential_tracker: entry.tracking_loads >= self.policy.loads_before_potential,
                })
            })
            .collect();
        ProtectionStatus {
            tracker_domains,
            tracking_protection_enabled: state.enabled,
        }
    }

    /// Count summary of the tab's current page.
    pub fn tracker_domain_stats(&self, tab: TabId) -> TrackerDomainStats {
        TrackerDomainStats::from_status(&self.protection_status(tab))
    }

    /// Distinct page loads on which a domain has been observed tracking.
    pub fn tracking_load_count(&self, domain: &str) -> u32 {
        self.history
            .read()
            .get(base_domain(domain))
            .map(|entry| entry.tracking_loads)
            .unwrap_or(0)
    }

    // --- user overrides -------------------------------------------------

    /// Pins per-domain actions chosen by the user, overriding escalation.
    pub fn override_protective_actions<I, S>(&self, overrides: I)
    where
        I: IntoIterator<Item = (S, ProtectiveAction)>,
        S: AsRef<str>,
    {
        let mut history = self.history.write();
        for (domain, action) in overrides {
            let domain = base_domain(domain.as_ref()).to_string();
            debug!(domain = %domain, action = %action, "User override set");
            history.entry(domain).or_default().user_action = Some(action);
        }
    }

    /// Drops the user overrides for the given domains, returning them to
    /// escalation control.
    pub fn reset_protective_actions<I, S>(&self, domains: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut history = self.history.write();
        for domain in domains {
            if let Some(entry) = history.get_mut(base_domain(domain.as_ref())) {
                entry.user_action = None;
            }
        }
    }
}

/// Registrable domain of a URL, or empty when the URL has no host.
fn request_domain(url: &str) -> String {
    webrefine_rules::host_of(url)
        .map(|h| base_domain(&h).to_string())
        .unwrap_or_default()
}
