//! Refiner facade
//!
//! The engine object the embedder talks to: rule-set CRUD (delegated to the
//! rule store), permission overlays, and per-tab page sessions driven by
//! navigation-commit events. Per-tab state is only touched from the
//! navigation sequence; cross-tab state sits behind locks.

use parking_lot::RwLock;
use std::collections::HashMap;
use tracing::{debug, info};

use webrefine_permissions::{Permission, PermissionOverlay};
use webrefine_rules::{
    normalize_origin, RequestInfo, Result, ResourceType, RuleSetDescriptor, RuleStore, TabId,
};

use crate::classifier::{FrameContext, InlineScriptVerdict, RequestClassifier, Verdict};
use crate::session::{PageInfo, PageSession};

pub struct Refiner {
    store: RuleStore,
    permissions: RwLock<PermissionOverlay>,
    sessions: RwLock<HashMap<TabId, PageSession>>,
}

impl Refiner {
    pub fn new(default_enabled: bool) -> Self {
        Self {
            store: RuleStore::new(),
            permissions: RwLock::new(PermissionOverlay::new(default_enabled)),
            sessions: RwLock::new(HashMap::new()),
        }
    }

    // --- rule set management -------------------------------------------

    pub fn add_rule_set(&self, descriptor: &RuleSetDescriptor) -> Result<()> {
        self.store.add_rule_set(descriptor)
    }

    pub fn update_rule_set(&self, descriptor: &RuleSetDescriptor) -> Result<()> {
        self.store.update_rule_set(descriptor)
    }

    pub fn remove_rule_set(&self, name: &str) -> Result<()> {
        self.store.remove_rule_set(name)
    }

    pub fn active_rule_sets(&self) -> Vec<RuleSetDescriptor> {
        self.store.active_rule_sets()
    }

    /// Blocks until every staged rule-set change is visible to sessions
    /// committed afterwards. Needed for deterministic tests.
    pub fn flush_pending_changes(&self) {
        self.store.flush_pending_changes();
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

    // --- navigation and classification ---------------------------------

    /// Resets the tab's accumulator for a freshly committed page. The new
    /// session captures the current rule snapshot and the permission
    /// resolved for the page origin; neither changes until the next commit.
    pub fn navigation_committed(&self, tab: TabId, page_url: &str, incognito: bool) {
        let origin = normalize_origin(page_url);
        let enabled = self.permissions.read().resolve(&origin, incognito);
        let classifier = RequestClassifier::new(self.store.snapshot(), enabled, page_url);
        debug!(%tab, page = page_url, enabled, "Page session committed");
        self.sessions
            .write()
            .insert(tab, PageSession::new(classifier, page_url, incognito));
    }

    pub fn tab_closed(&self, tab: TabId) {
        if self.sessions.write().remove(&tab).is_some() {
            debug!(%tab, "Dropped page session");
        }
    }

    /// Classifies and records one request, returning the enforcement
    /// verdict. Requests for unknown tabs are allowed (fail-open).
    pub fn record_request(&self, tab: TabId, request: &RequestInfo) -> Verdict {
        let mut sessions = self.sessions.write();
        match sessions.get_mut(&tab) {
            Some(session) => {
                let verdict = session.record(&request.url, request.resource_type);
                if verdict == Verdict::Block {
                    info!(%tab, url = %request.url, kind = %request.resource_type, "Blocked request");
                }
                verdict
            }
            None => {
                debug!(%tab, url = %request.url, "Request for unknown tab, allowing");
                Verdict::Allow
            }
        }
    }

    /// Element-hide selectors for a frame of the tab's current page.
    pub fn hide_selectors_for_frame(
        &self,
        tab: TabId,
        frame: &FrameContext<'_>,
        frame_requests: &[(String, ResourceType)],
    ) -> Vec<String> {
        self.sessions
            .read()
            .get(&tab)
            .map(|s| s.classifier().hide_selectors(frame, frame_requests))
            .unwrap_or_default()
    }

    /// Verdict for an inline `<script>` block in the tab's current page.
    pub fn classify_inline_script(
        &self,
        tab: TabId,
        frame_host: &str,
        is_main_frame: bool,
        source: &str,
    ) -> InlineScriptVerdict {
        self.sessions
            .read()
            .get(&tab)
            .map(|s| s.classifier().classify_inline_script(frame_host, is_main_frame, source))
            .unwrap_or(InlineScriptVerdict::Allow)
    }

    // --- statistics -----------------------------------------------------

    pub fn total_url_count(&self, tab: TabId) -> u32 {
        self.sessions
            .read()
            .get(&tab)
            .map(|s| s.total_urls())
            .unwrap_or(0)
    }

    pub fn blocked_url_count(&self, tab: TabId) -> u32 {
        self.sessions
            .read()
            .get(&tab)
            .map(|s| s.blocked_urls())
            .unwrap_or(0)
    }

    /// Full page statistics for the tab's current session, or None when no
    /// page has committed. Potentially expensive: copies the matched list.
    pub fn page_info(&self, tab: TabId) -> Option<PageInfo> {
        self.sessions.read().get(&tab).map(|s| s.page_info())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use webrefine_rules::Categories;

    const TAB: TabId = TabId(1);

    fn ad_rules(dir: &tempfile::TempDir) -> RuleSetDescriptor {
        let path = dir.path().join("ads.rules");
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(b"ad_frame\nad_img\nad_style\nad_script\n")
            .unwrap();
        RuleSetDescriptor::new("TestFilters", path, Categories::ADS, 1)
    }

    fn refiner_with_rules(dir: &tempfile::TempDir) -> Refiner {
        let refiner = Refiner::new(true);
        refiner.add_rule_set(&ad_rules(dir)).unwrap();
        refiner.flush_pending_changes();
        refiner
    }

    fn request(url: &str, resource_type: ResourceType) -> RequestInfo {
        RequestInfo {
            url: url.to_string(),
            resource_type,
            first_party: "http://localhost/".to_string(),
            is_main_frame: resource_type == ResourceType::MainFrame,
        }
    }

    #[test]
    fn test_blocked_request_counted() {
        let dir = tempfile::tempdir().unwrap();
        let refiner = refiner_with_rules(&dir);

        refiner.navigation_committed(TAB, "http://localhost/test.html", false);
        let v = refiner.record_request(TAB, &request("http://localhost/ad_img01.jpg", ResourceType::Image));
        assert_eq!(v, Verdict::Block);
        assert_eq!(refiner.total_url_count(TAB), 1);
        assert_eq!(refiner.blocked_url_count(TAB), 1);
    }

    #[test]
    fn test_navigation_resets_accumulator() {
        let dir = tempfile::tempdir().unwrap();
        let refiner = refiner_with_rules(&dir);

        refiner.navigation_committed(TAB, "http://localhost/a.html", false);
        refiner.record_request(TAB, &request("http://localhost/ad_img01.jpg", ResourceType::Image));
        assert_eq!(refiner.blocked_url_count(TAB), 1);

        refiner.navigation_committed(TAB, "http://localhost/b.html", false);
        assert_eq!(refiner.total_url_count(TAB), 0);
        assert_eq!(refiner.blocked_url_count(TAB), 0);
    }

    #[test]
    fn test_unknown_tab_allows() {
        let dir = tempfile::tempdir().unwrap();
        let refiner = refiner_with_rules(&dir);
        let v = refiner.record_request(TabId(99), &request("http://localhost/ad_img01.jpg", ResourceType::Image));
        assert_eq!(v, Verdict::Allow);
        assert!(refiner.page_info(TabId(99)).is_none());
    }

    #[test]
    fn test_disabled_default_blocks_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let refiner = refiner_with_rules(&dir);
        refiner.set_default_permission(false);

        refiner.navigation_committed(TAB, "http://localhost/test.html", false);
        let v = refiner.record_request(TAB, &request("http://localhost/ad_img01.jpg", ResourceType::Image));
        assert_eq!(v, Verdict::Allow);
        assert_eq!(refiner.blocked_url_count(TAB), 0);
        assert_eq!(refiner.total_url_count(TAB), 1);
    }

    #[test]
    fn test_origin_disable_applies_to_that_origin_only() {
        let dir = tempfile::tempdir().unwrap();
        let refiner = refiner_with_rules(&dir);
        refiner.set_permission_for_origins(
            ["http://localhost/"],
            Permission::Disable,
            false,
        );

        refiner.navigation_committed(TAB, "http://localhost/test.html", false);
        refiner.record_request(TAB, &request("http://localhost/ad_img01.jpg", ResourceType::Image));
        assert_eq!(refiner.blocked_url_count(TAB), 0);

        let other = TabId(2);
        refiner.navigation_committed(other, "http://other.test/test.html", false);
        refiner.record_request(other, &request("http://other.test/ad_img01.jpg", ResourceType::Image));
        assert_eq!(refiner.blocked_url_count(other), 1);
    }

    #[test]
    fn test_committed_session_survives_rule_removal() {
        let dir = tempfile::tempdir().unwrap();
        let refiner = refiner_with_rules(&dir);

        refiner.navigation_committed(TAB, "http://localhost/test.html", false);
        refiner.remove_rule_set("TestFilters").unwrap();
        refiner.flush_pending_changes();

        // The session still classifies with the snapshot it captured
        let v = refiner.record_request(TAB, &request("http://localhost/ad_img01.jpg", ResourceType::Image));
        assert_eq!(v, Verdict::Block);
    }
}
