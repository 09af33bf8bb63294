//! Combined engine facade
//!
//! One object wiring the resource filter and the tracker engine together,
//! fanning navigation lifecycle events out to both.

use serde::Serialize;
use tracing::info;

use webrefine_defender::Defender;
use webrefine_refiner::Refiner;
use webrefine_rules::TabId;

use crate::config::Config;
use crate::Result;

/// UI-facing feature identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FeatureName {
    /// Product name shown in settings.
    pub product: &'static str,
    /// Short key used in preference storage.
    pub local: &'static str,
}

pub const REFINER_FEATURE: FeatureName = FeatureName {
    product: "WebRefine Refiner",
    local: "refiner",
};

pub const DEFENDER_FEATURE: FeatureName = FeatureName {
    product: "WebRefine Defender",
    local: "defender",
};

pub struct Shield {
    config: Config,
    refiner: Refiner,
    defender: Defender,
}

impl Shield {
    /// Builds both engines and installs the configured rule sets. Rule
    /// file problems fail construction rather than silently degrading.
    pub fn new(config: Config) -> Result<Self> {
        let refiner = Refiner::new(config.refiner_enabled);
        for descriptor in &config.rule_sets {
            refiner.add_rule_set(descriptor)?;
        }
        refiner.flush_pending_changes();

        let defender = Defender::new(config.defender_enabled, config.escalation.clone());

        info!(
            rule_sets = config.rule_sets.len(),
            refiner = config.refiner_enabled,
            defender = config.defender_enabled,
            "Shield initialized"
        );

        Ok(Self {
            config,
            refiner,
            defender,
        })
    }

    /// Resets both engines' per-tab state for a freshly committed page.
    pub fn navigation_committed(&self, tab: TabId, page_url: &str, incognito: bool) {
        self.refiner.navigation_committed(tab, page_url, incognito);
        self.defender.navigation_committed(tab, page_url, incognito);
    }

    pub fn tab_closed(&self, tab: TabId) {
        self.refiner.tab_closed(tab);
        self.defender.tab_closed(tab);
    }

    /// Clears incognito permission overrides in both engines, for the end
    /// of a private browsing session.
    pub fn incognito_session_ended(&self) {
        self.refiner.reset_all_incognito_permissions();
        self.defender.reset_all_incognito_permissions();
    }

    pub fn refiner(&self) -> &Refiner {
        &self.refiner
    }

    pub fn defender(&self) -> &Defender {
        &self.defender
    }

    pub fn config(&self) -> &Config {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::path::PathBuf;
    use webrefine_defender::{CanvasActivity, ProtectiveAction};
    use webrefine_permissions::Permission;
    use webrefine_refiner::{FrameContext, InlineScriptVerdict, Verdict};
    use webrefine_rules::{Action, Categories, RequestInfo, ResourceType, RuleSetDescriptor};

    const TAB: TabId = TabId(1);

    fn write_rules(dir: &tempfile::TempDir, name: &str, contents: &str) -> PathBuf {
        let path = dir.path().join(name);
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        path
    }

    fn shield_with(dir: &tempfile::TempDir, contents: &str) -> Shield {
        let path = write_rules(dir, "test.rules", contents);
        let config = Config::new(dir.path().to_path_buf()).with_rule_set(
            RuleSetDescriptor::new("TestFilters", path, Categories::ADS, 1),
        );
        Shield::new(config).unwrap()
    }

    fn request(url: &str, resource_type: ResourceType) -> RequestInfo {
        RequestInfo {
            url: url.to_string(),
            resource_type,
            first_party: "http://localhost/".to_string(),
            is_main_frame: false,
        }
    }

    #[test]
    fn test_shield_installs_configured_rule_sets() {
        let dir = tempfile::tempdir().unwrap();
        let shield = shield_with(&dir, "ad_banner\n");
        let sets = shield.refiner().active_rule_sets();
        assert_eq!(sets.len(), 1);
        assert_eq!(sets[0].name, "TestFilters");
    }

    #[test]
    fn test_shield_fails_on_missing_rule_file() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::new(dir.path().to_path_buf()).with_rule_set(
            RuleSetDescriptor::new(
                "Missing",
                dir.path().join("nope.rules"),
                Categories::ADS,
                1,
            ),
        );
        assert!(Shield::new(config).is_err());
    }

    #[test]
    fn test_feature_names() {
        assert_eq!(REFINER_FEATURE.local, "refiner");
        assert_eq!(DEFENDER_FEATURE.local, "defender");
    }

    // Full ad page: eight matching subresources plus one clean image.
    fn ad_page_requests() -> Vec<RequestInfo> {
        vec![
            request("http://localhost/ad_frame01.html", ResourceType::SubFrame),
            request("http://localhost/ad_frame02.html", ResourceType::SubFrame),
            request("http://localhost/ad_img01.jpg", ResourceType::Image),
            request("http://localhost/ad_img02.jpg", ResourceType::Image),
            request("http://localhost/ad_style01.css", ResourceType::Stylesheet),
            request("http://localhost/ad_style02.css", ResourceType::Stylesheet),
            request("http://localhost/ad_script01.js", ResourceType::Script),
            request("http://localhost/ad_script02.js", ResourceType::Script),
            request("http://localhost/logo.png", ResourceType::Image),
        ]
    }

    #[test]
    fn test_ad_page_blocks_all_ad_subresources() {
        let dir = tempfile::tempdir().unwrap();
        let shield = shield_with(&dir, "ad_frame\nad_img\nad_style\nad_script\n");

        shield.navigation_committed(TAB, "http://localhost/ads_test.html", false);
        for req in ad_page_requests() {
            shield.refiner().record_request(TAB, &req);
        }

        let info = shield.refiner().page_info(TAB).unwrap();
        assert_eq!(info.total_urls, 9);
        assert_eq!(info.blocked_urls, 8);
        assert_eq!(info.whitelisted_urls, 0);
        assert_eq!(info.matched.len(), 8);
        for m in &info.matched {
            assert_eq!(m.action, Action::Blocked);
            assert_eq!(m.rule_set, "TestFilters");
            assert_eq!(m.categories, Categories::ADS);
        }
    }

    #[test]
    fn test_disabled_default_permission_blocks_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let shield = shield_with(&dir, "ad_frame\nad_img\nad_style\nad_script\n");
        shield.refiner().set_default_permission(false);

        shield.navigation_committed(TAB, "http://localhost/ads_test.html", false);
        for req in ad_page_requests() {
            assert_eq!(shield.refiner().record_request(TAB, &req), Verdict::Allow);
        }
        assert_eq!(shield.refiner().blocked_url_count(TAB), 0);
        assert_eq!(shield.refiner().total_url_count(TAB), 9);
    }

    #[test]
    fn test_origin_permission_toggle() {
        let dir = tempfile::tempdir().unwrap();
        let shield = shield_with(&dir, "ad_frame\nad_img\nad_style\nad_script\n");

        shield.refiner().set_permission_for_origins(
            ["http://localhost/"],
            Permission::Disable,
            false,
        );
        shield.navigation_committed(TAB, "http://localhost/ads_test.html", false);
        for req in ad_page_requests() {
            shield.refiner().record_request(TAB, &req);
        }
        assert_eq!(shield.refiner().blocked_url_count(TAB), 0);

        shield.refiner().set_permission_for_origins(
            ["http://localhost/"],
            Permission::UseDefault,
            false,
        );
        shield.navigation_committed(TAB, "http://localhost/ads_test.html", false);
        for req in ad_page_requests() {
            shield.refiner().record_request(TAB, &req);
        }
        assert_eq!(shield.refiner().blocked_url_count(TAB), 8);
    }

    #[test]
    fn test_whitelist_exception_counts_separately() {
        let dir = tempfile::tempdir().unwrap();
        let shield = shield_with(&dir, "ad_img\n@@good_ad_img\n");

        shield.navigation_committed(TAB, "http://localhost/page.html", false);
        let blocked = shield.refiner().record_request(
            TAB,
            &request("http://localhost/ad_img01.jpg", ResourceType::Image),
        );
        let allowed = shield.refiner().record_request(
            TAB,
            &request("http://localhost/good_ad_img.jpg", ResourceType::Image),
        );
        assert_eq!(blocked, Verdict::Block);
        assert_eq!(allowed, Verdict::Allow);

        let info = shield.refiner().page_info(TAB).unwrap();
        assert_eq!(info.blocked_urls, 1);
        assert_eq!(info.whitelisted_urls, 1);
        assert_eq!(info.matched.len(), 2);
    }

    #[test]
    fn test_element_hiding_with_elemhide_exception_chain() {
        let dir = tempfile::tempdir().unwrap();
        let shield = shield_with(&dir, "###e1\n###e4\n@@||tp02.wrtest^$elemhide\n");

        shield.navigation_committed(TAB, "http://tp01.wrtest/page.html", false);

        // The main frame gets the hides
        let main_chain = vec!["tp01.wrtest".to_string()];
        let frame = FrameContext {
            document_url: "http://tp01.wrtest/page.html",
            origin_chain: &main_chain,
        };
        let selectors = shield.refiner().hide_selectors_for_frame(TAB, &frame, &[]);
        assert_eq!(selectors, vec!["#e1".to_string(), "#e4".to_string()]);

        // The excepted frame itself is spared
        let excepted_chain = vec!["tp02.wrtest".to_string(), "tp01.wrtest".to_string()];
        let frame = FrameContext {
            document_url: "http://tp02.wrtest/frame.html",
            origin_chain: &excepted_chain,
        };
        assert!(shield
            .refiner()
            .hide_selectors_for_frame(TAB, &frame, &[])
            .is_empty());

        // So is a frame nested inside the excepted one
        let nested_chain = vec![
            "tp03.wrtest".to_string(),
            "tp02.wrtest".to_string(),
            "tp01.wrtest".to_string(),
        ];
        let frame = FrameContext {
            document_url: "http://tp03.wrtest/inner.html",
            origin_chain: &nested_chain,
        };
        assert!(shield
            .refiner()
            .hide_selectors_for_frame(TAB, &frame, &[])
            .is_empty());
    }

    #[test]
    fn test_json_rule_set_blocks_and_hides() {
        let data = r##"[
            {"trigger": {"url-filter": "ad_img"}, "action": {"type": "block"}},
            {"trigger": {"url-filter": "test_page"}, "action": {"type": "css-display-none", "selector": "#banner"}},
            {"trigger": {"url-filter": "myframe", "resource-type": "sub-frame"}, "action": {"type": "css-display-none", "selector": "#frame_ad"}}
        ]"##;
        let dir = tempfile::tempdir().unwrap();
        let shield = shield_with(&dir, data);

        shield.navigation_committed(TAB, "http://localhost/test_page.html", false);
        let v = shield.refiner().record_request(
            TAB,
            &request("http://localhost/ad_img01.jpg", ResourceType::Image),
        );
        assert_eq!(v, Verdict::Block);

        // Main document triggers the url-filter rule; the sub-frame rule
        // only fires for the frame that loaded the matching request.
        let chain = vec!["localhost".to_string()];
        let frame = FrameContext {
            document_url: "http://localhost/test_page.html",
            origin_chain: &chain,
        };
        let selectors = shield.refiner().hide_selectors_for_frame(TAB, &frame, &[]);
        assert_eq!(selectors, vec!["#banner".to_string()]);

        let frame_requests = vec![(
            "http://localhost/myframe1.html".to_string(),
            ResourceType::SubFrame,
        )];
        let selectors = shield
            .refiner()
            .hide_selectors_for_frame(TAB, &frame, &frame_requests);
        assert!(selectors.contains(&"#frame_ad".to_string()));
    }

    #[test]
    fn test_inline_script_rules() {
        let dir = tempfile::tempdir().unwrap();
        let shield = shield_with(
            &dir,
            "||csp.wrtest$inline-script\ncsp.wrtest##script:contains(FooBar)\n",
        );

        shield.navigation_committed(TAB, "http://csp.wrtest/page.html", false);

        // Any main-frame inline script is blocked on the matched origin
        assert_eq!(
            shield
                .refiner()
                .classify_inline_script(TAB, "csp.wrtest", true, "var x = 1;"),
            InlineScriptVerdict::Block
        );
        // Subframe scripts only fall to content matches
        assert_eq!(
            shield
                .refiner()
                .classify_inline_script(TAB, "csp.wrtest", false, "var FooBar = 1;"),
            InlineScriptVerdict::Block
        );
        assert_eq!(
            shield
                .refiner()
                .classify_inline_script(TAB, "csp.wrtest", false, "var x = 1;"),
            InlineScriptVerdict::Allow
        );
    }

    #[test]
    fn test_defender_escalation_through_shield() {
        let dir = tempfile::tempdir().unwrap();
        let shield = shield_with(&dir, "ad_img\n");
        let tracker = "http://tracker.test/collect";

        for load in 1..=3u64 {
            shield.navigation_committed(TAB, "http://site.test/index.html", false);
            shield.defender().observe_cookie_use(TAB, tracker);
            shield
                .defender()
                .observe_canvas_readback(TAB, tracker, CanvasActivity {
                    wrote_content: true,
                    inserted_into_dom: false,
                });
            let expected = if load >= 3 {
                ProtectiveAction::BlockUrl
            } else {
                ProtectiveAction::Unblock
            };
            assert_eq!(shield.defender().enforcement_for(TAB, tracker), expected);
        }

        let status = shield.defender().protection_status(TAB);
        assert_eq!(status.tracker_domains.len(), 1);
        assert!(status.tracker_domains[0].potential_tracker);
    }

    #[test]
    fn test_tab_close_drops_both_engines() {
        let dir = tempfile::tempdir().unwrap();
        let shield = shield_with(&dir, "ad_img\n");

        shield.navigation_committed(TAB, "http://site.test/index.html", false);
        shield.tab_closed(TAB);
        assert!(shield.refiner().page_info(TAB).is_none());
        assert!(shield
            .defender()
            .protection_status(TAB)
            .tracker_domains
            .is_empty());
    }
}
