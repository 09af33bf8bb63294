//! Request classifier
//!
//! Holds the rule snapshot captured at navigation commit plus the permission
//! resolved for the page's origin. Classification never errors: anything
//! that cannot be evaluated degrades to allow (fail-open), so a broken rule
//! or URL never breaks a page load.

use std::sync::Arc;
use tracing::debug;

use webrefine_rules::{host_of, ResourceType, RuleIndex};

use crate::session::MatchedUrlInfo;

/// Enforcement decision handed to the network layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Allow,
    Block,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InlineScriptVerdict {
    Allow,
    Block,
}

/// A frame's identity when asking for element-hide selectors: its own
/// document URL plus the origin hosts from the frame itself up to the
/// top-level document.
#[derive(Debug, Clone)]
pub struct FrameContext<'a> {
    pub document_url: &'a str,
    /// Hosts of this frame and its ancestors, innermost first.
    pub origin_chain: &'a [String],
}

#[derive(Clone)]
pub struct RequestClassifier {
    snapshot: Arc<RuleIndex>,
    /// Permission resolved for the page origin at commit time.
    enabled: bool,
    /// Host of the committed top-level document.
    page_host: String,
}

impl RequestClassifier {
    pub fn new(snapshot: Arc<RuleIndex>, enabled: bool, page_url: &str) -> Self {
        let page_host = host_of(page_url).unwrap_or_default();
        Self {
            snapshot,
            enabled,
            page_host,
        }
    }

    pub fn enabled(&self) -> bool {
        self.enabled
    }

    /// Classifies one request. None means no rule applies and the request
    /// proceeds; a disabled permission short-circuits to None for every
    /// request regardless of rule matches.
    pub fn classify(&self, url: &str, resource_type: ResourceType) -> Option<MatchedUrlInfo> {
        if !self.enabled {
            return None;
        }
        let matched = self.snapshot.match_request(url, resource_type)?;
        Some(MatchedUrlInfo::new(url, resource_type, matched))
    }

    /// Selectors to hide in the given frame's document. Empty when an
    /// `$elemhide` exception covers the frame or any ancestor frame, or
    /// when filtering is disabled for the page.
    pub fn hide_selectors(
        &self,
        frame: &FrameContext<'_>,
        frame_requests: &[(String, ResourceType)],
    ) -> Vec<String> {
        if !self.enabled {
            return Vec::new();
        }
        for host in frame.origin_chain {
            if self.snapshot.elemhide_suppressed(host) {
                debug!(host = %host, "Element hiding suppressed by exception");
                return Vec::new();
            }
        }
        self.snapshot.hide_selectors(frame.document_url, frame_requests)
    }

    /// Classifies an inline `<script>` block. `$inline-script` filters
    /// match the top-level page origin and apply to main-frame documents
    /// only; `script:contains` filters match the frame's own domain and
    /// block only the script blocks whose source matches.
    pub fn classify_inline_script(
        &self,
        frame_host: &str,
        is_main_frame: bool,
        source: &str,
    ) -> InlineScriptVerdict {
        if !self.enabled {
            return InlineScriptVerdict::Allow;
        }
        if is_main_frame
            && !self
                .snapshot
                .inline_script_rules_for(&self.page_host)
                .is_empty()
        {
            return InlineScriptVerdict::Block;
        }
        let blocked = self
            .snapshot
            .script_content_patterns_for(frame_host)
            .iter()
            .any(|pattern| pattern.matches(source));
        if blocked {
            InlineScriptVerdict::Block
        } else {
            InlineScriptVerdict::Allow
        }
    }
}
