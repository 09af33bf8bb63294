//! Page sessions
//!
//! One accumulator per tab, reset on navigation commit. Counters are O(1);
//! materializing the full `PageInfo` copies the matched list in discovery
//! order and is documented as potentially expensive.

use serde::{Deserialize, Serialize};

use webrefine_rules::{Action, Categories, ResourceType, RuleMatch};

use crate::classifier::{RequestClassifier, Verdict};

/// One classified and actioned request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchedUrlInfo {
    pub url: String,
    pub resource_type: ResourceType,
    /// Raw filter text that matched.
    pub matched_filter: String,
    /// Rule set the filter belongs to.
    pub rule_set: String,
    pub categories: Categories,
    pub action: Action,
}

impl MatchedUrlInfo {
    pub(crate) fn new(url: &str, resource_type: ResourceType, matched: RuleMatch) -> Self {
        Self {
            url: url.to_string(),
            resource_type,
            matched_filter: matched.filter,
            rule_set: matched.source.rule_set,
            categories: matched.source.categories,
            action: if matched.whitelisted {
                Action::Whitelisted
            } else {
                Action::Blocked
            },
        }
    }
}

/// Aggregate view of a page session. Every entry in `matched` was either
/// blocked or whitelisted: `matched.len() == blocked_urls + whitelisted_urls`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageInfo {
    pub matched: Vec<MatchedUrlInfo>,
    pub total_urls: u32,
    pub blocked_urls: u32,
    pub whitelisted_urls: u32,
}

/// Accumulates classified requests for one page commit.
pub struct PageSession {
    classifier: RequestClassifier,
    page_url: String,
    incognito: bool,
    total: u32,
    blocked: u32,
    whitelisted: u32,
    matched: Vec<MatchedUrlInfo>,
}

impl PageSession {
    pub fn new(classifier: RequestClassifier, page_url: &str, incognito: bool) -> Self {
        Self {
            classifier,
            page_url: page_url.to_string(),
            incognito,
            total: 0,
            blocked: 0,
            whitelisted: 0,
            matched: Vec::new(),
        }
    }

    pub fn classifier(&self) -> &RequestClassifier {
        &self.classifier
    }

    pub fn page_url(&self) -> &str {
        &self.page_url
    }

    pub fn incognito(&self) -> bool {
        self.incognito
    }

    /// Records one request and returns the enforcement verdict.
    pub fn record(&mut self, url: &str, resource_type: ResourceType) -> Verdict {
        self.total += 1;
        match self.classifier.classify(url, resource_type) {
            Some(info) => {
                let verdict = match info.action {
                    Action::Blocked => {
                        self.blocked += 1;
                        Verdict::Block
                    }
                    Action::Whitelisted => {
                        self.whitelisted += 1;
                        Verdict::Allow
                    }
                };
                self.matched.push(info);
                verdict
            }
            None => Verdict::Allow,
        }
    }

    pub fn total_urls(&self) -> u32 {
        self.total
    }

    pub fn blocked_urls(&self) -> u32 {
        self.blocked
    }

    pub fn whitelisted_urls(&self) -> u32 {
        self.whitelisted
    }

    /// Materializes the full page info. Copies the matched list; callers
    /// polling counters should prefer the O(1) accessors.
    pub fn page_info(&self) -> PageInfo {
        PageInfo {
            matched: self.matched.clone(),
            total_urls: self.total,
            blocked_urls: self.blocked,
            whitelisted_urls: self.whitelisted,
        }
    }
}
