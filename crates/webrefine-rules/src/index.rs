//! Applied rule index
//!
//! An immutable view over every applied rule set, ordered by precedence:
//! priority ascending (1 first), most recently applied first within a tie.
//! Classifiers hold the index behind an `Arc`; the store replaces the whole
//! index on apply, so in-flight sessions keep the rules they started with.

use std::sync::Arc;

use crate::context::host_of;
use crate::parser::ParsedRules;
use crate::rule::{
    host_matches_domain, HideScope, InlineScriptRule, ResourceType, RuleSource, ScriptPattern,
};
use crate::ruleset::RuleSetDescriptor;

/// One applied rule set with its compiled rules.
#[derive(Debug)]
pub(crate) struct LoadedRuleSet {
    pub descriptor: RuleSetDescriptor,
    /// Staging sequence, used to break priority ties (higher wins).
    pub seq: u64,
    pub rules: ParsedRules,
}

impl LoadedRuleSet {
    fn source(&self) -> RuleSource {
        RuleSource {
            rule_set: self.descriptor.name.clone(),
            categories: self.descriptor.categories,
            priority: self.descriptor.priority,
        }
    }
}

/// Result of matching one request against the index.
#[derive(Debug, Clone)]
pub struct RuleMatch {
    /// Raw filter text that matched.
    pub filter: String,
    pub source: RuleSource,
    /// True when a whitelist exception overrode a block verdict.
    pub whitelisted: bool,
}

#[derive(Debug, Default)]
pub struct RuleIndex {
    /// Sorted by (priority asc, seq desc).
    sets: Vec<Arc<LoadedRuleSet>>,
}

impl RuleIndex {
    pub(crate) fn new(mut sets: Vec<Arc<LoadedRuleSet>>) -> Self {
        sets.sort_by(|a, b| {
            a.descriptor
                .priority
                .cmp(&b.descriptor.priority)
                .then(b.seq.cmp(&a.seq))
        });
        Self { sets }
    }

    /// The applied sets, shared with the next rebuilt index.
    pub(crate) fn sets(&self) -> &[Arc<LoadedRuleSet>] {
        &self.sets
    }

    pub fn is_empty(&self) -> bool {
        self.sets.is_empty()
    }

    /// Applied descriptors in precedence order.
    pub fn descriptors(&self) -> Vec<RuleSetDescriptor> {
        self.sets.iter().map(|s| s.descriptor.clone()).collect()
    }

    /// Matches a request URL against every applied set. A whitelist
    /// exception in any set overrides a block match; otherwise the block
    /// rule from the highest-precedence set wins.
    pub fn match_request(&self, url: &str, resource_type: ResourceType) -> Option<RuleMatch> {
        let blocked = self.sets.iter().find_map(|set| {
            set.rules
                .network
                .iter()
                .find(|rule| rule.matches(url, resource_type))
                .map(|rule| RuleMatch {
                    filter: rule.raw.clone(),
                    source: set.source(),
                    whitelisted: false,
                })
        })?;

        for set in &self.sets {
            if let Some(exception) = set
                .rules
                .exceptions
                .iter()
                .find(|rule| rule.matches(url, resource_type))
            {
                return Some(RuleMatch {
                    filter: exception.raw.clone(),
                    source: set.source(),
                    whitelisted: true,
                });
            }
        }
        Some(blocked)
    }

    /// Whether an `$elemhide` exception disables element hiding for the
    /// given frame origin host.
    pub fn elemhide_suppressed(&self, frame_host: &str) -> bool {
        self.sets.iter().any(|set| {
            set.rules
                .exceptions
                .iter()
                .any(|e| e.elemhide && e.predicate.matches_host(frame_host))
        })
    }

    /// Selectors to hide in a document. `document_url` is the frame's own
    /// navigation URL; `frame_requests` are the (url, type) pairs of
    /// requests owned by that document, used by trigger-scoped rules.
    pub fn hide_selectors(
        &self,
        document_url: &str,
        frame_requests: &[(String, ResourceType)],
    ) -> Vec<String> {
        let document_host = host_of(document_url).unwrap_or_default();
        let mut selectors = Vec::new();
        for set in &self.sets {
            for hide in &set.rules.hides {
                let applies = match &hide.scope {
                    HideScope::Global => true,
                    HideScope::Domain(domain) => host_matches_domain(&document_host, domain),
                    HideScope::Trigger {
                        predicate,
                        resource_type,
                    } => {
                        let document_matches =
                            resource_type.is_none() && predicate.matches_url(document_url);
                        document_matches
                            || frame_requests.iter().any(|(url, rt)| {
                                resource_type.map_or(true, |required| required == *rt)
                                    && predicate.matches_url(url)
                            })
                    }
                };
                if applies && !selectors.contains(&hide.selector) {
                    selectors.push(hide.selector.clone());
                }
            }
        }
        selectors
    }

    /// `$inline-script` rules matching a page origin host.
    pub fn inline_script_rules_for(&self, page_host: &str) -> Vec<&InlineScriptRule> {
        self.sets
            .iter()
            .flat_map(|set| set.rules.inline_scripts.iter())
            .filter(|rule| rule.predicate.matches_host(page_host))
            .collect()
    }

    /// `script:contains` patterns applying to a frame's domain.
    pub fn script_content_patterns_for(&self, frame_host: &str) -> Vec<&ScriptPattern> {
        self.sets
            .iter()
            .flat_map(|set| set.rules.script_contents.iter())
            .filter(|rule| host_matches_domain(frame_host, &rule.domain))
            .map(|rule| &rule.pattern)
            .collect()
    }
}
