//! Compiled filter rules

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::context::host_of;
use crate::ruleset::Categories;

/// Resource type of a subresource request. Closed enumeration;
/// unrecognized types classify as Other.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceType {
    MainFrame,
    SubFrame,
    Stylesheet,
    Script,
    Image,
    Font,
    Xhr,
    Other,
}

impl ResourceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceType::MainFrame => "MainFrame",
            ResourceType::SubFrame => "SubFrame",
            ResourceType::Stylesheet => "Stylesheet",
            ResourceType::Script => "Script",
            ResourceType::Image => "Image",
            ResourceType::Font => "Font",
            ResourceType::Xhr => "XHR",
            ResourceType::Other => "Other",
        }
    }

    /// Parses the lowercase names used by the JSON rule variant.
    pub fn from_trigger_name(name: &str) -> ResourceType {
        match name.to_lowercase().as_str() {
            "document" | "main-frame" | "mainframe" => ResourceType::MainFrame,
            "sub-frame" | "subframe" | "iframe" => ResourceType::SubFrame,
            "style-sheet" | "stylesheet" => ResourceType::Stylesheet,
            "script" => ResourceType::Script,
            "image" => ResourceType::Image,
            "font" => ResourceType::Font,
            "xhr" | "fetch" | "xmlhttprequest" => ResourceType::Xhr,
            _ => ResourceType::Other,
        }
    }
}

impl std::fmt::Display for ResourceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// URL predicate of a compiled filter.
#[derive(Debug, Clone)]
pub enum UrlPredicate {
    /// Plain substring anywhere in the URL.
    Substring(String),
    /// `||domain^` anchor: the request host or any of its subdomains.
    DomainAnchor(String),
    /// Regex from the JSON variant's `url-filter`.
    Regex(Regex),
    /// Matches every URL (`url-filter: ".*"` shortcut).
    MatchAll,
}

impl UrlPredicate {
    pub fn matches_url(&self, url: &str) -> bool {
        match self {
            UrlPredicate::Substring(s) => url.contains(s.as_str()),
            UrlPredicate::DomainAnchor(domain) => match host_of(url) {
                Some(host) => host_matches_domain(&host, domain),
                None => false,
            },
            UrlPredicate::Regex(re) => re.is_match(url),
            UrlPredicate::MatchAll => true,
        }
    }

    /// Matches an origin host directly (used for `$elemhide` and
    /// `$inline-script` scopes which apply to origins, not request URLs).
    pub fn matches_host(&self, host: &str) -> bool {
        match self {
            UrlPredicate::Substring(s) => host.contains(s.as_str()),
            UrlPredicate::DomainAnchor(domain) => host_matches_domain(host, domain),
            UrlPredicate::Regex(re) => re.is_match(host),
            UrlPredicate::MatchAll => true,
        }
    }
}

/// Host equals the anchor domain or is one of its subdomains.
pub(crate) fn host_matches_domain(host: &str, domain: &str) -> bool {
    host == domain || host.ends_with(&format!(".{domain}"))
}

/// By-value reference to the rule set a compiled rule came from. Carried in
/// match results so that sessions never borrow store internals.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleSource {
    pub rule_set: String,
    pub categories: Categories,
    pub priority: u8,
}

/// Action a classified request was subjected to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    Blocked,
    Whitelisted,
}

/// URL-blocking rule.
#[derive(Debug, Clone)]
pub(crate) struct NetworkRule {
    pub predicate: UrlPredicate,
    pub resource_type: Option<ResourceType>,
    /// Raw filter text as written in the rule file.
    pub raw: String,
}

impl NetworkRule {
    pub fn matches(&self, url: &str, resource_type: ResourceType) -> bool {
        if let Some(required) = self.resource_type {
            if required != resource_type {
                return false;
            }
        }
        self.predicate.matches_url(url)
    }
}

/// `@@` whitelist exception. With `elemhide` set it does not whitelist
/// requests; it disables element hiding for the matching origin's frames.
#[derive(Debug, Clone)]
pub(crate) struct ExceptionRule {
    pub predicate: UrlPredicate,
    pub resource_type: Option<ResourceType>,
    pub elemhide: bool,
    pub raw: String,
}

impl ExceptionRule {
    pub fn matches(&self, url: &str, resource_type: ResourceType) -> bool {
        if self.elemhide {
            return false;
        }
        if let Some(required) = self.resource_type {
            if required != resource_type {
                return false;
            }
        }
        self.predicate.matches_url(url)
    }
}

/// Where an element-hide selector applies.
#[derive(Debug, Clone)]
pub enum HideScope {
    /// `###selector`: every document.
    Global,
    /// `domain##selector`: documents of that domain (and subdomains).
    Domain(String),
    /// JSON `css-display-none`: documents owning a request that matched
    /// the trigger (including the document's own navigation request).
    Trigger {
        predicate: UrlPredicate,
        resource_type: Option<ResourceType>,
    },
}

#[derive(Debug, Clone)]
pub(crate) struct HideRule {
    pub scope: HideScope,
    pub selector: String,
}

/// `||domain$inline-script` blocks inline script blocks of main-frame
/// documents whose page origin matches.
#[derive(Debug, Clone)]
pub struct InlineScriptRule {
    pub predicate: UrlPredicate,
    pub raw: String,
}

/// Pattern of a `script:contains(...)` cosmetic filter.
#[derive(Debug, Clone)]
pub enum ScriptPattern {
    Substring(String),
    Regex(Regex),
}

impl ScriptPattern {
    pub fn matches(&self, source: &str) -> bool {
        match self {
            ScriptPattern::Substring(s) => source.contains(s.as_str()),
            ScriptPattern::Regex(re) => re.is_match(source),
        }
    }
}

/// `domain##script:contains(pattern)` neutralizes inline script blocks
/// whose source matches the pattern, in frames of that domain.
#[derive(Debug, Clone)]
pub(crate) struct ScriptContentRule {
    pub domain: String,
    pub pattern: ScriptPattern,
    pub raw: String,
}
