//! Filter file parsing
//!
//! Two interchangeable formats per rule set, detected by the leading
//! character: line-oriented EasyList-style text filters, or a JSON array of
//! `{"trigger": …, "action": …}` content-blocker entries. Individual
//! malformed text lines and unknown JSON actions are skipped with a warning;
//! an unparseable JSON document fails the whole file.

use regex::Regex;
use serde::Deserialize;
use tracing::warn;

use crate::error::RuleError;
use crate::rule::{
    ExceptionRule, HideRule, HideScope, InlineScriptRule, NetworkRule, ResourceType,
    ScriptContentRule, ScriptPattern, UrlPredicate,
};

/// Compiled rules of one file, prior to being attached to a rule set.
#[derive(Debug, Default)]
pub(crate) struct ParsedRules {
    pub network: Vec<NetworkRule>,
    pub exceptions: Vec<ExceptionRule>,
    pub hides: Vec<HideRule>,
    pub inline_scripts: Vec<InlineScriptRule>,
    pub script_contents: Vec<ScriptContentRule>,
}

impl ParsedRules {
    pub fn rule_count(&self) -> usize {
        self.network.len()
            + self.exceptions.len()
            + self.hides.len()
            + self.inline_scripts.len()
            + self.script_contents.len()
    }
}

pub(crate) fn parse_rule_file(contents: &str, path: &str) -> Result<ParsedRules, RuleError> {
    if contents.trim_start().starts_with('[') {
        parse_json(contents, path)
    } else {
        Ok(parse_text(contents, path))
    }
}

#[derive(Deserialize)]
struct JsonEntry {
    trigger: JsonTrigger,
    action: JsonAction,
}

#[derive(Deserialize)]
struct JsonTrigger {
    #[serde(rename = "url-filter")]
    url_filter: String,
    #[serde(rename = "resource-type")]
    resource_type: Option<String>,
}

#[derive(Deserialize)]
struct JsonAction {
    #[serde(rename = "type")]
    kind: String,
    selector: Option<String>,
}

fn parse_json(contents: &str, path: &str) -> Result<ParsedRules, RuleError> {
    let entries: Vec<JsonEntry> =
        serde_json::from_str(contents).map_err(|e| RuleError::Malformed {
            path: path.to_string(),
            reason: e.to_string(),
        })?;

    let mut rules = ParsedRules::default();
    for (i, entry) in entries.into_iter().enumerate() {
        let predicate = match compile_url_filter(&entry.trigger.url_filter) {
            Some(p) => p,
            None => {
                warn!(path, entry = i, "Skipping entry with invalid url-filter");
                continue;
            }
        };
        let resource_type = entry
            .trigger
            .resource_type
            .as_deref()
            .map(ResourceType::from_trigger_name);

        match entry.action.kind.as_str() {
            "block" => rules.network.push(NetworkRule {
                predicate,
                resource_type,
                raw: entry.trigger.url_filter,
            }),
            "css-display-none" => match entry.action.selector {
                Some(selector) => rules.hides.push(HideRule {
                    scope: HideScope::Trigger {
                        predicate,
                        resource_type,
                    },
                    selector,
                }),
                None => warn!(path, entry = i, "css-display-none entry without selector"),
            },
            other => warn!(path, entry = i, kind = other, "Skipping unknown action type"),
        }
    }
    Ok(rules)
}

/// `".*"` is common enough in content-blocker lists to special-case.
fn compile_url_filter(filter: &str) -> Option<UrlPredicate> {
    if filter == ".*" {
        return Some(UrlPredicate::MatchAll);
    }
    Regex::new(filter).ok().map(UrlPredicate::Regex)
}

fn parse_text(contents: &str, path: &str) -> ParsedRules {
    let mut rules = ParsedRules::default();
    for (lineno, raw_line) in contents.lines().enumerate() {
        let line = raw_line.trim();
        if line.is_empty() || line.starts_with('!') || line.starts_with('[') {
            continue;
        }
        if !parse_text_line(line, &mut rules) {
            warn!(path, line = lineno + 1, "Skipping malformed filter line");
        }
    }
    rules
}

fn parse_text_line(line: &str, rules: &mut ParsedRules) -> bool {
    if let Some(exception) = line.strip_prefix("@@") {
        return parse_exception(exception, line, rules);
    }
    if let Some(idx) = line.find("##") {
        return parse_cosmetic(&line[..idx], &line[idx + 2..], rules);
    }
    parse_network(line, rules)
}

fn parse_exception(body: &str, raw: &str, rules: &mut ParsedRules) -> bool {
    let (filter, modifiers) = split_modifiers(body);
    let predicate = match compile_text_predicate(filter) {
        Some(p) => p,
        None => return false,
    };

    let mut elemhide = false;
    let mut resource_type = None;
    for modifier in modifiers {
        match modifier {
            "elemhide" => elemhide = true,
            m => match known_resource_modifier(m) {
                Some(rt) => resource_type = Some(rt),
                None => return false,
            },
        }
    }

    rules.exceptions.push(ExceptionRule {
        predicate,
        resource_type,
        elemhide,
        raw: raw.to_string(),
    });
    true
}

fn parse_cosmetic(domain: &str, selector: &str, rules: &mut ParsedRules) -> bool {
    if selector.is_empty() {
        return false;
    }
    if let Some(body) = selector
        .strip_prefix("script:contains(")
        .and_then(|s| s.strip_suffix(')'))
    {
        if domain.is_empty() {
            // A content filter needs a domain scope
            return false;
        }
        let pattern = if body.len() >= 2 && body.starts_with('/') && body.ends_with('/') {
            match Regex::new(&body[1..body.len() - 1]) {
                Ok(re) => ScriptPattern::Regex(re),
                Err(_) => return false,
            }
        } else {
            ScriptPattern::Substring(body.to_string())
        };
        rules.script_contents.push(ScriptContentRule {
            domain: domain.to_lowercase(),
            pattern,
            raw: format!("{domain}##script:contains({body})"),
        });
        return true;
    }

    let scope = if domain.is_empty() {
        HideScope::Global
    } else {
        HideScope::Domain(domain.to_lowercase())
    };
    rules.hides.push(HideRule {
        scope,
        selector: selector.to_string(),
    });
    true
}

fn parse_network(line: &str, rules: &mut ParsedRules) -> bool {
    let (filter, modifiers) = split_modifiers(line);
    let predicate = match compile_text_predicate(filter) {
        Some(p) => p,
        None => return false,
    };

    let mut inline_script = false;
    let mut resource_type = None;
    for modifier in modifiers {
        match modifier {
            "inline-script" => inline_script = true,
            m => match known_resource_modifier(m) {
                Some(rt) => resource_type = Some(rt),
                None => return false,
            },
        }
    }

    if inline_script {
        rules.inline_scripts.push(InlineScriptRule {
            predicate,
            raw: line.to_string(),
        });
    } else {
        rules.network.push(NetworkRule {
            predicate,
            resource_type,
            raw: line.to_string(),
        });
    }
    true
}

fn known_resource_modifier(modifier: &str) -> Option<ResourceType> {
    match modifier {
        "image" => Some(ResourceType::Image),
        "script" => Some(ResourceType::Script),
        "stylesheet" => Some(ResourceType::Stylesheet),
        "subdocument" => Some(ResourceType::SubFrame),
        "font" => Some(ResourceType::Font),
        "xmlhttprequest" => Some(ResourceType::Xhr),
        _ => None,
    }
}

/// Splits `filter$mod1,mod2` on the last `$` (URLs may contain `$`).
fn split_modifiers(line: &str) -> (&str, Vec<&str>) {
    match line.rfind('$') {
        Some(idx) if idx + 1 < line.len() => {
            let mods = line[idx + 1..].split(',').map(str::trim).collect();
            (&line[..idx], mods)
        }
        _ => (line, Vec::new()),
    }
}

fn compile_text_predicate(filter: &str) -> Option<UrlPredicate> {
    let filter = filter.trim();
    if filter.is_empty() {
        return None;
    }
    if let Some(anchored) = filter.strip_prefix("||") {
        let domain = anchored.trim_end_matches('^').to_lowercase();
        if domain.is_empty() {
            return None;
        }
        return Some(UrlPredicate::DomainAnchor(domain));
    }
    Some(UrlPredicate::Substring(filter.to_string()))
}
