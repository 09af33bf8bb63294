//! WebRefine rule sets
//!
//! Parses prioritized, categorized filter rule files (EasyList-style text
//! lines or the JSON content-blocker variant) into an immutable rule index.
//! Rule-set changes are staged and become visible to classification only
//! after an explicit apply barrier, and classifiers hold `Arc` snapshots so
//! a committed page session is never rewritten by a later update.

mod context;
mod error;
mod index;
mod parser;
mod rule;
mod ruleset;
mod store;

pub use context::{base_domain, host_of, is_third_party, normalize_origin, RequestInfo, TabId};
pub use error::RuleError;
pub use index::{RuleIndex, RuleMatch};
pub use rule::{
    Action, InlineScriptRule, ResourceType, RuleSource, ScriptPattern, UrlPredicate,
};
pub use ruleset::{Categories, RuleSetDescriptor};
pub use store::RuleStore;

pub type Result<T> = std::result::Result<T, RuleError>;
