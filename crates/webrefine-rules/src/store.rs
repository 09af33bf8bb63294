//! Rule store
//!
//! Owns every compiled rule. Additions, updates and removals are staged and
//! applied atomically by `flush_pending_changes`; until then classification
//! keeps seeing the previous index. Loading a rule set is atomic per set:
//! a file-level failure inserts nothing.

use parking_lot::{Mutex, RwLock};
use std::fs;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, info};

use crate::error::RuleError;
use crate::index::{LoadedRuleSet, RuleIndex};
use crate::parser::{parse_rule_file, ParsedRules};
use crate::ruleset::RuleSetDescriptor;
use crate::Result;

enum PendingChange {
    Upsert(Arc<LoadedRuleSet>),
    Remove(String),
}

pub struct RuleStore {
    active: RwLock<Arc<RuleIndex>>,
    pending: Mutex<Vec<PendingChange>>,
    seq: AtomicU64,
}

impl RuleStore {
    pub fn new() -> Self {
        Self {
            active: RwLock::new(Arc::new(RuleIndex::default())),
            pending: Mutex::new(Vec::new()),
            seq: AtomicU64::new(0),
        }
    }

    /// Parses the file behind the descriptor and stages the set for the
    /// next apply. Fails without staging anything on an unreadable path,
    /// a malformed JSON document, a duplicate name or a bad priority.
    pub fn add_rule_set(&self, descriptor: &RuleSetDescriptor) -> Result<()> {
        descriptor.validate()?;
        if self.is_known(&descriptor.name) {
            return Err(RuleError::DuplicateRuleSet(descriptor.name.clone()));
        }
        let rules = self.load_rules(descriptor)?;
        self.stage_upsert(descriptor, rules);
        Ok(())
    }

    /// Replaces an existing rule set by name; same atomicity as add.
    pub fn update_rule_set(&self, descriptor: &RuleSetDescriptor) -> Result<()> {
        descriptor.validate()?;
        if !self.is_known(&descriptor.name) {
            return Err(RuleError::UnknownRuleSet(descriptor.name.clone()));
        }
        let rules = self.load_rules(descriptor)?;
        self.stage_upsert(descriptor, rules);
        Ok(())
    }

    /// Stages removal of a rule set by name.
    pub fn remove_rule_set(&self, name: &str) -> Result<()> {
        if !self.is_known(name) {
            return Err(RuleError::UnknownRuleSet(name.to_string()));
        }
        self.pending
            .lock()
            .push(PendingChange::Remove(name.to_string()));
        debug!(rule_set = name, "Staged rule set removal");
        Ok(())
    }

    /// Currently applied rule sets, highest precedence first.
    pub fn active_rule_sets(&self) -> Vec<RuleSetDescriptor> {
        self.active.read().descriptors()
    }

    /// Snapshot of the applied index. Sessions capture this at navigation
    /// commit; later applies never touch a captured snapshot.
    pub fn snapshot(&self) -> Arc<RuleIndex> {
        Arc::clone(&self.active.read())
    }

    /// Applies every staged change in one index swap and returns once the
    /// new rules are visible to subsequent snapshots.
    pub fn flush_pending_changes(&self) {
        let changes: Vec<PendingChange> = std::mem::take(&mut *self.pending.lock());
        if changes.is_empty() {
            return;
        }

        let mut active = self.active.write();
        let mut sets: Vec<Arc<LoadedRuleSet>> = active.sets().to_vec();
        for change in changes {
            match change {
                PendingChange::Upsert(loaded) => {
                    let name = loaded.descriptor.name.clone();
                    sets.retain(|s| s.descriptor.name != name);
                    info!(
                        rule_set = %name,
                        priority = loaded.descriptor.priority,
                        rules = loaded.rules.rule_count(),
                        "Applied rule set"
                    );
                    sets.push(loaded);
                }
                PendingChange::Remove(name) => {
                    sets.retain(|s| s.descriptor.name != name);
                    info!(rule_set = %name, "Removed rule set");
                }
            }
        }
        *active = Arc::new(RuleIndex::new(sets));
    }

    fn load_rules(&self, descriptor: &RuleSetDescriptor) -> Result<ParsedRules> {
        let path = descriptor.path.display().to_string();
        let contents = fs::read_to_string(&descriptor.path).map_err(|source| RuleError::Io {
            path: path.clone(),
            source,
        })?;
        parse_rule_file(&contents, &path)
    }

    fn stage_upsert(&self, descriptor: &RuleSetDescriptor, rules: ParsedRules) {
        let seq = self.seq.fetch_add(1, Ordering::Relaxed) + 1;
        debug!(
            rule_set = %descriptor.name,
            rules = rules.rule_count(),
            "Staged rule set"
        );
        self.pending
            .lock()
            .push(PendingChange::Upsert(Arc::new(LoadedRuleSet {
                descriptor: descriptor.clone(),
                seq,
                rules,
            })));
    }

    /// A name is known when it is applied or staged (and not staged for
    /// removal afterwards).
    fn is_known(&self, name: &str) -> bool {
        let mut known = self
            .active
            .read()
            .descriptors()
            .iter()
            .any(|d| d.name == name);
        for change in self.pending.lock().iter() {
            match change {
                PendingChange::Upsert(set) if set.descriptor.name == name => known = true,
                PendingChange::Remove(n) if n == name => known = false,
                _ => {}
            }
        }
        known
    }
}

impl Default for RuleStore {
    fn default() -> Self {
        Self::new()
    }
}
