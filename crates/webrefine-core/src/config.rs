//! Shield configuration

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use webrefine_defender::EscalationPolicy;
use webrefine_rules::RuleSetDescriptor;

use crate::error::ShieldError;
use crate::Result;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Directory holding downloaded rule files.
    pub rules_dir: PathBuf,
    /// Rule sets installed at startup.
    pub rule_sets: Vec<RuleSetDescriptor>,
    /// Enable resource filtering by default.
    pub refiner_enabled: bool,
    /// Enable tracker detection by default.
    pub defender_enabled: bool,
    /// How tracker observation escalates into enforcement.
    pub escalation: EscalationPolicy,
}

impl Config {
    pub fn new(rules_dir: PathBuf) -> Self {
        Self {
            rules_dir,
            rule_sets: Vec::new(),
            refiner_enabled: true,
            defender_enabled: true,
            escalation: EscalationPolicy::default(),
        }
    }

    pub fn data_dir() -> PathBuf {
        std::env::var("XDG_DATA_HOME")
            .ok()
            .map(PathBuf::from)
            .or_else(|| {
                std::env::var("HOME")
                    .ok()
                    .map(|h| PathBuf::from(h).join(".local/share"))
            })
            .map(|d| d.join("webrefine"))
            .unwrap_or_else(|| PathBuf::from(".webrefine"))
    }

    pub fn with_rule_set(mut self, descriptor: RuleSetDescriptor) -> Self {
        self.rule_sets.push(descriptor);
        self
    }

    /// Reads a persisted configuration file.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ShieldError::Config(format!("cannot read {}: {e}", path.display())))?;
        Ok(serde_json::from_str(&contents)?)
    }

    /// Writes the configuration next to the rule files.
    pub fn save(&self, path: &Path) -> Result<()> {
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(path, contents)
            .map_err(|e| ShieldError::Config(format!("cannot write {}: {e}", path.display())))?;
        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new(Self::data_dir().join("rules"))
    }
}
