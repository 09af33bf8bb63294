//! Rule set descriptors and categories

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::RuleError;

/// Category bitmask for a rule set. Categories are OR-combinable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Categories(pub u32);

impl Categories {
    pub const MDM: Categories = Categories(1);
    pub const ADS: Categories = Categories(1 << 1);
    pub const TRACKERS: Categories = Categories(1 << 2);
    pub const MALWARE_DOMAINS: Categories = Categories(1 << 3);
    pub const ALL: Categories = Categories(0x7FFF_FFFF);

    pub fn contains(&self, other: Categories) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn union(&self, other: Categories) -> Categories {
        Categories(self.0 | other.0)
    }

    /// Maps a category name from a rule set configuration to its id.
    /// Unknown names fall back to ADS, the default category.
    pub fn from_name(name: &str) -> Categories {
        match name {
            "MDM" => Categories::MDM,
            "ADS" => Categories::ADS,
            "TRACKERS" => Categories::TRACKERS,
            "MALWARE_DOMAINS" => Categories::MALWARE_DOMAINS,
            _ => Categories::ADS,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match *self {
            Categories::MDM => "MDM",
            Categories::ADS => "ADS",
            Categories::TRACKERS => "TRACKERS",
            Categories::MALWARE_DOMAINS => "MALWARE_DOMAINS",
            _ => "MIXED",
        }
    }
}

impl std::ops::BitOr for Categories {
    type Output = Categories;

    fn bitor(self, rhs: Categories) -> Categories {
        self.union(rhs)
    }
}

impl std::fmt::Display for Categories {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Identifies a rule set: a named, categorized filter file with a load
/// priority. Immutable once loaded; the name is the update/remove key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleSetDescriptor {
    /// Human readable rule set name.
    pub name: String,
    /// Filesystem path of the rule file.
    pub path: PathBuf,
    /// One or more categories the rules belong to.
    pub categories: Categories,
    /// Precedence across rule sets. 1 is highest, 99 lowest.
    pub priority: u8,
}

impl RuleSetDescriptor {
    pub fn new(
        name: impl Into<String>,
        path: impl Into<PathBuf>,
        categories: Categories,
        priority: u8,
    ) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            categories,
            priority,
        }
    }

    pub(crate) fn validate(&self) -> Result<(), RuleError> {
        if !(1..=99).contains(&self.priority) {
            return Err(RuleError::InvalidPriority(self.priority));
        }
        Ok(())
    }
}
