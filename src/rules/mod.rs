//! Declarative rewrite rules
//!
//! A [`RuleSet`] holds everything the rewriter needs to know about a
//! reorganization: which files to visit, the Mapping Table of literal
//! replacements, and the Location Rules that only apply under certain
//! directories. Rule sets are plain JSON so they can be edited and tested
//! apart from the traversal logic.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::LazyLock;

use crate::error::{Error, Result};

/// Rule set for the feature-first reorganization, shipped with the binary.
const BUILTIN_JSON: &str = include_str!("feature_first.json");

static BUILTIN: LazyLock<RuleSet> = LazyLock::new(|| {
    RuleSet::from_json(BUILTIN_JSON, Path::new("<built-in>")).expect("built-in rule set is invalid")
});

/// A complete, ordered set of rewrite rules.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RuleSet {
    /// Glob patterns matched against file names. Empty selects every file.
    #[serde(default)]
    pub include: Vec<String>,
    /// Path substrings marking reorganized locations. A file is only a
    /// candidate if its path contains one of them. Empty disables the check.
    #[serde(default)]
    pub markers: Vec<String>,
    /// The Mapping Table, applied in order.
    #[serde(default)]
    pub mappings: Vec<Mapping>,
    /// Location Rules; the first whose predicate holds is applied.
    #[serde(default)]
    pub locations: Vec<LocationRule>,
}

/// One Mapping Table entry: an exact literal and its replacement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Mapping {
    pub from: String,
    /// Empty means the entry is handled by a location rule instead.
    #[serde(default)]
    pub to: String,
}

impl Mapping {
    pub fn new(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
        }
    }

    /// Entries with an empty replacement are skipped by the generic pass.
    pub fn is_deferred(&self) -> bool {
        self.to.is_empty()
    }
}

/// Replacements that only apply to files whose path contains `path_contains`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LocationRule {
    pub path_contains: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub replacements: Vec<PatternReplacement>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub expansions: Vec<Expansion>,
}

impl LocationRule {
    /// Check the predicate against a normalized (forward-slash) path string.
    pub fn matches(&self, path_key: &str) -> bool {
        path_key.contains(&self.path_contains)
    }
}

/// Regex pattern replaced by a literal string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PatternReplacement {
    pub pattern: String,
    pub replacement: String,
}

/// Aggregator rule: one matched import expands into several lines.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Expansion {
    /// Only expand while the content still contains this text.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub when_contains: Option<String>,
    pub pattern: String,
    pub lines: Vec<String>,
}

impl Expansion {
    /// The replacement block, one line per entry.
    pub fn block(&self) -> String {
        self.lines.join("\n")
    }
}

impl RuleSet {
    /// The built-in feature-first rule set.
    pub fn builtin() -> Self {
        BUILTIN.clone()
    }

    /// Parse and validate a rule set from JSON text.
    ///
    /// `origin` only labels errors.
    pub fn from_json(json: &str, origin: &Path) -> Result<Self> {
        let rules: RuleSet = serde_json::from_str(json).map_err(|e| Error::Rules {
            path: origin.to_path_buf(),
            reason: e.to_string(),
        })?;
        rules.validate()?;
        Ok(rules)
    }

    /// Load and validate a rule set from a JSON file.
    pub fn from_path(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path).map_err(|source| Error::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&json, path)
    }

    /// Pretty JSON form, suitable for saving as a starting point.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| Error::Output(std::io::Error::other(e)))
    }

    /// Check the invariants the rewriter relies on.
    ///
    /// Regexes and globs are compiled by the rewriter and walker, which
    /// report their own errors; this covers the structural checks.
    pub fn validate(&self) -> Result<()> {
        if self.mappings.iter().any(|m| m.from.is_empty()) {
            return Err(Error::EmptyMapping);
        }
        // Output of a mapping must not be input to any mapping, or a second
        // run would rewrite it again.
        for mapping in &self.mappings {
            if let Some(key) = self.mappings.iter().find(|k| mapping.to.contains(&k.from)) {
                return Err(Error::SelfOverlap {
                    from: mapping.from.clone(),
                    matched: key.from.clone(),
                });
            }
        }
        if self.locations.iter().any(|l| l.path_contains.is_empty()) {
            return Err(Error::EmptyPredicate);
        }
        Ok(())
    }

    /// Mappings that take part in the generic literal pass.
    pub fn active_mappings(&self) -> impl Iterator<Item = &Mapping> {
        self.mappings.iter().filter(|m| !m.is_deferred())
    }

    /// First location rule whose predicate holds for `path_key`.
    pub fn location_for(&self, path_key: &str) -> Option<&LocationRule> {
        self.locations.iter().find(|l| l.matches(path_key))
    }
}
