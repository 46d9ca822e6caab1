//! Candidate file enumeration

use std::path::{Path, PathBuf};

use glob::Pattern;
use ignore::WalkBuilder;

use crate::error::{Error, Result};
use crate::paths::{path_key, root_relative};
use crate::rules::RuleSet;

/// Configuration for candidate enumeration.
#[derive(Debug, Clone, Default)]
pub struct WalkConfig {
    /// Glob patterns matched against file names. Empty selects every file.
    pub include: Vec<String>,
    /// Path substrings; a file must contain one of them. Empty disables the check.
    pub markers: Vec<String>,
    /// Honor .gitignore and .ignore files.
    pub respect_gitignore: bool,
}

impl WalkConfig {
    /// Take file selection from a rule set.
    pub fn from_rules(rules: &RuleSet, respect_gitignore: bool) -> Self {
        Self {
            include: rules.include.clone(),
            markers: rules.markers.clone(),
            respect_gitignore,
        }
    }
}

/// Walks a root directory and yields files that the rules should visit.
pub struct CandidateWalker {
    config: WalkConfig,
    include: Vec<Pattern>,
}

impl CandidateWalker {
    pub fn new(config: WalkConfig) -> Result<Self> {
        let include = config
            .include
            .iter()
            .map(|p| {
                Pattern::new(p).map_err(|source| Error::InvalidGlob {
                    pattern: p.clone(),
                    source,
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { config, include })
    }

    fn is_included(&self, path: &Path) -> bool {
        if self.include.is_empty() {
            return true;
        }
        let name = path
            .file_name()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_default();
        self.include.iter().any(|p| p.matches(&name))
    }

    /// Markers are matched below the root only, see [`root_relative`].
    fn has_marker(&self, root: &Path, path: &Path) -> bool {
        if self.config.markers.is_empty() {
            return true;
        }
        let key = path_key(&root_relative(root, path));
        self.config.markers.iter().any(|m| key.contains(m.as_str()))
    }

    /// Collect candidate files under `root`, sorted by file name within each directory.
    ///
    /// Symlinks are not followed and `.git` directories are skipped.
    /// Unreadable entries are logged and skipped.
    pub fn candidates(&self, root: &Path) -> Result<Vec<PathBuf>> {
        if !root.exists() {
            return Err(Error::MissingRoot {
                path: root.to_path_buf(),
            });
        }

        let respect = self.config.respect_gitignore;
        let walker = WalkBuilder::new(root)
            .hidden(false)
            .ignore(respect)
            .git_ignore(respect)
            .git_global(respect)
            .git_exclude(respect)
            .parents(respect)
            .require_git(false)
            .follow_links(false)
            .sort_by_file_name(|a, b| a.cmp(b))
            .filter_entry(|entry| entry.file_name() != ".git")
            .build();

        let mut found = Vec::new();
        for entry in walker {
            let entry = match entry {
                Ok(e) => e,
                Err(e) => {
                    tracing::warn!(error = %e, "skipping unreadable entry");
                    continue;
                }
            };

            if !entry.file_type().is_some_and(|t| t.is_file()) {
                continue;
            }

            let path = entry.path();
            if !self.is_included(path) {
                continue;
            }
            if !self.has_marker(root, path) {
                tracing::debug!(path = %path.display(), "outside reorganized locations");
                continue;
            }

            tracing::debug!(path = %path.display(), "candidate");
            found.push(path.to_path_buf());
        }

        Ok(found)
    }
}
