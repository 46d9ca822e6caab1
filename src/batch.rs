//! Batch run over a source tree
//!
//! Enumerates candidates, rewrites each one in order and reports progress
//! through a [`BatchReporter`]. Files are processed one at a time; a run can
//! be interrupted between files without leaving a file half-written.

use serde::Serialize;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::git::GitGuard;
use crate::paths::root_relative;
use crate::rewrite::Rewriter;
use crate::rules::RuleSet;
use crate::walker::{CandidateWalker, WalkConfig};

/// What to do when a file cannot be read or written.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ErrorPolicy {
    /// Stop at the first failure. Files already rewritten keep their content.
    #[default]
    Abort,
    /// Log the failure, continue with the next file, report at the end.
    Continue,
}

/// Configuration for a batch run.
#[derive(Debug, Clone, Default)]
pub struct BatchConfig {
    /// Compute changes without writing them.
    pub dry_run: bool,
    pub on_error: ErrorPolicy,
    /// Honor .gitignore and .ignore files while enumerating.
    pub respect_gitignore: bool,
    /// Refuse to run if a candidate has uncommitted git changes.
    pub require_clean: bool,
}

/// A file that could not be rewritten.
#[derive(Debug, Clone, Serialize)]
pub struct FailedFile {
    pub path: PathBuf,
    pub error: String,
}

/// Outcome of a batch run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct BatchSummary {
    /// Number of candidate files visited
    pub scanned: usize,
    /// Files whose content changed, in processing order
    pub fixed: Vec<PathBuf>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub failed: Vec<FailedFile>,
    pub dry_run: bool,
}

impl BatchSummary {
    pub fn fixed_count(&self) -> usize {
        self.fixed.len()
    }

    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Receives batch progress as it happens.
pub trait BatchReporter {
    fn file_fixed(&mut self, path: &Path, dry_run: bool) -> std::io::Result<()>;

    fn file_failed(&mut self, path: &Path, error: &Error) -> std::io::Result<()>;

    fn finish(&mut self, summary: &BatchSummary) -> std::io::Result<()>;
}

/// Rewrites every candidate under a root.
pub struct Batch {
    rewriter: Rewriter,
    walker: CandidateWalker,
    config: BatchConfig,
}

impl Batch {
    pub fn new(rules: &RuleSet, config: BatchConfig) -> Result<Self> {
        let rewriter = Rewriter::new(rules)?;
        let walker = CandidateWalker::new(WalkConfig::from_rules(rules, config.respect_gitignore))?;
        Ok(Self {
            rewriter,
            walker,
            config,
        })
    }

    /// Run the batch under `root`.
    ///
    /// With [`ErrorPolicy::Abort`] the first read or write failure is returned
    /// unreported and `finish` is not called. With [`ErrorPolicy::Continue`]
    /// failures are reported and collected into the summary.
    pub fn run(&self, root: &Path, reporter: &mut dyn BatchReporter) -> Result<BatchSummary> {
        let candidates = self.walker.candidates(root)?;
        tracing::debug!(root = %root.display(), count = candidates.len(), "enumerated candidates");

        if self.config.require_clean && !self.config.dry_run {
            self.check_clean(root, &candidates)?;
        }

        let mut summary = BatchSummary {
            scanned: candidates.len(),
            dry_run: self.config.dry_run,
            ..Default::default()
        };

        for path in &candidates {
            let location = root_relative(root, path);
            match self.rewriter.rewrite_file(path, &location, self.config.dry_run) {
                Ok(true) => {
                    reporter.file_fixed(path, self.config.dry_run)?;
                    summary.fixed.push(path.clone());
                }
                Ok(false) => {}
                Err(e) => {
                    if self.config.on_error == ErrorPolicy::Abort {
                        return Err(e);
                    }
                    tracing::warn!(path = %path.display(), error = %e, "rewrite failed, continuing");
                    reporter.file_failed(path, &e)?;
                    summary.failed.push(FailedFile {
                        path: path.clone(),
                        error: e.to_string(),
                    });
                }
            }
        }

        reporter.finish(&summary)?;
        Ok(summary)
    }

    fn check_clean(&self, root: &Path, candidates: &[PathBuf]) -> Result<()> {
        match GitGuard::discover(root)? {
            Some(guard) => {
                let dirty = guard.dirty_among(candidates);
                if !dirty.is_empty() {
                    return Err(Error::DirtyFiles { paths: dirty });
                }
                tracing::debug!(repo = %guard.repo_root().display(), "working tree clean");
            }
            None => {
                tracing::warn!(root = %root.display(), "not a git repository, skipping clean check");
            }
        }
        Ok(())
    }
}
