//! Git repository integration: refuse to rewrite files with uncommitted changes

use git2::{Repository, Status, StatusOptions};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

use crate::error::Result;

/// Working-tree state of the repository containing a rewrite root.
pub struct GitGuard {
    repo_root: PathBuf,
    dirty_files: HashSet<PathBuf>,
}

impl GitGuard {
    /// Discover the repository containing `path`.
    ///
    /// Returns `Ok(None)` when `path` is not inside a git work tree.
    pub fn discover(path: &Path) -> Result<Option<Self>> {
        let repo = match Repository::discover(path) {
            Ok(r) => r,
            Err(_) => return Ok(None),
        };
        let Some(workdir) = repo.workdir() else {
            return Ok(None);
        };
        let repo_root = workdir.canonicalize().unwrap_or_else(|_| workdir.to_path_buf());
        let dirty_files = Self::collect_dirty_files(&repo, &repo_root)?;

        Ok(Some(Self {
            repo_root,
            dirty_files,
        }))
    }

    fn collect_dirty_files(repo: &Repository, repo_root: &Path) -> Result<HashSet<PathBuf>> {
        let mut opts = StatusOptions::new();
        opts.include_untracked(false).include_ignored(false);

        let modified = Status::INDEX_MODIFIED
            | Status::INDEX_RENAMED
            | Status::INDEX_TYPECHANGE
            | Status::WT_MODIFIED
            | Status::WT_RENAMED
            | Status::WT_TYPECHANGE
            | Status::CONFLICTED;

        let mut dirty = HashSet::new();
        for entry in repo.statuses(Some(&mut opts))?.iter() {
            if entry.status().intersects(modified) {
                if let Some(path) = entry.path() {
                    dirty.insert(repo_root.join(path));
                }
            }
        }
        Ok(dirty)
    }

    pub fn repo_root(&self) -> &Path {
        &self.repo_root
    }

    /// Whether `path` has staged or unstaged modifications.
    pub fn is_dirty(&self, path: &Path) -> bool {
        let path = match path.canonicalize() {
            Ok(p) => p,
            Err(_) => path.to_path_buf(),
        };
        self.dirty_files.contains(&path)
    }

    /// The subset of `paths` with uncommitted modifications, in input order.
    pub fn dirty_among(&self, paths: &[PathBuf]) -> Vec<PathBuf> {
        paths.iter().filter(|p| self.is_dirty(p)).cloned().collect()
    }
}
