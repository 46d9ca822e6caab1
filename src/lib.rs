//! reimport - rewrite import statements after a source tree reorganization

pub mod batch;
pub mod error;
pub mod git;
pub mod output;
pub mod paths;
pub mod rewrite;
pub mod rules;
pub mod walker;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use batch::{Batch, BatchConfig, BatchReporter, BatchSummary, ErrorPolicy, FailedFile};
pub use error::{Error, Result};
pub use git::GitGuard;
pub use output::{ConsoleReporter, JsonReporter, print_json};
pub use paths::relative_import_path;
pub use rewrite::Rewriter;
pub use rules::{Expansion, LocationRule, Mapping, PatternReplacement, RuleSet};
pub use walker::{CandidateWalker, WalkConfig};
