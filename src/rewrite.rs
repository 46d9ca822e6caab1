//! Applying a rule set to file contents
//!
//! A [`Rewriter`] is a [`RuleSet`] with its regexes compiled. Rewriting a
//! file runs two passes in a fixed order:
//!
//! 1. the generic pass: every active Mapping Table entry is replaced
//!    literally, in table order;
//! 2. the location pass: the first Location Rule whose predicate holds for
//!    the file's path applies its pattern replacements, then its expansions.
//!
//! Expansions check for leftover placeholders, so they must see the output of
//! the generic pass.

use regex::{NoExpand, Regex};
use std::borrow::Cow;
use std::fs;
use std::io::Write;
use std::path::Path;

use crate::error::{Error, Result};
use crate::paths::path_key;
use crate::rules::{Expansion, LocationRule, Mapping, RuleSet};

struct CompiledReplacement {
    regex: Regex,
    replacement: String,
}

struct CompiledExpansion {
    when_contains: Option<String>,
    regex: Regex,
    block: String,
}

struct CompiledLocation {
    path_contains: String,
    replacements: Vec<CompiledReplacement>,
    expansions: Vec<CompiledExpansion>,
}

/// Compiled rules, ready to rewrite text and files.
pub struct Rewriter {
    mappings: Vec<Mapping>,
    locations: Vec<CompiledLocation>,
}

fn compile(pattern: &str) -> Result<Regex> {
    Regex::new(pattern).map_err(|source| Error::InvalidPattern {
        pattern: pattern.to_string(),
        source,
    })
}

impl CompiledLocation {
    fn new(rule: &LocationRule) -> Result<Self> {
        let replacements = rule
            .replacements
            .iter()
            .map(|r| {
                Ok(CompiledReplacement {
                    regex: compile(&r.pattern)?,
                    replacement: r.replacement.clone(),
                })
            })
            .collect::<Result<Vec<_>>>()?;
        let expansions = rule
            .expansions
            .iter()
            .map(|e: &Expansion| {
                Ok(CompiledExpansion {
                    when_contains: e.when_contains.clone(),
                    regex: compile(&e.pattern)?,
                    block: e.block(),
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            path_contains: rule.path_contains.clone(),
            replacements,
            expansions,
        })
    }

    fn apply(&self, mut content: String) -> String {
        for r in &self.replacements {
            content = replace_all(content, &r.regex, &r.replacement);
        }
        for e in &self.expansions {
            let armed = e
                .when_contains
                .as_deref()
                .is_none_or(|needle| content.contains(needle));
            if armed {
                content = replace_all(content, &e.regex, &e.block);
            }
        }
        content
    }
}

/// Replace every match with `replacement` taken literally (`$` is not special).
fn replace_all(content: String, regex: &Regex, replacement: &str) -> String {
    let replaced = match regex.replace_all(&content, NoExpand(replacement)) {
        Cow::Borrowed(_) => None,
        Cow::Owned(s) => Some(s),
    };
    replaced.unwrap_or(content)
}

impl Rewriter {
    /// Compile a rule set. Fails on the first invalid regex.
    pub fn new(rules: &RuleSet) -> Result<Self> {
        rules.validate()?;
        let locations = rules
            .locations
            .iter()
            .map(CompiledLocation::new)
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            mappings: rules.active_mappings().cloned().collect(),
            locations,
        })
    }

    /// Rewrite `content` as if it were the file at `location`.
    ///
    /// `location` is the path seen from the rewrite root, as produced by
    /// [`root_relative`](crate::paths::root_relative); only it is checked
    /// against location predicates.
    pub fn rewrite_str(&self, location: &Path, content: &str) -> String {
        let mut content = content.to_string();

        for mapping in &self.mappings {
            if content.contains(&mapping.from) {
                content = content.replace(&mapping.from, &mapping.to);
            }
        }

        let key = path_key(location);
        if let Some(rule) = self.locations.iter().find(|l| key.contains(&l.path_contains)) {
            tracing::debug!(path = %location.display(), location = %rule.path_contains, "applying location rule");
            content = rule.apply(content);
        }

        content
    }

    /// Rewrite the file at `path` in place, matching location rules against
    /// `location` (see [`rewrite_str`](Self::rewrite_str)).
    ///
    /// Returns `true` if the content changed. Unchanged files are not
    /// touched. With `dry_run` the new content is computed but not written.
    pub fn rewrite_file(&self, path: &Path, location: &Path, dry_run: bool) -> Result<bool> {
        let original = fs::read_to_string(path).map_err(|source| Error::Read {
            path: path.to_path_buf(),
            source,
        })?;

        let rewritten = self.rewrite_str(location, &original);
        if rewritten == original {
            return Ok(false);
        }

        if !dry_run {
            write_atomic(path, &rewritten).map_err(|source| Error::Write {
                path: path.to_path_buf(),
                source,
            })?;
            tracing::info!(path = %path.display(), "rewrote imports");
        }
        Ok(true)
    }
}

/// Replace `path` with `content` via a temporary file in the same directory,
/// keeping the original permissions.
fn write_atomic(path: &Path, content: &str) -> std::io::Result<()> {
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    let permissions = fs::metadata(path)?.permissions();

    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    tmp.write_all(content.as_bytes())?;
    tmp.as_file().sync_all()?;
    fs::set_permissions(tmp.path(), permissions)?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::{LocationRule, PatternReplacement};
    use tempfile::TempDir;

    const JOURNAL: &str = "lib/features/journal/presentation/screens/journal_screen.dart";
    const SLEEP: &str = "lib/features/sleep/presentation/screens/sleep_screen.dart";

    fn builtin() -> Rewriter {
        Rewriter::new(&RuleSet::builtin()).unwrap()
    }

    #[test]
    fn test_literal_mapping() {
        let rw = builtin();
        let out = rw.rewrite_str(
            Path::new("lib/features/tags/data/models/x.dart"),
            "import 'package:x/x.dart';\nimport 'a' from '../models/tag.dart';\n",
        );
        assert!(out.contains("from '../../data/models/tag.dart'"), "{}", out);
        assert!(!out.contains("from '../models/tag.dart'"));
    }

    #[test]
    fn test_mapping_is_idempotent() {
        let rw = builtin();
        let path = Path::new("lib/features/tags/x.dart");
        let once = rw.rewrite_str(path, "from '../models/tag.dart'");
        assert_eq!(once, "from '../../data/models/tag.dart'");
        let twice = rw.rewrite_str(path, &once);
        assert_eq!(twice, once);
    }

    #[test]
    fn test_every_occurrence_replaced() {
        let rw = builtin();
        let out = rw.rewrite_str(
            Path::new("lib/shared/x.dart"),
            "from '../models/mood_entry.dart'\nfrom '../models/mood_entry.dart'\n",
        );
        assert_eq!(out.matches("from '../../../shared/models/mood_entry.dart'").count(), 2);
    }

    #[test]
    fn test_unrelated_content_unchanged() {
        let rw = builtin();
        let text = "import 'package:flutter/material.dart';\nvoid main() {}\n";
        assert_eq!(rw.rewrite_str(Path::new("lib/core/x.dart"), text), text);
    }

    #[test]
    fn test_sleep_providers_one_level() {
        let rw = builtin();
        let out = rw.rewrite_str(Path::new(SLEEP), "import 'x' from '../services/providers.dart';");
        assert_eq!(out, "import 'x' from '../../data/providers/sleep_providers.dart';");
    }

    #[test]
    fn test_sleep_providers_two_levels_double_quotes() {
        let rw = builtin();
        let out = rw.rewrite_str(Path::new(SLEEP), "from \"../../services/providers.dart\"");
        assert_eq!(out, "from '../../data/providers/sleep_providers.dart'");
    }

    #[test]
    fn test_meals_only_one_level() {
        let rw = builtin();
        let path = Path::new("lib/features/meals/presentation/screens/meals_screen.dart");
        assert_eq!(
            rw.rewrite_str(path, "from '../services/providers.dart'"),
            "from '../../data/providers/meal_providers.dart'"
        );
        // The two-level spelling is only recognized for sleep.
        let two = "from '../../services/providers.dart'";
        assert_eq!(rw.rewrite_str(path, two), two);
    }

    #[test]
    fn test_exercise_and_tags_providers() {
        let rw = builtin();
        assert_eq!(
            rw.rewrite_str(
                Path::new("lib/features/exercise/x.dart"),
                "from '../services/providers.dart'"
            ),
            "from '../../data/providers/exercise_providers.dart'"
        );
        assert_eq!(
            rw.rewrite_str(Path::new("lib/features/tags/x.dart"), "from '../services/providers.dart'"),
            "from '../../data/providers/tag_providers.dart'"
        );
    }

    #[test]
    fn test_providers_outside_locations_untouched() {
        let rw = builtin();
        let text = "from '../services/providers.dart'";
        assert_eq!(rw.rewrite_str(Path::new("lib/shared/widgets/x.dart"), text), text);
    }

    #[test]
    fn test_journal_expansion() {
        let rw = builtin();
        let text = "import 'package:flutter/material.dart';\nimport '../services/providers.dart';\nclass J {}\n";
        let out = rw.rewrite_str(Path::new(JOURNAL), text);
        let expected = "import 'package:flutter/material.dart';\n\
import '../../../../shared/services/database/database_provider.dart';\n\
import '../../../../shared/providers/common_providers.dart';\n\
import '../../../sleep/data/providers/sleep_providers.dart';\n\
import '../../../meals/data/providers/meal_providers.dart';\n\
import '../../../exercise/data/providers/exercise_providers.dart';\n\
import '../../../tags/data/providers/tag_providers.dart';\n\
class J {}\n";
        assert_eq!(out, expected);
        assert_eq!(rw.rewrite_str(Path::new(JOURNAL), &out), out);
    }

    #[test]
    fn test_journal_screen_imports_and_expansion_together() {
        let rw = builtin();
        let text = "import 'add_sleep_screen.dart';\nimport '../services/providers.dart';\n";
        let out = rw.rewrite_str(Path::new(JOURNAL), text);
        // Plain `import '...'` lines carry no `from`, so only the expansion fires.
        assert!(out.starts_with("import 'add_sleep_screen.dart';\n"));
        assert_eq!(out.lines().count(), 7);
    }

    #[test]
    fn test_journal_without_placeholder_unchanged() {
        let rw = builtin();
        let text = "import 'package:flutter/material.dart';\n";
        assert_eq!(rw.rewrite_str(Path::new(JOURNAL), text), text);
    }

    #[test]
    fn test_generic_pass_runs_before_location_pass() {
        // The generic pass removes the placeholder, so the expansion never fires.
        let rules = RuleSet {
            mappings: vec![Mapping::new("old_providers.dart", "new_providers.dart")],
            locations: vec![LocationRule {
                path_contains: "journal".to_string(),
                replacements: vec![],
                expansions: vec![Expansion {
                    when_contains: Some("old_providers.dart".to_string()),
                    pattern: "new_providers".to_string(),
                    lines: vec!["a".to_string(), "b".to_string()],
                }],
            }],
            ..Default::default()
        };
        let rw = Rewriter::new(&rules).unwrap();
        assert_eq!(
            rw.rewrite_str(Path::new("journal/x.dart"), "old_providers.dart"),
            "new_providers.dart"
        );
    }

    #[test]
    fn test_replacement_is_literal() {
        let rules = RuleSet {
            locations: vec![LocationRule {
                path_contains: "lib/".to_string(),
                replacements: vec![PatternReplacement {
                    pattern: "(old)".to_string(),
                    replacement: "$1 and $$".to_string(),
                }],
                expansions: vec![],
            }],
            ..Default::default()
        };
        let rw = Rewriter::new(&rules).unwrap();
        assert_eq!(rw.rewrite_str(Path::new("lib/a.dart"), "old"), "$1 and $$");
    }

    #[test]
    fn test_invalid_pattern_rejected() {
        let rules = RuleSet {
            locations: vec![LocationRule {
                path_contains: "lib/".to_string(),
                replacements: vec![PatternReplacement {
                    pattern: "from ([".to_string(),
                    replacement: String::new(),
                }],
                expansions: vec![],
            }],
            ..Default::default()
        };
        let err = Rewriter::new(&rules).err().unwrap();
        assert!(matches!(err, Error::InvalidPattern { ref pattern, .. } if pattern == "from (["));
    }

    #[test]
    fn test_rewrite_file_writes_only_when_changed() {
        let dir = TempDir::new().unwrap();
        let sleep_dir = dir.path().join("lib/features/sleep");
        fs::create_dir_all(&sleep_dir).unwrap();
        let changed = sleep_dir.join("a.dart");
        let unchanged = sleep_dir.join("b.dart");
        fs::write(&changed, "from '../models/sleep_entry.dart'").unwrap();
        fs::write(&unchanged, "void main() {}").unwrap();

        let rw = builtin();
        let location = Path::new("lib/features/sleep/a.dart");
        assert!(rw.rewrite_file(&changed, location, false).unwrap());
        assert!(!rw.rewrite_file(&unchanged, location, false).unwrap());
        assert_eq!(
            fs::read_to_string(&changed).unwrap(),
            "from '../../data/models/sleep_entry.dart'"
        );
        assert_eq!(fs::read_to_string(&unchanged).unwrap(), "void main() {}");
        assert!(!rw.rewrite_file(&changed, location, false).unwrap());
    }

    #[test]
    fn test_rewrite_file_dry_run_leaves_file() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("a.dart");
        fs::write(&file, "from '../models/tag.dart'").unwrap();

        assert!(builtin().rewrite_file(&file, Path::new("lib/features/a.dart"), true).unwrap());
        assert_eq!(fs::read_to_string(&file).unwrap(), "from '../models/tag.dart'");
    }

    #[test]
    fn test_rewrite_file_missing_is_read_error() {
        let err = builtin()
            .rewrite_file(
                Path::new("/nonexistent/lib/features/a.dart"),
                Path::new("lib/features/a.dart"),
                false,
            )
            .unwrap_err();
        assert!(matches!(err, Error::Read { .. }));
    }

    #[test]
    fn test_rewrite_file_non_utf8_is_read_error() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("bin.dart");
        fs::write(&file, [0xff, 0xfe, 0x00]).unwrap();
        let err = builtin()
            .rewrite_file(&file, Path::new("lib/features/bin.dart"), false)
            .unwrap_err();
        assert!(matches!(err, Error::Read { .. }));
    }

    #[cfg(unix)]
    #[test]
    fn test_rewrite_file_keeps_permissions() {
        use std::os::unix::fs::PermissionsExt;

        let dir = TempDir::new().unwrap();
        let file = dir.path().join("a.dart");
        fs::write(&file, "from '../models/tag.dart'").unwrap();
        fs::set_permissions(&file, fs::Permissions::from_mode(0o640)).unwrap();

        assert!(builtin().rewrite_file(&file, Path::new("lib/features/a.dart"), false).unwrap());
        let mode = fs::metadata(&file).unwrap().permissions().mode() & 0o777;
        assert_eq!(mode, 0o640);
    }

    #[test]
    fn test_location_ignores_folders_above_root() {
        let rw = builtin();
        let root = Path::new("/work/lib/features/sleep/app/lib");
        let file = root.join("features/meals/presentation/screens/meals_screen.dart");
        let location = crate::paths::root_relative(root, &file);
        assert_eq!(
            rw.rewrite_str(&location, "from '../services/providers.dart'"),
            "from '../../data/providers/meal_providers.dart'"
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_rewrite_file_unwritable_dir_is_write_error() {
        use std::os::unix::fs::PermissionsExt;

        let dir = TempDir::new().unwrap();
        let locked = dir.path().join("features");
        fs::create_dir_all(&locked).unwrap();
        let file = locked.join("a.dart");
        fs::write(&file, "from '../models/tag.dart'").unwrap();
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o555)).unwrap();

        // Mode bits do not stop a privileged user; nothing to check then.
        if fs::write(locked.join(".canary"), "").is_ok() {
            fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();
            return;
        }

        let result = builtin().rewrite_file(&file, Path::new("lib/features/a.dart"), false);
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();

        let err = result.unwrap_err();
        assert!(matches!(err, Error::Write { ref path, .. } if *path == file), "{err}");
        assert!(err.to_string().starts_with("cannot write"));
        assert_eq!(fs::read_to_string(&file).unwrap(), "from '../models/tag.dart'");
    }
}
