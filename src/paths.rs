//! Path helpers shared by traversal and rule matching.

use std::path::{Component, Path, PathBuf};

/// Path as a string with forward slashes, used for marker and location matching.
pub fn path_key(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}

/// Path of `path` as seen from the rewrite root: the root's own name followed
/// by the path below it.
///
/// Folders above the root never take part in marker or location matching.
/// A root without a name (`.`, `..`, `/`) is kept as written.
///
/// ```
/// use std::path::Path;
/// use reimport::paths::root_relative;
///
/// let p = root_relative(Path::new("/home/shared/app/lib"), Path::new("/home/shared/app/lib/main.dart"));
/// assert_eq!(p, Path::new("lib/main.dart"));
/// assert_eq!(root_relative(Path::new("."), Path::new("./lib/a.dart")), Path::new("./lib/a.dart"));
/// ```
pub fn root_relative(root: &Path, path: &Path) -> PathBuf {
    let base = root.file_name().map(Path::new).unwrap_or(root);
    match path.strip_prefix(root) {
        Ok(rel) => base.join(rel),
        Err(_) => path.to_path_buf(),
    }
}

/// Compute the import path from `from_file` to `to_file`.
///
/// The result is relative to the directory containing `from_file`, uses `/`
/// separators and always starts with `./` or `../`.
///
/// Returns `None` when no relative path exists: one path is absolute and the
/// other is not, the paths live under different roots or prefixes, or a `..`
/// in `from_file` climbs above its starting point.
///
/// The computation is purely lexical. Relative inputs are never resolved
/// against the current directory, so mixing an absolute and a relative path
/// gives `None` rather than a cwd-dependent answer, and `/..` is an error
/// rather than an alias for `/`.
///
/// # Examples
///
/// ```
/// use reimport::paths::relative_import_path;
///
/// assert_eq!(
///     relative_import_path("lib/features/sleep/screens/a.dart", "lib/core/theme/app_theme.dart"),
///     Some("../../../core/theme/app_theme.dart".to_string())
/// );
/// assert_eq!(
///     relative_import_path("lib/a.dart", "lib/b.dart"),
///     Some("./b.dart".to_string())
/// );
/// ```
pub fn relative_import_path(from_file: impl AsRef<Path>, to_file: impl AsRef<Path>) -> Option<String> {
    let from_dir = from_file.as_ref().parent().unwrap_or(Path::new(""));
    let to = to_file.as_ref();

    let (from_root, from_parts) = normalize(from_dir)?;
    let (to_root, to_parts) = normalize(to)?;
    if from_root != to_root {
        return None;
    }

    let common = from_parts
        .iter()
        .zip(&to_parts)
        .take_while(|(a, b)| a == b)
        .count();

    // A leftover ".." on the source side means the target's ancestor is unknown.
    if from_parts[common..].iter().any(|p| p == "..") {
        return None;
    }

    let mut parts: Vec<&str> = vec![".."; from_parts.len() - common];
    parts.extend(to_parts[common..].iter().map(String::as_str));

    let rel = parts.join("/");
    if rel.starts_with("../") || rel == ".." {
        Some(rel)
    } else if rel.is_empty() {
        Some(".".to_string())
    } else {
        Some(format!("./{}", rel))
    }
}

/// Split a path into its root (prefix + root dir) and lexically normalized parts.
///
/// Leading `..` parts of a relative path are kept; a `..` that would climb
/// above an absolute root yields `None`.
fn normalize(path: &Path) -> Option<(String, Vec<String>)> {
    let mut root = String::new();
    let mut parts: Vec<String> = Vec::new();

    for component in path.components() {
        match component {
            Component::Prefix(p) => root.push_str(&p.as_os_str().to_string_lossy()),
            Component::RootDir => root.push('/'),
            Component::CurDir => {}
            Component::ParentDir => match parts.last() {
                Some(last) if last != ".." => {
                    parts.pop();
                }
                _ if !root.is_empty() => return None,
                _ => parts.push("..".to_string()),
            },
            Component::Normal(name) => parts.push(name.to_string_lossy().into_owned()),
        }
    }

    Some((root, parts))
}
