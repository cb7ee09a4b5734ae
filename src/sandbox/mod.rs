//! Path containment for tool calls.
//!
//! Every path the model hands us is resolved against a single
//! [`WorkingRoot`]. The check runs on the canonical form (symlinks
//! resolved for every component that exists), so symlinks pointing out
//! of the root are caught along with `..` segments.
//!
//! Containment is the only sandboxing layer: there is no OS-level jail
//! and no resource limit beyond the script timeout.

use std::path::{Component, Path, PathBuf};

use anyhow::{bail, Context};

use crate::tools::ToolError;

/// The directory all tool calls are confined to.
///
/// Built once at startup from trusted configuration and never changed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkingRoot {
    path: PathBuf,
}

impl WorkingRoot {
    /// Canonicalizes `path`, which must be an existing directory.
    pub fn new(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let canonical = std::fs::canonicalize(path)
            .with_context(|| format!("Working directory {} is not accessible", path.display()))?;
        if !canonical.is_dir() {
            bail!("Working directory {} is not a directory", path.display());
        }
        Ok(Self { path: canonical })
    }

    /// Absolute, canonical path of the root.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Resolves `relative` inside the root.
    ///
    /// The target does not need to exist. `""` and `"."` resolve to the
    /// root itself.
    pub fn resolve(&self, relative: &str) -> Result<PathBuf, ToolError> {
        let escape = || ToolError::PathEscape {
            path: relative.to_string(),
        };

        // An absolute `relative` replaces the root entirely here;
        // the prefix check below rejects it.
        let joined = self.path.join(relative);
        let normalized = normalize_lexically(&joined);
        let resolved = canonicalize_existing(&normalized).ok_or_else(escape)?;

        if resolved.starts_with(&self.path) {
            Ok(resolved)
        } else {
            Err(escape())
        }
    }
}

/// Folds `.` and `..` without touching the filesystem.
/// `..` at the filesystem root stays at the root.
fn normalize_lexically(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::Prefix(_) | Component::RootDir => out.push(component.as_os_str()),
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            Component::Normal(part) => out.push(part),
        }
    }
    out
}

/// Canonicalizes the longest existing ancestor of `path` and re-appends
/// the missing tail.
///
/// Returns `None` when a missing component is a dangling symlink: writing
/// through it would land wherever the link points.
fn canonicalize_existing(path: &Path) -> Option<PathBuf> {
    let mut existing = path;
    let mut tail = Vec::new();

    loop {
        match std::fs::canonicalize(existing) {
            Ok(canonical) => {
                let mut resolved = canonical;
                for part in tail.iter().rev() {
                    resolved.push(part);
                }
                return Some(resolved);
            }
            Err(_) => {
                if std::fs::symlink_metadata(existing).is_ok() {
                    return None;
                }
                tail.push(existing.file_name()?.to_os_string());
                existing = existing.parent()?;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn root() -> (tempfile::TempDir, WorkingRoot) {
        let dir = tempfile::tempdir().unwrap();
        let root = WorkingRoot::new(dir.path()).unwrap();
        (dir, root)
    }

    #[test]
    fn test_new_canonicalizes() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("sub")).unwrap();
        let root = WorkingRoot::new(dir.path().join("sub/../sub")).unwrap();
        assert_eq!(root.path(), fs::canonicalize(dir.path().join("sub")).unwrap());
    }

    #[test]
    fn test_new_rejects_missing_and_files() {
        let dir = tempfile::tempdir().unwrap();
        assert!(WorkingRoot::new(dir.path().join("nope")).is_err());
        fs::write(dir.path().join("file.txt"), "x").unwrap();
        assert!(WorkingRoot::new(dir.path().join("file.txt")).is_err());
    }

    #[test]
    fn test_resolve_dot_and_empty_is_root() {
        let (_dir, root) = root();
        assert_eq!(root.resolve(".").unwrap(), root.path());
        assert_eq!(root.resolve("").unwrap(), root.path());
        assert_eq!(root.resolve("./").unwrap(), root.path());
    }

    #[test]
    fn test_resolve_existing_and_missing_targets() {
        let (_dir, root) = root();
        fs::create_dir(root.path().join("pkg")).unwrap();
        fs::write(root.path().join("pkg/calc.py"), "").unwrap();

        assert_eq!(
            root.resolve("pkg/calc.py").unwrap(),
            root.path().join("pkg/calc.py")
        );
        // Missing targets resolve as long as they stay inside
        assert_eq!(
            root.resolve("new/dir/file.txt").unwrap(),
            root.path().join("new/dir/file.txt")
        );
        // Inner `..` that stays inside is fine
        assert_eq!(
            root.resolve("pkg/../pkg/calc.py").unwrap(),
            root.path().join("pkg/calc.py")
        );
    }

    #[test]
    fn test_resolve_rejects_traversal() {
        let (_dir, root) = root();
        for path in ["..", "../secret.txt", "a/../../b", "./../x", "pkg/../../../etc/passwd"] {
            let err = root.resolve(path).unwrap_err();
            assert!(
                matches!(err, ToolError::PathEscape { .. }),
                "{path} should escape"
            );
        }
    }

    #[test]
    fn test_resolve_rejects_absolute_override() {
        let (_dir, root) = root();
        assert!(matches!(
            root.resolve("/etc/passwd"),
            Err(ToolError::PathEscape { .. })
        ));
        assert!(matches!(
            root.resolve("/does/not/exist"),
            Err(ToolError::PathEscape { .. })
        ));
    }

    #[test]
    fn test_resolve_absolute_path_inside_root_is_allowed() {
        let (_dir, root) = root();
        let inside = root.path().join("notes.txt");
        assert_eq!(root.resolve(inside.to_str().unwrap()).unwrap(), inside);
    }

    #[test]
    fn test_resolve_rejects_sibling_with_shared_prefix() {
        let parent = tempfile::tempdir().unwrap();
        fs::create_dir(parent.path().join("sandbox")).unwrap();
        fs::create_dir(parent.path().join("sandbox2")).unwrap();
        let root = WorkingRoot::new(parent.path().join("sandbox")).unwrap();
        assert!(matches!(
            root.resolve("../sandbox2/file.txt"),
            Err(ToolError::PathEscape { .. })
        ));
    }

    #[cfg(unix)]
    #[test]
    fn test_resolve_rejects_symlink_out_of_root() {
        let outside = tempfile::tempdir().unwrap();
        fs::write(outside.path().join("secret.txt"), "s3cret").unwrap();
        let (_dir, root) = root();
        std::os::unix::fs::symlink(outside.path(), root.path().join("escape")).unwrap();

        assert!(matches!(
            root.resolve("escape/secret.txt"),
            Err(ToolError::PathEscape { .. })
        ));
        assert!(matches!(
            root.resolve("escape/new.txt"),
            Err(ToolError::PathEscape { .. })
        ));
    }

    #[cfg(unix)]
    #[test]
    fn test_resolve_rejects_dangling_symlink() {
        let (_dir, root) = root();
        std::os::unix::fs::symlink("/nonexistent/target", root.path().join("dangling")).unwrap();
        assert!(matches!(
            root.resolve("dangling"),
            Err(ToolError::PathEscape { .. })
        ));
    }

    #[cfg(unix)]
    #[test]
    fn test_resolve_follows_symlink_inside_root() {
        let (_dir, root) = root();
        fs::create_dir(root.path().join("real")).unwrap();
        std::os::unix::fs::symlink(root.path().join("real"), root.path().join("alias")).unwrap();
        assert_eq!(
            root.resolve("alias/file.txt").unwrap(),
            root.path().join("real/file.txt")
        );
    }

    #[test]
    fn test_normalize_lexically() {
        assert_eq!(
            normalize_lexically(Path::new("/a/./b/../c")),
            PathBuf::from("/a/c")
        );
        assert_eq!(normalize_lexically(Path::new("/../..")), PathBuf::from("/"));
    }
}
