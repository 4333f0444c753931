// SPDX-FileCopyrightText: Copyright © 2020-2023 Serpent OS Developers
//
// SPDX-License-Identifier: MPL-2.0

use std::path::{Component, Path, PathBuf};

use model::PathSecurityError;

use crate::Error;

/// Resolve `install_path` against `root`, rejecting anything that could
/// escape it (I3). The returned path is not yet validated against the
/// filesystem's real layout — call [`assert_within_root`] once the parent
/// directory exists, to also catch symlinked components.
pub fn sandbox_join(root: &Path, install_path: &str) -> Result<PathBuf, Error> {
    let rel = Path::new(install_path);

    for component in rel.components() {
        match component {
            Component::Normal(_) => {}
            other => {
                return Err(PathSecurityError {
                    path: install_path.to_string(),
                    reason: format!("component {other:?} is not allowed in an install path"),
                }
                .into());
            }
        }
    }

    let joined = root.join(rel);
    if joined == root {
        return Err(PathSecurityError { path: install_path.to_string(), reason: "resolves to the install root itself".to_string() }.into());
    }

    Ok(joined)
}

/// Canonicalize `root` and `target`'s parent directory (which must already
/// exist) and require the latter to be a descendant of the former. This is
/// the check that catches a symlinked directory component smuggling a
/// write outside the install root.
pub fn assert_within_root(root: &Path, target: &Path) -> Result<(), Error> {
    let parent = target.parent().unwrap_or(root);

    let canonical_root = std::fs::canonicalize(root).map_err(|e| io_err(root, e))?;
    let canonical_parent = std::fs::canonicalize(parent).map_err(|e| io_err(parent, e))?;

    if !canonical_parent.starts_with(&canonical_root) {
        return Err(PathSecurityError {
            path: target.display().to_string(),
            reason: "real path escapes the install root".to_string(),
        }
        .into());
    }

    Ok(())
}

fn io_err(path: &Path, e: std::io::Error) -> Error {
    Error::Io { path: path.display().to_string(), message: e.to_string() }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_parent_dir_traversal() {
        let root = Path::new("/install/root");
        assert!(sandbox_join(root, "../escape.md").is_err());
    }

    #[test]
    fn rejects_absolute_paths() {
        let root = Path::new("/install/root");
        assert!(sandbox_join(root, "/etc/passwd").is_err());
    }

    #[test]
    fn rejects_root_itself() {
        let root = Path::new("/install/root");
        assert!(sandbox_join(root, "").is_err());
    }

    #[test]
    fn accepts_nested_relative_path() {
        let root = Path::new("/install/root");
        let joined = sandbox_join(root, "agents/architect.md").unwrap();
        assert_eq!(joined, Path::new("/install/root/agents/architect.md"));
    }

    #[test]
    fn real_path_escape_via_symlink_is_rejected() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path().join("root");
        let outside = tmp.path().join("outside");
        std::fs::create_dir_all(&root).unwrap();
        std::fs::create_dir_all(&outside).unwrap();

        #[cfg(unix)]
        {
            let link = root.join("agents");
            std::os::unix::fs::symlink(&outside, &link).unwrap();

            let target = sandbox_join(&root, "agents/architect.md").unwrap();
            let err = assert_within_root(&root, &target).unwrap_err();
            assert!(matches!(err, Error::PathSecurity(_)));
        }
    }
}
