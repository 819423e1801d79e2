//! Virtual-root path resolution
//!
//! Operator-supplied paths never name the agent's real base directory;
//! they start with the virtual root token instead (`root`,
//! `root/docs/a.txt`). Resolution substitutes the real base directory
//! for the leading token. Paths that do not start with the token are
//! treated as relative to the base directory.

use std::path::{Path, PathBuf};

use fv_protocol::VIRTUAL_ROOT;

/// Substitute the agent's base directory for the virtual root token.
pub fn resolve_virtual(base: &Path, raw: &str) -> PathBuf {
    let raw = raw.trim_start_matches('/');

    if raw == VIRTUAL_ROOT {
        return base.to_path_buf();
    }

    if let Some(rest) = raw.strip_prefix(VIRTUAL_ROOT) {
        if let Some(rest) = rest.strip_prefix('/') {
            return base.join(rest);
        }
    }

    base.join(raw)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bare_root_token() {
        let base = Path::new("/srv/shared");
        assert_eq!(resolve_virtual(base, "root"), PathBuf::from("/srv/shared"));
        assert_eq!(resolve_virtual(base, "/root"), PathBuf::from("/srv/shared"));
    }

    #[test]
    fn test_nested_path() {
        let base = Path::new("/srv/shared");
        assert_eq!(
            resolve_virtual(base, "root/docs/a.txt"),
            PathBuf::from("/srv/shared/docs/a.txt")
        );
    }

    #[test]
    fn test_token_prefix_is_not_token() {
        // "rootfs" must not be mistaken for the virtual root
        let base = Path::new("/srv/shared");
        assert_eq!(
            resolve_virtual(base, "rootfs/x"),
            PathBuf::from("/srv/shared/rootfs/x")
        );
    }

    #[test]
    fn test_relative_path_without_token() {
        let base = Path::new("/srv/shared");
        assert_eq!(
            resolve_virtual(base, "docs/b.txt"),
            PathBuf::from("/srv/shared/docs/b.txt")
        );
    }
}
