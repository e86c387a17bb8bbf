//! FileSystem trait definition

use anyhow::Result;
use std::path::{Path, PathBuf};

/// Abstraction over the file operations needed to validate a definition and
/// stage a build context
pub trait FileSystem: Send + Sync {
    /// Check if a path exists
    fn exists(&self, path: &Path) -> bool;

    /// Check if path is a regular file
    fn is_file(&self, path: &Path) -> bool;

    /// Read file contents as string
    fn read_to_string(&self, path: &Path) -> Result<String>;

    /// Create or truncate a file with the given contents
    fn write(&self, path: &Path, contents: &[u8]) -> Result<()>;

    /// Create a directory and all of its missing parents
    fn create_dir_all(&self, path: &Path) -> Result<()>;

    /// Copy `src` to `dest`, leaving `dest` untouched when it already holds
    /// identical content.
    ///
    /// Returns `true` when the destination was written.
    fn copy(&self, src: &Path, dest: &Path) -> Result<bool>;

    /// Mark an existing file as executable by everyone
    fn set_executable(&self, path: &Path) -> Result<()>;

    /// Expand a glob `pattern` relative to `base` into the matching files,
    /// sorted by path
    fn glob(&self, base: &Path, pattern: &str) -> Result<Vec<PathBuf>>;

    /// Resolve `path` against `base` unless it is already absolute
    fn resolve(&self, base: &Path, path: &str) -> PathBuf {
        let candidate = Path::new(path);
        if candidate.is_absolute() {
            candidate.to_path_buf()
        } else {
            base.join(candidate)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::MockFileSystem;

    #[test]
    fn test_resolve_relative() {
        let fs = MockFileSystem::new();
        assert_eq!(
            fs.resolve(Path::new("/defs"), "requirements.txt"),
            PathBuf::from("/defs/requirements.txt")
        );
    }

    #[test]
    fn test_resolve_absolute() {
        let fs = MockFileSystem::new();
        assert_eq!(
            fs.resolve(Path::new("/defs"), "/etc/bindep.txt"),
            PathBuf::from("/etc/bindep.txt")
        );
    }
}
