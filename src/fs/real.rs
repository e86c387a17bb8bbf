use super::FileSystem;
use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

pub struct RealFileSystem;

impl RealFileSystem {
    pub fn new() -> Self {
        Self
    }
}

impl Default for RealFileSystem {
    fn default() -> Self {
        Self::new()
    }
}

impl FileSystem for RealFileSystem {
    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn is_file(&self, path: &Path) -> bool {
        path.is_file()
    }

    fn read_to_string(&self, path: &Path) -> Result<String> {
        fs::read_to_string(path).context(format!("Failed to read file {:?}", path))
    }

    fn write(&self, path: &Path, contents: &[u8]) -> Result<()> {
        fs::write(path, contents).context(format!("Failed to write file {:?}", path))
    }

    fn create_dir_all(&self, path: &Path) -> Result<()> {
        fs::create_dir_all(path).context(format!("Failed to create directory {:?}", path))
    }

    fn copy(&self, src: &Path, dest: &Path) -> Result<bool> {
        let new_contents = fs::read(src).context(format!("Failed to read file {:?}", src))?;

        if dest.is_file() {
            let old_contents =
                fs::read(dest).context(format!("Failed to read file {:?}", dest))?;
            if old_contents == new_contents {
                debug!("{:?} is already up to date", dest);
                return Ok(false);
            }
        }

        fs::copy(src, dest).context(format!("Failed to copy {:?} to {:?}", src, dest))?;
        Ok(true)
    }

    #[cfg(unix)]
    fn set_executable(&self, path: &Path) -> Result<()> {
        use std::os::unix::fs::PermissionsExt;

        fs::set_permissions(path, fs::Permissions::from_mode(0o755))
            .context(format!("Failed to set permissions on {:?}", path))
    }

    #[cfg(not(unix))]
    fn set_executable(&self, path: &Path) -> Result<()> {
        fs::metadata(path)
            .map(|_| ())
            .context(format!("Failed to read metadata of {:?}", path))
    }

    fn glob(&self, base: &Path, pattern: &str) -> Result<Vec<PathBuf>> {
        let full_pattern = base.join(pattern);
        let full_pattern = full_pattern.to_string_lossy();

        let mut matches = Vec::new();
        for entry in glob::glob(&full_pattern)
            .context(format!("Invalid glob pattern '{}'", pattern))?
        {
            let path = entry.context("Failed to read glob match")?;
            if path.is_file() {
                matches.push(path);
            }
        }

        matches.sort();
        Ok(matches)
    }
}
