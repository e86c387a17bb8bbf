use super::FileSystem;
use anyhow::{anyhow, Context, Result};
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Component, Path, PathBuf};
use std::sync::RwLock;

#[derive(Debug, Clone, PartialEq, Eq)]
enum MockEntry {
    File(Vec<u8>),
    Directory,
}

/// In-memory file system; relative paths are rooted at `/mock` unless another
/// root is given
pub struct MockFileSystem {
    files: RwLock<BTreeMap<PathBuf, MockEntry>>,
    executables: RwLock<BTreeSet<PathBuf>>,
    root: PathBuf,
}

impl MockFileSystem {
    pub fn new() -> Self {
        Self::with_root(PathBuf::from("/mock"))
    }

    pub fn with_root(root: PathBuf) -> Self {
        Self {
            files: RwLock::new(BTreeMap::new()),
            executables: RwLock::new(BTreeSet::new()),
            root,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn add_file(&self, path: impl AsRef<Path>, content: &str) {
        let path = self.normalize_path(path.as_ref());
        let mut files = self.files.write().unwrap();

        if let Some(parent) = path.parent() {
            Self::ensure_parents(&mut files, parent);
        }
        files.insert(path, MockEntry::File(content.as_bytes().to_vec()));
    }

    pub fn add_dir(&self, path: impl AsRef<Path>) {
        let path = self.normalize_path(path.as_ref());
        let mut files = self.files.write().unwrap();
        Self::ensure_parents(&mut files, &path);
    }

    pub fn is_executable(&self, path: impl AsRef<Path>) -> bool {
        let path = self.normalize_path(path.as_ref());
        self.executables.read().unwrap().contains(&path)
    }

    /// All regular files currently stored, sorted
    pub fn files(&self) -> Vec<PathBuf> {
        self.files
            .read()
            .unwrap()
            .iter()
            .filter(|(_, entry)| matches!(entry, MockEntry::File(_)))
            .map(|(path, _)| path.clone())
            .collect()
    }

    fn normalize_path(&self, path: &Path) -> PathBuf {
        let joined = if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.root.join(path)
        };

        let mut normalized = PathBuf::new();
        for component in joined.components() {
            match component {
                Component::CurDir => {}
                Component::ParentDir => {
                    normalized.pop();
                }
                other => normalized.push(other),
            }
        }
        normalized
    }

    fn ensure_parents(files: &mut BTreeMap<PathBuf, MockEntry>, path: &Path) {
        let mut current = PathBuf::new();
        for component in path.components() {
            current.push(component);
            files
                .entry(current.clone())
                .or_insert(MockEntry::Directory);
        }
    }
}

impl Default for MockFileSystem {
    fn default() -> Self {
        Self::new()
    }
}

impl FileSystem for MockFileSystem {
    fn exists(&self, path: &Path) -> bool {
        let path = self.normalize_path(path);
        self.files.read().unwrap().contains_key(&path)
    }

    fn is_file(&self, path: &Path) -> bool {
        let path = self.normalize_path(path);
        matches!(
            self.files.read().unwrap().get(&path),
            Some(MockEntry::File(_))
        )
    }

    fn read_to_string(&self, path: &Path) -> Result<String> {
        let path = self.normalize_path(path);
        let files = self
            .files
            .read()
            .map_err(|_| anyhow!("Mock file system lock poisoned"))?;

        match files.get(&path) {
            Some(MockEntry::File(content)) => String::from_utf8(content.clone())
                .context(format!("File is not valid UTF-8: {:?}", path)),
            Some(MockEntry::Directory) => Err(anyhow!("Not a file: {:?}", path)),
            None => Err(anyhow!("File not found: {:?}", path)),
        }
    }

    fn write(&self, path: &Path, contents: &[u8]) -> Result<()> {
        let path = self.normalize_path(path);
        let mut files = self
            .files
            .write()
            .map_err(|_| anyhow!("Mock file system lock poisoned"))?;

        let parent_exists = path
            .parent()
            .map(|parent| matches!(files.get(parent), Some(MockEntry::Directory)))
            .unwrap_or(false);
        if !parent_exists {
            return Err(anyhow!("Parent directory does not exist: {:?}", path));
        }
        if matches!(files.get(&path), Some(MockEntry::Directory)) {
            return Err(anyhow!("Is a directory: {:?}", path));
        }

        files.insert(path, MockEntry::File(contents.to_vec()));
        Ok(())
    }

    fn create_dir_all(&self, path: &Path) -> Result<()> {
        let path = self.normalize_path(path);
        let mut files = self
            .files
            .write()
            .map_err(|_| anyhow!("Mock file system lock poisoned"))?;

        if matches!(files.get(&path), Some(MockEntry::File(_))) {
            return Err(anyhow!("File exists: {:?}", path));
        }
        Self::ensure_parents(&mut files, &path);
        Ok(())
    }

    fn copy(&self, src: &Path, dest: &Path) -> Result<bool> {
        let src = self.normalize_path(src);
        let content = {
            let files = self
                .files
                .read()
                .map_err(|_| anyhow!("Mock file system lock poisoned"))?;
            match files.get(&src) {
                Some(MockEntry::File(content)) => content.clone(),
                _ => return Err(anyhow!("File not found: {:?}", src)),
            }
        };

        let dest_path = self.normalize_path(dest);
        let unchanged = matches!(
            self.files.read().unwrap().get(&dest_path),
            Some(MockEntry::File(existing)) if *existing == content
        );
        if unchanged {
            return Ok(false);
        }

        self.write(&dest_path, &content)?;
        Ok(true)
    }

    fn set_executable(&self, path: &Path) -> Result<()> {
        if !self.is_file(path) {
            return Err(anyhow!("File not found: {:?}", path));
        }
        self.executables
            .write()
            .map_err(|_| anyhow!("Mock file system lock poisoned"))?
            .insert(self.normalize_path(path));
        Ok(())
    }

    fn glob(&self, base: &Path, pattern: &str) -> Result<Vec<PathBuf>> {
        let full_pattern = self.normalize_path(&base.join(pattern));
        let matcher = glob::Pattern::new(&full_pattern.to_string_lossy())
            .context(format!("Invalid glob pattern '{}'", pattern))?;

        Ok(self
            .files()
            .into_iter()
            .filter(|path| matcher.matches_path(path))
            .collect())
    }
}
