use std::fs;
use std::path::{Path, PathBuf};

use uuid::Uuid;

use super::{EntryKind, Vfs};
use crate::error::{BinderyError, Result};
use crate::path::StorePath;

/// Production storage: store paths resolved against the book root on the
/// real filesystem.
pub struct FsVfs {
    root: PathBuf,
}

impl FsVfs {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, path: &StorePath) -> PathBuf {
        let mut out = self.root.clone();
        for segment in path.as_str().split('/') {
            out.push(segment);
        }
        out
    }

    fn ensure_parent(&self, path: &StorePath) -> Result<()> {
        if let Some(parent) = self.resolve(path).parent() {
            if !parent.exists() {
                fs::create_dir_all(parent).map_err(|e| BinderyError::io(path.as_str(), e))?;
            }
        }
        Ok(())
    }
}

impl Vfs for FsVfs {
    fn list_dir(&self, path: &StorePath) -> Result<Vec<(String, EntryKind)>> {
        let dir = self.resolve(path);
        let mut out = Vec::new();
        let entries = fs::read_dir(&dir).map_err(|e| BinderyError::io(path.as_str(), e))?;
        for entry in entries {
            let entry = entry.map_err(|e| BinderyError::io(path.as_str(), e))?;
            let Some(name) = entry.file_name().to_str().map(str::to_string) else {
                continue;
            };
            let kind = if entry.path().is_dir() {
                EntryKind::Dir
            } else {
                EntryKind::File
            };
            out.push((name, kind));
        }
        Ok(out)
    }

    fn read_file(&self, path: &StorePath) -> Result<String> {
        fs::read_to_string(self.resolve(path)).map_err(|e| BinderyError::io(path.as_str(), e))
    }

    fn write_file(&self, path: &StorePath, contents: &str) -> Result<()> {
        self.ensure_parent(path)?;
        let target = self.resolve(path);

        // Atomic write: tmp file in the same directory, then rename over.
        let tmp = target.with_file_name(format!(".tmp-{}", Uuid::new_v4()));
        fs::write(&tmp, contents).map_err(|e| BinderyError::io(path.as_str(), e))?;
        fs::rename(&tmp, &target).map_err(|e| BinderyError::io(path.as_str(), e))?;
        Ok(())
    }

    fn rename(&self, from: &StorePath, to: &StorePath) -> Result<()> {
        self.ensure_parent(to)?;
        fs::rename(self.resolve(from), self.resolve(to))
            .map_err(|e| BinderyError::io(from.as_str(), e))
    }

    fn copy(&self, from: &StorePath, to: &StorePath) -> Result<()> {
        self.ensure_parent(to)?;
        copy_recursively(&self.resolve(from), &self.resolve(to))
            .map_err(|e| BinderyError::io(from.as_str(), e))
    }

    fn delete(&self, path: &StorePath) -> Result<()> {
        let target = self.resolve(path);
        let result = if target.is_dir() {
            fs::remove_dir_all(&target)
        } else {
            fs::remove_file(&target)
        };
        result.map_err(|e| BinderyError::io(path.as_str(), e))
    }

    fn create_dir(&self, path: &StorePath) -> Result<()> {
        fs::create_dir_all(self.resolve(path)).map_err(|e| BinderyError::io(path.as_str(), e))
    }

    fn exists(&self, path: &StorePath) -> bool {
        self.resolve(path).exists()
    }
}

fn copy_recursively(from: &Path, to: &Path) -> std::io::Result<()> {
    if from.is_dir() {
        fs::create_dir_all(to)?;
        for entry in fs::read_dir(from)? {
            let entry = entry?;
            copy_recursively(&entry.path(), &to.join(entry.file_name()))?;
        }
    } else {
        fs::copy(from, to)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn write_read_roundtrip_creates_parents() {
        let dir = tempdir().unwrap();
        let vfs = FsVfs::new(dir.path());

        let path = StorePath::new("data/snips/snip-1/fragment-1.txt");
        vfs.write_file(&path, "hello").unwrap();
        assert!(vfs.exists(&path));
        assert_eq!(vfs.read_file(&path).unwrap(), "hello");
    }

    #[test]
    fn rename_moves_a_directory_subtree() {
        let dir = tempdir().unwrap();
        let vfs = FsVfs::new(dir.path());

        vfs.write_file(&StorePath::new("data/snips/snip-1/f.txt"), "x")
            .unwrap();
        vfs.rename(
            &StorePath::new("data/snips/snip-1"),
            &StorePath::new("data/recycling/deleted-snip-1"),
        )
        .unwrap();

        assert!(!vfs.exists(&StorePath::new("data/snips/snip-1")));
        assert_eq!(
            vfs.read_file(&StorePath::new("data/recycling/deleted-snip-1/f.txt"))
                .unwrap(),
            "x"
        );
    }

    #[test]
    fn list_dir_reports_kinds() {
        let dir = tempdir().unwrap();
        let vfs = FsVfs::new(dir.path());

        vfs.create_dir(&StorePath::new("data/chapters/chapter-1")).unwrap();
        vfs.write_file(&StorePath::new("data/chapters/.manifest.json"), "{}")
            .unwrap();

        let mut entries = vfs.list_dir(&StorePath::new("data/chapters")).unwrap();
        entries.sort();
        assert_eq!(
            entries,
            vec![
                (".manifest.json".to_string(), EntryKind::File),
                ("chapter-1".to_string(), EntryKind::Dir),
            ]
        );
    }

    #[test]
    fn read_missing_file_reports_the_path() {
        let dir = tempdir().unwrap();
        let vfs = FsVfs::new(dir.path());
        let err = vfs.read_file(&StorePath::new("data/ghost.txt")).unwrap_err();
        assert!(err.to_string().contains("data/ghost.txt"));
    }
}
