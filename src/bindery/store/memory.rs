use std::cell::RefCell;
use std::collections::BTreeMap;

use super::{EntryKind, Vfs};
use crate::error::{BinderyError, Result};
use crate::path::StorePath;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Entry {
    File(String),
    Dir,
}

/// In-memory storage backend for testing.
///
/// Uses `RefCell` for interior mutability since the engine is
/// single-threaded; this keeps the `Vfs` trait on `&self` without lock
/// overhead. Keys are full store paths; directory structure is implied by
/// key prefixes, exactly like the object layout on disk.
#[derive(Default)]
pub struct MemVfs {
    entries: RefCell<BTreeMap<String, Entry>>,
    fail_writes: RefCell<bool>,
}

impl MemVfs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent write/rename/delete fail, for error-path tests.
    pub fn set_fail_writes(&self, fail: bool) {
        *self.fail_writes.borrow_mut() = fail;
    }

    fn check_writable(&self, path: &StorePath) -> Result<()> {
        if *self.fail_writes.borrow() {
            Err(BinderyError::io(
                path.as_str(),
                std::io::Error::other("simulated write failure"),
            ))
        } else {
            Ok(())
        }
    }

    fn ensure_parents(&self, path: &StorePath) {
        let mut entries = self.entries.borrow_mut();
        let mut current = path.parent();
        while let Some(dir) = current {
            entries.entry(dir.as_str().to_string()).or_insert(Entry::Dir);
            current = dir.parent();
        }
    }

    /// All keys equal to `path` or under it (files and directories).
    fn subtree_keys(&self, path: &StorePath) -> Vec<String> {
        let entries = self.entries.borrow();
        entries
            .keys()
            .filter(|key| {
                key.as_str() == path.as_str() || StorePath::new(key.as_str()).is_under(path)
            })
            .cloned()
            .collect()
    }
}

impl Vfs for MemVfs {
    fn list_dir(&self, path: &StorePath) -> Result<Vec<(String, EntryKind)>> {
        let entries = self.entries.borrow();
        if !matches!(entries.get(path.as_str()), Some(Entry::Dir)) {
            return Err(BinderyError::io(
                path.as_str(),
                std::io::Error::from(std::io::ErrorKind::NotFound),
            ));
        }

        let prefix = format!("{}/", path.as_str());
        let mut out = Vec::new();
        for (key, entry) in entries.range(prefix.clone()..) {
            if !key.starts_with(&prefix) {
                break;
            }
            let rest = &key[prefix.len()..];
            if rest.contains('/') {
                continue; // deeper than one level
            }
            let kind = match entry {
                Entry::File(_) => EntryKind::File,
                Entry::Dir => EntryKind::Dir,
            };
            out.push((rest.to_string(), kind));
        }
        Ok(out)
    }

    fn read_file(&self, path: &StorePath) -> Result<String> {
        match self.entries.borrow().get(path.as_str()) {
            Some(Entry::File(contents)) => Ok(contents.clone()),
            _ => Err(BinderyError::io(
                path.as_str(),
                std::io::Error::from(std::io::ErrorKind::NotFound),
            )),
        }
    }

    fn write_file(&self, path: &StorePath, contents: &str) -> Result<()> {
        self.check_writable(path)?;
        self.ensure_parents(path);
        self.entries
            .borrow_mut()
            .insert(path.as_str().to_string(), Entry::File(contents.to_string()));
        Ok(())
    }

    fn rename(&self, from: &StorePath, to: &StorePath) -> Result<()> {
        self.check_writable(from)?;
        let keys = self.subtree_keys(from);
        if keys.is_empty() {
            return Err(BinderyError::io(
                from.as_str(),
                std::io::Error::from(std::io::ErrorKind::NotFound),
            ));
        }
        self.ensure_parents(to);
        let mut entries = self.entries.borrow_mut();
        for key in keys {
            let entry = entries.remove(&key).expect("key collected above");
            let rebased = StorePath::new(key.as_str())
                .rebase(from, to)
                .expect("key is within the renamed subtree");
            entries.insert(rebased.as_str().to_string(), entry);
        }
        Ok(())
    }

    fn copy(&self, from: &StorePath, to: &StorePath) -> Result<()> {
        self.check_writable(to)?;
        let keys = self.subtree_keys(from);
        if keys.is_empty() {
            return Err(BinderyError::io(
                from.as_str(),
                std::io::Error::from(std::io::ErrorKind::NotFound),
            ));
        }
        self.ensure_parents(to);
        let mut entries = self.entries.borrow_mut();
        for key in keys {
            let entry = entries.get(&key).expect("key collected above").clone();
            let rebased = StorePath::new(key.as_str())
                .rebase(from, to)
                .expect("key is within the copied subtree");
            entries.insert(rebased.as_str().to_string(), entry);
        }
        Ok(())
    }

    fn delete(&self, path: &StorePath) -> Result<()> {
        self.check_writable(path)?;
        let keys = self.subtree_keys(path);
        if keys.is_empty() {
            return Err(BinderyError::io(
                path.as_str(),
                std::io::Error::from(std::io::ErrorKind::NotFound),
            ));
        }
        let mut entries = self.entries.borrow_mut();
        for key in keys {
            entries.remove(&key);
        }
        Ok(())
    }

    fn create_dir(&self, path: &StorePath) -> Result<()> {
        self.check_writable(path)?;
        self.ensure_parents(path);
        self.entries
            .borrow_mut()
            .entry(path.as_str().to_string())
            .or_insert(Entry::Dir);
        Ok(())
    }

    fn exists(&self, path: &StorePath) -> bool {
        self.entries.borrow().contains_key(path.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn list_dir_is_one_level_deep() {
        let vfs = MemVfs::new();
        vfs.write_file(&StorePath::new("data/snips/.manifest.json"), "{}")
            .unwrap();
        vfs.write_file(&StorePath::new("data/snips/snip-1/f.txt"), "x")
            .unwrap();

        let mut entries = vfs.list_dir(&StorePath::new("data/snips")).unwrap();
        entries.sort();
        assert_eq!(
            entries,
            vec![
                (".manifest.json".to_string(), EntryKind::File),
                ("snip-1".to_string(), EntryKind::Dir),
            ]
        );
    }

    #[test]
    fn rename_rebases_the_subtree() {
        let vfs = MemVfs::new();
        vfs.write_file(&StorePath::new("data/snips/snip-1/f.txt"), "x")
            .unwrap();
        vfs.write_file(&StorePath::new("data/snips/snip-1/snip-2/g.txt"), "y")
            .unwrap();

        vfs.rename(
            &StorePath::new("data/snips/snip-1"),
            &StorePath::new("data/chapters/chapter-1/snips/snip-1"),
        )
        .unwrap();

        assert!(!vfs.exists(&StorePath::new("data/snips/snip-1")));
        assert_eq!(
            vfs.read_file(&StorePath::new(
                "data/chapters/chapter-1/snips/snip-1/snip-2/g.txt"
            ))
            .unwrap(),
            "y"
        );
    }

    #[test]
    fn copy_duplicates_the_subtree() {
        let vfs = MemVfs::new();
        vfs.write_file(&StorePath::new("data/snips/snip-1/f.txt"), "x")
            .unwrap();
        vfs.copy(
            &StorePath::new("data/snips/snip-1"),
            &StorePath::new("data/snips/snip-2"),
        )
        .unwrap();
        assert_eq!(
            vfs.read_file(&StorePath::new("data/snips/snip-1/f.txt")).unwrap(),
            "x"
        );
        assert_eq!(
            vfs.read_file(&StorePath::new("data/snips/snip-2/f.txt")).unwrap(),
            "x"
        );
    }

    #[test]
    fn simulated_write_failures_surface_as_io_errors() {
        let vfs = MemVfs::new();
        vfs.set_fail_writes(true);
        let err = vfs
            .write_file(&StorePath::new("data/x.txt"), "x")
            .unwrap_err();
        assert!(matches!(err, BinderyError::Io { .. }));
    }

    #[test]
    fn delete_removes_descendants() {
        let vfs = MemVfs::new();
        vfs.write_file(&StorePath::new("data/snips/snip-1/f.txt"), "x")
            .unwrap();
        vfs.delete(&StorePath::new("data/snips/snip-1")).unwrap();
        assert!(!vfs.exists(&StorePath::new("data/snips/snip-1/f.txt")));
        assert!(vfs.exists(&StorePath::new("data/snips")));
    }
}
