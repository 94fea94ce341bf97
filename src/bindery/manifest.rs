//! The per-directory sidecar manifest: the authoritative record of child
//! titles and sibling ordering.
//!
//! Every container directory holds a `.manifest.json` mapping child file or
//! directory name to `{"title", "ordering"}`. The reserved key `self` may
//! describe the container's own title without being a child; it is excluded
//! from every ordering computation and written back with ordering −1.
//!
//! The manifest is the sole source of truth for titles and order, so a
//! missing or corrupt file is a hard failure surfaced to the caller, never
//! silently replaced with an empty map. Writes replace the whole map.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{BinderyError, Result};
use crate::path::StorePath;
use crate::store::Vfs;

pub const SELF_KEY: &str = "self";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryInfo {
    pub title: String,
    pub ordering: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Manifest {
    entries: BTreeMap<String, EntryInfo>,
}

impl Manifest {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read the manifest governing `container`'s children.
    pub fn read(vfs: &dyn Vfs, container: &StorePath) -> Result<Manifest> {
        let manifest_path = container.manifest();
        let raw = vfs
            .read_file(&manifest_path)
            .map_err(|_| BinderyError::ManifestMissing(manifest_path.as_str().to_string()))?;
        serde_json::from_str(&raw).map_err(|source| BinderyError::ManifestCorrupt {
            path: manifest_path.as_str().to_string(),
            source,
        })
    }

    /// Write the whole map back. Last writer wins; there is no merging.
    pub fn write(&self, vfs: &dyn Vfs, container: &StorePath) -> Result<()> {
        let raw = serde_json::to_string_pretty(self).expect("manifest serialization cannot fail");
        vfs.write_file(&container.manifest(), &raw)
    }

    pub fn get(&self, name: &str) -> Option<&EntryInfo> {
        self.entries.get(name)
    }

    pub fn insert(&mut self, name: impl Into<String>, title: impl Into<String>, ordering: i64) {
        self.entries.insert(
            name.into(),
            EntryInfo {
                title: title.into(),
                ordering,
            },
        );
    }

    pub fn remove(&mut self, name: &str) -> Option<EntryInfo> {
        self.entries.remove(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Child entries, excluding the reserved `self` record.
    pub fn children(&self) -> impl Iterator<Item = (&str, &EntryInfo)> {
        self.entries
            .iter()
            .filter(|(name, _)| name.as_str() != SELF_KEY)
            .map(|(name, info)| (name.as_str(), info))
    }

    pub fn children_mut(&mut self) -> impl Iterator<Item = (&str, &mut EntryInfo)> {
        self.entries
            .iter_mut()
            .filter(|(name, _)| name.as_str() != SELF_KEY)
            .map(|(name, info)| (name.as_str(), info))
    }

    pub fn child_count(&self) -> usize {
        self.children().count()
    }

    pub fn self_title(&self) -> Option<&str> {
        self.entries.get(SELF_KEY).map(|info| info.title.as_str())
    }

    pub fn set_self_title(&mut self, title: impl Into<String>) {
        self.entries.insert(
            SELF_KEY.to_string(),
            EntryInfo {
                title: title.into(),
                ordering: -1,
            },
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::memory::MemVfs;

    fn container() -> StorePath {
        StorePath::new("data/snips")
    }

    #[test]
    fn roundtrip_preserves_self_entry() {
        let vfs = MemVfs::new();
        vfs.create_dir(&container()).unwrap();

        let mut manifest = Manifest::new();
        manifest.set_self_title("Work Snips");
        manifest.insert("snip-1", "First", 0);
        manifest.insert("snip-2", "Second", 1);
        manifest.write(&vfs, &container()).unwrap();

        let loaded = Manifest::read(&vfs, &container()).unwrap();
        assert_eq!(loaded.self_title(), Some("Work Snips"));
        assert_eq!(loaded.child_count(), 2);
        assert_eq!(loaded.get("snip-2").unwrap().ordering, 1);
    }

    #[test]
    fn missing_manifest_is_a_hard_error() {
        let vfs = MemVfs::new();
        let err = Manifest::read(&vfs, &container()).unwrap_err();
        match err {
            BinderyError::ManifestMissing(path) => {
                assert_eq!(path, "data/snips/.manifest.json")
            }
            other => panic!("expected ManifestMissing, got {other:?}"),
        }
    }

    #[test]
    fn corrupt_manifest_names_the_path() {
        let vfs = MemVfs::new();
        vfs.create_dir(&container()).unwrap();
        vfs.write_file(&container().manifest(), "{not json").unwrap();

        let err = Manifest::read(&vfs, &container()).unwrap_err();
        match err {
            BinderyError::ManifestCorrupt { path, .. } => {
                assert_eq!(path, "data/snips/.manifest.json")
            }
            other => panic!("expected ManifestCorrupt, got {other:?}"),
        }
    }

    #[test]
    fn children_skip_the_self_key() {
        let mut manifest = Manifest::new();
        manifest.set_self_title("Chapters");
        manifest.insert("chapter-1", "One", 0);
        let names: Vec<&str> = manifest.children().map(|(name, _)| name).collect();
        assert_eq!(names, vec!["chapter-1"]);
    }
}
