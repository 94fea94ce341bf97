//! Storage layer: the raw directory-listing/read/write/rename/delete
//! capability the core consumes.
//!
//! The [`Vfs`] trait handles the "how" of storage (real filesystem vs
//! memory); everything above it (manifests, the tree, the move engine)
//! works purely in store-relative [`StorePath`] terms and never touches
//! `std::fs` directly. This keeps the whole mutation engine testable against
//! [`memory::MemVfs`] without a disk, with [`fs::FsVfs`] as the production
//! implementation rooted at the book directory.
//!
//! Renames are the commit points of the mutation engine: a rename moves a
//! whole subtree in one step, so implementations must move directories
//! recursively.

use crate::error::Result;
use crate::path::StorePath;

pub mod fs;
pub mod memory;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum EntryKind {
    File,
    Dir,
}

pub trait Vfs {
    /// Immediate children of a directory as `(leaf name, kind)` pairs, in no
    /// particular order.
    fn list_dir(&self, path: &StorePath) -> Result<Vec<(String, EntryKind)>>;

    /// Read a file to a string. Missing files are an error; callers that can
    /// tolerate absence check [`Vfs::exists`] first.
    fn read_file(&self, path: &StorePath) -> Result<String>;

    /// Write (create or replace) a file, creating parent directories as
    /// needed.
    fn write_file(&self, path: &StorePath, contents: &str) -> Result<()>;

    /// Move a file or directory (with its whole subtree) to a new path.
    fn rename(&self, from: &StorePath, to: &StorePath) -> Result<()>;

    /// Copy a file or directory (with its whole subtree) to a new path,
    /// leaving the source untouched.
    fn copy(&self, from: &StorePath, to: &StorePath) -> Result<()>;

    /// Remove a file or directory, recursively.
    fn delete(&self, path: &StorePath) -> Result<()>;

    fn create_dir(&self, path: &StorePath) -> Result<()>;

    fn exists(&self, path: &StorePath) -> bool;
}
