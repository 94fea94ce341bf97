//! # Bindery Architecture
//!
//! Bindery is a **UI-agnostic manuscript-store library**. A book is a plain
//! directory tree of chapters, free-floating snips, and leaf text fragments,
//! with sibling order and display titles kept in small per-directory
//! manifest files rather than encoded in file names. The CLI in `main.rs`
//! is one possible client; the library never prints, never prompts a
//! terminal directly, and never exits.
//!
//! ## The Layers
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────┐
//! │  CLI (main.rs + args.rs)                                   │
//! │  - Parses arguments, renders the tree, owns the terminal   │
//! │  - Implements Prompter over stdin                          │
//! └────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌────────────────────────────────────────────────────────────┐
//! │  Mutation engine (engine/, recycle, create)                │
//! │  - move_node / move_many: destination resolution, reorder, │
//! │    container swaps, chapter→snip conversion                │
//! │  - soft delete / recover / purge through the recycle bin   │
//! └────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌────────────────────────────────────────────────────────────┐
//! │  Model (model, tree, manifest, ordering)                   │
//! │  - path-indexed arena of nodes, O(1) lookup                │
//! │  - pure ordering algebra over manifest entries             │
//! └────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌────────────────────────────────────────────────────────────┐
//! │  Storage (store/)                                          │
//! │  - Vfs trait: list/read/write/rename/delete                │
//! │  - FsVfs (production), MemVfs (testing)                    │
//! └────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Three Views, One Truth
//!
//! Every mutation must keep three things in step:
//!
//! 1. **The directory layout**: a chapter is a directory, a fragment is a
//!    text file; moving a node is a rename.
//! 2. **The manifests**: the authoritative record of titles and sibling
//!    order. After any completed mutation, each container's orderings are a
//!    dense `0..n-1`.
//! 3. **The arena**: an in-memory cache for fast lookup. It is always
//!    re-derivable from disk: [`tree::Tree::load`] is the universal
//!    recovery path.
//!
//! The engine favors failing before it mutates memory: manifests are read
//! and validated up front, the disk rename is the commit point, and the
//! arena is only touched afterwards.
//!
//! ## Batches
//!
//! Multi-select operations are strictly sequential. A [`engine::BatchContext`]
//! threads three pieces of state from mover to mover: the downward-move
//! offset for same-container compensation, the destination container a
//! previous mover caused to be created, and the remembered answer to the
//! one ambiguous drop (snip onto sibling snip). Per-mover failures are
//! reported in the batch summary instead of aborting the rest.
//!
//! ## Module Overview
//!
//! - [`engine`]: the move engine: validation, destination resolution,
//!   reorders, swaps, conversion, batches
//! - [`recycle`]: soft delete, the recycle log, recovery, purging
//! - [`create`]: store init and new chapter/snip/fragment operations
//! - [`tree`]: the path-indexed arena and the disk loader
//! - [`model`]: node kinds, identity records, the allowed-moves table
//! - [`manifest`]: the sidecar `.manifest.json` files
//! - [`ordering`]: pure ordering algebra (shift, reorder, internal moves)
//! - [`store`]: the `Vfs` storage abstraction
//! - [`path`]: store-relative node addressing
//! - [`prompt`]: the decision seam for destructive/ambiguous operations
//! - [`error`]: error types

pub mod create;
pub mod engine;
pub mod error;
pub mod manifest;
pub mod model;
pub mod ordering;
pub mod path;
pub mod prompt;
pub mod recycle;
pub mod store;
pub mod tree;
