//! The in-memory tree: a path-indexed arena over [`OutlineNode`]s.
//!
//! Nodes are stored in one map keyed by [`StorePath`], so `lookup` is a map
//! hit and parent access goes through `ids.parent_path`. The arena is a cache
//! of the on-disk state: the manifests stay authoritative, and a full
//! [`Tree::load`] from disk is always a valid recovery path. Mutations keep
//! the two in step by updating touched keys in place ([`Tree::rebase`],
//! [`Tree::splice_out`]) rather than rescanning.

use std::collections::HashMap;

use log::warn;

use crate::error::{BinderyError, Result};
use crate::manifest::Manifest;
use crate::model::{Body, Ids, OutlineNode, ResourceKind};
use crate::path::StorePath;
use crate::store::{EntryKind, Vfs};

/// Directory name of the per-chapter snip container.
pub const CHAPTER_SNIPS_DIR: &str = "snips";

#[derive(Debug, Default)]
pub struct Tree {
    nodes: HashMap<StorePath, OutlineNode>,
}

impl Tree {
    pub fn root_path(&self) -> StorePath {
        StorePath::root()
    }

    pub fn lookup(&self, path: &StorePath) -> Option<&OutlineNode> {
        self.nodes.get(path)
    }

    pub fn lookup_mut(&mut self, path: &StorePath) -> Option<&mut OutlineNode> {
        self.nodes.get_mut(path)
    }

    pub fn expect(&self, path: &StorePath) -> Result<&OutlineNode> {
        self.lookup(path)
            .ok_or_else(|| BinderyError::NodeNotFound(path.as_str().to_string()))
    }

    pub fn expect_mut(&mut self, path: &StorePath) -> Result<&mut OutlineNode> {
        self.nodes
            .get_mut(path)
            .ok_or_else(|| BinderyError::NodeNotFound(path.as_str().to_string()))
    }

    pub fn insert(&mut self, node: OutlineNode) {
        self.nodes.insert(node.ids.path.clone(), node);
    }

    /// Direct children of a node, sorted by their ordering field.
    pub fn ordered_children(&self, path: &StorePath) -> Vec<StorePath> {
        let Some(node) = self.lookup(path) else {
            return Vec::new();
        };
        let mut children = node.children();
        children.sort_by_key(|child| self.lookup(child).map(|n| n.ids.ordering).unwrap_or(i64::MAX));
        children
    }

    /// Remove a node's key from its parent's child list. The node itself
    /// stays in the arena; callers follow up with [`Tree::remove_subtree`] or
    /// [`Tree::rebase`] depending on where the node is headed.
    pub fn splice_out(&mut self, path: &StorePath) -> Result<()> {
        let (parent_path, kind) = {
            let node = self.expect(path)?;
            (node.ids.parent_path.clone(), node.ids.kind)
        };
        if let Some(parent) = self.lookup_mut(&parent_path) {
            if let Some(list) = parent.child_list_mut(kind) {
                list.retain(|child| child != path);
            }
        }
        Ok(())
    }

    /// Drop a node and all its descendants from the arena. Does not touch the
    /// parent's child list.
    pub fn remove_subtree(&mut self, path: &StorePath) {
        let doomed: Vec<StorePath> = self
            .nodes
            .keys()
            .filter(|key| *key == path || key.is_under(path))
            .cloned()
            .collect();
        for key in doomed {
            self.nodes.remove(&key);
        }
    }

    /// Rekey a whole subtree after its backing directory moved from `old` to
    /// `new`, rewriting every descendant's path, parent path, and relative
    /// path. The subtree root's parent-side fields (parent path/kind,
    /// display, ordering) are the caller's responsibility; they depend on
    /// the destination, not on the rename itself.
    pub fn rebase(&mut self, old: &StorePath, new: &StorePath) {
        if old == new {
            return;
        }
        let moving: Vec<StorePath> = self
            .nodes
            .keys()
            .filter(|key| *key == old || key.is_under(old))
            .cloned()
            .collect();

        let mut relocated = Vec::with_capacity(moving.len());
        for key in moving {
            let mut node = self.nodes.remove(&key).expect("key collected above");
            let new_key = key.rebase(old, new).expect("key is within the subtree");
            node.ids.path = new_key.clone();
            node.ids.file_name = new_key.file_name().to_string();
            if let Some(parent) = node.ids.parent_path.rebase(old, new) {
                node.ids.relative_path = parent.as_str().to_string();
                node.ids.parent_path = parent;
            }
            match &mut node.body {
                Body::Root { chapters, snips } => {
                    if let Some(p) = chapters.rebase(old, new) {
                        *chapters = p;
                    }
                    if let Some(p) = snips.rebase(old, new) {
                        *snips = p;
                    }
                }
                Body::Container { contents } | Body::Snip { contents } => {
                    for child in contents.iter_mut() {
                        if let Some(p) = child.rebase(old, new) {
                            *child = p;
                        }
                    }
                }
                Body::Chapter { fragments, snips } => {
                    for child in fragments.iter_mut() {
                        if let Some(p) = child.rebase(old, new) {
                            *child = p;
                        }
                    }
                    if let Some(p) = snips.rebase(old, new) {
                        *snips = p;
                    }
                }
                Body::Fragment => {}
            }
            relocated.push(node);
        }
        for node in relocated {
            self.insert(node);
        }
    }

    /// Filter a selection down to its topmost members: any node whose
    /// ancestor is also selected is dropped, so subtrees move as units.
    pub fn unique_roots(&self, selection: &[StorePath]) -> Vec<StorePath> {
        selection
            .iter()
            .filter(|candidate| {
                !selection
                    .iter()
                    .any(|other| candidate.is_under(other))
            })
            .cloned()
            .collect()
    }

    /// The snip container that hosts new snips for `start`: the nearest
    /// enclosing chapter's `snips` container, or the top-level snip container
    /// when the walk reaches the root.
    pub fn snip_container_for(&self, start: &StorePath) -> Result<StorePath> {
        let mut current = self.expect(start)?;
        loop {
            match (&current.ids.kind, &current.body) {
                (ResourceKind::Chapter, Body::Chapter { snips, .. }) => return Ok(snips.clone()),
                (ResourceKind::Root, _) => return Ok(StorePath::snips()),
                _ => current = self.expect(&current.ids.parent_path)?,
            }
        }
    }

    // --- Loading from disk ---

    /// Build the whole tree by scanning the store. The two top-level
    /// containers must exist; their manifests (and every container manifest
    /// below) are required reading.
    pub fn load(vfs: &dyn Vfs) -> Result<Tree> {
        let root_path = StorePath::root();
        let chapters_path = StorePath::chapters();
        let snips_path = StorePath::snips();

        for required in [&chapters_path, &snips_path] {
            if !vfs.exists(required) {
                return Err(BinderyError::Store(format!(
                    "'{required}' is missing; not a bindery store (run init?)"
                )));
            }
        }

        let mut tree = Tree::default();
        tree.insert(OutlineNode {
            ids: Ids {
                kind: ResourceKind::Root,
                display: "Book".to_string(),
                path: root_path.clone(),
                file_name: root_path.file_name().to_string(),
                relative_path: String::new(),
                parent_kind: ResourceKind::Root,
                parent_path: root_path.clone(),
                ordering: 0,
            },
            body: Body::Root {
                chapters: chapters_path.clone(),
                snips: snips_path.clone(),
            },
        });

        let chapters_manifest = Manifest::read(vfs, &chapters_path)?;
        let mut chapter_children = Vec::new();
        for (name, ordering, display) in ordered_dir_entries(vfs, &chapters_path, &chapters_manifest)? {
            let chapter_path = chapters_path.join(&name);
            tree.load_chapter(vfs, &chapter_path, &chapters_path, display, ordering)?;
            chapter_children.push(chapter_path);
        }
        tree.insert(container_node(
            chapters_path.clone(),
            chapters_manifest.self_title().unwrap_or("Chapters"),
            &root_path,
            ResourceKind::Root,
            chapter_children,
        ));

        let snips_manifest = Manifest::read(vfs, &snips_path)?;
        let mut snip_children = Vec::new();
        for (name, ordering, display) in ordered_dir_entries(vfs, &snips_path, &snips_manifest)? {
            let snip_path = snips_path.join(&name);
            tree.load_snip(vfs, &snip_path, &snips_path, ResourceKind::Container, display, ordering)?;
            snip_children.push(snip_path);
        }
        tree.insert(container_node(
            snips_path.clone(),
            snips_manifest.self_title().unwrap_or("Snips"),
            &root_path,
            ResourceKind::Root,
            snip_children,
        ));

        Ok(tree)
    }

    fn load_chapter(
        &mut self,
        vfs: &dyn Vfs,
        path: &StorePath,
        parent: &StorePath,
        display: String,
        ordering: i64,
    ) -> Result<()> {
        let manifest = Manifest::read(vfs, path)?;
        let mut fragments = Vec::new();
        for (name, frag_ordering, frag_display) in file_entries(vfs, path, &manifest)? {
            let frag_path = path.join(&name);
            self.insert(fragment_node(
                frag_path.clone(),
                frag_display,
                path,
                ResourceKind::Chapter,
                frag_ordering,
            ));
            fragments.push(frag_path);
        }

        let snips_path = path.join(CHAPTER_SNIPS_DIR);
        let snips_manifest = Manifest::read(vfs, &snips_path)?;
        let mut snips = Vec::new();
        for (name, snip_ordering, snip_display) in
            ordered_dir_entries(vfs, &snips_path, &snips_manifest)?
        {
            let snip_path = snips_path.join(&name);
            self.load_snip(
                vfs,
                &snip_path,
                &snips_path,
                ResourceKind::Container,
                snip_display,
                snip_ordering,
            )?;
            snips.push(snip_path);
        }
        self.insert(container_node(
            snips_path.clone(),
            snips_manifest.self_title().unwrap_or("Snips"),
            path,
            ResourceKind::Chapter,
            snips,
        ));

        self.insert(OutlineNode {
            ids: Ids {
                kind: ResourceKind::Chapter,
                display,
                path: path.clone(),
                file_name: path.file_name().to_string(),
                relative_path: parent.as_str().to_string(),
                parent_kind: ResourceKind::Container,
                parent_path: parent.clone(),
                ordering,
            },
            body: Body::Chapter {
                fragments,
                snips: snips_path,
            },
        });
        Ok(())
    }

    fn load_snip(
        &mut self,
        vfs: &dyn Vfs,
        path: &StorePath,
        parent: &StorePath,
        parent_kind: ResourceKind,
        display: String,
        ordering: i64,
    ) -> Result<()> {
        let manifest = Manifest::read(vfs, path)?;
        let mut contents = Vec::new();
        for (name, frag_ordering, frag_display) in file_entries(vfs, path, &manifest)? {
            let frag_path = path.join(&name);
            self.insert(fragment_node(
                frag_path.clone(),
                frag_display,
                path,
                ResourceKind::Snip,
                frag_ordering,
            ));
            contents.push(frag_path);
        }
        for (name, nested_ordering, nested_display) in ordered_dir_entries(vfs, path, &manifest)? {
            let nested_path = path.join(&name);
            self.load_snip(
                vfs,
                &nested_path,
                path,
                ResourceKind::Snip,
                nested_display,
                nested_ordering,
            )?;
            contents.push(nested_path);
        }
        contents.sort_by_key(|child| self.lookup(child).map(|n| n.ids.ordering).unwrap_or(i64::MAX));

        self.insert(OutlineNode {
            ids: Ids {
                kind: ResourceKind::Snip,
                display,
                path: path.clone(),
                file_name: path.file_name().to_string(),
                relative_path: parent.as_str().to_string(),
                parent_kind,
                parent_path: parent.clone(),
                ordering,
            },
            body: Body::Snip { contents },
        });
        Ok(())
    }

    /// Mirror a subtree that just appeared on disk (a pasted copy) into the
    /// arena. The caller owns the parent's child list.
    pub(crate) fn adopt_subtree(
        &mut self,
        vfs: &dyn Vfs,
        path: &StorePath,
        parent: &StorePath,
        parent_kind: ResourceKind,
        kind: ResourceKind,
        display: &str,
        ordering: i64,
    ) -> Result<()> {
        match kind {
            ResourceKind::Fragment => {
                self.insert(fragment_node(
                    path.clone(),
                    display.to_string(),
                    parent,
                    parent_kind,
                    ordering,
                ));
                Ok(())
            }
            ResourceKind::Snip => {
                self.load_snip(vfs, path, parent, parent_kind, display.to_string(), ordering)
            }
            ResourceKind::Chapter => {
                self.load_chapter(vfs, path, parent, display.to_string(), ordering)
            }
            other => Err(BinderyError::Store(format!(
                "cannot adopt a subtree rooted at a {other}"
            ))),
        }
    }

    /// Load one recycled subtree into the arena so the move engine can
    /// recover it. Recycled roots have no live parent: their relative path is
    /// empty, which is how the engine knows to edit the recycle log instead
    /// of a source manifest.
    pub fn load_recycled(
        &mut self,
        vfs: &dyn Vfs,
        recycle_name: &str,
        kind: ResourceKind,
        title: &str,
    ) -> Result<StorePath> {
        let recycling = StorePath::recycling();
        let path = recycling.join(recycle_name);
        if self.lookup(&path).is_some() {
            return Ok(path);
        }
        match kind {
            ResourceKind::Fragment => {
                let mut node = fragment_node(
                    path.clone(),
                    title.to_string(),
                    &recycling,
                    ResourceKind::Container,
                    0,
                );
                node.ids.relative_path = String::new();
                self.insert(node);
            }
            ResourceKind::Snip => {
                self.load_snip(vfs, &path, &recycling, ResourceKind::Container, title.to_string(), 0)?;
                self.expect_mut(&path)?.ids.relative_path = String::new();
            }
            ResourceKind::Chapter => {
                self.load_chapter(vfs, &path, &recycling, title.to_string(), 0)?;
                self.expect_mut(&path)?.ids.relative_path = String::new();
            }
            other => {
                return Err(BinderyError::Store(format!(
                    "recycled entry '{recycle_name}' has unexpected kind '{other}'"
                )))
            }
        }
        Ok(path)
    }
}

fn container_node(
    path: StorePath,
    display: &str,
    parent: &StorePath,
    parent_kind: ResourceKind,
    contents: Vec<StorePath>,
) -> OutlineNode {
    OutlineNode {
        ids: Ids {
            kind: ResourceKind::Container,
            display: display.to_string(),
            file_name: path.file_name().to_string(),
            relative_path: parent.as_str().to_string(),
            parent_kind,
            parent_path: parent.clone(),
            ordering: 0,
            path,
        },
        body: Body::Container { contents },
    }
}

fn fragment_node(
    path: StorePath,
    display: String,
    parent: &StorePath,
    parent_kind: ResourceKind,
    ordering: i64,
) -> OutlineNode {
    OutlineNode {
        ids: Ids {
            kind: ResourceKind::Fragment,
            display,
            file_name: path.file_name().to_string(),
            relative_path: parent.as_str().to_string(),
            parent_kind,
            parent_path: parent.clone(),
            ordering,
            path,
        },
        body: Body::Fragment,
    }
}

/// Directory entries of a container that represent child nodes, paired with
/// their manifest records and sorted by ordering. Entries on disk that the
/// manifest does not know get appended at the tail with a warning; the
/// store stays loadable, and the next manifest write makes them official.
fn ordered_dir_entries(
    vfs: &dyn Vfs,
    path: &StorePath,
    manifest: &Manifest,
) -> Result<Vec<(String, i64, String)>> {
    collect_entries(vfs, path, manifest, EntryKind::Dir)
}

fn file_entries(
    vfs: &dyn Vfs,
    path: &StorePath,
    manifest: &Manifest,
) -> Result<Vec<(String, i64, String)>> {
    collect_entries(vfs, path, manifest, EntryKind::File)
}

fn collect_entries(
    vfs: &dyn Vfs,
    path: &StorePath,
    manifest: &Manifest,
    wanted: EntryKind,
) -> Result<Vec<(String, i64, String)>> {
    let mut fallback = crate::ordering::latest_ordering(manifest) + 1;
    let mut out = Vec::new();
    for (name, kind) in vfs.list_dir(path)? {
        if kind != wanted || name.starts_with('.') || name == CHAPTER_SNIPS_DIR {
            continue;
        }
        match manifest.get(&name) {
            Some(info) => out.push((name, info.ordering, info.title.clone())),
            None => {
                warn!("'{path}/{name}' is on disk but not in the manifest; appending at the tail");
                out.push((name.clone(), fallback, name));
                fallback += 1;
            }
        }
    }
    out.sort_by_key(|(_, ordering, _)| *ordering);
    Ok(out)
}
