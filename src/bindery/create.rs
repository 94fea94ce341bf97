//! Creation operations: initializing a store and minting new chapters,
//! snips, and fragments.
//!
//! Nodes come into existence here (or during [`crate::tree::Tree::load`]) and
//! nowhere else. Every creation is the same three-step dance: mint a
//! collision-free file name, put the entry at the tail of the host manifest
//! (`latest_ordering + 1` keeps the sequence dense), and mirror the new node
//! into the arena.

use chrono::Utc;
use log::debug;
use uuid::Uuid;

use crate::error::{BinderyError, Result};
use crate::manifest::Manifest;
use crate::model::{Body, Ids, OutlineNode, ResourceKind};
use crate::ordering::latest_ordering;
use crate::path::{StorePath, RECYCLE_LOG_FILE};
use crate::store::Vfs;
use crate::tree::{Tree, CHAPTER_SNIPS_DIR};

pub const DEFAULT_CHAPTER_TITLE: &str = "New Chapter";
pub const DEFAULT_SNIP_TITLE: &str = "New Snip";
pub const DEFAULT_FRAGMENT_TITLE: &str = "New Fragment";
/// Title given to snips the engine creates on the fly as drop destinations.
pub const CREATED_SNIP_TITLE: &str = "Created Snip";

/// Mint a unique leaf name for a node of the given kind. Timestamp plus
/// uuid keeps names collision-free across recycling round-trips.
pub fn mint_name(kind: ResourceKind) -> String {
    let stamp = Utc::now().timestamp_millis();
    let id = Uuid::new_v4();
    match kind {
        ResourceKind::Fragment => format!("fragment-{stamp}-{id}.txt"),
        other => format!("{}-{stamp}-{id}", other.prefix()),
    }
}

/// Lay down the fixed store skeleton: the two top-level containers with
/// empty manifests, and the recycling root with an empty log.
pub fn init_store(vfs: &dyn Vfs) -> Result<()> {
    if vfs.exists(&StorePath::chapters()) || vfs.exists(&StorePath::snips()) {
        return Err(BinderyError::Store(
            "store already initialized here".to_string(),
        ));
    }

    let mut chapters = Manifest::new();
    chapters.set_self_title("Chapters");
    chapters.write(vfs, &StorePath::chapters())?;

    let mut snips = Manifest::new();
    snips.set_self_title("Snips");
    snips.write(vfs, &StorePath::snips())?;

    vfs.create_dir(&StorePath::recycling())?;
    vfs.write_file(&StorePath::recycling().join(RECYCLE_LOG_FILE), "[]")?;
    Ok(())
}

/// Create a chapter at the tail of the chapters container: a directory with
/// its own manifest, a starter fragment, and an empty nested snip container.
pub fn new_chapter(vfs: &dyn Vfs, tree: &mut Tree, title: Option<&str>) -> Result<StorePath> {
    let title = title.unwrap_or(DEFAULT_CHAPTER_TITLE);
    let chapters = StorePath::chapters();

    let mut container_manifest = Manifest::read(vfs, &chapters)?;
    let ordering = latest_ordering(&container_manifest) + 1;
    let name = mint_name(ResourceKind::Chapter);
    let path = chapters.join(&name);

    container_manifest.insert(name.clone(), title, ordering);

    let mut chapter_manifest = Manifest::new();
    chapter_manifest.set_self_title(title);
    chapter_manifest.write(vfs, &path)?;

    let snips_path = path.join(CHAPTER_SNIPS_DIR);
    let mut snips_manifest = Manifest::new();
    snips_manifest.set_self_title("Snips");
    snips_manifest.write(vfs, &snips_path)?;

    container_manifest.write(vfs, &chapters)?;

    tree.insert(OutlineNode {
        ids: Ids {
            kind: ResourceKind::Chapter,
            display: title.to_string(),
            path: path.clone(),
            file_name: name,
            relative_path: chapters.as_str().to_string(),
            parent_kind: ResourceKind::Container,
            parent_path: chapters.clone(),
            ordering,
        },
        body: Body::Chapter {
            fragments: Vec::new(),
            snips: snips_path.clone(),
        },
    });
    tree.insert(OutlineNode {
        ids: Ids {
            kind: ResourceKind::Container,
            display: "Snips".to_string(),
            path: snips_path.clone(),
            file_name: CHAPTER_SNIPS_DIR.to_string(),
            relative_path: path.as_str().to_string(),
            parent_kind: ResourceKind::Chapter,
            parent_path: path.clone(),
            ordering: 0,
        },
        body: Body::Container {
            contents: Vec::new(),
        },
    });
    if let Some(list) = tree
        .expect_mut(&chapters)?
        .child_list_mut(ResourceKind::Chapter)
    {
        list.push(path.clone());
    }

    new_fragment(vfs, tree, &path, None)?;

    debug!("created chapter '{title}' at {path}");
    Ok(path)
}

#[derive(Debug, Clone, Default)]
pub struct NewSnipOptions<'a> {
    pub title: Option<&'a str>,
    /// Skip the starter fragment; used for engine-created destinations and
    /// chapter conversion, where content arrives by move.
    pub skip_fragment: bool,
}

/// Create a snip inside the container that hosts snips for `at`:
/// a snip nests inside it, a chapter or fragment resolves to the enclosing
/// snip container, `None` lands in the top-level one.
pub fn new_snip(
    vfs: &dyn Vfs,
    tree: &mut Tree,
    at: Option<&StorePath>,
    options: NewSnipOptions<'_>,
) -> Result<StorePath> {
    let host = match at {
        None => StorePath::snips(),
        Some(path) => {
            let node = tree.expect(path)?;
            match node.ids.kind {
                ResourceKind::Snip => path.clone(),
                ResourceKind::Chapter => match &node.body {
                    Body::Chapter { snips, .. } => snips.clone(),
                    _ => unreachable!("chapter node without chapter body"),
                },
                ResourceKind::Fragment | ResourceKind::Root => tree.snip_container_for(path)?,
                ResourceKind::Container => {
                    if *path == StorePath::chapters() {
                        return Err(BinderyError::Store(
                            "snips cannot be created in the chapters container".to_string(),
                        ));
                    }
                    path.clone()
                }
            }
        }
    };
    let host_kind = tree.expect(&host)?.ids.kind;

    let title = options.title.unwrap_or(DEFAULT_SNIP_TITLE);
    let mut host_manifest = Manifest::read(vfs, &host)?;
    let ordering = latest_ordering(&host_manifest) + 1;
    let name = mint_name(ResourceKind::Snip);
    let path = host.join(&name);

    host_manifest.insert(name.clone(), title, ordering);

    let mut snip_manifest = Manifest::new();
    snip_manifest.set_self_title(title);
    snip_manifest.write(vfs, &path)?;

    host_manifest.write(vfs, &host)?;

    tree.insert(OutlineNode {
        ids: Ids {
            kind: ResourceKind::Snip,
            display: title.to_string(),
            path: path.clone(),
            file_name: name,
            relative_path: host.as_str().to_string(),
            parent_kind: host_kind,
            parent_path: host.clone(),
            ordering,
        },
        body: Body::Snip {
            contents: Vec::new(),
        },
    });
    if let Some(list) = tree.expect_mut(&host)?.child_list_mut(ResourceKind::Snip) {
        list.push(path.clone());
    }

    if !options.skip_fragment {
        new_fragment(vfs, tree, &path, None)?;
    }

    debug!("created snip '{title}' at {path}");
    Ok(path)
}

/// Create an empty fragment file at the tail of a chapter or snip.
pub fn new_fragment(
    vfs: &dyn Vfs,
    tree: &mut Tree,
    at: &StorePath,
    title: Option<&str>,
) -> Result<StorePath> {
    let host_kind = tree.expect(at)?.ids.kind;
    if !matches!(host_kind, ResourceKind::Chapter | ResourceKind::Snip) {
        return Err(BinderyError::Store(format!(
            "fragments live in chapters or snips, not in a {host_kind}"
        )));
    }

    let title = title.unwrap_or(DEFAULT_FRAGMENT_TITLE);
    let mut host_manifest = Manifest::read(vfs, at)?;
    let ordering = latest_ordering(&host_manifest) + 1;
    let name = mint_name(ResourceKind::Fragment);
    let path = at.join(&name);

    vfs.write_file(&path, "")?;
    host_manifest.insert(name.clone(), title, ordering);
    host_manifest.write(vfs, at)?;

    tree.insert(OutlineNode {
        ids: Ids {
            kind: ResourceKind::Fragment,
            display: title.to_string(),
            path: path.clone(),
            file_name: name,
            relative_path: at.as_str().to_string(),
            parent_kind: host_kind,
            parent_path: at.clone(),
            ordering,
        },
        body: Body::Fragment,
    });
    if let Some(list) = tree.expect_mut(at)?.child_list_mut(ResourceKind::Fragment) {
        list.push(path.clone());
    }

    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::memory::MemVfs;

    pub fn fresh_workspace() -> (MemVfs, Tree) {
        let vfs = MemVfs::new();
        init_store(&vfs).unwrap();
        let tree = Tree::load(&vfs).unwrap();
        (vfs, tree)
    }

    #[test]
    fn init_refuses_to_run_twice() {
        let vfs = MemVfs::new();
        init_store(&vfs).unwrap();
        assert!(init_store(&vfs).is_err());
    }

    #[test]
    fn new_chapter_is_loadable_and_complete() {
        let (vfs, mut tree) = fresh_workspace();
        let path = new_chapter(&vfs, &mut tree, Some("Chapter One")).unwrap();

        // survives a full reload from disk
        let reloaded = Tree::load(&vfs).unwrap();
        let chapter = reloaded.lookup(&path).unwrap();
        assert_eq!(chapter.ids.display, "Chapter One");
        assert_eq!(chapter.ids.ordering, 0);
        match &chapter.body {
            Body::Chapter { fragments, snips } => {
                assert_eq!(fragments.len(), 1);
                assert!(reloaded.lookup(snips).is_some());
            }
            other => panic!("expected chapter body, got {other:?}"),
        }
    }

    #[test]
    fn chapters_append_with_dense_orderings() {
        let (vfs, mut tree) = fresh_workspace();
        let first = new_chapter(&vfs, &mut tree, Some("One")).unwrap();
        let second = new_chapter(&vfs, &mut tree, Some("Two")).unwrap();

        assert_eq!(tree.lookup(&first).unwrap().ids.ordering, 0);
        assert_eq!(tree.lookup(&second).unwrap().ids.ordering, 1);

        let manifest = Manifest::read(&vfs, &StorePath::chapters()).unwrap();
        assert_eq!(manifest.child_count(), 2);
        assert_eq!(latest_ordering(&manifest), 1);
    }

    #[test]
    fn new_snip_resolves_its_host() {
        let (vfs, mut tree) = fresh_workspace();
        let chapter = new_chapter(&vfs, &mut tree, Some("One")).unwrap();

        // at a chapter: lands in the chapter's snip container
        let snip = new_snip(&vfs, &mut tree, Some(&chapter), NewSnipOptions::default()).unwrap();
        assert_eq!(
            tree.lookup(&snip).unwrap().ids.parent_path,
            chapter.join(CHAPTER_SNIPS_DIR)
        );

        // at a snip: nests inside it
        let nested = new_snip(
            &vfs,
            &mut tree,
            Some(&snip),
            NewSnipOptions {
                title: Some("Inner"),
                skip_fragment: true,
            },
        )
        .unwrap();
        assert_eq!(tree.lookup(&nested).unwrap().ids.parent_path, snip);
        assert_eq!(tree.lookup(&nested).unwrap().ids.parent_kind, ResourceKind::Snip);

        // with no anchor: lands in the top-level container
        let loose = new_snip(&vfs, &mut tree, None, NewSnipOptions::default()).unwrap();
        assert_eq!(tree.lookup(&loose).unwrap().ids.parent_path, StorePath::snips());
    }

    #[test]
    fn snips_cannot_be_created_among_chapters() {
        let (vfs, mut tree) = fresh_workspace();
        let err = new_snip(
            &vfs,
            &mut tree,
            Some(&StorePath::chapters()),
            NewSnipOptions::default(),
        )
        .unwrap_err();
        assert!(err.to_string().contains("chapters container"));
    }

    #[test]
    fn fragments_only_join_chapters_and_snips() {
        let (vfs, mut tree) = fresh_workspace();
        let chapter = new_chapter(&vfs, &mut tree, None).unwrap();

        let frag = new_fragment(&vfs, &mut tree, &chapter, Some("Scene")).unwrap();
        assert_eq!(tree.lookup(&frag).unwrap().ids.ordering, 1); // after the starter
        assert_eq!(vfs.read_file(&frag).unwrap(), "");

        assert!(new_fragment(&vfs, &mut tree, &StorePath::snips(), None).is_err());
    }
}
