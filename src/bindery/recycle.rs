//! The recycling store: deleting doesn't exist.
//!
//! Instead of deleting, a node's backing file or directory is renamed into
//! the recycling root under a collision-free name, and an append-only JSON
//! log records where it came from. Root-level recycled entries are tracked
//! by log records alone (they are not nested under another container), so
//! recovery is just the move engine's cross-container path pointed at a live
//! target, with the log entry standing in for a source manifest.
//!
//! The one optimization: an empty fragment still wearing its default title
//! has nothing worth keeping, and may be deleted outright rather than
//! cluttering the bin. When such fragments ride along with real content the
//! caller is asked once.

use chrono::Utc;
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::create::DEFAULT_FRAGMENT_TITLE;
use crate::engine::{self, BatchContext, MoveOp, MoveOutcome};
use crate::error::{BinderyError, Result};
use crate::manifest::Manifest;
use crate::model::{Body, ResourceKind};
use crate::ordering::shift_trailing_down;
use crate::path::{StorePath, RECYCLE_LOG_FILE};
use crate::prompt::Prompter;
use crate::store::Vfs;
use crate::tree::Tree;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecycleRecord {
    pub original_path: String,
    pub recycle_name: String,
    pub timestamp: i64,
    pub kind: ResourceKind,
    pub title: String,
}

fn log_path() -> StorePath {
    StorePath::recycling().join(RECYCLE_LOG_FILE)
}

/// Read the recycle log. A store that has never recycled anything has an
/// empty or absent log; a log that exists but does not parse is corruption
/// and is surfaced, not papered over.
pub fn read_log(vfs: &dyn Vfs) -> Result<Vec<RecycleRecord>> {
    let path = log_path();
    if !vfs.exists(&path) {
        return Ok(Vec::new());
    }
    let raw = vfs.read_file(&path)?;
    if raw.trim().is_empty() {
        return Ok(Vec::new());
    }
    serde_json::from_str(&raw).map_err(|source| BinderyError::RecycleLogCorrupt {
        path: path.as_str().to_string(),
        source,
    })
}

pub fn write_log(vfs: &dyn Vfs, log: &[RecycleRecord]) -> Result<()> {
    let raw = serde_json::to_string_pretty(log).expect("log serialization cannot fail");
    vfs.write_file(&log_path(), &raw)
}

pub(crate) fn remove_log_entry(vfs: &dyn Vfs, recycle_name: &str) -> Result<()> {
    let mut log = read_log(vfs)?;
    let before = log.len();
    log.retain(|record| record.recycle_name != recycle_name);
    if log.len() == before {
        return Err(BinderyError::Store(format!(
            "'{recycle_name}' is not in the recycle log"
        )));
    }
    write_log(vfs, &log)
}

#[derive(Debug, Default)]
pub struct DeleteSummary {
    pub recycled: usize,
    /// Empty default-titled fragments deleted outright, no log entry.
    pub discarded: usize,
    pub affected: Vec<StorePath>,
}

/// Soft-delete a selection: every unique root is renamed into the recycling
/// bin as a single unit with one log record. Containers are special-cased:
/// their children are recycled individually and the container itself stays.
pub fn soft_delete(
    vfs: &dyn Vfs,
    tree: &mut Tree,
    selection: &[StorePath],
    prompter: &dyn Prompter,
) -> Result<DeleteSummary> {
    let roots = tree.unique_roots(selection);
    let mut summary = DeleteSummary::default();

    // Throwaway fragments first, so they never reach the bin.
    let empties: Vec<StorePath> = roots
        .iter()
        .flat_map(|root| collect_empty_default_fragments(vfs, tree, root))
        .collect();
    if !empties.is_empty() && prompter.confirm_discard_empty_fragments(empties.len()) {
        for fragment in &empties {
            delete_live_outright(vfs, tree, fragment, &mut summary)?;
            summary.discarded += 1;
        }
    }

    for root in &roots {
        if tree.lookup(root).is_none() {
            continue; // discarded above
        }
        let kind = tree.expect(root)?.ids.kind;
        if kind == ResourceKind::Container {
            clear_container(vfs, tree, root, &mut summary)?;
        } else {
            recycle_node(vfs, tree, root, &mut summary)?;
        }
    }
    Ok(summary)
}

/// Rename one subtree into the bin and log it.
fn recycle_node(
    vfs: &dyn Vfs,
    tree: &mut Tree,
    path: &StorePath,
    summary: &mut DeleteSummary,
) -> Result<()> {
    let (kind, display, file_name, old_parent, old_ordering) = {
        let node = tree.expect(path)?;
        (
            node.ids.kind,
            node.ids.display.clone(),
            node.ids.file_name.clone(),
            node.ids.parent_path.clone(),
            node.ids.ordering,
        )
    };

    let timestamp = Utc::now().timestamp_millis();
    let recycle_name = format!("deleted-{kind}-{timestamp}-{}", Uuid::new_v4());
    let recycled_path = StorePath::recycling().join(&recycle_name);

    // Source manifest first, then the rename, then the log record.
    let mut manifest = Manifest::read(vfs, &old_parent)?;
    manifest.remove(&file_name);
    shift_trailing_down(&mut manifest, old_ordering);
    manifest.write(vfs, &old_parent)?;

    vfs.rename(path, &recycled_path)?;

    let mut log = read_log(vfs)?;
    log.push(RecycleRecord {
        original_path: path.as_str().to_string(),
        recycle_name: recycle_name.clone(),
        timestamp,
        kind,
        title: display,
    });
    write_log(vfs, &log)?;

    tree.splice_out(path)?;
    shift_sibling_orderings(tree, &old_parent, old_ordering);
    tree.remove_subtree(path);

    if !summary.affected.contains(&old_parent) {
        summary.affected.push(old_parent);
    }
    summary.recycled += 1;
    debug!("recycled {path} as {recycle_name}");
    Ok(())
}

/// Recycling a container clears it out without removing it: every child
/// gets its own bin entry, and the manifest is reset to just the container's
/// own title.
fn clear_container(
    vfs: &dyn Vfs,
    tree: &mut Tree,
    container: &StorePath,
    summary: &mut DeleteSummary,
) -> Result<()> {
    for child in tree.ordered_children(container) {
        recycle_node(vfs, tree, &child, summary)?;
    }

    let old_manifest = Manifest::read(vfs, container)?;
    let mut emptied = Manifest::new();
    if let Some(title) = old_manifest.self_title() {
        emptied.set_self_title(title);
    }
    emptied.write(vfs, container)?;

    if let Body::Container { contents } = &mut tree.expect_mut(container)?.body {
        contents.clear();
    }
    if !summary.affected.contains(container) {
        summary.affected.push(container.clone());
    }
    Ok(())
}

/// Fragments that were never titled and never written can be deleted
/// without a trace.
fn collect_empty_default_fragments(
    vfs: &dyn Vfs,
    tree: &Tree,
    root: &StorePath,
) -> Vec<StorePath> {
    let mut out = Vec::new();
    let mut stack = vec![root.clone()];
    while let Some(path) = stack.pop() {
        let Some(node) = tree.lookup(&path) else {
            continue;
        };
        match node.ids.kind {
            ResourceKind::Fragment => {
                if node.ids.display == DEFAULT_FRAGMENT_TITLE {
                    let blank = vfs
                        .read_file(&path)
                        .map(|content| content.trim().is_empty())
                        .unwrap_or(false);
                    if blank {
                        out.push(path);
                    }
                }
            }
            _ => stack.extend(node.children()),
        }
    }
    out
}

/// Permanently delete a live fragment: manifest shift, file gone, no log.
fn delete_live_outright(
    vfs: &dyn Vfs,
    tree: &mut Tree,
    path: &StorePath,
    summary: &mut DeleteSummary,
) -> Result<()> {
    let (file_name, old_parent, old_ordering) = {
        let node = tree.expect(path)?;
        (
            node.ids.file_name.clone(),
            node.ids.parent_path.clone(),
            node.ids.ordering,
        )
    };

    let mut manifest = Manifest::read(vfs, &old_parent)?;
    manifest.remove(&file_name);
    shift_trailing_down(&mut manifest, old_ordering);
    manifest.write(vfs, &old_parent)?;

    vfs.delete(path)?;

    tree.splice_out(path)?;
    shift_sibling_orderings(tree, &old_parent, old_ordering);
    tree.remove_subtree(path);

    if !summary.affected.contains(&old_parent) {
        summary.affected.push(old_parent.clone());
    }
    Ok(())
}

fn shift_sibling_orderings(tree: &mut Tree, parent: &StorePath, removed_ordering: i64) {
    let siblings = tree
        .lookup(parent)
        .map(|node| node.children())
        .unwrap_or_default();
    for sibling in siblings {
        if let Some(node) = tree.lookup_mut(&sibling) {
            if node.ids.ordering > removed_ordering {
                node.ids.ordering -= 1;
            }
        }
    }
}

/// Bring a recycled entry back into the live tree by re-running the move
/// engine with the bin entry as mover. The swap path removes the log entry
/// in place of a source-manifest shift.
pub fn recover(
    vfs: &dyn Vfs,
    tree: &mut Tree,
    recycle_name: &str,
    target: &StorePath,
    prompter: &dyn Prompter,
) -> Result<MoveOutcome> {
    let record = read_log(vfs)?
        .into_iter()
        .find(|record| record.recycle_name == recycle_name)
        .ok_or_else(|| {
            BinderyError::Store(format!("'{recycle_name}' is not in the recycle log"))
        })?;

    let mover = tree.load_recycled(vfs, &record.recycle_name, record.kind, &record.title)?;
    let mut batch = BatchContext::default();
    engine::move_node(vfs, tree, &mover, target, MoveOp::Recover, &mut batch, prompter)
}

/// Permanently delete recycled entries by their bin names: path gone, log
/// entry gone, arena entry gone. The parent is already gone, so there is no
/// manifest to shift.
pub fn purge(vfs: &dyn Vfs, tree: &mut Tree, recycle_names: &[String]) -> Result<usize> {
    let mut purged = 0;
    for name in recycle_names {
        let path = StorePath::recycling().join(name);
        if vfs.exists(&path) {
            vfs.delete(&path)?;
        } else {
            warn!("recycled entry '{name}' had no backing path");
        }
        remove_log_entry(vfs, name)?;
        tree.remove_subtree(&path);
        purged += 1;
    }
    Ok(purged)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::create::{init_store, new_chapter, new_fragment, new_snip, NewSnipOptions};
    use crate::prompt::ScriptedPrompter;
    use crate::store::memory::MemVfs;

    fn workspace() -> (MemVfs, Tree) {
        let vfs = MemVfs::new();
        init_store(&vfs).unwrap();
        let tree = Tree::load(&vfs).unwrap();
        (vfs, tree)
    }

    /// Shape fingerprint for isomorphism checks: kinds, titles, and child
    /// structure, ignoring the physical names.
    fn shape(tree: &Tree, path: &StorePath) -> String {
        let node = tree.lookup(path).unwrap();
        let children: Vec<String> = tree
            .ordered_children(path)
            .iter()
            .map(|child| shape(tree, child))
            .collect();
        format!("{}:'{}'[{}]", node.ids.kind, node.ids.display, children.join(","))
    }

    #[test]
    fn soft_deleted_fragment_is_logged_and_shifted_out() {
        let (vfs, mut tree) = workspace();
        let snip = new_snip(&vfs, &mut tree, None, NewSnipOptions::default()).unwrap();
        let first = tree.ordered_children(&snip)[0].clone();
        let second = new_fragment(&vfs, &mut tree, &snip, Some("Keeper")).unwrap();

        let prompter = ScriptedPrompter::new().keeping_empty_fragments();
        let summary = soft_delete(&vfs, &mut tree, &[first.clone()], &prompter).unwrap();
        assert_eq!(summary.recycled, 1);
        assert_eq!(summary.discarded, 0);

        let log = read_log(&vfs).unwrap();
        assert_eq!(log.len(), 1);
        assert_eq!(log[0].kind, ResourceKind::Fragment);
        assert_eq!(log[0].original_path, first.as_str());
        assert!(vfs.exists(&StorePath::recycling().join(&log[0].recycle_name)));

        // the survivor closed the gap
        assert!(tree.lookup(&first).is_none());
        assert_eq!(tree.lookup(&second).unwrap().ids.ordering, 0);
    }

    #[test]
    fn chapter_recycles_as_a_single_unit() {
        let (vfs, mut tree) = workspace();
        let chapter = new_chapter(&vfs, &mut tree, Some("Doomed")).unwrap();
        let kept_a = new_fragment(&vfs, &mut tree, &chapter, Some("Scene A")).unwrap();
        vfs.write_file(&kept_a, "words").unwrap();
        let kept_b = new_fragment(&vfs, &mut tree, &chapter, Some("Scene B")).unwrap();
        vfs.write_file(&kept_b, "more words").unwrap();
        // the starter fragment is empty and default-titled

        let prompter = ScriptedPrompter::new();
        let summary = soft_delete(&vfs, &mut tree, &[chapter.clone()], &prompter).unwrap();

        // the empty starter was discarded with no log entry; the chapter
        // itself produced exactly one record
        assert_eq!(summary.discarded, 1);
        assert_eq!(summary.recycled, 1);
        assert_eq!(prompter.discard_asks.get(), 1);

        let log = read_log(&vfs).unwrap();
        assert_eq!(log.len(), 1);
        assert_eq!(log[0].kind, ResourceKind::Chapter);
        assert_eq!(log[0].title, "Doomed");

        // both real scenes rode along inside the recycled directory
        let recycled = StorePath::recycling().join(&log[0].recycle_name);
        assert_eq!(vfs.read_file(&recycled.join(kept_a.file_name())).unwrap(), "words");
        assert!(tree.lookup(&chapter).is_none());
    }

    #[test]
    fn declining_the_discard_keeps_empty_fragments() {
        let (vfs, mut tree) = workspace();
        let chapter = new_chapter(&vfs, &mut tree, Some("Doomed")).unwrap();
        let starter = tree
            .ordered_children(&chapter)
            .first()
            .cloned()
            .unwrap();

        let prompter = ScriptedPrompter::new().keeping_empty_fragments();
        let summary = soft_delete(&vfs, &mut tree, &[chapter.clone()], &prompter).unwrap();
        assert_eq!(summary.discarded, 0);
        assert_eq!(summary.recycled, 1);

        let log = read_log(&vfs).unwrap();
        let recycled = StorePath::recycling().join(&log[0].recycle_name);
        assert!(vfs.exists(&recycled.join(starter.file_name())));
    }

    #[test]
    fn recover_restores_an_isomorphic_subtree() {
        let (vfs, mut tree) = workspace();
        let snip = new_snip(&vfs, &mut tree, None, NewSnipOptions { title: Some("Keep Me"), skip_fragment: true }).unwrap();
        let frag = new_fragment(&vfs, &mut tree, &snip, Some("Scene")).unwrap();
        vfs.write_file(&frag, "content").unwrap();
        new_snip(
            &vfs,
            &mut tree,
            Some(&snip),
            NewSnipOptions { title: Some("Inner"), skip_fragment: true },
        )
        .unwrap();

        let before = shape(&tree, &snip);

        let prompter = ScriptedPrompter::new();
        soft_delete(&vfs, &mut tree, &[snip.clone()], &prompter).unwrap();
        let record = read_log(&vfs).unwrap().remove(0);

        let outcome = recover(&vfs, &mut tree, &record.recycle_name, &StorePath::root(), &prompter).unwrap();
        let report = match outcome {
            MoveOutcome::Moved(report) => report,
            other => panic!("expected recovery, got {other:?}"),
        };
        assert!(report.affected.contains(&StorePath::snips()));

        // log entry consumed
        assert!(read_log(&vfs).unwrap().is_empty());

        // same shape at the new location; physical name may differ
        let recovered = tree
            .ordered_children(&StorePath::snips())
            .last()
            .cloned()
            .unwrap();
        assert_eq!(shape(&tree, &recovered), before);

        // descendants survive a reload too
        let reloaded = Tree::load(&vfs).unwrap();
        assert_eq!(shape(&reloaded, &recovered), before);
    }

    #[test]
    fn purge_drops_path_log_and_arena() {
        let (vfs, mut tree) = workspace();
        let snip = new_snip(&vfs, &mut tree, None, NewSnipOptions::default()).unwrap();

        let prompter = ScriptedPrompter::new().keeping_empty_fragments();
        soft_delete(&vfs, &mut tree, &[snip], &prompter).unwrap();
        let record = read_log(&vfs).unwrap().remove(0);

        let purged = purge(&vfs, &mut tree, &[record.recycle_name.clone()]).unwrap();
        assert_eq!(purged, 1);
        assert!(read_log(&vfs).unwrap().is_empty());
        assert!(!vfs.exists(&StorePath::recycling().join(&record.recycle_name)));
    }

    #[test]
    fn purging_an_unknown_name_is_an_error() {
        let (vfs, mut tree) = workspace();
        assert!(purge(&vfs, &mut tree, &["ghost".to_string()]).is_err());
    }

    #[test]
    fn clearing_a_container_keeps_the_container() {
        let (vfs, mut tree) = workspace();
        new_snip(&vfs, &mut tree, None, NewSnipOptions { title: Some("A"), skip_fragment: true }).unwrap();
        new_snip(&vfs, &mut tree, None, NewSnipOptions { title: Some("B"), skip_fragment: true }).unwrap();

        let prompter = ScriptedPrompter::new();
        let summary = soft_delete(&vfs, &mut tree, &[StorePath::snips()], &prompter).unwrap();
        assert_eq!(summary.recycled, 2);
        assert_eq!(read_log(&vfs).unwrap().len(), 2);

        let container = tree.lookup(&StorePath::snips()).unwrap();
        assert!(container.children().is_empty());
        let manifest = Manifest::read(&vfs, &StorePath::snips()).unwrap();
        assert_eq!(manifest.child_count(), 0);
        assert_eq!(manifest.self_title(), Some("Snips"));
    }
}
