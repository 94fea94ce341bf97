//! The move engine: every relocation of a node (drag-and-drop moves,
//! recoveries out of the recycle bin, the structural chapter-to-snip
//! conversion) funnels through [`move_node`].
//!
//! A move is a partially ordered sequence of manifest edits, one disk
//! rename, and in-memory tree surgery, and all three views must stay in
//! step. The sequence for a cross-container move: read the destination
//! manifest, shift the source manifest, rename on disk, write both
//! manifests, splice the node between the in-memory child lists, rebase
//! descendant paths. Same-container drops skip the rename entirely and only
//! permute orderings.
//!
//! Multi-select operations run through [`move_many`]: strictly sequential,
//! one mover at a time, with [`BatchContext`] threading the running offset,
//! the remembered snip-drop decision, and the override destination from
//! mover to mover. Nothing here sleeps or defers to a timer; callers refresh
//! whatever they display once, from the batch summary's affected set.

use log::debug;

use crate::error::Result;
use crate::model::{allowed_targets, ResourceKind};
use crate::path::StorePath;
use crate::prompt::{Prompter, SnipDropIntent};
use crate::store::Vfs;
use crate::tree::Tree;

mod convert;
mod destination;
mod reorder;
mod swap;

use destination::{resolve_destination, Resolved};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveOp {
    Move,
    Recover,
    /// Paste semantics: the source stays put and a copy (under a freshly
    /// minted name) lands in the destination.
    Duplicate,
}

/// What a completed move touched.
#[derive(Debug, Clone, Default)]
pub struct MoveReport {
    /// 1 when the mover travelled downward within its own container; later
    /// movers of the same batch compensate by this much.
    pub offset: i64,
    /// Containers whose children changed; the set a UI would refresh.
    pub affected: Vec<StorePath>,
    /// Set when resolving the destination created a snip on the fly; the
    /// batch reuses it for subsequent movers.
    pub created_destination: Option<StorePath>,
}

impl MoveReport {
    fn touching(container: StorePath) -> Self {
        MoveReport {
            offset: 0,
            affected: vec![container],
            created_destination: None,
        }
    }

    fn absorb(&mut self, other: MoveReport) {
        self.offset += other.offset;
        for path in other.affected {
            if !self.affected.contains(&path) {
                self.affected.push(path);
            }
        }
        if other.created_destination.is_some() {
            self.created_destination = other.created_destination;
        }
    }
}

/// Outcome of one mover. Validation rejections and user cancellations are
/// ordinary values the caller checks, not errors; only disk trouble is `Err`.
#[derive(Debug)]
pub enum MoveOutcome {
    Moved(MoveReport),
    Disallowed,
    Cancelled,
}

/// State threaded through every mover of one multi-select operation.
#[derive(Debug, Default)]
pub struct BatchContext {
    /// Accumulated downward-move compensation within a shared container.
    pub offset: i64,
    /// Destination container created mid-batch, reused by later movers.
    pub override_destination: Option<StorePath>,
    /// Remembered answer to the snip-onto-snip Insert/Reorder prompt; asked
    /// at most once per batch.
    pub snip_intent: Option<SnipDropIntent>,
}

/// Per-batch accounting, reported to the user instead of aborting the whole
/// batch on the first bad mover.
#[derive(Debug, Default)]
pub struct BatchSummary {
    pub succeeded: usize,
    pub failed: usize,
    pub skipped: usize,
    pub affected: Vec<StorePath>,
    pub errors: Vec<(StorePath, crate::error::BinderyError)>,
}

/// Move one node onto a drop target. The target is the node the user
/// dropped onto, not necessarily the container the mover ends up in; see
/// [`destination`] for the resolution rules.
pub fn move_node(
    vfs: &dyn Vfs,
    tree: &mut Tree,
    mover: &StorePath,
    target: &StorePath,
    op: MoveOp,
    batch: &mut BatchContext,
    prompter: &dyn Prompter,
) -> Result<MoveOutcome> {
    let (mover_kind, mover_parent) = {
        let node = tree.expect(mover)?;
        (node.ids.kind, node.ids.parent_path.clone())
    };
    let target_kind = tree.expect(target)?.ids.kind;

    if !allowed_targets(mover_kind).contains(&target_kind) {
        debug!("disallowed move: {mover_kind} onto {target_kind}");
        return Ok(MoveOutcome::Disallowed);
    }

    // Dropping a node onto itself goes nowhere: no reads, no writes.
    if mover == target {
        return Ok(MoveOutcome::Moved(MoveReport::default()));
    }

    // Cycle guard: a node cannot move into its own subtree.
    if target.is_under(mover) {
        debug!("rejected move of {mover} into its own descendant {target}");
        return Ok(MoveOutcome::Disallowed);
    }

    if mover_kind == ResourceKind::Container {
        return container_move(vfs, tree, mover, target, op, batch, prompter);
    }

    // There is no such thing as copying a chapter in place; the chapter
    // paths below all end in reorder or conversion.
    if op == MoveOp::Duplicate && mover_kind == ResourceKind::Chapter {
        return Ok(MoveOutcome::Disallowed);
    }

    let resolved = resolve_destination(vfs, tree, mover, target, batch, prompter)?;
    let (destination, created) = match resolved {
        Resolved::Into(path) => (path, None),
        Resolved::Created(path) => (path.clone(), Some(path)),
        Resolved::Convert { parent } => {
            return convert::chapter_to_snip(vfs, tree, mover, &parent, op, prompter)
        }
        Resolved::Disallowed => return Ok(MoveOutcome::Disallowed),
        Resolved::Cancelled => return Ok(MoveOutcome::Cancelled),
    };

    // Only a plain move within one container is a reorder; recoveries and
    // copies always enter the destination from outside.
    let mut report = if op == MoveOp::Move && destination == mover_parent {
        // Not actually moving anywhere, just changing the internal ordering.
        match reorder::same_container(vfs, tree, mover, &destination, target, batch.offset)? {
            Some(report) => report,
            None => return Ok(MoveOutcome::Moved(MoveReport::default())),
        }
    } else {
        swap::container_swap(vfs, tree, mover, &destination, op)?
    };

    if let Some(created) = created {
        report.created_destination = Some(created);
    }
    Ok(MoveOutcome::Moved(report))
}

/// A container mover never relocates itself; its children move one by one
/// into the literal target. Only snip containers may be moved this way.
fn container_move(
    vfs: &dyn Vfs,
    tree: &mut Tree,
    mover: &StorePath,
    target: &StorePath,
    op: MoveOp,
    batch: &mut BatchContext,
    prompter: &dyn Prompter,
) -> Result<MoveOutcome> {
    let children = tree.ordered_children(mover);
    let movable = children
        .iter()
        .all(|child| {
            tree.lookup(child)
                .map(|node| node.ids.kind == ResourceKind::Snip)
                .unwrap_or(false)
        });
    if children.is_empty() || !movable {
        return Ok(MoveOutcome::Disallowed);
    }

    let mut total = MoveReport::default();
    for child in children {
        match move_node(vfs, tree, &child, target, op, batch, prompter)? {
            MoveOutcome::Moved(report) => total.absorb(report),
            other => return Ok(other),
        }
    }
    total.created_destination = None;
    Ok(MoveOutcome::Moved(total))
}

/// Drive a whole multi-select drop: filter the selection down to unique
/// roots, skip movers already sitting in the literal target, then move the
/// rest in order. A disallowed or cancelled mover stops the remainder of the
/// batch; a disk failure is recorded and the batch keeps going.
pub fn move_many(
    vfs: &dyn Vfs,
    tree: &mut Tree,
    movers: &[StorePath],
    target: &StorePath,
    op: MoveOp,
    prompter: &dyn Prompter,
) -> Result<BatchSummary> {
    let mut batch = BatchContext::default();
    if op == MoveOp::Duplicate {
        // Pasting a snip onto a sibling snip is not ambiguous: a copy always
        // nests, so the prompt is pre-answered.
        batch.snip_intent = Some(SnipDropIntent::Insert);
    }
    let mut summary = BatchSummary::default();

    let roots = tree.unique_roots(movers);
    for (index, mover) in roots.iter().enumerate() {
        let already_there = tree
            .lookup(mover)
            .map(|node| node.ids.parent_path == *target)
            .unwrap_or(false);
        if already_there {
            summary.skipped += 1;
            continue;
        }

        match move_node(vfs, tree, mover, target, op, &mut batch, prompter) {
            Ok(MoveOutcome::Moved(report)) => {
                summary.succeeded += 1;
                batch.offset += report.offset;
                if batch.override_destination.is_none() {
                    batch.override_destination = report.created_destination.clone();
                }
                for path in report.affected {
                    if !summary.affected.contains(&path) {
                        summary.affected.push(path);
                    }
                }
            }
            Ok(MoveOutcome::Disallowed) | Ok(MoveOutcome::Cancelled) => {
                summary.skipped += roots.len() - index;
                break;
            }
            Err(err) => {
                summary.failed += 1;
                summary.errors.push((mover.clone(), err));
            }
        }
    }
    Ok(summary)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReorderDirection {
    Up,
    Down,
}

/// Move a sibling selection as a block immediately before/after the pivot.
/// Selection members from other containers are ignored; with no selection
/// the pivot itself moves one slot. Returns the containers to refresh.
pub fn reorder_selection(
    vfs: &dyn Vfs,
    tree: &mut Tree,
    pivot: &StorePath,
    selection: &[StorePath],
    direction: ReorderDirection,
) -> Result<Vec<StorePath>> {
    let (parent, pivot_name) = {
        let node = tree.expect(pivot)?;
        (node.ids.parent_path.clone(), node.ids.file_name.clone())
    };

    let mut names: Vec<String> = selection
        .iter()
        .filter_map(|path| tree.lookup(path))
        .filter(|node| node.ids.parent_path == parent)
        .map(|node| node.ids.file_name.clone())
        .collect();
    if names.is_empty() {
        names.push(pivot_name.clone());
    }

    let mut manifest = crate::manifest::Manifest::read(vfs, &parent)?;
    match direction {
        ReorderDirection::Up => crate::ordering::reorder_up(&mut manifest, &names, &pivot_name)?,
        ReorderDirection::Down => crate::ordering::reorder_down(&mut manifest, &names, &pivot_name)?,
    }
    manifest.write(vfs, &parent)?;
    reorder::sync_orderings(tree, &parent, &manifest);

    Ok(vec![parent])
}
