//! Chapter-to-snip conversion: the destructive edge of the move engine.
//!
//! Dropping a chapter anywhere snips live means the user wants it to *be* a
//! snip. There is no snip variant of a chapter to rename into, so the
//! conversion synthesizes one: a new snip named after the chapter receives
//! every fragment, a nested snip stands in for the chapter's snip container,
//! and the hollowed-out chapter directory is deleted. Irreversible, so it
//! must be confirmed first.
//!
//! Failure midway is best effort by design: each child move is itself
//! rename-last, so a failure aborts with the store loadable and the children
//! moved so far staying moved. The error names the path that failed.

use log::{debug, warn};

use crate::create::{self, NewSnipOptions};
use crate::error::Result;
use crate::manifest::Manifest;
use crate::model::Body;
use crate::ordering::shift_trailing_down;
use crate::path::StorePath;
use crate::prompt::Prompter;
use crate::recycle;
use crate::store::Vfs;
use crate::tree::Tree;

use super::{swap, MoveOp, MoveOutcome, MoveReport};

pub(crate) fn chapter_to_snip(
    vfs: &dyn Vfs,
    tree: &mut Tree,
    chapter: &StorePath,
    parent: &StorePath,
    op: MoveOp,
    prompter: &dyn Prompter,
) -> Result<MoveOutcome> {
    let (display, file_name, old_parent, relative_path, old_ordering, fragments, chapter_snips) = {
        let node = tree.expect(chapter)?;
        let (fragments, snips) = match &node.body {
            Body::Chapter { fragments, snips } => (fragments.clone(), snips.clone()),
            _ => unreachable!("chapter node without chapter body"),
        };
        (
            node.ids.display.clone(),
            node.ids.file_name.clone(),
            node.ids.parent_path.clone(),
            node.ids.relative_path.clone(),
            node.ids.ordering,
            fragments,
            snips,
        )
    };

    // The stand-in snip must live outside the chapter, or deleting the
    // chapter directory would take the converted content with it.
    if parent == chapter || parent.is_under(chapter) {
        return Ok(MoveOutcome::Disallowed);
    }

    if !prompter.confirm_chapter_conversion(&display) {
        debug!("conversion of '{display}' declined");
        return Ok(MoveOutcome::Cancelled);
    }

    let mut report = MoveReport::default();

    // The snip that will stand in for the chapter.
    let host = create::new_snip(
        vfs,
        tree,
        Some(parent),
        NewSnipOptions {
            title: Some(&display),
            skip_fragment: true,
        },
    )?;
    report.absorb(MoveReport::touching(host.parent().expect("snip has a parent")));

    // Every fragment moves across, one by one, through the ordinary swap
    // path; their manifest records travel with them.
    for fragment in fragments {
        report.absorb(swap::container_swap(vfs, tree, &fragment, &host, op)?);
    }

    // A nested snip stands in for the chapter's snip container.
    let snips_stand_in = create::new_snip(
        vfs,
        tree,
        Some(&host),
        NewSnipOptions {
            title: Some("Snips"),
            skip_fragment: true,
        },
    )?;
    let chapter_snip_children = tree.ordered_children(&chapter_snips);
    for snip in chapter_snip_children {
        report.absorb(swap::container_swap(vfs, tree, &snip, &snips_stand_in, op)?);
    }

    // Drop the emptied chapter from its source records, then from disk.
    if relative_path.is_empty() {
        recycle::remove_log_entry(vfs, &file_name)?;
    } else {
        let mut manifest = Manifest::read(vfs, &old_parent)?;
        manifest.remove(&file_name);
        shift_trailing_down(&mut manifest, old_ordering);
        manifest.write(vfs, &old_parent)?;

        let siblings = tree
            .lookup(&old_parent)
            .map(|parent| parent.children())
            .unwrap_or_default();
        for sibling in siblings {
            if let Some(node) = tree.lookup_mut(&sibling) {
                if node.ids.ordering > old_ordering {
                    node.ids.ordering -= 1;
                }
            }
        }
    }

    if let Err(err) = vfs.delete(chapter) {
        // The content is already out; a directory skeleton left behind is
        // recoverable garbage, not data loss.
        warn!("converted chapter directory could not be removed: {err}");
    }
    tree.splice_out(chapter)?;
    tree.remove_subtree(chapter);

    if tree.lookup(&old_parent).is_some() && !report.affected.contains(&old_parent) {
        report.affected.push(old_parent);
    }
    debug!("converted chapter '{display}' into snip at {host}");
    report.created_destination = None;
    Ok(MoveOutcome::Moved(report))
}
