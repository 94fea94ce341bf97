//! Destination resolution: mapping the literal drop target to the container
//! the mover actually lands in.
//!
//! The drop target is whatever tree row the user released on, which is
//! rarely the container itself: a snip dropped on a chapter belongs in that
//! chapter's snip container, a fragment dropped on a fragment belongs next
//! to it, and a fragment dropped on a bare snip container gets a snip
//! created for it on the spot. Chapters are special: dropped anywhere but
//! the chapters container (or another chapter) they stop being chapters at
//! all and convert into snips.

use crate::create::{self, NewSnipOptions, CREATED_SNIP_TITLE};
use crate::error::Result;
use crate::model::{Body, ResourceKind};
use crate::path::StorePath;
use crate::prompt::{Prompter, SnipDropIntent};
use crate::store::Vfs;
use crate::tree::Tree;
use crate::engine::BatchContext;

#[derive(Debug)]
pub(crate) enum Resolved {
    /// Move into this existing container.
    Into(StorePath),
    /// A snip was created to receive the mover; remember it for the batch.
    Created(StorePath),
    /// Chapter-to-snip conversion, hosted under `parent`.
    Convert { parent: StorePath },
    Disallowed,
    Cancelled,
}

pub(crate) fn resolve_destination(
    vfs: &dyn Vfs,
    tree: &mut Tree,
    mover: &StorePath,
    target: &StorePath,
    batch: &mut BatchContext,
    prompter: &dyn Prompter,
) -> Result<Resolved> {
    let mover_kind = tree.expect(mover)?.ids.kind;
    match mover_kind {
        ResourceKind::Snip => resolve_for_snip(tree, mover, target, batch, prompter),
        ResourceKind::Fragment => resolve_for_fragment(vfs, tree, target, batch),
        ResourceKind::Chapter => resolve_for_chapter(tree, target),
        // Containers recurse child-by-child and the root never moves; neither
        // reaches destination resolution.
        ResourceKind::Container | ResourceKind::Root => Ok(Resolved::Disallowed),
    }
}

fn resolve_for_snip(
    tree: &Tree,
    mover: &StorePath,
    target: &StorePath,
    batch: &mut BatchContext,
    prompter: &dyn Prompter,
) -> Result<Resolved> {
    let mover_parent = tree.expect(mover)?.ids.parent_path.clone();
    let target_node = tree.expect(target)?;

    match target_node.ids.kind {
        ResourceKind::Root => Ok(Resolved::Into(StorePath::snips())),
        ResourceKind::Chapter => match &target_node.body {
            Body::Chapter { snips, .. } => Ok(Resolved::Into(snips.clone())),
            _ => unreachable!("chapter node without chapter body"),
        },
        ResourceKind::Snip if target_node.ids.parent_path == mover_parent => {
            // Dropping a snip on a sibling snip is ambiguous: nest inside it,
            // or just reorder? Ask once, then reuse the answer for the rest
            // of the batch.
            let intent = match batch.snip_intent {
                Some(intent) => intent,
                None => {
                    let mover_title = tree.expect(mover)?.ids.display.clone();
                    let intent = prompter.snip_drop_intent(&mover_title, &target_node.ids.display);
                    batch.snip_intent = Some(intent);
                    intent
                }
            };
            match intent {
                SnipDropIntent::Insert => Ok(Resolved::Into(target.clone())),
                SnipDropIntent::Reorder => Ok(Resolved::Into(mover_parent)),
                SnipDropIntent::Cancel => Ok(Resolved::Cancelled),
            }
        }
        ResourceKind::Snip | ResourceKind::Container | ResourceKind::Fragment => {
            // Walk upward to the nearest enclosing chapter or the root and
            // use its snip container.
            Ok(Resolved::Into(tree.snip_container_for(target)?))
        }
    }
}

fn resolve_for_fragment(
    vfs: &dyn Vfs,
    tree: &mut Tree,
    target: &StorePath,
    batch: &mut BatchContext,
) -> Result<Resolved> {
    let (target_kind, target_parent_kind, target_parent) = {
        let node = tree.expect(target)?;
        (
            node.ids.kind,
            node.ids.parent_kind,
            node.ids.parent_path.clone(),
        )
    };

    match target_kind {
        ResourceKind::Chapter | ResourceKind::Snip => Ok(Resolved::Into(target.clone())),
        // The fragment's company is wanted: land next to it.
        ResourceKind::Fragment => Ok(Resolved::Into(target_parent)),
        ResourceKind::Container => {
            if let Some(dest) = &batch.override_destination {
                return Ok(Resolved::Into(dest.clone()));
            }
            // Fragments cannot sit directly in a snip container; for the
            // per-chapter containers and the top-level one, mint a snip to
            // hold them. The chapters container takes no fragments at all.
            if target_parent_kind == ResourceKind::Chapter || *target == StorePath::snips() {
                let snip = create::new_snip(
                    vfs,
                    tree,
                    Some(target),
                    NewSnipOptions {
                        title: Some(CREATED_SNIP_TITLE),
                        skip_fragment: true,
                    },
                )?;
                Ok(Resolved::Created(snip))
            } else {
                Ok(Resolved::Disallowed)
            }
        }
        ResourceKind::Root => Ok(Resolved::Disallowed),
    }
}

fn resolve_for_chapter(tree: &Tree, target: &StorePath) -> Result<Resolved> {
    let target_node = tree.expect(target)?;
    match target_node.ids.kind {
        // Chapters reorder among themselves.
        ResourceKind::Chapter => Ok(Resolved::Into(StorePath::chapters())),
        ResourceKind::Container => {
            if *target == StorePath::chapters() {
                Ok(Resolved::Into(StorePath::chapters()))
            } else {
                // Any snip container: the chapter converts into a snip there.
                Ok(Resolved::Convert {
                    parent: target.clone(),
                })
            }
        }
        ResourceKind::Snip => Ok(Resolved::Convert {
            parent: target.clone(),
        }),
        ResourceKind::Fragment => {
            // Convert into the dropped-on fragment's neighborhood: the
            // enclosing snip, or the enclosing chapter's snip container.
            let parent = tree.expect(&target_node.ids.parent_path)?;
            match (&parent.ids.kind, &parent.body) {
                (ResourceKind::Snip, _) => Ok(Resolved::Convert {
                    parent: parent.ids.path.clone(),
                }),
                (ResourceKind::Chapter, Body::Chapter { snips, .. }) => Ok(Resolved::Convert {
                    parent: snips.clone(),
                }),
                _ => Ok(Resolved::Disallowed),
            }
        }
        ResourceKind::Root => Ok(Resolved::Disallowed),
    }
}
