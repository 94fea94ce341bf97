//! Cross-container moves: the mover leaves one container and joins another,
//! which means two manifests, one disk rename, and a subtree's worth of
//! rewritten paths.

use log::debug;

use crate::create::mint_name;
use crate::error::Result;
use crate::manifest::Manifest;
use crate::ordering::{latest_ordering, shift_trailing_down};
use crate::path::StorePath;
use crate::recycle;
use crate::store::Vfs;
use crate::tree::Tree;

use super::{MoveOp, MoveReport};

pub(crate) fn container_swap(
    vfs: &dyn Vfs,
    tree: &mut Tree,
    mover: &StorePath,
    dest: &StorePath,
    op: MoveOp,
) -> Result<MoveReport> {
    let (mover_kind, display, file_name, old_parent, relative_path, old_ordering) = {
        let node = tree.expect(mover)?;
        (
            node.ids.kind,
            node.ids.display.clone(),
            node.ids.file_name.clone(),
            node.ids.parent_path.clone(),
            node.ids.relative_path.clone(),
            node.ids.ordering,
        )
    };
    let dest_kind = tree.expect(dest)?.ids.kind;

    // 1. The destination manifest tells us where the tail is.
    let mut dest_manifest = Manifest::read(vfs, dest)?;
    let new_ordering = latest_ordering(&dest_manifest) + 1;

    // Recovered and copied nodes get a fresh name; moved nodes keep theirs
    // unless the destination already has an entry by that name.
    let new_name = match op {
        MoveOp::Recover | MoveOp::Duplicate => mint_name(mover_kind),
        MoveOp::Move => {
            let colliding =
                dest_manifest.contains(&file_name) || vfs.exists(&dest.join(&file_name));
            if colliding {
                mint_name(mover_kind)
            } else {
                file_name.clone()
            }
        }
    };
    let new_path = dest.join(&new_name);

    // 2. Take the mover out of its source records, unless this is a copy,
    // which leaves the source alone. A recycled root has no source manifest;
    // its record lives in the recycle log instead.
    let recycled_root = relative_path.is_empty();
    let src_manifest = if op == MoveOp::Duplicate {
        None
    } else if recycled_root {
        recycle::remove_log_entry(vfs, &file_name)?;
        None
    } else {
        let mut manifest = Manifest::read(vfs, &old_parent)?;
        manifest.remove(&file_name);
        shift_trailing_down(&mut manifest, old_ordering);
        Some(manifest)
    };

    // 3. The rename (or, for a paste, the copy) carries the whole subtree in
    // one step.
    match op {
        MoveOp::Duplicate => vfs.copy(mover, &new_path)?,
        _ => vfs.rename(mover, &new_path)?,
    }

    // 4. Now both manifests.
    dest_manifest.insert(new_name.clone(), display.clone(), new_ordering);
    dest_manifest.write(vfs, dest)?;
    if let Some(manifest) = &src_manifest {
        manifest.write(vfs, &old_parent)?;
    }

    // 5. Tree surgery. A copy adopts the new subtree from disk; a move
    // splices the existing nodes across and rekeys them.
    if op == MoveOp::Duplicate {
        tree.adopt_subtree(vfs, &new_path, dest, dest_kind, mover_kind, &display, new_ordering)?;
    } else {
        tree.splice_out(mover)?;
        if src_manifest.is_some() {
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

        // 6. Every descendant's absolute path changes with the subtree;
        // their relative structure does not.
        tree.rebase(mover, &new_path);
        let node = tree.expect_mut(&new_path)?;
        node.ids.parent_kind = dest_kind;
        node.ids.parent_path = dest.clone();
        node.ids.relative_path = dest.as_str().to_string();
        node.ids.ordering = new_ordering;
    }
    tree.expect_mut(dest)?
        .child_list_mut(mover_kind)
        .unwrap_or_else(|| {
            panic!("destination '{dest}' cannot hold a {mover_kind}; resolution is broken")
        })
        .push(new_path.clone());

    debug!("moved {mover} -> {new_path}");

    let mut affected = vec![dest.clone()];
    if op != MoveOp::Duplicate && tree.lookup(&old_parent).is_some() {
        affected.push(old_parent);
    }
    Ok(MoveReport {
        offset: 0,
        affected,
        created_destination: None,
    })
}
