//! Same-container reordering: the drop landed in the container the mover
//! already lives in, so nothing moves on disk. The container's manifest is
//! permuted and the in-memory orderings are synced to match.

use crate::error::Result;
use crate::manifest::Manifest;
use crate::ordering;
use crate::path::StorePath;
use crate::store::Vfs;
use crate::tree::Tree;

use super::MoveReport;

/// Permute the mover into the drop target's slot. Returns `None` when the
/// drop target is not a sibling entry (dropping a snip back onto its own
/// chapter, say), which makes the whole move a no-op.
pub(crate) fn same_container(
    vfs: &dyn Vfs,
    tree: &mut Tree,
    mover: &StorePath,
    container: &StorePath,
    target: &StorePath,
    batch_offset: i64,
) -> Result<Option<MoveReport>> {
    let mover_name = tree.expect(mover)?.ids.file_name.clone();
    let target_node = tree.expect(target)?;
    if target_node.ids.parent_path != *container {
        return Ok(None);
    }
    let target_name = target_node.ids.file_name.clone();

    let mut manifest = Manifest::read(vfs, container)?;
    let offset = ordering::internal_reorder(&mut manifest, &mover_name, &target_name, batch_offset)?;
    manifest.write(vfs, container)?;

    sync_orderings(tree, container, &manifest);

    Ok(Some(MoveReport {
        offset,
        affected: vec![container.clone()],
        created_destination: None,
    }))
}

/// Copy the manifest's ordering values onto the container's in-memory
/// children.
pub(crate) fn sync_orderings(tree: &mut Tree, container: &StorePath, manifest: &Manifest) {
    let children = tree
        .lookup(container)
        .map(|node| node.children())
        .unwrap_or_default();
    for child in children {
        let Some(node) = tree.lookup_mut(&child) else {
            continue;
        };
        if let Some(info) = manifest.get(&node.ids.file_name) {
            node.ids.ordering = info.ordering;
        }
    }
}
