//! Pure ordering algebra over a container's manifest.
//!
//! Everything here computes new `ordering` values only; reading and writing
//! the manifest, renaming files, and syncing the in-memory tree are the move
//! engine's job. After any of these functions completes, child orderings form
//! a dense `0..n-1` sequence (with the single exception of
//! [`internal_reorder`], which permutes an already-dense sequence).

use crate::error::{BinderyError, Result};
use crate::manifest::Manifest;

/// Highest child ordering present, or −1 for an empty container. Appending
/// at `latest_ordering + 1` keeps the sequence dense.
pub fn latest_ordering(manifest: &Manifest) -> i64 {
    manifest
        .children()
        .map(|(_, info)| info.ordering)
        .max()
        .unwrap_or(-1)
}

/// After removing the entry that held `removed_ordering`, close the gap:
/// every entry ordered after it moves down by one.
pub fn shift_trailing_down(manifest: &mut Manifest, removed_ordering: i64) {
    for (_, info) in manifest.children_mut() {
        if info.ordering > removed_ordering {
            info.ordering -= 1;
        }
    }
}

/// Same-container drag-and-drop: the mover takes the destination entry's
/// slot, the destination shifts by one toward the vacated slot, and the
/// entries strictly between them close the gap.
///
/// `move_offset` compensates for earlier movers of the same batch that have
/// already moved downward within this container; the return value is that
/// signal for the caller to accumulate (1 when the mover travelled downward,
/// 0 otherwise).
///
/// Panics when the expected slots are missing: the manifest and the tree have
/// diverged, which is index corruption, not a recoverable condition.
pub fn internal_reorder(
    manifest: &mut Manifest,
    mover_name: &str,
    dest_name: &str,
    move_offset: i64,
) -> Result<i64> {
    let mover_ordering = manifest
        .get(mover_name)
        .ok_or_else(|| BinderyError::Store(format!("'{mover_name}' not in manifest")))?
        .ordering;
    let dest_ordering = manifest
        .get(dest_name)
        .ok_or_else(|| BinderyError::Store(format!("'{dest_name}' not in manifest")))?
        .ordering;

    let (min, max) = if mover_ordering < dest_ordering {
        (mover_ordering, dest_ordering)
    } else {
        (dest_ordering, mover_ordering)
    };

    let mut min_name: Option<String> = None;
    let mut max_name: Option<String> = None;
    let mut between: Vec<String> = Vec::new();
    for (name, info) in manifest.children() {
        if info.ordering == min {
            min_name = Some(name.to_string());
        }
        if info.ordering == max + move_offset {
            max_name = Some(name.to_string());
        } else if info.ordering > min && info.ordering < max + move_offset {
            between.push(name.to_string());
        }
    }
    let (min_name, max_name) = match (min_name, max_name) {
        (Some(a), Some(b)) => (a, b),
        _ => panic!("manifest orderings diverged from the tree while reordering '{mover_name}'"),
    };

    let moved_down = mover_ordering < dest_ordering;
    // Travelling down: everything between shifts up one; travelling up: down
    // one. The destination follows the between block, and the mover lands on
    // the destination's old slot.
    let step = if moved_down { -1 } else { 1 };
    let (mover_key, dest_key) = if moved_down {
        (min_name, max_name)
    } else {
        (max_name, min_name)
    };

    for (name, info) in manifest.children_mut() {
        if between.iter().any(|b| b.as_str() == name) {
            info.ordering += step;
        }
    }
    let old_dest_ordering = manifest
        .get(&dest_key)
        .expect("destination entry vanished mid-reorder")
        .ordering;
    for (name, info) in manifest.children_mut() {
        if name == dest_key.as_str() {
            info.ordering = old_dest_ordering + step;
        } else if name == mover_key.as_str() {
            info.ordering = old_dest_ordering;
        }
    }

    Ok(if moved_down { 1 } else { 0 })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Direction {
    Up,
    Down,
}

/// Relocate `selection` as one contiguous block immediately *before* the
/// pivot, preserving the selection's internal order, and renumber everything
/// densely. A pivot inside the selection degrades to "move the block one
/// slot up".
pub fn reorder_up(manifest: &mut Manifest, selection: &[String], pivot: &str) -> Result<()> {
    reorder_block(manifest, selection, pivot, Direction::Up)
}

/// Mirror of [`reorder_up`]: the block lands immediately *after* the pivot.
pub fn reorder_down(manifest: &mut Manifest, selection: &[String], pivot: &str) -> Result<()> {
    reorder_block(manifest, selection, pivot, Direction::Down)
}

fn reorder_block(
    manifest: &mut Manifest,
    selection: &[String],
    pivot: &str,
    direction: Direction,
) -> Result<()> {
    if !manifest.contains(pivot) {
        return Err(BinderyError::Store(format!("'{pivot}' not in manifest")));
    }
    for name in selection {
        if !manifest.contains(name) {
            return Err(BinderyError::Store(format!("'{name}' not in manifest")));
        }
    }

    // Stable-sort the selection by its current ordering; ties cannot occur in
    // a well-formed manifest but the sort is stable regardless.
    let mut block: Vec<(String, i64)> = selection
        .iter()
        .map(|name| (name.clone(), manifest.get(name).unwrap().ordering))
        .collect();
    block.sort_by_key(|(_, ordering)| *ordering);

    let mut others: Vec<(String, i64)> = manifest
        .children()
        .filter(|(name, _)| !selection.iter().any(|s| s.as_str() == *name))
        .map(|(name, info)| (name.to_string(), info.ordering))
        .collect();
    others.sort_by_key(|(_, ordering)| *ordering);

    let insert_at = if let Some(pivot_pos) = others.iter().position(|(name, _)| name.as_str() == pivot) {
        match direction {
            Direction::Up => pivot_pos,
            Direction::Down => pivot_pos + 1,
        }
    } else {
        // Pivot is part of the selection: anchor on the nearest non-selected
        // sibling instead, which shifts the whole block by one slot.
        let min_sel = block.first().map(|(_, o)| *o).unwrap_or(0);
        let max_sel = block.last().map(|(_, o)| *o).unwrap_or(0);
        match direction {
            Direction::Up => others
                .iter()
                .rposition(|(_, ordering)| *ordering < min_sel)
                .unwrap_or(0),
            Direction::Down => others
                .iter()
                .position(|(_, ordering)| *ordering > max_sel)
                .map(|pos| pos + 1)
                .unwrap_or(others.len()),
        }
    };

    let mut sequence: Vec<String> = Vec::with_capacity(others.len() + block.len());
    sequence.extend(others[..insert_at].iter().map(|(name, _)| name.clone()));
    sequence.extend(block.iter().map(|(name, _)| name.clone()));
    sequence.extend(others[insert_at..].iter().map(|(name, _)| name.clone()));

    for (new_ordering, name) in sequence.iter().enumerate() {
        for (entry_name, info) in manifest.children_mut() {
            if entry_name == name.as_str() {
                info.ordering = new_ordering as i64;
            }
        }
    }
    Ok(())
}
