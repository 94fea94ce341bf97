//! End-to-end engine scenarios against the real filesystem.
//!
//! The unit tests drive everything through `MemVfs`; these cover the same
//! flows on disk, where renames of whole directory subtrees and manifest
//! rewrites actually hit the OS.

use tempfile::tempdir;

use bindery::create::{init_store, new_chapter, new_fragment, new_snip, NewSnipOptions};
use bindery::engine::{move_many, move_node, BatchContext, MoveOp, MoveOutcome};
use bindery::manifest::Manifest;
use bindery::path::StorePath;
use bindery::prompt::ScriptedPrompter;
use bindery::recycle;
use bindery::store::fs::FsVfs;
use bindery::tree::{Tree, CHAPTER_SNIPS_DIR};

fn assert_dense(vfs: &FsVfs, container: &StorePath) {
    let manifest = Manifest::read(vfs, container).unwrap();
    let mut orderings: Vec<i64> = manifest.children().map(|(_, info)| info.ordering).collect();
    orderings.sort_unstable();
    let expected: Vec<i64> = (0..orderings.len() as i64).collect();
    assert_eq!(orderings, expected, "{container} orderings must be dense");
}

#[test]
fn cross_container_move_survives_a_reload() {
    let dir = tempdir().unwrap();
    let vfs = FsVfs::new(dir.path());
    init_store(&vfs).unwrap();
    let mut tree = Tree::load(&vfs).unwrap();

    let source = new_chapter(&vfs, &mut tree, Some("Source")).unwrap();
    let dest = new_chapter(&vfs, &mut tree, Some("Dest")).unwrap();
    let frag = new_fragment(&vfs, &mut tree, &source, Some("Travels")).unwrap();
    std::fs::write(dir.path().join(frag.as_str()), "payload").unwrap();

    let outcome = move_node(
        &vfs,
        &mut tree,
        &frag,
        &dest,
        MoveOp::Move,
        &mut BatchContext::default(),
        &ScriptedPrompter::new(),
    )
    .unwrap();
    assert!(matches!(outcome, MoveOutcome::Moved(_)));

    // a fresh process sees the move
    let reloaded = Tree::load(&vfs).unwrap();
    let new_path = dest.join(frag.file_name());
    assert_eq!(reloaded.lookup(&new_path).unwrap().ids.display, "Travels");
    assert!(reloaded.lookup(&frag).is_none());
    assert_eq!(
        std::fs::read_to_string(dir.path().join(new_path.as_str())).unwrap(),
        "payload"
    );
    assert_dense(&vfs, &source);
    assert_dense(&vfs, &dest);
}

#[test]
fn snip_subtree_moves_as_one_rename() {
    let dir = tempdir().unwrap();
    let vfs = FsVfs::new(dir.path());
    init_store(&vfs).unwrap();
    let mut tree = Tree::load(&vfs).unwrap();

    let snip = new_snip(
        &vfs,
        &mut tree,
        None,
        NewSnipOptions {
            title: Some("Carrier"),
            skip_fragment: true,
        },
    )
    .unwrap();
    let frag = new_fragment(&vfs, &mut tree, &snip, Some("Cargo")).unwrap();
    std::fs::write(dir.path().join(frag.as_str()), "cargo text").unwrap();
    let chapter = new_chapter(&vfs, &mut tree, Some("Harbor")).unwrap();

    let outcome = move_node(
        &vfs,
        &mut tree,
        &snip,
        &chapter,
        MoveOp::Move,
        &mut BatchContext::default(),
        &ScriptedPrompter::new(),
    )
    .unwrap();
    assert!(matches!(outcome, MoveOutcome::Moved(_)));

    let moved_frag = chapter
        .join(CHAPTER_SNIPS_DIR)
        .join(snip.file_name())
        .join(frag.file_name());
    assert_eq!(
        std::fs::read_to_string(dir.path().join(moved_frag.as_str())).unwrap(),
        "cargo text"
    );
    let reloaded = Tree::load(&vfs).unwrap();
    assert_eq!(reloaded.lookup(&moved_frag).unwrap().ids.display, "Cargo");
}

#[test]
fn recycle_then_recover_round_trips_on_disk() {
    let dir = tempdir().unwrap();
    let vfs = FsVfs::new(dir.path());
    init_store(&vfs).unwrap();
    let mut tree = Tree::load(&vfs).unwrap();

    let snip = new_snip(
        &vfs,
        &mut tree,
        None,
        NewSnipOptions {
            title: Some("Precious"),
            skip_fragment: true,
        },
    )
    .unwrap();
    let frag = new_fragment(&vfs, &mut tree, &snip, Some("Scene")).unwrap();
    std::fs::write(dir.path().join(frag.as_str()), "do not lose").unwrap();

    let prompter = ScriptedPrompter::new();
    recycle::soft_delete(&vfs, &mut tree, &[snip.clone()], &prompter).unwrap();
    assert!(!dir.path().join(snip.as_str()).exists());

    let record = recycle::read_log(&vfs).unwrap().remove(0);
    let outcome =
        recycle::recover(&vfs, &mut tree, &record.recycle_name, &StorePath::root(), &prompter)
            .unwrap();
    assert!(matches!(outcome, MoveOutcome::Moved(_)));
    assert!(recycle::read_log(&vfs).unwrap().is_empty());

    let reloaded = Tree::load(&vfs).unwrap();
    let recovered = reloaded
        .ordered_children(&StorePath::snips())
        .first()
        .cloned()
        .unwrap();
    assert_eq!(reloaded.lookup(&recovered).unwrap().ids.display, "Precious");
    let inner = reloaded.ordered_children(&recovered);
    assert_eq!(inner.len(), 1);
    assert_eq!(reloaded.lookup(&inner[0]).unwrap().ids.display, "Scene");
    assert_eq!(
        std::fs::read_to_string(dir.path().join(inner[0].as_str())).unwrap(),
        "do not lose"
    );
}

#[test]
fn batched_fragments_share_one_created_snip_on_disk() {
    let dir = tempdir().unwrap();
    let vfs = FsVfs::new(dir.path());
    init_store(&vfs).unwrap();
    let mut tree = Tree::load(&vfs).unwrap();

    let chapter = new_chapter(&vfs, &mut tree, Some("Ch1")).unwrap();
    let frag_a = new_fragment(&vfs, &mut tree, &chapter, Some("A")).unwrap();
    let frag_b = new_fragment(&vfs, &mut tree, &chapter, Some("B")).unwrap();
    let container = chapter.join(CHAPTER_SNIPS_DIR);

    let summary = move_many(
        &vfs,
        &mut tree,
        &[frag_a, frag_b],
        &container,
        MoveOp::Move,
        &ScriptedPrompter::new().keeping_empty_fragments(),
    )
    .unwrap();
    assert_eq!(summary.succeeded, 2);

    let reloaded = Tree::load(&vfs).unwrap();
    let created = reloaded.ordered_children(&container);
    assert_eq!(created.len(), 1, "both fragments share one created snip");
    let inside: Vec<String> = reloaded
        .ordered_children(&created[0])
        .iter()
        .map(|p| reloaded.lookup(p).unwrap().ids.display.clone())
        .collect();
    assert_eq!(inside, vec!["A", "B"]);
    assert_dense(&vfs, &created[0]);
}
