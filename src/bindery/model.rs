//! The node model: a closed set of resource kinds plus the identity record
//! carried by every node.
//!
//! A book is a fixed two-armed tree:
//!
//! ```text
//! Root ("data")
//! ├── Container "data/chapters"      (holds Chapters)
//! │   └── Chapter
//! │       ├── Fragment*             (one text file each)
//! │       └── Container ".../snips"  (holds Snips)
//! └── Container "data/snips"         (holds Snips)
//!     └── Snip
//!         ├── Fragment*
//!         └── Snip*                  (snips nest snips)
//! ```
//!
//! Nodes reference each other by [`StorePath`] key, never by pointer; the
//! arena in [`crate::tree`] owns every node. A node's identity persists
//! across moves: the move engine rewrites its `Ids` in place rather than
//! replacing the node.

use serde::{Deserialize, Serialize};

use crate::path::StorePath;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceKind {
    Root,
    Container,
    Chapter,
    Snip,
    Fragment,
}

impl ResourceKind {
    /// The file-name prefix used when minting a node of this kind.
    pub fn prefix(&self) -> &'static str {
        match self {
            ResourceKind::Root => "root",
            ResourceKind::Container => "container",
            ResourceKind::Chapter => "chapter",
            ResourceKind::Snip => "snip",
            ResourceKind::Fragment => "fragment",
        }
    }
}

impl std::fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.prefix())
    }
}

/// Identity record attached to every node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ids {
    pub kind: ResourceKind,
    /// User-facing title, mirrored from the parent manifest.
    pub display: String,
    /// Canonical location; the arena key.
    pub path: StorePath,
    /// Leaf name on disk.
    pub file_name: String,
    /// Store path of the directory holding this node. Empty for the root and
    /// for recycled roots (which have no live parent).
    pub relative_path: String,
    pub parent_kind: ResourceKind,
    pub parent_path: StorePath,
    /// Position among siblings; dense 0..n-1 after any completed mutation.
    pub ordering: i64,
}

/// Kind-specific payload. Child lists hold arena keys.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Body {
    Root {
        chapters: StorePath,
        snips: StorePath,
    },
    Container {
        contents: Vec<StorePath>,
    },
    Chapter {
        fragments: Vec<StorePath>,
        snips: StorePath,
    },
    Snip {
        contents: Vec<StorePath>,
    },
    Fragment,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutlineNode {
    pub ids: Ids,
    pub body: Body,
}

impl OutlineNode {
    pub fn kind(&self) -> ResourceKind {
        self.ids.kind
    }

    pub fn path(&self) -> &StorePath {
        &self.ids.path
    }

    /// Direct children, unordered. Chapters list fragments first, then the
    /// snips container.
    pub fn children(&self) -> Vec<StorePath> {
        match &self.body {
            Body::Root { chapters, snips } => vec![chapters.clone(), snips.clone()],
            Body::Container { contents } | Body::Snip { contents } => contents.clone(),
            Body::Chapter { fragments, snips } => {
                let mut out = fragments.clone();
                out.push(snips.clone());
                out
            }
            Body::Fragment => Vec::new(),
        }
    }

    pub fn has_children(&self) -> bool {
        !matches!(self.body, Body::Fragment)
    }

    /// The child list a mover of `kind` lives in, for splicing. Fragments sit
    /// in `fragments`/`contents`; snips and chapters in `contents`.
    pub fn child_list_mut(&mut self, kind: ResourceKind) -> Option<&mut Vec<StorePath>> {
        match (&mut self.body, kind) {
            (Body::Chapter { fragments, .. }, ResourceKind::Fragment) => Some(fragments),
            (Body::Snip { contents }, ResourceKind::Fragment)
            | (Body::Snip { contents }, ResourceKind::Snip)
            | (Body::Container { contents }, ResourceKind::Snip)
            | (Body::Container { contents }, ResourceKind::Chapter) => Some(contents),
            _ => None,
        }
    }
}

/// Which target kinds a mover of a given kind may be dropped onto. Anything
/// outside this table is rejected up front with no side effects.
pub fn allowed_targets(mover: ResourceKind) -> &'static [ResourceKind] {
    use ResourceKind::*;
    match mover {
        Snip => &[Chapter, Fragment, Root, Container, Snip],
        Chapter => &[Chapter, Container, Snip, Fragment],
        Root => &[],
        Container => &[Chapter, Root, Snip, Container, Fragment],
        Fragment => &[Chapter, Snip, Fragment, Container],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(kind: ResourceKind, path: &str) -> Ids {
        let path = StorePath::new(path);
        Ids {
            kind,
            display: "x".into(),
            file_name: path.file_name().to_string(),
            relative_path: path.parent().map(|p| p.as_str().to_string()).unwrap_or_default(),
            parent_path: path.parent().unwrap_or_else(StorePath::root),
            parent_kind: ResourceKind::Container,
            ordering: 0,
            path,
        }
    }

    #[test]
    fn chapter_children_list_fragments_then_snips() {
        let node = OutlineNode {
            ids: ids(ResourceKind::Chapter, "data/chapters/chapter-1"),
            body: Body::Chapter {
                fragments: vec![StorePath::new("data/chapters/chapter-1/f1.txt")],
                snips: StorePath::new("data/chapters/chapter-1/snips"),
            },
        };
        let children = node.children();
        assert_eq!(children.len(), 2);
        assert_eq!(children[1].file_name(), "snips");
    }

    #[test]
    fn fragments_have_no_children() {
        let node = OutlineNode {
            ids: ids(ResourceKind::Fragment, "data/snips/snip-1/f1.txt"),
            body: Body::Fragment,
        };
        assert!(!node.has_children());
        assert!(node.children().is_empty());
    }

    #[test]
    fn move_table_rejects_root_movers() {
        assert!(allowed_targets(ResourceKind::Root).is_empty());
        assert!(allowed_targets(ResourceKind::Snip).contains(&ResourceKind::Root));
        assert!(!allowed_targets(ResourceKind::Chapter).contains(&ResourceKind::Root));
    }

    #[test]
    fn child_list_mut_matches_structure() {
        let mut snip = OutlineNode {
            ids: ids(ResourceKind::Snip, "data/snips/snip-1"),
            body: Body::Snip { contents: vec![] },
        };
        assert!(snip.child_list_mut(ResourceKind::Fragment).is_some());
        assert!(snip.child_list_mut(ResourceKind::Snip).is_some());
        assert!(snip.child_list_mut(ResourceKind::Chapter).is_none());
    }
}
