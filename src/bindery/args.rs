use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "bindery",
    about = "A filesystem-backed manuscript organizer",
    version
)]
pub struct Cli {
    /// Book root (defaults to the current directory if it holds a store,
    /// otherwise the user data directory)
    #[arg(long, global = true)]
    pub book: Option<PathBuf>,

    /// Answer yes to every confirmation
    #[arg(short = 'y', long, global = true)]
    pub yes: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize a new book store
    Init,

    /// Print the outline tree
    Tree {
        /// Show store paths next to titles
        #[arg(long)]
        paths: bool,
    },

    /// Create a node
    #[command(subcommand)]
    New(NewCommands),

    /// Move nodes onto a drop target (last argument)
    Mv {
        /// Store paths: one or more movers, then the target
        #[arg(num_args = 2..)]
        paths: Vec<String>,
        /// Paste copies instead of moving the originals
        #[arg(long)]
        copy: bool,
    },

    /// Move a sibling selection up one slot, or before the pivot
    Up {
        /// The pivot node
        pivot: String,
        /// Additional selected siblings
        selection: Vec<String>,
    },

    /// Move a sibling selection down one slot, or after the pivot
    Down {
        pivot: String,
        selection: Vec<String>,
    },

    /// Soft-delete nodes into the recycle bin
    Rm {
        paths: Vec<String>,
    },

    /// List the recycle bin
    Bin,

    /// Recover a recycled entry onto a live target
    Recover {
        /// Bin name (see `bindery bin`)
        name: String,
        /// Store path of the drop target
        target: String,
    },

    /// Permanently delete recycled entries
    Purge {
        /// Bin names; with --all, every entry
        names: Vec<String>,
        #[arg(long)]
        all: bool,
    },
}

#[derive(Subcommand)]
pub enum NewCommands {
    /// A chapter at the end of the chapters container
    Chapter {
        title: Option<String>,
    },
    /// A snip, hosted near --at (or in the top-level snip container)
    Snip {
        title: Option<String>,
        #[arg(long)]
        at: Option<String>,
    },
    /// An empty fragment inside the chapter or snip at --at
    Fragment {
        title: Option<String>,
        #[arg(long)]
        at: String,
    },
}
