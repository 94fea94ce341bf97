use clap::Parser;
use console::{Style, Term};
use directories::ProjectDirs;
use once_cell::sync::Lazy;
use std::path::PathBuf;

use bindery::create::{self, NewSnipOptions};
use bindery::engine::{self, MoveOp, MoveOutcome, ReorderDirection};
use bindery::error::{BinderyError, Result};
use bindery::model::ResourceKind;
use bindery::path::StorePath;
use bindery::prompt::{Prompter, SnipDropIntent};
use bindery::recycle;
use bindery::store::fs::FsVfs;
use bindery::tree::Tree;

mod args;
use args::{Cli, Commands, NewCommands};

static TITLE: Lazy<Style> = Lazy::new(|| Style::new().bold());
static KIND: Lazy<Style> = Lazy::new(|| Style::new().cyan());
static DIM: Lazy<Style> = Lazy::new(|| Style::new().dim());

fn main() {
    env_logger::init();
    if let Err(e) = run() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));

    if let Commands::Init = cli.command {
        let root = cli.book.clone().unwrap_or(cwd);
        let vfs = FsVfs::new(&root);
        create::init_store(&vfs)?;
        println!("Initialized empty book in {}", root.display());
        return Ok(());
    }

    let root = resolve_book_root(cli.book.clone(), &cwd)?;
    let vfs = FsVfs::new(&root);
    let mut tree = Tree::load(&vfs)?;
    let prompter = TermPrompter { assume_yes: cli.yes };

    match cli.command {
        Commands::Init => unreachable!("handled above"),
        Commands::Tree { paths } => {
            print_tree(&tree, paths);
            Ok(())
        }
        Commands::New(new) => handle_new(&vfs, &mut tree, new),
        Commands::Mv { paths, copy } => {
            let op = if copy { MoveOp::Duplicate } else { MoveOp::Move };
            handle_mv(&vfs, &mut tree, &paths, op, &prompter)
        }
        Commands::Up { pivot, selection } => {
            handle_reorder(&vfs, &mut tree, &pivot, &selection, ReorderDirection::Up)
        }
        Commands::Down { pivot, selection } => {
            handle_reorder(&vfs, &mut tree, &pivot, &selection, ReorderDirection::Down)
        }
        Commands::Rm { paths } => handle_rm(&vfs, &mut tree, &paths, &prompter),
        Commands::Bin => handle_bin(&vfs),
        Commands::Recover { name, target } => {
            handle_recover(&vfs, &mut tree, &name, &target, &prompter)
        }
        Commands::Purge { names, all } => handle_purge(&vfs, &mut tree, names, all, &prompter),
    }
}

/// An explicit --book wins; otherwise the current directory if it holds a
/// store, otherwise the per-user default book.
fn resolve_book_root(explicit: Option<PathBuf>, cwd: &PathBuf) -> Result<PathBuf> {
    if let Some(root) = explicit {
        return Ok(root);
    }
    if cwd.join("data").join("chapters").exists() {
        return Ok(cwd.clone());
    }
    let dirs = ProjectDirs::from("", "", "bindery")
        .ok_or_else(|| BinderyError::Store("cannot locate a user data directory".to_string()))?;
    Ok(dirs.data_local_dir().join("book"))
}

fn parse_node(tree: &Tree, raw: &str) -> Result<StorePath> {
    let trimmed = raw.trim_matches('/');
    if trimmed.is_empty() {
        return Err(BinderyError::Store(format!("'{raw}' is not a store path")));
    }
    let path = StorePath::new(trimmed);
    tree.expect(&path)?;
    Ok(path)
}

fn handle_new(vfs: &FsVfs, tree: &mut Tree, command: NewCommands) -> Result<()> {
    let created = match command {
        NewCommands::Chapter { title } => create::new_chapter(vfs, tree, title.as_deref())?,
        NewCommands::Snip { title, at } => {
            let anchor = at.map(|raw| parse_node(tree, &raw)).transpose()?;
            create::new_snip(
                vfs,
                tree,
                anchor.as_ref(),
                NewSnipOptions {
                    title: title.as_deref(),
                    skip_fragment: false,
                },
            )?
        }
        NewCommands::Fragment { title, at } => {
            let host = parse_node(tree, &at)?;
            create::new_fragment(vfs, tree, &host, title.as_deref())?
        }
    };
    let node = tree.expect(&created)?;
    println!(
        "Created {} '{}' at {}",
        KIND.apply_to(node.ids.kind),
        TITLE.apply_to(&node.ids.display),
        DIM.apply_to(&created)
    );
    Ok(())
}

fn handle_mv(
    vfs: &FsVfs,
    tree: &mut Tree,
    paths: &[String],
    op: MoveOp,
    prompter: &TermPrompter,
) -> Result<()> {
    let (target_raw, mover_raws) = paths.split_last().expect("clap enforces two paths");
    let target = parse_node(tree, target_raw)?;
    let movers = mover_raws
        .iter()
        .map(|raw| parse_node(tree, raw))
        .collect::<Result<Vec<_>>>()?;

    let summary = engine::move_many(vfs, tree, &movers, &target, op, prompter)?;
    println!(
        "Moved {}, failed {}, skipped {}",
        summary.succeeded, summary.failed, summary.skipped
    );
    for (mover, err) in &summary.errors {
        eprintln!("  {}: {}", DIM.apply_to(mover), err);
    }
    Ok(())
}

fn handle_reorder(
    vfs: &FsVfs,
    tree: &mut Tree,
    pivot: &str,
    selection: &[String],
    direction: ReorderDirection,
) -> Result<()> {
    let pivot = parse_node(tree, pivot)?;
    let selection = selection
        .iter()
        .map(|raw| parse_node(tree, raw))
        .collect::<Result<Vec<_>>>()?;
    engine::reorder_selection(vfs, tree, &pivot, &selection, direction)?;
    println!("Reordered");
    Ok(())
}

fn handle_rm(
    vfs: &FsVfs,
    tree: &mut Tree,
    paths: &[String],
    prompter: &TermPrompter,
) -> Result<()> {
    let targets = paths
        .iter()
        .map(|raw| parse_node(tree, raw))
        .collect::<Result<Vec<_>>>()?;
    let roots = tree.unique_roots(&targets);
    let noun = if roots.len() == 1 { "item" } else { "items" };
    if !prompter.assume_yes && !ask_yes_no(&format!("Recycle {} {noun}?", roots.len())) {
        println!("Nothing deleted");
        return Ok(());
    }

    let summary = recycle::soft_delete(vfs, tree, &targets, prompter)?;
    println!(
        "Recycled {}, discarded {} empty",
        summary.recycled, summary.discarded
    );
    Ok(())
}

fn handle_bin(vfs: &FsVfs) -> Result<()> {
    let log = recycle::read_log(vfs)?;
    if log.is_empty() {
        println!("Recycle bin is empty");
        return Ok(());
    }
    for record in log.iter().rev() {
        let when = chrono::DateTime::from_timestamp_millis(record.timestamp)
            .map(|dt| dt.format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_else(|| "?".to_string());
        println!(
            "{}  {}  '{}'  {}",
            DIM.apply_to(&record.recycle_name),
            KIND.apply_to(record.kind),
            TITLE.apply_to(&record.title),
            DIM.apply_to(when)
        );
    }
    Ok(())
}

fn handle_recover(
    vfs: &FsVfs,
    tree: &mut Tree,
    name: &str,
    target: &str,
    prompter: &TermPrompter,
) -> Result<()> {
    let target = parse_node(tree, target)?;
    match recycle::recover(vfs, tree, name, &target, prompter)? {
        MoveOutcome::Moved(_) => println!("Recovered '{name}'"),
        MoveOutcome::Disallowed => println!("That entry cannot be recovered onto that target"),
        MoveOutcome::Cancelled => println!("Recovery cancelled"),
    }
    Ok(())
}

fn handle_purge(
    vfs: &FsVfs,
    tree: &mut Tree,
    names: Vec<String>,
    all: bool,
    prompter: &TermPrompter,
) -> Result<()> {
    let names = if all {
        recycle::read_log(vfs)?
            .into_iter()
            .map(|record| record.recycle_name)
            .collect()
    } else {
        names
    };
    if names.is_empty() {
        println!("Nothing to purge");
        return Ok(());
    }
    let noun = if names.len() == 1 { "entry" } else { "entries" };
    if !prompter.assume_yes
        && !ask_yes_no(&format!(
            "Permanently delete {} {noun}? This cannot be undone.",
            names.len()
        ))
    {
        println!("Nothing purged");
        return Ok(());
    }
    let purged = recycle::purge(vfs, tree, &names)?;
    println!("Purged {purged}");
    Ok(())
}

fn print_tree(tree: &Tree, with_paths: bool) {
    fn walk(tree: &Tree, path: &StorePath, depth: usize, with_paths: bool) {
        let Some(node) = tree.lookup(path) else {
            return;
        };
        let indent = "  ".repeat(depth);
        let label = match node.ids.kind {
            ResourceKind::Container => format!("{}", TITLE.apply_to(&node.ids.display)),
            ResourceKind::Fragment => format!("{}", &node.ids.display),
            _ => format!(
                "{} {}",
                KIND.apply_to(node.ids.kind),
                TITLE.apply_to(&node.ids.display)
            ),
        };
        if with_paths {
            println!("{indent}{label}  {}", DIM.apply_to(path));
        } else {
            println!("{indent}{label}");
        }
        for child in tree.ordered_children(path) {
            walk(tree, &child, depth + 1, with_paths);
        }
    }

    for top in tree.ordered_children(&tree.root_path()) {
        walk(tree, &top, 0, with_paths);
    }
}

/// Stdin-backed prompter for the decisions the engine cannot make alone.
struct TermPrompter {
    assume_yes: bool,
}

impl Prompter for TermPrompter {
    fn confirm_chapter_conversion(&self, chapter_title: &str) -> bool {
        if self.assume_yes {
            return true;
        }
        ask_yes_no(&format!(
            "Convert chapter '{chapter_title}' into a snip? This is irreversible."
        ))
    }

    fn snip_drop_intent(&self, mover_title: &str, target_title: &str) -> SnipDropIntent {
        if self.assume_yes {
            return SnipDropIntent::Insert;
        }
        eprint!("Drop '{mover_title}' onto '{target_title}': [i]nsert inside, [r]eorder, or [c]ancel? ");
        match read_answer().as_str() {
            "i" | "insert" => SnipDropIntent::Insert,
            "r" | "reorder" => SnipDropIntent::Reorder,
            _ => SnipDropIntent::Cancel,
        }
    }

    fn confirm_discard_empty_fragments(&self, count: usize) -> bool {
        if self.assume_yes {
            return true;
        }
        let noun = if count == 1 { "fragment" } else { "fragments" };
        ask_yes_no(&format!(
            "{count} empty untitled {noun} in the selection. Delete permanently instead of recycling?"
        ))
    }
}

fn ask_yes_no(question: &str) -> bool {
    eprint!("{question} [y/N] ");
    matches!(read_answer().as_str(), "y" | "yes")
}

fn read_answer() -> String {
    Term::stderr()
        .read_line()
        .unwrap_or_default()
        .trim()
        .to_lowercase()
}
