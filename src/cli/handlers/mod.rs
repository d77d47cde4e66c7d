mod init;
pub use init::cmd_init;

use std::io::Read;
use std::path::PathBuf;
use std::sync::Mutex;
use std::time::Duration;

use chrono::{DateTime, NaiveDate, Utc};

/// Global override for workspace directory (set by -C flag)
static WORKSPACE_DIR_OVERRIDE: Mutex<Option<PathBuf>> = Mutex::new(None);

use crate::cli::commands::*;
use crate::cli::output::*;
use crate::io::config_io;
use crate::io::file_ops::{DropCheck, FileOpError, plan_drop};
use crate::io::host::{FileHost, FsOp, HostClient};
use crate::io::lock::WorkspaceLock;
use crate::io::recovery::{self, PRUNE_AGE_DAYS};
use crate::io::state::{ViewState, read_view_state, write_view_state};
use crate::io::watcher::WorkspaceWatcher;
use crate::io::workspace_io::{self, WorkspaceError, note_title};
use crate::model::drop::MoveRequest;
use crate::model::node::{ROOT_KEY, TreeNode, base_name, join_key, parent_key};
use crate::model::workspace::Workspace;
use crate::ops::names::{file_name_for, validate_name};
use crate::ops::timeline::build_timeline;
use crate::ops::tree_ops::{self, children_of, container_key, find_node};

// ---------------------------------------------------------------------------
// Dispatch
// ---------------------------------------------------------------------------

pub fn dispatch(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let json = cli.json;

    // Store -C override for load_workspace_cwd()
    if let Some(ref dir) = cli.workspace_dir {
        let abs = std::fs::canonicalize(dir)
            .map_err(|e| format!("cannot resolve -C path '{}': {}", dir, e))?;
        set_workspace_dir(Some(abs));
    }

    match cli.command {
        // Init runs before there is a workspace to discover
        Commands::Init(args) => cmd_init(args, &start_dir()?),

        // Read commands
        Commands::Tree => cmd_tree(json),
        Commands::Cat(args) => cmd_cat(args),
        Commands::Timeline(args) => cmd_timeline(args, json),
        Commands::Watch => cmd_watch(json),

        // Write commands
        Commands::Mv(args) => cmd_mv(args, json),
        Commands::Rename(args) => cmd_rename(args),
        Commands::Rm(args) => cmd_rm(args),
        Commands::Mkdir(args) => cmd_mkdir(args),
        Commands::New(args) => cmd_new(args),
        Commands::Write(args) => cmd_write(args),
        Commands::Select(args) => cmd_select(args),

        // Maintenance
        Commands::Recovery(args) => cmd_recovery(args, json),
        Commands::Config(args) => cmd_config(args, json),
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn set_workspace_dir(dir: Option<PathBuf>) {
    let mut guard = WORKSPACE_DIR_OVERRIDE.lock().unwrap_or_else(|e| e.into_inner());
    *guard = dir;
}

fn start_dir() -> Result<PathBuf, WorkspaceError> {
    let dir = WORKSPACE_DIR_OVERRIDE
        .lock()
        .unwrap_or_else(|e| e.into_inner())
        .clone();
    match dir {
        Some(dir) => Ok(dir),
        None => std::env::current_dir().map_err(WorkspaceError::IoError),
    }
}

fn load_workspace_cwd() -> Result<Workspace, WorkspaceError> {
    let root = workspace_io::discover_workspace(&start_dir()?)?;
    workspace_io::load_workspace(&root)
}

fn open_host(ws: &Workspace) -> HostClient {
    FileHost::spawn(ws.root.clone(), &ws.config)
}

fn load_state(ws: &Workspace) -> ViewState {
    read_view_state(&ws.meta_dir).unwrap_or_default()
}

fn require_node<'a>(tree: &'a [TreeNode], key: &str) -> Result<&'a TreeNode, String> {
    find_node(tree, key).ok_or_else(|| format!("no such entry: {}", key))
}

/// Siblings an entry created under `parent` would have.
fn siblings_under<'a>(tree: &'a [TreeNode], parent: &str) -> Result<&'a [TreeNode], String> {
    children_of(tree, parent).ok_or_else(|| {
        if find_node(tree, parent).is_some() {
            format!("not a folder: {}", parent)
        } else {
            format!("no such folder: {}", parent)
        }
    })
}

/// Keep a container's recorded order in step with a tree edit, but only if
/// the user has ordered it by hand before.
fn refresh_order(state: &mut ViewState, tree: &[TreeNode], container: &str) {
    if state.order.contains_key(container) {
        state.record_order(tree, container);
    }
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

// ---------------------------------------------------------------------------
// Read commands
// ---------------------------------------------------------------------------

fn cmd_tree(json: bool) -> Result<(), Box<dyn std::error::Error>> {
    let ws = load_workspace_cwd()?;
    let state = read_view_state(&ws.meta_dir);

    // fresh listing from the host, in the recorded manual order
    let mut host = open_host(&ws);
    let mut tree = host.list()?;
    if let Some(state) = &state {
        tree_ops::apply_order(&mut tree, &state.order);
    }

    if json {
        return print_json(&TreeJson {
            workspace: ws.config.workspace.name.clone(),
            selected: state.and_then(|s| s.selected),
            nodes: tree.iter().map(node_to_json).collect(),
        });
    }
    for line in format_tree(&tree, state.as_ref()) {
        println!("{}", line);
    }
    Ok(())
}

fn cmd_cat(args: KeyArg) -> Result<(), Box<dyn std::error::Error>> {
    let ws = load_workspace_cwd()?;
    let mut host = open_host(&ws);
    print!("{}", host.read(&args.key)?);
    Ok(())
}

fn cmd_timeline(args: TimelineArgs, json: bool) -> Result<(), Box<dyn std::error::Error>> {
    let ws = load_workspace_cwd()?;
    let folder = args.folder.unwrap_or_default();
    let folder = folder.trim_end_matches('/');
    let header = if folder == ROOT_KEY {
        ws.config.workspace.name.clone()
    } else {
        require_node(&ws.tree, folder)?.title.clone()
    };

    let limit = args.limit.or(Some(ws.config.timeline.limit));
    let mut host = open_host(&ws);
    let entries = host.timeline(
        folder,
        ws.config.timeline.preview_lines,
        ws.config.timeline.preview_width,
    )?;
    let entries = build_timeline(entries, limit);

    if json {
        return print_json(&TimelineJson {
            folder: folder.to_string(),
            entries,
        });
    }
    for line in format_timeline(&header, &entries) {
        println!("{}", line);
    }
    Ok(())
}

fn cmd_watch(json: bool) -> Result<(), Box<dyn std::error::Error>> {
    let ws = load_workspace_cwd()?;
    let watcher = WorkspaceWatcher::start(&ws.root, &ws.config.notes.extension)?;
    eprintln!("watching {} (Ctrl-C to stop)", ws.root.display());
    loop {
        let Some(event) = watcher.next_timeout(Duration::from_secs(1)) else {
            continue;
        };
        for key in &event.keys {
            if json {
                println!("{}", serde_json::json!({ "kind": event.kind, "key": key }));
            } else {
                println!("{:?} {}", event.kind, key);
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Move
// ---------------------------------------------------------------------------

fn cmd_mv(args: MvArgs, json: bool) -> Result<(), Box<dyn std::error::Error>> {
    let ws = load_workspace_cwd()?;
    let _lock = WorkspaceLock::acquire_default(&ws.meta_dir)?;

    let request = MoveRequest::new(args.drag.clone(), args.drop.clone(), args.offset());
    let mut result = MoveJson {
        drag: request.drag_key.clone(),
        drop: request.drop_key.clone(),
        position: request.position,
        moved: false,
        plan: None,
        check: None,
        dry_run: args.dry_run,
        error: None,
    };

    let moved_tree = match request.apply(&ws.tree) {
        Ok(tree) => tree,
        Err(e) => {
            tracing::info!("move rejected: {}", e);
            if json {
                result.error = Some(e.to_string());
                print_json(&result)?;
            }
            return Err(e.into());
        }
    };
    let plan = plan_drop(&moved_tree, &request.drag_key)
        .ok_or_else(|| format!("no such entry: {}", request.drag_key))?;

    let mut host = open_host(&ws);
    let check = host.drop_op(FsOp::CheckDrop { plan: plan.clone() })?;
    result.plan = Some(plan.clone());
    result.check = Some(check);

    let refused = match check {
        DropCheck::FolderExists => true,
        DropCheck::FileExists => !args.replace && !args.dry_run,
        _ => false,
    };
    if refused {
        let err = FileOpError::DestinationExists {
            key: plan.to.clone(),
            replaceable: check == DropCheck::FileExists,
        };
        if json {
            result.error = Some(err.to_string());
            print_json(&result)?;
        }
        return Err(err.into());
    }

    if !args.dry_run {
        host.drop_op(FsOp::ExecuteDrop {
            plan: plan.clone(),
            replace: args.replace,
        })?;

        // Bring the reconciled tree in line with the disk: the entry now
        // lives under its new key, and a replaced note is gone.
        let mut tree = moved_tree;
        if plan.from != plan.to {
            if check == DropCheck::FileExists {
                tree = tree_ops::remove_node(&tree, &plan.to)?.0;
            }
            let title = require_node(&tree, &plan.from)?.title.clone();
            tree = tree_ops::rename_node(&tree, &plan.from, &plan.to, &title)?;
        }

        let mut state = load_state(&ws);
        state.rename_key(&plan.from, &plan.to);
        let new_container = container_key(&tree, &plan.to).unwrap_or_default();
        state.record_order(&tree, &new_container);
        let old_container = parent_key(&plan.from);
        if old_container != new_container {
            refresh_order(&mut state, &tree, old_container);
        }
        state.reveal(&plan.to);
        write_view_state(&ws.meta_dir, &state)?;
        result.moved = true;
    }

    if json {
        print_json(&result)
    } else {
        println!("{}", format_move(&result));
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Other tree edits
// ---------------------------------------------------------------------------

fn cmd_rename(args: RenameArgs) -> Result<(), Box<dyn std::error::Error>> {
    let ws = load_workspace_cwd()?;
    let _lock = WorkspaceLock::acquire_default(&ws.meta_dir)?;

    let node = require_node(&ws.tree, &args.key)?;
    let parent = parent_key(&node.key);
    let ext = &ws.config.notes.extension;
    let file_name = file_name_for(&args.name, node.is_leaf(), ext);
    let title = if node.is_leaf() {
        note_title(&file_name, ext).unwrap_or_else(|| file_name.clone())
    } else {
        file_name.clone()
    };
    validate_name(siblings_under(&ws.tree, parent)?, Some(node), &title)?;

    let new_key = join_key(parent, &file_name);
    if new_key == node.key {
        println!("{} unchanged", node.key);
        return Ok(());
    }

    let mut host = open_host(&ws);
    host.run(FsOp::Rename {
        from: node.key.clone(),
        to: new_key.clone(),
    })?;

    let tree = tree_ops::rename_node(&ws.tree, &node.key, &new_key, &title)?;
    let mut state = load_state(&ws);
    state.rename_key(&node.key, &new_key);
    refresh_order(&mut state, &tree, parent);
    write_view_state(&ws.meta_dir, &state)?;

    println!("{} -> {}", node.key, new_key);
    Ok(())
}

fn cmd_rm(args: KeyArg) -> Result<(), Box<dyn std::error::Error>> {
    let ws = load_workspace_cwd()?;
    let _lock = WorkspaceLock::acquire_default(&ws.meta_dir)?;
    require_node(&ws.tree, &args.key)?;

    let mut host = open_host(&ws);
    let dest = host.trash(&args.key)?;

    let mut state = load_state(&ws);
    state.forget(&args.key);
    write_view_state(&ws.meta_dir, &state)?;

    println!("{} -> {}", args.key, dest.display());
    Ok(())
}

fn cmd_mkdir(args: KeyArg) -> Result<(), Box<dyn std::error::Error>> {
    create_entry(&args.key, false)
}

fn cmd_new(args: KeyArg) -> Result<(), Box<dyn std::error::Error>> {
    create_entry(&args.key, true)
}

fn create_entry(key: &str, is_note: bool) -> Result<(), Box<dyn std::error::Error>> {
    let ws = load_workspace_cwd()?;
    let _lock = WorkspaceLock::acquire_default(&ws.meta_dir)?;

    let key = key.trim_end_matches('/');
    let parent = parent_key(key);
    let ext = &ws.config.notes.extension;
    let file_name = file_name_for(base_name(key), is_note, ext);
    let title = if is_note {
        note_title(&file_name, ext).unwrap_or_else(|| file_name.clone())
    } else {
        file_name.clone()
    };
    validate_name(siblings_under(&ws.tree, parent)?, None, &title)?;

    let new_key = join_key(parent, &file_name);
    let mut host = open_host(&ws);
    let op = if is_note {
        FsOp::MakeNote { key: new_key.clone() }
    } else {
        FsOp::MakeDir { key: new_key.clone() }
    };
    host.run(op)?;

    let node = if is_note {
        TreeNode::leaf(new_key.clone(), title)
    } else {
        TreeNode::folder(new_key.clone(), title, Vec::new())
    };
    let tree = tree_ops::insert_node(&ws.tree, parent, node)?;
    let mut state = load_state(&ws);
    refresh_order(&mut state, &tree, parent);
    state.reveal(&new_key);
    write_view_state(&ws.meta_dir, &state)?;

    println!("{}", new_key);
    Ok(())
}

fn cmd_write(args: WriteArgs) -> Result<(), Box<dyn std::error::Error>> {
    let ws = load_workspace_cwd()?;
    let node = require_node(&ws.tree, &args.key)?;
    if !node.is_leaf() {
        return Err(format!("not a note: {}", args.key).into());
    }

    let content = match args.text {
        Some(text) => text,
        None => {
            let mut buf = String::new();
            std::io::stdin().read_to_string(&mut buf)?;
            buf
        }
    };

    let _lock = WorkspaceLock::acquire_default(&ws.meta_dir)?;
    let mut host = open_host(&ws);
    host.run(FsOp::Write {
        key: args.key.clone(),
        content,
    })?;
    Ok(())
}

fn cmd_select(args: KeyArg) -> Result<(), Box<dyn std::error::Error>> {
    let ws = load_workspace_cwd()?;
    require_node(&ws.tree, &args.key)?;
    let _lock = WorkspaceLock::acquire_default(&ws.meta_dir)?;

    let mut state = load_state(&ws);
    state.reveal(&args.key);
    write_view_state(&ws.meta_dir, &state)?;
    println!("{}", args.key);
    Ok(())
}

// ---------------------------------------------------------------------------
// Maintenance
// ---------------------------------------------------------------------------

fn cmd_recovery(args: RecoveryCmd, json: bool) -> Result<(), Box<dyn std::error::Error>> {
    let ws = load_workspace_cwd()?;

    match args.action {
        None => {
            let entries = recovery::read_recovery_entries(&ws.meta_dir, Some(args.limit.unwrap_or(10)));
            if json {
                let values: Vec<_> = entries.iter().map(|e| e.to_json()).collect();
                return print_json(&values);
            }
            if entries.is_empty() {
                println!("No recovery entries.");
            }
            for entry in &entries {
                println!("{}", entry.to_markdown());
            }
        }
        Some(RecoveryAction::Path) => {
            println!("{}", recovery::recovery_log_path(&ws.meta_dir).display());
        }
        Some(RecoveryAction::Prune(prune)) => {
            let _lock = WorkspaceLock::acquire_default(&ws.meta_dir)?;
            let cutoff = if prune.all {
                None
            } else {
                Some(match prune.before.as_deref() {
                    Some(s) => parse_cutoff(s)?,
                    None => Utc::now() - chrono::Duration::days(PRUNE_AGE_DAYS),
                })
            };
            let removed = recovery::prune_recovery(&ws.meta_dir, cutoff)?;
            println!("Removed {} recovery entr{}", removed, if removed == 1 { "y" } else { "ies" });
        }
    }
    Ok(())
}

/// Accepts RFC 3339 or a bare `YYYY-MM-DD` (midnight UTC).
fn parse_cutoff(s: &str) -> Result<DateTime<Utc>, String> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
        .ok_or_else(|| format!("invalid timestamp '{}' (expected ISO-8601)", s))
}

fn cmd_config(args: ConfigCmd, json: bool) -> Result<(), Box<dyn std::error::Error>> {
    let ws = load_workspace_cwd()?;

    match args.action {
        ConfigAction::Show => {
            if json {
                print_json(&ws.config)?;
            } else {
                print!("{}", toml::to_string_pretty(&ws.config)?);
            }
        }
        ConfigAction::Set(set) => {
            let _lock = WorkspaceLock::acquire_default(&ws.meta_dir)?;
            let (_config, mut doc) = config_io::read_config(&ws.meta_dir)?;
            config_io::set_value(&mut doc, &set.key, &set.value)?;
            config_io::write_config(&ws.meta_dir, &doc)?;
            println!("{} = {}", set.key, set.value);
        }
    }
    Ok(())
}
