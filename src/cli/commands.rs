use clap::{ArgGroup, Args, Parser, Subcommand};

#[derive(Parser)]
#[command(name = "nt", about = concat!("notetree v", env!("CARGO_PKG_VERSION"), " - notes as a tree of plain files"), version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Output as JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Run against a different workspace directory
    #[arg(short = 'C', long = "workspace-dir", global = true)]
    pub workspace_dir: Option<String>,

    /// More log output on stderr (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize a notetree workspace in the current directory
    Init(InitArgs),
    /// Print the note tree
    Tree,
    /// Move a note or folder relative to another entry
    Mv(MvArgs),
    /// Rename a note or folder
    Rename(RenameArgs),
    /// Move a note or folder to the workspace trash
    Rm(KeyArg),
    /// Create a folder
    Mkdir(KeyArg),
    /// Create an empty note
    New(KeyArg),
    /// Print a note
    Cat(KeyArg),
    /// Replace a note's content (reads stdin when no text is given)
    Write(WriteArgs),
    /// Show a folder's entries, most recently modified first
    Timeline(TimelineArgs),
    /// Select an entry and expand the folders above it
    Select(KeyArg),
    /// Print changes to notes and folders as they happen
    Watch,
    /// View or manage the recovery log
    Recovery(RecoveryCmd),
    /// Edit .notetree/config.toml
    Config(ConfigCmd),
}

// ---------------------------------------------------------------------------
// Init args
// ---------------------------------------------------------------------------

#[derive(Args)]
pub struct InitArgs {
    /// Workspace name (default: inferred from directory name)
    #[arg(long)]
    pub name: Option<String>,
}

// ---------------------------------------------------------------------------
// Tree edits
// ---------------------------------------------------------------------------

#[derive(Args)]
pub struct KeyArg {
    /// Entry key, relative to the workspace root (e.g. work/plan.md)
    pub key: String,
}

#[derive(Args)]
#[command(group(ArgGroup::new("placement").args(["position", "before", "after", "inside"])))]
pub struct MvArgs {
    /// Key of the entry being moved
    pub drag: String,
    /// Key of the entry it is dropped on
    pub drop: String,
    /// Drop offset: negative = before, 0 = inside, positive = after
    #[arg(long, allow_negative_numbers = true)]
    pub position: Option<i64>,
    /// Place before the drop target
    #[arg(long)]
    pub before: bool,
    /// Place after the drop target (default)
    #[arg(long)]
    pub after: bool,
    /// Place inside the drop target as its first child
    #[arg(long)]
    pub inside: bool,
    /// Overwrite a same-named note in the destination folder
    #[arg(long)]
    pub replace: bool,
    /// Show the result without touching the disk
    #[arg(long)]
    pub dry_run: bool,
}

impl MvArgs {
    /// The drop offset selected by the flags.
    pub fn offset(&self) -> i64 {
        if let Some(n) = self.position {
            n
        } else if self.before {
            -1
        } else if self.inside {
            0
        } else {
            1
        }
    }
}

#[derive(Args)]
pub struct RenameArgs {
    /// Entry key
    pub key: String,
    /// New name (notes get the configured extension added)
    pub name: String,
}

#[derive(Args)]
pub struct WriteArgs {
    /// Note key
    pub key: String,
    /// New content
    pub text: Option<String>,
}

// ---------------------------------------------------------------------------
// Read command args
// ---------------------------------------------------------------------------

#[derive(Args)]
pub struct TimelineArgs {
    /// Folder key (default: workspace root)
    pub folder: Option<String>,
    /// Maximum number of entries (default: timeline.limit from config)
    #[arg(long)]
    pub limit: Option<usize>,
}

// ---------------------------------------------------------------------------
// Recovery log
// ---------------------------------------------------------------------------

#[derive(Args)]
pub struct RecoveryCmd {
    #[command(subcommand)]
    pub action: Option<RecoveryAction>,
    /// Maximum number of entries to show (default: 10)
    #[arg(long)]
    pub limit: Option<usize>,
}

#[derive(Subcommand)]
pub enum RecoveryAction {
    /// Remove old entries
    Prune(RecoveryPruneArgs),
    /// Print the absolute path to the recovery log
    Path,
}

#[derive(Args)]
pub struct RecoveryPruneArgs {
    /// Remove entries older than this timestamp (default: 30 days ago)
    #[arg(long)]
    pub before: Option<String>,
    /// Remove all entries
    #[arg(long)]
    pub all: bool,
}

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

#[derive(Args)]
pub struct ConfigCmd {
    #[command(subcommand)]
    pub action: ConfigAction,
}

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Set a value, e.g. `nt config set timeline.preview_lines 5`
    Set(ConfigSetArgs),
    /// Print the effective configuration
    Show,
}

#[derive(Args)]
pub struct ConfigSetArgs {
    /// Dotted key (section.field)
    pub key: String,
    pub value: String,
}
