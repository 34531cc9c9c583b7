use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

#[derive(Parser)]
#[command(name = "kept")]
#[command(about = "Notes, files, and events that keep working offline")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Optional path to local database file
    #[arg(long, global = true, value_name = "PATH")]
    pub db_path: Option<PathBuf>,

    /// CLI profile name
    #[arg(long, global = true, value_name = "NAME")]
    pub profile: Option<String>,

    /// Work from the local cache and queue writes for a later `kept sync`
    #[arg(long, global = true)]
    pub offline: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Manage notes
    Notes {
        #[command(subcommand)]
        command: NoteCommands,
    },
    /// Manage calendar events
    Events {
        #[command(subcommand)]
        command: EventCommands,
    },
    /// Manage stored files
    Files {
        #[command(subcommand)]
        command: FileCommands,
    },
    /// Replay queued changes against the backend
    Sync,
    /// Show changes waiting to be synced
    Queue {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show connectivity, pending changes, and last sync time
    Status,
    /// Forget the local cache and every queued change
    Reset {
        /// Skip the confirmation guard
        #[arg(long)]
        yes: bool,
    },
    /// Configure CLI profiles
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
    /// Generate shell completion scripts
    Completions {
        /// Target shell
        #[arg(value_enum)]
        shell: CompletionShell,
        /// Optional output path (stdout when omitted)
        #[arg(short, long, value_name = "PATH")]
        output: Option<PathBuf>,
    },
}

#[derive(Args, Clone, Copy)]
pub struct ListArgs {
    /// Include archived records
    #[arg(long)]
    pub all: bool,
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Subcommand)]
pub enum NoteCommands {
    /// List notes
    List {
        #[command(flatten)]
        args: ListArgs,
    },
    /// Show one note
    Show {
        id: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Create a note
    #[command(alias = "new")]
    Add {
        title: String,
        /// Note body
        #[arg(short, long)]
        content: Option<String>,
    },
    /// Change a note's title or body
    Edit {
        id: String,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        content: Option<String>,
    },
    /// Archive a note
    Archive { id: String },
    /// Restore an archived note
    Restore { id: String },
    /// Delete a note
    Delete { id: String },
}

#[derive(Subcommand)]
pub enum EventCommands {
    /// List events
    List {
        #[command(flatten)]
        args: ListArgs,
    },
    /// Show one event and its next occurrence
    Show {
        id: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Create an event
    #[command(alias = "new")]
    Add {
        title: String,
        /// Date (YYYY-MM-DD) or RFC 3339 timestamp
        #[arg(long)]
        date: String,
        #[arg(long)]
        description: Option<String>,
        /// Repeat interval (none, daily, weekly, monthly, yearly)
        #[arg(long, default_value = "none")]
        repeat: String,
    },
    /// Change an event
    Edit {
        id: String,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        description: Option<String>,
        #[arg(long)]
        date: Option<String>,
        #[arg(long)]
        repeat: Option<String>,
    },
    /// Archive an event
    Archive { id: String },
    /// Restore an archived event
    Restore { id: String },
    /// Delete an event
    Delete { id: String },
}

#[derive(Subcommand)]
pub enum FileCommands {
    /// List files
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Upload a local file (needs a connection)
    Upload {
        path: PathBuf,
        /// Stored name (defaults to the file name)
        #[arg(long)]
        name: Option<String>,
        /// MIME type (guessed from the extension when omitted)
        #[arg(long)]
        mime: Option<String>,
    },
    /// Print a download URL for a stored file (needs a connection)
    Url { id: String },
    /// Rename a stored file
    Rename { id: String, name: String },
    /// Delete a stored file
    Delete { id: String },
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
pub enum CompletionShell {
    Bash,
    Zsh,
    Fish,
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Initialize or update profile config
    Init {
        /// Profile name to initialize
        #[arg(long, value_name = "NAME")]
        profile: Option<String>,
        /// Backend API base URL
        #[arg(long, value_name = "URL")]
        api_base_url: Option<String>,
        /// User whose records the CLI works with
        #[arg(long, value_name = "ID")]
        user_id: Option<String>,
        /// Bearer token sent to the backend
        #[arg(long, value_name = "TOKEN")]
        access_token: Option<String>,
        /// Replay attempts before a queued change is dropped
        #[arg(long, value_name = "N")]
        max_retries: Option<u32>,
        /// Keep current active profile instead of activating this one
        #[arg(long)]
        no_activate: bool,
    },
    /// Print the resolved profile
    Show {
        /// Profile name to show
        #[arg(long, value_name = "NAME")]
        profile: Option<String>,
    },
}
