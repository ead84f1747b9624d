use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use gridlock_core::schema::TableKind;
use gridlock_core::table::ChatRole;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// TOML client configuration
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Grid server base URL
    #[arg(long, global = true)]
    pub server: Option<String>,

    /// Store id or share link
    #[arg(long, global = true)]
    pub store: Option<String>,

    /// Lock-holder identity
    #[arg(long, global = true)]
    pub identity: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum StoreLayout {
    /// user_docs, user_tags and user_chats
    User,
    /// user_info
    Directory,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create an empty store on the server
    CreateStore,

    /// Create the built-in tables of a store
    Provision {
        #[arg(value_enum)]
        layout: StoreLayout,

        /// Clear and rewrite tables that already exist
        #[arg(long)]
        reset: bool,
    },

    /// Print the records of a table
    Fetch {
        #[arg(value_parser = parse_table)]
        table: TableKind,
    },

    /// Append a record (no lock is taken)
    Insert {
        #[arg(value_parser = parse_table)]
        table: TableKind,

        /// One value per schema column
        values: Vec<String>,
    },

    /// Set one column on every record whose key column matches
    ///
    /// Records are located after the table lock is taken.
    Update {
        #[arg(value_parser = parse_table)]
        table: TableKind,

        column: String,

        value: String,

        /// Column holding the record keys, e.g. `_fileId`
        #[arg(short, long)]
        by: String,

        /// Key values to match
        #[arg(short, long = "key", required = true)]
        keys: Vec<String>,
    },

    /// Delete every record whose key column matches
    Delete {
        #[arg(value_parser = parse_table)]
        table: TableKind,

        /// Column holding the record keys, e.g. `_tagId`
        #[arg(short, long)]
        by: String,

        /// Key values to match
        #[arg(required = true)]
        keys: Vec<String>,
    },

    /// Inspect or change a table lock
    Lock {
        #[command(subcommand)]
        action: LockAction,
    },

    /// Create a tag
    AddTag { name: String },

    /// Delete tags and move their documents to the default tag
    DeleteTags {
        #[arg(required = true)]
        names: Vec<String>,
    },

    /// Change document tags, given as FILE_ID=TAG
    Retag {
        #[arg(required = true, value_parser = parse_pair)]
        changes: Vec<(String, String)>,
    },

    /// Record a summarized document
    RecordDoc {
        file_name: String,
        summary: String,

        #[arg(long, default_value = "default")]
        tag: String,
    },

    /// Delete documents by file id
    DeleteDocs {
        #[arg(required = true)]
        file_ids: Vec<String>,
    },

    /// Append a chat message
    Chat {
        file_id: String,

        #[arg(value_parser = parse_role)]
        role: ChatRole,

        content: String,

        #[arg(long)]
        model: Option<String>,
    },

    /// Print the chat history of a document
    History { file_id: String },

    /// Register an account in the directory store and provision its data store
    Register {
        username: String,
        user_id: String,
        email: String,
        password_hash: String,
        /// Share link or id of the user's data store
        database_url: String,
    },

    /// Remove an account from the directory store
    Deregister { user_id: String },
}

#[derive(Subcommand)]
pub enum LockAction {
    /// Wait for and take the lock
    Acquire {
        #[arg(value_parser = parse_table)]
        table: TableKind,
    },
    /// Give the lock back
    Release {
        #[arg(value_parser = parse_table)]
        table: TableKind,
    },
    /// Show the current holder
    Status {
        #[arg(value_parser = parse_table)]
        table: TableKind,
    },
    /// Force the lock cell back to unlocked
    Reset {
        #[arg(value_parser = parse_table)]
        table: TableKind,
    },
}

fn parse_table(s: &str) -> Result<TableKind, String> {
    s.parse().map_err(|e: gridlock_core::GridError| e.to_string())
}

fn parse_role(s: &str) -> Result<ChatRole, String> {
    s.parse().map_err(|e: gridlock_core::GridError| e.to_string())
}

fn parse_pair(s: &str) -> Result<(String, String), String> {
    s.split_once('=')
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .ok_or_else(|| format!("expected FILE_ID=TAG, got '{}'", s))
}
