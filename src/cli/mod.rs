//! Command-line interface for tasklink
//!
//! This module defines the CLI structure using clap derive macros.
//! Each group of subcommands is implemented in its own submodule.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::address::{FileAddressBar, UrlSynchronizer};
use crate::config::Config;
use crate::error::{Error, Result};
use crate::kv::FileStore;
use crate::output::OutputOptions;
use crate::persistence::Persistence;
use crate::session::Session;

mod share;
mod task;
mod theme;

/// File holding the last published link inside the store directory
const ADDRESS_FILE: &str = "address";

/// tasklink - a to-do list you can share as a link
///
/// Tasks are kept in a local store; every change is mirrored into a share
/// link that carries the whole list.
#[derive(Parser, Debug)]
#[command(name = "tasklink")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Store directory (defaults to the platform data directory)
    #[arg(long, global = true, env = "TASKLINK_STORE")]
    pub store: Option<PathBuf>,

    /// Configuration file (defaults to <store>/tasklink.toml)
    #[arg(long, global = true, env = "TASKLINK_CONFIG")]
    pub config: Option<PathBuf>,

    /// Output in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Add a task
    Add {
        /// Task text
        #[arg(required = true, num_args = 1..)]
        text: Vec<String>,
    },

    /// Mark a task as done
    Check {
        /// Task id or unique id prefix
        id: String,
    },

    /// Mark a task as not done
    Uncheck {
        /// Task id or unique id prefix
        id: String,
    },

    /// Flip a task between done and not done
    Toggle {
        /// Task id or unique id prefix
        id: String,
    },

    /// Remove a task
    #[command(alias = "remove")]
    Rm {
        /// Task id or unique id prefix
        id: String,
    },

    /// List tasks, oldest first
    #[command(alias = "ls")]
    List,

    /// Print the current share link
    Link,

    /// Print the share payload for the current list
    Export,

    /// Open a link; share data in it replaces the local list
    Open {
        /// Page address, typically a share link
        url: String,
    },

    /// Replace the local list with a share payload
    Import {
        /// Encoded share payload
        payload: String,
    },

    /// Show or change the color theme
    Theme {
        #[command(subcommand)]
        command: Option<ThemeCommands>,
    },
}

/// Theme subcommands
#[derive(Subcommand, Debug)]
pub enum ThemeCommands {
    /// Show the current theme
    Show,

    /// Set the theme
    Set {
        /// light or dark
        theme: String,
    },

    /// Switch between light and dark
    Toggle,
}

/// Where the CLI keeps its state, resolved from flags and environment
#[derive(Debug, Clone)]
pub struct Context {
    pub store_dir: PathBuf,
    pub config: Config,
    pub output: OutputOptions,
}

impl Context {
    fn resolve(cli: &Cli) -> Result<Self> {
        let store_dir = match &cli.store {
            Some(dir) => dir.clone(),
            None => default_store_dir()?,
        };
        let config = match &cli.config {
            Some(path) => Config::load(path)?,
            None => Config::load_from_store(&store_dir),
        };
        Ok(Self {
            store_dir,
            config,
            output: OutputOptions {
                json: cli.json,
                quiet: cli.quiet,
            },
        })
    }

    /// Take ownership of the store and run the load path.
    ///
    /// Every run starts as a visit to the bare page, so the local store is
    /// what loads; `open` and `import` navigate to share data from there.
    pub fn open_session(&self) -> Result<Session> {
        let kv = FileStore::open(&self.store_dir, self.config.storage.lock_timeout_ms)?;
        let base = self.config.base_url()?;
        let bar = FileAddressBar::new(self.store_dir.join(ADDRESS_FILE), base.clone());
        let mut address = UrlSynchronizer::new(Box::new(bar), self.config.share.max_url_len);
        address.navigate(&base)?;
        Session::open(Persistence::new(Box::new(kv)), address)
    }
}

fn default_store_dir() -> Result<PathBuf> {
    directories::ProjectDirs::from("", "", "tasklink")
        .map(|dirs| dirs.data_dir().to_path_buf())
        .ok_or_else(|| {
            Error::InvalidArgument(
                "no home directory found; pass --store or set TASKLINK_STORE".to_string(),
            )
        })
}

impl Cli {
    /// Execute the CLI command
    pub fn run(self) -> Result<()> {
        let ctx = Context::resolve(&self)?;
        tracing::debug!(store = %ctx.store_dir.display(), "store resolved");

        match self.command {
            Commands::Add { text } => task::run_add(&ctx, &text.join(" ")),
            Commands::Check { id } => task::run_set_checked(&ctx, &id, Some(true)),
            Commands::Uncheck { id } => task::run_set_checked(&ctx, &id, Some(false)),
            Commands::Toggle { id } => task::run_set_checked(&ctx, &id, None),
            Commands::Rm { id } => task::run_remove(&ctx, &id),
            Commands::List => task::run_list(&ctx),
            Commands::Link => share::run_link(&ctx),
            Commands::Export => share::run_export(&ctx),
            Commands::Open { url } => share::run_open(&ctx, &url),
            Commands::Import { payload } => share::run_import(&ctx, &payload),
            Commands::Theme { command } => match command.unwrap_or(ThemeCommands::Show) {
                ThemeCommands::Show => theme::run_show(&ctx),
                ThemeCommands::Set { theme } => theme::run_set(&ctx, &theme),
                ThemeCommands::Toggle => theme::run_toggle(&ctx),
            },
        }
    }
}
