//! Command-line interface parsing and handling
//!
//! This module parses command-line arguments, sets up logging and the data
//! directory, and dispatches to the subcommand handlers.

pub mod catalog_list;
pub mod chat;
pub mod provider_list;
pub mod say;
pub mod sessions;
pub mod settings;
pub mod test_entry;

use std::error::Error;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, LazyLock};

use clap::{ArgAction, ArgGroup, Parser, Subcommand, ValueEnum};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use crate::core::backend::BackendMode;
use crate::core::catalog::{Catalog, Service};
use crate::core::config::{Config, ConfigError};
use crate::core::sessions::SessionStore;
use crate::core::settings::SettingsStore;
use crate::core::storage::{FileStorage, Storage, StorageError};

/// Environment variable holding the tracing filter directives.
pub const LOG_ENV: &str = "MCP_EXPLORER_LOG";

static LONG_VERSION: LazyLock<String> = LazyLock::new(|| {
    format!(
        "{} ({} {}, built {})",
        env!("CARGO_PKG_VERSION"),
        option_env!("VERGEN_GIT_DESCRIBE").unwrap_or("unknown"),
        option_env!("VERGEN_GIT_SHA").unwrap_or("unknown"),
        option_env!("VERGEN_BUILD_DATE").unwrap_or("unknown"),
    )
});

#[derive(Parser, Debug)]
#[command(name = "mcp-explorer")]
#[command(version, long_version = LONG_VERSION.as_str())]
#[command(about = "Browse MCP services and chat with them from the terminal")]
#[command(
    long_about = "MCP Explorer lists a catalog of MCP services and opens a streamed chat with \
any of them. Replies come from simulated services by default; --live sends them to the \
configured AI provider instead.\n\n\
Before chatting, set a provider, model and API key:\n\
  mcp-explorer settings set provider openai\n\
  mcp-explorer settings set model gpt-4o\n\
  mcp-explorer settings set api-key sk-...\n\n\
In a chat:\n\
  /file <PATH>      Attach a file to the next message\n\
  /new              Start a new chat with the same service\n\
  /log              Pause or resume the transcript log\n\
  /quit             Leave the chat\n\n\
Logging:\n\
  MCP_EXPLORER_LOG  Tracing filter (for example 'mcp_explorer=debug'); -v enables debug output"
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Commands,

    /// Directory holding settings, saved chats and test entries
    #[arg(long, global = true, value_name = "DIR")]
    pub data_dir: Option<PathBuf>,

    /// Send messages to the configured provider instead of the simulated services
    #[arg(long, global = true)]
    pub live: bool,

    /// Write the chat transcript to this file
    #[arg(short = 'l', long, global = true, value_name = "FILE")]
    pub log: Option<PathBuf>,

    /// Show debug output on stderr
    #[arg(short = 'v', long, global = true, action = ArgAction::Count)]
    pub verbose: u8,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List catalog services, optionally filtered by a search query
    List {
        /// Matches name, description or tags, ignoring case
        query: Vec<String>,
    },
    /// Chat with a service interactively
    Chat {
        /// Service identifier (see `list`)
        service: String,
        /// Resume a saved chat
        #[arg(long, value_name = "ID")]
        session: Option<String>,
        /// Attach a file to the first message
        #[arg(long, value_name = "PATH")]
        file: Option<PathBuf>,
    },
    /// Send one message to a service and print the streamed reply
    Say {
        /// Service identifier (see `list`)
        service: String,
        /// Attach a file to the message
        #[arg(long, value_name = "PATH")]
        file: Option<PathBuf>,
        /// Message text
        #[arg(required = true, trailing_var_arg = true, allow_hyphen_values = true)]
        prompt: Vec<String>,
    },
    /// Manage saved chats
    Sessions {
        #[command(subcommand)]
        command: SessionCommands,
    },
    /// Show or change provider settings
    Settings {
        #[command(subcommand)]
        command: SettingsCommands,
    },
    /// List supported providers and their models
    Providers,
    /// Manage user-defined test services
    TestEntry {
        #[command(subcommand)]
        command: TestEntryCommands,
    },
}

#[derive(Subcommand, Debug)]
pub enum SessionCommands {
    /// List saved chats, newest first
    List {
        /// Only chats with this service
        #[arg(long, value_name = "SERVICE")]
        service: Option<String>,
    },
    /// Print a saved chat
    Show { id: String },
    /// Delete a saved chat
    Delete { id: String },
    /// Delete every saved chat
    Clear,
    /// Export saved chats as JSON (a directory gets a dated file name; '-' prints)
    Export { path: Option<PathBuf> },
    /// Import chats from a JSON export, in front of the existing ones
    Import { path: PathBuf },
}

#[derive(Subcommand, Debug)]
pub enum SettingsCommands {
    /// Print the current settings
    Show,
    /// Change one setting
    Set {
        #[arg(value_enum)]
        key: SettingKey,
        value: String,
    },
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum SettingKey {
    Provider,
    Model,
    ApiKey,
    Language,
}

#[derive(Subcommand, Debug)]
pub enum TestEntryCommands {
    /// Add a test service reachable over SSE or stdio
    #[command(group(ArgGroup::new("transport").required(true).args(["url", "command"])))]
    Add {
        /// Display name
        #[arg(long)]
        name: String,
        /// SSE endpoint URL
        #[arg(long)]
        url: Option<String>,
        /// Command that starts a stdio server
        #[arg(long)]
        command: Option<String>,
        /// Argument for the stdio command (repeatable)
        #[arg(long = "arg", value_name = "ARG", allow_hyphen_values = true)]
        args: Vec<String>,
    },
}

/// Everything a subcommand needs: configuration, storage and backend mode.
pub struct CliContext {
    pub config: Config,
    pub data_dir: PathBuf,
    pub storage: Arc<dyn Storage>,
    pub mode: BackendMode,
    pub log_file: Option<PathBuf>,
}

impl CliContext {
    pub fn new(config: Config, args: &Args) -> Result<Self, ConfigError> {
        let data_dir = config.resolve_data_dir(args.data_dir.as_deref())?;
        let mode = if args.live {
            BackendMode::Live
        } else {
            config.backend_mode()
        };
        let mut context = Self::for_dir(config, &data_dir, mode);
        context.log_file = args.log.clone();
        Ok(context)
    }

    pub fn for_dir(config: Config, data_dir: &Path, mode: BackendMode) -> Self {
        Self {
            config,
            data_dir: data_dir.to_path_buf(),
            storage: Arc::new(FileStorage::new(data_dir)),
            mode,
            log_file: None,
        }
    }

    pub fn settings(&self) -> Result<SettingsStore, StorageError> {
        SettingsStore::load(self.storage.clone())
    }

    pub fn sessions(&self) -> Result<SessionStore, StorageError> {
        SessionStore::load(self.storage.clone())
    }

    pub fn catalog(&self) -> Result<Catalog, StorageError> {
        Catalog::load(self.storage.as_ref())
    }

    pub fn find_service(&self, id: &str) -> Result<Service, Box<dyn Error>> {
        let catalog = self.catalog()?;
        catalog.find(id).cloned().ok_or_else(|| {
            format!("Unknown service '{id}'. Run 'mcp-explorer list' to see available services.")
                .into()
        })
    }
}

/// Install the stderr tracing subscriber. `MCP_EXPLORER_LOG` wins when set;
/// otherwise `-v` selects debug output and the default is warnings only.
pub fn init_tracing(verbose: u8) {
    let default_directive = if verbose > 0 { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(default_directive));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .try_init();
}

pub fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();
    init_tracing(args.verbose);

    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(async_main(args))
}

async fn async_main(args: Args) -> Result<(), Box<dyn Error>> {
    let config = Config::load()?;
    let context = CliContext::new(config, &args)?;
    debug!(
        data_dir = %context.data_dir.display(),
        mode = %context.mode,
        "Starting"
    );

    let mut stdout = io::stdout();
    match args.command {
        Commands::List { query } => {
            catalog_list::list_services(&context, &query.join(" "), &mut stdout)
        }
        Commands::Chat {
            service,
            session,
            file,
        } => chat::run_chat(&context, &service, session, file).await,
        Commands::Say {
            service,
            file,
            prompt,
        } => say::run_say(&context, &service, &prompt.join(" "), file.as_deref()).await,
        Commands::Sessions { command } => {
            sessions::run_sessions_command(&context, command, &mut stdout)
        }
        Commands::Settings { command } => {
            let show_config = matches!(command, SettingsCommands::Show);
            settings::run_settings_command(&context, command, &mut stdout)?;
            if show_config {
                println!();
                context.config.print_all();
            }
            Ok(())
        }
        Commands::Providers => provider_list::list_providers(&context, &mut stdout),
        Commands::TestEntry { command } => {
            test_entry::run_test_entry_command(&context, command, &mut stdout)
        }
    }
}
