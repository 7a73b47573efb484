//! Command-line interface parsing and handling

pub mod chat;
pub mod model_list;
pub mod say;
pub mod session;

use std::error::Error;
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use crate::cli::chat::run_chat;
use crate::cli::model_list::list_models;
use crate::cli::say::run_say;
use crate::cli::session::Session;
use crate::core::client::{read_image, CompanionClient};
use crate::core::config::data::path_display;
use crate::core::config::{ApiProvider, Config, SettingsOverrides};
use crate::utils::logging::TranscriptLog;

const LONG_VERSION: &str = concat!(
    env!("CARGO_PKG_VERSION"),
    " (",
    env!("VERGEN_GIT_DESCRIBE"),
    ", ",
    env!("VERGEN_GIT_SHA"),
    ")\nbuilt ",
    env!("VERGEN_BUILD_TIMESTAMP"),
    " with rustc ",
    env!("VERGEN_RUSTC_SEMVER"),
);

#[derive(Parser)]
#[command(name = "aicompanion")]
#[command(version, long_version = LONG_VERSION)]
#[command(about = "Stream replies from Ollama or OpenAI-compatible chat APIs in the terminal")]
#[command(
    long_about = "aicompanion sends your prompts to a local Ollama server or an \
OpenAI-compatible API and prints the reply as it streams in.\n\n\
Configuration is read from config.toml in the platform config directory \
(override with --config).\n\n\
Environment Variables:\n\
  AICOMPANION_API_KEY   API key for the configured provider\n\
  OPENAI_API_KEY        Fallback key for the openai provider\n\
  RUST_LOG              Diagnostic log filter (default: warn)\n\n\
Chat commands:\n\
  /clear            Forget the conversation so far\n\
  /system <prompt>  Replace the system prompt\n\
  /bye              Quit (Ctrl+D also works)"
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Provider to use (ollama or openai)
    #[arg(short = 'p', long, global = true, value_name = "PROVIDER")]
    pub provider: Option<ApiProvider>,

    /// Model to use
    #[arg(short = 'm', long, global = true, value_name = "MODEL")]
    pub model: Option<String>,

    /// Read configuration from this file instead of the default location
    #[arg(short = 'c', long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Append the transcript to this file
    #[arg(short = 'l', long, global = true, value_name = "FILE")]
    pub log: Option<PathBuf>,

    /// Attach an image to the first prompt (repeatable)
    #[arg(long, global = true, value_name = "FILE")]
    pub image: Vec<PathBuf>,

    /// Use the single-prompt completion endpoint; no history is kept
    #[arg(long, global = true)]
    pub generate: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start an interactive chat (default)
    Chat,
    /// Send one prompt, print the reply and exit
    Say {
        /// The prompt text
        #[arg(trailing_var_arg = true, required = true)]
        prompt: Vec<String>,
    },
    /// List the models the provider can serve
    Models,
    /// Set a configuration value, e.g. `set model llama3.2`
    Set {
        /// Configuration key (provider, model, base-url, term-color, ...)
        key: String,
        /// Value to store; multiple words are joined with spaces
        #[arg(trailing_var_arg = true, allow_hyphen_values = true, required = true)]
        value: Vec<String>,
    },
}

pub fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();
    init_tracing();

    tokio::runtime::Runtime::new()?.block_on(async_main(args))
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    // A second initialisation (e.g. from tests) is harmless.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

async fn async_main(args: Args) -> Result<(), Box<dyn Error>> {
    let config_path = match &args.config {
        Some(path) => path.clone(),
        None => Config::get_config_path()?,
    };
    let mut config = Config::load_from_path(&config_path)?;
    let overrides = SettingsOverrides {
        provider: args.provider,
        model: args.model,
    };

    let command = args.command.unwrap_or(Commands::Chat);
    match &command {
        Commands::Set { key, value } => {
            let value = value.join(" ");
            config.set_value(key, &value)?;
            config.save_to_path(&config_path)?;
            println!("✅ Set {key} to: {value} ({})", path_display(&config_path));
            return Ok(());
        }
        Commands::Models => {
            let client = CompanionClient::new(config.resolve_for_listing(&overrides)?)?;
            return list_models(&client).await;
        }
        Commands::Chat | Commands::Say { .. } => {}
    }

    let settings = config.resolve(&overrides)?;

    let log = match &args.log {
        Some(path) => TranscriptLog::open(path)?,
        None => TranscriptLog::disabled(),
    };
    let images = args
        .image
        .iter()
        .map(|path| read_image(path))
        .collect::<Result<Vec<_>, _>>()?;

    let client = CompanionClient::new(settings)?;
    let session = Session::new(client, log, images, args.generate);

    match command {
        Commands::Say { prompt } => run_say(session, prompt.join(" ")).await,
        _ => run_chat(session).await,
    }
}
