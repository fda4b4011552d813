//! filechat - chat with Claude about the files in a project
//!
//! Reads user messages from stdin, lets the model read, list, edit and create
//! files under the project directory, and prints the transcript.

mod console;

use anyhow::{Context, Result};
use clap::Parser;
use console::{ConsoleInput, ConsoleOutput};
use filechat_agent::{AgentLoop, AnthropicClient, Conversation, ToolRegistry};
use filechat_core::Config;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

/// Command line arguments
#[derive(Parser, Debug)]
#[command(name = "filechat", version, about = "Chat with Claude about your files")]
struct Args {
    /// Project directory the file tools operate in (defaults to the current directory)
    #[arg(long, value_name = "DIR")]
    project: Option<PathBuf>,

    /// Model to use, overriding the configuration file
    #[arg(long)]
    model: Option<String>,

    /// Stop after this many consecutive tool rounds without a final answer
    #[arg(long, value_name = "N")]
    max_tool_rounds: Option<u32>,

    /// Log agent activity to stderr
    #[arg(short, long)]
    verbose: bool,
}

/// Initialize tracing for logging
fn init_tracing(verbose: bool) {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    let default_filter = if verbose { "filechat=debug" } else { "filechat=warn" };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

/// Load the project configuration and apply command line overrides
fn load_config(args: &Args, project_root: &Path) -> Result<Config> {
    let mut config = Config::load(project_root)
        .with_context(|| format!("Failed to load configuration for {}", project_root.display()))?;

    if let Some(model) = &args.model {
        config.agent.model = model.clone();
    }
    if args.max_tool_rounds.is_some() {
        config.agent.max_tool_rounds = args.max_tool_rounds;
    }

    config.validate()?;
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    dotenvy::dotenv().ok();
    let args = Args::parse();
    init_tracing(args.verbose);

    let project_root = match &args.project {
        Some(path) => path.clone(),
        None => std::env::current_dir().context("Failed to determine current directory")?,
    };

    let config = load_config(&args, &project_root)?;
    let api_key = config.api.api_key()?;
    let client = AnthropicClient::from_config(&config, api_key)?;
    let registry = ToolRegistry::builtin()?.with_working_directory(&project_root);
    tracing::debug!("Registered tools: {}", registry.names().join(", "));

    let conversation = match &config.agent.system_prompt {
        Some(prompt) => Conversation::with_system_prompt(prompt.clone()),
        None => Conversation::new(),
    };

    tracing::info!(
        "Starting session with model {} in {}",
        client.model(),
        project_root.display()
    );

    let input = ConsoleInput::stdin().context("Failed to listen for Ctrl-C")?;
    let mut output = ConsoleOutput::stdout();
    output.banner();

    let mut agent = AgentLoop::with_conversation(
        client,
        registry,
        input,
        output,
        conversation,
    )
    .with_max_tool_rounds(config.agent.max_tool_rounds);

    let outcome = agent.run().await;
    tracing::info!("Session ended after {} turns", agent.conversation().len());

    match outcome {
        Ok(()) => Ok(ExitCode::SUCCESS),
        Err(e) => {
            tracing::debug!("Session stopped: {}", e);
            Ok(ExitCode::FAILURE)
        }
    }
}
