//! Finchat — tool-augmented financial chat assistant.
//!
//! Usage:
//!   finchat chat                 Interactive session
//!   finchat ask <TEXT...>        One question, one answer
//!   finchat tools                Print the advertised tool schemas
//!   finchat call <NAME> [ARGS]   Run a single tool directly
//!   finchat setup                Run the setup wizard

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use std::path::Path;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use finchat::agent::{ConversationStore, Orchestrator, Session};
use finchat::config::{self, FinchatConfig};
use finchat::llm::InferenceClient;
use finchat::tools::ToolRegistry;
use finchat::types::*;

// ---------------------------------------------------------------------------
// CLI definition
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(name = "finchat")]
#[command(version)]
#[command(about = "Tool-augmented chat assistant for financial questions")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to the finchat home directory (default: ~/.finchat).
    #[arg(long)]
    home: Option<String>,

    /// Log level (debug, info, warn, error). Overrides `log_level` in the config.
    #[arg(long)]
    log_level: Option<String>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Start an interactive chat session.
    Chat,

    /// Ask a single question and print the answer.
    Ask {
        #[arg(required = true, num_args = 1..)]
        text: Vec<String>,
    },

    /// Print the tools advertised to the model.
    Tools,

    /// Call one tool directly, bypassing the model.
    Call {
        name: String,
        /// Arguments as a JSON object.
        args: Option<String>,
    },

    /// Run the first-time setup wizard.
    Setup,
}

const EXAMPLE_PROMPTS: [&str; 6] = [
    "Calculate 25 + 37",
    "Is 97 a prime number?",
    "What's the current price of Bitcoin?",
    "Show me the latest tech news",
    "What's the DCF valuation for AAPL?",
    "Convert 100 USD to EUR",
];

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let home_dir = cli
        .home
        .as_deref()
        .map(config::resolve_home)
        .unwrap_or_else(config::default_home_dir);
    let config_path = home_dir.join(config::CONFIG_FILE);
    let cfg = config::load_config(&config_path)
        .with_context(|| format!("Failed to load config from {}", config_path.display()))?
        .with_env_overrides();

    // Logs go to stderr so the transcript on stdout stays clean
    let level = cfg.log_level_or(cli.log_level.as_deref());
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
    debug!("Home directory: {}", home_dir.display());

    match cli.command {
        Commands::Setup => cmd_setup(&home_dir),
        Commands::Chat => cmd_chat(&cfg).await,
        Commands::Ask { text } => cmd_ask(&cfg, &text.join(" ")).await,
        Commands::Tools => cmd_tools(&cfg),
        Commands::Call { name, args } => cmd_call(&cfg, &name, args.as_deref()).await,
    }
}

// ---------------------------------------------------------------------------
// Command implementations
// ---------------------------------------------------------------------------

fn cmd_setup(home_dir: &Path) -> Result<()> {
    finchat::setup::run_setup_wizard(home_dir)?;
    Ok(())
}

async fn cmd_chat(config: &FinchatConfig) -> Result<()> {
    warn_missing_model_key(config);
    let session = Session::new(Arc::new(build_orchestrator(config)));

    print_welcome(config);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();

    loop {
        stdout.write_all(b"\n> ").await?;
        stdout.flush().await?;

        let line = tokio::select! {
            line = lines.next_line() => line.context("Failed to read stdin")?,
            _ = tokio::signal::ctrl_c() => None,
        };
        let Some(line) = line else { break };
        let input = line.trim();

        match input {
            "" => continue,
            "/quit" | "/exit" => break,
            "/clear" => {
                session.clear_session();
                println!("{}", "Conversation cleared.".dimmed());
                continue;
            }
            "/history" => {
                print_history(&session.history());
                continue;
            }
            "/tools" => {
                for spec in session.orchestrator().registry().specs() {
                    println!("  {} {}", spec.name.cyan().bold(), spec.description.dimmed());
                }
                continue;
            }
            _ => {}
        }

        println!("{}", "thinking...".dimmed().italic());
        let result = tokio::select! {
            result = session.send_message(input) => Some(result),
            _ = tokio::signal::ctrl_c() => None,
        };

        match result {
            Some(Ok(Some(turn))) => print_turn(&turn),
            Some(Ok(None)) => {}
            Some(Err(e)) => eprintln!("{} {}", "Error:".red().bold(), e),
            None => {
                session.clear_session();
                println!("{}", "Interrupted; conversation cleared.".yellow());
            }
        }
        debug!("Session usage: {} tokens", session.usage().total_tokens);
    }

    println!("{}", "Goodbye.".dimmed());
    Ok(())
}

async fn cmd_ask(config: &FinchatConfig, text: &str) -> Result<()> {
    warn_missing_model_key(config);
    let orchestrator = build_orchestrator(config);
    let mut store = ConversationStore::new();
    let cancel = CancellationToken::new();

    let reply = tokio::select! {
        reply = orchestrator.handle(&mut store, text, &cancel) => reply?,
        _ = tokio::signal::ctrl_c() => bail!("Interrupted"),
    };

    match reply {
        Some(turn) => print_turn(&turn),
        None => bail!("Nothing to ask"),
    }
    Ok(())
}

fn cmd_tools(config: &FinchatConfig) -> Result<()> {
    let registry = ToolRegistry::new(config);

    let schemas: Vec<serde_json::Value> = registry
        .specs()
        .iter()
        .map(|spec| {
            serde_json::json!({
                "name": spec.name,
                "description": spec.description,
                "parameters": spec.json_schema(),
            })
        })
        .collect();
    println!("{}", serde_json::to_string_pretty(&schemas)?);
    Ok(())
}

async fn cmd_call(config: &FinchatConfig, name: &str, args: Option<&str>) -> Result<()> {
    let registry = ToolRegistry::new(config);

    let arguments = match args {
        Some(raw) => serde_json::from_str(raw).context("Arguments must be valid JSON")?,
        None => serde_json::Value::Null,
    };
    let invocation = ToolInvocation {
        id: format!("call_{}", ulid::Ulid::new()),
        name: name.to_string(),
        arguments,
    };

    let outcome = registry.execute(&invocation).await;
    print_outcome(&outcome);
    if !outcome.is_success() {
        bail!("Tool {} failed", name);
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn warn_missing_model_key(config: &FinchatConfig) {
    if !config.model_api_key.is_set() {
        eprintln!(
            "{} No model API key configured. Run `finchat setup` or set {}.",
            "Warning:".yellow().bold(),
            config::schema::ENV_MODEL_API_KEY
        );
    }
}

fn build_orchestrator(config: &FinchatConfig) -> Orchestrator {
    let model = Arc::new(InferenceClient::from_config(config));
    let registry = Arc::new(ToolRegistry::new(config));
    Orchestrator::from_config(config, model, registry)
}

fn print_welcome(config: &FinchatConfig) {
    println!();
    let title = format!("=== {} ===", config.name);
    println!("{} (model: {})", title.bold(), config.inference_model);
    println!();
    println!("Try asking:");
    for example in EXAMPLE_PROMPTS {
        println!("  {} {}", "•".cyan(), example);
    }
    println!();
    println!("{}", "Commands: /clear /history /tools /quit".dimmed());
}

fn print_turn(turn: &Turn) {
    for outcome in &turn.tool_results {
        print_outcome(outcome);
    }
    println!("{}", turn.content);
}

fn print_outcome(outcome: &ToolOutcome) {
    match &outcome.output {
        ToolOutput::Result(value) => {
            let body = serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string());
            println!("{} {}", "[tool]".green().bold(), outcome.name.bold());
            println!("{}", body.dimmed());
        }
        ToolOutput::Error(message) => {
            println!("{} {}: {}", "[tool]".red().bold(), outcome.name.bold(), message.red());
        }
    }
}

fn print_history(turns: &[Turn]) {
    if turns.is_empty() {
        println!("{}", "No messages yet.".dimmed());
        return;
    }
    for turn in turns {
        let label = match turn.role {
            Role::User => "you".blue().bold(),
            Role::Assistant => "assistant".green().bold(),
        };
        let tools = if turn.has_tool_activity() {
            format!(" [{} tool call(s)]", turn.tool_calls.len())
        } else {
            String::new()
        };
        println!(
            "{} {}{}: {}",
            turn.timestamp.format("%H:%M:%S").to_string().dimmed(),
            label,
            tools.dimmed(),
            turn.content
        );
    }
}
