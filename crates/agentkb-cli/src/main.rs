//! agentkb CLI - per-agent knowledge bases over your own documents

mod commands;

use clap::{Parser, Subcommand};
use colored::Colorize;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// agentkb - Grounded answers from each agent's own documents
#[derive(Parser)]
#[command(name = "agentkb")]
#[command(author = "Lalo Morales <lalomorales22@github.com>")]
#[command(version)]
#[command(about = "Grounded answers from each agent's own documents", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Use this config file instead of the default location
    #[arg(short, long, global = true, env = "AGENTKB_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize agentkb (create config, database and storage)
    Init,

    /// Manage configuration
    #[command(subcommand)]
    Config(ConfigCommands),

    /// Manage agents
    #[command(subcommand)]
    Agent(AgentCommands),

    /// Upload a document to an agent's knowledge base
    Upload {
        /// Agent name or ID
        agent: String,

        /// Path to a PDF, Word, Excel or PowerPoint file
        file: String,

        /// Queue the document and return without waiting for ingestion
        #[arg(short, long)]
        detach: bool,
    },

    /// Manage an agent's documents
    #[command(subcommand)]
    Docs(DocsCommands),

    /// Ask an agent a question
    Ask {
        /// Agent name or ID
        agent: String,

        /// Your question
        question: String,

        /// Hide source references
        #[arg(long)]
        no_sources: bool,
    },

    /// Show ingestion status
    Status {
        /// Only show runs of this agent (name or ID)
        #[arg(short, long)]
        agent: Option<String>,

        /// Filter by status (pending, processing, done, failed)
        #[arg(short, long)]
        status: Option<String>,
    },

    /// Ingest queued documents
    Process {
        /// Retry failed runs as well
        #[arg(long)]
        retry_failed: bool,
    },
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Show current configuration
    Show,

    /// Print the config file location
    Path,

    /// Set a configuration value
    Set {
        /// Configuration key (e.g., ollama.model)
        key: String,

        /// Value to set
        value: String,
    },
}

#[derive(Subcommand)]
enum AgentCommands {
    /// Create a new agent
    Create {
        /// Agent name
        name: String,

        /// System prompt the agent answers with
        #[arg(short, long)]
        prompt: String,
    },

    /// List all agents
    List,

    /// Show agent details
    Show {
        /// Agent name or ID
        agent: String,
    },

    /// Change an agent's name or system prompt
    Update {
        /// Agent name or ID
        agent: String,

        /// New name
        #[arg(short, long)]
        name: Option<String>,

        /// New system prompt
        #[arg(short, long)]
        prompt: Option<String>,
    },

    /// Delete an agent with all of its documents
    Delete {
        /// Agent name or ID
        agent: String,
    },
}

#[derive(Subcommand)]
enum DocsCommands {
    /// List an agent's documents
    List {
        /// Agent name or ID
        agent: String,
    },

    /// Delete a document and everything learned from it
    Delete {
        /// Agent name or ID
        agent: String,

        /// File name of the document
        file_name: String,
    },
}

fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("agentkb=debug,info"))
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("agentkb=info,warn"))
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = cli.config.as_deref();
    let result = match cli.command {
        Commands::Init => commands::init::run(config),
        Commands::Config(cmd) => match cmd {
            ConfigCommands::Show => commands::config::show(config),
            ConfigCommands::Path => commands::config::path(config),
            ConfigCommands::Set { key, value } => commands::config::set(config, &key, &value),
        },
        Commands::Agent(cmd) => match cmd {
            AgentCommands::Create { name, prompt } => {
                commands::agent::create(config, &name, &prompt)
            }
            AgentCommands::List => commands::agent::list(config),
            AgentCommands::Show { agent } => commands::agent::show(config, &agent),
            AgentCommands::Update {
                agent,
                name,
                prompt,
            } => commands::agent::update(config, &agent, name, prompt),
            AgentCommands::Delete { agent } => commands::agent::delete(config, &agent),
        },
        Commands::Upload {
            agent,
            file,
            detach,
        } => commands::upload::run(config, &agent, &file, detach),
        Commands::Docs(cmd) => match cmd {
            DocsCommands::List { agent } => commands::docs::list(config, &agent),
            DocsCommands::Delete { agent, file_name } => {
                commands::docs::delete(config, &agent, &file_name)
            }
        },
        Commands::Ask {
            agent,
            question,
            no_sources,
        } => commands::ask::run(config, &agent, &question, !no_sources),
        Commands::Status { agent, status } => commands::status::run(config, agent, status),
        Commands::Process { retry_failed } => commands::process::run(config, retry_failed),
    };

    if let Err(e) = result {
        eprintln!("{} {:#}", "Error:".red().bold(), e);
        std::process::exit(1);
    }
}
