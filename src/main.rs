mod cli;

use aimemo::config::AimemoConfig;
use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "aimemo", version, about = "MCP memory server for AI coding agents")]
struct Cli {
    /// Named memory context (e.g. 'work', 'personal')
    #[arg(long, global = true, default_value = "")]
    context: String,

    /// Config file (default: ~/.aimemo/config.toml)
    #[arg(long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Start the MCP server (stdio transport)
    Serve,
    /// Initialize project-local memory in the current directory
    Init,
    /// Add an entity with observations
    Add {
        name: String,
        entity_type: String,
        observations: Vec<String>,
        /// Tag (can be repeated)
        #[arg(long = "tag")]
        tags: Vec<String>,
    },
    /// Show details for a specific entity
    Get { name: String },
    /// List all entities in memory
    List {
        /// Filter by entity type
        #[arg(long = "type")]
        entity_type: Option<String>,
        /// Filter by tag (AND); can be repeated
        #[arg(long = "tag")]
        tags: Vec<String>,
        /// Max results
        #[arg(long, default_value_t = 50)]
        limit: i64,
        /// Sort: recent|accessed|name
        #[arg(long, default_value = "recent")]
        sort: String,
    },
    /// Search memory by full-text query
    Search {
        query: Option<String>,
        /// Filter by entity type
        #[arg(long = "type")]
        entity_type: Option<String>,
        /// Filter by tag (AND); can be repeated
        #[arg(long = "tag")]
        tags: Vec<String>,
        /// Max results
        #[arg(long)]
        limit: Option<i64>,
        /// Sort: recent|accessed|name
        #[arg(long, default_value = "recent")]
        sort: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Add an observation to an existing entity
    Observe { name: String, observation: String },
    /// Remove a specific observation from an entity
    Retract { name: String, observation: String },
    /// Soft-delete (or permanently delete) an entity
    Forget {
        name: String,
        /// Hard delete (irreversible)
        #[arg(long)]
        permanent: bool,
    },
    /// Create a typed relation between two entities
    Link {
        from: String,
        relation: String,
        to: String,
    },
    /// Append a timestamped journal entry
    Append {
        message: String,
        /// Tag (can be repeated)
        #[arg(long = "tag")]
        tags: Vec<String>,
    },
    /// Read journal entries
    Journal {
        /// Time window: 2h|24h|7d|ISO date
        #[arg(long, default_value = "24h")]
        since: String,
        /// Max entries
        #[arg(long, default_value_t = 50)]
        limit: i64,
    },
    /// Export memory to JSON or Markdown
    Export {
        /// Output format: json|markdown
        #[arg(long, default_value = "json")]
        format: String,
    },
    /// Import from knowledge-graph JSON or JSONL
    Import { file: String },
    /// Show memory statistics
    Stats,
    /// List all tags in use
    Tags,
    /// Check aimemo installation health
    Doctor,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Cli::parse();

    let config = match &args.config {
        Some(path) => AimemoConfig::load_from(path)?,
        None => AimemoConfig::load()?,
    };

    // Log to stderr so stdout stays clean for MCP JSON-RPC.
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.server.log_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let context = args.context.as_str();

    match args.command {
        Command::Serve => cli::serve(context, &config).await,
        Command::Init => cli::init::init(context),
        Command::Add {
            name,
            entity_type,
            observations,
            tags,
        } => cli::entity::add(context, &name, &entity_type, &observations, &tags),
        Command::Get { name } => cli::entity::get(context, &name),
        Command::List {
            entity_type,
            tags,
            limit,
            sort,
        } => cli::search::list(
            context,
            entity_type.as_deref(),
            &tags,
            limit.min(config.search.max_limit),
            &sort,
        ),
        Command::Search {
            query,
            entity_type,
            tags,
            limit,
            sort,
            json,
        } => cli::search::search(
            context,
            query.as_deref().unwrap_or(""),
            entity_type.as_deref(),
            &tags,
            limit
                .unwrap_or(config.search.default_limit)
                .min(config.search.max_limit),
            &sort,
            json,
        ),
        Command::Observe { name, observation } => cli::entity::observe(context, &name, &observation),
        Command::Retract { name, observation } => cli::entity::retract(context, &name, &observation),
        Command::Forget { name, permanent } => cli::entity::forget(context, &name, permanent),
        Command::Link { from, relation, to } => cli::entity::link(context, &from, &relation, &to),
        Command::Append { message, tags } => cli::journal::append(context, &message, &tags),
        Command::Journal { since, limit } => cli::journal::list(context, &since, limit),
        Command::Export { format } => cli::exchange::export(context, &format),
        Command::Import { file } => cli::exchange::import(context, &file),
        Command::Stats => cli::stats::stats(context),
        Command::Tags => cli::stats::tags(context),
        Command::Doctor => cli::doctor::doctor(context),
    }
}
