//! Lookout CLI
//!
//! Command-line interface for the Lookout MCP server: search logs and
//! traces, run aggregations and call any tool directly.

mod commands;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use commands::McpClient;

#[derive(Parser)]
#[command(name = "lookout")]
#[command(about = "CLI tool for the Lookout telemetry tools")]
#[command(version)]
struct Cli {
    /// MCP server URL
    #[arg(
        long,
        env = "LOOKOUT_SERVER_URL",
        default_value = "http://localhost:8000"
    )]
    server_url: String,

    /// API key forwarded to the backend
    #[arg(long, env = "LOOKOUT_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Output format
    #[arg(long, short, default_value = "table")]
    format: OutputFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
enum OutputFormat {
    Table,
    Json,
    Compact,
}

#[derive(Subcommand)]
enum Commands {
    /// List the tools the server offers
    Tools,

    /// Call a tool with key=value parameters
    Call {
        /// Tool name, e.g. search_logs
        tool: String,

        /// Parameter as key=value; values that parse as JSON are sent as JSON
        #[arg(long = "param", short = 'p', value_name = "KEY=VALUE")]
        params: Vec<String>,
    },

    /// Search and summarize logs
    Logs {
        #[command(subcommand)]
        command: LogsCommands,
    },

    /// Search and aggregate traces
    Traces {
        #[command(subcommand)]
        command: TracesCommands,
    },

    /// Show server and backend status
    Status,
}

#[derive(Subcommand)]
enum LogsCommands {
    /// Search logs, newest first
    Search {
        /// Text the log body must contain
        text: Option<String>,

        /// Relative window, e.g. 30m, 2h, 7d
        #[arg(long, short = 't', default_value = "1h")]
        time_range: String,

        /// Severity text, e.g. ERROR
        #[arg(long, short = 's')]
        severity: Option<String>,

        /// Filter by service name
        #[arg(long)]
        service: Option<String>,

        /// Extra filter expression
        #[arg(long)]
        filter: Option<String>,

        /// Maximum results
        #[arg(long, short = 'n', default_value = "50")]
        limit: u32,
    },

    /// Count error logs per service
    Errors {
        /// Relative window, e.g. 30m, 2h, 7d
        #[arg(long, short = 't', default_value = "24h")]
        time_range: String,

        /// Number of services to show
        #[arg(long, short = 'n', default_value = "10")]
        limit: u32,
    },
}

#[derive(Subcommand)]
enum TracesCommands {
    /// Search spans, newest first
    Search {
        /// Relative window, e.g. 30m, 2h, 7d
        #[arg(long, short = 't', default_value = "1h")]
        time_range: String,

        /// Filter by service name
        #[arg(long)]
        service: Option<String>,

        /// Span name
        #[arg(long)]
        operation: Option<String>,

        /// Only error spans
        #[arg(long)]
        errors: bool,

        /// Maximum results
        #[arg(long, short = 'n', default_value = "50")]
        limit: u32,
    },

    /// Aggregate spans, e.g. p99 of duration_nano by service.name
    Aggregate {
        /// Aggregation, e.g. count, avg, p99
        aggregation: String,

        /// Field to aggregate
        #[arg(long = "on")]
        aggregate_on: Option<String>,

        /// Comma-separated group-by fields
        #[arg(long, short = 'g')]
        group_by: Option<String>,

        /// Order expression with optional asc/desc
        #[arg(long)]
        order_by: Option<String>,

        /// Relative window, e.g. 30m, 2h, 7d
        #[arg(long, short = 't', default_value = "1h")]
        time_range: String,

        /// Filter by service name
        #[arg(long)]
        service: Option<String>,

        /// Number of groups
        #[arg(long, short = 'n', default_value = "10")]
        limit: u32,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let client = McpClient::new(&cli.server_url, cli.api_key.as_deref());

    match cli.command {
        Commands::Tools => {
            commands::tools::list(&client, cli.format).await?;
        }
        Commands::Call { tool, params } => {
            commands::tools::call(&client, &tool, &params, cli.format).await?;
        }
        Commands::Logs { command } => {
            commands::logs::handle(&client, command, cli.format).await?;
        }
        Commands::Traces { command } => {
            commands::traces::handle(&client, command, cli.format).await?;
        }
        Commands::Status => {
            commands::status::handle(&client, cli.format).await?;
        }
    }

    Ok(())
}
