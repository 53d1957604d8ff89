use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, ValueEnum};
use serde::Serialize;
use tracing_subscriber::EnvFilter;

use leadsplit::auth::bootstrap_admin;
use leadsplit::config::{AdminCredentials, AppConfig, CommitConfig};
use leadsplit::distribution::partition;
use leadsplit::http::{self, AppState};
use leadsplit::ingest::{parse_leads, UploadFormat};
use leadsplit::roster::{AgentId, MemoryRoster};
use leadsplit::shutdown;

#[derive(Parser, Debug)]
#[command(name = "leadsplit")]
#[command(version)]
#[command(about = "Lead distribution service: split uploaded contact sheets across the agent roster")]
#[command(propagate_version = true)]
struct Args {
    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Start the leadsplit HTTP server
    Serve(ServeArgs),

    /// Dry-run a distribution: parse a local file and show how it would
    /// split across a given number of agents, without writing anything
    Plan(PlanArgs),
}

#[derive(Parser, Debug)]
struct ServeArgs {
    /// Port to listen on
    #[arg(long, default_value = "5000")]
    port: u16,

    /// Maximum number of concurrent per-agent commit writes
    #[arg(long, default_value = "8")]
    commit_concurrency: usize,

    /// Timeout for one per-agent commit attempt, in milliseconds
    #[arg(long, default_value = "5000")]
    commit_timeout_ms: u64,
}

#[derive(Parser, Debug)]
struct PlanArgs {
    /// Path to the lead sheet (.csv, .xls, or .xlsx)
    #[arg(long)]
    file: PathBuf,

    /// Number of agents to plan for
    #[arg(long)]
    agents: usize,

    /// Output format
    #[arg(long, short = 'o', default_value = "table")]
    output: OutputFormat,
}

#[derive(Debug, Clone, ValueEnum)]
enum OutputFormat {
    Table,
    Json,
}

#[derive(Debug, Serialize)]
struct PlanOutput {
    total_records: usize,
    agent_count: usize,
    per_agent_counts: Vec<usize>,
    skipped_rows: Vec<String>,
}

async fn run_serve(args: ServeArgs) -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = AppConfig {
        listen_addr: format!("0.0.0.0:{}", args.port).parse::<SocketAddr>()?,
        admin: AdminCredentials::from_env(),
        commit: CommitConfig {
            concurrency: args.commit_concurrency,
            timeout: Duration::from_millis(args.commit_timeout_ms),
            ..CommitConfig::default()
        },
    };

    let shutdown_token = shutdown::install_shutdown_handler();
    let roster = Arc::new(MemoryRoster::new());
    let state = AppState::new(roster, &config, shutdown_token.clone());

    bootstrap_admin(&state.auth, config.admin.as_ref()).await;

    tracing::info!(
        listen_addr = %config.listen_addr,
        commit_concurrency = config.commit.concurrency,
        "Starting leadsplit"
    );

    http::serve(config.listen_addr, state, shutdown_token).await?;
    Ok(())
}

/// The whole dry run — format detection, parse, partition — separated from
/// printing so the counts can be checked against the partition function.
fn compute_plan(
    bytes: &[u8],
    filename: Option<&str>,
    agents: usize,
) -> Result<PlanOutput, Box<dyn std::error::Error>> {
    let format = UploadFormat::from_declared(None, filename)?;
    let outcome = parse_leads(bytes, format)?;
    let total = outcome.records.len();

    let agent_ids: Vec<AgentId> = (0..agents).map(|_| AgentId::new()).collect();
    let plan = partition(outcome.records, &agent_ids)?;

    Ok(PlanOutput {
        total_records: total,
        agent_count: agents,
        per_agent_counts: plan.iter().map(|(_, slice)| slice.len()).collect(),
        skipped_rows: outcome
            .skipped
            .iter()
            .map(|s| format!("row {}: {}", s.row, s.message))
            .collect(),
    })
}

fn run_plan(args: PlanArgs) -> Result<(), Box<dyn std::error::Error>> {
    let bytes = std::fs::read(&args.file)?;
    let filename = args.file.file_name().and_then(|n| n.to_str());
    let output = compute_plan(&bytes, filename, args.agents)?;

    match args.output {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        OutputFormat::Table => {
            println!("{} records from {}", output.total_records, args.file.display());
            println!("{:<8} LEADS", "AGENT");
            println!("{}", "-".repeat(20));
            for (i, count) in output.per_agent_counts.iter().enumerate() {
                println!("{:<8} {}", i + 1, count);
            }
            if !output.skipped_rows.is_empty() {
                println!();
                println!("Skipped rows:");
                for skip in &output.skipped_rows {
                    println!("  {}", skip);
                }
            }
        }
    }
    Ok(())
}


#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    match args.command {
        Commands::Serve(serve_args) => run_serve(serve_args).await?,
        Commands::Plan(plan_args) => run_plan(plan_args)?,
    }

    Ok(())
}
