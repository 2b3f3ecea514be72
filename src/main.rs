use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod activity;
mod config;
mod engage;
mod error;
mod export;
mod import;
mod models;
mod queue;
mod report;
mod sanitize;
mod server;
mod store;
mod supervisor;
mod templates;
mod update;

use config::Config;
use server::Tool;

#[derive(Parser)]
#[command(name = "prospect-tracker")]
#[command(about = "LinkedIn prospect warming and outreach tracker", long_about = None)]
struct Cli {
    /// TOML config listing the tools to run
    #[arg(short, long, global = true, default_value = "prospect-tracker.toml")]
    config: PathBuf,

    /// Overrides `data_dir` from the config file
    #[arg(long, global = true, env = "PROSPECT_DATA_DIR")]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve one tool's dashboard and API
    Serve {
        /// Segment key from the config (defaults to the first one)
        #[arg(long)]
        segment: Option<String>,
    },
    /// Run every configured tool as a child process
    StartAll,
    /// Import prospects from a CSV file
    Import {
        #[arg(long)]
        segment: Option<String>,
        #[arg(long)]
        csv: PathBuf,
    },
    /// List today's warming queue
    Queue {
        #[arg(long)]
        segment: Option<String>,
        #[arg(long, default_value_t = 10)]
        limit: usize,
    },
    /// Generate a markdown pipeline report
    Report {
        #[arg(long)]
        segment: Option<String>,
        #[arg(long, default_value = "report.md")]
        out: PathBuf,
    },
    /// Export all prospects as CSV
    Export {
        #[arg(long)]
        segment: Option<String>,
        #[arg(long, default_value = "prospects.csv")]
        out: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive("prospect_tracker=info".parse()?),
        )
        .init();

    let cli = Cli::parse();
    let mut config = Config::load(&cli.config)?;
    if let Some(data_dir) = cli.data_dir {
        config.data_dir = data_dir;
    }

    match cli.command {
        Commands::Serve { segment } => {
            let segment = config.segment(segment.as_deref())?.clone();
            server::serve(&config, segment).await?;
        }
        Commands::StartAll => {
            supervisor::start_all(&cli.config, &config).await?;
        }
        Commands::Import { segment, csv } => {
            let tool = Tool::new(&config, config.segment(segment.as_deref())?.clone());
            let rows = import::read_csv(&csv)
                .with_context(|| format!("failed to read {}", csv.display()))?;

            let mut prospects = tool.store.load()?;
            let summary =
                import::import_rows(&mut prospects, rows, tool.segment.audience, models::today());
            if summary.added > 0 {
                tool.store.save(&prospects)?;
                tool.activity.record(
                    &format!("Imported {} CSV rows", summary.added),
                    "",
                    "",
                )?;
            }

            for warning in &summary.warnings {
                println!("warning: {warning}");
            }
            println!(
                "Imported {} prospects into {} ({} skipped).",
                summary.added, tool.segment.label, summary.skipped
            );
        }
        Commands::Queue { segment, limit } => {
            let tool = Tool::new(&config, config.segment(segment.as_deref())?.clone());
            let prospects = tool.store.load()?;
            let due = queue::todays_queue(&prospects, models::today());

            if due.is_empty() {
                println!("Nothing due today.");
                return Ok(());
            }

            println!("Due today ({} total):", due.len());
            for prospect in due.iter().take(limit) {
                println!(
                    "- {} ({}, {}) warmth {} tier {}",
                    prospect.name,
                    prospect.company,
                    prospect.linkedin_url,
                    prospect.warmth_score,
                    prospect.tier
                );
            }
        }
        Commands::Report { segment, out } => {
            let tool = Tool::new(&config, config.segment(segment.as_deref())?.clone());
            let prospects = tool.store.load()?;
            let pipeline = report::build_report(&prospects, models::today());
            let markdown = report::render_markdown(&tool.segment.label, &pipeline);
            std::fs::write(&out, markdown)
                .with_context(|| format!("failed to write {}", out.display()))?;
            println!("Report written to {}.", out.display());
        }
        Commands::Export { segment, out } => {
            let tool = Tool::new(&config, config.segment(segment.as_deref())?.clone());
            let prospects = tool.store.load()?;
            export::write_csv_file(&out, &prospects)
                .with_context(|| format!("failed to write {}", out.display()))?;
            println!("Exported {} prospects to {}.", prospects.len(), out.display());
        }
    }

    Ok(())
}
