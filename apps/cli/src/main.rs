//! Sitewright CLI - plan and generate static site content.
//!
//! This CLI provides a `sitewright` command that plans a site from a short
//! description and writes every planned page into the site's content tree.

mod commands;
mod config;

use clap::{Parser, Subcommand};
use commands::types::{GenerationArgs, SiteArgs};
use std::path::PathBuf;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

/// Sitewright CLI - plan-then-generate site content
#[derive(Parser, Debug)]
#[command(
    name = "sitewright",
    author,
    version,
    about = "Sitewright - plan and generate static site content",
    long_about = "Sitewright plans a site from a short description with one completion call, then writes every planned page.\nRuns are persisted after every page and can be resumed."
)]
struct Args {
    /// Log level (trace, debug, info, warn, error); RUST_LOG takes precedence
    #[arg(short, long, default_value = "warn", global = true)]
    log_level: String,

    /// Configuration file (skips discovery of ~/.sitewright/config.toml and ./.sitewright.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Completion provider (claude, openai, mock)
    #[arg(long, global = true)]
    provider: Option<String>,

    /// Model id
    #[arg(long, global = true)]
    model: Option<String>,

    /// Plan document location
    #[arg(long, global = true)]
    plan_path: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Plan a site and save the plan without generating pages
    Plan {
        #[command(flatten)]
        site: SiteArgs,
    },

    /// Plan a site and generate every page
    ///
    /// An unfinished plan at the plan path is resumed instead of replanned.
    Run {
        #[command(flatten)]
        site: SiteArgs,

        #[command(flatten)]
        generation: GenerationArgs,
    },

    /// Continue generating the saved plan
    Resume {
        #[command(flatten)]
        generation: GenerationArgs,
    },

    /// Show the saved plan
    Status {
        /// Print the plan document as JSON
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .without_time()
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let mut settings = config::load_config(args.config.as_deref())?;
    config::apply_overrides(
        &mut settings,
        &config::Overrides { provider: args.provider, model: args.model, plan_path: args.plan_path },
    );

    match args.command {
        Command::Plan { site } => commands::plan::execute(&settings, &site).await,
        Command::Run { site, generation } => {
            generation.apply(&mut settings);
            commands::run::execute(&settings, &site).await
        }
        Command::Resume { generation } => {
            generation.apply(&mut settings);
            commands::resume::execute(&settings).await
        }
        Command::Status { json } => commands::status::execute(&settings, json),
    }
}
