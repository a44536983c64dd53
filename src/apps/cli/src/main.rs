use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

mod commands;
mod logging;

#[derive(Parser)]
#[command(name = "scribe", version)]
#[command(about = "Scribe CLI - generate long-form posts with related media and CTAs", long_about = None)]
struct Cli {
    /// Config file (defaults to $SCRIBE_CONFIG, then the user config directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Backend base URL, overrides the config file
    #[arg(long, global = true)]
    base_url: Option<String>,

    /// API token, overrides the config file
    #[arg(long, global = true)]
    token: Option<String>,

    /// Log level (trace, debug, info, warn, error, off); overrides $SCRIBE_LOG_LEVEL
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Mirror logs to stderr and default to debug level
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a post for a topic and save it as a draft
    Generate(GenerateArgs),
    /// Resume polling a generation job that failed
    Retry(RetryArgs),
    /// Render a markdown file to sanitized HTML without contacting the backend
    Render(RenderArgs),
}

#[derive(Args)]
pub struct GenerateArgs {
    /// Topic title
    pub title: String,

    /// Topic reference; derived from the title when omitted
    #[arg(long)]
    pub topic_id: Option<String>,

    #[arg(long)]
    pub summary: Option<String>,

    #[arg(long = "keyword")]
    pub keywords: Vec<String>,

    /// CTA to register when the organization has none, as `Text=https://url`
    #[arg(long = "cta")]
    pub ctas: Vec<String>,

    /// Continue without CTAs when the organization has none
    #[arg(long)]
    pub skip_ctas: bool,

    #[command(flatten)]
    pub output: OutputArgs,
}

#[derive(Args)]
pub struct RetryArgs {
    /// Job id reported by the failed run
    pub job_id: String,

    /// Title of the topic the job was generating
    #[arg(long)]
    pub title: String,

    #[arg(long)]
    pub topic_id: Option<String>,

    #[command(flatten)]
    pub output: OutputArgs,
}

#[derive(Args)]
pub struct RenderArgs {
    /// Markdown input file
    pub input: PathBuf,

    /// CTA to tag in the output, as `Text=https://url`
    #[arg(long = "cta")]
    pub ctas: Vec<String>,

    #[command(flatten)]
    pub output: OutputArgs,
}

#[derive(Args)]
pub struct OutputArgs {
    /// Write the rendered HTML here instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Print the full session snapshot as JSON
    #[arg(long)]
    pub json: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_config = logging::LogConfig::new(cli.verbose, cli.log_level.as_deref());
    logging::init(&log_config)?;
    logging::spawn_log_cleanup_task();

    let config = commands::load_config(cli.config.as_deref(), cli.base_url, cli.token)?;

    match cli.command {
        Commands::Generate(args) => commands::generate(&config, args).await?,
        Commands::Retry(args) => commands::retry(&config, args).await?,
        Commands::Render(args) => commands::render(&config, args)?,
    }

    Ok(())
}
