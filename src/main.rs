mod error;
mod fetcher;
mod mapper;
mod persist;
mod pipeline;
mod record;
mod settings;
mod sheet;
mod stats;
mod template;

use std::path::PathBuf;
use std::time::Instant;

use clap::{Parser, Subcommand};

use pipeline::RunOptions;
use settings::Settings;

#[derive(Parser)]
#[command(
    name = "expo_harvest",
    about = "Collect exhibitor listings and reformat them to a reference template"
)]
struct Cli {
    /// Settings file (default: ./expo_harvest.toml if present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Collect, analyze the template and format (default)
    Run {
        /// Skip template analysis and use the default layout
        #[arg(long)]
        skip_template: bool,
        /// Continue even if the template file is missing
        #[arg(long)]
        force: bool,
    },
    /// Collect listings and save the JSON and localized spreadsheet only
    Collect,
    /// Inspect the reference template only
    Analyze {
        /// Template workbook (default: from settings)
        #[arg(short, long)]
        template: Option<PathBuf>,
    },
    /// Convert previously collected data to the destination layout only
    Format,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let t0 = Instant::now();
    let cli = Cli::parse();
    let settings = Settings::load(cli.config.as_deref())?;

    let command = cli.command.unwrap_or(Commands::Run {
        skip_template: false,
        force: false,
    });

    let result = match command {
        Commands::Run {
            skip_template,
            force,
        } => pipeline::run_full(&settings, &RunOptions { skip_template, force }).await,
        Commands::Collect => {
            println!("Collecting listings only...\n");
            pipeline::collect(&settings).await.map(|_| ())
        }
        Commands::Analyze { template } => {
            println!("Analyzing template only...\n");
            let path = template.unwrap_or_else(|| settings.template_path.clone());
            pipeline::analyze(&path).map(|_| ()).map_err(anyhow::Error::from)
        }
        Commands::Format => {
            println!("Formatting collected data only...\n");
            pipeline::format_only(&settings)
        }
    };

    let elapsed = t0.elapsed();
    if elapsed.as_secs() >= 1 {
        println!("\nDone in {}", format_duration(elapsed));
    }

    result
}

fn format_duration(d: std::time::Duration) -> String {
    let secs = d.as_secs();
    if secs < 60 {
        format!("{:.1}s", d.as_secs_f64())
    } else if secs < 3600 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else {
        format!("{}h {}m {}s", secs / 3600, (secs % 3600) / 60, secs % 60)
    }
}
