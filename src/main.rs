use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use epistats::manager::Manager;
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(version, about)]
struct CLI {
    #[arg(long)]
    data_dir: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    Summary {
        #[arg(long)]
        region: Option<String>,

        #[arg(long)]
        lag: Option<usize>,
    },

    Export {
        #[arg(long)]
        lag: Option<usize>,
    },

    Clean,
}

fn main() {
    env_logger::Builder::new()
        .format_timestamp_millis()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .init();

    if let Err(error) = run_cli() {
        log::error!("{error:#?}");
        std::process::exit(1);
    }
}

fn run_cli() -> Result<()> {
    let args = CLI::parse();
    log::info!("{args:#?}");

    let mut mgr = Manager::new(args.data_dir).context("failed to construct mgr")?;

    match args.command {
        Command::Summary { region, lag } => {
            if let Some(lag) = lag {
                mgr.set_cfr_lag(lag)?;
            }
            let summary = mgr.summarize_region(region.as_deref())?;
            print!("{summary}");
        }
        Command::Export { lag } => {
            if let Some(lag) = lag {
                mgr.set_cfr_lag(lag)?;
            }
            let today = chrono::Local::now().date_naive();
            let summary = mgr.export_reports(today)?;
            for file in &summary.files {
                println!("Exported {}", file.display());
            }
            for failure in &summary.failures {
                println!(
                    "Skipped {} in {}: {}",
                    failure.region, failure.report, failure.reason
                );
            }
        }
        Command::Clean => {
            let count = mgr.clean_reports()?;
            log::info!("removed {count} report files");
        }
    }

    Ok(())
}
