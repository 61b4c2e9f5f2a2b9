use std::fs::File;
use std::io::{self, BufReader, Write};
use std::path::PathBuf;

use airspace::AirspaceConfig;
use clap::{Parser, Subcommand};
use tools::{InstantLoader, Replay, replay_feed};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(author, version, about = "Replays an airspace feed against an in-memory renderer")]
struct Args {
    /// Airspace configuration (JSON); defaults are used when omitted
    #[arg(long)]
    config: Option<PathBuf>,

    /// Raise log verbosity when RUST_LOG is not set (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Apply every step of a JSON-lines feed and print one summary per step
    Replay {
        /// Feed file, one step object per line
        feed: PathBuf,

        /// Asset files whose loads should fail
        #[arg(long = "fail-asset")]
        fail_asset: Vec<String>,
    },

    /// Print the effective configuration as JSON
    Config,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let default_level = match args.verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(io::stderr)
        .init();

    let config = match &args.config {
        Some(path) => AirspaceConfig::from_path(path)?,
        None => AirspaceConfig::default(),
    };

    match args.command {
        Command::Config => {
            println!("{}", serde_json::to_string_pretty(&config)?);
        }
        Command::Replay { feed, fail_asset } => {
            let reader = BufReader::new(File::open(&feed)?);
            let mut replay = Replay::new(config, InstantLoader::new(fail_asset))?;
            let stdout = io::stdout();
            let mut out = stdout.lock();
            let mut write_err = None;
            let steps = replay_feed(&mut replay, reader, |summary| {
                if write_err.is_some() {
                    return;
                }
                let line = serde_json::to_string(summary).map_err(io::Error::other);
                if let Err(e) = line.and_then(|l| writeln!(out, "{l}")) {
                    write_err = Some(e);
                }
            })?;
            if let Some(e) = write_err {
                return Err(e.into());
            }
            info!(steps, feed = %feed.display(), "replay finished");
        }
    }
    Ok(())
}
