mod report;
mod settings_file;
mod state;
mod watch;

use std::{
    path::{Path, PathBuf},
    process::ExitCode,
};

use clap::{Parser, Subcommand};
use respite_core::{
    config::{self, Settings},
    stats::StatsAggregator,
    store::{StatisticsManager, SystemClock},
};
use tracing_subscriber::EnvFilter;

use crate::state::JsonFileRepository;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("io error: {0}")]
    Io(String),
    #[error("config error: {0}")]
    Config(String),
    #[error("serialization error: {0}")]
    Serialization(String),
    #[error(transparent)]
    Core(#[from] respite_core::Error),
    #[error("{0}")]
    Refused(String),
}

impl From<std::io::Error> for AppError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value.to_string())
    }
}

impl From<toml::de::Error> for AppError {
    fn from(value: toml::de::Error) -> Self {
        Self::Config(value.to_string())
    }
}

impl From<toml::ser::Error> for AppError {
    fn from(value: toml::ser::Error) -> Self {
        Self::Config(value.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(value: serde_json::Error) -> Self {
        Self::Serialization(value.to_string())
    }
}

#[derive(Parser)]
#[command(
    name = "respite",
    about = "Break reminders and rest statistics for the terminal",
    version
)]
struct Cli {
    /// Path to the settings file (default: <config dir>/respite/config.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Directory holding statistics.json (default: <data dir>/respite)
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Record one rest
    Record {
        /// Rest length in minutes (default: the reminder interval)
        #[arg(short, long, value_parser = clap::value_parser!(u32).range(1..))]
        minutes: Option<u32>,
    },
    /// Show rest statistics
    Stats {
        /// Print the summary as JSON
        #[arg(long)]
        json: bool,
    },
    /// One-line summary of today's rests
    Status,
    /// Clear all rest statistics
    Reset {
        /// Confirm clearing
        #[arg(long)]
        yes: bool,
    },
    /// Run the reminder loop in the foreground
    Watch,
    /// Show or change settings
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Print current settings
    Show,
    /// Print the settings file path
    Path,
    /// Write a default settings file
    Init,
    /// Set the reminder interval in minutes
    SetInterval {
        #[arg(allow_negative_numbers = true)]
        minutes: i64,
    },
    /// Set the reminder image URL (empty string clears it)
    SetImage { url: String },
}

pub struct App {
    settings: Settings,
    manager: StatisticsManager<JsonFileRepository, SystemClock>,
}

impl App {
    fn init(settings: Settings, data_dir: PathBuf) -> Result<Self, AppError> {
        let aggregator = StatsAggregator::with_offset(settings.bucket_offset()?);
        let repository = JsonFileRepository::in_dir(&data_dir);
        tracing::debug!(path = %repository.path().display(), "using statistics file");

        let manager = StatisticsManager::new(repository, SystemClock, aggregator);
        manager.init()?;
        Ok(Self { settings, manager })
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), AppError> {
    let settings_path = cli.config.unwrap_or_else(settings_file::default_path);
    let data_dir = cli.data_dir.unwrap_or_else(state::default_data_dir);
    let open = || -> Result<App, AppError> {
        let settings = settings_file::load(&settings_path)?;
        App::init(settings, data_dir.clone())
    };

    match cli.command {
        Commands::Record { minutes } => {
            let app = open()?;
            if !app.settings.enable_statistics {
                println!("Statistics are disabled (enable_statistics = false).");
                return Ok(());
            }
            let minutes = minutes.unwrap_or(app.settings.interval_minutes);
            app.manager.record_rest(minutes)?;
            let today = app.manager.summary()?.today;
            println!(
                "Recorded a {minutes}-minute rest. Today: {} rests, {} min.",
                today.count, today.minutes
            );
        }
        Commands::Stats { json } => {
            let summary = open()?.manager.summary()?;
            if json {
                println!("{}", serde_json::to_string_pretty(&summary)?);
            } else {
                print!("{}", report::render_summary(&summary));
            }
        }
        Commands::Status => {
            let app = open()?;
            if app.settings.enable_statistics {
                let today = app.manager.summary()?.today.count;
                println!("{}", report::status_line(today, None));
            } else {
                println!("Statistics are disabled.");
            }
        }
        Commands::Reset { yes } => {
            if !yes {
                return Err(AppError::Refused(
                    "this clears all rest statistics; re-run with --yes to confirm".into(),
                ));
            }
            open()?.manager.clear()?;
            println!("Rest statistics cleared.");
        }
        Commands::Watch => watch::run(&open()?)?,
        Commands::Config { action } => run_config(action, &settings_path)?,
    }
    Ok(())
}

fn run_config(action: ConfigAction, path: &Path) -> Result<(), AppError> {
    match action {
        ConfigAction::Show => {
            let settings = settings_file::load(path)?;
            print!("{}", toml::to_string_pretty(&settings)?);
        }
        ConfigAction::Path => println!("{}", path.display()),
        ConfigAction::Init => {
            if path.exists() {
                println!("Settings file already exists at {}", path.display());
            } else {
                settings_file::save(path, &Settings::default())?;
                println!("Wrote default settings to {}", path.display());
            }
        }
        ConfigAction::SetInterval { minutes } => {
            let minutes = config::validate_interval(minutes)?;
            let mut settings = settings_file::load(path)?;
            settings.interval_minutes = minutes;
            settings_file::save(path, &settings)?;
            println!("Reminder interval set to {minutes} minutes.");
        }
        ConfigAction::SetImage { url } => {
            config::validate_image_url(&url)?;
            let mut settings = settings_file::load(path)?;
            let cleared = url.is_empty();
            settings.image_url = url;
            settings_file::save(path, &settings)?;
            if cleared {
                println!("Reminder image cleared.");
            } else {
                println!("Reminder image updated.");
            }
        }
    }
    Ok(())
}
