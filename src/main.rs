use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result, anyhow};
use clap::{Parser, Subcommand};
use settings_watcher::config::DEFAULT_CONFIG_FILE;
use settings_watcher::watcher::{DefaultArtifactNames, TargetResolver};
use settings_watcher::{ChannelHandler, Settings, SettingsWatcherBuilder, logging};

#[derive(Parser)]
#[command(name = "settings-watcher")]
#[command(about = "Watch gateway configuration artifacts and report debounced changes")]
#[command(version)]
struct Cli {
    /// Settings file (defaults to ./settings-watcher.toml)
    #[arg(short, long, global = true, env = "SETTINGS_WATCHER_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Watch every artifact and print changes as JSON lines
    Watch {
        /// Quiet interval in milliseconds (overrides config)
        #[arg(short, long)]
        interval_ms: Option<u64>,

        /// Deliver every event, even inside the quiet interval
        #[arg(long)]
        no_filter: bool,
    },

    /// Print the resolved watch targets without watching
    Targets,

    /// Show the effective configuration
    Config,

    /// Write a default configuration file
    Init {
        /// Force overwrite existing configuration
        #[arg(short, long)]
        force: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config_path = cli
        .config
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));

    match cli.command {
        Commands::Init { force } => {
            let path = Settings::init_config_file(&config_path, force)
                .map_err(|e| anyhow!("writing {}: {e}", config_path.display()))?;
            println!("Created configuration file at {}", path.display());
            Ok(())
        }
        Commands::Watch {
            interval_ms,
            no_filter,
        } => {
            let settings = load_settings(&config_path)?;
            watch(&settings, interval_ms, no_filter)
        }
        Commands::Targets => {
            let settings = load_settings(&config_path)?;
            let resolver =
                TargetResolver::new(Arc::new(DefaultArtifactNames), Arc::new(settings));
            for target in resolver.resolve_all() {
                println!("{}", serde_json::to_string(&target)?);
            }
            Ok(())
        }
        Commands::Config => {
            let settings = load_settings(&config_path)?;
            print!("{}", toml::to_string_pretty(&settings)?);
            Ok(())
        }
    }
}

/// Load layered settings and install logging from them.
fn load_settings(config_path: &Path) -> Result<Settings> {
    let settings = Settings::load_from(config_path)
        .map_err(|e| anyhow!("{e}"))
        .with_context(|| format!("loading {}", config_path.display()))?;
    logging::init_with_config(&settings.logging);
    Ok(settings)
}

fn watch(settings: &Settings, interval_ms: Option<u64>, no_filter: bool) -> Result<()> {
    let (handler, events) = ChannelHandler::channel();

    let mut builder = SettingsWatcherBuilder::from_settings(settings).handler(handler);
    if let Some(ms) = interval_ms {
        builder = builder.quiet_interval_ms(ms);
    }
    if no_filter {
        builder = builder.filter_recent_events(false);
    }

    let watcher = builder.build();
    let watched = watcher.watched_kinds();
    if watched.is_empty() {
        return Err(anyhow!(
            "no artifact location could be watched; check the [paths] settings"
        ));
    }
    eprintln!(
        "Watching {} of {} artifacts (quiet interval {:?})",
        watched.len(),
        watcher.targets().len(),
        watcher.quiet_interval()
    );

    for (_, event) in events {
        println!("{}", serde_json::to_string(&event)?);
    }

    Ok(())
}
