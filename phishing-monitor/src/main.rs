/*!
Phishing list monitor
*/

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Arg, ArgAction, Command, value_parser};
use tracing::{info, warn};

use phishing_monitor::core::{
    config::MonitorConfig,
    scheduler::Scheduler,
    tracker::Monitor,
};

fn cli() -> Command {
    Command::new("phishing-monitor")
        .version(clap::crate_version!())
        .about("Relays new phishing-list entries to a Telegram channel")
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .help("Path to a TOML config file")
                .value_name("PATH")
                .value_parser(value_parser!(PathBuf)),
        )
        .arg(
            Arg::new("interval")
                .short('i')
                .long("interval")
                .help("Seconds between checks (overrides the config file)")
                .value_name("SECS")
                .value_parser(value_parser!(u64)),
        )
        .arg(
            Arg::new("once")
                .long("once")
                .help("Run a single check, print the status as JSON and exit")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .help("Log at debug level")
                .action(ArgAction::SetTrue),
        )
}

fn setup_logging(config: &MonitorConfig, verbose: bool) {
    let level = if verbose { "debug" } else { config.logging.level.as_str() };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level)),
        )
        .init();
}

async fn load_config(explicit: Option<&PathBuf>) -> Result<(MonitorConfig, Option<PathBuf>)> {
    let path = match explicit {
        Some(path) => Some(path.clone()),
        None => MonitorConfig::default_path().filter(|p| p.exists()),
    };

    match path {
        Some(path) => {
            let config = MonitorConfig::load(&path)
                .await
                .with_context(|| format!("Failed to load config from {}", path.display()))?;
            Ok((config, Some(path)))
        }
        None => Ok((MonitorConfig::from_env(), None)),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let matches = cli().get_matches();

    let (mut config, config_path) = load_config(matches.get_one::<PathBuf>("config")).await?;
    if let Some(&interval) = matches.get_one::<u64>("interval") {
        config.schedule.interval_secs = interval;
    }

    setup_logging(&config, matches.get_flag("verbose"));
    match &config_path {
        Some(path) => info!("Loaded configuration from {}", path.display()),
        None => info!("Config file not found, using defaults."),
    }

    let interval = config.schedule.interval();
    let mut monitor = Monitor::new(config).await?;

    if matches.get_flag("once") {
        let outcome = monitor.tick().await;
        info!("Check finished: {:?}", outcome);
        println!("{}", serde_json::to_string_pretty(&monitor.status(false))?);
        monitor.shutdown().await;
        return Ok(());
    }

    let scheduler = Scheduler::spawn(monitor, interval);
    info!("✅ Monitor started");

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for Ctrl-C")?;
    info!("🛑 Shutdown signal received");

    match scheduler.stop().await {
        Some(monitor) => monitor.shutdown().await,
        None => warn!("Monitor task ended abnormally; outputs were not finalized"),
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parses_flags() {
        let matches = cli()
            .try_get_matches_from(["phishing-monitor", "--config", "m.toml", "-i", "30", "--once"])
            .unwrap();
        assert_eq!(
            matches.get_one::<PathBuf>("config"),
            Some(&PathBuf::from("m.toml"))
        );
        assert_eq!(matches.get_one::<u64>("interval"), Some(&30));
        assert!(matches.get_flag("once"));
        assert!(!matches.get_flag("verbose"));
    }

    #[test]
    fn test_cli_rejects_non_numeric_interval() {
        assert!(cli().try_get_matches_from(["phishing-monitor", "-i", "soon"]).is_err());
    }

    #[test]
    fn test_cli_definition_is_valid() {
        cli().debug_assert();
    }
}
