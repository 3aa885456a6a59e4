use anyhow::{Context, Result};
use clap::Parser;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use keystat::cli::Cli;
use keystat::config::{KeystatConfig, StatsFormat};
use keystat::config_file::ConfigFile;
use keystat::platform::ExitCode;
use keystat::stats::ProcessingStats;
use keystat::{runner, Error};

fn main() {
    let cli = parse_args_with_config();
    init_tracing(&cli);

    let config = match KeystatConfig::from_cli(&cli) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("keystat: Error: {}", e);
            ExitCode::InvalidUsage.exit();
        }
    };
    debug!(?config, "resolved configuration");

    match execute(&config) {
        Ok(stats) => {
            if let Some(format) = cli.stats {
                print_stats(&stats, format);
            }
            ExitCode::Success.exit();
        }
        Err(e) => {
            eprintln!("keystat: Error: {:#}", e);
            let code = match e.downcast_ref::<Error>() {
                Some(Error::Config(_)) => ExitCode::InvalidUsage,
                _ => ExitCode::GeneralError,
            };
            code.exit();
        }
    }
}

fn execute(config: &KeystatConfig) -> Result<ProcessingStats> {
    let aggregation = runner::aggregate(config).context("aggregation phase failed")?;
    runner::publish(&config.output, &aggregation).context("output phase failed")?;
    Ok(aggregation.stats)
}

/// Parse the command line after prepending config-file defaults
fn parse_args_with_config() -> Cli {
    let raw_args: Vec<String> = std::env::args().collect();

    let processed_args = if raw_args.iter().any(|arg| arg == "--ignore-config") {
        raw_args
    } else {
        let config_file_path = extract_config_file_arg(&raw_args);
        let loaded = ConfigFile::load_with_custom_path(config_file_path.as_deref())
            .and_then(|config_file| config_file.process_args(raw_args));
        match loaded {
            Ok(processed) => processed,
            Err(e) => {
                eprintln!("keystat: Config error: {:#}", e);
                ExitCode::InvalidUsage.exit();
            }
        }
    };

    // clap exits with 2 on usage errors and 0 for --help/--version
    Cli::try_parse_from(processed_args).unwrap_or_else(|e| e.exit())
}

fn extract_config_file_arg(args: &[String]) -> Option<String> {
    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        if arg == "--config-file" {
            return iter.next().cloned();
        }
        if let Some(value) = arg.strip_prefix("--config-file=") {
            return Some(value.to_string());
        }
    }
    None
}

fn init_tracing(cli: &Cli) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("keystat={}", cli.log_level())));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn print_stats(stats: &ProcessingStats, format: StatsFormat) {
    match format {
        StatsFormat::Table => eprintln!("{}", stats.format_stats()),
        StatsFormat::Json => match serde_json::to_string_pretty(stats) {
            Ok(json) => eprintln!("{}", json),
            Err(e) => eprintln!("keystat: failed to serialize stats: {}", e),
        },
    }
}
