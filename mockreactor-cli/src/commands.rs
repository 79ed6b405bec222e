use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand};
use mockreactor_config::ReactorConfig;
use mockreactor_core::Reactor;
use mockreactor_telemetry::{ReactorLogger, ReactorMetrics};
use tracing::info;

use crate::error::CliError;
use crate::scenarios::{self, Scenario, ScenarioReport};

#[derive(Parser)]
#[command(version, about)]
pub struct Cli {
    /// YAML configuration file (defaults to config/mockreactor.yaml when present)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run a demonstration scenario on a fresh reactor
    Demo(DemoArgs),
    /// Print the effective configuration as YAML
    Config,
}

#[derive(Args, Debug, Clone)]
pub struct DemoArgs {
    #[arg(value_enum)]
    pub scenario: Scenario,
    /// Print Prometheus metrics gathered during the run
    #[arg(long)]
    pub metrics: bool,
}

pub fn run_command(cli: Cli) -> Result<(), CliError> {
    let config = load_config(cli.config.as_deref())?;
    ReactorLogger::try_init(&config.telemetry.log_filter);

    match cli.command {
        Commands::Demo(args) => {
            let output = run_demo(&config, &args)?;
            print!("{output}");
            Ok(())
        }
        Commands::Config => {
            print!("{}", serde_yaml::to_string(&config)?);
            Ok(())
        }
    }
}

fn load_config(path: Option<&Path>) -> Result<ReactorConfig, CliError> {
    let config = match path {
        Some(path) => ReactorConfig::load_from_path(path)?,
        None => ReactorConfig::load()?,
    };
    Ok(config)
}

/// Runs `args.scenario` and renders the report (and metrics, when asked) as text.
pub fn run_demo(config: &ReactorConfig, args: &DemoArgs) -> Result<String, CliError> {
    let mut reactor = Reactor::with_config(config);
    if args.metrics && reactor.metrics().is_none() {
        reactor = reactor.with_metrics(ReactorMetrics::new());
    }

    info!(scenario = %args.scenario, "Running demo scenario");
    let report = scenarios::run(args.scenario, &reactor)?;
    let mut output = render_report(&report);

    if args.metrics {
        if let Some(metrics) = reactor.metrics() {
            let text = metrics
                .gather_metrics()
                .map_err(|e| CliError::Render(e.to_string()))?;
            output.push_str(&text);
        }
    }
    Ok(output)
}

fn render_report(report: &ScenarioReport) -> String {
    let mut out = format!("scenario: {}\n", report.scenario);
    for event in &report.events {
        out.push_str("  ");
        out.push_str(event);
        out.push('\n');
    }
    out.push_str(&format!(
        "final clock: {}ms\nticks: {}\n",
        report.final_clock_ms, report.ticks
    ));
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_parses_demo_with_metrics() {
        let cli = Cli::try_parse_from(["mockreactor", "demo", "periodic", "--metrics"]).unwrap();
        match cli.command {
            Commands::Demo(args) => {
                assert_eq!(args.scenario, Scenario::Periodic);
                assert!(args.metrics);
            }
            Commands::Config => panic!("expected demo command"),
        }
        assert!(cli.config.is_none());
    }

    #[test]
    fn cli_rejects_unknown_scenario() {
        assert!(Cli::try_parse_from(["mockreactor", "demo", "sleepy"]).is_err());
    }

    #[test]
    fn demo_output_includes_clock_and_metrics() {
        let args = DemoArgs {
            scenario: Scenario::Shutdown,
            metrics: true,
        };
        let output = run_demo(&ReactorConfig::default(), &args).unwrap();
        assert!(output.starts_with("scenario: shutdown\n"));
        assert!(output.contains("final clock: 60000ms"));
        assert!(output.contains("mockreactor_ticks_total"));
    }

    #[test]
    fn missing_config_file_is_reported() {
        let err = load_config(Some(Path::new("does/not/exist.yaml"))).unwrap_err();
        assert!(matches!(err, CliError::Config(_)));
    }
}
