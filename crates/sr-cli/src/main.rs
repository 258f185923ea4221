use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use serde_json::{json, Value};
use sr_runner::{CampaignLayout, CampaignReport, ConfigError, OptionOverrides};
use std::path::PathBuf;
use tracing::warn;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
#[command(
    name = "testsr",
    version = "0.3.0",
    about = "Benchmark campaign driver for the sr symbolic-regression engine"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the benchmark catalogue, or only the named benchmarks.
    Run {
        /// Benchmarks to run (default: all, in catalogue order).
        tests: Vec<String>,
        /// TOML file whose [Options] table seeds the defaults.
        #[arg(long, value_name = "PATH")]
        config: Option<PathBuf>,
        #[command(flatten)]
        modes: ModeFlags,
        #[command(flatten)]
        layout: LayoutArgs,
        #[arg(long)]
        json: bool,
        /// Exit with status 1 when any benchmark failed.
        #[arg(long)]
        check: bool,
    },
    /// Print the benchmark catalogue.
    List {
        #[arg(long)]
        json: bool,
    },
}

#[derive(Args, Debug, Default)]
struct ModeFlags {
    /// Randomize the test: fresh seed and a larger search budget.
    #[arg(short = 'r', long, overrides_with = "debug")]
    random: bool,
    /// Reproducible run (no seed, declared budget).
    #[arg(long, overrides_with = "random")]
    debug: bool,
    /// Turn on ARL.
    #[arg(long, overrides_with = "no_arl")]
    arl: bool,
    #[arg(long, overrides_with = "arl")]
    no_arl: bool,
    #[arg(long, overrides_with = "no_elitism")]
    elitism: bool,
    #[arg(long, overrides_with = "elitism")]
    no_elitism: bool,
    #[arg(long, overrides_with = "no_force_input")]
    force_input: bool,
    #[arg(long, overrides_with = "force_input")]
    no_force_input: bool,
    /// Echo every engine command line before running it.
    #[arg(short = 'v', long, overrides_with = "quiet")]
    verbose: bool,
    #[arg(long, overrides_with = "verbose")]
    quiet: bool,
}

impl ModeFlags {
    fn overrides(&self) -> OptionOverrides {
        OptionOverrides {
            debug: switch(self.debug, self.random),
            arl: switch(self.arl, self.no_arl),
            elitism: switch(self.elitism, self.no_elitism),
            force_input: switch(self.force_input, self.no_force_input),
            verbose: switch(self.verbose, self.quiet),
        }
    }
}

fn switch(on: bool, off: bool) -> Option<bool> {
    if on {
        Some(true)
    } else if off {
        Some(false)
    } else {
        None
    }
}

#[derive(Args, Debug, Default)]
struct LayoutArgs {
    /// Engine executable.
    #[arg(long, value_name = "PROG")]
    engine: Option<String>,
    #[arg(long, value_name = "DIR")]
    stat_dir: Option<PathBuf>,
    #[arg(long, value_name = "DIR")]
    dataset_dir: Option<PathBuf>,
    #[arg(long, value_name = "DIR")]
    symbolset_dir: Option<PathBuf>,
}

impl LayoutArgs {
    fn into_layout(self) -> CampaignLayout {
        let defaults = CampaignLayout::default();
        CampaignLayout {
            engine: self.engine.unwrap_or(defaults.engine),
            stat_dir: self.stat_dir.unwrap_or(defaults.stat_dir),
            dataset_dir: self.dataset_dir.unwrap_or(defaults.dataset_dir),
            symbol_set_dir: self.symbolset_dir.unwrap_or(defaults.symbol_set_dir),
        }
    }
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();
    let json_mode = command_json_mode(&cli.command);
    let result = run_command(cli.command);
    match result {
        Ok(output) => {
            if let Some(payload) = &output.payload {
                emit_json(payload);
            }
            if output.failed {
                std::process::exit(1);
            }
            Ok(())
        }
        Err(err) => {
            if json_mode {
                let code = if err.downcast_ref::<ConfigError>().is_some() {
                    "config_error"
                } else {
                    "command_failed"
                };
                emit_json(&json_error(code, format!("{err:#}"), json!({})));
                std::process::exit(1);
            }
            Err(err)
        }
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

struct CommandOutput {
    payload: Option<Value>,
    // Exit with status 1 once the payload is out.
    failed: bool,
}

impl CommandOutput {
    fn done(payload: Option<Value>) -> Self {
        Self {
            payload,
            failed: false,
        }
    }
}

fn campaign_failed(check: bool, report: &CampaignReport) -> bool {
    check && report.failures() > 0
}

fn run_command(command: Commands) -> Result<CommandOutput> {
    match command {
        Commands::Run {
            tests,
            config,
            modes,
            layout,
            json,
            check,
        } => {
            let options = sr_runner::resolve_options(config.as_deref(), modes.overrides(), tests)?;
            for name in sr_runner::catalogue::unknown_names(
                sr_runner::CATALOGUE,
                &options.selected_tests,
            ) {
                warn!(benchmark = %name, "not in the catalogue, ignored");
            }
            let layout = layout.into_layout();
            let report = sr_runner::run_system_campaign(&options, &layout, json);
            let failed = campaign_failed(check, &report);
            let payload = if json {
                Some(json!({
                    "ok": true,
                    "command": "run",
                    "failures": report.failures(),
                    "report": serde_json::to_value(&report)?,
                }))
            } else {
                print_report(&report);
                None
            };
            Ok(CommandOutput { payload, failed })
        }
        Commands::List { json } => {
            if json {
                return Ok(CommandOutput::done(Some(json!({
                    "ok": true,
                    "command": "list",
                    "benchmarks": serde_json::to_value(sr_runner::CATALOGUE)?,
                }))));
            }
            for bench in sr_runner::CATALOGUE {
                println!(
                    "{:<12} {:<16} -g {:<4} -P {:<4} -p {:<4} -r {:<4} symbol_set: {}",
                    bench.name,
                    bench.dataset_path,
                    bench.generations,
                    bench.population_size,
                    bench.program_size,
                    bench.rounds,
                    bench.symbol_set.unwrap_or("default")
                );
            }
            Ok(CommandOutput::done(None))
        }
    }
}

fn emit_json(value: &Value) {
    match serde_json::to_string(value) {
        Ok(s) => println!("{}", s),
        Err(_) => println!(
            "{{\"ok\":false,\"error\":{{\"code\":\"serialization_error\",\"message\":\"failed to serialize JSON payload\",\"details\":{{}}}}}}"
        ),
    }
}

fn json_error(code: &str, message: String, details: Value) -> Value {
    json!({
        "ok": false,
        "error": {
            "code": code,
            "message": message,
            "details": details
        }
    })
}

fn command_json_mode(command: &Commands) -> bool {
    match command {
        Commands::Run { json, .. } | Commands::List { json } => *json,
    }
}

fn print_report(report: &CampaignReport) {
    println!("config: {}", report.config_identity);
    println!("benchmarks: {}", report.outcomes.len());
    println!("failures: {}", report.failures());
    for outcome in &report.outcomes {
        let archived = outcome
            .archived
            .iter()
            .map(|a| a.archived_name.as_str())
            .collect::<Vec<_>>();
        println!(
            "{}: engine {}, archived [{}]",
            outcome.name,
            outcome.engine,
            archived.join(", ")
        );
        if let Some(err) = &outcome.archive_error {
            println!("{}: archive_error: {}", outcome.name, err);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sr_runner::{BenchmarkOutcome, EffectiveParameters, EngineStatus, RunOptions};

    fn parse_run(args: &[&str]) -> (Vec<String>, Option<PathBuf>, OptionOverrides, CampaignLayout) {
        let argv = ["testsr", "run"].into_iter().chain(args.iter().copied());
        let cli = Cli::try_parse_from(argv).expect("parse");
        match cli.command {
            Commands::Run {
                tests,
                config,
                modes,
                layout,
                ..
            } => (tests, config, modes.overrides(), layout.into_layout()),
            Commands::List { .. } => panic!("expected run"),
        }
    }

    #[test]
    fn bare_run_overrides_nothing() {
        let (tests, config, overrides, layout) = parse_run(&[]);
        assert!(tests.is_empty());
        assert_eq!(config, None);
        assert_eq!(overrides, OptionOverrides::default());
        assert_eq!(layout, CampaignLayout::default());
    }

    #[test]
    fn mode_flags_and_positional_tests() {
        let (tests, _, overrides, _) = parse_run(&["-r", "--arl", "-v", "mep", "petalrose"]);
        assert_eq!(tests, vec!["mep".to_string(), "petalrose".to_string()]);
        assert_eq!(
            overrides,
            OptionOverrides {
                debug: Some(false),
                arl: Some(true),
                verbose: Some(true),
                ..OptionOverrides::default()
            }
        );
    }

    #[test]
    fn last_of_a_flag_pair_wins() {
        let (_, _, overrides, _) =
            parse_run(&["--no-elitism", "--elitism", "--random", "--debug", "--force-input"]);
        assert_eq!(overrides.elitism, Some(true));
        assert_eq!(overrides.debug, Some(true));
        assert_eq!(overrides.force_input, Some(true));
        assert_eq!(overrides.arl, None);
    }

    #[test]
    fn layout_and_config_arguments() {
        let (_, config, _, layout) = parse_run(&[
            "--config",
            "conf/arl.toml",
            "--engine",
            "./build/sr",
            "--stat-dir",
            "out/stat",
        ]);
        assert_eq!(config, Some(PathBuf::from("conf/arl.toml")));
        assert_eq!(layout.engine, "./build/sr");
        assert_eq!(layout.stat_dir, PathBuf::from("out/stat"));
        assert_eq!(layout.dataset_dir, PathBuf::from("dataset"));
    }

    #[test]
    fn json_mode_is_detected_per_command() {
        let cli = Cli::try_parse_from(["testsr", "list", "--json"]).expect("parse");
        assert!(command_json_mode(&cli.command));
        let cli = Cli::try_parse_from(["testsr", "run", "mep"]).expect("parse");
        assert!(!command_json_mode(&cli.command));
    }

    fn report_with(engines: Vec<EngineStatus>) -> CampaignReport {
        let outcomes = engines
            .into_iter()
            .map(|engine| BenchmarkOutcome {
                name: "mep".to_string(),
                parameters: EffectiveParameters {
                    generations: 80,
                    rounds: 100,
                    seed: None,
                },
                command: "sr dataset/mep.dat".to_string(),
                engine,
                archived: Vec::new(),
                archive_error: None,
            })
            .collect();
        CampaignReport {
            config_identity: "default".to_string(),
            options: RunOptions::default(),
            layout: CampaignLayout::default(),
            started_at: String::new(),
            finished_at: String::new(),
            outcomes,
        }
    }

    #[test]
    fn only_checked_campaigns_with_failures_fail() {
        let failing = report_with(vec![
            EngineStatus::Succeeded,
            EngineStatus::Failed { code: Some(1) },
        ]);
        let clean = report_with(vec![EngineStatus::Succeeded]);
        assert!(campaign_failed(true, &failing));
        assert!(!campaign_failed(false, &failing));
        assert!(!campaign_failed(true, &clean));
    }

    #[test]
    fn list_json_returns_payload_without_failing() {
        let output = run_command(Commands::List { json: true }).expect("list");
        assert!(!output.failed);
        let payload = output.payload.expect("payload");
        assert_eq!(payload["command"], "list");
        assert_eq!(payload["benchmarks"][0]["name"], "petalrose");
    }

    #[test]
    fn json_error_envelope() {
        let v = json_error("config_error", "bad".to_string(), json!({}));
        assert_eq!(v["ok"], false);
        assert_eq!(v["error"]["code"], "config_error");
    }
}
