use crate::catalogue::{self, BenchmarkSpec};
use crate::invocation::{
    build_invocation, echo_if_verbose, EffectiveParameters, Invocation, RandomSeeds, SeedSource,
};
use crate::layout::{archived_name, ArtifactKind, CampaignLayout};
use crate::options::RunOptions;
use anyhow::{Context, Result};
use chrono::Utc;
use serde::Serialize;
use std::fmt;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use tracing::{debug, info, warn};

pub trait CommandRunner {
    fn execute(&mut self, invocation: &Invocation) -> EngineStatus;
}

pub trait ArtifactStore {
    // Ok(false) when `from` does not exist.
    fn rename_if_exists(&mut self, from: &Path, to: &Path) -> Result<bool>;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum EngineStatus {
    Succeeded,
    Failed { code: Option<i32> },
    SpawnError { message: String },
}

impl EngineStatus {
    pub fn succeeded(&self) -> bool {
        matches!(self, EngineStatus::Succeeded)
    }
}

impl fmt::Display for EngineStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EngineStatus::Succeeded => write!(f, "ok"),
            EngineStatus::Failed { code: Some(code) } => write!(f, "failed (exit code {})", code),
            EngineStatus::Failed { code: None } => write!(f, "failed (terminated by signal)"),
            EngineStatus::SpawnError { message } => {
                write!(f, "could not start engine: {}", message)
            }
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessRunner {
    // Keeps stdout clean for JSON output.
    pub stdout_to_stderr: bool,
}

impl CommandRunner for ProcessRunner {
    fn execute(&mut self, invocation: &Invocation) -> EngineStatus {
        let mut cmd = Command::new(&invocation.program);
        cmd.args(&invocation.args);
        cmd.stdin(Stdio::null());
        if self.stdout_to_stderr {
            cmd.stdout(Stdio::from(io::stderr()));
        }
        cmd.stderr(Stdio::inherit());
        match cmd.status() {
            Ok(status) if status.success() => EngineStatus::Succeeded,
            Ok(status) => EngineStatus::Failed {
                code: status.code(),
            },
            Err(e) => EngineStatus::SpawnError {
                message: e.to_string(),
            },
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct FsArtifactStore;

impl ArtifactStore for FsArtifactStore {
    fn rename_if_exists(&mut self, from: &Path, to: &Path) -> Result<bool> {
        if !from.exists() {
            return Ok(false);
        }
        fs::rename(from, to)
            .with_context(|| format!("cannot archive {} as {}", from.display(), to.display()))?;
        Ok(true)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArchivedArtifact {
    pub kind: ArtifactKind,
    pub archived_name: String,
    pub path: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BenchmarkOutcome {
    pub name: String,
    pub parameters: EffectiveParameters,
    pub command: String,
    pub engine: EngineStatus,
    pub archived: Vec<ArchivedArtifact>,
    pub archive_error: Option<String>,
}

impl BenchmarkOutcome {
    pub fn is_success(&self) -> bool {
        self.engine.succeeded() && self.archive_error.is_none()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CampaignReport {
    pub config_identity: String,
    pub options: RunOptions,
    pub layout: CampaignLayout,
    pub started_at: String,
    pub finished_at: String,
    pub outcomes: Vec<BenchmarkOutcome>,
}

impl CampaignReport {
    pub fn failures(&self) -> usize {
        self.outcomes.iter().filter(|o| !o.is_success()).count()
    }
}

pub struct CampaignEnv<'a> {
    pub seeds: &'a mut dyn SeedSource,
    pub runner: &'a mut dyn CommandRunner,
    pub store: &'a mut dyn ArtifactStore,
    pub announce: &'a mut dyn Write,
    pub diagnostics: &'a mut dyn Write,
}

/// Runs the selected entries of `benchmarks` one after another. Per-benchmark
/// failures are recorded in the report and never stop the campaign.
pub fn run_campaign(
    benchmarks: &[BenchmarkSpec],
    options: &RunOptions,
    layout: &CampaignLayout,
    env: &mut CampaignEnv<'_>,
) -> CampaignReport {
    let started_at = Utc::now().to_rfc3339();
    let selected = catalogue::select(benchmarks, &options.selected_tests);
    info!(
        config = %options.config_identity,
        benchmarks = selected.len(),
        debug = options.debug,
        arl = options.arl,
        "starting campaign"
    );

    let mut outcomes = Vec::with_capacity(selected.len());
    for bench in selected {
        outcomes.push(run_benchmark(bench, options, layout, env));
    }

    CampaignReport {
        config_identity: options.config_identity.clone(),
        options: options.clone(),
        layout: layout.clone(),
        started_at,
        finished_at: Utc::now().to_rfc3339(),
        outcomes,
    }
}

pub fn run_system_campaign(
    options: &RunOptions,
    layout: &CampaignLayout,
    machine_output: bool,
) -> CampaignReport {
    let mut seeds = RandomSeeds;
    let mut runner = ProcessRunner {
        stdout_to_stderr: machine_output,
    };
    let mut store = FsArtifactStore;
    let mut stdout = io::stdout();
    let mut stderr = io::stderr();
    let announce: &mut dyn Write = if machine_output {
        &mut stderr
    } else {
        &mut stdout
    };
    let mut diagnostics = io::stderr();
    let mut env = CampaignEnv {
        seeds: &mut seeds,
        runner: &mut runner,
        store: &mut store,
        announce,
        diagnostics: &mut diagnostics,
    };
    run_campaign(catalogue::CATALOGUE, options, layout, &mut env)
}

fn run_benchmark(
    bench: &BenchmarkSpec,
    options: &RunOptions,
    layout: &CampaignLayout,
    env: &mut CampaignEnv<'_>,
) -> BenchmarkOutcome {
    let _ = writeln!(
        env.announce,
        "Testing {} (arl: {}, debug: {})",
        bench.name, options.arl, options.debug
    );

    let (parameters, invocation) = build_invocation(bench, options, layout, &mut *env.seeds);
    let _ = echo_if_verbose(options, &invocation, &mut *env.diagnostics);
    debug!(benchmark = bench.name, command = %invocation, "running engine");

    let engine = env.runner.execute(&invocation);
    if engine.succeeded() {
        info!(benchmark = bench.name, "engine finished");
    } else {
        warn!(benchmark = bench.name, status = %engine, "engine run failed");
    }
    let _ = writeln!(env.announce, "{}: engine {}", bench.name, engine);

    let (archived, archive_error) = archive_outputs(
        bench.name,
        &options.config_identity,
        layout,
        &mut *env.store,
    );
    if let Some(err) = &archive_error {
        let _ = writeln!(env.announce, "{}: archival failed: {}", bench.name, err);
    }

    BenchmarkOutcome {
        name: bench.name.to_string(),
        parameters,
        command: invocation.render(),
        engine,
        archived,
        archive_error,
    }
}

/// The first failing rename ends archival for this benchmark.
pub fn archive_outputs(
    benchmark: &str,
    config_identity: &str,
    layout: &CampaignLayout,
    store: &mut dyn ArtifactStore,
) -> (Vec<ArchivedArtifact>, Option<String>) {
    let mut archived = Vec::new();
    for kind in ArtifactKind::ALL {
        let from = layout.engine_output(kind);
        let to = layout.archive_path(kind, benchmark, config_identity);
        match store.rename_if_exists(&from, &to) {
            Ok(true) => {
                info!(benchmark, kind = kind.as_str(), path = %to.display(), "archived artifact");
                archived.push(ArchivedArtifact {
                    kind,
                    archived_name: archived_name(kind, benchmark, config_identity),
                    path: to,
                });
            }
            Ok(false) => {
                debug!(benchmark, kind = kind.as_str(), "no output to archive");
            }
            Err(err) => {
                let message = format!("{err:#}");
                warn!(benchmark, kind = kind.as_str(), error = %message, "archival failed");
                return (archived, Some(message));
            }
        }
    }
    (archived, None)
}
