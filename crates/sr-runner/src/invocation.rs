use crate::catalogue::BenchmarkSpec;
use crate::layout::{path_arg, CampaignLayout, TTABLE_BITS};
use crate::options::RunOptions;
use rand::Rng;
use serde::Serialize;
use std::fmt;
use std::io::Write;

pub const SEED_UPPER_BOUND: u64 = 1_000_000_000;

pub trait SeedSource {
    fn next_seed(&mut self) -> u64;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct RandomSeeds;

impl SeedSource for RandomSeeds {
    fn next_seed(&mut self) -> u64 {
        rand::thread_rng().gen_range(0..SEED_UPPER_BOUND)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct EffectiveParameters {
    pub generations: u64,
    pub rounds: u64,
    pub seed: Option<u64>,
}

impl EffectiveParameters {
    pub fn declared(bench: &BenchmarkSpec) -> Self {
        Self {
            generations: bench.generations,
            rounds: bench.rounds,
            seed: None,
        }
    }
}

pub type Adjustment =
    fn(EffectiveParameters, &RunOptions, &mut dyn SeedSource) -> EffectiveParameters;

// Order matters: ARL halves the already inflated budget.
pub const ADJUSTMENTS: &[(&str, Adjustment)] = &[
    ("random_mode", randomize),
    ("arl", halve_for_arl),
];

/// Rounds x2, generations x1.5 rounded down, plus a fresh seed.
pub fn randomize(
    params: EffectiveParameters,
    options: &RunOptions,
    seeds: &mut dyn SeedSource,
) -> EffectiveParameters {
    if options.debug {
        return params;
    }
    EffectiveParameters {
        generations: params.generations * 3 / 2,
        rounds: params.rounds * 2,
        seed: Some(seeds.next_seed()),
    }
}

pub fn halve_for_arl(
    params: EffectiveParameters,
    options: &RunOptions,
    _seeds: &mut dyn SeedSource,
) -> EffectiveParameters {
    if !options.arl {
        return params;
    }
    EffectiveParameters {
        generations: params.generations / 2,
        rounds: params.rounds / 2,
        ..params
    }
}

pub fn effective_parameters(
    bench: &BenchmarkSpec,
    options: &RunOptions,
    seeds: &mut dyn SeedSource,
) -> EffectiveParameters {
    ADJUSTMENTS
        .iter()
        .fold(EffectiveParameters::declared(bench), |params, (_, step)| {
            step(params, options, &mut *seeds)
        })
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Invocation {
    pub program: String,
    pub args: Vec<String>,
}

impl Invocation {
    pub fn render(&self) -> String {
        std::iter::once(&self.program)
            .chain(self.args.iter())
            .map(|p| shell_quote(p))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl fmt::Display for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

pub fn build_invocation(
    bench: &BenchmarkSpec,
    options: &RunOptions,
    layout: &CampaignLayout,
    seeds: &mut dyn SeedSource,
) -> (EffectiveParameters, Invocation) {
    let params = effective_parameters(bench, options, seeds);

    let mut args: Vec<String> = vec![
        "--verbose".into(),
        "--elitism".into(),
        options.elitism.to_string(),
        "--stat-dir".into(),
        path_arg(&layout.stat_dir),
        "--stat-dynamic".into(),
        "--stat-summary".into(),
        "--ttable".into(),
        TTABLE_BITS.to_string(),
        "-g".into(),
        params.generations.to_string(),
        "-P".into(),
        bench.population_size.to_string(),
        "-p".into(),
        bench.program_size.to_string(),
        "-r".into(),
        params.rounds.to_string(),
    ];
    if let Some(seed) = params.seed {
        args.push("--random-seed".into());
        args.push(seed.to_string());
    }
    if options.arl {
        args.push("--arl".into());
        args.push("--stat-arl".into());
    }
    if let Some(symbol_set) = bench.symbol_set {
        args.push("-s".into());
        args.push(path_arg(&layout.symbol_set_path(symbol_set)));
    }
    args.push(path_arg(&layout.dataset_path(bench.dataset_path)));

    let invocation = Invocation {
        program: layout.engine.clone(),
        args,
    };
    (params, invocation)
}

pub fn echo_if_verbose(
    options: &RunOptions,
    invocation: &Invocation,
    out: &mut dyn Write,
) -> std::io::Result<()> {
    if options.verbose {
        writeln!(out, "{}", invocation.render())?;
    }
    Ok(())
}

fn shell_quote(s: &str) -> String {
    if s.is_empty() {
        "''".to_string()
    } else if s
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || "-_./:".contains(c))
    {
        s.to_string()
    } else {
        format!("'{}'", s.replace('\'', "'\"'\"'"))
    }
}
