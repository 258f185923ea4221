use serde::Serialize;
use std::collections::BTreeSet;

/// One named regression problem: a dataset plus the engine's base search budget.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BenchmarkSpec {
    pub name: &'static str,
    pub dataset_path: &'static str,
    pub generations: u64,
    pub population_size: u64,
    pub program_size: u64,
    pub rounds: u64,
    /// `None` runs the engine with its default symbol set.
    pub symbol_set: Option<&'static str>,
}

// Declaration order is the execution order of a campaign.
pub const CATALOGUE: &[BenchmarkSpec] = &[
    BenchmarkSpec {
        name: "petalrose",
        dataset_path: "petalrose.dat",
        generations: 80,
        population_size: 500,
        program_size: 200,
        rounds: 80,
        symbol_set: Some("arithmetic"),
    },
    BenchmarkSpec {
        name: "mep_bias",
        dataset_path: "mep.dat",
        generations: 80,
        population_size: 30,
        program_size: 20,
        rounds: 100,
        symbol_set: Some("mep"),
    },
    BenchmarkSpec {
        name: "x2y2_z2",
        dataset_path: "x2y2_z2.dat",
        generations: 80,
        population_size: 200,
        program_size: 500,
        rounds: 40,
        symbol_set: Some("math"),
    },
    BenchmarkSpec {
        name: "mep",
        dataset_path: "mep.dat",
        generations: 80,
        population_size: 200,
        program_size: 500,
        rounds: 100,
        symbol_set: None,
    },
    BenchmarkSpec {
        name: "petalrose3",
        dataset_path: "petalrose3.dat",
        generations: 60,
        population_size: 500,
        program_size: 200,
        rounds: 80,
        symbol_set: Some("arithmetic"),
    },
];

pub fn find<'a>(catalogue: &'a [BenchmarkSpec], name: &str) -> Option<&'a BenchmarkSpec> {
    catalogue.iter().find(|b| b.name == name)
}

// An empty selection selects everything.
pub fn select<'a>(
    catalogue: &'a [BenchmarkSpec],
    selected: &BTreeSet<String>,
) -> Vec<&'a BenchmarkSpec> {
    catalogue
        .iter()
        .filter(|b| selected.is_empty() || selected.contains(b.name))
        .collect()
}

pub fn unknown_names(catalogue: &[BenchmarkSpec], selected: &BTreeSet<String>) -> Vec<String> {
    selected
        .iter()
        .filter(|name| find(catalogue, name).is_none())
        .cloned()
        .collect()
}
