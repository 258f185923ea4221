pub mod campaign;
pub mod catalogue;
pub mod error;
pub mod invocation;
pub mod layout;
pub mod options;

#[cfg(test)]
mod test_support;

pub use campaign::{
    archive_outputs, run_campaign, run_system_campaign, ArchivedArtifact, ArtifactStore,
    BenchmarkOutcome, CampaignEnv, CampaignReport, CommandRunner, EngineStatus, FsArtifactStore,
    ProcessRunner,
};
pub use catalogue::{BenchmarkSpec, CATALOGUE};
pub use error::ConfigError;
pub use invocation::{
    build_invocation, effective_parameters, EffectiveParameters, Invocation, RandomSeeds,
    SeedSource,
};
pub use layout::{ArtifactKind, CampaignLayout, TTABLE_BITS};
pub use options::{resolve_options, OptionOverrides, RunOptions};
