use serde::Serialize;
use std::path::{Path, PathBuf};

pub const TTABLE_BITS: u32 = 20;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CampaignLayout {
    pub engine: String,
    pub stat_dir: PathBuf,
    pub dataset_dir: PathBuf,
    pub symbol_set_dir: PathBuf,
}

impl Default for CampaignLayout {
    fn default() -> Self {
        Self {
            engine: "sr".to_string(),
            stat_dir: PathBuf::from("stat"),
            dataset_dir: PathBuf::from("dataset"),
            symbol_set_dir: PathBuf::from("symbolset"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactKind {
    Aggregate,
    TimeSeries,
    Summary,
}

impl ArtifactKind {
    pub const ALL: [ArtifactKind; 3] = [
        ArtifactKind::Aggregate,
        ArtifactKind::TimeSeries,
        ArtifactKind::Summary,
    ];

    pub fn engine_file_name(self) -> &'static str {
        match self {
            ArtifactKind::Aggregate => "arl",
            ArtifactKind::TimeSeries => "dynamic",
            ArtifactKind::Summary => "summary",
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            ArtifactKind::Aggregate => ".arl",
            ArtifactKind::TimeSeries => ".dyn",
            ArtifactKind::Summary => ".sum",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ArtifactKind::Aggregate => "aggregate",
            ArtifactKind::TimeSeries => "time_series",
            ArtifactKind::Summary => "summary",
        }
    }
}

impl CampaignLayout {
    pub fn dataset_path(&self, dataset: &str) -> PathBuf {
        self.dataset_dir.join(dataset)
    }

    pub fn symbol_set_path(&self, symbol_set: &str) -> PathBuf {
        self.symbol_set_dir.join(symbol_set)
    }

    pub fn engine_output(&self, kind: ArtifactKind) -> PathBuf {
        self.stat_dir.join(kind.engine_file_name())
    }

    pub fn archive_path(&self, kind: ArtifactKind, benchmark: &str, identity: &str) -> PathBuf {
        self.stat_dir.join(archived_name(kind, benchmark, identity))
    }
}

pub fn archived_name(kind: ArtifactKind, benchmark: &str, identity: &str) -> String {
    format!("{}_{}{}", benchmark, identity, kind.extension())
}

pub(crate) fn path_arg(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}
