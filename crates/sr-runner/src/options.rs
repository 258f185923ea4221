use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

pub const DEFAULT_CONFIG_IDENTITY: &str = "default";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunOptions {
    pub config_identity: String,
    pub debug: bool,
    pub arl: bool,
    pub elitism: bool,
    pub force_input: bool,
    pub verbose: bool,
    /// Empty selects the whole catalogue.
    pub selected_tests: BTreeSet<String>,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            config_identity: DEFAULT_CONFIG_IDENTITY.to_string(),
            debug: true,
            arl: false,
            elitism: true,
            force_input: false,
            verbose: false,
            selected_tests: BTreeSet::new(),
        }
    }
}

/// One override layer. `None` leaves the value of the previous layer alone.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct OptionOverrides {
    pub debug: Option<bool>,
    pub arl: Option<bool>,
    pub elitism: Option<bool>,
    pub force_input: Option<bool>,
    pub verbose: Option<bool>,
}

impl OptionOverrides {
    fn apply(&self, options: &mut RunOptions) {
        let layer = [
            (self.debug, &mut options.debug),
            (self.arl, &mut options.arl),
            (self.elitism, &mut options.elitism),
            (self.force_input, &mut options.force_input),
            (self.verbose, &mut options.verbose),
        ];
        for (value, slot) in layer {
            if let Some(v) = value {
                *slot = v;
            }
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct ConfigFile {
    #[serde(rename = "Options", default)]
    options: OptionOverrides,
}

/// Layers built-in defaults, the optional config file and the command line,
/// each strictly overriding the previous one.
pub fn resolve_options(
    config_path: Option<&Path>,
    command_line: OptionOverrides,
    selected_tests: impl IntoIterator<Item = String>,
) -> Result<RunOptions, ConfigError> {
    let mut options = RunOptions::default();
    if let Some(path) = config_path {
        read_config_file(path)?.apply(&mut options);
        options.config_identity = config_identity(path);
    }
    command_line.apply(&mut options);
    options.selected_tests = selected_tests.into_iter().collect();
    Ok(options)
}

pub fn config_identity(path: &Path) -> String {
    path.file_name()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| DEFAULT_CONFIG_IDENTITY.to_string())
}

pub fn read_config_file(path: &Path) -> Result<OptionOverrides, ConfigError> {
    let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let parsed = toml::from_str::<ConfigFile>(&content).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(parsed.options)
}
