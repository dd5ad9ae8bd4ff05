//! Configuration for the radiation propagation system.
//!
//! Loaded from `radiation_config.json` with support for an environment
//! variable override (`RADSIM_CONFIG_PATH`).

use std::{
    env, fs, io,
    path::{Path, PathBuf},
};

use bevy_ecs::prelude::Resource;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::components::RadiationSource;
use crate::propagation::{FloodFillOptions, DEFAULT_DECAY_PER_HOP, DEFAULT_MAX_HOPS};

pub const BUILTIN_RADIATION_CONFIG: &str = include_str!("data/radiation_config.json");

/// Environment variable naming a JSON config file to load instead of the builtin.
pub const CONFIG_PATH_ENV: &str = "RADSIM_CONFIG_PATH";

/// Root configuration for radiation propagation.
#[derive(Resource, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RadiationConfig {
    /// Fixed timestep in seconds (e.g., 1/30 = 0.0333 for 30 Hz).
    pub fixed_timestep: f32,
    /// How much intensity a hop removes.
    pub decay: DecayPolicy,
    /// Prune already-visited neighbors before enqueueing.
    pub skip_visited_neighbors: bool,
    /// Sources whose fill would reach further than this many hops are rejected.
    pub max_hops: u32,
}

impl Default for RadiationConfig {
    fn default() -> Self {
        Self {
            fixed_timestep: 1.0 / 30.0,
            decay: DecayPolicy::default(),
            skip_visited_neighbors: false,
            max_hops: DEFAULT_MAX_HOPS,
        }
    }
}

/// Per-hop decay selection.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum DecayPolicy {
    /// Every source loses the same amount per hop. The source's slope is ignored.
    Flat { per_hop: f32 },
    /// Each source decays by its own configured slope.
    SourceSlope,
}

impl Default for DecayPolicy {
    fn default() -> Self {
        Self::Flat {
            per_hop: DEFAULT_DECAY_PER_HOP,
        }
    }
}

impl DecayPolicy {
    pub fn decay_for(&self, source: &RadiationSource) -> f32 {
        match self {
            DecayPolicy::Flat { per_hop } => *per_hop,
            DecayPolicy::SourceSlope => source.slope,
        }
    }
}

#[derive(Debug, Error)]
pub enum RadiationConfigError {
    #[error("failed to parse radiation config: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("failed to read radiation config from {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl RadiationConfig {
    /// The config compiled into the crate. Falls back to defaults if it fails to parse.
    pub fn builtin() -> Self {
        Self::from_json_str(BUILTIN_RADIATION_CONFIG).unwrap_or_else(|err| {
            tracing::warn!(
                target: "radsim::config",
                error = %err,
                "radiation_config.builtin_invalid"
            );
            Self::default()
        })
    }

    pub fn from_json_str(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn from_file(path: &Path) -> Result<Self, RadiationConfigError> {
        let contents = fs::read_to_string(path).map_err(|source| RadiationConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config = RadiationConfig::from_json_str(&contents)?;
        Ok(config)
    }

    /// Flood fill options for a particular source.
    pub fn fill_options_for(&self, source: &RadiationSource) -> FloodFillOptions {
        FloodFillOptions {
            decay_per_hop: self.decay.decay_for(source),
            skip_visited_neighbors: self.skip_visited_neighbors,
            max_hops: self.max_hops,
        }
    }
}

/// Load radiation configuration from `RADSIM_CONFIG_PATH`, or the builtin copy.
pub fn load_radiation_config_from_env() -> (RadiationConfig, Option<PathBuf>) {
    if let Some(path) = env::var_os(CONFIG_PATH_ENV).map(PathBuf::from) {
        match RadiationConfig::from_file(&path) {
            Ok(config) => {
                tracing::info!(
                    target: "radsim::config",
                    path = %path.display(),
                    "radiation_config.loaded=file"
                );
                return (config, Some(path));
            }
            Err(err) => {
                tracing::warn!(
                    target: "radsim::config",
                    path = %path.display(),
                    error = %err,
                    "radiation_config.load_failed"
                );
            }
        }
    }

    tracing::info!(target: "radsim::config", "radiation_config.loaded=builtin");
    (RadiationConfig::builtin(), None)
}
