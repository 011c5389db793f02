//! Run configuration.

use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use itertools::Itertools;
use serde::{Deserialize, Serialize};

use crate::cd_synth::blend::BlendMode;
use crate::cd_synth::instance::{TransformConfig, TruthMode};
use crate::cd_synth::synthesis::{ColorReference, DEFAULT_MAX_ATTEMPTS, DEFAULT_TARGET_COUNT};
use crate::error::SynthesisError;

/// Seed of the reference runs.
pub const DEFAULT_SEED: u64 = 2020;

/// Everything a synthesis run needs besides the dataset paths.
///
/// Missing fields take their default values when deserialized.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SynthesisConfig {
    /// Instances pasted into each scene.
    pub target_count: usize,
    /// Blend modes; each one produces a full output set.
    pub modes: Vec<BlendMode>,
    pub truth_mode: TruthMode,
    /// Failed placements tolerated per scene.
    pub max_attempts: usize,
    pub seed: u64,
    pub color_reference: ColorReference,
    /// File extension of every raster, without the dot.
    pub extension: String,
    pub transform: TransformConfig,
}

impl Default for SynthesisConfig {
    fn default() -> Self {
        Self {
            target_count: DEFAULT_TARGET_COUNT,
            modes: vec![BlendMode::poisson()],
            truth_mode: TruthMode::default(),
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            seed: DEFAULT_SEED,
            color_reference: ColorReference::default(),
            extension: "png".to_owned(),
            transform: TransformConfig::default(),
        }
    }
}

impl SynthesisConfig {
    /// Rejects configurations that cannot run.
    ///
    /// # Errors
    ///
    /// `SynthesisError::InvalidConfig` describing the first problem found.
    pub fn validate(&self) -> Result<(), SynthesisError> {
        if self.modes.is_empty() {
            return Err(invalid("at least one blend mode is required"));
        }
        for mode in &self.modes {
            mode.validate()
                .map_err(|e| invalid(format!("blend mode `{mode}`: {e}")))?;
        }
        // Each mode writes to `<out>/<name>_<truth>`.
        if let Some(mode) = self.modes.iter().duplicates_by(|mode| mode.name()).next() {
            return Err(invalid(format!(
                "blend mode `{}` is configured more than once and would share an output directory",
                mode.name()
            )));
        }
        if self.max_attempts == 0 && self.target_count > 0 {
            return Err(invalid("max_attempts must be positive when instances are requested"));
        }
        if self.extension.is_empty() || self.extension.contains(['.', '/', '\\']) {
            return Err(invalid(format!(
                "extension `{}` must be a bare file extension",
                self.extension
            )));
        }
        match self.transform {
            TransformConfig::Scale { min, max } if min <= 0.0 || max <= 0.0 => {
                Err(invalid("scale factors must be positive"))
            }
            TransformConfig::Rotate { max_degrees } if !max_degrees.is_finite() => {
                Err(invalid("rotation limit must be finite"))
            }
            _ => Ok(()),
        }
    }

    /// Reads a configuration from a JSON file.
    ///
    /// # Errors
    ///
    /// `SynthesisError::Io` when the file cannot be opened and
    /// `SynthesisError::Config` when it is not a valid configuration.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, SynthesisError> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| SynthesisError::io(path, e))?;
        serde_json::from_reader(BufReader::new(file)).map_err(|source| SynthesisError::Config {
            path: path.to_owned(),
            source,
        })
    }

    /// Writes the configuration as pretty-printed JSON.
    ///
    /// # Errors
    ///
    /// `SynthesisError::Io` or `SynthesisError::Config` naming `path`.
    pub fn write_json_file(&self, path: impl AsRef<Path>) -> Result<(), SynthesisError> {
        let path = path.as_ref();
        let file = File::create(path).map_err(|e| SynthesisError::io(path, e))?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, self).map_err(|source| SynthesisError::Config {
            path: path.to_owned(),
            source,
        })?;
        writeln!(writer)
            .and_then(|()| writer.flush())
            .map_err(|e| SynthesisError::io(path, e))
    }
}

fn invalid(message: impl Into<String>) -> SynthesisError {
    SynthesisError::InvalidConfig(message.into())
}
