//! Append-only run logs.
//!
//! `add_instances_log.txt` lists the donors pasted into each scene, one per
//! line, each scene closed by a separator line. `add_instances_nums_log.txt`
//! holds one `<scene> <placed>` line per scene, a comment line for every
//! scene that ended short of its target, and the run total last.

use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::cd_synth::synthesis::SceneReport;
use crate::config::SynthesisConfig;
use crate::error::SynthesisError;

pub const INSTANCES_LOG: &str = "add_instances_log.txt";
pub const COUNTS_LOG: &str = "add_instances_nums_log.txt";
pub const RUN_CONFIG: &str = "run_config.json";
pub const SCENE_SEPARATOR: &str = "============================";

/// The two provenance logs of one output directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProvenanceLog {
    instances_path: PathBuf,
    counts_path: PathBuf,
}

impl ProvenanceLog {
    /// Starts both logs empty in `dir`.
    ///
    /// # Errors
    ///
    /// `SynthesisError::Io` naming the log that could not be created.
    pub fn create(dir: &Path) -> Result<Self, SynthesisError> {
        let log = Self {
            instances_path: dir.join(INSTANCES_LOG),
            counts_path: dir.join(COUNTS_LOG),
        };
        for path in [&log.instances_path, &log.counts_path] {
            File::create(path).map_err(|e| SynthesisError::io(path, e))?;
        }
        Ok(log)
    }

    pub fn instances_path(&self) -> &Path {
        &self.instances_path
    }

    pub fn counts_path(&self) -> &Path {
        &self.counts_path
    }

    /// Appends the donors and the count of one scene.
    ///
    /// # Errors
    ///
    /// `SynthesisError::Io` naming the log that could not be written.
    pub fn record_scene(
        &self,
        basename: &str,
        report: &SceneReport,
        target_count: usize,
    ) -> Result<(), SynthesisError> {
        append(&self.instances_path, |w| {
            for donor in &report.donors {
                writeln!(w, "{donor}")?;
            }
            writeln!(w, "{SCENE_SEPARATOR}")
        })?;
        append(&self.counts_path, |w| {
            writeln!(w, "{basename} {}", report.placed)?;
            if report.shortfall > 0 {
                writeln!(
                    w,
                    "# shortfall {basename} {}/{target_count} after {} attempts",
                    report.placed, report.attempts
                )?;
            }
            Ok(())
        })
    }

    /// Appends the run-wide total.
    ///
    /// # Errors
    ///
    /// `SynthesisError::Io` naming the count log.
    pub fn finish(&self, total_placed: usize) -> Result<(), SynthesisError> {
        append(&self.counts_path, |w| {
            writeln!(w, "total paste instances num: {total_placed}")
        })
    }
}

/// Records the resolved configuration next to the logs.
///
/// # Errors
///
/// `SynthesisError::Io` or `SynthesisError::Config` naming the file.
pub fn write_run_config(dir: &Path, config: &SynthesisConfig) -> Result<PathBuf, SynthesisError> {
    let path = dir.join(RUN_CONFIG);
    config.write_json_file(&path)?;
    Ok(path)
}

fn append(
    path: &Path,
    write: impl FnOnce(&mut BufWriter<File>) -> std::io::Result<()>,
) -> Result<(), SynthesisError> {
    let file = OpenOptions::new()
        .append(true)
        .create(true)
        .open(path)
        .map_err(|e| SynthesisError::io(path, e))?;
    let mut writer = BufWriter::new(file);
    write(&mut writer)
        .and_then(|()| writer.flush())
        .map_err(|e| SynthesisError::io(path, e))
}
