//! Dataset enumeration and raster I/O.
//!
//! A scene set is five aligned directories (`A`, `B`, `label`, `label1`,
//! `label2`) plus an occupancy reference directory, matched by sorted file
//! name. Donors are an image directory and a mask directory, paired the
//! same way.

use std::fs;
use std::path::{Path, PathBuf};

use image::{Luma, Rgb};
use rand::seq::SliceRandom;
use rand::Rng;

use crate::cd_synth::blend::BlendMode;
use crate::cd_synth::instance::{DonorSource, Instance, TruthMode};
use crate::cd_synth::scene::{SceneOutputs, SceneRasters};
use crate::error::SynthesisError;
use crate::Image;

/// Directories of one synthesis run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatasetLayout {
    pub image1_dir: PathBuf,
    pub image2_dir: PathBuf,
    pub label_dir: PathBuf,
    pub label1_dir: PathBuf,
    pub label2_dir: PathBuf,
    /// Occupancy reference, usually the combined label directory.
    pub reference_dir: PathBuf,
    pub donor_image_dir: PathBuf,
    pub donor_mask_dir: PathBuf,
    pub output_dir: PathBuf,
}

impl DatasetLayout {
    /// Conventional layout: `<scenes>/{A,B,label,label1,label2}` with the
    /// combined label as reference, and `<donors>/{image,mask}`.
    pub fn new(
        scene_root: impl AsRef<Path>,
        donor_root: impl AsRef<Path>,
        output_dir: impl Into<PathBuf>,
    ) -> Self {
        let scenes = scene_root.as_ref();
        let donors = donor_root.as_ref();
        Self {
            image1_dir: scenes.join("A"),
            image2_dir: scenes.join("B"),
            label_dir: scenes.join("label"),
            label1_dir: scenes.join("label1"),
            label2_dir: scenes.join("label2"),
            reference_dir: scenes.join("label"),
            donor_image_dir: donors.join("image"),
            donor_mask_dir: donors.join("mask"),
            output_dir: output_dir.into(),
        }
    }

    /// Pairs the per-scene files by position in the sorted listings.
    ///
    /// # Errors
    ///
    /// `SynthesisError::FileCountMismatch` when any listing differs in length
    /// from the first branch listing, before any file is read.
    pub fn scene_files(&self, extension: &str) -> Result<Vec<SceneFiles>, SynthesisError> {
        let image1 = list_files(&self.image1_dir, extension)?;
        let expected = image1.len();
        let listing = |list: &'static str, dir: &Path| -> Result<Vec<PathBuf>, SynthesisError> {
            let files = list_files(dir, extension)?;
            if files.len() == expected {
                Ok(files)
            } else {
                Err(SynthesisError::FileCountMismatch {
                    list,
                    expected,
                    actual: files.len(),
                })
            }
        };
        let image2 = listing("image2", &self.image2_dir)?;
        let label = listing("label", &self.label_dir)?;
        let label1 = listing("label1", &self.label1_dir)?;
        let label2 = listing("label2", &self.label2_dir)?;
        let reference = listing("reference", &self.reference_dir)?;

        Ok(itertools::izip!(image1, image2, label, label1, label2, reference)
            .map(|(image1, image2, label, label1, label2, reference)| SceneFiles {
                image1,
                image2,
                label,
                label1,
                label2,
                reference,
            })
            .collect())
    }
}

/// Paths of the rasters of one scene.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SceneFiles {
    pub image1: PathBuf,
    pub image2: PathBuf,
    pub label: PathBuf,
    pub label1: PathBuf,
    pub label2: PathBuf,
    pub reference: PathBuf,
}

impl SceneFiles {
    /// File name shared by the outputs of this scene.
    pub fn basename(&self) -> String {
        file_name(&self.image1)
    }

    /// # Errors
    ///
    /// `SynthesisError::Image` naming the first raster that cannot be read.
    pub fn load(&self) -> Result<SceneRasters, SynthesisError> {
        Ok(SceneRasters {
            image1: read_rgb(&self.image1)?,
            image2: read_rgb(&self.image2)?,
            label: read_luma(&self.label)?,
            label1: read_luma(&self.label1)?,
            label2: read_luma(&self.label2)?,
            reference: read_luma(&self.reference)?,
        })
    }
}

/// Files in `dir` with the given extension (case-insensitive), sorted by name.
///
/// # Errors
///
/// `SynthesisError::Io` naming `dir` when it cannot be listed.
pub fn list_files(dir: &Path, extension: &str) -> Result<Vec<PathBuf>, SynthesisError> {
    let entries = fs::read_dir(dir).map_err(|e| SynthesisError::io(dir, e))?;
    let mut files = Vec::new();
    for entry in entries {
        let path = entry.map_err(|e| SynthesisError::io(dir, e))?.path();
        let matches = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case(extension));
        if matches && path.is_file() {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Reads any supported raster as 8-bit RGB.
///
/// # Errors
///
/// `SynthesisError::Image` naming `path`.
pub fn read_rgb(path: &Path) -> Result<Image<Rgb<u8>>, SynthesisError> {
    image::open(path)
        .map(|image| image.to_rgb8())
        .map_err(|e| SynthesisError::image(path, e))
}

/// Reads any supported raster as 8-bit single channel.
///
/// # Errors
///
/// `SynthesisError::Image` naming `path`.
pub fn read_luma(path: &Path) -> Result<Image<Luma<u8>>, SynthesisError> {
    image::open(path)
        .map(|image| image.to_luma8())
        .map_err(|e| SynthesisError::image(path, e))
}

/// Donors on disk, loaded on demand in a fixed (optionally shuffled) order.
#[derive(Debug, Clone, Default)]
pub struct DiskDonorPool {
    pairs: Vec<(PathBuf, PathBuf)>,
}

impl DiskDonorPool {
    /// Pairs donor images and masks by position in their sorted listings.
    ///
    /// # Errors
    ///
    /// * `SynthesisError::Io` - when a directory cannot be listed
    /// * `SynthesisError::FileCountMismatch` - when the two listings differ in length
    pub fn open(image_dir: &Path, mask_dir: &Path, extension: &str) -> Result<Self, SynthesisError> {
        let images = list_files(image_dir, extension)?;
        let masks = list_files(mask_dir, extension)?;
        if images.len() != masks.len() {
            return Err(SynthesisError::FileCountMismatch {
                list: "donor masks",
                expected: images.len(),
                actual: masks.len(),
            });
        }
        Ok(Self {
            pairs: images.into_iter().zip(masks).collect(),
        })
    }

    pub fn from_pairs(pairs: Vec<(PathBuf, PathBuf)>) -> Self {
        Self { pairs }
    }

    /// Shuffles the draw order once; the order is fixed afterwards.
    pub fn shuffle<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        self.pairs.shuffle(rng);
    }

    pub fn pairs(&self) -> &[(PathBuf, PathBuf)] {
        &self.pairs
    }
}

impl DonorSource for DiskDonorPool {
    fn len(&self) -> usize {
        self.pairs.len()
    }

    /// The donor identifier is its image path.
    fn load(&self, index: usize) -> Result<Instance, SynthesisError> {
        let (image_path, mask_path) =
            self.pairs
                .get(index)
                .ok_or(SynthesisError::DonorIndexOutOfRange {
                    index,
                    len: self.pairs.len(),
                })?;
        Instance::new(
            image_path.display().to_string(),
            read_rgb(image_path)?,
            read_luma(mask_path)?,
        )
    }
}

/// Output directories of one blend mode, `<out>/<mode>_<truth>/{A,B,label,label1,label2}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputDirs {
    pub root: PathBuf,
    pub image1: PathBuf,
    pub image2: PathBuf,
    pub label: PathBuf,
    pub label1: PathBuf,
    pub label2: PathBuf,
}

impl OutputDirs {
    pub fn new(output_dir: &Path, mode: &BlendMode, truth_mode: TruthMode) -> Self {
        let root = output_dir.join(format!("{}_{}", mode.name(), truth_mode.name()));
        Self {
            image1: root.join("A"),
            image2: root.join("B"),
            label: root.join("label"),
            label1: root.join("label1"),
            label2: root.join("label2"),
            root,
        }
    }

    /// Creates every directory, parents included.
    ///
    /// # Errors
    ///
    /// `SynthesisError::Io` naming the directory that could not be created.
    pub fn create(&self) -> Result<(), SynthesisError> {
        for dir in [
            &self.image1,
            &self.image2,
            &self.label,
            &self.label1,
            &self.label2,
        ] {
            fs::create_dir_all(dir).map_err(|e| SynthesisError::io(dir, e))?;
        }
        Ok(())
    }

    /// Writes the five scene rasters under `basename`; the format follows its extension.
    ///
    /// # Errors
    ///
    /// `SynthesisError::Image` naming the file that could not be written.
    pub fn write_scene(&self, basename: &str, outputs: &SceneOutputs) -> Result<(), SynthesisError> {
        let save_rgb = |dir: &Path, image: &Image<Rgb<u8>>| {
            let path = dir.join(basename);
            image.save(&path).map_err(|e| SynthesisError::image(path, e))
        };
        let save_luma = |dir: &Path, image: &Image<Luma<u8>>| {
            let path = dir.join(basename);
            image.save(&path).map_err(|e| SynthesisError::image(path, e))
        };
        save_rgb(&self.image1, &outputs.image1)?;
        save_rgb(&self.image2, &outputs.image2)?;
        save_luma(&self.label, &outputs.label)?;
        save_luma(&self.label1, &outputs.label1)?;
        save_luma(&self.label2, &outputs.label2)
    }
}
