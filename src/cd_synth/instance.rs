//! Donor instances and the pool they are drawn from.

use std::fmt;
use std::str::FromStr;

use image::imageops::{self, FilterType};
use image::{Luma, Rgb};
use imageproc::geometric_transformations::{rotate_about_center, Interpolation};
use imageproc::map::map_colors;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::SynthesisError;
use crate::Image;

/// A donor patch with its mask.
///
/// The bounding box of the instance is the full extent of the mask; the
/// patch is never cropped further.
#[derive(Debug, Clone, PartialEq)]
pub struct Instance {
    pub id: String,
    patch: Image<Rgb<u8>>,
    mask: Image<Luma<u8>>,
}

impl Instance {
    /// # Errors
    ///
    /// `SynthesisError::InstanceShapeMismatch` when patch and mask differ in size.
    pub fn new(
        id: impl Into<String>,
        patch: Image<Rgb<u8>>,
        mask: Image<Luma<u8>>,
    ) -> Result<Self, SynthesisError> {
        let id = id.into();
        if patch.dimensions() != mask.dimensions() {
            return Err(SynthesisError::InstanceShapeMismatch {
                id,
                patch_dims: patch.dimensions(),
                mask_dims: mask.dimensions(),
            });
        }
        Ok(Self { id, patch, mask })
    }

    pub const fn patch(&self) -> &Image<Rgb<u8>> {
        &self.patch
    }

    pub const fn mask(&self) -> &Image<Luma<u8>> {
        &self.mask
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.mask.dimensions()
    }

    /// Mask binarized to `{0, 1}` for compositing: every non-zero pixel,
    /// shadow included, is pasted.
    pub fn blend_mask(&self) -> Image<Luma<u8>> {
        map_colors(&self.mask, |Luma([v])| Luma([u8::from(v != 0)]))
    }

    /// Mask of the pixels that count as change under `mode`, as `{0, 255}`.
    pub fn true_mask(&self, mode: TruthMode) -> Image<Luma<u8>> {
        mode.true_mask(&self.mask)
    }
}

/// Which raw mask value marks true foreground
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TruthMode {
    /// Masks are `{0, 255}`; 255 is foreground.
    Binary,
    /// Masks carry a shadow ring; only 200 is foreground.
    #[default]
    Shadow,
}

impl TruthMode {
    pub const fn true_value(self) -> u8 {
        match self {
            Self::Binary => 255,
            Self::Shadow => 200,
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            Self::Binary => "binary",
            Self::Shadow => "shadow",
        }
    }

    /// Pixels equal to [`Self::true_value`] become 255, everything else 0.
    pub fn true_mask(self, mask: &Image<Luma<u8>>) -> Image<Luma<u8>> {
        let value = self.true_value();
        map_colors(mask, |Luma([v])| Luma([if v == value { 255 } else { 0 }]))
    }
}

impl fmt::Display for TruthMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for TruthMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "binary" => Ok(Self::Binary),
            "shadow" => Ok(Self::Shadow),
            other => Err(format!("unknown truth mode `{other}`, expected binary or shadow")),
        }
    }
}

/// Geometric pre-transform applied to a donor before placement.
///
/// Implementations must move patch and mask together so every mask pixel
/// still describes the patch pixel under it.
pub trait InstanceTransform {
    fn apply<R: Rng + ?Sized>(&self, instance: Instance, rng: &mut R) -> Instance;
}

/// Leaves the donor untouched.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Identity;

impl InstanceTransform for Identity {
    fn apply<R: Rng + ?Sized>(&self, instance: Instance, _rng: &mut R) -> Instance {
        instance
    }
}

/// Rotates patch and mask about their center by one angle drawn uniformly
/// from `-max_degrees..=max_degrees`.
///
/// The raster keeps its size; corners rotated out of it are lost and the
/// uncovered area is black with an empty mask.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RandomRotation {
    pub max_degrees: f32,
}

impl InstanceTransform for RandomRotation {
    fn apply<R: Rng + ?Sized>(&self, instance: Instance, rng: &mut R) -> Instance {
        let limit = self.max_degrees.abs();
        if limit == 0.0 {
            return instance;
        }
        let theta = rng.random_range(-limit..=limit).to_radians();
        Instance {
            patch: rotate_about_center(
                &instance.patch,
                theta,
                Interpolation::Bilinear,
                Rgb([0, 0, 0]),
            ),
            // Nearest keeps the mask values exact.
            mask: rotate_about_center(&instance.mask, theta, Interpolation::Nearest, Luma([0])),
            id: instance.id,
        }
    }
}

/// Resizes patch and mask by one factor drawn uniformly from `min..=max`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RandomScale {
    pub min: f32,
    pub max: f32,
}

impl InstanceTransform for RandomScale {
    fn apply<R: Rng + ?Sized>(&self, instance: Instance, rng: &mut R) -> Instance {
        let (low, high) = (self.min.min(self.max), self.min.max(self.max));
        if low <= 0.0 {
            return instance;
        }
        let factor = if low == high {
            low
        } else {
            rng.random_range(low..=high)
        };
        let (width, height) = instance.dimensions();
        let scaled = |side: u32| ((side as f32 * factor).round() as u32).max(1);
        let (new_width, new_height) = (scaled(width), scaled(height));

        Instance {
            patch: imageops::resize(&instance.patch, new_width, new_height, FilterType::Triangle),
            mask: imageops::resize(&instance.mask, new_width, new_height, FilterType::Nearest),
            id: instance.id,
        }
    }
}

/// Serializable choice of pre-transform
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum TransformConfig {
    #[default]
    None,
    Rotate {
        max_degrees: f32,
    },
    Scale {
        min: f32,
        max: f32,
    },
}

impl InstanceTransform for TransformConfig {
    fn apply<R: Rng + ?Sized>(&self, instance: Instance, rng: &mut R) -> Instance {
        match *self {
            Self::None => Identity.apply(instance, rng),
            Self::Rotate { max_degrees } => RandomRotation { max_degrees }.apply(instance, rng),
            Self::Scale { min, max } => RandomScale { min, max }.apply(instance, rng),
        }
    }
}

/// Indexed access to a fixed-order donor pool.
pub trait DonorSource: Sync {
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Loads donor `index`, which must be below [`Self::len`].
    fn load(&self, index: usize) -> Result<Instance, SynthesisError>;
}

/// Donors held in memory.
#[derive(Debug, Clone, Default)]
pub struct DonorPool {
    instances: Vec<Instance>,
}

impl DonorPool {
    pub const fn new(instances: Vec<Instance>) -> Self {
        Self { instances }
    }

    pub fn instances(&self) -> &[Instance] {
        &self.instances
    }
}

impl From<Vec<Instance>> for DonorPool {
    fn from(instances: Vec<Instance>) -> Self {
        Self::new(instances)
    }
}

impl DonorSource for DonorPool {
    fn len(&self) -> usize {
        self.instances.len()
    }

    fn load(&self, index: usize) -> Result<Instance, SynthesisError> {
        self.instances
            .get(index)
            .cloned()
            .ok_or(SynthesisError::DonorIndexOutOfRange {
                index,
                len: self.instances.len(),
            })
    }
}
