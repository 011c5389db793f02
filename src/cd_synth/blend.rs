//! Compositing of a color-matched donor patch into a background patch.
//!
//! Every mode works on three same-sized rasters: the donor patch, a mask
//! binarized to `{0, 1}` and the destination patch. The alpha-map modes
//! build complementary weights
//!
//! ```text
//! alpha_a = 1 where mask == 1, else 0
//! alpha_b = 1 - alpha_a
//! out     = source * alpha_a + dest * alpha_b
//! ```
//!
//! and differ only in how the two maps are softened. Poisson mode replaces
//! the alpha composite with gradient-domain cloning.

use std::fmt;
use std::str::FromStr;

use image::{Luma, Rgb};
use imageproc::distance_transform::Norm;
use imageproc::morphology::dilate;
use serde::{Deserialize, Serialize};

use crate::cd_synth::box_filter::BoxFilter;
use crate::cd_synth::gaussian_filter::GaussianFilter;
use crate::cd_synth::seamless_clone::seamless_clone;
use crate::error::BlendError;
use crate::utils::{mask_max, round_f32_to_u8};
use crate::Image;

/// Default side of the square used to widen masks of pasted buildings.
pub const DEFAULT_FEATHER_SIZE: u32 = 7;
/// Default side of the soft-edge blur kernels.
pub const DEFAULT_BLUR_KERNEL_SIZE: u32 = 7;
/// Default Gaussian standard deviation.
pub const DEFAULT_GAUSSIAN_SIGMA: f32 = 2.0;
/// Default poisson region dilation, suited to LEVIR-CD style imagery.
/// WHU-CD style imagery works better with 15.
pub const DEFAULT_POISSON_DILATION: u32 = 9;

/// Compositing mode with its parameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "lowercase")]
pub enum BlendMode {
    /// Hard-edged cut and paste.
    Direct,
    /// Alpha maps softened with a Gaussian blur.
    Gaussian {
        kernel_size: u32,
        sigma: f32,
        feather_size: u32,
    },
    /// Alpha maps softened with a mean filter.
    Box {
        kernel_size: u32,
        feather_size: u32,
    },
    /// Gradient-domain cloning over the dilated mask.
    Poisson { dilation_size: u32 },
}

impl BlendMode {
    pub const fn gaussian() -> Self {
        Self::Gaussian {
            kernel_size: DEFAULT_BLUR_KERNEL_SIZE,
            sigma: DEFAULT_GAUSSIAN_SIGMA,
            feather_size: DEFAULT_FEATHER_SIZE,
        }
    }

    pub const fn box_blur() -> Self {
        Self::Box {
            kernel_size: DEFAULT_BLUR_KERNEL_SIZE,
            feather_size: DEFAULT_FEATHER_SIZE,
        }
    }

    pub const fn poisson() -> Self {
        Self::Poisson {
            dilation_size: DEFAULT_POISSON_DILATION,
        }
    }

    /// Short lowercase name, used for output directories.
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Direct => "direct",
            Self::Gaussian { .. } => "gaussian",
            Self::Box { .. } => "box",
            Self::Poisson { .. } => "poisson",
        }
    }

    /// Whether the mode honours the mask widening requested for buildings.
    ///
    /// Direct paste keeps the exact mask and poisson cloning blends its own
    /// boundary, so only the two soft-edge modes widen the mask.
    pub const fn uses_feathering(&self) -> bool {
        matches!(self, Self::Gaussian { .. } | Self::Box { .. })
    }

    /// Smallest patch side the mode can composite.
    ///
    /// Poisson cloning keeps the outer one-pixel frame of the patch, so a
    /// patch needs at least one interior pixel.
    pub const fn min_patch_side(&self) -> u32 {
        match self {
            Self::Poisson { .. } => 3,
            Self::Direct | Self::Gaussian { .. } | Self::Box { .. } => 1,
        }
    }

    /// Checks that every kernel size is odd and non-zero.
    pub fn validate(&self) -> Result<(), BlendError> {
        let sizes: &[u32] = match self {
            Self::Direct => &[],
            Self::Gaussian {
                kernel_size,
                feather_size,
                ..
            }
            | Self::Box {
                kernel_size,
                feather_size,
            } => &[*kernel_size, *feather_size],
            Self::Poisson { dilation_size } => std::slice::from_ref(dilation_size),
        };
        match sizes.iter().find(|&&size| size == 0 || size % 2 == 0) {
            Some(&size) => Err(BlendError::InvalidKernelSize { size }),
            None => Ok(()),
        }
    }

    /// Composites `source` into `dest` under `mask`; see [`blend`].
    pub fn blend(
        &self,
        source: &Image<Rgb<u8>>,
        mask: &Image<Luma<u8>>,
        dest: &Image<Rgb<u8>>,
        expand_for_building: bool,
    ) -> Result<Image<Rgb<u8>>, BlendError> {
        blend(source, mask, dest, self, expand_for_building)
    }
}

impl fmt::Display for BlendMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for BlendMode {
    type Err = String;

    /// Parses a mode name into the mode with its default parameters.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "direct" => Ok(Self::Direct),
            "gaussian" => Ok(Self::gaussian()),
            "box" => Ok(Self::box_blur()),
            "poisson" => Ok(Self::poisson()),
            other => Err(format!(
                "unknown blend mode `{other}`, expected direct, gaussian, box or poisson"
            )),
        }
    }
}

/// Whether a blend under `mode` actually widens the mask when the caller asks for it.
pub const fn effective_expansion(mode: &BlendMode, expand_for_building: bool) -> bool {
    expand_for_building && mode.uses_feathering()
}

/// Dilates the non-zero pixels of `mask` with a `size x size` square,
/// returning a `{0, 255}` mask.
pub fn dilate_mask(mask: &Image<Luma<u8>>, size: u32) -> Image<Luma<u8>> {
    let radius = u8::try_from(size / 2).unwrap_or(u8::MAX);
    dilate(mask, Norm::LInf, radius)
}

fn validate_inputs(
    source: &Image<Rgb<u8>>,
    mask: &Image<Luma<u8>>,
    dest: &Image<Rgb<u8>>,
) -> Result<(), BlendError> {
    if source.dimensions() != mask.dimensions() || source.dimensions() != dest.dimensions() {
        return Err(BlendError::DimensionMismatch {
            source_dims: source.dimensions(),
            mask_dims: mask.dimensions(),
            dest_dims: dest.dimensions(),
        });
    }
    match mask_max(mask) {
        0 => Err(BlendError::EmptyMask),
        1 => Ok(()),
        max => Err(BlendError::MaskNotBinary { max }),
    }
}

/// Builds the complementary alpha maps, optionally widened by `feather_size`.
fn alpha_maps(
    mask: &Image<Luma<u8>>,
    feather_size: Option<u32>,
) -> (Image<Luma<f32>>, Image<Luma<f32>>) {
    let footprint = match feather_size {
        // The dilation already contains the mask, so the ring between the
        // two is added to the donor side.
        Some(size) => dilate_mask(mask, size),
        None => mask.clone(),
    };
    let alpha_a: Image<Luma<f32>> = Image::from_fn(mask.width(), mask.height(), |x, y| {
        Luma([if footprint.get_pixel(x, y)[0] != 0 { 1.0 } else { 0.0 }])
    });
    let alpha_b = Image::from_fn(mask.width(), mask.height(), |x, y| {
        Luma([1.0 - alpha_a.get_pixel(x, y)[0]])
    });
    (alpha_a, alpha_b)
}

fn composite(
    source: &Image<Rgb<u8>>,
    dest: &Image<Rgb<u8>>,
    alpha_a: &Image<Luma<f32>>,
    alpha_b: &Image<Luma<f32>>,
) -> Image<Rgb<u8>> {
    Image::from_fn(dest.width(), dest.height(), |x, y| {
        let Rgb(src) = *source.get_pixel(x, y);
        let Rgb(dst) = *dest.get_pixel(x, y);
        let a = alpha_a.get_pixel(x, y)[0];
        let b = alpha_b.get_pixel(x, y)[0];
        Rgb(std::array::from_fn(|c| {
            round_f32_to_u8(f32::from(src[c]).mul_add(a, f32::from(dst[c]) * b))
        }))
    })
}

/// Composites `source` into `dest` where `mask` is set.
///
/// `expand_for_building` widens the pasted region by dilating the mask
/// before the alpha maps are softened; it is ignored by [`BlendMode::Direct`]
/// and [`BlendMode::Poisson`] (see [`effective_expansion`]).
///
/// # Errors
///
/// * `BlendError::DimensionMismatch` - when the three rasters differ in size
/// * `BlendError::EmptyMask` - when the mask has no foreground pixel
/// * `BlendError::MaskNotBinary` - when the mask holds a value above 1
/// * `BlendError::InvalidKernelSize` - when a mode parameter is even or zero
pub fn blend(
    source: &Image<Rgb<u8>>,
    mask: &Image<Luma<u8>>,
    dest: &Image<Rgb<u8>>,
    mode: &BlendMode,
    expand_for_building: bool,
) -> Result<Image<Rgb<u8>>, BlendError> {
    validate_inputs(source, mask, dest)?;
    mode.validate()?;

    let expand = effective_expansion(mode, expand_for_building);
    match *mode {
        BlendMode::Direct => {
            let (alpha_a, alpha_b) = alpha_maps(mask, None);
            Ok(composite(source, dest, &alpha_a, &alpha_b))
        }
        BlendMode::Gaussian {
            kernel_size,
            sigma,
            feather_size,
        } => {
            let (alpha_a, alpha_b) = alpha_maps(mask, expand.then_some(feather_size));
            let alpha_a = alpha_a.gaussian_filter(kernel_size, sigma)?;
            let alpha_b = alpha_b.gaussian_filter(kernel_size, sigma)?;
            Ok(composite(source, dest, &alpha_a, &alpha_b))
        }
        BlendMode::Box {
            kernel_size,
            feather_size,
        } => {
            let (alpha_a, alpha_b) = alpha_maps(mask, expand.then_some(feather_size));
            let alpha_a = alpha_a.box_filter_square(kernel_size);
            let alpha_b = alpha_b.box_filter_square(kernel_size);
            Ok(composite(source, dest, &alpha_a, &alpha_b))
        }
        BlendMode::Poisson { dilation_size } => {
            let region = dilate_mask(mask, dilation_size);
            seamless_clone(source, dest, &region)
        }
    }
}
