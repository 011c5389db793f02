//! Internal utility functions for cd-synth.
//!
//! Rounding, clamping and dimension checks shared by the color transfer,
//! blending and placement code.

use image::{GenericImageView, Luma};

use crate::Image;

/// Rounds half away from zero and clamps into the `u8` range.
///
/// This is the single rounding convention used for every floating point
/// result written back into an 8-bit raster.
#[inline]
pub fn round_to_u8(value: f64) -> u8 {
    value.round().clamp(0.0, 255.0) as u8
}

/// `f32` variant of [`round_to_u8`].
#[inline]
pub fn round_f32_to_u8(value: f32) -> u8 {
    value.round().clamp(0.0, 255.0) as u8
}

/// Returns `Some(dims)` of the first image whose dimensions differ from `expected`.
pub fn first_mismatch<I>(expected: (u32, u32), images: &[&I]) -> Option<(u32, u32)>
where
    I: GenericImageView + ?Sized,
{
    images
        .iter()
        .map(|image| image.dimensions())
        .find(|dims| *dims != expected)
}

/// Validates that an image has non-zero dimensions.
#[inline]
pub const fn is_non_empty(width: u32, height: u32) -> bool {
    width != 0 && height != 0
}

/// Largest sample of a single-channel mask, `0` for an empty mask.
pub fn mask_max(mask: &Image<Luma<u8>>) -> u8 {
    mask.as_raw().iter().copied().max().unwrap_or(0)
}

/// Number of non-zero samples in a single-channel mask.
pub fn count_foreground(mask: &Image<Luma<u8>>) -> usize {
    mask.as_raw().iter().filter(|&&v| v != 0).count()
}
