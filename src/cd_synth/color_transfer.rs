//! Statistical color transfer.
//!
//! Matches the per-channel mean and standard deviation of a donor patch to
//! those of a target patch in 8-bit Lab:
//!
//! ```text
//! x' = round((x - mean_s) * (std_t / std_s) + mean_t),  clamped to [0, 255]
//! ```
//!
//! Statistics are population statistics rounded to two decimals. Rounding of
//! the result is half away from zero. A channel whose source standard
//! deviation is zero is shifted only (the ratio is taken as 1), so a uniform
//! source channel maps onto the target mean.
//!
//! The transform is affine in a `u8` input, so it is evaluated once per
//! possible input value into a lookup table and applied to the whole patch
//! in one pass over the raw subpixels.

use image::Rgb;
#[cfg(feature = "rayon")]
use rayon::prelude::*;

use crate::cd_synth::color_space::{ConvertLab, LabImage};
use crate::error::ColorTransferError;
use crate::utils::round_to_u8;
use crate::Image;

/// Per-channel population mean and standard deviation of a 3-channel image.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChannelStatistics {
    pub mean: [f64; 3],
    pub std_dev: [f64; 3],
}

impl ChannelStatistics {
    /// Computes the statistics of `image`, or `None` when it has no pixels.
    pub fn of(image: &Image<Rgb<u8>>) -> Option<Self> {
        let count = u64::from(image.width()) * u64::from(image.height());
        if count == 0 {
            return None;
        }

        let mut sum = [0u64; 3];
        let mut sum_sq = [0u64; 3];
        for pixel in image.as_raw().chunks_exact(3) {
            for (k, &v) in pixel.iter().enumerate() {
                let v = u64::from(v);
                sum[k] += v;
                sum_sq[k] += v * v;
            }
        }

        let n = count as f64;
        let mean = sum.map(|s| s as f64 / n);
        let mut std_dev = [0.0; 3];
        for k in 0..3 {
            let variance = (sum_sq[k] as f64 / n - mean[k] * mean[k]).max(0.0);
            std_dev[k] = round_two_decimals(variance.sqrt());
        }

        Some(Self {
            mean: mean.map(round_two_decimals),
            std_dev,
        })
    }
}

#[inline]
fn round_two_decimals(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Builds the 256-entry lookup table of one channel's affine transform.
fn channel_lut(source_mean: f64, source_std: f64, target_mean: f64, target_std: f64) -> [u8; 256] {
    let ratio = if source_std == 0.0 {
        1.0
    } else {
        target_std / source_std
    };
    std::array::from_fn(|x| round_to_u8((x as f64 - source_mean).mul_add(ratio, target_mean)))
}

/// Matches the channel statistics of `source` to those of `target`.
///
/// Both images hold 8-bit encoded Lab (see [`crate::LabImage`]). The output
/// has the dimensions of `source`; `target` may have any non-zero size.
///
/// # Errors
///
/// * `ColorTransferError::EmptyPatch` - when either image has no pixels
pub fn transfer_lab_statistics(
    source: &LabImage,
    target: &LabImage,
) -> Result<LabImage, ColorTransferError> {
    let empty = || ColorTransferError::EmptyPatch {
        source_dims: source.dimensions(),
        target_dims: target.dimensions(),
    };
    let source_stats = ChannelStatistics::of(source).ok_or_else(empty)?;
    let target_stats = ChannelStatistics::of(target).ok_or_else(empty)?;

    let luts: [[u8; 256]; 3] = std::array::from_fn(|k| {
        channel_lut(
            source_stats.mean[k],
            source_stats.std_dev[k],
            target_stats.mean[k],
            target_stats.std_dev[k],
        )
    });

    let mut out = source.clone();
    let apply = |pixel: &mut [u8]| {
        for (value, lut) in pixel.iter_mut().zip(&luts) {
            *value = lut[usize::from(*value)];
        }
    };

    #[cfg(feature = "rayon")]
    out.par_chunks_exact_mut(3).for_each(apply);
    #[cfg(not(feature = "rayon"))]
    out.chunks_exact_mut(3).for_each(apply);

    Ok(out)
}

/// Trait providing statistical color transfer for sRGB patches
pub trait ColorTransfer {
    /// Adjusts `self` so its Lab channel statistics match those of `target`.
    ///
    /// The patch is converted to Lab, transformed with
    /// [`transfer_lab_statistics`] and converted back to sRGB.
    ///
    /// # Errors
    ///
    /// * `ColorTransferError::EmptyPatch` - when either patch has no pixels
    fn transfer_color(&self, target: &Self) -> Result<Self, ColorTransferError>
    where
        Self: Sized;
}

impl ColorTransfer for Image<Rgb<u8>> {
    fn transfer_color(&self, target: &Self) -> Result<Self, ColorTransferError> {
        let adjusted = transfer_lab_statistics(&self.to_lab(), &target.to_lab())?;
        Ok(adjusted.to_srgb())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{
        create_gradient_rgb_image, create_uniform_rgb_image, images_approx_equal,
    };

    fn two_tone(left: [u8; 3], right: [u8; 3]) -> Image<Rgb<u8>> {
        Image::from_fn(2, 1, |x, _| if x == 0 { Rgb(left) } else { Rgb(right) })
    }

    #[test]
    fn test_statistics_are_population_statistics() {
        let image = two_tone([100, 0, 7], [120, 0, 8]);
        let stats = ChannelStatistics::of(&image).unwrap();

        assert_eq!(stats.mean, [110.0, 0.0, 7.5]);
        assert_eq!(stats.std_dev, [10.0, 0.0, 0.5]);
    }

    #[test]
    fn test_statistics_of_empty_image() {
        assert!(ChannelStatistics::of(&Image::new(0, 3)).is_none());
    }

    #[test]
    fn test_transfer_matches_mean_and_spread() {
        let source = two_tone([100, 100, 100], [120, 120, 120]);
        let target = two_tone([50, 60, 70], [90, 60, 80]);

        let out = transfer_lab_statistics(&source, &target).unwrap();

        assert_eq!(out.get_pixel(0, 0), &Rgb([50, 60, 70]));
        assert_eq!(out.get_pixel(1, 0), &Rgb([90, 60, 80]));
    }

    #[test]
    fn test_transfer_clamps_to_u8_range() {
        let source = two_tone([0, 0, 0], [255, 255, 255]);
        let target = two_tone([0, 0, 0], [255, 255, 255]);
        let wide = Image::from_fn(3, 1, |x, _| Rgb([[0, 128, 255][x as usize]; 3]));

        // Stretching a mid-spread source onto a full-spread target overflows.
        let out = transfer_lab_statistics(&wide, &target).unwrap();
        assert_eq!(out.get_pixel(0, 0)[0], 0);
        assert_eq!(out.get_pixel(2, 0)[0], 255);

        let same = transfer_lab_statistics(&source, &target).unwrap();
        assert_eq!(same, source);
    }

    #[test]
    fn test_uniform_source_maps_to_target_mean() {
        let source = create_uniform_rgb_image(4, 4, Rgb([37, 200, 3]));
        let target = two_tone([10, 101, 250], [20, 104, 255]);

        let out = transfer_lab_statistics(&source, &target).unwrap();

        // Target means are 15, 102.5 and 252.5; half rounds away from zero.
        for pixel in out.pixels() {
            assert_eq!(pixel, &Rgb([15, 103, 253]));
        }
    }

    #[test]
    fn test_transfer_rejects_empty_patches() {
        let source = create_uniform_rgb_image(2, 2, Rgb([1, 2, 3]));
        let empty: Image<Rgb<u8>> = Image::new(0, 0);

        assert!(matches!(
            transfer_lab_statistics(&source, &empty),
            Err(ColorTransferError::EmptyPatch { .. })
        ));
        assert!(source.transfer_color(&empty).is_err());
    }

    #[test]
    fn test_transfer_color_onto_itself_is_near_identity() {
        let patch = create_gradient_rgb_image(8, 8);
        let out = patch.transfer_color(&patch).unwrap();

        assert!(images_approx_equal(&patch, &out, 4.0));
    }

    #[test]
    fn test_transfer_color_keeps_source_size() {
        let source = create_gradient_rgb_image(5, 3);
        let target = create_uniform_rgb_image(9, 9, Rgb([90, 120, 60]));

        let out = source.transfer_color(&target).unwrap();
        assert_eq!(out.dimensions(), (5, 3));
    }
}
