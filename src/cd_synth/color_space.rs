//! 8-bit CIE L\*a\*b\* conversion.
//!
//! Lab images are stored in the same `Image<Rgb<u8>>` container as sRGB
//! images, with the usual 8-bit encoding:
//!
//! ```text
//! L8 = L * 255 / 100     a8 = a + 128     b8 = b + 128
//! ```
//!
//! The lightness channel is decorrelated from the two chrominance channels,
//! which is what makes per-channel statistics matching meaningful.

use image::Rgb;
use imageproc::map::map_colors;
use palette::white_point::D65;
use palette::{FromColor, IntoColor, Lab, LinSrgb, Srgb};

use crate::utils::round_f32_to_u8;
use crate::Image;

/// An `Image<Rgb<u8>>` whose channels hold 8-bit encoded L, a, b.
pub type LabImage = Image<Rgb<u8>>;

/// Conversion between 8-bit sRGB and 8-bit encoded Lab.
pub trait ConvertLab {
    /// Converts an sRGB image into encoded Lab.
    fn to_lab(&self) -> LabImage;

    /// Converts an encoded Lab image back into sRGB.
    fn to_srgb(&self) -> Image<Rgb<u8>>;
}

impl ConvertLab for Image<Rgb<u8>> {
    fn to_lab(&self) -> LabImage {
        map_colors(self, rgb_to_lab)
    }

    fn to_srgb(&self) -> Image<Rgb<u8>> {
        map_colors(self, lab_to_rgb)
    }
}

/// Converts one sRGB pixel into encoded Lab.
pub fn rgb_to_lab(Rgb([red, green, blue]): Rgb<u8>) -> Rgb<u8> {
    let srgb: Srgb<f32> = Srgb::new(red, green, blue).into_format();
    let linear: LinSrgb<f32> = srgb.into_linear();
    let lab = Lab::<D65, f32>::from_color(linear);

    Rgb([
        round_f32_to_u8(lab.l * 255.0 / 100.0),
        round_f32_to_u8(lab.a + 128.0),
        round_f32_to_u8(lab.b + 128.0),
    ])
}

/// Converts one encoded Lab pixel back into sRGB.
pub fn lab_to_rgb(Rgb([l8, a8, b8]): Rgb<u8>) -> Rgb<u8> {
    let lab = Lab::<D65, f32>::new(
        f32::from(l8) * 100.0 / 255.0,
        f32::from(a8) - 128.0,
        f32::from(b8) - 128.0,
    );
    let linear: LinSrgb<f32> = lab.into_color();
    let srgb: Srgb<f32> = Srgb::from_linear(linear);

    Rgb([srgb.red, srgb.green, srgb.blue].map(|c| round_f32_to_u8(c.clamp(0.0, 1.0) * 255.0)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(actual: Rgb<u8>, expected: Rgb<u8>, tolerance: u8) {
        for c in 0..3 {
            let diff = actual[c].abs_diff(expected[c]);
            assert!(
                diff <= tolerance,
                "channel {c}: {actual:?} vs {expected:?} (tolerance {tolerance})"
            );
        }
    }

    #[test]
    fn test_white_and_black_are_neutral() {
        assert_close(rgb_to_lab(Rgb([255, 255, 255])), Rgb([255, 128, 128]), 0);
        assert_eq!(rgb_to_lab(Rgb([0, 0, 0])), Rgb([0, 128, 128]));
    }

    #[test]
    fn test_gray_round_trip() {
        for v in (0..=255u8).step_by(5) {
            let gray = Rgb([v, v, v]);
            let lab = rgb_to_lab(gray);
            assert_close(Rgb([lab[1], lab[2], 0]), Rgb([128, 128, 0]), 1);
            assert_close(lab_to_rgb(lab), gray, 1);
        }
    }

    #[test]
    fn test_color_round_trip() {
        let colors = [
            Rgb([200, 100, 50]),
            Rgb([30, 160, 90]),
            Rgb([70, 80, 200]),
            Rgb([128, 128, 100]),
        ];
        for color in colors {
            assert_close(lab_to_rgb(rgb_to_lab(color)), color, 4);
        }
    }

    #[test]
    fn test_image_conversion_preserves_dimensions() {
        let image: Image<Rgb<u8>> = Image::from_pixel(7, 3, Rgb([10, 20, 30]));
        let lab = image.to_lab();
        assert_eq!(lab.dimensions(), (7, 3));
        assert_eq!(lab.to_srgb().dimensions(), (7, 3));
    }
}
