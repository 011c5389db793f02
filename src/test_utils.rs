//! Test utilities for cd-synth
//!
//! This module provides common fixtures for testing the color transfer,
//! blending and placement code. It is only compiled when running tests.

#[cfg(test)]
use image::{Luma, Pixel, Primitive, Rgb};
#[cfg(test)]
use crate::Image;

#[cfg(test)]
use crate::cd_synth::instance::Instance;

/// Creates an RGB image filled with a single color.
#[cfg(test)]
pub fn create_uniform_rgb_image(width: u32, height: u32, color: Rgb<u8>) -> Image<Rgb<u8>> {
    Image::from_pixel(width, height, color)
}

/// Creates an RGB image with a smooth gradient.
///
/// - red grows along x
/// - green grows along y
/// - blue grows along the diagonal
#[cfg(test)]
pub fn create_gradient_rgb_image(width: u32, height: u32) -> Image<Rgb<u8>> {
    Image::from_fn(width, height, |x, y| {
        Rgb([
            ((x * 255) / width.max(1)) as u8,
            ((y * 255) / height.max(1)) as u8,
            (((x + y) * 255) / (width + height).max(1)) as u8,
        ])
    })
}

/// Creates a checkerboard RGB image alternating two colors per pixel.
#[cfg(test)]
pub fn create_checkerboard_rgb_image(width: u32, height: u32) -> Image<Rgb<u8>> {
    Image::from_fn(width, height, |x, y| {
        if (x + y) % 2 == 0 {
            Rgb([200, 150, 100])
        } else {
            Rgb([100, 150, 200])
        }
    })
}

/// Creates a single-channel mask with `value` inside the rectangle
/// `[x0, x0 + w) x [y0, y0 + h)` and zero elsewhere.
#[cfg(test)]
pub fn create_rect_mask(
    width: u32,
    height: u32,
    (x0, y0, w, h): (u32, u32, u32, u32),
    value: u8,
) -> Image<Luma<u8>> {
    Image::from_fn(width, height, |x, y| {
        if (x0..x0 + w).contains(&x) && (y0..y0 + h).contains(&y) {
            Luma([value])
        } else {
            Luma([0])
        }
    })
}

/// Creates a donor instance with a fully filled `{0, 255}` mask.
#[cfg(test)]
pub fn create_filled_instance(id: &str, width: u32, height: u32, color: Rgb<u8>) -> Instance {
    Instance::new(
        id,
        create_uniform_rgb_image(width, height, color),
        Image::from_pixel(width, height, Luma([255])),
    )
    .expect("fixture instance dimensions match")
}

/// Compares two pixel values with a tolerance.
#[cfg(test)]
pub fn pixels_approx_equal<P>(expected: P, actual: P, tolerance: f32) -> bool
where
    P: Pixel,
    P::Subpixel: Primitive,
    f32: From<P::Subpixel>,
{
    expected
        .channels()
        .iter()
        .zip(actual.channels())
        .all(|(e, a)| (f32::from(*e) - f32::from(*a)).abs() <= tolerance)
}

/// Compares two images pixel by pixel with a tolerance.
#[cfg(test)]
pub fn images_approx_equal<P>(expected: &Image<P>, actual: &Image<P>, tolerance: f32) -> bool
where
    P: Pixel,
    P::Subpixel: Primitive,
    f32: From<P::Subpixel>,
{
    expected.dimensions() == actual.dimensions()
        && expected
            .pixels()
            .zip(actual.pixels())
            .all(|(e, a)| pixels_approx_equal(*e, *a, tolerance))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_rect_mask_marks_only_the_rectangle() {
        let mask = create_rect_mask(6, 5, (1, 2, 3, 2), 255);
        let count = mask.pixels().filter(|p| p[0] == 255).count();

        assert_eq!(count, 6);
        assert_eq!(mask.get_pixel(1, 2)[0], 255);
        assert_eq!(mask.get_pixel(3, 3)[0], 255);
        assert_eq!(mask.get_pixel(4, 3)[0], 0);
        assert_eq!(mask.get_pixel(1, 4)[0], 0);
    }

    #[test]
    fn create_gradient_rgb_image_spans_range() {
        let image = create_gradient_rgb_image(4, 4);
        assert_eq!(image.get_pixel(0, 0), &Rgb([0, 0, 0]));
        assert_eq!(image.get_pixel(3, 0)[0], 191);
    }

    #[test]
    fn images_approx_equal_with_tolerant_comparison_returns_true() {
        let image1 = create_checkerboard_rgb_image(3, 3);
        let mut image2 = create_checkerboard_rgb_image(3, 3);
        image2.put_pixel(0, 0, Rgb([201, 150, 100]));

        assert!(images_approx_equal(&image1, &image2, 1.5));
        assert!(!images_approx_equal(&image1, &image2, 0.5));
    }
}
