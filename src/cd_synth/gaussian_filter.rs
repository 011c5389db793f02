use image::Luma;
use libblur::{
    gaussian_blur_f32, BlurImage, BlurImageMut, EdgeMode, FastBlurChannels, GaussianBlurParams,
    IeeeBinaryConvolutionMode, ThreadingPolicy,
};

use crate::error::BlendError;
use crate::Image;

/// Gaussian blurring of alpha maps with a fixed kernel size.
pub trait GaussianFilter: Sized {
    /// Blurs with a separable `kernel_size x kernel_size` Gaussian of
    /// standard deviation `sigma`, mirroring samples across the border
    /// without repeating the edge sample (`gfedcb|abcdefgh|gfedcba`).
    ///
    /// # Errors
    ///
    /// * `BlendError::InvalidKernelSize` - when `kernel_size` is even or zero
    /// * `BlendError::BlurFailed` - when the blur backend rejects the raster
    fn gaussian_filter(&self, kernel_size: u32, sigma: f32) -> Result<Self, BlendError>;
}

impl GaussianFilter for Image<Luma<f32>> {
    fn gaussian_filter(&self, kernel_size: u32, sigma: f32) -> Result<Self, BlendError> {
        if kernel_size % 2 == 0 {
            return Err(BlendError::InvalidKernelSize { size: kernel_size });
        }
        let (width, height) = self.dimensions();
        let source = BlurImage::borrow(self.as_raw(), width, height, FastBlurChannels::Plane);
        let mut buffer = vec![0.0f32; self.as_raw().len()];
        let mut blurred = BlurImageMut::borrow(&mut buffer, width, height, FastBlurChannels::Plane);

        gaussian_blur_f32(
            &source,
            &mut blurred,
            GaussianBlurParams::new(kernel_size, f64::from(sigma)),
            EdgeMode::Reflect101,
            ThreadingPolicy::Single,
            IeeeBinaryConvolutionMode::Normal,
        )
        .map_err(|e| BlendError::BlurFailed {
            reason: e.to_string(),
        })?;

        Image::from_raw(width, height, buffer).ok_or_else(|| BlendError::BlurFailed {
            reason: format!("blurred buffer does not fit {width}x{height}"),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constant_map_stays_constant() {
        let image: Image<Luma<f32>> = Image::from_pixel(9, 11, Luma([1.0]));
        let blurred = image.gaussian_filter(7, 2.0).unwrap();

        assert_eq!(blurred.dimensions(), (9, 11));
        for pixel in blurred.pixels() {
            assert!((pixel[0] - 1.0).abs() < 1e-4);
        }
    }

    #[test]
    fn test_step_edge_is_softened() {
        let image: Image<Luma<f32>> =
            Image::from_fn(16, 8, |x, _| Luma([if x < 8 { 1.0 } else { 0.0 }]));
        let blurred = image.gaussian_filter(7, 2.0).unwrap();

        let left = blurred.get_pixel(7, 4)[0];
        let right = blurred.get_pixel(8, 4)[0];
        assert!(left < 1.0 && left > 0.5);
        assert!(right > 0.0 && right < 0.5);
        assert!((blurred.get_pixel(0, 4)[0] - 1.0).abs() < 1e-4);
        assert!(blurred.get_pixel(15, 4)[0].abs() < 1e-4);
    }

    #[test]
    fn test_blur_is_symmetric_around_an_impulse() {
        let image: Image<Luma<f32>> =
            Image::from_fn(15, 15, |x, y| Luma([if (x, y) == (7, 7) { 1.0 } else { 0.0 }]));
        let blurred = image.gaussian_filter(7, 2.0).unwrap();

        let total: f32 = blurred.pixels().map(|p| p[0]).sum();
        assert!((total - 1.0).abs() < 1e-4);
        assert!((blurred.get_pixel(5, 7)[0] - blurred.get_pixel(9, 7)[0]).abs() < 1e-6);
        assert!((blurred.get_pixel(7, 5)[0] - blurred.get_pixel(7, 9)[0]).abs() < 1e-6);
        assert!(blurred.get_pixel(7, 7)[0] > blurred.get_pixel(6, 7)[0]);
    }

    #[test]
    fn test_even_kernel_is_rejected() {
        let image: Image<Luma<f32>> = Image::from_pixel(4, 4, Luma([0.5]));

        assert_eq!(
            image.gaussian_filter(6, 2.0),
            Err(BlendError::InvalidKernelSize { size: 6 })
        );
    }
}
