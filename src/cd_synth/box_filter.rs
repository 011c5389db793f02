use image::Luma;

use crate::cd_synth::summed_area_table::{CreateSummedAreaTable, SummedAreaTable};
use crate::Image;

/// Box (mean) filtering of alpha maps through a summed-area table.
///
/// The running time does not depend on the kernel size. Near the raster
/// border the mean is taken over the part of the window that lies inside the
/// raster, so a constant map stays constant.
pub trait BoxFilter {
    /// Averages over a `(2 * x_radius + 1) x (2 * y_radius + 1)` window.
    #[must_use]
    fn box_filter(&self, x_radius: u32, y_radius: u32) -> Self;

    /// Averages over a square `kernel_size x kernel_size` window.
    ///
    /// `kernel_size` is expected to be odd; an even size behaves like the
    /// next smaller odd one.
    #[must_use]
    fn box_filter_square(&self, kernel_size: u32) -> Self
    where
        Self: Sized,
    {
        let radius = kernel_size.saturating_sub(1) / 2;
        self.box_filter(radius, radius)
    }
}

impl BoxFilter for Image<Luma<f32>> {
    fn box_filter(&self, x_radius: u32, y_radius: u32) -> Self {
        let sat = self.create_summed_area_table();
        apply_sat_box_filter(&sat, x_radius, y_radius)
    }
}

fn apply_sat_box_filter(sat: &SummedAreaTable<f64>, x_radius: u32, y_radius: u32) -> Image<Luma<f32>> {
    let (width, height) = (sat.width(), sat.height());
    let (xr, yr) = (i64::from(x_radius), i64::from(y_radius));

    Image::from_fn(width, height, |x, y| {
        let (x, y) = (i64::from(x), i64::from(y));
        let x1 = (x - xr).max(0);
        let y1 = (y - yr).max(0);
        let x2 = (x + xr).min(i64::from(width) - 1);
        let y2 = (y + yr).min(i64::from(height) - 1);

        let sum = sat.rectangle_sum(x1, y1, x2, y2);
        let area = ((x2 - x1 + 1) * (y2 - y1 + 1)) as f64;

        Luma([(sum / area) as f32])
    })
}
