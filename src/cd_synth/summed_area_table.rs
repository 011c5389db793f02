use image::{Luma, Primitive};

use crate::Image;

/// Summed-area table (integral image) of a single-channel raster.
///
/// `sat(x, y)` holds the sum of every sample in the rectangle from the origin
/// to `(x, y)` inclusive, which turns any rectangular sum into four lookups.
/// It backs the occupancy queries of the placement sampler and the box blur
/// used for feathering.
#[derive(Debug, Clone)]
pub struct SummedAreaTable<T> {
    data: Vec<T>,
    width: u32,
    height: u32,
}

/// Builds a summed-area table with an accumulator wide enough for the image.
pub trait CreateSummedAreaTable<T> {
    fn create_summed_area_table(&self) -> SummedAreaTable<T>;
}

/// `u8` samples accumulate in `u64`, so no realistic raster can overflow.
impl CreateSummedAreaTable<u64> for Image<Luma<u8>> {
    fn create_summed_area_table(&self) -> SummedAreaTable<u64> {
        let widened: Vec<u64> = self.as_raw().iter().map(|&v| u64::from(v)).collect();
        SummedAreaTable::from_data(&widened, self.width(), self.height())
    }
}

/// `f32` alpha maps accumulate in `f64` to keep window sums exact enough.
impl CreateSummedAreaTable<f64> for Image<Luma<f32>> {
    fn create_summed_area_table(&self) -> SummedAreaTable<f64> {
        let widened: Vec<f64> = self.as_raw().iter().map(|&v| f64::from(v)).collect();
        SummedAreaTable::from_data(&widened, self.width(), self.height())
    }
}

impl<T> SummedAreaTable<T>
where
    T: Primitive,
{
    /// Builds the table from row-major single-channel data.
    ///
    /// # Panics
    ///
    /// When `data.len() != width * height`.
    pub fn from_data(data: &[T], width: u32, height: u32) -> Self {
        let w = width as usize;
        assert_eq!(data.len(), w * height as usize);

        let mut sat = vec![T::zero(); data.len()];
        for y in 0..height as usize {
            // sat(x, y) = row_sum(0..=x, y) + sat(x, y - 1)
            let mut row_sum = T::zero();
            for x in 0..w {
                let index = y * w + x;
                row_sum = row_sum + data[index];
                sat[index] = if y > 0 {
                    row_sum + sat[index - w]
                } else {
                    row_sum
                };
            }
        }

        Self {
            data: sat,
            width,
            height,
        }
    }

    /// Table value at `(x, y)`, zero outside the raster.
    #[must_use]
    pub fn get(&self, x: i64, y: i64) -> T {
        if x < 0 || y < 0 || x >= i64::from(self.width) || y >= i64::from(self.height) {
            T::zero()
        } else {
            self.data[y as usize * self.width as usize + x as usize]
        }
    }

    /// Sum over the inclusive rectangle `(x1, y1)..=(x2, y2)`, clipped to the raster.
    ///
    /// ```text
    /// sum = sat(x2, y2) - sat(x1-1, y2) - sat(x2, y1-1) + sat(x1-1, y1-1)
    /// ```
    #[must_use]
    pub fn rectangle_sum(&self, x1: i64, y1: i64, x2: i64, y2: i64) -> T {
        let x1 = x1.max(0);
        let y1 = y1.max(0);
        let x2 = x2.min(i64::from(self.width) - 1);
        let y2 = y2.min(i64::from(self.height) - 1);

        if x1 > x2 || y1 > y2 {
            return T::zero();
        }

        let bottom_right = self.get(x2, y2);
        let top_right = self.get(x2, y1 - 1);
        let bottom_left = self.get(x1 - 1, y2);
        let top_left = self.get(x1 - 1, y1 - 1);

        // Add before subtracting so unsigned accumulators never underflow.
        bottom_right + top_left - top_right - bottom_left
    }

    /// Sum over the `width x height` region whose top-left corner is `(x, y)`.
    #[must_use]
    pub fn region_sum(&self, x: u32, y: u32, width: u32, height: u32) -> T {
        if width == 0 || height == 0 {
            return T::zero();
        }
        self.rectangle_sum(
            i64::from(x),
            i64::from(y),
            i64::from(x) + i64::from(width) - 1,
            i64::from(y) + i64::from(height) - 1,
        )
    }

    #[must_use]
    pub const fn width(&self) -> u32 {
        self.width
    }

    #[must_use]
    pub const fn height(&self) -> u32 {
        self.height
    }
}
