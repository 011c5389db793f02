use image::Luma;

use crate::cd_synth::summed_area_table::{CreateSummedAreaTable, SummedAreaTable};
use crate::error::PlacementError;
use crate::utils::count_foreground;
use crate::Image;

/// Occupancy mask of a scene, marking every region already used by a
/// placed instance.
///
/// Region queries go through a summed-area table that is rebuilt lazily
/// after the mask changes. Marking only ever raises samples, so the
/// occupied area never shrinks while the scene is processed.
#[derive(Debug, Clone)]
pub struct Occupancy {
    mask: Image<Luma<u8>>,
    table: Option<SummedAreaTable<u64>>,
}

impl Occupancy {
    /// Wraps an occupancy raster; any non-zero sample counts as occupied.
    pub const fn new(mask: Image<Luma<u8>>) -> Self {
        Self { mask, table: None }
    }

    /// An empty occupancy mask of the given size.
    pub fn empty(width: u32, height: u32) -> Self {
        Self::new(Image::new(width, height))
    }

    pub fn width(&self) -> u32 {
        self.mask.width()
    }

    pub fn height(&self) -> u32 {
        self.mask.height()
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.mask.dimensions()
    }

    pub const fn mask(&self) -> &Image<Luma<u8>> {
        &self.mask
    }

    pub fn into_mask(self) -> Image<Luma<u8>> {
        self.mask
    }

    /// Number of occupied samples.
    pub fn foreground_count(&self) -> usize {
        count_foreground(&self.mask)
    }

    /// Whether the `width x height` region at `(x, y)` holds no occupied sample.
    ///
    /// The region must lie inside the mask.
    pub fn is_free(&mut self, x: u32, y: u32, width: u32, height: u32) -> bool {
        let mask = &self.mask;
        let table = self
            .table
            .get_or_insert_with(|| mask.create_summed_area_table());
        table.region_sum(x, y, width, height) == 0
    }

    /// ORs the non-zero samples of `footprint` into the mask at `(x, y)`.
    ///
    /// # Errors
    ///
    /// `PlacementError::FootprintOutOfBounds` when the footprint leaves the mask.
    pub fn mark(&mut self, x: u32, y: u32, footprint: &Image<Luma<u8>>) -> Result<(), PlacementError> {
        let (width, height) = footprint.dimensions();
        let fits = u64::from(x) + u64::from(width) <= u64::from(self.width())
            && u64::from(y) + u64::from(height) <= u64::from(self.height());
        if !fits {
            return Err(PlacementError::FootprintOutOfBounds {
                x,
                y,
                width,
                height,
                mask_width: self.width(),
                mask_height: self.height(),
            });
        }

        for (fx, fy, pixel) in footprint.enumerate_pixels() {
            let target = self.mask.get_pixel_mut(x + fx, y + fy);
            target[0] = target[0].max(pixel[0]);
        }
        self.table = None;
        Ok(())
    }
}

impl From<Image<Luma<u8>>> for Occupancy {
    fn from(mask: Image<Luma<u8>>) -> Self {
        Self::new(mask)
    }
}
