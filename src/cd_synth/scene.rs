use image::imageops;
use image::{Luma, Rgb};

use crate::cd_synth::occupancy::Occupancy;
use crate::error::{PlacementError, SynthesisError};
use crate::utils::first_mismatch;
use crate::Image;

/// One of the two temporal images of a change-detection pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Branch {
    First,
    Second,
}

/// The five rasters of a scene read from disk, plus the occupancy reference.
#[derive(Debug, Clone)]
pub struct SceneRasters {
    pub image1: Image<Rgb<u8>>,
    pub image2: Image<Rgb<u8>>,
    pub label: Image<Luma<u8>>,
    pub label1: Image<Luma<u8>>,
    pub label2: Image<Luma<u8>>,
    pub reference: Image<Luma<u8>>,
}

impl SceneRasters {
    /// A scene without any change: the reference starts empty.
    pub fn unchanged(image1: Image<Rgb<u8>>, image2: Image<Rgb<u8>>) -> Self {
        let (width, height) = image1.dimensions();
        Self {
            image1,
            image2,
            label: Image::new(width, height),
            label1: Image::new(width, height),
            label2: Image::new(width, height),
            reference: Image::new(width, height),
        }
    }
}

/// The finalized rasters of a scene, ready to be written.
#[derive(Debug, Clone)]
pub struct SceneOutputs {
    pub image1: Image<Rgb<u8>>,
    pub image2: Image<Rgb<u8>>,
    pub label: Image<Luma<u8>>,
    pub label1: Image<Luma<u8>>,
    pub label2: Image<Luma<u8>>,
    pub occupancy: Image<Luma<u8>>,
}

/// Mutable per-scene state: both branch images, the three labels and the
/// occupancy mask, kept spatially aligned for the whole placement loop.
#[derive(Debug, Clone)]
pub struct SceneAccumulators {
    name: String,
    image1: Image<Rgb<u8>>,
    image2: Image<Rgb<u8>>,
    label: Image<Luma<u8>>,
    label1: Image<Luma<u8>>,
    label2: Image<Luma<u8>>,
    occupancy: Occupancy,
}

impl SceneAccumulators {
    /// # Errors
    ///
    /// `SynthesisError::SceneShapeMismatch` naming the first raster whose
    /// size differs from the first branch image.
    pub fn new(name: impl Into<String>, rasters: SceneRasters) -> Result<Self, SynthesisError> {
        let name = name.into();
        let expected = rasters.image1.dimensions();

        if let Some(actual) = first_mismatch(expected, &[&rasters.image2]) {
            return Err(SynthesisError::SceneShapeMismatch {
                name,
                raster: "image2",
                expected,
                actual,
            });
        }
        let labels = [
            ("label", &rasters.label),
            ("label1", &rasters.label1),
            ("label2", &rasters.label2),
            ("reference", &rasters.reference),
        ];
        for (raster, image) in labels {
            if let Some(actual) = first_mismatch(expected, &[image]) {
                return Err(SynthesisError::SceneShapeMismatch {
                    name,
                    raster,
                    expected,
                    actual,
                });
            }
        }

        let SceneRasters {
            image1,
            image2,
            label,
            label1,
            label2,
            reference,
        } = rasters;
        Ok(Self {
            name,
            image1,
            image2,
            label,
            label1,
            label2,
            occupancy: Occupancy::new(reference),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.image1.dimensions()
    }

    pub const fn image(&self, branch: Branch) -> &Image<Rgb<u8>> {
        match branch {
            Branch::First => &self.image1,
            Branch::Second => &self.image2,
        }
    }

    pub const fn branch_label(&self, branch: Branch) -> &Image<Luma<u8>> {
        match branch {
            Branch::First => &self.label1,
            Branch::Second => &self.label2,
        }
    }

    pub const fn label(&self) -> &Image<Luma<u8>> {
        &self.label
    }

    pub const fn occupancy(&self) -> &Occupancy {
        &self.occupancy
    }

    pub fn occupancy_mut(&mut self) -> &mut Occupancy {
        &mut self.occupancy
    }

    /// Copy of the `width x height` region of a branch image at `(x, y)`.
    pub fn crop(&self, branch: Branch, x: u32, y: u32, width: u32, height: u32) -> Image<Rgb<u8>> {
        imageops::crop_imm(self.image(branch), x, y, width, height).to_image()
    }

    /// Commits one placement.
    ///
    /// The composite replaces the branch image region at `(x, y)`; the true
    /// mask is written over the same region of the combined label and of
    /// that branch's label, and ORed into the occupancy mask.
    ///
    /// # Errors
    ///
    /// `PlacementError::FootprintOutOfBounds` when the region leaves the
    /// scene; nothing is modified in that case.
    pub fn place(
        &mut self,
        branch: Branch,
        x: u32,
        y: u32,
        composite: &Image<Rgb<u8>>,
        true_mask: &Image<Luma<u8>>,
    ) -> Result<(), SynthesisError> {
        let (scene_width, scene_height) = self.dimensions();
        let (width, height) = true_mask.dimensions();
        let fits = composite.dimensions() == (width, height)
            && u64::from(x) + u64::from(width) <= u64::from(scene_width)
            && u64::from(y) + u64::from(height) <= u64::from(scene_height);
        if !fits {
            return Err(PlacementError::FootprintOutOfBounds {
                x,
                y,
                width,
                height,
                mask_width: scene_width,
                mask_height: scene_height,
            }
            .into());
        }

        let (image, branch_label) = match branch {
            Branch::First => (&mut self.image1, &mut self.label1),
            Branch::Second => (&mut self.image2, &mut self.label2),
        };
        imageops::replace(image, composite, i64::from(x), i64::from(y));
        imageops::replace(branch_label, true_mask, i64::from(x), i64::from(y));
        imageops::replace(&mut self.label, true_mask, i64::from(x), i64::from(y));
        self.occupancy.mark(x, y, true_mask)?;
        Ok(())
    }

    pub fn into_outputs(self) -> SceneOutputs {
        SceneOutputs {
            image1: self.image1,
            image2: self.image2,
            label: self.label,
            label1: self.label1,
            label2: self.label2,
            occupancy: self.occupancy.into_mask(),
        }
    }
}
