//! Per-scene placement loop.

use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::cd_synth::blend::BlendMode;
use crate::cd_synth::color_transfer::ColorTransfer;
use crate::cd_synth::instance::{DonorSource, Identity, InstanceTransform, TruthMode};
use crate::cd_synth::placement::{Placement, PlacementSampler};
use crate::cd_synth::scene::{Branch, SceneAccumulators};
use crate::error::SynthesisError;
use crate::utils::count_foreground;

/// Default number of instances pasted into each scene.
pub const DEFAULT_TARGET_COUNT: usize = 50;
/// Default budget of failed placements per scene.
pub const DEFAULT_MAX_ATTEMPTS: usize = 2000;

/// Background whose color statistics a donor is matched to
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColorReference {
    /// The branch image region the donor is pasted over.
    #[default]
    Crop,
    /// The whole branch image.
    Scene,
}

/// Outcome of one scene.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SceneReport {
    /// Successful placements.
    pub placed: usize,
    /// Failed placements.
    pub attempts: usize,
    /// Identifiers of the placed donors, in placement order.
    pub donors: Vec<String>,
    /// Instances missing from the target count.
    pub shortfall: usize,
}

/// Drives one scene to its target instance count.
#[derive(Debug, Clone)]
pub struct SceneSynthesizer<T = Identity> {
    pub mode: BlendMode,
    pub truth_mode: TruthMode,
    pub target_count: usize,
    pub max_attempts: usize,
    pub color_reference: ColorReference,
    pub sampler: PlacementSampler,
    pub transform: T,
}

impl SceneSynthesizer<Identity> {
    pub fn new(mode: BlendMode) -> Self {
        Self {
            mode,
            truth_mode: TruthMode::default(),
            target_count: DEFAULT_TARGET_COUNT,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            color_reference: ColorReference::default(),
            sampler: PlacementSampler::default(),
            transform: Identity,
        }
    }
}

impl<T: InstanceTransform> SceneSynthesizer<T> {
    #[must_use]
    pub fn with_truth_mode(mut self, truth_mode: TruthMode) -> Self {
        self.truth_mode = truth_mode;
        self
    }

    #[must_use]
    pub fn with_target_count(mut self, target_count: usize) -> Self {
        self.target_count = target_count;
        self
    }

    #[must_use]
    pub fn with_max_attempts(mut self, max_attempts: usize) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    #[must_use]
    pub fn with_color_reference(mut self, color_reference: ColorReference) -> Self {
        self.color_reference = color_reference;
        self
    }

    #[must_use]
    pub fn with_transform<U: InstanceTransform>(self, transform: U) -> SceneSynthesizer<U> {
        SceneSynthesizer {
            mode: self.mode,
            truth_mode: self.truth_mode,
            target_count: self.target_count,
            max_attempts: self.max_attempts,
            color_reference: self.color_reference,
            sampler: self.sampler,
            transform,
        }
    }

    /// Pastes donors into `scene` until `target_count` instances are placed
    /// or `max_attempts` placements have failed.
    ///
    /// Donors are drawn in pool order starting at `first_donor`, wrapping
    /// around the pool. A donor that cannot be placed (no free region within
    /// the sampler's tries, larger than the scene, or with an empty mask
    /// after its pre-transform) counts as one failed attempt and leaves the
    /// scene untouched. Stopping short of the target is reported through
    /// [`SceneReport::shortfall`], not as an error.
    ///
    /// # Errors
    ///
    /// * `SynthesisError::EmptyDonorPool` - when instances are requested from an empty pool
    /// * any error loading a donor, and blend precondition failures
    #[tracing::instrument(level = "debug", skip_all, fields(scene = scene.name()))]
    pub fn synthesize<D, R>(
        &self,
        scene: &mut SceneAccumulators,
        donors: &D,
        first_donor: usize,
        rng: &mut R,
    ) -> Result<SceneReport, SynthesisError>
    where
        D: DonorSource + ?Sized,
        R: Rng + ?Sized,
    {
        let mut report = SceneReport::default();
        if self.target_count == 0 {
            return Ok(report);
        }
        if donors.is_empty() {
            return Err(SynthesisError::EmptyDonorPool {
                target_count: self.target_count,
            });
        }

        let (scene_width, scene_height) = scene.dimensions();
        let mut cursor = first_donor % donors.len();

        while report.placed < self.target_count && report.attempts < self.max_attempts {
            let instance = donors.load(cursor)?;
            cursor = (cursor + 1) % donors.len();
            let instance = self.transform.apply(instance, rng);

            let (width, height) = instance.dimensions();
            if width == 0 || height == 0 || width > scene_width || height > scene_height {
                debug!(
                    donor = %instance.id,
                    width, height, "donor does not fit in the scene"
                );
                report.attempts += 1;
                continue;
            }
            let min_side = self.mode.min_patch_side();
            if width < min_side || height < min_side {
                debug!(
                    donor = %instance.id,
                    width, height, min_side, "donor is too thin for the blend mode"
                );
                report.attempts += 1;
                continue;
            }
            let blend_mask = instance.blend_mask();
            if count_foreground(&blend_mask) == 0 {
                debug!(donor = %instance.id, "donor mask is empty");
                report.attempts += 1;
                continue;
            }

            let placement =
                self.sampler
                    .sample_area(scene.occupancy_mut(), width, height, rng)?;
            let Placement::Found { x, y } = placement else {
                debug!(donor = %instance.id, "no free region found");
                report.attempts += 1;
                continue;
            };

            let branch = if rng.random_bool(0.5) {
                Branch::First
            } else {
                Branch::Second
            };
            let background = scene.crop(branch, x, y, width, height);
            let adjusted = match self.color_reference {
                ColorReference::Crop => instance.patch().transfer_color(&background)?,
                ColorReference::Scene => instance.patch().transfer_color(scene.image(branch))?,
            };
            let composite = self.mode.blend(&adjusted, &blend_mask, &background, true)?;
            scene.place(branch, x, y, &composite, &instance.true_mask(self.truth_mode))?;

            report.placed += 1;
            report.donors.push(instance.id);
        }

        report.shortfall = self.target_count - report.placed;
        if report.shortfall > 0 {
            warn!(
                scene = scene.name(),
                placed = report.placed,
                target = self.target_count,
                attempts = report.attempts,
                "scene finished short of its target"
            );
        }
        Ok(report)
    }
}
