pub mod cd_synth;
pub mod config;
pub mod dataset;
mod error;
pub mod provenance;
#[cfg(test)]
mod test_utils;
mod utils;

use image::{ImageBuffer, Pixel};

pub use cd_synth::blend::{blend, effective_expansion, BlendMode};
pub use cd_synth::color_space::{lab_to_rgb, rgb_to_lab, ConvertLab, LabImage};
pub use cd_synth::color_transfer::{transfer_lab_statistics, ChannelStatistics, ColorTransfer};
pub use cd_synth::instance::{
    DonorPool, DonorSource, Identity, Instance, InstanceTransform, RandomRotation, RandomScale,
    TransformConfig, TruthMode,
};
pub use cd_synth::occupancy::Occupancy;
pub use cd_synth::placement::{Placement, PlacementSampler};
pub use cd_synth::run::{ModeSummary, RunSummary, Synthesizer};
pub use cd_synth::scene::{Branch, SceneAccumulators, SceneOutputs, SceneRasters};
pub use cd_synth::seamless_clone::seamless_clone;
pub use cd_synth::synthesis::{ColorReference, SceneReport, SceneSynthesizer};
pub use config::SynthesisConfig;
pub use dataset::{DatasetLayout, DiskDonorPool};
pub use error::{BlendError, ColorTransferError, PlacementError, SynthesisError};

pub type Image<P> = ImageBuffer<P, Vec<<P as Pixel>::Subpixel>>;
