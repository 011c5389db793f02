use std::path::PathBuf;

use thiserror::Error;

/// Error type for color transfer operations
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ColorTransferError {
    /// The source or target patch has no pixels
    ///
    /// Mean and standard deviation are undefined for an empty patch.
    #[error("Color transfer requires non-empty patches, got source {source_dims:?} and target {target_dims:?}")]
    EmptyPatch {
        source_dims: (u32, u32),
        target_dims: (u32, u32),
    },
}

/// Error type for blending operations
///
/// Every variant is a precondition failure: the inputs are malformed and
/// retrying with the same data cannot succeed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BlendError {
    /// Source, mask and destination do not share one size
    #[error("Blend inputs must share dimensions: source {source_dims:?}, mask {mask_dims:?}, destination {dest_dims:?}")]
    DimensionMismatch {
        source_dims: (u32, u32),
        mask_dims: (u32, u32),
        dest_dims: (u32, u32),
    },

    /// The mask has no foreground pixel
    #[error("Blend mask is empty")]
    EmptyMask,

    /// The mask was not binarized to {0, 1} before blending
    #[error("Blend mask must be binarized to {{0, 1}}, found maximum {max}")]
    MaskNotBinary { max: u8 },

    /// A blur or dilation kernel size is even or zero
    #[error("Kernel size must be odd and non-zero, got {size}")]
    InvalidKernelSize { size: u32 },

    /// The blur backend rejected the alpha map
    #[error("Blurring the alpha map failed: {reason}")]
    BlurFailed { reason: String },
}

/// Error type for placement sampling
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlacementError {
    /// The requested region does not fit inside the occupancy mask
    #[error("Region {width}x{height} does not fit in occupancy mask {mask_width}x{mask_height}")]
    RegionTooLarge {
        width: u32,
        height: u32,
        mask_width: u32,
        mask_height: u32,
    },

    /// A zero-sized region was requested
    #[error("Requested region must be non-empty, got {width}x{height}")]
    EmptyRegion { width: u32, height: u32 },

    /// A footprint written to the occupancy mask leaves its bounds
    #[error("Footprint {width}x{height} at ({x}, {y}) leaves occupancy mask {mask_width}x{mask_height}")]
    FootprintOutOfBounds {
        x: u32,
        y: u32,
        width: u32,
        height: u32,
        mask_width: u32,
        mask_height: u32,
    },
}

/// Error type for scene synthesis and dataset handling
#[derive(Debug, Error)]
pub enum SynthesisError {
    /// A donor patch and its mask differ in size
    #[error("Instance {id}: patch {patch_dims:?} and mask {mask_dims:?} differ in size")]
    InstanceShapeMismatch {
        id: String,
        patch_dims: (u32, u32),
        mask_dims: (u32, u32),
    },

    /// The rasters of one scene are not spatially aligned
    #[error("Scene {name}: raster `{raster}` is {actual:?}, expected {expected:?}")]
    SceneShapeMismatch {
        name: String,
        raster: &'static str,
        expected: (u32, u32),
        actual: (u32, u32),
    },

    /// Per-scene (or donor) file lists have different lengths
    #[error("File list `{list}` has {actual} entries, expected {expected}")]
    FileCountMismatch {
        list: &'static str,
        expected: usize,
        actual: usize,
    },

    /// Instances were requested from an empty donor pool
    #[error("Donor pool is empty but {target_count} instances per scene were requested")]
    EmptyDonorPool { target_count: usize },

    /// A donor index past the end of the pool was requested
    #[error("Donor index {index} is out of range for a pool of {len}")]
    DonorIndexOutOfRange { index: usize, len: usize },

    /// Configuration rejected before any processing
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// A configuration file could not be parsed or written
    #[error("Configuration error at {path}: {source}")]
    Config {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Image error at {path}: {source}")]
    Image {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error(transparent)]
    ColorTransfer(#[from] ColorTransferError),

    #[error(transparent)]
    Blend(#[from] BlendError),

    #[error(transparent)]
    Placement(#[from] PlacementError),
}

impl SynthesisError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn image(path: impl Into<PathBuf>, source: image::ImageError) -> Self {
        Self::Image {
            path: path.into(),
            source,
        }
    }
}
