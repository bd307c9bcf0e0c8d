/// Sentinel marking an invalid/masked pixel in a [`crate::image::RawImage`].
pub const NO_DATA: f32 = -9999.0;

/// Minimum pixel count (h*w) to use row-level Rayon parallelism.
pub const PARALLEL_PIXEL_THRESHOLD: usize = 65_536;

/// Minimum frame count to use frame-level Rayon parallelism.
pub const PARALLEL_FRAME_THRESHOLD: usize = 4;

/// Minimum starting-pixel count (w*h) to use Rayon parallelism in the CPU
/// trajectory evaluator.
pub const PARALLEL_SEARCH_PIXEL_THRESHOLD: usize = 4_096;

/// Number of standard deviations a Gaussian PSF grid must cover on each
/// side of the center.
pub const PSF_SIGMA_COVERAGE: f32 = 3.0;
