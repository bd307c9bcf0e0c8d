use ndarray::Array2;

use crate::consts::PSF_SIGMA_COVERAGE;
use crate::error::{KbmodError, Result};

/// A square, odd-sided 2D convolution kernel used to matched-filter a
/// frame's science plane before it contributes to a search.
///
/// Once attached to a [`crate::layered_image::LayeredImage`] the kernel is
/// treated as immutable.
#[derive(Clone, Debug)]
pub struct Psf {
    /// Row-major weights, shape = (dim, dim).
    kernel: Array2<f32>,
}

impl Psf {
    /// Discretize an isotropic 2D Gaussian of standard deviation `sigma`
    /// on a square grid wide enough to cover at least
    /// [`PSF_SIGMA_COVERAGE`] sigmas on each side, normalized so the
    /// discrete sum equals 1.
    pub fn from_gaussian(sigma: f32) -> Self {
        let radius = ((sigma * PSF_SIGMA_COVERAGE).ceil() as usize).max(1);
        let dim = 2 * radius + 1;
        let mut kernel = Array2::<f32>::zeros((dim, dim));

        let s2 = 2.0 * sigma * sigma;
        let mut sum = 0.0f32;
        for row in 0..dim {
            for col in 0..dim {
                let dx = col as f32 - radius as f32;
                let dy = row as f32 - radius as f32;
                let v = (-(dx * dx + dy * dy) / s2).exp();
                kernel[[row, col]] = v;
                sum += v;
            }
        }
        kernel.mapv_inplace(|v| v / sum);

        Self { kernel }
    }

    /// Build a PSF from explicit weights. `array` must be square with an
    /// odd side length.
    pub fn from_array(array: Array2<f32>) -> Result<Self> {
        let (h, w) = array.dim();
        if h != w {
            return Err(KbmodError::InvalidShape(format!(
                "PSF array must be square, got {h}x{w}"
            )));
        }
        if h % 2 == 0 {
            return Err(KbmodError::InvalidShape(format!(
                "PSF array dimension must be odd, got {h}"
            )));
        }
        Ok(Self { kernel: array })
    }

    /// Side length of the square kernel.
    pub fn dim(&self) -> usize {
        self.kernel.nrows()
    }

    /// Distance from the center to an edge: `(dim - 1) / 2`.
    pub fn radius(&self) -> usize {
        (self.dim() - 1) / 2
    }

    /// Total number of weights, `dim * dim`.
    pub fn size(&self) -> usize {
        self.dim() * self.dim()
    }

    /// Sum of all weights.
    pub fn sum(&self) -> f32 {
        self.kernel.iter().sum()
    }

    /// Weight at kernel-local offset `(dx, dy)` from the center, where
    /// both range over `-radius..=radius`. Returns 0 outside that range.
    pub fn get(&self, dx: isize, dy: isize) -> f32 {
        let r = self.radius() as isize;
        if dx < -r || dx > r || dy < -r || dy > r {
            return 0.0;
        }
        let col = (dx + r) as usize;
        let row = (dy + r) as usize;
        self.kernel[[row, col]]
    }

    /// Borrow the raw weight matrix.
    pub fn kernel(&self) -> &Array2<f32> {
        &self.kernel
    }

    /// Elementwise square of every weight, used to build the phi-plane
    /// convolution kernel (psf squared, see §4.E).
    pub fn squared(&self) -> Array2<f32> {
        self.kernel.mapv(|v| v * v)
    }
}
