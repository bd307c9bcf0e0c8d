use ndarray::Array2;
use rayon::prelude::*;

use crate::consts::{NO_DATA, PARALLEL_PIXEL_THRESHOLD};
use crate::psf::Psf;

/// A single width×height float32 plane with a sentinel value
/// ([`NO_DATA`]) marking invalid pixels.
///
/// Arithmetic that would read a `NO_DATA` cell propagates `NO_DATA`
/// rather than producing a misleading finite value.
#[derive(Clone, Debug)]
pub struct RawImage {
    /// Row-major pixel data, shape = (height, width).
    data: Array2<f32>,
}

impl RawImage {
    /// A zero-initialized plane of the given dimensions.
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            data: Array2::zeros((height, width)),
        }
    }

    /// Wrap an existing array (row-major, shape = (height, width)).
    pub fn from_array(data: Array2<f32>) -> Self {
        Self { data }
    }

    pub fn width(&self) -> usize {
        self.data.ncols()
    }

    pub fn height(&self) -> usize {
        self.data.nrows()
    }

    pub fn data(&self) -> &Array2<f32> {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut Array2<f32> {
        &mut self.data
    }

    pub fn get(&self, x: usize, y: usize) -> f32 {
        self.data[[y, x]]
    }

    pub fn set(&mut self, x: usize, y: usize, value: f32) {
        self.data[[y, x]] = value;
    }

    /// True if pixel `(x, y)` is in bounds and holds a valid (non-`NO_DATA`)
    /// value.
    pub fn is_valid(&self, x: usize, y: usize) -> bool {
        x < self.width() && y < self.height() && self.data[[y, x]] != NO_DATA
    }

    /// Bilinear sample at fractional `(x, y)`. Returns `NO_DATA` if the
    /// sample falls outside the image or if any of the four neighboring
    /// pixels is `NO_DATA`.
    pub fn bilinear(&self, x: f32, y: f32) -> f32 {
        bilinear_sample(&self.data, x, y)
    }

    /// Convolve this plane in place with `psf`, renormalizing the kernel
    /// per output pixel to exclude `NO_DATA` neighbors. If every
    /// neighboring weight is excluded the output pixel is `NO_DATA`.
    pub fn convolve(&mut self, psf: &Psf) {
        self.data = convolve_array(&self.data, psf.kernel());
    }

    /// Convolve this plane in place with an arbitrary square kernel
    /// (used for the phi-plane's squared-PSF convolution).
    pub fn convolve_kernel(&mut self, kernel: &Array2<f32>) {
        self.data = convolve_array(&self.data, kernel);
    }
}

/// Bilinear interpolation, `NO_DATA`-aware: any missing neighbor or an
/// out-of-bounds sample yields `NO_DATA`.
pub fn bilinear_sample(data: &Array2<f32>, x: f32, y: f32) -> f32 {
    let (h, w) = data.dim();

    if x < 0.0 || y < 0.0 || x > (w - 1) as f32 || y > (h - 1) as f32 {
        return NO_DATA;
    }

    let x0 = x.floor() as usize;
    let y0 = y.floor() as usize;
    let x1 = (x0 + 1).min(w - 1);
    let y1 = (y0 + 1).min(h - 1);

    let v00 = data[[y0, x0]];
    let v10 = data[[y0, x1]];
    let v01 = data[[y1, x0]];
    let v11 = data[[y1, x1]];

    if v00 == NO_DATA || v10 == NO_DATA || v01 == NO_DATA || v11 == NO_DATA {
        return NO_DATA;
    }

    let fx = x - x0 as f32;
    let fy = y - y0 as f32;

    v00 * (1.0 - fx) * (1.0 - fy) + v10 * fx * (1.0 - fy) + v01 * (1.0 - fx) * fy + v11 * fx * fy
}

/// Correlate `data` with `kernel`, centered, renormalizing per output
/// pixel over the neighbors that are not `NO_DATA`. An output pixel is
/// `NO_DATA` if every in-range, non-zero-weight neighbor is `NO_DATA`.
fn convolve_array(data: &Array2<f32>, kernel: &Array2<f32>) -> Array2<f32> {
    let (h, w) = data.dim();
    let kdim = kernel.nrows();
    let radius = (kdim - 1) / 2;

    let compute_row = |row: usize| -> Vec<f32> {
        (0..w)
            .map(|col| convolve_pixel(data, kernel, row, col, radius, h, w))
            .collect()
    };

    let rows: Vec<Vec<f32>> = if h * w >= PARALLEL_PIXEL_THRESHOLD {
        (0..h).into_par_iter().map(compute_row).collect()
    } else {
        (0..h).map(compute_row).collect()
    };

    let mut result = Array2::<f32>::zeros((h, w));
    for (row, row_data) in rows.into_iter().enumerate() {
        for (col, val) in row_data.into_iter().enumerate() {
            result[[row, col]] = val;
        }
    }
    result
}

fn convolve_pixel(
    data: &Array2<f32>,
    kernel: &Array2<f32>,
    row: usize,
    col: usize,
    radius: usize,
    h: usize,
    w: usize,
) -> f32 {
    let mut acc = 0.0f32;
    let mut weight_sum = 0.0f32;

    for kr in 0..kernel.nrows() {
        let sr = row as isize + kr as isize - radius as isize;
        if sr < 0 || sr >= h as isize {
            continue;
        }
        for kc in 0..kernel.ncols() {
            let sc = col as isize + kc as isize - radius as isize;
            if sc < 0 || sc >= w as isize {
                continue;
            }
            let v = data[[sr as usize, sc as usize]];
            if v == NO_DATA {
                continue;
            }
            let kv = kernel[[kr, kc]];
            acc += v * kv;
            weight_sum += kv;
        }
    }

    if weight_sum == 0.0 {
        NO_DATA
    } else {
        acc / weight_sum
    }
}
