use rayon::prelude::*;
use tracing::{debug, info};

use crate::error::{KbmodError, Result};
use crate::layered_image::LayeredImage;
use crate::psf::Psf;

/// An ordered sequence of [`LayeredImage`]s sharing identical dimensions.
///
/// Times are stored relative to the first frame: constructing a stack (or
/// calling [`ImageStack::set_times`]) subtracts `t_0` so the first frame's
/// time is always zero.
pub struct ImageStack {
    frames: Vec<LayeredImage>,
    width: usize,
    height: usize,
}

impl ImageStack {
    /// Build a stack from already-loaded frames. All frames must share the
    /// same (width, height); the first frame's timestamp is subtracted from
    /// every frame's timestamp so times become offsets from t_0.
    pub fn from_layered_images(mut frames: Vec<LayeredImage>) -> Result<Self> {
        if frames.is_empty() {
            return Err(KbmodError::EmptyStack);
        }
        let width = frames[0].width();
        let height = frames[0].height();
        for frame in &frames {
            if frame.width() != width || frame.height() != height {
                return Err(KbmodError::InvalidShape(format!(
                    "frame {}x{} does not match stack dimensions {}x{}",
                    frame.width(),
                    frame.height(),
                    width,
                    height
                )));
            }
        }

        let t0 = frames[0].time();
        for frame in &mut frames {
            let t = frame.time();
            frame.set_time(t - t0);
        }

        Ok(Self {
            frames,
            width,
            height,
        })
    }

    /// Load frames from paths via an external loader, then build the stack.
    pub fn from_paths<L: crate::io::loader::ImageLoader>(
        loader: &L,
        paths: &[std::path::PathBuf],
        psf: &Psf,
    ) -> Result<Self> {
        let mut frames = Vec::with_capacity(paths.len());
        for path in paths {
            frames.push(loader.load(path, psf.clone())?);
        }
        Self::from_layered_images(frames)
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn frames(&self) -> &[LayeredImage] {
        &self.frames
    }

    pub fn frames_mut(&mut self) -> &mut [LayeredImage] {
        &mut self.frames
    }

    pub fn frame(&self, index: usize) -> &LayeredImage {
        &self.frames[index]
    }

    /// Relative time (seconds or MJD, opaque but consistent) of frame `i`.
    pub fn time(&self, index: usize) -> f32 {
        self.frames[index].time()
    }

    /// All relative times, `times()[0] == 0`.
    pub fn times(&self) -> Vec<f32> {
        self.frames.iter().map(|f| f.time()).collect()
    }

    /// Override the stack's timestamps. `times.len()` must equal the frame
    /// count; the first value is subtracted from all so `t_0 = 0`.
    pub fn set_times(&mut self, times: &[f32]) -> Result<()> {
        if times.len() != self.frames.len() {
            return Err(KbmodError::InvalidShape(format!(
                "expected {} timestamps, got {}",
                self.frames.len(),
                times.len()
            )));
        }
        let t0 = times[0];
        for (frame, &t) in self.frames.iter_mut().zip(times) {
            frame.set_time(t - t0);
        }
        Ok(())
    }

    /// Apply `apply_mask_flags` uniformly to every frame.
    pub fn apply_mask_flags(&mut self, flag_mask: u32, exception_list: &[u32]) {
        debug!(flag_mask, exceptions = exception_list.len(), "applying per-frame mask flags");
        if self.frames.len() >= crate::consts::PARALLEL_FRAME_THRESHOLD {
            self.frames
                .par_iter_mut()
                .for_each(|frame| frame.apply_mask_flags(flag_mask, exception_list));
        } else {
            for frame in &mut self.frames {
                frame.apply_mask_flags(flag_mask, exception_list);
            }
        }
        info!(frames = self.frames.len(), "per-frame mask flags applied");
    }

    /// Any pixel that matches `flag_mask` in strictly more than `threshold`
    /// frames is set to `NO_DATA` in every frame.
    pub fn apply_global_mask(&mut self, flag_mask: u32, threshold: usize) {
        debug!(flag_mask, threshold, "applying global mask");
        let (w, h) = (self.width, self.height);
        let mut counts = ndarray::Array2::<usize>::zeros((h, w));

        for frame in &self.frames {
            let mask = frame.mask();
            for row in 0..h {
                for col in 0..w {
                    if mask[[row, col]] & flag_mask != 0 {
                        counts[[row, col]] += 1;
                    }
                }
            }
        }

        let mut flagged = 0usize;
        for frame in &mut self.frames {
            let science = frame.science().clone();
            let mut updated = science.clone();
            for row in 0..h {
                for col in 0..w {
                    if counts[[row, col]] > threshold {
                        updated.set(col, row, crate::consts::NO_DATA);
                        flagged += 1;
                    }
                }
            }
            frame.set_science(updated).expect("dimensions already validated");
        }
        info!(pixels_flagged = flagged, "global mask applied");
    }

    /// Convolve every frame's science plane with its own PSF.
    pub fn convolve_psf(&mut self) {
        info!(frames = self.frames.len(), "convolving science planes with per-frame PSF");
        if self.frames.len() >= crate::consts::PARALLEL_FRAME_THRESHOLD {
            self.frames.par_iter_mut().for_each(|frame| frame.convolve_psf());
        } else {
            for frame in &mut self.frames {
                frame.convolve_psf();
            }
        }
    }

    /// Replace every frame's PSF with the same kernel.
    pub fn set_uniform_psf(&mut self, psf: Psf) -> Result<()> {
        for frame in &mut self.frames {
            let science = frame.science().clone();
            let variance = frame.variance().clone();
            let mask = frame.mask().clone();
            let time = frame.time();
            *frame = LayeredImage::new(science, variance, mask, time, psf.clone())?;
        }
        Ok(())
    }

    /// Inject a synthetic source at `(x, y)` moving at `(vx, vy)`, using
    /// each frame's own timestamp to compute its footprint center; supports
    /// the "inject synthetic object and re-search" workflow without
    /// exposing mutable frame references.
    pub fn inject(&mut self, x: f32, y: f32, vx: f32, vy: f32, flux: f32, psf: &Psf) {
        for frame in &mut self.frames {
            let t = frame.time();
            frame.add_object(x + vx * t, y + vy * t, flux, psf);
        }
    }
}
