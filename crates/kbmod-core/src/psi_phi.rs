use ndarray::Array2;
use tracing::{debug, info};

use crate::consts::NO_DATA;
use crate::image::RawImage;
use crate::stack::ImageStack;

/// A frame's matched-filter numerator (psi) and denominator (phi)
/// planes, as described in §4.E: psi = convolve(science/variance, psf),
/// phi = convolve(1/variance, psf^2), both masked-pixel-aware.
pub struct PsiPhiFrame {
    pub psi: RawImage,
    pub phi: RawImage,
    pub time: f32,
}

/// Per-frame psi/phi planes for an entire stack, ready for upload to a
/// [`crate::compute::ComputeBackend`].
pub struct PsiPhiStack {
    frames: Vec<PsiPhiFrame>,
    width: usize,
    height: usize,
}

impl PsiPhiStack {
    /// Build psi/phi planes for every frame in `stack`.
    pub fn build(stack: &ImageStack) -> Self {
        info!(
            frames = stack.len(),
            width = stack.width(),
            height = stack.height(),
            "building psi/phi planes"
        );
        let frames = stack
            .frames()
            .iter()
            .enumerate()
            .map(|(index, frame)| {
                debug!(index, "convolving psi/phi for frame");
                let (w, h) = (frame.width(), frame.height());
                let science = frame.science();
                let variance = frame.variance();
                let mask = frame.mask();

                let mut psi_raw = Array2::<f32>::zeros((h, w));
                let mut phi_raw = Array2::<f32>::zeros((h, w));

                for row in 0..h {
                    for col in 0..w {
                        let s = science.get(col, row);
                        let v = variance.get(col, row);
                        let masked = mask[[row, col]] != 0;

                        // `masked` is not consulted here: exceptions granted by
                        // `apply_mask_flags` already left `s` valid, and that
                        // decision should stand.
                        psi_raw[[row, col]] = if s == NO_DATA || v <= 0.0 {
                            NO_DATA
                        } else {
                            s / v
                        };

                        phi_raw[[row, col]] = if masked || v <= 0.0 { 0.0 } else { 1.0 / v };
                    }
                }

                let mut psi = RawImage::from_array(psi_raw);
                let mut phi = RawImage::from_array(phi_raw);
                psi.convolve(frame.psf());
                let squared = frame.psf().squared();
                phi.convolve_kernel(&squared);

                PsiPhiFrame {
                    psi,
                    phi,
                    time: frame.time(),
                }
            })
            .collect::<Vec<_>>();

        info!(frames = frames.len(), "psi/phi planes built");

        Self {
            frames,
            width: stack.width(),
            height: stack.height(),
        }
    }

    pub fn frames(&self) -> &[PsiPhiFrame] {
        &self.frames
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

    pub fn times(&self) -> Vec<f32> {
        self.frames.iter().map(|f| f.time).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layered_image::LayeredImage;
    use crate::psf::Psf;
    use ndarray::Array2;

    fn uniform_stack(w: usize, h: usize, science: f32, variance: f32) -> ImageStack {
        let frame = LayeredImage::new(
            RawImage::from_array(Array2::from_elem((h, w), science)),
            RawImage::from_array(Array2::from_elem((h, w), variance)),
            Array2::<u32>::zeros((h, w)),
            0.0,
            Psf::from_gaussian(1.0),
        )
        .unwrap();
        ImageStack::from_layered_images(vec![frame]).unwrap()
    }

    #[test]
    fn uniform_plane_yields_uniform_psi_phi() {
        let stack = uniform_stack(9, 9, 4.0, 2.0);
        let psi_phi = PsiPhiStack::build(&stack);
        let frame = &psi_phi.frames()[0];
        for row in 2..7 {
            for col in 2..7 {
                approx::assert_abs_diff_eq!(frame.psi.get(col, row), 2.0, epsilon = 1e-3);
                approx::assert_abs_diff_eq!(frame.phi.get(col, row), 0.5, epsilon = 1e-3);
            }
        }
    }

    #[test]
    fn masked_pixel_zeroes_phi() {
        let mut frames = vec![LayeredImage::new(
            RawImage::from_array(Array2::from_elem((5, 5), 4.0)),
            RawImage::from_array(Array2::from_elem((5, 5), 2.0)),
            Array2::<u32>::zeros((5, 5)),
            0.0,
            Psf::from_array(Array2::from_elem((1, 1), 1.0)).unwrap(),
        )
        .unwrap()];
        let mut mask = frames[0].mask().clone();
        mask[[2, 2]] = 1;
        frames[0].set_mask(mask).unwrap();

        let stack = ImageStack::from_layered_images(frames).unwrap();
        let psi_phi = PsiPhiStack::build(&stack);
        let frame = &psi_phi.frames()[0];
        assert_eq!(frame.phi.get(2, 2), 0.0);
    }
}
