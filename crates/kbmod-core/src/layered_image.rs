use ndarray::Array2;

use crate::consts::NO_DATA;
use crate::error::{KbmodError, Result};
use crate::image::RawImage;
use crate::psf::Psf;

/// One exposure: science, variance and mask planes sharing dimensions,
/// a timestamp (unit opaque to the core, consistent within a stack) and
/// the PSF that describes this frame's seeing.
#[derive(Clone, Debug)]
pub struct LayeredImage {
    science: RawImage,
    variance: RawImage,
    mask: Array2<u32>,
    time: f32,
    psf: Psf,
}

impl LayeredImage {
    pub fn new(
        science: RawImage,
        variance: RawImage,
        mask: Array2<u32>,
        time: f32,
        psf: Psf,
    ) -> Result<Self> {
        let (w, h) = (science.width(), science.height());
        if variance.width() != w || variance.height() != h {
            return Err(KbmodError::InvalidShape(format!(
                "variance plane {}x{} does not match science plane {}x{}",
                variance.width(),
                variance.height(),
                w,
                h
            )));
        }
        if mask.ncols() != w || mask.nrows() != h {
            return Err(KbmodError::InvalidShape(format!(
                "mask plane {}x{} does not match science plane {}x{}",
                mask.ncols(),
                mask.nrows(),
                w,
                h
            )));
        }
        Ok(Self {
            science,
            variance,
            mask,
            time,
            psf,
        })
    }

    pub fn width(&self) -> usize {
        self.science.width()
    }

    pub fn height(&self) -> usize {
        self.science.height()
    }

    pub fn time(&self) -> f32 {
        self.time
    }

    pub fn set_time(&mut self, time: f32) {
        self.time = time;
    }

    pub fn psf(&self) -> &Psf {
        &self.psf
    }

    pub fn science(&self) -> &RawImage {
        &self.science
    }

    pub fn variance(&self) -> &RawImage {
        &self.variance
    }

    pub fn mask(&self) -> &Array2<u32> {
        &self.mask
    }

    pub fn set_science(&mut self, science: RawImage) -> Result<()> {
        self.check_dims(science.width(), science.height())?;
        self.science = science;
        Ok(())
    }

    pub fn set_variance(&mut self, variance: RawImage) -> Result<()> {
        self.check_dims(variance.width(), variance.height())?;
        self.variance = variance;
        Ok(())
    }

    pub fn set_mask(&mut self, mask: Array2<u32>) -> Result<()> {
        self.check_dims(mask.ncols(), mask.nrows())?;
        self.mask = mask;
        Ok(())
    }

    fn check_dims(&self, w: usize, h: usize) -> Result<()> {
        if w != self.width() || h != self.height() {
            return Err(KbmodError::InvalidShape(format!(
                "expected {}x{}, got {}x{}",
                self.width(),
                self.height(),
                w,
                h
            )));
        }
        Ok(())
    }

    /// Inject a synthetic point source: adds `flux * psf(i-x, j-y)` to the
    /// science plane for every pixel within the PSF's footprint centered
    /// on `(x, y)`. Used for testing and injection/recovery experiments.
    pub fn add_object(&mut self, x: f32, y: f32, flux: f32, psf: &Psf) {
        let radius = psf.radius() as isize;
        let cx = x.round() as isize;
        let cy = y.round() as isize;
        let (w, h) = (self.width() as isize, self.height() as isize);

        for dy in -radius..=radius {
            let py = cy + dy;
            if py < 0 || py >= h {
                continue;
            }
            for dx in -radius..=radius {
                let px = cx + dx;
                if px < 0 || px >= w {
                    continue;
                }
                let weight = psf.get(dx, dy);
                if weight == 0.0 {
                    continue;
                }
                let current = self.science.get(px as usize, py as usize);
                if current == NO_DATA {
                    continue;
                }
                self.science
                    .set(px as usize, py as usize, current + flux * weight);
            }
        }
    }

    /// For each pixel, if `mask & flag_mask` is non-zero and not present
    /// in `exception_list`, set the science plane to `NO_DATA` there.
    pub fn apply_mask_flags(&mut self, flag_mask: u32, exception_list: &[u32]) {
        let (h, w) = (self.height(), self.width());
        for row in 0..h {
            for col in 0..w {
                let flags = self.mask[[row, col]] & flag_mask;
                if flags != 0 && !exception_list.contains(&flags) {
                    self.science.set(col, row, NO_DATA);
                }
            }
        }
    }

    /// Convolve the science plane in place with this frame's PSF.
    pub fn convolve_psf(&mut self) {
        let psf = self.psf.clone();
        self.science.convolve(&psf);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_image(w: usize, h: usize, time: f32) -> LayeredImage {
        LayeredImage::new(
            RawImage::new(w, h),
            RawImage::from_array(Array2::from_elem((h, w), 1.0)),
            Array2::<u32>::zeros((h, w)),
            time,
            Psf::from_gaussian(1.0),
        )
        .unwrap()
    }

    #[test]
    fn rejects_mismatched_variance_dims() {
        let science = RawImage::new(5, 5);
        let variance = RawImage::new(4, 5);
        let mask = Array2::<u32>::zeros((5, 5));
        let result = LayeredImage::new(science, variance, mask, 0.0, Psf::from_gaussian(1.0));
        assert!(result.is_err());
    }

    #[test]
    fn apply_mask_flags_respects_exceptions() {
        let mut img = make_image(3, 3, 0.0);
        // col,row values: (0,0)=0 (1,0)=1 (2,0)=2 / (0,1)=4 (1,1)=5 (2,1)=0 / (0,2)=0 (1,2)=0 (2,2)=3
        img.mask = Array2::from_shape_vec((3, 3), vec![0, 1, 2, 4, 5, 0, 0, 0, 3]).unwrap();
        // flags = mask & 1: (1,0)->1, (1,1)->1, (2,2)->1; all others 0.
        // exception_list permits flags==1, so none of them should be masked.
        img.apply_mask_flags(1, &[1]);
        assert_ne!(img.science().get(1, 0), NO_DATA);
        assert_ne!(img.science().get(1, 1), NO_DATA);
        assert_ne!(img.science().get(2, 2), NO_DATA);

        let mut img2 = make_image(3, 3, 0.0);
        img2.mask = Array2::from_shape_vec((3, 3), vec![0, 1, 2, 4, 5, 0, 0, 0, 3]).unwrap();
        // No exceptions: any non-zero flags&1 result masks the science pixel.
        img2.apply_mask_flags(1, &[]);
        assert_eq!(img2.science().get(1, 0), NO_DATA);
        assert_eq!(img2.science().get(1, 1), NO_DATA);
        assert_eq!(img2.science().get(2, 2), NO_DATA);
        assert_ne!(img2.science().get(0, 0), NO_DATA);
    }

    #[test]
    fn add_object_adds_flux_within_footprint() {
        let mut img = make_image(11, 11, 0.0);
        let psf = Psf::from_gaussian(1.0);
        img.add_object(5.0, 5.0, 100.0, &psf);
        assert!(img.science().get(5, 5) > 0.0);
    }

    #[test]
    fn convolve_psf_modifies_science() {
        let mut img = make_image(9, 9, 0.0);
        img.add_object(4.0, 4.0, 100.0, &Psf::from_gaussian(0.01));
        let before = img.science().clone();
        img.convolve_psf();
        assert_ne!(img.science().get(4, 4), before.get(4, 4));
    }
}
