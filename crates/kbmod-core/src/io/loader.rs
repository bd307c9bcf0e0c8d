use std::path::Path;

use crate::error::Result;
use crate::layered_image::LayeredImage;
use crate::psf::Psf;

/// Boundary trait for "a separate on-disk image reader provides raw
/// pixel arrays and exposure times" (out of scope for the core proper).
/// A loader turns one path into one fully-formed [`LayeredImage`]; the
/// caller supplies the PSF since seeing estimation is not a loader
/// responsibility.
pub trait ImageLoader {
    fn load(&self, path: &Path, psf: Psf) -> Result<LayeredImage>;
}
