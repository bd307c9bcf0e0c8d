use kbmod_core::{ImageStack, LayeredImage, Psf, RawImage};
use ndarray::Array2;

/// Build a noise-free stack of `width`x`height` frames at `times`, with a
/// uniform background/variance and an optional injected linear source.
#[allow(clippy::too_many_arguments)]
pub fn synthetic_stack(
    width: usize,
    height: usize,
    times: &[f32],
    background: f32,
    variance: f32,
    psf_sigma: f32,
    source: Option<(f32, f32, f32, f32, f32)>, // x0, y0, vx, vy, flux
) -> ImageStack {
    let psf = Psf::from_gaussian(psf_sigma);
    let mut frames = Vec::new();
    for &t in times {
        let science = RawImage::from_array(Array2::from_elem((height, width), background));
        let variance_plane = RawImage::from_array(Array2::from_elem((height, width), variance));
        let mask = Array2::<u32>::zeros((height, width));
        let mut frame =
            LayeredImage::new(science, variance_plane, mask, t, psf.clone()).unwrap();
        if let Some((x0, y0, vx, vy, flux)) = source {
            frame.add_object(x0 + vx * t, y0 + vy * t, flux, &psf);
        }
        frames.push(frame);
    }
    ImageStack::from_layered_images(frames).unwrap()
}
