use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use kbmod_core::io::raw_reader::RawPlaneReader;
use kbmod_core::{ImageStack, Psf};

/// Collect every `*.raw` file in `dir`, sorted by filename, and load
/// them into a stack via [`RawPlaneReader`]. `frames/NNNN.raw` naming
/// gives a stable, deterministic frame order.
pub fn load_stack(dir: &Path, width: usize, height: usize, psf_sigma: f32) -> Result<ImageStack> {
    let mut paths: Vec<PathBuf> = std::fs::read_dir(dir)
        .with_context(|| format!("reading directory {}", dir.display()))?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| p.extension().is_some_and(|ext| ext == "raw"))
        .collect();
    paths.sort();

    if paths.is_empty() {
        anyhow::bail!("no .raw frames found in {}", dir.display());
    }

    let reader = RawPlaneReader::new(width, height);
    let psf = Psf::from_gaussian(psf_sigma);
    let stack = ImageStack::from_paths(&reader, &paths, &psf)?;
    Ok(stack)
}
