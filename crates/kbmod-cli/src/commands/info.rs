use std::path::PathBuf;

use anyhow::Result;
use clap::Args;

use super::common::load_stack;

#[derive(Args)]
pub struct InfoArgs {
    /// Directory of `*.raw` frame files
    pub dir: PathBuf,

    /// Frame width in pixels
    #[arg(long)]
    pub width: usize,

    /// Frame height in pixels
    #[arg(long)]
    pub height: usize,

    /// Gaussian PSF sigma (only used to satisfy the loader interface)
    #[arg(long, default_value = "1.0")]
    pub psf_sigma: f32,
}

pub fn run(args: &InfoArgs) -> Result<()> {
    let stack = load_stack(&args.dir, args.width, args.height, args.psf_sigma)?;
    let times = stack.times();

    println!("Frames:      {}", stack.len());
    println!("Dimensions:  {}x{}", stack.width(), stack.height());
    println!(
        "Time range:  {:.3} .. {:.3}",
        times.first().copied().unwrap_or(0.0),
        times.last().copied().unwrap_or(0.0)
    );

    Ok(())
}
