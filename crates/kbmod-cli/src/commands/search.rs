use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use clap::Args;
use indicatif::{ProgressBar, ProgressStyle};
use kbmod_core::{create_backend, PsiPhiStack, ResultSet, SearchConfig};

use super::common::load_stack;

#[derive(Args)]
pub struct SearchArgs {
    /// Directory of `*.raw` frame files
    pub dir: PathBuf,

    /// Frame width in pixels
    #[arg(long)]
    pub width: usize,

    /// Frame height in pixels
    #[arg(long)]
    pub height: usize,

    /// Gaussian PSF sigma used to build per-frame matched filters
    #[arg(long, default_value = "1.0")]
    pub psf_sigma: f32,

    /// Path to a TOML search configuration
    #[arg(long)]
    pub config: PathBuf,

    /// Where to write the ranked results file
    #[arg(short, long, default_value = "results.txt")]
    pub output: PathBuf,
}

pub fn run(args: &SearchArgs) -> Result<()> {
    let config = SearchConfig::load(&args.config)?;

    let spinner = ProgressBar::new_spinner();
    spinner.set_style(ProgressStyle::with_template("{spinner} {msg}").unwrap());
    spinner.enable_steady_tick(Duration::from_millis(120));

    spinner.set_message("loading stack");
    let mut stack = load_stack(&args.dir, args.width, args.height, args.psf_sigma)?;

    if config.mask_flags != 0 {
        stack.apply_mask_flags(config.mask_flags, &config.mask_exceptions);
    }
    if config.global_mask_flags != 0 {
        stack.apply_global_mask(config.global_mask_flags, config.global_mask_threshold);
    }

    spinner.set_message("building psi/phi planes");
    let psi_phi = PsiPhiStack::build(&stack);

    let backend = create_backend(config.device)?;
    spinner.set_message(format!("searching ({})", backend.name()));
    let spec = config.to_search_spec();
    let trajectories = backend.search(&psi_phi, &spec)?;

    let results = ResultSet::new(trajectories);
    spinner.finish_with_message(format!("{} candidate(s) survived", results.len()));

    results.save_results(&args.output, config.keep_fraction)?;
    println!("wrote {}", args.output.display());

    Ok(())
}
