use std::collections::BinaryHeap;
use std::time::Instant;

use rayon::prelude::*;
use tracing::info;

use crate::consts::{NO_DATA, PARALLEL_SEARCH_PIXEL_THRESHOLD};
use crate::error::{KbmodError, Result};
use crate::psi_phi::PsiPhiStack;
use crate::search::{SearchSpec, Trajectory};

use super::ComputeBackend;

/// Reference CPU evaluator, parallelized across starting pixels with
/// Rayon. Every thread owns one starting pixel and iterates the full
/// velocity grid, exactly the contract §4.F describes for a GPU thread.
pub struct CpuBackend;

impl ComputeBackend for CpuBackend {
    fn name(&self) -> &str {
        "CPU/Rayon"
    }

    fn is_gpu(&self) -> bool {
        false
    }

    fn search(&self, psi_phi: &PsiPhiStack, spec: &SearchSpec) -> Result<Vec<Trajectory>> {
        spec.validate()?;
        if psi_phi.is_empty() {
            return Err(KbmodError::EmptyStack);
        }

        let started = Instant::now();
        info!(
            candidates = spec.candidate_count(),
            pixels = psi_phi.width() * psi_phi.height(),
            "trajectory search started"
        );

        let width = psi_phi.width();
        let height = psi_phi.height();
        let times = psi_phi.times();
        let grid = spec.velocity_grid();
        let frames = psi_phi.frames();

        let evaluate_pixel = |index: usize| -> Vec<Trajectory> {
            let x0 = (index % width) as f32;
            let y0 = (index / width) as f32;
            let mut heap: BinaryHeap<Trajectory> = BinaryHeap::with_capacity(spec.k + 1);

            for &(vx, vy) in &grid {
                let mut sum_psi = 0.0f32;
                let mut sum_phi = 0.0f32;
                let mut obs = 0u32;

                for (i, frame) in frames.iter().enumerate() {
                    let x = x0 + vx * times[i];
                    let y = y0 + vy * times[i];
                    if x < 0.0 || y < 0.0 || x > (width - 1) as f32 || y > (height - 1) as f32 {
                        continue;
                    }
                    let psi = frame.psi.bilinear(x, y);
                    if psi == NO_DATA {
                        continue;
                    }
                    let phi = frame.phi.bilinear(x, y);
                    if phi <= 0.0 {
                        continue;
                    }
                    sum_psi += psi;
                    sum_phi += phi;
                    obs += 1;
                }

                if (obs as usize) < spec.min_obs || sum_phi <= 0.0 {
                    continue;
                }

                let trajectory = Trajectory {
                    x: x0 as u32,
                    y: y0 as u32,
                    vx,
                    vy,
                    lh: sum_psi / sum_phi.sqrt(),
                    flux: sum_psi / sum_phi,
                    obs_count: obs,
                };

                heap.push(trajectory);
                if heap.len() > spec.k {
                    heap.pop();
                }
            }

            heap.into_sorted_vec()
        };

        let pixel_count = width * height;
        let results: Vec<Trajectory> = if pixel_count >= PARALLEL_SEARCH_PIXEL_THRESHOLD {
            (0..pixel_count)
                .into_par_iter()
                .flat_map(evaluate_pixel)
                .collect()
        } else {
            (0..pixel_count).flat_map(evaluate_pixel).collect()
        };

        info!(
            survivors = results.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "trajectory search finished"
        );

        Ok(results)
    }
}
