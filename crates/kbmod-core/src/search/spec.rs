use crate::error::{KbmodError, Result};

/// A dense grid of candidate velocities, expanded as the Cartesian
/// product of linearly spaced magnitudes and angles.
#[derive(Clone, Copy, Debug)]
pub struct SearchSpec {
    pub v_min: f32,
    pub v_max: f32,
    pub n_v: usize,
    pub theta_min: f32,
    pub theta_max: f32,
    pub n_theta: usize,
    pub min_obs: usize,
    /// Results to retain per starting pixel.
    pub k: usize,
}

impl SearchSpec {
    pub fn validate(&self) -> Result<()> {
        if self.n_v < 1 {
            return Err(KbmodError::BadSearchSpec("n_v must be >= 1".into()));
        }
        if self.n_theta < 1 {
            return Err(KbmodError::BadSearchSpec("n_theta must be >= 1".into()));
        }
        if self.v_min > self.v_max {
            return Err(KbmodError::BadSearchSpec(format!(
                "v_min ({}) > v_max ({})",
                self.v_min, self.v_max
            )));
        }
        if self.theta_min > self.theta_max {
            return Err(KbmodError::BadSearchSpec(format!(
                "theta_min ({}) > theta_max ({})",
                self.theta_min, self.theta_max
            )));
        }
        if self.min_obs < 1 {
            return Err(KbmodError::BadSearchSpec("min_obs must be >= 1".into()));
        }
        if self.k < 1 {
            return Err(KbmodError::BadSearchSpec("k must be >= 1".into()));
        }
        Ok(())
    }

    /// Number of candidates evaluated per starting pixel: `n_v * n_theta`.
    pub fn candidate_count(&self) -> usize {
        self.n_v * self.n_theta
    }

    /// The Cartesian-product grid of (vx, vy) pairs, linearly spaced
    /// inclusive over magnitude and angle.
    pub fn velocity_grid(&self) -> Vec<(f32, f32)> {
        let magnitudes = linspace(self.v_min, self.v_max, self.n_v);
        let angles = linspace(self.theta_min, self.theta_max, self.n_theta);

        let mut grid = Vec::with_capacity(magnitudes.len() * angles.len());
        for &v in &magnitudes {
            for &theta in &angles {
                grid.push((v * theta.cos(), v * theta.sin()));
            }
        }
        grid
    }
}

/// `n` linearly spaced values from `start` to `end`, inclusive. `n == 1`
/// yields just `start`.
fn linspace(start: f32, end: f32, n: usize) -> Vec<f32> {
    if n <= 1 {
        return vec![start];
    }
    let step = (end - start) / (n - 1) as f32;
    (0..n).map(|i| start + step * i as f32).collect()
}
