use serde::{Deserialize, Serialize};

use crate::compute::DevicePreference;
use crate::error::{KbmodError, Result};
use crate::search::SearchSpec;

/// Invocation surface for a search, loadable from TOML or built
/// programmatically. Mirrors the shape of [`SearchSpec`] plus the
/// stack-level preprocessing parameters and device preference that sit
/// outside the evaluator proper.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    pub n_theta: usize,
    pub n_v: usize,
    pub theta_min: f32,
    pub theta_max: f32,
    pub v_min: f32,
    pub v_max: f32,
    pub min_obs: usize,
    pub results_per_pixel: usize,
    pub keep_fraction: f32,

    /// Bit mask passed to `ImageStack::apply_mask_flags`; 0 disables it.
    pub mask_flags: u32,
    /// Flag results exempted from masking.
    pub mask_exceptions: Vec<u32>,
    /// Bit mask passed to `ImageStack::apply_global_mask`; 0 disables it.
    pub global_mask_flags: u32,
    /// Strict-greater-than frame-count threshold for the global mask.
    pub global_mask_threshold: usize,

    pub device: DevicePreference,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            n_theta: 1,
            n_v: 1,
            theta_min: 0.0,
            theta_max: 0.0,
            v_min: 0.0,
            v_max: 0.0,
            min_obs: 1,
            results_per_pixel: 8,
            keep_fraction: 1.0,
            mask_flags: 0,
            mask_exceptions: Vec::new(),
            global_mask_flags: 0,
            global_mask_threshold: usize::MAX,
            device: DevicePreference::Auto,
        }
    }
}

impl SearchConfig {
    /// Parse a TOML file, applying `#[serde(default)]` for omitted
    /// fields, then validate eagerly.
    pub fn load(path: &std::path::Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&text)
            .map_err(|e| KbmodError::Config(format!("{}: {e}", path.display())))?;
        config.validate()?;
        Ok(config)
    }

    /// Eagerly validate, surfacing the same `BadSearchSpec` conditions
    /// §7 defines for the evaluator itself.
    pub fn validate(&self) -> Result<()> {
        self.to_search_spec().validate()
    }

    pub fn to_search_spec(&self) -> SearchSpec {
        SearchSpec {
            v_min: self.v_min,
            v_max: self.v_max,
            n_v: self.n_v,
            theta_min: self.theta_min,
            theta_max: self.theta_max,
            n_theta: self.n_theta,
            min_obs: self.min_obs,
            k: self.results_per_pixel,
        }
    }
}
