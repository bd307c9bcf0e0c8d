use tracing::debug;

use crate::error::{KbmodError, Result};
use crate::psi_phi::PsiPhiStack;
use crate::search::{SearchSpec, Trajectory};

/// A device capable of running the trajectory evaluator (§4.F). The
/// evaluator is stateless across calls: implementations must release any
/// scratch allocation on every exit path, including failure.
pub trait ComputeBackend: Send + Sync {
    fn name(&self) -> &str;

    fn is_gpu(&self) -> bool;

    /// Evaluate every (starting pixel, candidate velocity) pair in
    /// `spec`'s grid against `psi_phi`, returning each starting pixel's
    /// surviving top-K trajectories (best-first). The caller performs
    /// the global sort and `keep_fraction` cut (§4.G).
    fn search(&self, psi_phi: &PsiPhiStack, spec: &SearchSpec) -> Result<Vec<Trajectory>>;
}

/// Which device a caller would like `search` to run on.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DevicePreference {
    /// Prefer a GPU adapter if the `gpu` feature is compiled in and one
    /// is available; fall back to the CPU backend otherwise.
    #[default]
    Auto,
    Cpu,
    Gpu,
}

/// Construct the backend matching `preference`. `Gpu` fails with
/// [`KbmodError::DeviceUnavailable`] if the `gpu` feature was not
/// compiled in or no suitable adapter could be initialized.
pub fn create_backend(preference: DevicePreference) -> Result<Box<dyn ComputeBackend>> {
    debug!(?preference, "selecting compute backend");
    match preference {
        DevicePreference::Cpu => Ok(Box::new(crate::compute::cpu::CpuBackend) as Box<dyn ComputeBackend>),
        DevicePreference::Gpu => create_gpu_backend(),
        DevicePreference::Auto => {
            create_gpu_backend().or_else(|_| Ok(Box::new(crate::compute::cpu::CpuBackend) as Box<dyn ComputeBackend>))
        }
    }
}

#[cfg(feature = "gpu")]
fn create_gpu_backend() -> Result<Box<dyn ComputeBackend>> {
    crate::compute::wgpu_backend::WgpuBackend::new()
        .map(|backend| Box::new(backend) as Box<dyn ComputeBackend>)
}

#[cfg(not(feature = "gpu"))]
fn create_gpu_backend() -> Result<Box<dyn ComputeBackend>> {
    Err(KbmodError::DeviceUnavailable(
        "crate was built without the \"gpu\" feature".into(),
    ))
}
