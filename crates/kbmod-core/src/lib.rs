pub mod compute;
pub mod config;
pub mod consts;
pub mod error;
pub mod image;
pub mod io;
pub mod layered_image;
pub mod psf;
pub mod psi_phi;
pub mod results;
pub mod search;
pub mod stack;

pub use compute::{create_backend, ComputeBackend, DevicePreference};
pub use config::SearchConfig;
pub use error::{KbmodError, Result};
pub use image::RawImage;
pub use layered_image::LayeredImage;
pub use psf::Psf;
pub use psi_phi::PsiPhiStack;
pub use results::ResultSet;
pub use search::{SearchSpec, Trajectory};
pub use stack::ImageStack;
