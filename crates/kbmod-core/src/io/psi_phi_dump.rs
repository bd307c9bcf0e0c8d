use std::fs;
use std::path::Path;

use byteorder::{LittleEndian, WriteBytesExt};

use crate::error::Result;
use crate::psi_phi::PsiPhiStack;

/// Dump every frame's psi and phi planes as raw little-endian float32
/// blobs into `psi_dir`/`phi_dir`, named by frame index. A diagnostic
/// surface only — not part of the search contract.
pub fn dump_psi_phi(stack: &PsiPhiStack, psi_dir: &Path, phi_dir: &Path) -> Result<()> {
    fs::create_dir_all(psi_dir)?;
    fs::create_dir_all(phi_dir)?;

    for (index, frame) in stack.frames().iter().enumerate() {
        write_plane(&psi_dir.join(format!("{index}.bin")), frame.psi.data())?;
        write_plane(&phi_dir.join(format!("{index}.bin")), frame.phi.data())?;
    }
    Ok(())
}

fn write_plane(path: &Path, plane: &ndarray::Array2<f32>) -> Result<()> {
    let mut file = fs::File::create(path)?;
    for v in plane.iter() {
        file.write_f32::<LittleEndian>(*v)?;
    }
    Ok(())
}
