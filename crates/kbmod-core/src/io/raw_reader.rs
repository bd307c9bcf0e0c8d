use std::fs::File;
use std::path::Path;

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use memmap2::Mmap;
use ndarray::Array2;

use crate::error::{KbmodError, Result};
use crate::image::RawImage;
use crate::io::loader::ImageLoader;
use crate::layered_image::LayeredImage;
use crate::psf::Psf;

/// Reference [`ImageLoader`] for a minimal concatenated flat-file format:
/// a little-endian science plane (f32 × width × height), a variance
/// plane (f32 × width × height), a mask plane (u16 × width × height),
/// then an 8-byte little-endian f64 timestamp trailer. Memory-mapped,
/// in the same idiom as the teacher's SER reader.
///
/// This is a stand-in for a real image loader (FITS or otherwise), not
/// a production format: it exists so `ImageStack::from_paths` has a
/// concrete, testable implementation.
pub struct RawPlaneReader {
    width: usize,
    height: usize,
}

impl RawPlaneReader {
    pub fn new(width: usize, height: usize) -> Self {
        Self { width, height }
    }

    fn plane_bytes(&self) -> usize {
        self.width * self.height * 4
    }

    fn mask_bytes(&self) -> usize {
        self.width * self.height * 2
    }

    fn expected_file_size(&self) -> usize {
        2 * self.plane_bytes() + self.mask_bytes() + 8
    }
}

impl ImageLoader for RawPlaneReader {
    fn load(&self, path: &Path, psf: Psf) -> Result<LayeredImage> {
        let file = File::open(path)?;
        let mmap = unsafe { Mmap::map(&file)? };

        let expected = self.expected_file_size();
        if mmap.len() < expected {
            return Err(KbmodError::InvalidRaw(format!(
                "file {} too small: expected {expected} bytes, got {}",
                path.display(),
                mmap.len()
            )));
        }

        let mut cursor = &mmap[..];
        let mut science = Array2::<f32>::zeros((self.height, self.width));
        for row in 0..self.height {
            for col in 0..self.width {
                science[[row, col]] = cursor.read_f32::<LittleEndian>()?;
            }
        }

        let mut variance = Array2::<f32>::zeros((self.height, self.width));
        for row in 0..self.height {
            for col in 0..self.width {
                variance[[row, col]] = cursor.read_f32::<LittleEndian>()?;
            }
        }

        let mut mask = Array2::<u32>::zeros((self.height, self.width));
        for row in 0..self.height {
            for col in 0..self.width {
                mask[[row, col]] = cursor.read_u16::<LittleEndian>()? as u32;
            }
        }

        let time = cursor.read_f64::<LittleEndian>()? as f32;

        LayeredImage::new(
            RawImage::from_array(science),
            RawImage::from_array(variance),
            mask,
            time,
            psf,
        )
    }
}

/// Write a frame in the [`RawPlaneReader`] format. Used by tests and the
/// CLI's synthetic-data tooling; not part of the core search contract.
pub fn write_raw_frame(
    path: &Path,
    science: &Array2<f32>,
    variance: &Array2<f32>,
    mask: &Array2<u16>,
    time: f64,
) -> Result<()> {
    let mut file = File::create(path)?;
    for v in science.iter() {
        file.write_f32::<LittleEndian>(*v)?;
    }
    for v in variance.iter() {
        file.write_f32::<LittleEndian>(*v)?;
    }
    for v in mask.iter() {
        file.write_u16::<LittleEndian>(*v)?;
    }
    file.write_f64::<LittleEndian>(time)?;
    Ok(())
}
