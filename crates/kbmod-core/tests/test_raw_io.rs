use kbmod_core::io::raw_reader::write_raw_frame;
use kbmod_core::{ImageStack, Psf};
use ndarray::Array2;

#[test]
fn stack_loads_from_a_directory_of_raw_frames() {
    let dir = tempfile::tempdir().unwrap();
    let (w, h) = (6, 5);

    let times = [0.0f64, 1.5, 3.0];
    let mut paths = Vec::new();
    for (i, &t) in times.iter().enumerate() {
        let path = dir.path().join(format!("{i:04}.raw"));
        let science = Array2::<f32>::from_elem((h, w), i as f32);
        let variance = Array2::<f32>::from_elem((h, w), 2.0);
        let mask = Array2::<u16>::zeros((h, w));
        write_raw_frame(&path, &science, &variance, &mask, t).unwrap();
        paths.push(path);
    }

    let reader = kbmod_core::io::raw_reader::RawPlaneReader::new(w, h);
    let stack = ImageStack::from_paths(&reader, &paths, &Psf::from_gaussian(1.0)).unwrap();

    assert_eq!(stack.len(), 3);
    assert_eq!(stack.width(), w);
    assert_eq!(stack.height(), h);
    assert_eq!(stack.times(), vec![0.0, 1.5, 3.0]);
    assert_eq!(stack.frame(1).science().get(0, 0), 1.0);
}
