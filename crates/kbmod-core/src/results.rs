use crate::error::Result;
use crate::search::Trajectory;

/// The globally sorted result list for one search: every per-pixel
/// survivor, ordered best-first by (lh desc, flux desc, obs desc, x, y,
/// vx, vy). Filtering predicates (min observations, min lh) belong to
/// the search specification, not the selector.
pub struct ResultSet {
    trajectories: Vec<Trajectory>,
}

impl ResultSet {
    /// Sort `trajectories` into the total order from §4.F/§5.
    pub fn new(mut trajectories: Vec<Trajectory>) -> Self {
        trajectories.sort();
        Self { trajectories }
    }

    pub fn len(&self) -> usize {
        self.trajectories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.trajectories.is_empty()
    }

    pub fn all(&self) -> &[Trajectory] {
        &self.trajectories
    }

    /// A slice of the sorted list starting at `offset`, at most `count`
    /// entries.
    pub fn get_results(&self, offset: usize, count: usize) -> &[Trajectory] {
        if offset >= self.trajectories.len() {
            return &[];
        }
        let end = (offset + count).min(self.trajectories.len());
        &self.trajectories[offset..end]
    }

    /// The best `fraction` of the list, rounded up. `fraction` is
    /// clamped to `[0, 1]` per the §9 design note.
    pub fn keep_fraction(&self, fraction: f32) -> &[Trajectory] {
        let clamped = fraction.clamp(0.0, 1.0);
        let count = ((self.trajectories.len() as f32) * clamped).ceil() as usize;
        let count = count.min(self.trajectories.len());
        &self.trajectories[..count]
    }

    /// Keep `fraction` of the sorted list and delegate formatting to the
    /// external results-file writer (§4.G, §6).
    pub fn save_results(&self, path: &std::path::Path, fraction: f32) -> Result<()> {
        crate::io::results_file::write_results(path, self.keep_fraction(fraction))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn traj(lh: f32, x: u32) -> Trajectory {
        Trajectory {
            x,
            y: 0,
            vx: 1.0,
            vy: 0.0,
            lh,
            flux: 1.0,
            obs_count: 5,
        }
    }

    #[test]
    fn sorts_best_first() {
        let set = ResultSet::new(vec![traj(5.0, 0), traj(10.0, 1), traj(1.0, 2)]);
        let lhs: Vec<f32> = set.all().iter().map(|t| t.lh).collect();
        assert_eq!(lhs, vec![10.0, 5.0, 1.0]);
    }

    #[test]
    fn get_results_slices_with_bounds() {
        let set = ResultSet::new(vec![traj(5.0, 0), traj(10.0, 1), traj(1.0, 2)]);
        assert_eq!(set.get_results(1, 1).len(), 1);
        assert_eq!(set.get_results(5, 1).len(), 0);
        assert_eq!(set.get_results(0, 100).len(), 3);
    }

    #[test]
    fn keep_fraction_clamps_out_of_range_values() {
        let set = ResultSet::new((0..10).map(|i| traj(i as f32, i)).collect());
        assert_eq!(set.keep_fraction(-1.0).len(), 0);
        assert_eq!(set.keep_fraction(2.0).len(), 10);
        assert_eq!(set.keep_fraction(0.5).len(), 5);
    }

    #[test]
    fn save_results_writes_the_kept_fraction() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.txt");
        let set = ResultSet::new((0..10).map(|i| traj(i as f32, i)).collect());
        set.save_results(&path, 0.5).unwrap();
        let read_back = crate::io::results_file::read_results(&path).unwrap();
        assert_eq!(read_back.len(), 5);
    }
}
