use std::path::Path;

use crate::error::{KbmodError, Result};
use crate::search::Trajectory;

/// Write trajectories as space-separated text, one per line:
/// `lh flux x y vx vy obs_count`. Consumed by the post-processing
/// collaborator (§6); header-free.
pub fn write_results(path: &Path, trajectories: &[Trajectory]) -> Result<()> {
    use std::io::Write;
    let mut file = std::fs::File::create(path)?;
    for t in trajectories {
        writeln!(
            file,
            "{} {} {} {} {} {} {}",
            t.lh, t.flux, t.x, t.y, t.vx, t.vy, t.obs_count
        )?;
    }
    Ok(())
}

/// Read trajectories back from the format written by [`write_results`].
/// Blank lines are skipped; a malformed line is a [`KbmodError::InvalidRaw`].
pub fn read_results(path: &Path) -> Result<Vec<Trajectory>> {
    let contents = std::fs::read_to_string(path)?;
    let mut trajectories = Vec::new();
    for line in contents.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.len() != 7 {
            return Err(KbmodError::InvalidRaw(format!(
                "expected 7 fields, got {}: {line}",
                fields.len()
            )));
        }
        let parse = |s: &str| {
            s.parse::<f32>()
                .map_err(|e| KbmodError::InvalidRaw(format!("bad number {s}: {e}")))
        };
        trajectories.push(Trajectory {
            lh: parse(fields[0])?,
            flux: parse(fields[1])?,
            x: parse(fields[2])? as u32,
            y: parse(fields[3])? as u32,
            vx: parse(fields[4])?,
            vy: parse(fields[5])?,
            obs_count: parse(fields[6])? as u32,
        });
    }
    Ok(trajectories)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn results_file_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("results.txt");
        let trajectories = vec![
            Trajectory {
                x: 10,
                y: 20,
                vx: 3.5,
                vy: -1.25,
                lh: 42.5,
                flux: 100.25,
                obs_count: 8,
            },
            Trajectory {
                x: 1,
                y: 2,
                vx: 0.0,
                vy: 0.0,
                lh: 1.0,
                flux: 1.0,
                obs_count: 1,
            },
        ];
        write_results(&path, &trajectories).unwrap();
        let read_back = read_results(&path).unwrap();
        assert_eq!(read_back.len(), 2);
        assert_eq!(read_back[0].x, 10);
        assert_eq!(read_back[0].obs_count, 8);
    }

    #[test]
    fn read_results_rejects_malformed_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.txt");
        std::fs::write(&path, "not enough fields\n").unwrap();
        assert!(read_results(&path).is_err());
    }
}
