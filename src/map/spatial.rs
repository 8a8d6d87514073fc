use std::collections::HashMap;

use glam::DVec2;

/// Spatial hash grid over county centroids for O(1) cursor lookups.
/// Queries return indexes into the sequence the grid was built from;
/// callers filter candidates by actual distance.
pub struct CentroidGrid {
    /// Grid cells indexed by (cell_x, cell_y)
    cells: HashMap<(i32, i32), Vec<usize>>,
    /// Cell size in map units
    cell_size: f64,
}

impl CentroidGrid {
    pub fn build<I: IntoIterator<Item = DVec2>>(positions: I, cell_size: f64) -> Self {
        let mut cells: HashMap<(i32, i32), Vec<usize>> = HashMap::new();
        for (idx, p) in positions.into_iter().enumerate() {
            cells
                .entry(Self::cell_of(p, cell_size))
                .or_default()
                .push(idx);
        }
        Self { cells, cell_size }
    }

    #[inline(always)]
    fn cell_of(p: DVec2, cell_size: f64) -> (i32, i32) {
        (
            (p.x / cell_size).floor() as i32,
            (p.y / cell_size).floor() as i32,
        )
    }

    /// Candidate indexes within `radius` map units of `p`. Conservative:
    /// every cell the circle's bounding box overlaps is included.
    pub fn query_radius(&self, p: DVec2, radius: f64) -> Vec<usize> {
        let min_cell = Self::cell_of(p - DVec2::splat(radius), self.cell_size);
        let max_cell = Self::cell_of(p + DVec2::splat(radius), self.cell_size);

        let mut results = Vec::new();
        for cy in min_cell.1..=max_cell.1 {
            for cx in min_cell.0..=max_cell.0 {
                if let Some(indices) = self.cells.get(&(cx, cy)) {
                    results.extend_from_slice(indices);
                }
            }
        }
        results
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid() -> CentroidGrid {
        CentroidGrid::build(
            vec![
                DVec2::new(5.0, 5.0),
                DVec2::new(100.0, 100.0),
                DVec2::new(12.0, 6.0),
            ],
            10.0,
        )
    }

    #[test]
    fn test_query_finds_near_points() {
        let hits = grid().query_radius(DVec2::new(6.0, 6.0), 8.0);
        assert!(hits.contains(&0));
        assert!(hits.contains(&2));
        assert!(!hits.contains(&1));
    }

    #[test]
    fn test_query_crosses_cell_boundaries() {
        // Point near a cell edge; the neighbor cell's entry is a candidate
        let hits = grid().query_radius(DVec2::new(9.9, 5.0), 3.0);
        assert!(hits.contains(&2));
    }

    #[test]
    fn test_empty_grid() {
        let grid = CentroidGrid::build(Vec::new(), 10.0);
        assert!(grid.query_radius(DVec2::ZERO, 50.0).is_empty());
    }
}
