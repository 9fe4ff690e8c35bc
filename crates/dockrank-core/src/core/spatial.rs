//! Uniform grid index over receptor atom positions.
//!
//! With the cell size equal to the contact cutoff, every atom within the cutoff
//! of a query point lies in the query's cell or one of its 26 neighbours.

use nalgebra::Point3;
use std::collections::HashMap;

type CellKey = (i32, i32, i32);

#[derive(Debug, Clone)]
pub struct SpatialGrid {
    inv_cell_size: f64,
    cells: HashMap<CellKey, Vec<usize>>,
}

impl SpatialGrid {
    /// Builds a grid over `points`, storing each point's index in its cell.
    ///
    /// A non-positive or non-finite `cell_size` puts every point in a single
    /// cell, which keeps queries correct at the cost of pruning nothing.
    pub fn from_points(points: &[Point3<f64>], cell_size: f64) -> Self {
        let inv_cell_size = if cell_size.is_finite() && cell_size > 0.0 {
            1.0 / cell_size
        } else {
            0.0
        };
        let mut grid = Self {
            inv_cell_size,
            cells: HashMap::new(),
        };
        for (idx, point) in points.iter().enumerate() {
            let key = grid.cell_of(point);
            grid.cells.entry(key).or_default().push(idx);
        }
        grid
    }

    fn cell_of(&self, point: &Point3<f64>) -> CellKey {
        (
            (point.x * self.inv_cell_size).floor() as i32,
            (point.y * self.inv_cell_size).floor() as i32,
            (point.z * self.inv_cell_size).floor() as i32,
        )
    }

    /// Calls `visit` with the index of every stored point in the 27 cells around
    /// `point`. Candidates are not distance-filtered; callers apply their own cutoff.
    #[inline]
    pub fn for_each_candidate<F: FnMut(usize)>(&self, point: &Point3<f64>, mut visit: F) {
        let (cx, cy, cz) = self.cell_of(point);
        for dx in -1..=1 {
            for dy in -1..=1 {
                for dz in -1..=1 {
                    let key = (
                        cx.saturating_add(dx),
                        cy.saturating_add(dy),
                        cz.saturating_add(dz),
                    );
                    if let Some(indices) = self.cells.get(&key) {
                        indices.iter().copied().for_each(&mut visit);
                    }
                }
            }
        }
    }

    pub fn cell_count(&self) -> usize {
        self.cells.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn brute_force(points: &[Point3<f64>], query: &Point3<f64>, cutoff: f64) -> Vec<usize> {
        points
            .iter()
            .enumerate()
            .filter(|(_, p)| (*p - query).norm_squared() < cutoff * cutoff)
            .map(|(i, _)| i)
            .collect()
    }

    fn lattice() -> Vec<Point3<f64>> {
        let mut points = Vec::new();
        for i in 0..8 {
            for j in 0..8 {
                for k in 0..8 {
                    points.push(Point3::new(
                        i as f64 * 1.7 - 5.0,
                        j as f64 * 2.3 - 7.0,
                        k as f64 * 1.1 + 0.3,
                    ));
                }
            }
        }
        points
    }

    #[test]
    fn candidates_filtered_by_cutoff_match_brute_force() {
        let points = lattice();
        let cutoff = 4.0;
        let grid = SpatialGrid::from_points(&points, cutoff);
        for query in [
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(-5.0, -7.0, 0.3),
            Point3::new(3.3, 4.4, 5.5),
            Point3::new(40.0, 40.0, 40.0),
        ] {
            let mut found = Vec::new();
            grid.for_each_candidate(&query, |idx| {
                if (points[idx] - query).norm_squared() < cutoff * cutoff {
                    found.push(idx);
                }
            });
            found.sort_unstable();
            assert_eq!(found, brute_force(&points, &query, cutoff));
        }
    }

    #[test]
    fn distant_query_visits_no_candidates() {
        let points = vec![Point3::new(0.0, 0.0, 0.0)];
        let grid = SpatialGrid::from_points(&points, 2.0);
        let mut visited = 0;
        grid.for_each_candidate(&Point3::new(10.0, 0.0, 0.0), |_| visited += 1);
        assert_eq!(visited, 0);
    }

    #[test]
    fn invalid_cell_size_degrades_to_single_cell() {
        let points = vec![Point3::new(0.0, 0.0, 0.0), Point3::new(100.0, 0.0, 0.0)];
        let grid = SpatialGrid::from_points(&points, 0.0);
        assert_eq!(grid.cell_count(), 1);
        let mut visited = Vec::new();
        grid.for_each_candidate(&Point3::new(50.0, 0.0, 0.0), |i| visited.push(i));
        assert_eq!(visited, vec![0, 1]);
    }

    #[test]
    fn empty_grid_has_no_cells() {
        let grid = SpatialGrid::from_points(&[], 3.0);
        assert_eq!(grid.cell_count(), 0);
    }
}
