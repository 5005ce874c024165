//! Poisson-disk (blue noise) point sampling for node layout.
//!
//! Uses a background grid with cell size `min_dist / sqrt(2)`, so each cell
//! holds at most one accepted point and any conflicting point lies within
//! the surrounding 5x5 block of cells.

use nalgebra::Point2;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::f32::consts::PI;

/// Default number of annulus candidates tried around each active point.
pub const DEFAULT_CANDIDATES: u32 = 30;

/// Default cap on accepted points.
pub const DEFAULT_MAX_SAMPLES: usize = 100;

/// Sampling parameters for a `width x height` region anchored at the origin.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PoissonDisk {
    pub height: f32,
    pub width: f32,
    pub min_dist: f32,
    pub max_candidate_points: u32,
    pub max_samples: usize,
}

impl PoissonDisk {
    pub fn new(height: f32, width: f32, min_dist: f32) -> Self {
        Self {
            height,
            width,
            min_dist,
            max_candidate_points: DEFAULT_CANDIDATES,
            max_samples: DEFAULT_MAX_SAMPLES,
        }
    }

    pub fn with_candidates(mut self, candidates: u32) -> Self {
        self.max_candidate_points = candidates;
        self
    }

    pub fn with_max_samples(mut self, max_samples: usize) -> Self {
        self.max_samples = max_samples;
        self
    }

    fn is_degenerate(&self) -> bool {
        !(self.min_dist.is_finite() && self.min_dist > 0.0)
            || !(self.width.is_finite() && self.width > 0.0)
            || !(self.height.is_finite() && self.height > 0.0)
            || self.max_samples == 0
    }

    /// Number of background grid cells the region spans.
    ///
    /// Computed in floating point so oversized regions report a large
    /// value instead of overflowing.
    pub fn cell_count(&self) -> f64 {
        let cell_size = f64::from(self.min_dist) / std::f64::consts::SQRT_2;
        let cols = (f64::from(self.width) / cell_size).ceil().max(1.0);
        let rows = (f64::from(self.height) / cell_size).ceil().max(1.0);
        cols * rows
    }

    fn in_region(&self, p: &Point2<f32>) -> bool {
        p.x >= 0.0 && p.y >= 0.0 && p.x < self.width && p.y < self.height
    }

    /// Draws up to `max_samples` points, no two closer than `min_dist`.
    ///
    /// Degenerate parameters (non-positive sizes or distance) yield no points.
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Vec<Point2<f32>> {
        if self.is_degenerate() {
            return Vec::new();
        }

        let mut grid = Grid::new(self.width, self.height, self.min_dist / 2f32.sqrt());
        let mut samples: Vec<Point2<f32>> = Vec::new();
        let mut active: Vec<Point2<f32>> = Vec::new();

        let seed = Point2::new(rng.gen_range(0.0..self.width), rng.gen_range(0.0..self.height));
        grid.mark(&seed, samples.len());
        samples.push(seed);
        active.push(seed);

        while !active.is_empty() && samples.len() < self.max_samples {
            let point = active.swap_remove(rng.gen_range(0..active.len()));

            for _ in 0..self.max_candidate_points {
                let candidate = self.annulus_point(rng, &point);
                if !self.in_region(&candidate)
                    || grid.is_occupied(&candidate)
                    || grid.has_conflict(&candidate, self.min_dist, &samples)
                {
                    continue;
                }

                grid.mark(&candidate, samples.len());
                samples.push(candidate);
                active.push(candidate);

                if samples.len() >= self.max_samples {
                    break;
                }
            }
        }

        samples
    }

    /// Uniform angle, radius in `[min_dist, 2 * min_dist)`.
    fn annulus_point<R: Rng + ?Sized>(&self, rng: &mut R, center: &Point2<f32>) -> Point2<f32> {
        let radius = self.min_dist * (1.0 + rng.gen::<f32>());
        let angle = 2.0 * PI * rng.gen::<f32>();
        Point2::new(center.x + radius * angle.cos(), center.y + radius * angle.sin())
    }
}

/// Acceleration grid: each occupied cell stores the index of one sample.
///
/// Cells are kept sparse, so memory follows the number of accepted samples
/// rather than the area of the region.
struct Grid {
    cells: HashMap<(usize, usize), usize>,
    cols: usize,
    rows: usize,
    cell_size: f32,
}

impl Grid {
    fn new(width: f32, height: f32, cell_size: f32) -> Self {
        // Float to usize casts saturate, so huge regions stay representable
        let cols = ((width / cell_size).ceil() as usize).max(1);
        let rows = ((height / cell_size).ceil() as usize).max(1);
        Self {
            cells: HashMap::new(),
            cols,
            rows,
            cell_size,
        }
    }

    fn coord(&self, p: &Point2<f32>) -> (usize, usize) {
        let col = ((p.x / self.cell_size) as usize).min(self.cols - 1);
        let row = ((p.y / self.cell_size) as usize).min(self.rows - 1);
        (col, row)
    }

    fn mark(&mut self, p: &Point2<f32>, index: usize) {
        self.cells.insert(self.coord(p), index);
    }

    fn is_occupied(&self, p: &Point2<f32>) -> bool {
        self.cells.contains_key(&self.coord(p))
    }

    fn has_conflict(&self, p: &Point2<f32>, min_dist: f32, samples: &[Point2<f32>]) -> bool {
        let (col, row) = self.coord(p);
        let (c1, c2) = (col.saturating_sub(2), col.saturating_add(2).min(self.cols - 1));
        let (r1, r2) = (row.saturating_sub(2), row.saturating_add(2).min(self.rows - 1));

        (r1..=r2).any(|r| {
            (c1..=c2).any(|c| match self.cells.get(&(c, r)) {
                Some(&idx) => nalgebra::distance(p, &samples[idx]) < min_dist,
                None => false,
            })
        })
    }
}

/// Convenience wrapper with the default candidate count and sample cap.
pub fn generate_poisson_disk<R: Rng + ?Sized>(
    rng: &mut R,
    height: f32,
    width: f32,
    min_dist: f32,
) -> Vec<Point2<f32>> {
    PoissonDisk::new(height, width, min_dist).sample(rng)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn assert_min_spacing(points: &[Point2<f32>], min_dist: f32) {
        for i in 0..points.len() {
            for k in (i + 1)..points.len() {
                let d = nalgebra::distance(&points[i], &points[k]);
                assert!(d >= min_dist, "points {i} and {k} are {d} apart");
            }
        }
    }

    #[test]
    fn test_min_spacing_100x100() {
        let mut rng = ChaCha8Rng::seed_from_u64(42);

        let points = generate_poisson_disk(&mut rng, 100.0, 100.0, 10.0);

        assert!(!points.is_empty());
        assert!(points.len() <= DEFAULT_MAX_SAMPLES);
        assert_min_spacing(&points, 10.0);
    }

    #[test]
    fn test_points_inside_region() {
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let sampler = PoissonDisk::new(40.0, 120.0, 5.0).with_max_samples(1000);

        let points = sampler.sample(&mut rng);

        for p in &points {
            assert!(p.x >= 0.0 && p.x < 120.0);
            assert!(p.y >= 0.0 && p.y < 40.0);
        }
        assert_min_spacing(&points, 5.0);
    }

    #[test]
    fn test_fills_region_when_uncapped() {
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let sampler = PoissonDisk::new(100.0, 100.0, 10.0).with_max_samples(10_000);

        let points = sampler.sample(&mut rng);

        // A 100x100 region fits well over 30 disks of radius 5
        assert!(points.len() > 30, "only {} points", points.len());
        assert_min_spacing(&points, 10.0);
    }

    #[test]
    fn test_respects_sample_cap() {
        let mut rng = ChaCha8Rng::seed_from_u64(11);
        let sampler = PoissonDisk::new(200.0, 200.0, 2.0).with_max_samples(25);

        assert_eq!(sampler.sample(&mut rng).len(), 25);
    }

    #[test]
    fn test_same_seed_same_points() {
        let a = generate_poisson_disk(&mut ChaCha8Rng::seed_from_u64(99), 50.0, 50.0, 4.0);
        let b = generate_poisson_disk(&mut ChaCha8Rng::seed_from_u64(99), 50.0, 50.0, 4.0);

        assert_eq!(a, b);
    }

    #[test]
    fn test_tiny_spacing_over_huge_region() {
        let mut rng = ChaCha8Rng::seed_from_u64(5);
        let sampler = PoissonDisk::new(100_000.0, 100_000.0, 0.0001).with_max_samples(10);

        let points = sampler.sample(&mut rng);

        assert!(!points.is_empty() && points.len() <= 10);
        assert_min_spacing(&points, 0.0001);
        assert!(sampler.cell_count() > 1e18);
    }

    #[test]
    fn test_sparse_grid_fills_cap() {
        let mut rng = ChaCha8Rng::seed_from_u64(8);
        // ~6e9 background cells; only accepted samples are stored
        let sampler = PoissonDisk::new(480.0, 640.0, 0.01).with_max_samples(50);

        let points = sampler.sample(&mut rng);

        assert_eq!(points.len(), 50);
        assert_min_spacing(&points, 0.01);
    }

    #[test]
    fn test_cell_count() {
        // Cell size 10 / sqrt(2) ~= 7.07: 15 columns by 15 rows
        assert_eq!(PoissonDisk::new(100.0, 100.0, 10.0).cell_count(), 225.0);
    }

    #[test]
    fn test_degenerate_parameters() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);

        assert!(generate_poisson_disk(&mut rng, 100.0, 100.0, 0.0).is_empty());
        assert!(generate_poisson_disk(&mut rng, 0.0, 100.0, 1.0).is_empty());
        assert!(PoissonDisk::new(10.0, 10.0, 1.0).with_max_samples(0).sample(&mut rng).is_empty());
    }
}
