use ndarray::{Array3, Axis, parallel::prelude::*};

use crate::{
    error::{IsosurfaceError, Result},
    types::{DensityField, Point, Value, Vector},
};

/// A cube-shaped scalar grid of `(N + 1)³` samples spanning `N³` cells.
///
/// Sample `(x, y, z)` corresponds to the world position
/// `center + (x, y, z) / N * extent`; mesh vertices are emitted in the
/// grid's local frame, `((x, y, z) / N - ½) * extent`, so the surface is
/// centered on the volume's local origin and world placement stays with
/// the renderer's transform.
///
/// The grid is filled once and read-only afterwards; triangulation
/// workers share it without locking. Storage is a single flat allocation
/// in standard layout (x outermost).
pub struct DensityGrid {
    resolution: usize,
    extent: Value,
    center: Vector,
    values: Array3<Value>,
}

impl DensityGrid {
    /// Creates a zero-filled grid with `resolution` cells per axis.
    ///
    /// Fails fast on `resolution < 2` or a non-positive/non-finite
    /// `extent`; invalid configuration is a caller bug, not a runtime
    /// fault.
    pub fn new(resolution: usize, extent: Value, center: Vector) -> Result<Self> {
        if resolution < 2 {
            return Err(IsosurfaceError::InvalidResolution { resolution });
        }
        if !(extent > 0.0 && extent.is_finite()) {
            return Err(IsosurfaceError::InvalidExtent { extent });
        }

        let samples = resolution + 1;
        Ok(Self {
            resolution,
            extent,
            center,
            values: Array3::zeros((samples, samples, samples)),
        })
    }

    /// Number of cells along each axis.
    pub fn resolution(&self) -> usize {
        self.resolution
    }

    /// Number of samples along each axis (`resolution + 1`).
    pub fn samples_per_axis(&self) -> usize {
        self.resolution + 1
    }

    /// World-space edge length of the cube.
    pub fn extent(&self) -> Value {
        self.extent
    }

    /// World-space offset of the volume, applied when sampling the field.
    pub fn center(&self) -> Vector {
        self.center
    }

    /// World position of sample `(x, y, z)`: `center + (x, y, z) / N * extent`.
    pub fn world_position(&self, x: usize, y: usize, z: usize) -> Point {
        let step = self.extent / self.resolution as Value;
        Point::new(
            self.center.x + x as Value * step,
            self.center.y + y as Value * step,
            self.center.z + z as Value * step,
        )
    }

    /// Local position of sample `(x, y, z)`, centered on the volume origin:
    /// `((x, y, z) / N - ½) * extent`.
    pub fn local_position(&self, x: usize, y: usize, z: usize) -> Point {
        let step = self.extent / self.resolution as Value;
        let half = self.extent * 0.5;
        Point::new(
            x as Value * step - half,
            y as Value * step - half,
            z as Value * step - half,
        )
    }

    /// Evaluates `field` at every sample position, in parallel.
    ///
    /// Work is partitioned by x-plane; every worker writes a disjoint slab
    /// of the flat storage, so no synchronization is involved. Refilling an
    /// already-filled grid simply overwrites it.
    pub fn fill(&mut self, field: &impl DensityField) {
        let samples = self.samples_per_axis();
        let step = self.extent / self.resolution as Value;
        let center = self.center;

        self.values
            .axis_iter_mut(Axis(0))
            .into_par_iter()
            .enumerate()
            .for_each(|(x, mut plane)| {
                let wx = center.x + x as Value * step;
                for y in 0..samples {
                    let wy = center.y + y as Value * step;
                    for z in 0..samples {
                        let wz = center.z + z as Value * step;
                        plane[[y, z]] = field.sample(Point::new(wx, wy, wz));
                    }
                }
            });
    }

    /// Returns the sample at `(x, y, z)`.
    #[inline]
    pub fn get(&self, x: usize, y: usize, z: usize) -> Value {
        self.values[[x, y, z]]
    }

    /// Returns the sample at `(x, y, z)` with each coordinate clamped to
    /// the valid index range (clamp-to-edge boundary policy).
    #[inline]
    pub fn get_clamped(&self, x: isize, y: isize, z: isize) -> Value {
        let max = self.resolution as isize;
        self.values[[
            x.clamp(0, max) as usize,
            y.clamp(0, max) as usize,
            z.clamp(0, max) as usize,
        ]]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_invalid_configuration() {
        let origin = Vector::zeros();
        assert!(matches!(
            DensityGrid::new(1, 1.0, origin),
            Err(IsosurfaceError::InvalidResolution { resolution: 1 })
        ));
        assert!(matches!(
            DensityGrid::new(4, 0.0, origin),
            Err(IsosurfaceError::InvalidExtent { .. })
        ));
        assert!(matches!(
            DensityGrid::new(4, -3.0, origin),
            Err(IsosurfaceError::InvalidExtent { .. })
        ));
        assert!(matches!(
            DensityGrid::new(4, Value::INFINITY, origin),
            Err(IsosurfaceError::InvalidExtent { .. })
        ));
        assert!(DensityGrid::new(2, 1.0, origin).is_ok());
    }

    #[test]
    fn sample_positions_follow_the_grid_transform() {
        let grid = DensityGrid::new(4, 2.0, Vector::new(10.0, -5.0, 0.5)).unwrap();
        assert_eq!(grid.world_position(0, 0, 0), Point::new(10.0, -5.0, 0.5));
        assert_eq!(grid.world_position(4, 4, 4), Point::new(12.0, -3.0, 2.5));
        assert_eq!(grid.world_position(2, 0, 1), Point::new(11.0, -5.0, 1.0));

        // Local frame is centered on the origin regardless of `center`.
        assert_eq!(grid.local_position(2, 2, 2), Point::origin());
        assert_eq!(grid.local_position(0, 0, 0), Point::new(-1.0, -1.0, -1.0));
        assert_eq!(grid.local_position(4, 4, 4), Point::new(1.0, 1.0, 1.0));
    }

    #[test]
    fn parallel_fill_matches_serial_sampling() {
        let field = |p: Point| p.x * 3.0 + p.y * 5.0 - p.z;
        let mut grid = DensityGrid::new(8, 4.0, Vector::new(1.0, 2.0, 3.0)).unwrap();
        grid.fill(&field);

        for x in 0..=8 {
            for y in 0..=8 {
                for z in 0..=8 {
                    let expected = field.sample(grid.world_position(x, y, z));
                    assert_eq!(grid.get(x, y, z), expected, "sample ({x}, {y}, {z})");
                }
            }
        }
    }

    #[test]
    fn refill_is_reproducible() {
        let field = |p: Point| (p.x * 1.3).sin() + (p.z * 0.7).cos() - p.y;
        let mut grid = DensityGrid::new(6, 1.0, Vector::zeros()).unwrap();
        grid.fill(&field);
        let first: Vec<Value> = grid.values.iter().copied().collect();
        grid.fill(&field);
        let second: Vec<Value> = grid.values.iter().copied().collect();
        assert_eq!(first, second);
    }

    #[test]
    fn clamped_reads_extend_the_boundary() {
        let field = |p: Point| p.y;
        let mut grid = DensityGrid::new(4, 1.0, Vector::zeros()).unwrap();
        grid.fill(&field);

        assert_eq!(grid.get_clamped(-1, 0, 0), grid.get(0, 0, 0));
        assert_eq!(grid.get_clamped(0, 7, 2), grid.get(0, 4, 2));
        assert_eq!(grid.get_clamped(2, 2, -3), grid.get(2, 2, 0));
    }
}
