use rayon::iter::{IntoParallelIterator, ParallelIterator};
use tracing::debug;

use crate::{
    error::{IsosurfaceError, Result},
    grid::DensityGrid,
    mesh::{MeshAccumulator, MeshBuffers},
    tables::TRI_TABLE,
    types::{Point, Value, Vector},
    utils::{cell_corner_values, cell_mask, edge_crossings},
};

/// Runs marching cubes over a filled grid and returns the triangle soup.
///
/// Work is parallelised over x-slices with Rayon. The grid and the case
/// table are read lock-free; the shared accumulator's critical region is
/// the only synchronization and is entered once per emitted triangle, so
/// empty cells cost nothing. The call blocks until every cell has been
/// processed; triangle order across cells is unspecified.
///
/// ```text
/// Per cell:
/// 1. cell_corner_values  →  8 scalar samples
/// 2. cell_mask           →  256-entry lookup key
/// 3. edge_crossings      →  up to 12 interpolated (position, normal) pairs
/// 4. TRI_TABLE[mask]     →  edge triples, pushed as whole triangles
/// ```
///
/// Any isovalue is accepted; one outside the field's value range yields a
/// valid empty mesh. A worker fault surfaces as
/// [`IsosurfaceError::TriangulationFailed`] — there is no partial-success
/// contract, at worst whole triangles are missing from an errored pass,
/// never malformed ones.
pub fn triangulate(grid: &DensityGrid, isovalue: Value) -> Result<MeshBuffers> {
    let n = grid.resolution();
    let accumulator = MeshAccumulator::with_triangle_capacity(n * n * 4);

    (0..n).into_par_iter().try_for_each(|x| {
        for y in 0..n {
            for z in 0..n {
                let corner_values = cell_corner_values(grid, x, y, z);
                let mask = cell_mask(&corner_values, isovalue);
                if mask == 0 || mask == 255 {
                    continue;
                }

                let crossings = edge_crossings(grid, x, y, z, &corner_values, mask, isovalue);

                let row = &TRI_TABLE[mask as usize];
                let mut i = 0;
                while i < row.len() && row[i] >= 0 {
                    let mut positions = [Point::origin(); 3];
                    let mut normals = [Vector::zeros(); 3];
                    for v in 0..3 {
                        let edge = row[i + v] as usize;
                        let (position, normal) =
                            crossings[edge].ok_or(IsosurfaceError::TriangulationFailed)?;
                        positions[v] = position;
                        normals[v] = normal;
                    }
                    accumulator.push_triangle(positions, normals)?;
                    i += 3;
                }
            }
        }
        Ok(())
    })?;

    let buffers = accumulator.into_buffers()?;
    debug!(
        resolution = n,
        triangles = buffers.triangle_count(),
        "triangulation pass complete"
    );
    Ok(buffers)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Normalized Euclidean distance from the grid's geometric center, for
    /// a grid with extent 1 centered at the origin offset.
    fn radial_field(p: Point) -> Value {
        (Vector::new(p.x - 0.5, p.y - 0.5, p.z - 0.5)).norm()
    }

    fn radial_grid(resolution: usize) -> DensityGrid {
        let mut grid = DensityGrid::new(resolution, 1.0, Vector::zeros()).unwrap();
        grid.fill(&|p: Point| radial_field(p));
        grid
    }

    #[test]
    fn sphere_oracle_n4() {
        // 4 cells per axis, extent 1, centered field, isovalue 0.5: a
        // sphere of radius ½ with a hand-checkable tessellation.
        let grid = radial_grid(4);
        let buffers = triangulate(&grid, 0.5).unwrap();

        assert_eq!(buffers.triangle_count(), 128);
        assert_eq!(buffers.vertices.len(), 128 * 3);
        assert_eq!(buffers.normals.len(), 128 * 3);
        assert!((buffers.surface_area() - 2.8866).abs() < 1e-3);

        // Every index triple references the three vertices appended for
        // that triangle.
        for &[a, b, c] in &buffers.indices {
            assert_eq!(a % 3, 0);
            assert_eq!(b, a + 1);
            assert_eq!(c, a + 2);
        }

        // The mesh is centered on the local origin: all vertices lie close
        // to the extracted radius.
        for v in &buffers.vertices {
            let r = Vector::from(*v).norm();
            assert!(r > 0.3 && r < 0.6, "vertex at radius {r}");
        }
    }

    #[test]
    fn retriangulation_is_idempotent() {
        let grid = radial_grid(12);
        let first = triangulate(&grid, 0.4).unwrap();
        let second = triangulate(&grid, 0.4).unwrap();

        // Emission order may differ between passes; compare
        // order-independent aggregates.
        assert_eq!(first.triangle_count(), second.triangle_count());
        assert!((first.surface_area() - second.surface_area()).abs() < 1e-3);
    }

    #[test]
    fn out_of_range_isovalue_yields_an_empty_mesh() {
        let grid = radial_grid(8);

        let below = triangulate(&grid, -10.0).unwrap();
        assert!(below.is_empty());
        assert!(below.vertices.is_empty());

        let above = triangulate(&grid, 99.0).unwrap();
        assert!(above.is_empty());
    }

    #[test]
    fn monotonic_field_normals_point_up() {
        let mut grid = DensityGrid::new(8, 1.0, Vector::zeros()).unwrap();
        grid.fill(&|p: Point| p.y);
        let buffers = triangulate(&grid, 0.4375).unwrap();

        assert!(!buffers.is_empty());
        for normal in &buffers.normals {
            assert!(normal[1] > 0.0, "normal {normal:?}");
        }
        // The crossing plane sits at y = 0.4375 in field space, -0.0625
        // locally.
        for vertex in &buffers.vertices {
            assert!((vertex[1] + 0.0625).abs() < 1e-5);
        }
    }

    #[test]
    fn flat_edges_produce_finite_midpoint_vertices() {
        // A field that is constant along y and z leaves most cube edges
        // flat (d1 == d2); the pass must come out finite everywhere.
        let mut grid = DensityGrid::new(4, 1.0, Vector::zeros()).unwrap();
        grid.fill(&|p: Point| p.x);
        let buffers = triangulate(&grid, 0.3).unwrap();

        assert!(!buffers.is_empty());
        for vertex in &buffers.vertices {
            assert!(vertex.iter().all(|c| c.is_finite()));
        }
        for normal in &buffers.normals {
            assert!(normal.iter().all(|c| c.is_finite()));
        }
    }

    #[test]
    fn triangle_count_scales_with_resolution() {
        // Finer grids refine the same sphere; counts grow, area converges
        // towards 4πr² ≈ 3.1416.
        let coarse = triangulate(&radial_grid(4), 0.5).unwrap();
        let fine = triangulate(&radial_grid(16), 0.5).unwrap();
        assert!(fine.triangle_count() > coarse.triangle_count());
        assert!(fine.surface_area() > coarse.surface_area());
        assert!(fine.surface_area() < std::f32::consts::PI + 0.1);
    }

    #[test]
    fn field_determinism_makes_passes_bitwise_equal_in_aggregate() {
        // Two independent fill + triangulate rounds from the same
        // parameters agree exactly on the aggregates.
        let build = || {
            let mut grid = DensityGrid::new(10, 2.0, Vector::new(5.0, -1.0, 3.0)).unwrap();
            grid.fill(&|p: Point| (p.x * 2.0).sin() + (p.z * 1.7).cos() - p.y);
            triangulate(&grid, 0.0).unwrap()
        };
        let a = build();
        let b = build();
        assert_eq!(a.triangle_count(), b.triangle_count());
        assert!((a.surface_area() - b.surface_area()).abs() < 1e-4);
    }
}
