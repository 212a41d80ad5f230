use crate::{
    grid::DensityGrid,
    interp::{find_t, interpolate_points},
    tables::{CORNER_OFFSETS, EDGE_CORNERS, EDGE_TABLE},
    types::{Point, Value, Vector},
};

/// An isosurface crossing on one cube edge: the interpolated position (in
/// the grid's local frame) and its gradient-estimated normal.
pub type EdgeCrossing = (Point, Vector);

/// Returns the 8 corner sample indices `[x, y, z]` of the cell at `(x, y, z)`.
#[inline]
pub fn cell_corner_indices(x: usize, y: usize, z: usize) -> [[usize; 3]; 8] {
    CORNER_OFFSETS.map(|[dx, dy, dz]| [x + dx, y + dy, z + dz])
}

/// Reads the 8 corner samples of the cell at `(x, y, z)`.
#[inline]
pub fn cell_corner_values(grid: &DensityGrid, x: usize, y: usize, z: usize) -> [Value; 8] {
    cell_corner_indices(x, y, z).map(|[cx, cy, cz]| grid.get(cx, cy, cz))
}

/// Computes the marching cubes configuration mask for a cell.
///
/// Bit `i` is set when corner `i`'s value **exceeds** the isovalue:
///
/// ```text
/// corner index:  7  6  5  4  3  2  1  0
/// mask bits:    [_][_][_][_][_][_][_][_]
///                                      ^-- corner 0 above isovalue?
/// ```
///
/// 0 (all below) and 255 (all above) are the expected degenerate cases and
/// produce no triangles.
#[inline]
pub fn cell_mask(corner_values: &[Value; 8], isovalue: Value) -> u8 {
    let mut mask = 0u8;
    for (i, &v) in corner_values.iter().enumerate() {
        if v > isovalue {
            mask |= 1 << i;
        }
    }
    mask
}

/// Estimates the field gradient at grid corner `(x, y, z)` from its 3×3×3
/// sample neighborhood: the sum of `offset * sample` over all neighbor
/// offsets, with out-of-range indices clamped to the boundary.
///
/// The result points towards increasing density and is unnormalized.
pub fn corner_gradient(grid: &DensityGrid, x: usize, y: usize, z: usize) -> Vector {
    let mut gradient = Vector::zeros();
    for dx in -1isize..=1 {
        for dy in -1isize..=1 {
            for dz in -1isize..=1 {
                let sample =
                    grid.get_clamped(x as isize + dx, y as isize + dy, z as isize + dz);
                gradient += Vector::new(dx as Value, dy as Value, dz as Value) * sample;
            }
        }
    }
    gradient
}

/// Interpolates position and normal for every edge of the cell that the
/// isosurface crosses.
///
/// `EDGE_TABLE[mask]` is a 12-bit field — a set bit means that edge is
/// active. Each active edge's crossing point is the linear interpolation of
/// its two corner positions at the isovalue (midpoint when the edge is
/// flat), and its normal is the sum of the two corners' neighborhood
/// gradients, normalized.
pub fn edge_crossings(
    grid: &DensityGrid,
    x: usize,
    y: usize,
    z: usize,
    corner_values: &[Value; 8],
    mask: u8,
    isovalue: Value,
) -> [Option<EdgeCrossing>; 12] {
    let mut crossings: [Option<EdgeCrossing>; 12] = [None; 12];
    let edges_mask = EDGE_TABLE[mask as usize];
    let corner_indices = cell_corner_indices(x, y, z);

    for (e, &[c1, c2]) in EDGE_CORNERS.iter().enumerate() {
        if edges_mask & (1 << e) == 0 {
            continue;
        }

        let [x1, y1, z1] = corner_indices[c1];
        let [x2, y2, z2] = corner_indices[c2];

        let t = find_t(corner_values[c1], corner_values[c2], isovalue);
        let position = interpolate_points(
            grid.local_position(x1, y1, z1),
            grid.local_position(x2, y2, z2),
            t,
        );

        let gradient = corner_gradient(grid, x1, y1, z1) + corner_gradient(grid, x2, y2, z2);
        let length = gradient.norm();
        let normal = if length > Value::EPSILON {
            gradient / length
        } else {
            gradient
        };

        crossings[e] = Some((position, normal));
    }

    crossings
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plane_grid() -> DensityGrid {
        let field = |p: Point| p.y;
        let mut grid = DensityGrid::new(4, 1.0, Vector::zeros()).unwrap();
        grid.fill(&field);
        grid
    }

    #[test]
    fn mask_reflects_corners_above_the_isovalue() {
        let grid = plane_grid();
        let values = cell_corner_values(&grid, 0, 0, 0);
        // Corners with y = 1 sample 0.25, corners with y = 0 sample 0.0.
        assert_eq!(cell_mask(&values, 0.1), 0b0110_0110);
        assert_eq!(cell_mask(&values, -1.0), 255);
        assert_eq!(cell_mask(&values, 1.0), 0);
    }

    #[test]
    fn mask_treats_equality_as_below() {
        let values = [0.5; 8];
        assert_eq!(cell_mask(&values, 0.5), 0);
    }

    #[test]
    fn corner_indices_match_the_offset_convention() {
        let corners = cell_corner_indices(1, 2, 3);
        assert_eq!(corners[0], [1, 2, 3]);
        assert_eq!(corners[1], [1, 3, 3]);
        assert_eq!(corners[2], [2, 3, 3]);
        assert_eq!(corners[3], [2, 2, 3]);
        assert_eq!(corners[4], [1, 2, 4]);
        assert_eq!(corners[6], [2, 3, 4]);
    }

    #[test]
    fn gradient_of_a_linear_field_points_up() {
        let grid = plane_grid();
        for x in 0..=4 {
            for y in 0..=4 {
                for z in 0..=4 {
                    let g = corner_gradient(&grid, x, y, z);
                    assert!(g.y > 0.0, "corner ({x}, {y}, {z})");
                    assert_eq!(g.x, 0.0);
                    assert_eq!(g.z, 0.0);
                }
            }
        }
    }

    #[test]
    fn gradient_clamps_at_the_volume_boundary() {
        // The same accumulation on a radial field must not panic or read
        // out of range at the 8 extreme corners.
        let field = |p: Point| (p - Point::origin()).norm();
        let mut grid = DensityGrid::new(4, 1.0, Vector::new(-0.5, -0.5, -0.5)).unwrap();
        grid.fill(&field);
        for &c in &[0usize, 4] {
            let g = corner_gradient(&grid, c, c, c);
            assert!(g.iter().all(|v| v.is_finite()));
        }
    }

    #[test]
    fn crossings_appear_only_on_active_edges() {
        let grid = plane_grid();
        let (x, y, z) = (1, 1, 1);
        let values = cell_corner_values(&grid, x, y, z);
        let mask = cell_mask(&values, 0.3);
        let crossings = edge_crossings(&grid, x, y, z, &values, mask, 0.3);

        for (e, crossing) in crossings.iter().enumerate() {
            let active = EDGE_TABLE[mask as usize] & (1 << e) != 0;
            assert_eq!(crossing.is_some(), active, "edge {e}");
        }

        // value = y crosses 0.3 at y = 0.3 exactly; every crossing of this
        // cell lies on that plane and points straight up.
        for (position, normal) in crossings.iter().flatten() {
            assert!((position.y - (0.3 - 0.5)).abs() < 1e-6);
            assert!(normal.y > 0.99);
        }
    }
}
