use crate::types::{Point, Value};

/// Returns the interpolation factor t at which the isovalue crosses the
/// edge between samples `v0` and `v1`.
///
/// A flat edge (`v0 == v1`) has no well-defined crossing; the midpoint is
/// returned instead of letting the division produce NaN or infinity.
pub fn find_t(v0: Value, v1: Value, iso_val: Value) -> Value {
    let dv = v1 - v0;
    if dv == 0.0 {
        return 0.5;
    }
    (iso_val - v0) / dv
}

// Linear interpolation
pub fn lerp(a: Value, b: Value, t: Value) -> Value {
    a + (b - a) * t
}

/// Linearly interpolate between two points by factor t.
pub fn interpolate_points(p0: Point, p1: Point, t: Value) -> Point {
    Point::new(
        lerp(p0.x, p1.x, t),
        lerp(p0.y, p1.y, t),
        lerp(p0.z, p1.z, t),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn t_is_exact_at_the_endpoints() {
        assert_eq!(find_t(0.25, 0.75, 0.25), 0.0);
        assert_eq!(find_t(0.25, 0.75, 0.75), 1.0);
        assert_eq!(find_t(0.0, 1.0, 0.5), 0.5);
    }

    #[test]
    fn flat_edge_falls_back_to_the_midpoint() {
        assert_eq!(find_t(0.3, 0.3, 0.5), 0.5);
        assert_eq!(find_t(0.0, 0.0, 0.0), 0.5);
        assert!(find_t(0.3, 0.3, 0.5).is_finite());
    }

    #[test]
    fn point_interpolation_reproduces_the_endpoints() {
        let p0 = Point::new(1.0, 2.0, 3.0);
        let p1 = Point::new(-1.0, 0.0, 5.0);
        assert_eq!(interpolate_points(p0, p1, 0.0), p0);
        assert_eq!(interpolate_points(p0, p1, 1.0), p1);
        assert_eq!(interpolate_points(p0, p1, 0.5), Point::new(0.0, 1.0, 4.0));
    }

    #[test]
    fn scalar_lerp() {
        assert_eq!(lerp(2.0, 6.0, 0.25), 3.0);
        assert_eq!(lerp(-1.0, 1.0, 0.5), 0.0);
    }
}
