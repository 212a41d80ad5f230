use nalgebra::{Point3, Vector3};

/// Scalar field value at a point in space.
pub type Value = f32;

/// A 3D point with [`Value`] components.
pub type Point = Point3<Value>;

/// A 3D vector with [`Value`] components.
pub type Vector = Vector3<Value>;

/// A density field: maps a world-space [`Point`] to a [`Value`].
///
/// Implementations must be pure — the same position yields the same value
/// regardless of calling thread or order, which is what allows the grid fill
/// to run unsynchronized across workers.
///
/// Values **above** the isovalue are considered "inside" the surface.
pub trait DensityField: Sync {
    fn sample(&self, position: Point) -> Value;
}

impl<F> DensityField for F
where
    F: Fn(Point) -> Value + Sync,
{
    fn sample(&self, position: Point) -> Value {
        self(position)
    }
}
