use derive_more::Display;

use crate::types::Value;

pub type Result<T> = core::result::Result<T, IsosurfaceError>;

#[derive(Debug, Display)]
#[display("{self:?}")]
pub enum IsosurfaceError {
    /// Grid resolution below the 2-cells-per-axis minimum.
    InvalidResolution { resolution: usize },
    /// Non-positive or non-finite world-space extent.
    InvalidExtent { extent: Value },
    /// Non-positive or non-finite noise scale.
    InvalidNoiseScale { noise_scale: Value },
    /// A worker fault left the triangulation pass unusable; discard and retry.
    TriangulationFailed,
}

impl std::error::Error for IsosurfaceError {}
