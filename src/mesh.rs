use std::sync::Mutex;

use crate::{
    error::{IsosurfaceError, Result},
    types::{Point, Value, Vector},
};

/// Triangle-soup output of a triangulation pass.
///
/// The three buffers grow in lockstep: every triangle appends three
/// vertices, three normals, and one index triple referencing exactly those
/// vertices, so `indices.len() == vertices.len() / 3 == normals.len() / 3`
/// always holds. Vertices are never shared between triangles — memory is
/// traded for welding-free parallel writes.
#[derive(Clone, Debug, Default)]
pub struct MeshBuffers {
    /// Flat list of vertex positions: `[[x, y, z], ...]`
    pub vertices: Vec<[Value; 3]>,

    /// Per-vertex normals, same length as `vertices`.
    pub normals: Vec<[Value; 3]>,

    /// Triangle index triples into `vertices`.
    pub indices: Vec<[u32; 3]>,
}

impl MeshBuffers {
    pub fn new() -> Self {
        Self::default()
    }

    fn with_triangle_capacity(triangles: usize) -> Self {
        Self {
            vertices: Vec::with_capacity(triangles * 3),
            normals: Vec::with_capacity(triangles * 3),
            indices: Vec::with_capacity(triangles),
        }
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    /// Index buffer flattened for GPU upload.
    pub fn flat_indices(&self) -> Vec<u32> {
        self.indices.iter().flatten().copied().collect()
    }

    /// Total area of all triangles.
    ///
    /// Triangle emission order is unspecified under parallel generation, so
    /// comparisons between passes go through order-independent aggregates
    /// like this one.
    pub fn surface_area(&self) -> Value {
        self.indices
            .iter()
            .map(|&[a, b, c]| {
                let pa = Vector::from(self.vertices[a as usize]);
                let pb = Vector::from(self.vertices[b as usize]);
                let pc = Vector::from(self.vertices[c as usize]);
                (pb - pa).cross(&(pc - pa)).norm() * 0.5
            })
            .sum()
    }
}

/// Concurrency-safe sink for freshly built triangles.
///
/// All three appends and the index computation happen inside one critical
/// region, so the vertex-count snapshot a triangle's indices are derived
/// from can never interleave with another worker's append. Splitting this
/// into separate vertex and index locks would silently corrupt indices
/// under concurrent growth.
pub struct MeshAccumulator {
    buffers: Mutex<MeshBuffers>,
}

impl MeshAccumulator {
    pub fn new() -> Self {
        Self {
            buffers: Mutex::new(MeshBuffers::new()),
        }
    }

    /// Preallocates room for roughly `triangles` triangles.
    pub fn with_triangle_capacity(triangles: usize) -> Self {
        Self {
            buffers: Mutex::new(MeshBuffers::with_triangle_capacity(triangles)),
        }
    }

    /// Appends one triangle — three vertices, three normals, and the
    /// `(n-3, n-2, n-1)` index triple — as a single atomic operation.
    ///
    /// Fails with [`IsosurfaceError::TriangulationFailed`] if a previous
    /// worker panicked inside the critical region; the buffers are then
    /// unusable as a whole, but never contain a partially appended
    /// triangle.
    pub fn push_triangle(&self, positions: [Point; 3], normals: [Vector; 3]) -> Result<()> {
        let mut buffers = self
            .buffers
            .lock()
            .map_err(|_| IsosurfaceError::TriangulationFailed)?;

        for position in positions {
            buffers.vertices.push([position.x, position.y, position.z]);
        }
        for normal in normals {
            buffers.normals.push([normal.x, normal.y, normal.z]);
        }

        let n = buffers.vertices.len() as u32;
        buffers.indices.push([n - 3, n - 2, n - 1]);
        Ok(())
    }

    /// Consumes the accumulator, handing buffer ownership to the caller.
    pub fn into_buffers(self) -> Result<MeshBuffers> {
        self.buffers
            .into_inner()
            .map_err(|_| IsosurfaceError::TriangulationFailed)
    }
}

impl Default for MeshAccumulator {
    fn default() -> Self {
        Self::new()
    }
}

/// Fixed 8-vertex / 12-edge line list outlining a volume's bounds,
/// centered on the local origin like the mesh itself.
pub fn bounds_wireframe(extent: Value) -> (Vec<[Value; 3]>, Vec<[u32; 2]>) {
    let h = extent * 0.5;
    let vertices = vec![
        [-h, -h, -h],
        [h, -h, -h],
        [h, h, -h],
        [-h, h, -h],
        [-h, -h, h],
        [h, -h, h],
        [h, h, h],
        [-h, h, h],
    ];
    let edges = vec![
        // bottom quad
        [0, 1],
        [1, 2],
        [2, 3],
        [3, 0],
        // top quad
        [4, 5],
        [5, 6],
        [6, 7],
        [7, 4],
        // verticals
        [0, 4],
        [1, 5],
        [2, 6],
        [3, 7],
    ];
    (vertices, edges)
}
