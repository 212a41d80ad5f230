use bevy::{
    asset::RenderAssetUsages,
    mesh::{Indices, PrimitiveTopology},
    prelude::*,
    tasks::{AsyncComputeTaskPool, Task, block_on, futures_lite::future},
};
use tracing::warn;

use crate::{
    error::Result,
    field::TerrainField,
    grid::DensityGrid,
    march,
    mesh::MeshBuffers,
    types::{Value, Vector},
};

/// System sets for the isosurface pipeline.
///
/// Use these to order your own systems relative to mesh generation:
///
/// ```rust,ignore
/// // Run after geometry is ready but before it's uploaded — ideal for collider generation:
/// app.add_systems(Update, build_collider.after(IsosurfaceSet::Generate)
///                                       .before(IsosurfaceSet::Upload));
/// ```
///
/// ```text
/// IsosurfaceSet::Spawn  →  [async compute]  →  IsosurfaceSet::Generate  →  [your systems]  →  IsosurfaceSet::Upload
/// ```
#[derive(SystemSet, Debug, Clone, PartialEq, Eq, Hash)]
pub enum IsosurfaceSet {
    /// Spawns an async compute task for each queued volume.
    Spawn,
    /// Polls async tasks and inserts [`GeneratedMesh`] on completion.
    Generate,
    /// Uploads [`GeneratedMesh`] data into a Bevy [`Mesh3d`] and removes [`GeneratedMesh`].
    Upload,
}

/// A procedural density volume to be meshed.
///
/// `resolution` cells per axis are sampled from a [`TerrainField`] built
/// from the noise parameters below, then triangulated at `isovalue`. The
/// resulting mesh is centered on the entity's local origin and spans
/// `extent` world units per axis; position it with its [`Transform`].
///
/// `center` offsets the density sampling in field space, so two volumes
/// with different centers cut different regions out of the same infinite
/// field.
#[derive(Component, Clone, Copy)]
#[require(Transform)]
pub struct Volume {
    /// Cells per axis. Must be at least 2.
    pub resolution: usize,
    /// World-space edge length of the cube. Must be positive.
    pub extent: Value,
    /// Field-space offset at which the volume samples the density field.
    pub center: Vector,
    /// Base frequency of the fractal noise. Must be positive.
    pub noise_scale: Value,
    /// Adds the linear height-bias term so the surface forms a terrain
    /// floor instead of free-floating blobs.
    pub height_bias: bool,
    /// Iso-surface threshold — samples above it are "inside".
    pub isovalue: Value,
}

impl Default for Volume {
    fn default() -> Self {
        Self {
            resolution: 32,
            extent: 16.0,
            center: Vector::zeros(),
            noise_scale: 1.2,
            height_bias: true,
            isovalue: 0.0,
        }
    }
}

impl Volume {
    pub fn new(resolution: usize) -> Self {
        Self {
            resolution,
            ..Default::default()
        }
    }

    /// Sets the world-space edge length.
    pub fn with_extent(mut self, extent: Value) -> Self {
        self.extent = extent;
        self
    }

    /// Sets the field-space sampling offset.
    pub fn with_center(mut self, center: Vector) -> Self {
        self.center = center;
        self
    }

    /// Sets the base noise frequency.
    pub fn with_noise_scale(mut self, noise_scale: Value) -> Self {
        self.noise_scale = noise_scale;
        self
    }

    /// Sets the iso-surface threshold.
    pub fn with_isovalue(mut self, isovalue: Value) -> Self {
        self.isovalue = isovalue;
        self
    }

    /// Disables the height-bias plane.
    pub fn without_height_bias(mut self) -> Self {
        self.height_bias = false;
        self
    }
}

/// Marker component added to [`Volume`] entities that are waiting to be processed.
///
/// Removed automatically once the volume's mesh has been generated and uploaded.
#[derive(Component)]
pub struct QueuedVolume;

/// Holds the in-flight async compute task for a [`Volume`].
///
/// Inserted by [`IsosurfaceSet::Spawn`], removed once the task completes
/// and [`GeneratedMesh`] has been inserted by [`IsosurfaceSet::Generate`].
#[derive(Component)]
pub struct ComputeTask(Task<Result<GeneratedMesh>>);

/// Finished triangle-soup buffers for a [`Volume`], awaiting upload.
///
/// Present only between [`IsosurfaceSet::Generate`] and
/// [`IsosurfaceSet::Upload`] — the window where collider or statistics
/// systems can read the raw geometry.
#[derive(Component)]
pub struct GeneratedMesh {
    pub buffers: MeshBuffers,
}

/// Runtime configuration for the isosurface pipeline.
///
/// Inserted as a resource by [`IsosurfacePlugin`]. Modify it at any time to change behaviour:
///
/// ```rust,ignore
/// app.add_plugins(IsosurfacePlugin { max_tasks_per_frame: 8, ..default() });
///
/// // Or change it at runtime:
/// fn my_system(mut config: ResMut<IsosurfaceConfig>) {
///     config.max_tasks_per_frame = 1; // throttle while the player is in combat
/// }
/// ```
#[derive(Resource)]
pub struct IsosurfaceConfig {
    /// Maximum number of async mesh tasks spawned per frame.
    ///
    /// Higher values load volumes faster but may cause frame hitches when
    /// many volumes are queued at once. Default: `4`.
    pub max_tasks_per_frame: usize,
}

impl Default for IsosurfaceConfig {
    fn default() -> Self {
        Self {
            max_tasks_per_frame: 4,
        }
    }
}

/// Bevy plugin that drives isosurface mesh generation.
///
/// When the `auto_queue` feature is enabled, any [`Volume`] added to the
/// world is automatically processed. Field sampling and triangulation run
/// on Bevy's `AsyncComputeTaskPool` so the main thread is never blocked:
///
/// ```text
/// Volume added
///   → QueuedVolume inserted         (on_volume_add)
///   → ComputeTask spawned           (IsosurfaceSet::Spawn)
///   → [fill + triangulate run]
///   → GeneratedMesh inserted        (IsosurfaceSet::Generate, once task completes)
///   → [your collider systems here]
///   → Mesh3d inserted               (IsosurfaceSet::Upload)
///   → QueuedVolume + GeneratedMesh removed
/// ```
pub struct IsosurfacePlugin {
    /// Initial value for [`IsosurfaceConfig::max_tasks_per_frame`].
    pub max_tasks_per_frame: usize,
}

impl Default for IsosurfacePlugin {
    fn default() -> Self {
        Self {
            max_tasks_per_frame: IsosurfaceConfig::default().max_tasks_per_frame,
        }
    }
}

impl Plugin for IsosurfacePlugin {
    fn build(&self, app: &mut App) {
        app.insert_resource(IsosurfaceConfig {
            max_tasks_per_frame: self.max_tasks_per_frame,
        });

        #[cfg(feature = "auto_queue")]
        app.configure_sets(
            Update,
            (
                IsosurfaceSet::Spawn,
                IsosurfaceSet::Generate,
                IsosurfaceSet::Upload,
            )
                .chain(),
        )
        .add_systems(
            Update,
            (
                on_volume_add,
                spawn_mesh_tasks.in_set(IsosurfaceSet::Spawn),
                poll_mesh_tasks.in_set(IsosurfaceSet::Generate),
                upload_mesh.in_set(IsosurfaceSet::Upload),
            ),
        );
    }
}

/// Inserts [`QueuedVolume`] on every newly added [`Volume`] that doesn't already have it.
fn on_volume_add(
    mut commands: Commands,
    query: Query<Entity, (Added<Volume>, Without<QueuedVolume>)>,
) {
    for entity in query.iter() {
        commands.entity(entity).insert(QueuedVolume);
    }
}

/// Spawns async compute tasks for [`QueuedVolume`]s, up to [`IsosurfaceConfig::max_tasks_per_frame`] per frame.
fn spawn_mesh_tasks(
    mut commands: Commands,
    config: Res<IsosurfaceConfig>,
    query: Query<(Entity, &Volume), (With<QueuedVolume>, Without<ComputeTask>, Without<Mesh3d>)>,
) {
    let task_pool = AsyncComputeTaskPool::get();

    for (entity, volume) in query.iter().take(config.max_tasks_per_frame) {
        let volume = *volume;
        let task = task_pool.spawn(async move { generate_mesh(&volume) });
        commands.entity(entity).insert(ComputeTask(task));
    }
}

/// Fills a grid from the volume's density field and triangulates it.
///
/// Both phases are synchronous and internally parallel; this runs on the
/// async compute pool so the main schedule never waits on it.
fn generate_mesh(volume: &Volume) -> Result<GeneratedMesh> {
    let mut field = TerrainField::new(volume.noise_scale)?;
    if volume.height_bias {
        field = field.with_height_bias(volume.center.y, volume.extent);
    }

    let mut grid = DensityGrid::new(volume.resolution, volume.extent, volume.center)?;
    grid.fill(&field);

    let buffers = march::triangulate(&grid, volume.isovalue)?;
    Ok(GeneratedMesh { buffers })
}

/// Polls in-flight [`ComputeTask`]s each frame and inserts [`GeneratedMesh`] on completion.
///
/// Non-blocking: tasks that haven't finished are skipped and retried next
/// frame. A failed task is logged and its volume dequeued — nothing is
/// uploaded for it.
fn poll_mesh_tasks(mut commands: Commands, mut query: Query<(Entity, &mut ComputeTask)>) {
    for (entity, mut compute_task) in query.iter_mut() {
        let Some(outcome) = block_on(future::poll_once(&mut compute_task.0)) else {
            continue;
        };
        match outcome {
            Ok(generated_mesh) => {
                commands
                    .entity(entity)
                    .insert(generated_mesh)
                    .remove::<ComputeTask>();
            }
            Err(err) => {
                warn!("isosurface generation failed: {err}");
                commands
                    .entity(entity)
                    .remove::<ComputeTask>()
                    .remove::<QueuedVolume>();
            }
        }
    }
}

/// Uploads a [`GeneratedMesh`] into a Bevy [`Mesh3d`], then removes [`GeneratedMesh`] and [`QueuedVolume`].
fn upload_mesh(
    mut commands: Commands,
    query: Query<(Entity, &GeneratedMesh), With<QueuedVolume>>,
    mut meshes: ResMut<Assets<Mesh>>,
) {
    for (entity, generated) in query.iter() {
        let mut bevy_mesh = Mesh::new(
            PrimitiveTopology::TriangleList,
            RenderAssetUsages::RENDER_WORLD,
        );

        bevy_mesh.insert_attribute(Mesh::ATTRIBUTE_POSITION, generated.buffers.vertices.clone());
        bevy_mesh.insert_attribute(Mesh::ATTRIBUTE_NORMAL, generated.buffers.normals.clone());
        bevy_mesh.insert_indices(Indices::U32(generated.buffers.flat_indices()));

        commands
            .entity(entity)
            .insert(Mesh3d(meshes.add(bevy_mesh)))
            .remove::<GeneratedMesh>()
            .remove::<QueuedVolume>();
    }
}
