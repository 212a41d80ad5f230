use bevy::{
    asset::RenderAssetUsages,
    mesh::{Indices, PrimitiveTopology},
    pbr::wireframe::{Wireframe, WireframeConfig},
    prelude::*,
};
use bevy_isosurface::{
    grid::DensityGrid,
    march,
    mesh::bounds_wireframe,
    types::{Point, Vector},
};

/// Direct use of the core pipeline, without the plugin: build a grid,
/// fill it from a closure field, triangulate, upload by hand.
fn main() {
    App::new()
        .add_plugins((
            DefaultPlugins,
            #[cfg(not(target_arch = "wasm32"))]
            bevy::pbr::wireframe::WireframePlugin::default(),
        ))
        .insert_resource(WireframeConfig {
            global: false,
            ..Default::default()
        })
        .add_systems(Startup, setup)
        .run();
}

fn setup(
    mut commands: Commands,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
) {
    commands.spawn((
        Camera3d::default(),
        Transform::from_xyz(-14.0, 18.0, -14.0).looking_at(Vec3::ZERO, Vec3::Y),
    ));
    commands.spawn((
        DirectionalLight::default(),
        Transform::default().with_rotation(Quat::from_rotation_x(-45.0_f32.to_radians())),
    ));

    const EXTENT: f32 = 16.0;

    // Positive inside the sphere, so the isovalue threshold is simply 0.
    let field = |p: Point| 6.0 - (p - Point::new(8.0, 8.0, 8.0)).norm();

    let mut grid = DensityGrid::new(32, EXTENT, Vector::zeros()).expect("valid grid config");
    grid.fill(&field);
    let buffers = march::triangulate(&grid, 0.0).expect("triangulation failed");

    info!(
        "sphere mesh: {} triangles, area {:.2}",
        buffers.triangle_count(),
        buffers.surface_area()
    );

    let mut mesh = Mesh::new(
        PrimitiveTopology::TriangleList,
        RenderAssetUsages::RENDER_WORLD,
    );
    mesh.insert_attribute(Mesh::ATTRIBUTE_POSITION, buffers.vertices.clone());
    mesh.insert_attribute(Mesh::ATTRIBUTE_NORMAL, buffers.normals.clone());
    mesh.insert_indices(Indices::U32(buffers.flat_indices()));

    commands.spawn((
        Mesh3d(meshes.add(mesh)),
        MeshMaterial3d(materials.add(StandardMaterial {
            base_color: Color::srgb(0.8, 0.3, 0.2),
            cull_mode: None,
            ..Default::default()
        })),
        Wireframe,
    ));

    // Outline the volume bounds with the fixed 12-edge line list.
    let (box_vertices, box_edges) = bounds_wireframe(EXTENT);
    let mut outline = Mesh::new(PrimitiveTopology::LineList, RenderAssetUsages::RENDER_WORLD);
    outline.insert_attribute(Mesh::ATTRIBUTE_POSITION, box_vertices);
    outline.insert_indices(Indices::U32(
        box_edges.iter().flatten().copied().collect(),
    ));

    commands.spawn((
        Mesh3d(meshes.add(outline)),
        MeshMaterial3d(materials.add(StandardMaterial {
            base_color: Color::WHITE,
            unlit: true,
            ..Default::default()
        })),
    ));
}
