use std::collections::HashSet;

use bevy::prelude::*;
use bevy_infinite_grid::{InfiniteGridBundle, InfiniteGridPlugin, InfiniteGridSettings};
use bevy_isosurface::{IsosurfacePlugin, plugin::Volume, types::Vector};
use bevy_panorbit_camera::{PanOrbitCamera, PanOrbitCameraPlugin};

const EXTENT: f32 = 32.0;
const RADIUS: i32 = 2;

/// Streams volumes in around the camera focus; the pipeline's per-frame
/// task throttle keeps the main thread responsive while meshes generate.
fn main() {
    App::new()
        .add_plugins((
            DefaultPlugins,
            IsosurfacePlugin {
                max_tasks_per_frame: 2,
            },
            PanOrbitCameraPlugin,
            InfiniteGridPlugin,
        ))
        .add_systems(Startup, setup)
        .add_systems(Update, (stream_volumes, debug_bounds))
        .run();
}

fn setup(mut commands: Commands) {
    commands.spawn(InfiniteGridBundle {
        settings: InfiniteGridSettings {
            fadeout_distance: 1000.0,
            ..Default::default()
        },
        ..Default::default()
    });

    commands.spawn((
        Camera3d::default(),
        PanOrbitCamera {
            button_orbit: MouseButton::Right,
            button_pan: MouseButton::Middle,
            ..default()
        },
        Transform::from_xyz(50.0, 80.0, 50.0).looking_at(Vec3::ZERO, Vec3::Y),
    ));

    commands.spawn((
        DirectionalLight {
            illuminance: light_consts::lux::FULL_DAYLIGHT,
            ..Default::default()
        },
        Transform::default().with_rotation(Quat::from_rotation_x(-45.0_f32.to_radians())),
    ));
}

fn stream_volumes(
    mut commands: Commands,
    mut materials: ResMut<Assets<StandardMaterial>>,
    pan_orbit: Query<&PanOrbitCamera>,
    mut spawned: Local<HashSet<IVec2>>,
) {
    let origin = pan_orbit
        .single()
        .expect("No PanOrbitCamera found")
        .target_focus;

    let origin_tile = IVec2::new(
        (origin.x / EXTENT).floor() as i32,
        (origin.z / EXTENT).floor() as i32,
    );

    for dx in -RADIUS..=RADIUS {
        for dz in -RADIUS..=RADIUS {
            if dx * dx + dz * dz > RADIUS * RADIUS {
                continue;
            }

            let tile = origin_tile + IVec2::new(dx, dz);
            if !spawned.insert(tile) {
                continue;
            }

            let center = Vector::new(tile.x as f32 * EXTENT, 0.0, tile.y as f32 * EXTENT);

            commands.spawn((
                Volume::new(48)
                    .with_extent(EXTENT)
                    .with_center(center)
                    .with_noise_scale(0.06),
                Transform::from_xyz(
                    center.x + EXTENT / 2.0,
                    center.y + EXTENT / 2.0,
                    center.z + EXTENT / 2.0,
                ),
                MeshMaterial3d(materials.add(StandardMaterial {
                    base_color: Color::srgb(0.4, 0.6, 0.3),
                    cull_mode: None,
                    ..Default::default()
                })),
            ));
        }
    }
}

fn debug_bounds(mut gizmos: Gizmos, query: Query<(&GlobalTransform, &Volume)>) {
    for (transform, volume) in query.iter() {
        gizmos.cube(
            Transform::from_translation(transform.translation()).with_scale(Vec3::splat(volume.extent)),
            Color::WHITE,
        );
    }
}
