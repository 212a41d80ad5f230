use bevy::prelude::*;
use bevy_infinite_grid::{InfiniteGridBundle, InfiniteGridPlugin, InfiniteGridSettings};
use bevy_isosurface::{IsosurfacePlugin, plugin::Volume, types::Vector};
use bevy_panorbit_camera::{PanOrbitCamera, PanOrbitCameraPlugin};

/// Plugin-driven generation: press Space to queue a grid of noise volumes,
/// meshed asynchronously by the pipeline.
fn main() {
    App::new()
        .add_plugins((
            DefaultPlugins,
            IsosurfacePlugin::default(),
            PanOrbitCameraPlugin,
            InfiniteGridPlugin,
        ))
        .add_systems(Startup, setup)
        .add_systems(Update, spawn_volumes)
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
        Transform::from_xyz(30.0, 60.0, 30.0).looking_at(Vec3::ZERO, Vec3::Y),
    ));

    commands.spawn((
        DirectionalLight {
            illuminance: light_consts::lux::FULL_DAYLIGHT,
            ..Default::default()
        },
        Transform::default().with_rotation(Quat::from_rotation_x(-45.0_f32.to_radians())),
    ));
}

fn spawn_volumes(
    mut commands: Commands,
    mut materials: ResMut<Assets<StandardMaterial>>,
    keyboard: Res<ButtonInput<KeyCode>>,
) {
    if keyboard.just_pressed(KeyCode::Space) {
        const EXTENT: f32 = 16.0;
        const TILES: i32 = 4;

        for x in -TILES..TILES {
            for z in -TILES..TILES {
                let center = Vector::new(x as f32 * EXTENT, 0.0, z as f32 * EXTENT);

                commands.spawn((
                    Volume::new(32)
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
}
