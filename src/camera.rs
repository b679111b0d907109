use bevy::prelude::*;

use crate::components::HeadlessMode;
use crate::events::{EventCursor, GameEventBus};
use crate::physics::WorldBounds;

const VIEW: WorldBounds = WorldBounds {
    width: 800.0,
    height: 600.0,
};

/// Level coordinates (origin top-left, y down) to camera space.
pub fn world_to_screen(world: Vec2) -> Vec2 {
    Vec2::new(world.x - VIEW.width / 2.0, VIEW.height / 2.0 - world.y)
}

/// Camera space back to level coordinates.
pub fn screen_to_world(screen: Vec2) -> Vec2 {
    Vec2::new(screen.x + VIEW.width / 2.0, VIEW.height / 2.0 - screen.y)
}

#[derive(Resource, Clone)]
pub struct CameraShakeState {
    pub intensity: f32,
    pub remaining: f32,
    pub duration: f32,
    pub decay: f32,
}

impl Default for CameraShakeState {
    fn default() -> Self {
        Self {
            intensity: 0.0,
            remaining: 0.0,
            duration: 0.0,
            decay: 1.0,
        }
    }
}

#[derive(Resource, Default)]
struct CameraEventCursor(EventCursor);

#[derive(Component)]
pub struct MainCamera;

pub struct CameraPlugin;

impl Plugin for CameraPlugin {
    fn build(&self, app: &mut App) {
        app.insert_resource(CameraShakeState::default())
            .insert_resource(CameraEventCursor::default())
            .add_systems(Startup, spawn_camera)
            .add_systems(Update, (apply_camera_events, camera_shake).chain());
    }
}

fn apply_camera_events(
    bus: Res<GameEventBus>,
    mut shake: ResMut<CameraShakeState>,
    mut cursor: ResMut<CameraEventCursor>,
) {
    for ev in cursor.0.unseen(&bus) {
        if ev.name != "camera_shake" {
            continue;
        }
        if let Some(intensity) = ev.data.get("intensity").and_then(|v| v.as_f64()) {
            shake.intensity = (intensity as f32).max(0.0);
        }
        if let Some(duration) = ev.data.get("duration").and_then(|v| v.as_f64()) {
            let duration = (duration as f32).max(0.0);
            shake.duration = duration;
            shake.remaining = duration;
        }
        if let Some(decay) = ev.data.get("decay").and_then(|v| v.as_f64()) {
            shake.decay = (decay as f32).max(0.01);
        }
    }
}

fn spawn_camera(mut commands: Commands, headless: Res<HeadlessMode>) {
    if headless.0 {
        return;
    }
    commands.spawn((MainCamera, Camera2d, Transform::from_xyz(0.0, 0.0, 100.0)));
}

fn camera_shake(
    time: Res<Time>,
    mut shake: ResMut<CameraShakeState>,
    mut camera_query: Query<&mut Transform, With<MainCamera>>,
) {
    let mut offset = Vec2::ZERO;
    if shake.remaining > 0.0 && shake.intensity > 0.0 {
        shake.remaining = (shake.remaining - time.delta_secs()).max(0.0);
        let t = time.elapsed_secs();
        let life = if shake.duration > 0.0 {
            (shake.remaining / shake.duration).clamp(0.0, 1.0)
        } else {
            0.0
        };
        let strength = shake.intensity * life.powf(shake.decay.max(0.01));
        offset.x = (t * 31.0).sin() * strength;
        offset.y = (t * 43.0).cos() * strength;
    }

    let Ok(mut cam_transform) = camera_query.get_single_mut() else {
        return;
    };
    cam_transform.translation.x = offset.x;
    cam_transform.translation.y = offset.y;
}
