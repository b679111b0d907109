use bevy::prelude::*;

use crate::camera::world_to_screen;
use crate::components::HeadlessMode;
use crate::levels::{Notice, Tone};

const NOTICE_SECONDS: f32 = 1.0;
const NOTICE_RISE: f32 = 50.0;
const NOTICE_FONT_SIZE: f32 = 22.0;

pub struct WorldTextPlugin;

impl Plugin for WorldTextPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(
            Update,
            (spawn_world_text_visuals, update_world_text).chain(),
        );
    }
}

/// Floating text that rises and fades out, then despawns.
#[derive(Component, Clone)]
pub struct WorldText {
    pub text: String,
    pub font_size: f32,
    pub color: [f32; 4],
    pub duration: f32,
    pub elapsed: f32,
    pub rise_speed: f32,
}

/// Marker indicating the text2d bundle has been spawned.
#[derive(Component)]
pub struct WorldTextSpawned;

fn tone_color(tone: Tone) -> [f32; 4] {
    match tone {
        Tone::Reward => [0.13, 0.62, 0.25, 1.0],
        Tone::Bonus => [0.96, 0.62, 0.04, 1.0],
        Tone::Penalty => [0.86, 0.15, 0.15, 1.0],
        Tone::Info => [0.15, 0.25, 0.55, 1.0],
    }
}

pub fn spawn_notice(commands: &mut Commands, notice: &Notice) {
    let at = world_to_screen(notice.at);
    commands.spawn((
        WorldText {
            text: notice.text.clone(),
            font_size: NOTICE_FONT_SIZE,
            color: tone_color(notice.tone),
            duration: NOTICE_SECONDS,
            elapsed: 0.0,
            rise_speed: NOTICE_RISE / NOTICE_SECONDS,
        },
        Transform::from_xyz(at.x, at.y, 20.0),
    ));
}

fn spawn_world_text_visuals(
    mut commands: Commands,
    headless: Res<HeadlessMode>,
    query: Query<(Entity, &WorldText), Without<WorldTextSpawned>>,
) {
    if headless.0 {
        return;
    }
    for (entity, wt) in query.iter() {
        let color = Color::srgba(wt.color[0], wt.color[1], wt.color[2], wt.color[3]);
        commands.entity(entity).insert((
            Text2d::new(wt.text.clone()),
            TextFont {
                font_size: wt.font_size,
                ..default()
            },
            TextColor(color),
            WorldTextSpawned,
        ));
    }
}

fn update_world_text(
    mut commands: Commands,
    time: Res<Time>,
    mut query: Query<(Entity, &mut WorldText, &mut Transform, Option<&mut TextColor>)>,
) {
    let dt = time.delta_secs();
    for (entity, mut wt, mut transform, text_color) in query.iter_mut() {
        wt.elapsed += dt;
        transform.translation.y += wt.rise_speed * dt;

        if let Some(mut tc) = text_color {
            let t = (wt.elapsed / wt.duration.max(0.001)).clamp(0.0, 1.0);
            tc.0 = Color::srgba(wt.color[0], wt.color[1], wt.color[2], wt.color[3] * (1.0 - t));
        }

        if wt.elapsed >= wt.duration {
            commands.entity(entity).despawn();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bevy::ecs::system::RunSystemOnce;
    use std::time::Duration;

    #[test]
    fn notices_rise_and_expire() {
        let mut app = App::new();
        app.insert_resource(HeadlessMode(true))
            .init_resource::<Time>()
            .add_plugins(WorldTextPlugin);

        let notice = Notice {
            text: "+20 Customer First".to_string(),
            at: Vec2::new(400.0, 300.0),
            tone: Tone::Reward,
        };
        app.world_mut()
            .run_system_once(move |mut commands: Commands| spawn_notice(&mut commands, &notice))
            .expect("spawn notice");

        app.world_mut()
            .resource_mut::<Time>()
            .advance_by(Duration::from_millis(500));
        app.update();
        let mut texts = app.world_mut().query::<(&WorldText, &Transform)>();
        let (text, transform) = texts.single(app.world());
        assert_eq!(text.text, "+20 Customer First");
        assert!(transform.translation.y > 0.0);

        app.world_mut()
            .resource_mut::<Time>()
            .advance_by(Duration::from_millis(600));
        app.update();
        let mut texts = app.world_mut().query::<&WorldText>();
        assert_eq!(texts.iter(app.world()).count(), 0);
    }
}
