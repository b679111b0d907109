use std::collections::HashSet;

use bevy::prelude::*;

use crate::camera::world_to_screen;
use crate::components::*;
use crate::director::ProgressionDirector;
use crate::game_runtime::ProgressionSet;
use crate::interaction::{Interactable, InteractableKind};
use crate::levels::{card_center, LevelId, CARD_SIZE, SECTION_TITLES};

const PLATFORM_COLOR: Color = Color::srgb(0.35, 0.42, 0.55);
const PLAYER_COLOR: Color = Color::srgb(0.12, 0.45, 0.9);
const LABEL_COLOR: Color = Color::srgb(0.1, 0.12, 0.2);
const CARD_COLOR: Color = Color::srgb(0.82, 0.88, 0.97);
const PLAYER_SIZE: f32 = 32.0;

pub struct RenderPlugin;

impl Plugin for RenderPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(
            Update,
            (rebuild_level_visuals, sync_interactables, sync_player)
                .chain()
                .after(ProgressionSet),
        );
    }
}

fn interactable_look(item: &Interactable) -> (Color, Vec2) {
    match &item.kind {
        InteractableKind::Collectible {
            unlocks: Some(_), ..
        } => (Color::srgb(0.55, 0.3, 0.85), Vec2::splat(24.0)),
        InteractableKind::Collectible { .. } => (Color::srgb(0.96, 0.75, 0.1), Vec2::splat(28.0)),
        InteractableKind::Hazard { .. } => (Color::srgb(0.85, 0.2, 0.2), Vec2::splat(30.0)),
        InteractableKind::Portal { .. } => (Color::srgb(0.2, 0.75, 0.45), Vec2::new(36.0, 48.0)),
        InteractableKind::Prompt { .. } => (Color::srgb(0.6, 0.62, 0.7), Vec2::new(64.0, 40.0)),
    }
}

fn label(text: &str, size: f32, offset: Vec2) -> impl Bundle {
    (
        Text2d::new(text.to_string()),
        TextFont {
            font_size: size,
            ..default()
        },
        TextColor(LABEL_COLOR),
        Transform::from_xyz(offset.x, offset.y, 1.0),
    )
}

fn spawn_interactable(commands: &mut Commands, item: &Interactable) {
    let (color, size) = interactable_look(item);
    let at = world_to_screen(item.position);
    commands
        .spawn((
            LevelVisual,
            InteractableVisual(item.id.0),
            Sprite::from_color(color, size),
            Transform::from_xyz(at.x, at.y, 5.0),
        ))
        .with_children(|parent| {
            parent.spawn(label(item.label, 14.0, Vec2::new(0.0, -size.y / 2.0 - 10.0)));
            if let Some(prompt) = item.prompt_text() {
                parent.spawn((
                    label(prompt, 14.0, Vec2::new(0.0, size.y / 2.0 + 12.0)),
                    PromptLabel(item.id.0),
                    Visibility::Hidden,
                ));
            }
        });
}

fn spawn_section_cards(commands: &mut Commands) {
    for (section, title) in (1u8..).zip(SECTION_TITLES) {
        let at = world_to_screen(card_center(section));
        commands
            .spawn((
                LevelVisual,
                Sprite::from_color(CARD_COLOR, CARD_SIZE),
                Transform::from_xyz(at.x, at.y, 1.0),
            ))
            .with_children(|parent| {
                parent.spawn(label(title, 16.0, Vec2::ZERO));
            });
    }
}

/// Full rebuild whenever the director starts a new level.
fn rebuild_level_visuals(
    mut commands: Commands,
    headless: Res<HeadlessMode>,
    director: Res<ProgressionDirector>,
    mut last_generation: Local<u64>,
    existing: Query<Entity, With<LevelVisual>>,
) {
    if headless.0 || director.generation() == *last_generation {
        return;
    }
    *last_generation = director.generation();

    for entity in existing.iter() {
        commands.entity(entity).despawn_recursive();
    }
    let Some(level) = director.current() else {
        return;
    };

    for platform in level.core().platforms() {
        let at = world_to_screen(platform.center);
        commands.spawn((
            LevelVisual,
            Sprite::from_color(PLATFORM_COLOR, platform.size),
            Transform::from_xyz(at.x, at.y, 0.0),
        ));
    }
    for item in &level.core().live {
        spawn_interactable(&mut commands, item);
    }
    if level.id() == LevelId::Sections {
        spawn_section_cards(&mut commands);
    }
    if level.shows_player() {
        let at = world_to_screen(level.core().state.player.position);
        commands.spawn((
            LevelVisual,
            Player,
            Sprite::from_color(PLAYER_COLOR, Vec2::splat(PLAYER_SIZE)),
            Transform::from_xyz(at.x, at.y, 10.0),
        ));
    }
}

/// Drop visuals of consumed interactables and toggle their prompts.
fn sync_interactables(
    mut commands: Commands,
    director: Res<ProgressionDirector>,
    visuals: Query<(Entity, &InteractableVisual)>,
    mut prompts: Query<(&PromptLabel, &mut Visibility)>,
) {
    let Some(level) = director.current() else {
        return;
    };
    let live = &level.core().live;
    let ids: HashSet<u32> = live.iter().map(|item| item.id.0).collect();
    for (entity, visual) in visuals.iter() {
        if !ids.contains(&visual.0) {
            commands.entity(entity).despawn_recursive();
        }
    }
    for (prompt, mut visibility) in prompts.iter_mut() {
        let shown = live
            .iter()
            .any(|item| item.id.0 == prompt.0 && item.prompt_visible());
        visibility.set_if_neq(if shown {
            Visibility::Inherited
        } else {
            Visibility::Hidden
        });
    }
}

fn sync_player(
    director: Res<ProgressionDirector>,
    mut query: Query<&mut Transform, With<Player>>,
) {
    let Some(level) = director.current() else {
        return;
    };
    let at = world_to_screen(level.core().state.player.position);
    for mut transform in query.iter_mut() {
        transform.translation.x = at.x;
        transform.translation.y = at.y;
    }
}
