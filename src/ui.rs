use bevy::prelude::*;
use serde::Serialize;

use crate::components::HeadlessMode;
use crate::director::ProgressionDirector;
use crate::game_runtime::ProgressionSet;

/// Text the HUD should show this frame. `None` hides the slot.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct HudView {
    pub status: String,
    pub overlay: Option<String>,
    pub hint: Option<String>,
    pub popup: Option<String>,
    pub banner: Option<String>,
}

impl HudView {
    pub fn from_director(director: &ProgressionDirector) -> Self {
        let status = director.hud();
        let Some(level) = director.current() else {
            return Self {
                status,
                ..default()
            };
        };
        let core = level.core();
        Self {
            status,
            overlay: level.overlay(),
            hint: core.hint().map(str::to_string),
            popup: core.popup().map(str::to_string),
            banner: core.banner().map(str::to_string),
        }
    }

    fn slot(&self, slot: HudSlot) -> Option<&str> {
        match slot {
            HudSlot::Status => Some(self.status.as_str()).filter(|s| !s.is_empty()),
            HudSlot::Overlay => self.overlay.as_deref(),
            HudSlot::Hint => self.hint.as_deref(),
            HudSlot::Popup => self.popup.as_deref(),
            HudSlot::Banner => self.banner.as_deref(),
        }
    }
}

#[derive(Component, Clone, Copy, Debug, PartialEq, Eq)]
enum HudSlot {
    Status,
    Overlay,
    Hint,
    Popup,
    Banner,
}

#[derive(Component)]
struct HudRoot;

pub struct UiPlugin;

impl Plugin for UiPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(Startup, spawn_hud)
            .add_systems(Update, sync_hud.after(ProgressionSet));
    }
}

fn slot_node(slot: HudSlot) -> Node {
    let mut node = Node {
        position_type: PositionType::Absolute,
        ..default()
    };
    match slot {
        HudSlot::Status => {
            node.left = Val::Px(16.0);
            node.top = Val::Px(12.0);
        }
        HudSlot::Overlay => {
            node.right = Val::Px(16.0);
            node.top = Val::Px(12.0);
        }
        HudSlot::Hint => {
            node.left = Val::Px(16.0);
            node.top = Val::Px(48.0);
            node.max_width = Val::Px(520.0);
        }
        HudSlot::Popup => {
            node.left = Val::Percent(30.0);
            node.top = Val::Percent(40.0);
            node.max_width = Val::Percent(40.0);
        }
        HudSlot::Banner => {
            node.left = Val::Percent(15.0);
            node.top = Val::Percent(62.0);
            node.max_width = Val::Percent(70.0);
        }
    }
    node
}

fn spawn_hud(mut commands: Commands, headless: Res<HeadlessMode>) {
    if headless.0 {
        return;
    }
    commands
        .spawn((
            HudRoot,
            Node {
                width: Val::Percent(100.0),
                height: Val::Percent(100.0),
                position_type: PositionType::Absolute,
                ..default()
            },
            GlobalZIndex(100),
            PickingBehavior::IGNORE,
        ))
        .with_children(|root| {
            for (slot, size) in [
                (HudSlot::Status, 22.0),
                (HudSlot::Overlay, 18.0),
                (HudSlot::Hint, 16.0),
                (HudSlot::Popup, 20.0),
                (HudSlot::Banner, 24.0),
            ] {
                root.spawn((
                    slot,
                    Text::new(""),
                    TextFont {
                        font_size: size,
                        ..default()
                    },
                    TextColor(Color::srgb(0.08, 0.1, 0.18)),
                    slot_node(slot),
                    Visibility::Hidden,
                ));
            }
        });
}

/// Re-sync slot texts only when the view changed.
fn sync_hud(
    director: Res<ProgressionDirector>,
    mut last: Local<Option<HudView>>,
    mut slots: Query<(&HudSlot, &mut Text, &mut Visibility)>,
) {
    let view = HudView::from_director(&director);
    if last.as_ref() == Some(&view) {
        return;
    }
    for (slot, mut text, mut visibility) in slots.iter_mut() {
        match view.slot(*slot) {
            Some(value) => {
                text.0 = value.to_string();
                *visibility = Visibility::Inherited;
            }
            None => *visibility = Visibility::Hidden,
        }
    }
    *last = Some(view);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::levels::{LevelId, LevelOutput, LevelSettings};

    #[test]
    fn view_reflects_the_running_level() {
        let mut director = ProgressionDirector::new(LevelSettings::default());
        assert_eq!(HudView::from_director(&director), HudView::default());

        director.start(LevelId::WorkSchedule, &mut LevelOutput::default());
        let view = HudView::from_director(&director);
        assert_eq!(view.status, "Player - Score: 0");
        assert_eq!(view.overlay.as_deref(), Some("Clock: 9:00 AM"));
        assert!(view.banner.is_none());
    }

    #[test]
    fn hud_slots_follow_the_view() {
        let mut director = ProgressionDirector::new(LevelSettings::default());
        director.start(LevelId::CoreValues, &mut LevelOutput::default());

        let mut app = App::new();
        app.insert_resource(HeadlessMode(false))
            .insert_resource(director)
            .add_plugins(UiPlugin);
        app.update();

        let world = app.world_mut();
        let mut slots = world.query::<(&HudSlot, &Text, &Visibility)>();
        let status = slots
            .iter(world)
            .find(|(slot, _, _)| **slot == HudSlot::Status)
            .map(|(_, text, vis)| (text.0.clone(), *vis));
        assert_eq!(
            status,
            Some(("Player - Core Values: 0/5".to_string(), Visibility::Inherited))
        );
        let banner_hidden = slots
            .iter(world)
            .any(|(slot, _, vis)| *slot == HudSlot::Banner && *vis == Visibility::Hidden);
        assert!(banner_hidden);
    }
}
