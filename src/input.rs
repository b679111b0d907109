use bevy::input::keyboard::{Key, KeyboardInput};
use bevy::prelude::*;
use bevy::window::PrimaryWindow;
use std::collections::HashSet;

use crate::camera::screen_to_world;
use crate::physics::MoveIntent;

/// Abstraction layer between raw input and gameplay.
/// Both the keyboard (windowed) and the control API (headless) write to this.
#[derive(Resource, Default, Clone)]
pub struct VirtualInput {
    pub active: HashSet<String>,
    pub just_pressed: HashSet<String>,
    /// Printable characters typed this frame, in order.
    pub typed: String,
    /// Cursor position in level coordinates.
    pub pointer: Option<Vec2>,
}

impl VirtualInput {
    pub fn pressed(&self, action: &str) -> bool {
        self.active.contains(action)
    }

    pub fn just_pressed(&self, action: &str) -> bool {
        self.just_pressed.contains(action)
    }

    pub fn press(&mut self, action: &str) {
        self.active.insert(action.to_string());
        self.just_pressed.insert(action.to_string());
    }

    pub fn clear_frame(&mut self) {
        self.just_pressed.clear();
        self.typed.clear();
    }

    pub fn snapshot(&self) -> InputSnapshot {
        let axis = |action: &str| if self.pressed(action) { 1.0 } else { 0.0 };
        InputSnapshot {
            horizontal: axis("right") - axis("left"),
            jump: self.pressed("jump"),
            interact: self.just_pressed("interact"),
            confirm: self.just_pressed("confirm"),
            submit: self.just_pressed("submit"),
            erase: self.just_pressed("erase"),
            typed: self.typed.clone(),
            pointer: self.pointer,
        }
    }
}

/// Frozen input for one level tick. Edge-triggered fields are true only on
/// the frame the key went down.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct InputSnapshot {
    pub horizontal: f32,
    pub jump: bool,
    pub interact: bool,
    pub confirm: bool,
    pub submit: bool,
    pub erase: bool,
    pub typed: String,
    pub pointer: Option<Vec2>,
}

impl InputSnapshot {
    pub fn intent(&self) -> MoveIntent {
        MoveIntent {
            horizontal: self.horizontal,
            jump: self.jump,
        }
    }
}

pub struct InputPlugin;

impl Plugin for InputPlugin {
    fn build(&self, app: &mut App) {
        app.insert_resource(VirtualInput::default())
            .add_systems(
                PreUpdate,
                (
                    keyboard_to_virtual.run_if(resource_exists::<ButtonInput<KeyCode>>),
                    typed_characters.run_if(resource_exists::<ButtonInput<KeyCode>>),
                    cursor_to_pointer,
                )
                    .chain(),
            )
            .add_systems(Last, clear_virtual_input);
    }
}

const BINDINGS: &[(&str, &[KeyCode])] = &[
    ("left", &[KeyCode::KeyA, KeyCode::ArrowLeft]),
    ("right", &[KeyCode::KeyD, KeyCode::ArrowRight]),
    ("jump", &[KeyCode::Space, KeyCode::KeyW, KeyCode::ArrowUp]),
    ("interact", &[KeyCode::KeyE]),
    ("confirm", &[KeyCode::Space]),
    ("submit", &[KeyCode::Enter, KeyCode::NumpadEnter]),
    ("erase", &[KeyCode::Backspace]),
];

/// Whether `name` is one of the bound action names.
pub fn is_action(name: &str) -> bool {
    BINDINGS.iter().any(|(action, _)| *action == name)
}

/// Translate keyboard state to VirtualInput action names
fn keyboard_to_virtual(keyboard: Res<ButtonInput<KeyCode>>, mut vinput: ResMut<VirtualInput>) {
    vinput.active.clear();
    for (action, keys) in BINDINGS {
        if keyboard.any_pressed(keys.iter().copied()) {
            vinput.active.insert((*action).into());
        }
        if keyboard.any_just_pressed(keys.iter().copied()) {
            vinput.just_pressed.insert((*action).into());
        }
    }
}

fn typed_characters(mut events: EventReader<KeyboardInput>, mut vinput: ResMut<VirtualInput>) {
    for event in events.read() {
        if !event.state.is_pressed() {
            continue;
        }
        if let Key::Character(text) = &event.logical_key {
            vinput.typed.extend(text.chars().filter(|c| !c.is_control()));
        } else if event.logical_key == Key::Space {
            vinput.typed.push(' ');
        }
    }
}

fn cursor_to_pointer(
    windows: Query<&Window, With<PrimaryWindow>>,
    cameras: Query<(&Camera, &GlobalTransform)>,
    mut vinput: ResMut<VirtualInput>,
) {
    let Ok(window) = windows.get_single() else {
        return;
    };
    let Some((camera, transform)) = cameras.iter().next() else {
        return;
    };
    vinput.pointer = window
        .cursor_position()
        .and_then(|cursor| camera.viewport_to_world_2d(transform, cursor).ok())
        .map(screen_to_world);
}

pub(crate) fn clear_virtual_input(mut vinput: ResMut<VirtualInput>) {
    vinput.clear_frame();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_turns_actions_into_intent() {
        let mut vinput = VirtualInput::default();
        vinput.press("left");
        vinput.press("interact");
        vinput.typed.push_str("Jo");
        let snapshot = vinput.snapshot();
        assert_eq!(snapshot.horizontal, -1.0);
        assert!(snapshot.interact);
        assert!(!snapshot.confirm);
        assert_eq!(snapshot.typed, "Jo");

        vinput.clear_frame();
        let snapshot = vinput.snapshot();
        assert_eq!(snapshot.horizontal, -1.0);
        assert!(!snapshot.interact);
        assert!(snapshot.typed.is_empty());
    }

    #[test]
    fn space_binds_both_jump_and_confirm() {
        let space: Vec<&str> = BINDINGS
            .iter()
            .filter(|(_, keys)| keys.contains(&KeyCode::Space))
            .map(|(action, _)| *action)
            .collect();
        assert_eq!(space, vec!["jump", "confirm"]);
    }
}
