use bevy::prelude::*;

/// Set when running without a window: nothing is drawn and audio clips are
/// treated as finishing immediately.
#[derive(Resource, Default, Clone, Copy)]
pub struct HeadlessMode(pub bool);

/// Marks the runner the player controls
#[derive(Component)]
pub struct Player;

/// Everything spawned for the current level; despawned on level change.
#[derive(Component)]
pub struct LevelVisual;

/// Visual for one live interactable, keyed by its id within the level.
#[derive(Component, Clone, Copy)]
pub struct InteractableVisual(pub u32);

/// Floating "Press E" style label above an interactable.
#[derive(Component, Clone, Copy)]
pub struct PromptLabel(pub u32);
