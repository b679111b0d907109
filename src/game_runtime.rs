use bevy::prelude::*;
use serde_json::json;

use crate::config::GameConfig;
use crate::director::ProgressionDirector;
use crate::events::GameEventBus;
use crate::input::VirtualInput;
use crate::interaction::Interaction;
use crate::levels::{LevelId, LevelOutput, Milestone, Notice, Transition};
use crate::narration::NarrationQueue;
use crate::world_text::spawn_notice;

const HAZARD_SHAKE_INTENSITY: f64 = 6.0;
const HAZARD_SHAKE_SECONDS: f64 = 0.2;

/// Systems that advance the running level. Presentation runs after it.
#[derive(SystemSet, Debug, Clone, PartialEq, Eq, Hash)]
pub struct ProgressionSet;

/// Runs the onboarding journey: owns the [`ProgressionDirector`] and turns
/// what levels report into bus events, narration and floating text.
pub struct ProgressionPlugin;

impl Plugin for ProgressionPlugin {
    fn build(&self, app: &mut App) {
        let config = app
            .world()
            .get_resource::<GameConfig>()
            .cloned()
            .unwrap_or_default();
        app.insert_resource(ProgressionDirector::new(config.level_settings()))
            .init_resource::<NarrationQueue>()
            .add_systems(Startup, start_first_level)
            .add_systems(Update, run_current_level.in_set(ProgressionSet));
    }
}

fn start_first_level(
    mut commands: Commands,
    config: Option<Res<GameConfig>>,
    mut director: ResMut<ProgressionDirector>,
    mut bus: ResMut<GameEventBus>,
    mut narration: ResMut<NarrationQueue>,
) {
    let first = config
        .map(|c| c.start_level)
        .unwrap_or(LevelId::Welcome);
    let mut out = LevelOutput::default();
    director.start(first, &mut out);
    for notice in publish(out, &mut bus, &mut narration) {
        spawn_notice(&mut commands, &notice);
    }
}

fn run_current_level(
    mut commands: Commands,
    time: Res<Time>,
    input: Res<VirtualInput>,
    mut director: ResMut<ProgressionDirector>,
    mut bus: ResMut<GameEventBus>,
    mut narration: ResMut<NarrationQueue>,
) {
    let out = director.tick(&input.snapshot(), time.delta_secs());
    for notice in publish(out, &mut bus, &mut narration) {
        spawn_notice(&mut commands, &notice);
    }
}

/// Forward one [`LevelOutput`] to the rest of the game. Returns the notices
/// still to be shown.
pub fn publish(
    out: LevelOutput,
    bus: &mut GameEventBus,
    narration: &mut NarrationQueue,
) -> Vec<Notice> {
    for interaction in &out.interactions {
        match interaction {
            Interaction::Collected {
                item,
                label,
                points,
                unlocked,
                ..
            } => bus.emit(
                "item_collected",
                json!({ "item": item, "label": label, "points": points, "unlocked": unlocked }),
            ),
            Interaction::HazardHit { id, penalty } => {
                bus.emit("hazard_hit", json!({ "id": id, "penalty": penalty }));
                bus.emit(
                    "camera_shake",
                    json!({ "intensity": HAZARD_SHAKE_INTENSITY, "duration": HAZARD_SHAKE_SECONDS }),
                );
            }
            Interaction::HazardBlocked { id, shield, bonus } => bus.emit(
                "hazard_blocked",
                json!({ "id": id, "shield": shield, "bonus": bonus }),
            ),
            Interaction::PortalActivated { id, mode, .. } => {
                bus.emit("portal_activated", json!({ "id": id, "mode": mode }))
            }
            Interaction::PromptShown(_) | Interaction::PromptHidden(_) => {}
        }
    }

    for milestone in &out.milestones {
        match milestone {
            Milestone::Started(level) => bus.emit("level_started", json!({ "level": level })),
            Milestone::Completed(level) => bus.emit("level_completed", json!({ "level": level })),
            Milestone::ClockAdvanced { time, points } => {
                bus.emit("clock_advanced", json!({ "time": time, "points": points }))
            }
            Milestone::FlagExpired(flag) => bus.emit("flag_expired", json!({ "flag": flag })),
            Milestone::SectionHovered(section) => {
                bus.emit("section_hovered", json!({ "section": section }))
            }
        }
    }

    if out.transition == Some(Transition::JourneyComplete) {
        bus.emit("journey_complete", json!({}));
    }
    if let Some(name) = &out.player_name {
        bus.emit("player_named", json!({ "name": name }));
    }

    narration.0.extend(out.narration);
    out.notices
}
