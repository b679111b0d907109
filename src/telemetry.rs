use std::collections::BTreeMap;

use bevy::prelude::*;
use serde::Serialize;

use crate::events::{EventCursor, GameEventBus};
use crate::input::VirtualInput;
use crate::narration::{NarrationRuntime, NarrationStats};

/// Running counters for the current session, served at `/telemetry`.
#[derive(Resource, Clone, Default, Serialize)]
pub struct SessionTelemetry {
    pub total_frames: u64,
    pub items_collected: u64,
    pub points_earned: i64,
    pub hazards_hit: u64,
    pub hazards_blocked: u64,
    pub portals_activated: u64,
    pub levels_started: u64,
    pub levels_completed: u64,
    pub input_counts: BTreeMap<String, u64>,
    pub narration: NarrationStats,
}

#[derive(Resource, Default)]
struct TelemetryCursor(EventCursor);

pub struct TelemetryPlugin;

impl Plugin for TelemetryPlugin {
    fn build(&self, app: &mut App) {
        app.insert_resource(SessionTelemetry::default())
            .insert_resource(TelemetryCursor::default())
            .add_systems(Last, update_telemetry.before(crate::input::clear_virtual_input));
    }
}

fn update_telemetry(
    mut telemetry: ResMut<SessionTelemetry>,
    mut cursor: ResMut<TelemetryCursor>,
    bus: Res<GameEventBus>,
    input: Res<VirtualInput>,
    narration: Option<Res<NarrationRuntime>>,
) {
    telemetry.total_frames += 1;

    for action in &input.just_pressed {
        *telemetry.input_counts.entry(action.clone()).or_insert(0) += 1;
    }

    for event in cursor.0.unseen(&bus) {
        match event.name.as_str() {
            "item_collected" => {
                telemetry.items_collected += 1;
                telemetry.points_earned += event
                    .data
                    .get("points")
                    .and_then(|v| v.as_i64())
                    .unwrap_or(0);
            }
            "hazard_hit" => {
                telemetry.hazards_hit += 1;
                telemetry.points_earned -= event
                    .data
                    .get("penalty")
                    .and_then(|v| v.as_i64())
                    .unwrap_or(0);
            }
            "hazard_blocked" => {
                telemetry.hazards_blocked += 1;
                telemetry.points_earned += event
                    .data
                    .get("bonus")
                    .and_then(|v| v.as_i64())
                    .unwrap_or(0);
            }
            "clock_advanced" => {
                telemetry.points_earned += event
                    .data
                    .get("points")
                    .and_then(|v| v.as_i64())
                    .unwrap_or(0);
            }
            "portal_activated" => telemetry.portals_activated += 1,
            "level_started" => telemetry.levels_started += 1,
            "level_completed" => telemetry.levels_completed += 1,
            _ => {}
        }
    }

    if let Some(narration) = narration {
        telemetry.narration = narration.counters.snapshot();
    }
}
