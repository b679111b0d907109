//! HTTP control surface. Handlers never touch the world directly: every
//! request becomes an [`ApiCommand`] that the Bevy schedule answers on its
//! next frame.

mod commands;
mod router;
mod routes;
mod security;
mod state;
pub mod types;

use axum::{
    extract::{Query, Request, State},
    http::StatusCode,
    middleware::{self, Next},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use bevy::prelude::*;
use crossbeam_channel::{Receiver, Sender};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use crate::audio::AudioCoordinator;
use crate::config::{ApiSettings, GameConfig};
use crate::director::{ProgressionDirector, SessionSnapshot};
use crate::events::{GameEvent, GameEventBus};
use crate::game_runtime::{publish, ProgressionSet};
use crate::input::{is_action, VirtualInput};
use crate::levels::{LevelId, LevelOutput};
use crate::narration::NarrationQueue;
use crate::telemetry::SessionTelemetry;
use crate::ui::HudView;
use crate::world_text::spawn_notice;
use commands::*;
use router::build_router;
use routes::*;
use security::*;
use state::*;
use types::*;

pub struct ApiPlugin;

impl Plugin for ApiPlugin {
    fn build(&self, app: &mut App) {
        let settings = app
            .world()
            .get_resource::<GameConfig>()
            .map(|c| c.api.clone())
            .unwrap_or_else(|| GameConfig::default().api);
        if !settings.enabled {
            info!("[Onboard API] Disabled by configuration");
            return;
        }

        let (tx, rx) = crossbeam_channel::unbounded::<ApiCommand>();
        add_command_systems(app, rx);

        let router = build_router(AppState { sender: tx }, ApiSecurity::from_settings(&settings));
        let addr = settings.addr;
        let spawned = std::thread::Builder::new()
            .name("onboard-api".to_string())
            .spawn(move || {
                let rt = match tokio::runtime::Runtime::new() {
                    Ok(rt) => rt,
                    Err(e) => {
                        eprintln!("[Onboard API] Failed to start runtime: {}", e);
                        return;
                    }
                };
                rt.block_on(async move {
                    let listener = match tokio::net::TcpListener::bind(addr).await {
                        Ok(listener) => listener,
                        Err(e) => {
                            eprintln!("[Onboard API] Failed to bind {}: {}", addr, e);
                            return;
                        }
                    };
                    println!("[Onboard API] Listening on http://{}", addr);
                    if let Err(e) = axum::serve(listener, router).await {
                        eprintln!("[Onboard API] Server stopped: {}", e);
                    }
                });
            });
        if let Err(e) = spawned {
            error!("[Onboard API] Failed to spawn server thread: {}", e);
        }
    }
}

/// Commands are answered before the level ticks, so input sent through the
/// API is seen on the same frame it arrives.
fn add_command_systems(app: &mut App, receiver: Receiver<ApiCommand>) {
    app.insert_resource(ApiChannels { receiver })
        .add_systems(Update, process_api_commands.before(ProgressionSet));
}

fn apply_input_request(req: InputRequest, input: &mut VirtualInput) -> Result<(), String> {
    let unknown: Vec<&str> = req
        .press
        .iter()
        .chain(&req.hold)
        .chain(&req.release)
        .map(String::as_str)
        .filter(|action| !is_action(action))
        .collect();
    if !unknown.is_empty() {
        return Err(format!("Unknown action(s): {}", unknown.join(", ")));
    }
    for action in &req.hold {
        input.active.insert(action.clone());
    }
    for action in &req.release {
        input.active.remove(action);
    }
    input.just_pressed.extend(req.press);
    if let Some(text) = req.text {
        input.typed.push_str(&text);
    }
    if let Some([x, y]) = req.pointer {
        input.pointer = Some(Vec2::new(x, y));
    }
    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn process_api_commands(
    mut commands: Commands,
    channels: Res<ApiChannels>,
    mut director: ResMut<ProgressionDirector>,
    mut bus: ResMut<GameEventBus>,
    mut narration: ResMut<NarrationQueue>,
    mut input: ResMut<VirtualInput>,
    telemetry: Option<Res<SessionTelemetry>>,
    coordinator: Option<Res<AudioCoordinator>>,
) {
    while let Ok(command) = channels.receiver.try_recv() {
        match command {
            ApiCommand::GetSession(tx) => {
                let _ = tx.send(director.snapshot());
            }
            ApiCommand::GetHud(tx) => {
                let _ = tx.send(HudView::from_director(&director));
            }
            ApiCommand::GetTelemetry(tx) => {
                let snapshot = telemetry.as_deref().cloned().unwrap_or_default();
                let _ = tx.send(snapshot);
            }
            ApiCommand::GetEvents(limit, tx) => {
                let _ = tx.send(bus.tail(limit));
            }
            ApiCommand::GetNarration(tx) => {
                let state = coordinator.as_deref().map_or(
                    NarrationState {
                        playing: false,
                        pending: false,
                        source: None,
                    },
                    |c| NarrationState {
                        playing: c.is_playing(),
                        pending: c.is_pending(),
                        source: c.current_source(),
                    },
                );
                let _ = tx.send(state);
            }
            ApiCommand::StartLevel(name, tx) => {
                let mut out = LevelOutput::default();
                let result = director
                    .start_by_name(&name, &mut out)
                    .map_err(|e| e.to_string());
                if result.is_ok() {
                    for notice in publish(out, &mut bus, &mut narration) {
                        spawn_notice(&mut commands, &notice);
                    }
                }
                let _ = tx.send(result);
            }
            ApiCommand::StopNarration(tx) => {
                let stopped = coordinator.as_deref().is_some_and(|c| c.stop_current());
                let _ = tx.send(stopped);
            }
            ApiCommand::ApplyInput(req, tx) => {
                let _ = tx.send(apply_input_request(req, &mut input));
            }
        }
    }
}
