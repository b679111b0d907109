use std::collections::VecDeque;

use bevy::prelude::*;
use serde::Serialize;

const MAX_EVENTS: usize = 500;

#[derive(Serialize, Clone, Debug)]
pub struct GameEvent {
    pub seq: u64,
    pub name: String,
    pub data: serde_json::Value,
    pub frame: u64,
}

/// Bounded log of gameplay events. Systems that react to events keep an
/// [`EventCursor`] instead of draining the log.
#[derive(Resource, Default)]
pub struct GameEventBus {
    pub recent: VecDeque<GameEvent>,
    pub frame: u64,
    pub dropped_events: u64,
    next_seq: u64,
    last_overflow_log_frame: u64,
}

impl GameEventBus {
    pub fn emit(&mut self, name: impl Into<String>, data: serde_json::Value) {
        self.next_seq += 1;
        self.recent.push_back(GameEvent {
            seq: self.next_seq,
            name: name.into(),
            data,
            frame: self.frame,
        });
        if self.recent.len() > MAX_EVENTS {
            let excess = self.recent.len() - MAX_EVENTS;
            for _ in 0..excess {
                self.recent.pop_front();
            }
            self.dropped_events = self.dropped_events.saturating_add(excess as u64);
            if self.frame.saturating_sub(self.last_overflow_log_frame) >= 60 {
                self.last_overflow_log_frame = self.frame;
                warn!(
                    "[Onboard events] Dropped {} buffered events (total dropped: {})",
                    excess, self.dropped_events
                );
            }
        }
    }

    /// The newest `limit` events, oldest first.
    pub fn tail(&self, limit: usize) -> Vec<GameEvent> {
        let skip = self.recent.len().saturating_sub(limit);
        self.recent.iter().skip(skip).cloned().collect()
    }
}

/// Read position of one consumer in the [`GameEventBus`].
#[derive(Default, Clone, Copy)]
pub struct EventCursor {
    last_seq: u64,
}

impl EventCursor {
    /// Events emitted since the previous call.
    pub fn unseen<'a>(&mut self, bus: &'a GameEventBus) -> Vec<&'a GameEvent> {
        let last = self.last_seq;
        let fresh: Vec<&GameEvent> = bus.recent.iter().filter(|ev| ev.seq > last).collect();
        if let Some(newest) = fresh.last() {
            self.last_seq = newest.seq;
        }
        fresh
    }
}

pub struct GameEventsPlugin;

impl Plugin for GameEventsPlugin {
    fn build(&self, app: &mut App) {
        app.insert_resource(GameEventBus::default())
            .add_systems(First, tick_event_frame);
    }
}

fn tick_event_frame(mut bus: ResMut<GameEventBus>) {
    bus.frame = bus.frame.saturating_add(1);
}
