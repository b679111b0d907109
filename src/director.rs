use bevy::prelude::*;
use serde::Serialize;

use crate::input::InputSnapshot;
use crate::level_state::{Flag, ItemId};
use crate::levels::{
    build_level, LevelController, LevelId, LevelOutput, LevelPhase, LevelSettings,
    NarrationRequest, Transition, UnknownLevel,
};

/// Data that outlives individual levels.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct SessionContext {
    pub player_name: Option<String>,
}

impl SessionContext {
    #[cfg(test)]
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            player_name: Some(name.into()),
        }
    }

    pub fn display_name(&self) -> &str {
        self.player_name.as_deref().unwrap_or("Player")
    }
}

/// Read-only view of the running journey, served over the control API.
#[derive(Clone, Debug, Serialize)]
pub struct SessionSnapshot {
    pub player_name: Option<String>,
    pub level: Option<LevelId>,
    pub phase: Option<LevelPhase>,
    pub score: i64,
    pub collected: Vec<ItemId>,
    pub total_items: usize,
    pub active_flags: Vec<Flag>,
    pub history: Vec<LevelId>,
    pub journey_complete: bool,
    pub hud: String,
}

/// Owns the session and exactly one running level at a time.
#[derive(Resource)]
pub struct ProgressionDirector {
    session: SessionContext,
    current: Option<Box<dyn LevelController>>,
    settings: LevelSettings,
    history: Vec<LevelId>,
    journey_complete: bool,
    generation: u64,
}

impl ProgressionDirector {
    pub fn new(settings: LevelSettings) -> Self {
        Self {
            session: SessionContext::default(),
            current: None,
            settings,
            history: Vec::new(),
            journey_complete: false,
            generation: 0,
        }
    }

    pub fn session(&self) -> &SessionContext {
        &self.session
    }

    pub fn current(&self) -> Option<&dyn LevelController> {
        self.current.as_deref()
    }

    pub fn current_level(&self) -> Option<LevelId> {
        self.current.as_ref().map(|level| level.id())
    }

    pub fn history(&self) -> &[LevelId] {
        &self.history
    }

    pub fn journey_complete(&self) -> bool {
        self.journey_complete
    }

    /// Bumped every time a level is started; visuals rebuild when it changes.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn set_player_name(&mut self, name: impl Into<String>) {
        let name = name.into();
        info!("[Onboard] Player name set to '{}'", name);
        self.session.player_name = Some(name);
    }

    /// Tear down the running level (if any) and start `id` in its place.
    /// Narration from the previous level is always stopped.
    pub fn start(&mut self, id: LevelId, out: &mut LevelOutput) {
        if let Some(mut previous) = self.current.take() {
            previous.exit();
            out.narration.push(NarrationRequest::Stop);
            info!("[Onboard] Leaving level '{}'", previous.id());
        }
        let mut level = build_level(id, self.settings);
        level.enter(&self.session, out);
        info!("[Onboard] Entered level '{}'", id);
        self.current = Some(level);
        self.history.push(id);
        self.journey_complete = false;
        self.generation += 1;
    }

    pub fn start_by_name(&mut self, name: &str, out: &mut LevelOutput) -> Result<LevelId, UnknownLevel> {
        let id: LevelId = name.parse()?;
        self.start(id, out);
        Ok(id)
    }

    /// Advance the running level one frame and apply what it asked for.
    pub fn tick(&mut self, input: &InputSnapshot, dt: f32) -> LevelOutput {
        let mut out = LevelOutput::default();
        let Some(level) = self.current.as_mut() else {
            return out;
        };
        level.tick(input, dt, &mut out);

        if let Some(name) = out.player_name.clone() {
            self.set_player_name(name);
        }
        let transition = out.transition;
        match transition {
            Some(Transition::Next(next)) => self.start(next, &mut out),
            Some(Transition::JourneyComplete) => {
                if !self.journey_complete {
                    self.journey_complete = true;
                    info!(
                        "[Onboard] Journey complete for '{}'",
                        self.session.display_name()
                    );
                }
            }
            None => {}
        }
        out
    }

    pub fn hud(&self) -> String {
        if self.journey_complete {
            return format!(
                "Onboarding complete! Welcome to the team, {}!",
                self.session.display_name()
            );
        }
        self.current
            .as_ref()
            .map(|level| level.hud(&self.session))
            .unwrap_or_default()
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        let level = self.current.as_deref();
        SessionSnapshot {
            player_name: self.session.player_name.clone(),
            level: level.map(|l| l.id()),
            phase: level.map(|l| l.phase()),
            score: level.map_or(0, |l| l.core().state.score),
            collected: level.map(|l| l.core().state.collected_items()).unwrap_or_default(),
            total_items: level.map_or(0, |l| l.core().state.total_items()),
            active_flags: level.map(|l| l.core().state.active_flags()).unwrap_or_default(),
            history: self.history.clone(),
            journey_complete: self.journey_complete,
            hud: self.hud(),
        }
    }
}
