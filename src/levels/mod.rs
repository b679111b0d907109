mod benefits;
mod core_values;
mod sections;
mod security;
mod welcome;
mod work_schedule;

use std::fmt;
use std::str::FromStr;

use bevy::math::Vec2;
use serde::Serialize;
use thiserror::Error;

use crate::director::SessionContext;
use crate::input::InputSnapshot;
use crate::interaction::{self, Interactable, Interaction};
use crate::level_state::{Flag, LevelState};
use crate::physics::{self, MovementConfig, Platform, WorldBounds};
use crate::timers::{TimerEvent, TimerHandle};

pub use benefits::BenefitsLevel;
pub use core_values::CoreValuesLevel;
pub use sections::{card_center, SectionsLevel, CARD_SIZE, SECTION_TITLES};
pub use security::SecurityLevel;
pub use welcome::WelcomeLevel;
pub use work_schedule::WorkScheduleLevel;

const HINT_SECONDS: f32 = 5.0;
const POPUP_SECONDS: f32 = 2.0;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LevelId {
    Welcome,
    CoreValues,
    WorkSchedule,
    Benefits,
    Security,
    Sections,
}

impl LevelId {
    pub const ALL: [LevelId; 6] = [
        LevelId::Welcome,
        LevelId::CoreValues,
        LevelId::WorkSchedule,
        LevelId::Benefits,
        LevelId::Security,
        LevelId::Sections,
    ];

    pub fn key(self) -> &'static str {
        match self {
            LevelId::Welcome => "welcome",
            LevelId::CoreValues => "core_values",
            LevelId::WorkSchedule => "work_schedule",
            LevelId::Benefits => "benefits",
            LevelId::Security => "security",
            LevelId::Sections => "sections",
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            LevelId::Welcome => "Welcome",
            LevelId::CoreValues => "Core Values",
            LevelId::WorkSchedule => "Work Schedule",
            LevelId::Benefits => "Benefits & Pay",
            LevelId::Security => "Security & Safety",
            LevelId::Sections => "Onboarding Sections",
        }
    }

    /// The level that follows this one in the onboarding journey.
    pub fn next(self) -> Option<LevelId> {
        match self {
            LevelId::Welcome => Some(LevelId::CoreValues),
            LevelId::CoreValues => Some(LevelId::WorkSchedule),
            LevelId::WorkSchedule => Some(LevelId::Benefits),
            LevelId::Benefits => Some(LevelId::Security),
            LevelId::Security => None,
            LevelId::Sections => Some(LevelId::Welcome),
        }
    }
}

impl fmt::Display for LevelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown level '{0}'")]
pub struct UnknownLevel(pub String);

impl FromStr for LevelId {
    type Err = UnknownLevel;

    /// Accepts `core_values`, `CoreValues`, `core-values` or `CoreValuesScene`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .trim()
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .collect::<String>()
            .to_ascii_lowercase();
        let normalized = normalized.strip_suffix("scene").unwrap_or(&normalized);
        match normalized {
            "welcome" => Ok(LevelId::Welcome),
            "corevalues" => Ok(LevelId::CoreValues),
            "workschedule" => Ok(LevelId::WorkSchedule),
            "benefits" | "benefitscollection" => Ok(LevelId::Benefits),
            "security" => Ok(LevelId::Security),
            "sections" | "onboardingsections" => Ok(LevelId::Sections),
            _ => Err(UnknownLevel(s.to_string())),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LevelPhase {
    Loading,
    Active,
    Completing,
    Finished,
}

/// A narration clip a level wants to hear.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NarrationCue {
    /// The coach's default greeting.
    Intro,
    /// Coach commentary for one onboarding section (1-based).
    Section(u8),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NarrationRequest {
    Play(NarrationCue),
    Stop,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Transition {
    Next(LevelId),
    JourneyComplete,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Tone {
    Reward,
    Bonus,
    Penalty,
    Info,
}

/// Transient floating text anchored in world space.
#[derive(Clone, Debug, PartialEq)]
pub struct Notice {
    pub text: String,
    pub at: Vec2,
    pub tone: Tone,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Milestone {
    Started(LevelId),
    Completed(LevelId),
    /// The office clock moved to `time`, awarding `points` for the zone.
    ClockAdvanced { time: String, points: i64 },
    FlagExpired(Flag),
    SectionHovered(u8),
}

/// Everything a level asks of the world during one call. The level never
/// touches the renderer, audio or the director directly.
#[derive(Default, Debug)]
pub struct LevelOutput {
    pub notices: Vec<Notice>,
    pub interactions: Vec<Interaction>,
    pub milestones: Vec<Milestone>,
    pub narration: Vec<NarrationRequest>,
    pub player_name: Option<String>,
    pub transition: Option<Transition>,
}

impl LevelOutput {
    fn notice(&mut self, text: impl Into<String>, at: Vec2, tone: Tone) {
        self.notices.push(Notice {
            text: text.into(),
            at,
            tone,
        });
    }
}

/// Tuning every level is built with.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct LevelSettings {
    pub movement: MovementConfig,
    pub bounds: WorldBounds,
}

/// Lifecycle, movement and interaction plumbing shared by all levels.
pub struct LevelCore {
    id: LevelId,
    phase: LevelPhase,
    pub state: LevelState,
    pub live: Vec<Interactable>,
    platforms: &'static [Platform],
    settings: LevelSettings,
    hint: Option<String>,
    popup: Option<(String, TimerHandle)>,
    banner: Option<String>,
}

impl LevelCore {
    pub fn new(
        id: LevelId,
        spawn: Vec2,
        total_items: usize,
        platforms: &'static [Platform],
        settings: LevelSettings,
    ) -> Self {
        Self {
            id,
            phase: LevelPhase::Loading,
            state: LevelState::new(spawn, total_items),
            live: Vec::new(),
            platforms,
            settings,
            hint: None,
            popup: None,
            banner: None,
        }
    }

    pub fn id(&self) -> LevelId {
        self.id
    }

    pub fn phase(&self) -> LevelPhase {
        self.phase
    }

    pub fn platforms(&self) -> &'static [Platform] {
        self.platforms
    }

    pub fn bounds(&self) -> WorldBounds {
        self.settings.bounds
    }

    pub fn hint(&self) -> Option<&str> {
        self.hint.as_deref()
    }

    pub fn popup(&self) -> Option<&str> {
        self.popup.as_ref().map(|(text, _)| text.as_str())
    }

    pub fn banner(&self) -> Option<&str> {
        self.banner.as_deref()
    }

    /// Loading → Active. Interactables must already be in `live`.
    pub fn activate(&mut self, out: &mut LevelOutput) {
        if self.phase != LevelPhase::Loading {
            return;
        }
        self.phase = LevelPhase::Active;
        out.milestones.push(Milestone::Started(self.id));
    }

    /// Show a coach hint, dismissed automatically unless `persistent`.
    pub fn show_hint(&mut self, text: impl Into<String>, persistent: bool) {
        self.hint = Some(text.into());
        if !persistent {
            self.state.timers.after(HINT_SECONDS, TimerEvent::DismissHint);
        }
    }

    pub fn show_popup(&mut self, text: impl Into<String>) {
        if let Some((_, previous)) = self.popup.take() {
            self.state.timers.cancel(previous);
        }
        let handle = self.state.timers.after(POPUP_SECONDS, TimerEvent::DismissPopup);
        self.popup = Some((text.into(), handle));
    }

    pub fn move_player(&mut self, input: &InputSnapshot, dt: f32) {
        physics::step(
            &mut self.state.player,
            input.intent(),
            self.platforms,
            self.settings.bounds,
            &self.settings.movement,
            dt,
        );
    }

    /// Evaluate interactables; every interaction is also recorded in `out`.
    pub fn sweep(&mut self, input: &InputSnapshot, out: &mut LevelOutput) -> Vec<Interaction> {
        let interactions = interaction::sweep(&mut self.live, &mut self.state, input.interact);
        out.interactions.extend(interactions.iter().cloned());
        interactions
    }

    /// Tick timers, handle the shared events and hand back the rest.
    pub fn fire_timers(&mut self, dt: f32, out: &mut LevelOutput) -> Vec<TimerEvent> {
        let mut remaining = Vec::new();
        for event in self.state.timers.tick(dt) {
            match event {
                TimerEvent::ExpireFlag(flag) => {
                    self.state.set_flag(flag, false);
                    out.milestones.push(Milestone::FlagExpired(flag));
                }
                TimerEvent::DismissHint => self.hint = None,
                TimerEvent::DismissPopup => self.popup = None,
                other => remaining.push(other),
            }
        }
        remaining
    }

    /// Active → Completing: stop every timer and show the banner.
    pub fn complete(&mut self, banner: impl Into<String>, out: &mut LevelOutput) {
        if self.phase != LevelPhase::Active {
            return;
        }
        self.phase = LevelPhase::Completing;
        self.state.timers.cancel_all();
        self.hint = None;
        self.popup = None;
        self.banner = Some(banner.into());
        out.milestones.push(Milestone::Completed(self.id));
    }

    /// In Completing, the confirmation press finishes the level and requests
    /// the handoff. Returns true on the frame that happens.
    pub fn await_confirmation(&mut self, input: &InputSnapshot, out: &mut LevelOutput) -> bool {
        if self.phase != LevelPhase::Completing || !input.confirm {
            return false;
        }
        let transition = self
            .id
            .next()
            .map_or(Transition::JourneyComplete, Transition::Next);
        self.finish(transition, out);
        true
    }

    /// Finish immediately and request `transition`.
    pub fn finish(&mut self, transition: Transition, out: &mut LevelOutput) {
        if self.phase == LevelPhase::Finished {
            return;
        }
        self.teardown();
        out.transition = Some(transition);
    }

    pub fn teardown(&mut self) {
        self.phase = LevelPhase::Finished;
        self.state.timers.cancel_all();
    }
}

/// Default floating text for an interaction.
pub fn default_notice(interaction: &Interaction, at: Vec2) -> Option<Notice> {
    let (text, tone) = match interaction {
        Interaction::Collected { points, label, .. } if *points != 0 => {
            (format!("+{points} {label}"), Tone::Reward)
        }
        Interaction::Collected { label, .. } => (format!("{label} collected!"), Tone::Info),
        Interaction::HazardBlocked { bonus, .. } => (format!("Blocked! +{bonus}"), Tone::Bonus),
        Interaction::HazardHit { penalty, .. } => (format!("-{penalty}"), Tone::Penalty),
        Interaction::PortalActivated { .. } => ("Bonus mode!".to_string(), Tone::Bonus),
        Interaction::PromptShown(_) | Interaction::PromptHidden(_) => return None,
    };
    Some(Notice {
        text,
        at: at - Vec2::new(0.0, 50.0),
        tone,
    })
}

/// One level of the onboarding journey.
pub trait LevelController: Send + Sync {
    fn core(&self) -> &LevelCore;

    fn core_mut(&mut self) -> &mut LevelCore;

    /// Build the level and move it to Active.
    fn enter(&mut self, session: &SessionContext, out: &mut LevelOutput);

    /// One frame of gameplay.
    fn tick(&mut self, input: &InputSnapshot, dt: f32, out: &mut LevelOutput);

    /// Force the level to Finished, releasing its timers.
    fn exit(&mut self) {
        self.core_mut().teardown();
    }

    fn hud(&self, session: &SessionContext) -> String;

    /// Extra level-specific readout (clock, name field, …).
    fn overlay(&self) -> Option<String> {
        None
    }

    /// Whether the controllable runner is drawn in this level.
    fn shows_player(&self) -> bool {
        true
    }

    fn id(&self) -> LevelId {
        self.core().id()
    }

    fn phase(&self) -> LevelPhase {
        self.core().phase()
    }
}

pub fn build_level(id: LevelId, settings: LevelSettings) -> Box<dyn LevelController> {
    match id {
        LevelId::Welcome => Box::new(WelcomeLevel::new(settings)),
        LevelId::CoreValues => Box::new(CoreValuesLevel::new(settings)),
        LevelId::WorkSchedule => Box::new(WorkScheduleLevel::new(settings)),
        LevelId::Benefits => Box::new(BenefitsLevel::new(settings)),
        LevelId::Security => Box::new(SecurityLevel::new(settings)),
        LevelId::Sections => Box::new(SectionsLevel::new(settings)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn level_names_parse_in_several_spellings() {
        assert_eq!("core_values".parse(), Ok(LevelId::CoreValues));
        assert_eq!("CoreValuesScene".parse(), Ok(LevelId::CoreValues));
        assert_eq!(" work-schedule ".parse(), Ok(LevelId::WorkSchedule));
        assert_eq!("OnboardingSectionsScene".parse(), Ok(LevelId::Sections));
        assert_eq!(
            "payroll".parse::<LevelId>(),
            Err(UnknownLevel("payroll".to_string()))
        );
    }

    #[test]
    fn journey_order_ends_after_security() {
        let mut order = vec![LevelId::Welcome];
        while let Some(next) = order.last().and_then(|l| l.next()) {
            order.push(next);
        }
        assert_eq!(
            order,
            vec![
                LevelId::Welcome,
                LevelId::CoreValues,
                LevelId::WorkSchedule,
                LevelId::Benefits,
                LevelId::Security,
            ]
        );
    }

    #[test]
    fn every_level_builds_in_loading_and_enters_active() {
        for id in LevelId::ALL {
            let mut level = build_level(id, LevelSettings::default());
            assert_eq!(level.phase(), LevelPhase::Loading);
            let mut out = LevelOutput::default();
            level.enter(&SessionContext::default(), &mut out);
            assert_eq!(level.phase(), LevelPhase::Active, "{id}");
            assert_eq!(level.id(), id);
            assert!(out.milestones.contains(&Milestone::Started(id)));
        }
    }

    #[test]
    fn teardown_cancels_timers_and_finishes() {
        let mut core = LevelCore::new(
            LevelId::CoreValues,
            Vec2::ZERO,
            0,
            &[],
            LevelSettings::default(),
        );
        let mut out = LevelOutput::default();
        core.activate(&mut out);
        core.show_hint("hello", false);
        core.state.timers.every(2.0, TimerEvent::AdvanceClock);
        core.teardown();
        assert_eq!(core.phase(), LevelPhase::Finished);
        assert!(core.state.timers.is_empty());
    }

    #[test]
    fn newer_popup_is_not_dismissed_by_older_timer() {
        let mut core = LevelCore::new(
            LevelId::CoreValues,
            Vec2::ZERO,
            0,
            &[],
            LevelSettings::default(),
        );
        let mut out = LevelOutput::default();
        core.activate(&mut out);
        core.show_popup("first");
        core.fire_timers(1.5, &mut out);
        core.show_popup("second");
        core.fire_timers(1.0, &mut out);
        assert_eq!(core.popup(), Some("second"));
        core.fire_timers(1.1, &mut out);
        assert_eq!(core.popup(), None);
    }
}
