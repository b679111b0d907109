use bevy::math::Vec2;

use super::{
    default_notice, LevelController, LevelCore, LevelId, LevelOutput, LevelPhase, LevelSettings,
    Milestone, NarrationCue, NarrationRequest, Tone,
};
use crate::director::SessionContext;
use crate::input::InputSnapshot;
use crate::interaction::{
    Interactable, InteractableKind, Interaction, Trigger, HAZARD_RADIUS, PORTAL_RADIUS,
    TOKEN_RADIUS,
};
use crate::level_state::{Flag, ItemId};
use crate::physics::Platform;
use crate::timers::TimerEvent;

const SPAWN: Vec2 = Vec2::new(50.0, 450.0);
const TARGET_SCORE: i64 = 500;

const CLOCK_START: f32 = 9.0;
const CLOCK_END: f32 = 17.0;
const CLOCK_STEP_HOURS: f32 = 0.5;
const CLOCK_STEP_SECS: f32 = 2.0;

const LATE_PENALTY: i64 = 20;
const SHIELD_BONUS: i64 = 50;
const FLEX_SECONDS: f32 = 10.0;
const SHIELDS: &[Flag] = &[Flag::SlackToken, Flag::EmailToken];

const PLATFORMS: &[Platform] = &[
    Platform::new(400.0, 568.0, 800.0, 64.0),
    Platform::new(200.0, 430.0, 120.0, 20.0),
    Platform::new(450.0, 350.0, 120.0, 20.0),
    Platform::new(150.0, 250.0, 120.0, 20.0),
    Platform::new(650.0, 250.0, 120.0, 20.0),
];

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ZoneKind {
    Standard,
    Core,
    Flexible,
}

/// A horizontal band of the office day awarding points on every clock tick.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TimeZone {
    pub x: f32,
    pub width: f32,
    pub kind: ZoneKind,
    pub label: &'static str,
    pub points: i64,
}

impl TimeZone {
    fn contains(&self, x: f32) -> bool {
        x >= self.x && x < self.x + self.width
    }

    /// Points for one tick spent in this zone.
    pub fn award(&self, flex_mode: bool) -> i64 {
        match self.kind {
            ZoneKind::Standard => self.points,
            ZoneKind::Core => self.points * 2,
            ZoneKind::Flexible if flex_mode => self.points * 3 / 2,
            ZoneKind::Flexible => self.points,
        }
    }
}

pub const ZONES: &[TimeZone] = &[
    TimeZone {
        x: 0.0,
        width: 150.0,
        kind: ZoneKind::Standard,
        label: "9-10 AM",
        points: 10,
    },
    TimeZone {
        x: 150.0,
        width: 250.0,
        kind: ZoneKind::Core,
        label: "Core Hours",
        points: 20,
    },
    TimeZone {
        x: 400.0,
        width: 150.0,
        kind: ZoneKind::Standard,
        label: "3-5 PM",
        points: 10,
    },
    TimeZone {
        x: 550.0,
        width: 250.0,
        kind: ZoneKind::Flexible,
        label: "Flex Time",
        points: 15,
    },
];

/// "h:mm AM/PM" for a fractional hour of the day.
pub fn format_clock(hours: f32) -> String {
    let whole = hours.floor() as u32;
    let minutes = ((hours - hours.floor()) * 60.0).round() as u32;
    let period = if whole >= 12 { "PM" } else { "AM" };
    let display = match whole {
        0 => 12,
        h if h > 12 => h - 12,
        h => h,
    };
    format!("{display}:{minutes:02} {period}")
}

const HINT: &str = "Time to build that schedule stamina!\n\
                    Core hours score double. Grab Slack and Email to dodge being late!";
const BANNER: &str = "Great schedule management!\n\
                      You've mastered work-life balance!\n\
                      Press SPACE for Benefits Training!";

/// Score points by standing in the right part of the day while the office
/// clock runs.
pub struct WorkScheduleLevel {
    core: LevelCore,
    clock: f32,
}

impl WorkScheduleLevel {
    pub fn new(settings: LevelSettings) -> Self {
        Self {
            core: LevelCore::new(LevelId::WorkSchedule, SPAWN, 2, PLATFORMS, settings),
            clock: CLOCK_START,
        }
    }

    pub fn clock(&self) -> f32 {
        self.clock
    }

    fn advance_clock(&mut self, out: &mut LevelOutput) {
        self.clock += CLOCK_STEP_HOURS;
        if self.clock > CLOCK_END {
            self.clock = CLOCK_START;
        }

        let player = self.core.state.player.position;
        let flex_mode = self.core.state.flag(Flag::FlexMode);
        let mut points = 0;
        if let Some(zone) = ZONES.iter().find(|z| z.contains(player.x)) {
            points = zone.award(flex_mode);
            self.core.state.score += points;
            out.notice(format!("+{points}"), player - Vec2::new(0.0, 40.0), Tone::Reward);
        }
        out.milestones.push(Milestone::ClockAdvanced {
            time: format_clock(self.clock),
            points,
        });
    }

    fn announce(&mut self, interaction: &Interaction, out: &mut LevelOutput) {
        let player = self.core.state.player.position;
        let above = player - Vec2::new(0.0, 50.0);
        match interaction {
            Interaction::Collected { label, .. } => {
                out.notice(format!("{label} collected!"), above, Tone::Info)
            }
            Interaction::HazardBlocked { bonus, .. } => out.notice(
                format!("Communication saves the day! +{bonus}"),
                above,
                Tone::Bonus,
            ),
            Interaction::HazardHit { penalty, .. } => {
                out.notice(format!("-{penalty} Late!"), above, Tone::Penalty)
            }
            Interaction::PortalActivated { .. } => {
                out.notice("Flex Mode Activated!", above, Tone::Bonus)
            }
            other => {
                if let Some(notice) = default_notice(other, player) {
                    out.notices.push(notice);
                }
            }
        }
    }
}

fn late_hazard(id: u32, at: Vec2) -> Interactable {
    Interactable::new(
        id,
        "Running Late",
        at,
        HAZARD_RADIUS,
        InteractableKind::Hazard {
            penalty: LATE_PENALTY,
            bonus: SHIELD_BONUS,
            shields: SHIELDS,
        },
    )
}

fn token(id: u32, item: &'static str, label: &'static str, at: Vec2, flag: Flag) -> Interactable {
    Interactable::new(
        id,
        label,
        at,
        TOKEN_RADIUS,
        InteractableKind::Collectible {
            item: ItemId(item),
            points: 0,
            unlocks: Some(flag),
            boosted_by: None,
            trigger: Trigger::Overlap,
        },
    )
}

impl LevelController for WorkScheduleLevel {
    fn core(&self) -> &LevelCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut LevelCore {
        &mut self.core
    }

    fn enter(&mut self, _session: &SessionContext, out: &mut LevelOutput) {
        self.core.live = vec![
            token(1, "slack", "Slack", Vec2::new(150.0, 200.0), Flag::SlackToken),
            token(2, "email", "Email", Vec2::new(650.0, 200.0), Flag::EmailToken),
            late_hazard(3, Vec2::new(300.0, 400.0)),
            late_hazard(4, Vec2::new(500.0, 300.0)),
            late_hazard(5, Vec2::new(250.0, 200.0)),
            Interactable::new(
                6,
                "Remote Portal",
                Vec2::new(700.0, 450.0),
                PORTAL_RADIUS,
                InteractableKind::Portal {
                    mode: Flag::FlexMode,
                    duration: FLEX_SECONDS,
                },
            ),
        ];
        self.core
            .state
            .timers
            .every(CLOCK_STEP_SECS, TimerEvent::AdvanceClock);
        self.core.show_hint(HINT, false);
        self.core.activate(out);
        out.narration.push(NarrationRequest::Play(NarrationCue::Section(2)));
    }

    fn tick(&mut self, input: &InputSnapshot, dt: f32, out: &mut LevelOutput) {
        if self.core.await_confirmation(input, out) {
            return;
        }
        if self.core.phase() != LevelPhase::Active {
            return;
        }
        self.core.move_player(input, dt);
        for interaction in self.core.sweep(input, out) {
            self.announce(&interaction, out);
        }
        for event in self.core.fire_timers(dt, out) {
            if event == TimerEvent::AdvanceClock {
                self.advance_clock(out);
            }
        }
        if self.core.state.score >= TARGET_SCORE {
            self.core.complete(BANNER, out);
        }
    }

    fn hud(&self, session: &SessionContext) -> String {
        format!(
            "{} - Score: {}",
            session.display_name(),
            self.core.state.score
        )
    }

    fn overlay(&self) -> Option<String> {
        let mut text = format!("Clock: {}", format_clock(self.clock));
        if self.core.state.flag(Flag::FlexMode) {
            text.push_str("  |  FLEX MODE");
        }
        Some(text)
    }
}
