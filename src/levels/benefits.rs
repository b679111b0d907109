use bevy::math::Vec2;

use super::{
    default_notice, LevelController, LevelCore, LevelId, LevelOutput, LevelPhase, LevelSettings,
    NarrationCue, NarrationRequest, Tone,
};
use crate::director::SessionContext;
use crate::input::InputSnapshot;
use crate::interaction::{
    Interactable, InteractableKind, Interaction, Trigger, PICKUP_RADIUS, PORTAL_RADIUS,
};
use crate::level_state::{Flag, ItemId};
use crate::physics::Platform;

const SPAWN: Vec2 = Vec2::new(60.0, 450.0);
const BENEFIT_POINTS: i64 = 10;
const ENROLLMENT_SECONDS: f32 = 8.0;

const PLATFORMS: &[Platform] = &[
    Platform::new(400.0, 568.0, 800.0, 64.0),
    Platform::new(180.0, 420.0, 140.0, 20.0),
    Platform::new(420.0, 360.0, 140.0, 20.0),
    Platform::new(640.0, 300.0, 140.0, 20.0),
    Platform::new(300.0, 240.0, 140.0, 20.0),
];

const BENEFITS: &[(&str, &str, &str, Vec2)] = &[
    ("health", "Health Insurance", "Medical, dental and vision from day one.", Vec2::new(180.0, 380.0)),
    ("retirement", "401(k)", "Matched contributions for your future.", Vec2::new(420.0, 320.0)),
    ("pto", "Paid Time Off", "Rest is part of the workout.", Vec2::new(640.0, 260.0)),
    ("life", "Life Insurance", "Coverage for the people you love.", Vec2::new(300.0, 200.0)),
    ("learning", "Development Budget", "Courses, books and conferences.", Vec2::new(560.0, 500.0)),
    ("wellness", "Wellness Stipend", "Gym, yoga or whatever keeps you going.", Vec2::new(740.0, 500.0)),
];

const HINT: &str = "Grab every benefit on the track!\n\
                    Step into Open Enrollment to double your points for a while.";
const BANNER: &str = "All benefits collected!\n\
                      Your total rewards package is locked in!\n\
                      Press SPACE for Security Training!";

/// Run over every benefit pickup to assemble the rewards package.
pub struct BenefitsLevel {
    core: LevelCore,
}

impl BenefitsLevel {
    pub fn new(settings: LevelSettings) -> Self {
        Self {
            core: LevelCore::new(LevelId::Benefits, SPAWN, BENEFITS.len(), PLATFORMS, settings),
        }
    }
}

impl LevelController for BenefitsLevel {
    fn core(&self) -> &LevelCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut LevelCore {
        &mut self.core
    }

    fn enter(&mut self, _session: &SessionContext, out: &mut LevelOutput) {
        let mut live: Vec<Interactable> = BENEFITS
            .iter()
            .zip(1..)
            .map(|(&(item, label, detail, at), id)| {
                Interactable::new(
                    id,
                    label,
                    at,
                    PICKUP_RADIUS,
                    InteractableKind::Collectible {
                        item: ItemId(item),
                        points: BENEFIT_POINTS,
                        unlocks: None,
                        boosted_by: Some(Flag::EnrollmentWindow),
                        trigger: Trigger::Overlap,
                    },
                )
                .with_detail(detail)
            })
            .collect();
        live.push(Interactable::new(
            100,
            "Open Enrollment",
            Vec2::new(60.0, 300.0),
            PORTAL_RADIUS,
            InteractableKind::Portal {
                mode: Flag::EnrollmentWindow,
                duration: ENROLLMENT_SECONDS,
            },
        ));
        live.push(Interactable::new(
            101,
            "Benefits Desk",
            Vec2::new(400.0, 500.0),
            PICKUP_RADIUS,
            InteractableKind::Prompt {
                text: "Benefits start on day one. Enroll within 30 days!",
            },
        ));
        self.core.live = live;
        self.core.show_hint(HINT, false);
        self.core.activate(out);
        out.narration.push(NarrationRequest::Play(NarrationCue::Section(3)));
    }

    fn tick(&mut self, input: &InputSnapshot, dt: f32, out: &mut LevelOutput) {
        if self.core.await_confirmation(input, out) {
            return;
        }
        if self.core.phase() != LevelPhase::Active {
            return;
        }
        self.core.move_player(input, dt);
        let player = self.core.state.player.position;
        for interaction in self.core.sweep(input, out) {
            match &interaction {
                Interaction::Collected { detail, .. } => {
                    self.core.show_popup(*detail);
                    if let Some(notice) = default_notice(&interaction, player) {
                        out.notices.push(notice);
                    }
                }
                Interaction::PortalActivated { .. } => out.notice(
                    "Enrollment window open! Double points!",
                    player - Vec2::new(0.0, 50.0),
                    Tone::Bonus,
                ),
                other => {
                    if let Some(notice) = default_notice(other, player) {
                        out.notices.push(notice);
                    }
                }
            }
        }
        self.core.fire_timers(dt, out);
        if self.core.state.all_collected() {
            self.core.complete(BANNER, out);
        }
    }

    fn hud(&self, session: &SessionContext) -> String {
        format!(
            "{} - Benefits: {}/{} - Score: {}",
            session.display_name(),
            self.core.state.collected_count(),
            self.core.state.total_items(),
            self.core.state.score
        )
    }

    fn overlay(&self) -> Option<String> {
        self.core
            .state
            .flag(Flag::EnrollmentWindow)
            .then(|| "Open Enrollment: double points".to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::levels::Transition;

    fn entered() -> BenefitsLevel {
        let mut level = BenefitsLevel::new(LevelSettings::default());
        let mut out = LevelOutput::default();
        level.enter(&SessionContext::default(), &mut out);
        level
    }

    fn visit(level: &mut BenefitsLevel, at: Vec2) -> LevelOutput {
        level.core.state.player.reset_to(at);
        let mut out = LevelOutput::default();
        level.tick(&InputSnapshot::default(), 0.0, &mut out);
        out
    }

    #[test]
    fn running_over_a_benefit_awards_ten_points() {
        let mut level = entered();
        visit(&mut level, BENEFITS[0].3);
        assert_eq!(level.core.state.score, BENEFIT_POINTS);
        assert_eq!(level.hud(&SessionContext::default()), "Player - Benefits: 1/6 - Score: 10");
    }

    #[test]
    fn enrollment_window_doubles_pickups() {
        let mut level = entered();
        visit(&mut level, Vec2::new(60.0, 300.0));
        assert!(level.core.state.flag(Flag::EnrollmentWindow));
        visit(&mut level, BENEFITS[2].3);
        assert_eq!(level.core.state.score, 2 * BENEFIT_POINTS);
    }

    #[test]
    fn desk_prompt_appears_near_and_hides_away() {
        let mut level = entered();
        let out = visit(&mut level, Vec2::new(400.0, 510.0));
        assert!(matches!(out.interactions[..], [Interaction::PromptShown(_)]));
        let out = visit(&mut level, SPAWN);
        assert!(matches!(out.interactions[..], [Interaction::PromptHidden(_)]));
    }

    #[test]
    fn all_six_benefits_complete_the_level() {
        let mut level = entered();
        for benefit in BENEFITS {
            visit(&mut level, benefit.3);
        }
        assert_eq!(level.phase(), LevelPhase::Completing);
        assert_eq!(level.core.state.score, 60);

        let mut out = LevelOutput::default();
        let space = InputSnapshot {
            confirm: true,
            ..Default::default()
        };
        level.tick(&space, 0.016, &mut out);
        assert_eq!(out.transition, Some(Transition::Next(LevelId::Security)));
    }
}
