use bevy::math::Vec2;

use super::{
    default_notice, LevelController, LevelCore, LevelId, LevelOutput, LevelPhase, LevelSettings,
    NarrationCue, NarrationRequest, Tone,
};
use crate::director::SessionContext;
use crate::input::InputSnapshot;
use crate::interaction::{Interactable, InteractableKind, Interaction, Trigger, PICKUP_RADIUS};
use crate::level_state::ItemId;
use crate::physics::Platform;

const SPAWN: Vec2 = Vec2::new(100.0, 450.0);
const VALUE_POINTS: i64 = 20;

pub(super) const PLATFORMS: &[Platform] = &[
    Platform::new(400.0, 568.0, 800.0, 64.0),
    Platform::new(150.0, 400.0, 120.0, 20.0),
    Platform::new(650.0, 400.0, 120.0, 20.0),
    Platform::new(400.0, 300.0, 120.0, 20.0),
    Platform::new(250.0, 200.0, 120.0, 20.0),
    Platform::new(550.0, 200.0, 120.0, 20.0),
];

struct CoreValue {
    item: &'static str,
    name: &'static str,
    description: &'static str,
    at: Vec2,
}

const VALUES: &[CoreValue] = &[
    CoreValue {
        item: "innovation",
        name: "Innovation",
        description: "Think outside the box!",
        at: Vec2::new(150.0, 350.0),
    },
    CoreValue {
        item: "integrity",
        name: "Integrity",
        description: "Always do the right thing!",
        at: Vec2::new(650.0, 350.0),
    },
    CoreValue {
        item: "excellence",
        name: "Excellence",
        description: "Strive for the best!",
        at: Vec2::new(400.0, 250.0),
    },
    CoreValue {
        item: "teamwork",
        name: "Teamwork",
        description: "Together we achieve more!",
        at: Vec2::new(250.0, 150.0),
    },
    CoreValue {
        item: "customer_focus",
        name: "Customer Focus",
        description: "Customers come first!",
        at: Vec2::new(550.0, 150.0),
    },
];

const HINT: &str = "Let's warm up with our core muscles: ACME's five values!\n\
                    Jump to each one and press E to power up.";
const BANNER: &str = "Excellent work! You've mastered the Powerhouse Five!\n\
                      Press SPACE to continue to Work Schedule Training!";

/// Collect all five company values by pressing E next to each.
pub struct CoreValuesLevel {
    core: LevelCore,
}

impl CoreValuesLevel {
    pub fn new(settings: LevelSettings) -> Self {
        Self {
            core: LevelCore::new(LevelId::CoreValues, SPAWN, VALUES.len(), PLATFORMS, settings),
        }
    }
}

impl LevelController for CoreValuesLevel {
    fn core(&self) -> &LevelCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut LevelCore {
        &mut self.core
    }

    fn enter(&mut self, _session: &SessionContext, out: &mut LevelOutput) {
        self.core.live = VALUES
            .iter()
            .zip(1..)
            .map(|(value, id)| {
                Interactable::new(
                    id,
                    value.name,
                    value.at,
                    PICKUP_RADIUS,
                    InteractableKind::Collectible {
                        item: ItemId(value.item),
                        points: VALUE_POINTS,
                        unlocks: None,
                        boosted_by: None,
                        trigger: Trigger::InteractKey,
                    },
                )
                .with_detail(value.description)
            })
            .collect();
        self.core.show_hint(HINT, false);
        self.core.activate(out);
        out.narration.push(NarrationRequest::Play(NarrationCue::Section(1)));
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
            if let Interaction::Collected { label, detail, .. } = &interaction {
                self.core.show_popup(format!("{label}\n{detail}"));
                out.notice(format!("{label}!"), player - Vec2::new(0.0, 50.0), Tone::Reward);
            } else if let Some(notice) = default_notice(&interaction, player) {
                out.notices.push(notice);
            }
        }
        self.core.fire_timers(dt, out);
        if self.core.state.all_collected() {
            self.core.complete(BANNER, out);
        }
    }

    fn hud(&self, session: &SessionContext) -> String {
        format!(
            "{} - Core Values: {}/{}",
            session.display_name(),
            self.core.state.collected_count(),
            self.core.state.total_items()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::levels::Transition;

    fn entered() -> (CoreValuesLevel, LevelOutput) {
        let mut level = CoreValuesLevel::new(LevelSettings::default());
        let mut out = LevelOutput::default();
        level.enter(&SessionContext::default(), &mut out);
        (level, out)
    }

    fn press_e_at(level: &mut CoreValuesLevel, at: Vec2) -> LevelOutput {
        level.core.state.player.reset_to(at);
        let mut out = LevelOutput::default();
        let input = InputSnapshot {
            interact: true,
            ..Default::default()
        };
        level.tick(&input, 0.0, &mut out);
        out
    }

    #[test]
    fn entering_requests_section_one_narration() {
        let (_, out) = entered();
        assert_eq!(
            out.narration,
            vec![NarrationRequest::Play(NarrationCue::Section(1))]
        );
    }

    #[test]
    fn pressing_e_away_from_values_collects_nothing() {
        let (mut level, _) = entered();
        press_e_at(&mut level, Vec2::new(400.0, 520.0));
        assert_eq!(level.core.state.collected_count(), 0);
        assert_eq!(level.hud(&SessionContext::default()), "Player - Core Values: 0/5");
    }

    #[test]
    fn collecting_all_values_completes_and_one_space_hands_off() {
        let (mut level, _) = entered();
        for value in VALUES {
            press_e_at(&mut level, value.at);
        }
        assert_eq!(level.core.state.collected_count(), 5);
        assert_eq!(level.core.state.score, 5 * VALUE_POINTS);
        assert_eq!(level.phase(), LevelPhase::Completing);
        assert!(level.core.state.timers.is_empty());
        assert_eq!(level.core.banner(), Some(BANNER));

        let mut out = LevelOutput::default();
        let space = InputSnapshot {
            confirm: true,
            ..Default::default()
        };
        level.tick(&space, 0.016, &mut out);
        assert_eq!(out.transition, Some(Transition::Next(LevelId::WorkSchedule)));
        assert_eq!(level.phase(), LevelPhase::Finished);

        let mut again = LevelOutput::default();
        level.tick(&space, 0.016, &mut again);
        assert_eq!(again.transition, None);
    }

    #[test]
    fn collected_value_shows_its_description() {
        let (mut level, _) = entered();
        press_e_at(&mut level, VALUES[2].at);
        assert_eq!(level.core.popup(), Some("Excellence\nStrive for the best!"));
        assert!(level
            .hud(&SessionContext::named("Ada"))
            .starts_with("Ada - Core Values: 1/5"));
    }
}
