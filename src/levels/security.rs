use bevy::math::Vec2;

use super::{
    default_notice, LevelController, LevelCore, LevelId, LevelOutput, LevelPhase, LevelSettings,
    NarrationCue, NarrationRequest, Tone,
};
use crate::director::SessionContext;
use crate::input::InputSnapshot;
use crate::interaction::{
    Interactable, InteractableKind, Interaction, Trigger, HAZARD_RADIUS, PICKUP_RADIUS,
    TOKEN_RADIUS,
};
use crate::level_state::{Flag, ItemId};
use crate::physics::Platform;

const SPAWN: Vec2 = Vec2::new(60.0, 450.0);
const PIECE_POINTS: i64 = 10;
const PHISHING_PENALTY: i64 = 15;
const PHISHING_BONUS: i64 = 30;
const MFA: &[Flag] = &[Flag::MfaShield];

const PLATFORMS: &[Platform] = &[
    Platform::new(400.0, 568.0, 800.0, 64.0),
    Platform::new(160.0, 410.0, 120.0, 20.0),
    Platform::new(400.0, 410.0, 120.0, 20.0),
    Platform::new(640.0, 410.0, 120.0, 20.0),
    Platform::new(280.0, 280.0, 120.0, 20.0),
    Platform::new(520.0, 280.0, 120.0, 20.0),
];

struct PolicyPiece {
    item: &'static str,
    label: &'static str,
    detail: &'static str,
    at: Vec2,
}

const PIECES: &[PolicyPiece] = &[
    PolicyPiece {
        item: "passwords",
        label: "Strong Passwords",
        detail: "Long, unique and stored in the password manager.",
        at: Vec2::new(160.0, 370.0),
    },
    PolicyPiece {
        item: "mfa_policy",
        label: "Multi-Factor Auth",
        detail: "Every login gets a second check.",
        at: Vec2::new(400.0, 370.0),
    },
    PolicyPiece {
        item: "phishing",
        label: "Spot the Phish",
        detail: "Check the sender before you click.",
        at: Vec2::new(640.0, 370.0),
    },
    PolicyPiece {
        item: "devices",
        label: "Lock Your Screen",
        detail: "Win+L or Ctrl+Cmd+Q whenever you step away.",
        at: Vec2::new(280.0, 240.0),
    },
    PolicyPiece {
        item: "data",
        label: "Data Handling",
        detail: "Customer data stays in approved systems.",
        at: Vec2::new(520.0, 240.0),
    },
    PolicyPiece {
        item: "reporting",
        label: "Report Incidents",
        detail: "Tell security right away. No blame.",
        at: Vec2::new(740.0, 500.0),
    },
];

const HINT: &str = "Last set! Assemble the security playbook piece by piece.\n\
                    Press E on each piece. Grab the MFA key before you touch a phish!";
const BANNER: &str = "Security puzzle assembled!\n\
                      You're officially part of the ACME team!\n\
                      Press SPACE to finish onboarding!";

/// Assemble the security policy while dodging phishing lures.
pub struct SecurityLevel {
    core: LevelCore,
}

impl SecurityLevel {
    pub fn new(settings: LevelSettings) -> Self {
        Self {
            core: LevelCore::new(LevelId::Security, SPAWN, PIECES.len() + 1, PLATFORMS, settings),
        }
    }

    fn pieces_collected(&self) -> usize {
        PIECES
            .iter()
            .filter(|p| self.core.state.has_collected(ItemId(p.item)))
            .count()
    }
}

fn phish(id: u32, at: Vec2) -> Interactable {
    Interactable::new(
        id,
        "Phishing Email",
        at,
        HAZARD_RADIUS,
        InteractableKind::Hazard {
            penalty: PHISHING_PENALTY,
            bonus: PHISHING_BONUS,
            shields: MFA,
        },
    )
}

impl LevelController for SecurityLevel {
    fn core(&self) -> &LevelCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut LevelCore {
        &mut self.core
    }

    fn enter(&mut self, _session: &SessionContext, out: &mut LevelOutput) {
        let mut live: Vec<Interactable> = PIECES
            .iter()
            .zip(1..)
            .map(|(piece, id)| {
                Interactable::new(
                    id,
                    piece.label,
                    piece.at,
                    PICKUP_RADIUS,
                    InteractableKind::Collectible {
                        item: ItemId(piece.item),
                        points: PIECE_POINTS,
                        unlocks: None,
                        boosted_by: None,
                        trigger: Trigger::InteractKey,
                    },
                )
                .with_detail(piece.detail)
            })
            .collect();
        live.push(Interactable::new(
            50,
            "MFA Key",
            Vec2::new(60.0, 300.0),
            TOKEN_RADIUS,
            InteractableKind::Collectible {
                item: ItemId("mfa_key"),
                points: 0,
                unlocks: Some(Flag::MfaShield),
                boosted_by: None,
                trigger: Trigger::Overlap,
            },
        ));
        live.push(phish(60, Vec2::new(280.0, 500.0)));
        live.push(phish(61, Vec2::new(600.0, 500.0)));
        self.core.live = live;
        self.core.show_hint(HINT, false);
        self.core.activate(out);
        out.narration.push(NarrationRequest::Play(NarrationCue::Section(5)));
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
        let above = player - Vec2::new(0.0, 50.0);
        for interaction in self.core.sweep(input, out) {
            match &interaction {
                Interaction::Collected {
                    label,
                    detail,
                    unlocked: None,
                    ..
                } => {
                    self.core.show_popup(format!("{label}\n{detail}"));
                    out.notice(format!("+{PIECE_POINTS} {label}"), above, Tone::Reward);
                }
                Interaction::HazardBlocked { bonus, .. } => {
                    out.notice(format!("MFA stopped the phish! +{bonus}"), above, Tone::Bonus)
                }
                Interaction::HazardHit { penalty, .. } => {
                    out.notice(format!("-{penalty} Phished!"), above, Tone::Penalty)
                }
                other => {
                    if let Some(notice) = default_notice(other, player) {
                        out.notices.push(notice);
                    }
                }
            }
        }
        self.core.fire_timers(dt, out);
        if self.pieces_collected() == PIECES.len() {
            self.core.complete(BANNER, out);
        }
    }

    fn hud(&self, session: &SessionContext) -> String {
        format!(
            "{} - Security: {}/{} - Score: {}",
            session.display_name(),
            self.pieces_collected(),
            PIECES.len(),
            self.core.state.score
        )
    }

    fn overlay(&self) -> Option<String> {
        self.core
            .state
            .flag(Flag::MfaShield)
            .then(|| "MFA key ready".to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::levels::Transition;

    fn entered() -> SecurityLevel {
        let mut level = SecurityLevel::new(LevelSettings::default());
        let mut out = LevelOutput::default();
        level.enter(&SessionContext::default(), &mut out);
        level
    }

    fn step_at(level: &mut SecurityLevel, at: Vec2, interact: bool, confirm: bool) -> LevelOutput {
        level.core.state.player.reset_to(at);
        let mut out = LevelOutput::default();
        let input = InputSnapshot {
            interact,
            confirm,
            ..Default::default()
        };
        level.tick(&input, 0.0, &mut out);
        out
    }

    #[test]
    fn phish_without_mfa_costs_points_and_respawns() {
        let mut level = entered();
        step_at(&mut level, Vec2::new(280.0, 500.0), false, false);
        assert_eq!(level.core.state.score, -PHISHING_PENALTY);
        assert_eq!(level.core.state.player.position, SPAWN);
    }

    #[test]
    fn mfa_key_blocks_one_phish() {
        let mut level = entered();
        step_at(&mut level, Vec2::new(60.0, 300.0), false, false);
        assert!(level.core.state.flag(Flag::MfaShield));
        assert_eq!(level.overlay().as_deref(), Some("MFA key ready"));

        let out = step_at(&mut level, Vec2::new(600.0, 500.0), false, false);
        assert_eq!(level.core.state.score, PHISHING_BONUS);
        assert!(!level.core.state.flag(Flag::MfaShield));
        assert_eq!(out.notices[0].tone, Tone::Bonus);
    }

    #[test]
    fn final_piece_finishes_the_journey() {
        let mut level = entered();
        for piece in PIECES {
            step_at(&mut level, piece.at, true, false);
        }
        assert_eq!(level.phase(), LevelPhase::Completing);
        assert_eq!(level.hud(&SessionContext::default()), "Player - Security: 6/6 - Score: 60");

        let out = step_at(&mut level, SPAWN, false, true);
        assert_eq!(out.transition, Some(Transition::JourneyComplete));
    }
}
