use bevy::math::Vec2;
use serde::Serialize;

use crate::level_state::{Flag, ItemId, LevelState};
use crate::timers::{TimerEvent, TimerHandle};

pub const PICKUP_RADIUS: f32 = 50.0;
pub const TOKEN_RADIUS: f32 = 40.0;
pub const PORTAL_RADIUS: f32 = 50.0;
pub const HAZARD_RADIUS: f32 = 36.0;

/// True when `player` is strictly closer than `radius` to `target`.
pub fn is_within(player: Vec2, target: Vec2, radius: f32) -> bool {
    player.distance(target) < radius
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct InteractableId(pub u32);

/// How a collectible is picked up.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Trigger {
    Overlap,
    InteractKey,
}

#[derive(Clone, Debug, PartialEq)]
pub enum InteractableKind {
    Collectible {
        item: ItemId,
        points: i64,
        unlocks: Option<Flag>,
        /// Points are doubled while this flag is set.
        boosted_by: Option<Flag>,
        trigger: Trigger,
    },
    Hazard {
        penalty: i64,
        bonus: i64,
        shields: &'static [Flag],
    },
    Portal {
        mode: Flag,
        duration: f32,
    },
    Prompt {
        text: &'static str,
    },
}

#[derive(Clone, Debug, PartialEq)]
pub struct Interactable {
    pub id: InteractableId,
    pub label: &'static str,
    pub detail: &'static str,
    pub position: Vec2,
    pub radius: f32,
    pub kind: InteractableKind,
    prompt_visible: bool,
}

impl Interactable {
    pub fn new(
        id: u32,
        label: &'static str,
        position: Vec2,
        radius: f32,
        kind: InteractableKind,
    ) -> Self {
        Self {
            id: InteractableId(id),
            label,
            detail: "",
            position,
            radius,
            kind,
            prompt_visible: false,
        }
    }

    pub fn with_detail(mut self, detail: &'static str) -> Self {
        self.detail = detail;
        self
    }

    pub fn prompt_visible(&self) -> bool {
        self.prompt_visible
    }

    /// Text shown while the prompt is visible.
    pub fn prompt_text(&self) -> Option<&'static str> {
        match &self.kind {
            InteractableKind::Collectible {
                trigger: Trigger::InteractKey,
                ..
            } => Some("Press E"),
            InteractableKind::Prompt { text } => Some(text),
            _ => None,
        }
    }
}

/// Something that happened while sweeping the live interactables.
#[derive(Clone, Debug, PartialEq)]
pub enum Interaction {
    PromptShown(InteractableId),
    PromptHidden(InteractableId),
    Collected {
        id: InteractableId,
        item: ItemId,
        label: &'static str,
        detail: &'static str,
        points: i64,
        unlocked: Option<Flag>,
    },
    HazardBlocked {
        id: InteractableId,
        shield: Flag,
        bonus: i64,
    },
    HazardHit {
        id: InteractableId,
        penalty: i64,
    },
    PortalActivated {
        id: InteractableId,
        mode: Flag,
        expires: TimerHandle,
    },
}

/// Evaluate every live interactable against the player for one frame and
/// apply its effect to `state`. Consumed interactables are removed from
/// `live`.
pub fn sweep(
    live: &mut Vec<Interactable>,
    state: &mut LevelState,
    interact_pressed: bool,
) -> Vec<Interaction> {
    let mut out = Vec::new();
    let mut index = 0;
    while index < live.len() {
        let near = is_within(state.player.position, live[index].position, live[index].radius);
        let consumed = resolve(&mut live[index], state, near, interact_pressed, &mut out);
        if consumed {
            live.remove(index);
        } else {
            index += 1;
        }
    }
    out
}

fn resolve(
    target: &mut Interactable,
    state: &mut LevelState,
    near: bool,
    interact_pressed: bool,
    out: &mut Vec<Interaction>,
) -> bool {
    match target.kind.clone() {
        InteractableKind::Collectible {
            item,
            points,
            unlocks,
            boosted_by,
            trigger,
        } => {
            if trigger == Trigger::InteractKey {
                toggle_prompt(target, near, out);
                if !(near && interact_pressed) {
                    return false;
                }
            } else if !near {
                return false;
            }
            if !state.collect(item) {
                return true;
            }
            let boosted = boosted_by.is_some_and(|flag| state.flag(flag));
            let points = if boosted { points * 2 } else { points };
            state.score += points;
            if let Some(flag) = unlocks {
                state.set_flag(flag, true);
            }
            out.push(Interaction::Collected {
                id: target.id,
                item,
                label: target.label,
                detail: target.detail,
                points,
                unlocked: unlocks,
            });
            true
        }
        InteractableKind::Hazard {
            penalty,
            bonus,
            shields,
        } => {
            if !near {
                return false;
            }
            if let Some(shield) = state.consume_first(shields) {
                state.score += bonus;
                out.push(Interaction::HazardBlocked {
                    id: target.id,
                    shield,
                    bonus,
                });
                true
            } else {
                state.score -= penalty;
                state.respawn();
                out.push(Interaction::HazardHit {
                    id: target.id,
                    penalty,
                });
                false
            }
        }
        InteractableKind::Portal { mode, duration } => {
            if near && !state.flag(mode) {
                state.set_flag(mode, true);
                let expires = state.timers.after(duration, TimerEvent::ExpireFlag(mode));
                out.push(Interaction::PortalActivated {
                    id: target.id,
                    mode,
                    expires,
                });
            }
            false
        }
        InteractableKind::Prompt { .. } => {
            toggle_prompt(target, near, out);
            false
        }
    }
}

fn toggle_prompt(target: &mut Interactable, near: bool, out: &mut Vec<Interaction>) {
    if near && !target.prompt_visible {
        target.prompt_visible = true;
        out.push(Interaction::PromptShown(target.id));
    } else if !near && target.prompt_visible {
        target.prompt_visible = false;
        out.push(Interaction::PromptHidden(target.id));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SHIELDS: &[Flag] = &[Flag::SlackToken, Flag::EmailToken];

    fn coin(points: i64, trigger: Trigger) -> Interactable {
        Interactable::new(
            1,
            "Coin",
            Vec2::new(100.0, 100.0),
            PICKUP_RADIUS,
            InteractableKind::Collectible {
                item: ItemId("coin"),
                points,
                unlocks: None,
                boosted_by: None,
                trigger,
            },
        )
    }

    fn hazard(id: u32, x: f32) -> Interactable {
        Interactable::new(
            id,
            "Late",
            Vec2::new(x, 100.0),
            HAZARD_RADIUS,
            InteractableKind::Hazard {
                penalty: 20,
                bonus: 50,
                shields: SHIELDS,
            },
        )
    }

    #[test]
    fn zone_boundary_is_exclusive() {
        let target = Vec2::new(50.0, 0.0);
        assert!(!is_within(Vec2::ZERO, target, 50.0));
        assert!(is_within(Vec2::new(0.001, 0.0), target, 50.0));
    }

    #[test]
    fn collectible_scores_once_and_disappears() {
        let mut state = LevelState::new(Vec2::new(100.0, 100.0), 1);
        let mut live = vec![coin(10, Trigger::Overlap)];

        let events = sweep(&mut live, &mut state, false);
        assert_eq!(state.score, 10);
        assert_eq!(state.collected_count(), 1);
        assert!(live.is_empty());
        assert!(matches!(events[0], Interaction::Collected { points: 10, .. }));

        let events = sweep(&mut live, &mut state, false);
        assert!(events.is_empty());
        assert_eq!(state.score, 10);
        assert_eq!(state.collected_count(), 1);
    }

    #[test]
    fn interact_collectible_shows_prompt_and_waits_for_key() {
        let mut state = LevelState::new(Vec2::new(400.0, 400.0), 1);
        let mut live = vec![coin(10, Trigger::InteractKey)];

        state.player.position = Vec2::new(110.0, 100.0);
        let events = sweep(&mut live, &mut state, false);
        assert_eq!(events, vec![Interaction::PromptShown(InteractableId(1))]);
        assert!(live[0].prompt_visible());
        assert!(sweep(&mut live, &mut state, false).is_empty());

        state.player.position = Vec2::new(400.0, 400.0);
        let events = sweep(&mut live, &mut state, true);
        assert_eq!(events, vec![Interaction::PromptHidden(InteractableId(1))]);
        assert_eq!(state.score, 0);

        state.player.position = Vec2::new(100.0, 100.0);
        let events = sweep(&mut live, &mut state, true);
        assert_eq!(events.len(), 2);
        assert_eq!(state.score, 10);
        assert!(live.is_empty());
    }

    #[test]
    fn unshielded_hazard_penalises_and_respawns() {
        let spawn = Vec2::new(50.0, 450.0);
        let mut state = LevelState::new(spawn, 0);
        state.player.position = Vec2::new(300.0, 100.0);
        let mut live = vec![hazard(7, 300.0)];

        let events = sweep(&mut live, &mut state, false);
        assert_eq!(
            events,
            vec![Interaction::HazardHit {
                id: InteractableId(7),
                penalty: 20
            }]
        );
        assert_eq!(state.score, -20);
        assert_eq!(state.player.position, spawn);
        assert_eq!(live.len(), 1);
    }

    #[test]
    fn shield_is_consumed_by_first_hazard_only() {
        let spawn = Vec2::new(50.0, 450.0);
        let mut state = LevelState::new(spawn, 0);
        state.set_flag(Flag::EmailToken, true);
        state.player.position = Vec2::new(300.0, 100.0);
        let mut live = vec![hazard(1, 300.0), hazard(2, 310.0)];

        let events = sweep(&mut live, &mut state, false);
        assert_eq!(
            events[0],
            Interaction::HazardBlocked {
                id: InteractableId(1),
                shield: Flag::EmailToken,
                bonus: 50
            }
        );
        assert_eq!(
            events[1],
            Interaction::HazardHit {
                id: InteractableId(2),
                penalty: 20
            }
        );
        assert_eq!(state.score, 30);
        assert!(!state.flag(Flag::EmailToken));
        assert_eq!(state.player.position, spawn);
        assert_eq!(live.len(), 1);
        assert_eq!(live[0].id, InteractableId(2));
    }

    #[test]
    fn portal_reentry_does_not_restart_expiry() {
        let mut state = LevelState::new(Vec2::new(700.0, 450.0), 0);
        let mut live = vec![Interactable::new(
            3,
            "Remote Portal",
            Vec2::new(700.0, 450.0),
            PORTAL_RADIUS,
            InteractableKind::Portal {
                mode: Flag::FlexMode,
                duration: 10.0,
            },
        )];

        let first = sweep(&mut live, &mut state, false);
        assert!(matches!(first[0], Interaction::PortalActivated { .. }));
        assert_eq!(state.timers.len(), 1);

        assert!(sweep(&mut live, &mut state, false).is_empty());
        assert_eq!(state.timers.len(), 1);
        assert!(state.flag(Flag::FlexMode));
    }

    #[test]
    fn boosted_collectible_doubles_points() {
        let mut state = LevelState::new(Vec2::new(100.0, 100.0), 1);
        state.set_flag(Flag::EnrollmentWindow, true);
        let mut live = vec![Interactable::new(
            4,
            "PTO",
            Vec2::new(100.0, 100.0),
            PICKUP_RADIUS,
            InteractableKind::Collectible {
                item: ItemId("pto"),
                points: 10,
                unlocks: None,
                boosted_by: Some(Flag::EnrollmentWindow),
                trigger: Trigger::Overlap,
            },
        )];
        sweep(&mut live, &mut state, false);
        assert_eq!(state.score, 20);
    }
}
