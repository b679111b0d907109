use bevy::math::Vec2;

use super::{
    LevelController, LevelCore, LevelId, LevelOutput, LevelPhase, LevelSettings, NarrationCue,
    NarrationRequest,
};
use crate::director::SessionContext;
use crate::input::InputSnapshot;

pub const MAX_NAME_CHARS: usize = 20;

const GREETING: &str = "Hey there, superstar! Welcome to ACME's starting line!\n\
                        What name should go on your badge?\n\
                        Type your name and press ENTER!";

/// Badge sign-in: the new hire types a name before training starts.
pub struct WelcomeLevel {
    core: LevelCore,
    name: String,
}

impl WelcomeLevel {
    pub fn new(settings: LevelSettings) -> Self {
        Self {
            core: LevelCore::new(LevelId::Welcome, Vec2::new(400.0, 520.0), 0, &[], settings),
            name: String::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    fn edit_name(&mut self, input: &InputSnapshot) {
        for ch in input.typed.chars().filter(|c| !c.is_control()) {
            if self.name.chars().count() >= MAX_NAME_CHARS {
                break;
            }
            self.name.push(ch);
        }
        if input.erase {
            self.name.pop();
        }
    }
}

impl LevelController for WelcomeLevel {
    fn core(&self) -> &LevelCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut LevelCore {
        &mut self.core
    }

    fn enter(&mut self, session: &SessionContext, out: &mut LevelOutput) {
        if let Some(name) = &session.player_name {
            self.name = name.chars().take(MAX_NAME_CHARS).collect();
        }
        self.core.show_hint(GREETING, true);
        self.core.activate(out);
        out.narration.push(NarrationRequest::Play(NarrationCue::Intro));
    }

    fn tick(&mut self, input: &InputSnapshot, _dt: f32, out: &mut LevelOutput) {
        if self.core.await_confirmation(input, out) {
            out.player_name = Some(self.name.trim().to_string());
            return;
        }
        if self.core.phase() != LevelPhase::Active {
            return;
        }
        self.edit_name(input);
        if input.submit && !self.name.trim().is_empty() {
            let banner = format!(
                "Fantastic form, {}!\nLet's crush this onboarding workout!\nPress SPACE to continue!",
                self.name.trim()
            );
            self.core.complete(banner, out);
        }
    }

    fn hud(&self, _session: &SessionContext) -> String {
        "ACME Onboarding".to_string()
    }

    fn overlay(&self) -> Option<String> {
        Some(format!("Badge name: {}_", self.name))
    }

    fn shows_player(&self) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::levels::Transition;

    fn entered() -> WelcomeLevel {
        let mut level = WelcomeLevel::new(LevelSettings::default());
        let mut out = LevelOutput::default();
        level.enter(&SessionContext::default(), &mut out);
        assert_eq!(out.narration, vec![NarrationRequest::Play(NarrationCue::Intro)]);
        level
    }

    fn key(level: &mut WelcomeLevel, input: InputSnapshot) -> LevelOutput {
        let mut out = LevelOutput::default();
        level.tick(&input, 0.016, &mut out);
        out
    }

    fn typed(text: &str) -> InputSnapshot {
        InputSnapshot {
            typed: text.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn name_is_capped_and_backspace_erases() {
        let mut level = entered();
        key(&mut level, typed("Bartholomew Montgomery III"));
        assert_eq!(level.name().chars().count(), MAX_NAME_CHARS);
        key(
            &mut level,
            InputSnapshot {
                erase: true,
                ..Default::default()
            },
        );
        assert_eq!(level.name(), "Bartholomew Montgom");
    }

    #[test]
    fn enter_with_blank_name_is_ignored() {
        let mut level = entered();
        key(&mut level, typed("   "));
        key(
            &mut level,
            InputSnapshot {
                submit: true,
                ..Default::default()
            },
        );
        assert_eq!(level.phase(), LevelPhase::Active);
    }

    #[test]
    fn submit_then_space_hands_name_to_session() {
        let mut level = entered();
        key(&mut level, typed("Ada"));
        let out = key(
            &mut level,
            InputSnapshot {
                submit: true,
                ..Default::default()
            },
        );
        assert!(out.transition.is_none());
        assert_eq!(level.phase(), LevelPhase::Completing);
        assert!(level.core().banner().is_some_and(|b| b.starts_with("Fantastic form, Ada!")));

        let out = key(
            &mut level,
            InputSnapshot {
                confirm: true,
                typed: " ".to_string(),
                ..Default::default()
            },
        );
        assert_eq!(out.player_name.as_deref(), Some("Ada"));
        assert_eq!(out.transition, Some(Transition::Next(LevelId::CoreValues)));
    }
}
