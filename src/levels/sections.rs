use bevy::math::{Rect, Vec2};

use super::{
    LevelController, LevelCore, LevelId, LevelOutput, LevelPhase, LevelSettings, Milestone,
    NarrationCue, NarrationRequest, Transition,
};
use crate::director::SessionContext;
use crate::input::InputSnapshot;

pub const SECTION_TITLES: [&str; 6] = [
    "Core Values",
    "Work Schedule",
    "Benefits & Pay",
    "Growth & Development",
    "Security & Safety",
    "Resources & Wrap-up",
];

const COLUMNS: usize = 2;
const ORIGIN: Vec2 = Vec2::new(200.0, 180.0);
const SPACING: Vec2 = Vec2::new(200.0, 100.0);
pub const CARD_SIZE: Vec2 = Vec2::new(180.0, 70.0);

/// Center of the card for 1-based `section`.
pub fn card_center(section: u8) -> Vec2 {
    let index = usize::from(section.saturating_sub(1));
    let col = (index % COLUMNS) as f32;
    let row = (index / COLUMNS) as f32;
    ORIGIN + Vec2::new(col * SPACING.x, row * SPACING.y)
}

/// Section under `pointer`, if any.
pub fn section_at(pointer: Vec2) -> Option<u8> {
    (1..=SECTION_TITLES.len() as u8)
        .find(|&section| Rect::from_center_size(card_center(section), CARD_SIZE).contains(pointer))
}

/// Overview board: hovering a card plays the coach's commentary for it.
pub struct SectionsLevel {
    core: LevelCore,
    hovered: Option<u8>,
}

impl SectionsLevel {
    pub fn new(settings: LevelSettings) -> Self {
        Self {
            core: LevelCore::new(LevelId::Sections, Vec2::new(400.0, 520.0), 0, &[], settings),
            hovered: None,
        }
    }

    pub fn hovered(&self) -> Option<u8> {
        self.hovered
    }
}

impl LevelController for SectionsLevel {
    fn core(&self) -> &LevelCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut LevelCore {
        &mut self.core
    }

    fn enter(&mut self, _session: &SessionContext, out: &mut LevelOutput) {
        self.core
            .show_hint("Hover a section to hear the coach. Press SPACE to start training.", true);
        self.core.activate(out);
    }

    fn tick(&mut self, input: &InputSnapshot, _dt: f32, out: &mut LevelOutput) {
        if self.core.phase() != LevelPhase::Active {
            return;
        }
        let hovered = input.pointer.and_then(section_at);
        if hovered != self.hovered {
            if let Some(section) = hovered {
                out.narration
                    .push(NarrationRequest::Play(NarrationCue::Section(section)));
                out.milestones.push(Milestone::SectionHovered(section));
            }
            self.hovered = hovered;
        }
        if input.confirm {
            self.core.finish(Transition::Next(LevelId::Welcome), out);
        }
    }

    fn hud(&self, session: &SessionContext) -> String {
        format!("{}'s Onboarding Journey", session.display_name())
    }

    fn overlay(&self) -> Option<String> {
        self.hovered
            .map(|section| format!("Now playing: {}", SECTION_TITLES[usize::from(section) - 1]))
    }

    fn shows_player(&self) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hover(level: &mut SectionsLevel, pointer: Option<Vec2>) -> LevelOutput {
        let mut out = LevelOutput::default();
        let input = InputSnapshot {
            pointer,
            ..Default::default()
        };
        level.tick(&input, 0.016, &mut out);
        out
    }

    #[test]
    fn cards_follow_two_column_grid() {
        assert_eq!(card_center(1), Vec2::new(200.0, 180.0));
        assert_eq!(card_center(2), Vec2::new(400.0, 180.0));
        assert_eq!(card_center(6), Vec2::new(400.0, 380.0));
        assert_eq!(section_at(Vec2::new(205.0, 285.0)), Some(3));
        assert_eq!(section_at(Vec2::new(700.0, 100.0)), None);
    }

    #[test]
    fn hovering_plays_each_section_once_per_entry() {
        let mut level = SectionsLevel::new(LevelSettings::default());
        level.enter(&SessionContext::default(), &mut LevelOutput::default());

        let out = hover(&mut level, Some(card_center(4)));
        assert_eq!(
            out.narration,
            vec![NarrationRequest::Play(NarrationCue::Section(4))]
        );
        assert!(hover(&mut level, Some(card_center(4) + Vec2::new(10.0, 5.0)))
            .narration
            .is_empty());
        assert!(hover(&mut level, None).narration.is_empty());
        assert_eq!(level.hovered(), None);

        let out = hover(&mut level, Some(card_center(4)));
        assert_eq!(out.narration.len(), 1);
        assert_eq!(level.overlay().as_deref(), Some("Now playing: Growth & Development"));
    }

    #[test]
    fn confirm_returns_to_welcome() {
        let mut level = SectionsLevel::new(LevelSettings::default());
        level.enter(&SessionContext::default(), &mut LevelOutput::default());
        let mut out = LevelOutput::default();
        let input = InputSnapshot {
            confirm: true,
            ..Default::default()
        };
        level.tick(&input, 0.016, &mut out);
        assert_eq!(out.transition, Some(Transition::Next(LevelId::Welcome)));
        assert_eq!(level.phase(), LevelPhase::Finished);
    }
}
