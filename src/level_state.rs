use std::collections::{HashMap, HashSet};

use bevy::math::Vec2;
use serde::Serialize;

use crate::physics::Body;
use crate::timers::TimerSet;

/// Stable identifier of a collectible within its level.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct ItemId(pub &'static str);

/// Session-local boolean conditions toggled or consumed by gameplay.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Flag {
    /// Protection against one "late" hazard.
    SlackToken,
    /// Protection against one "late" hazard.
    EmailToken,
    /// Remote-work bonus mode.
    FlexMode,
    /// Doubles benefit pickup points while the enrollment window is open.
    EnrollmentWindow,
    /// Protection against one phishing hazard.
    MfaShield,
}

/// Mutable per-level state. Owned and mutated by exactly one level.
pub struct LevelState {
    pub score: i64,
    pub player: Body,
    pub timers: TimerSet,
    spawn: Vec2,
    collected: HashSet<ItemId>,
    total_items: usize,
    flags: HashMap<Flag, bool>,
}

impl LevelState {
    pub fn new(spawn: Vec2, total_items: usize) -> Self {
        Self {
            score: 0,
            player: Body::at(spawn),
            timers: TimerSet::default(),
            spawn,
            collected: HashSet::new(),
            total_items,
            flags: HashMap::new(),
        }
    }

    pub fn respawn(&mut self) {
        self.player.reset_to(self.spawn);
    }

    /// Record `item` as collected. Returns false if it already was, or if
    /// the level has no room left for it.
    pub fn collect(&mut self, item: ItemId) -> bool {
        if self.collected.len() >= self.total_items {
            return false;
        }
        self.collected.insert(item)
    }

    pub fn has_collected(&self, item: ItemId) -> bool {
        self.collected.contains(&item)
    }

    pub fn collected_count(&self) -> usize {
        self.collected.len()
    }

    pub fn total_items(&self) -> usize {
        self.total_items
    }

    pub fn all_collected(&self) -> bool {
        self.total_items > 0 && self.collected.len() == self.total_items
    }

    pub fn collected_items(&self) -> Vec<ItemId> {
        let mut items: Vec<ItemId> = self.collected.iter().copied().collect();
        items.sort();
        items
    }

    pub fn flag(&self, flag: Flag) -> bool {
        self.flags.get(&flag).copied().unwrap_or(false)
    }

    pub fn set_flag(&mut self, flag: Flag, value: bool) {
        self.flags.insert(flag, value);
    }

    /// Clear the first set flag in `candidates` and return it.
    pub fn consume_first(&mut self, candidates: &[Flag]) -> Option<Flag> {
        let flag = candidates.iter().copied().find(|f| self.flag(*f))?;
        self.set_flag(flag, false);
        Some(flag)
    }

    pub fn active_flags(&self) -> Vec<Flag> {
        let mut flags: Vec<Flag> = self
            .flags
            .iter()
            .filter(|(_, set)| **set)
            .map(|(flag, _)| *flag)
            .collect();
        flags.sort();
        flags
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collected_items_never_exceed_total() {
        let mut state = LevelState::new(Vec2::ZERO, 2);
        assert!(state.collect(ItemId("a")));
        assert!(!state.collect(ItemId("a")));
        assert!(state.collect(ItemId("b")));
        assert!(!state.collect(ItemId("c")));
        assert_eq!(state.collected_count(), 2);
        assert!(state.all_collected());
    }

    #[test]
    fn consume_first_prefers_listed_order() {
        let mut state = LevelState::new(Vec2::ZERO, 0);
        state.set_flag(Flag::SlackToken, true);
        state.set_flag(Flag::EmailToken, true);
        let shields = [Flag::SlackToken, Flag::EmailToken];
        assert_eq!(state.consume_first(&shields), Some(Flag::SlackToken));
        assert_eq!(state.consume_first(&shields), Some(Flag::EmailToken));
        assert_eq!(state.consume_first(&shields), None);
        assert!(state.active_flags().is_empty());
    }

    #[test]
    fn respawn_returns_player_to_spawn_point() {
        let spawn = Vec2::new(50.0, 450.0);
        let mut state = LevelState::new(spawn, 0);
        state.player.position = Vec2::new(300.0, 120.0);
        state.respawn();
        assert_eq!(state.player.position, spawn);
    }
}
