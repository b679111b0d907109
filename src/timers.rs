use std::time::Duration;

use bevy::time::{Timer, TimerMode};

use crate::level_state::Flag;

/// What a scheduled timer does when it fires. Interpreted by the owning level.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TimerEvent {
    /// Clear a time-boxed mode flag.
    ExpireFlag(Flag),
    /// Advance the simulated office clock by one step.
    AdvanceClock,
    /// Remove the coach's intro hint.
    DismissHint,
    /// Remove the most recent info popup.
    DismissPopup,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerHandle(u64);

struct Scheduled {
    handle: TimerHandle,
    timer: Timer,
    event: TimerEvent,
}

/// One-shot and repeating timers owned by a single level.
#[derive(Default)]
pub struct TimerSet {
    scheduled: Vec<Scheduled>,
    next_handle: u64,
}

impl TimerSet {
    pub fn after(&mut self, secs: f32, event: TimerEvent) -> TimerHandle {
        self.schedule(secs, TimerMode::Once, event)
    }

    pub fn every(&mut self, secs: f32, event: TimerEvent) -> TimerHandle {
        self.schedule(secs, TimerMode::Repeating, event)
    }

    fn schedule(&mut self, secs: f32, mode: TimerMode, event: TimerEvent) -> TimerHandle {
        self.next_handle += 1;
        let handle = TimerHandle(self.next_handle);
        self.scheduled.push(Scheduled {
            handle,
            timer: Timer::from_seconds(secs.max(0.001), mode),
            event,
        });
        handle
    }

    pub fn cancel(&mut self, handle: TimerHandle) -> bool {
        let before = self.scheduled.len();
        self.scheduled.retain(|s| s.handle != handle);
        self.scheduled.len() != before
    }

    /// Cancel everything. Returns how many timers were still pending.
    pub fn cancel_all(&mut self) -> usize {
        let count = self.scheduled.len();
        self.scheduled.clear();
        count
    }

    #[cfg(test)]
    pub fn contains(&self, handle: TimerHandle) -> bool {
        self.scheduled.iter().any(|s| s.handle == handle)
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.scheduled.len()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.scheduled.is_empty()
    }

    /// Advance all timers and return the events that fired, in schedule
    /// order. A repeating timer fires once per elapsed period; finished
    /// one-shots are dropped.
    pub fn tick(&mut self, dt: f32) -> Vec<TimerEvent> {
        let delta = Duration::from_secs_f32(dt.max(0.0));
        let mut fired = Vec::new();
        for scheduled in &mut self.scheduled {
            scheduled.timer.tick(delta);
            for _ in 0..scheduled.timer.times_finished_this_tick() {
                fired.push(scheduled.event);
            }
        }
        self.scheduled
            .retain(|s| s.timer.mode() == TimerMode::Repeating || !s.timer.finished());
        fired
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn one_shot_fires_once_then_is_dropped() {
        let mut timers = TimerSet::default();
        let handle = timers.after(1.0, TimerEvent::DismissHint);
        assert!(timers.tick(0.5).is_empty());
        assert_eq!(timers.tick(0.6), vec![TimerEvent::DismissHint]);
        assert!(!timers.contains(handle));
        assert!(timers.tick(5.0).is_empty());
    }

    #[test]
    fn repeating_timer_fires_every_period() {
        let mut timers = TimerSet::default();
        timers.every(2.0, TimerEvent::AdvanceClock);
        assert!(timers.tick(1.9).is_empty());
        assert_eq!(timers.tick(0.2), vec![TimerEvent::AdvanceClock]);
        assert_eq!(
            timers.tick(4.0),
            vec![TimerEvent::AdvanceClock, TimerEvent::AdvanceClock]
        );
        assert_eq!(timers.len(), 1);
    }

    #[test]
    fn cancelled_timers_never_fire() {
        let mut timers = TimerSet::default();
        let clock = timers.every(2.0, TimerEvent::AdvanceClock);
        timers.after(1.0, TimerEvent::ExpireFlag(Flag::FlexMode));
        assert!(timers.cancel(clock));
        assert!(!timers.cancel(clock));
        assert_eq!(timers.cancel_all(), 1);
        assert!(timers.is_empty());
        assert!(timers.tick(10.0).is_empty());
    }
}
