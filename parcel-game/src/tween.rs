//! Cosmetic tick-driven tweens (cushion fill, tape stretch).
//!
//! Tweens never hold simulation state. Transitions are applied first and the
//! tween only animates towards the new look, so any tween can be cancelled or
//! restarted at any point.
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::ids::ContainerId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TweenChannel {
    CushionFill,
    TapeStretch,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Tween {
    from: f32,
    to: f32,
    duration: f32,
    elapsed: f32,
}

impl Tween {
    #[must_use]
    pub fn new(from: f32, to: f32, duration_secs: f32) -> Self {
        Self {
            from,
            to,
            duration: duration_secs.max(0.0),
            elapsed: 0.0,
        }
    }

    pub fn advance(&mut self, dt_secs: f32) {
        if dt_secs.is_finite() && dt_secs > 0.0 {
            self.elapsed = (self.elapsed + dt_secs).min(self.duration);
        }
    }

    #[must_use]
    pub fn progress(&self) -> f32 {
        if self.duration <= 0.0 {
            1.0
        } else {
            (self.elapsed / self.duration).clamp(0.0, 1.0)
        }
    }

    #[must_use]
    pub fn value(&self) -> f32 {
        (self.to - self.from).mul_add(self.progress(), self.from)
    }

    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.progress() >= 1.0
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TweenBoard {
    active: BTreeMap<(ContainerId, TweenChannel), Tween>,
}

impl TweenBoard {
    /// Start a tween, replacing whatever was running on the same channel.
    pub fn start(&mut self, container: ContainerId, channel: TweenChannel, tween: Tween) {
        self.active.insert((container, channel), tween);
    }

    #[must_use]
    pub fn value(&self, container: ContainerId, channel: TweenChannel) -> Option<f32> {
        self.active.get(&(container, channel)).map(Tween::value)
    }

    pub fn cancel(&mut self, container: ContainerId, channel: TweenChannel) -> bool {
        self.active.remove(&(container, channel)).is_some()
    }

    pub fn cancel_container(&mut self, container: ContainerId) {
        self.active.retain(|(id, _), _| *id != container);
    }

    /// Step every tween and drop the finished ones, returning their keys.
    pub fn advance(&mut self, dt_secs: f32) -> Vec<(ContainerId, TweenChannel)> {
        let mut finished = Vec::new();
        for (key, tween) in &mut self.active {
            tween.advance(dt_secs);
            if tween.is_finished() {
                finished.push(*key);
            }
        }
        for key in &finished {
            self.active.remove(key);
        }
        finished
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.active.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.active.is_empty()
    }
}
