//! Shop-floor clock. Real seconds map onto game minutes; midnight closes the day.
use serde::{Deserialize, Serialize};

use crate::constants::{HOURS_PER_DAY, MINUTES_PER_HOUR};
use crate::numbers::{f64_to_f32, floor_f64_to_u32};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GameClock {
    hour: u32,
    minute: f32,
    seconds_per_game_hour: f32,
    day_start_hour: u32,
}

impl GameClock {
    #[must_use]
    pub fn new(seconds_per_game_hour: f32, day_start_hour: u32) -> Self {
        let start = day_start_hour.min(HOURS_PER_DAY - 1);
        Self {
            hour: start,
            minute: 0.0,
            seconds_per_game_hour: if seconds_per_game_hour > 0.0 {
                seconds_per_game_hour
            } else {
                1.0
            },
            day_start_hour: start,
        }
    }

    #[must_use]
    pub const fn hour(&self) -> u32 {
        self.hour
    }

    #[must_use]
    pub fn minute(&self) -> u32 {
        u32::try_from(crate::numbers::round_f32_to_i32(self.minute.floor())).unwrap_or(0)
    }

    /// `HH:MM` for the HUD.
    #[must_use]
    pub fn label(&self) -> String {
        format!("{:02}:{:02}", self.hour, self.minute())
    }

    /// Advance by real seconds and return how many midnights passed.
    pub fn advance(&mut self, real_secs: f32) -> u32 {
        if !real_secs.is_finite() || real_secs <= 0.0 {
            return 0;
        }
        let minutes_per_hour = f64::from(MINUTES_PER_HOUR);
        let hours_per_day = f64::from(HOURS_PER_DAY);
        let minutes = f64::from(self.minute)
            + f64::from(real_secs) / f64::from(self.seconds_per_game_hour) * minutes_per_hour;
        let whole_hours = (minutes / minutes_per_hour).floor();
        let hours = f64::from(self.hour) + whole_hours;

        self.minute = f64_to_f32(minutes.rem_euclid(minutes_per_hour));
        self.hour = floor_f64_to_u32(hours.rem_euclid(hours_per_day)).min(HOURS_PER_DAY - 1);
        floor_f64_to_u32(hours / hours_per_day)
    }

    /// Skip straight to opening time of the next day.
    pub fn start_next_morning(&mut self) {
        self.hour = self.day_start_hour;
        self.minute = 0.0;
    }
}
