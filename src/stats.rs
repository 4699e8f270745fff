//! Study-streak bookkeeping behind the leaderboard.

use std::path::Path;

use serde::{Deserialize, Serialize};
use time::Date;

use crate::api::LeaderboardSubmission;
use crate::error::StoreError;
use crate::storage;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserStats {
    /// Consecutive active days, including the latest one.
    pub streak: u32,
    /// Questions asked on the latest active day.
    pub daily_questions: u32,
    /// Distinct active days overall.
    pub total_days: u32,
    pub last_active: Option<Date>,
}

impl UserStats {
    /// Counts one question asked on `today`.
    ///
    /// A `today` before `last_active` (clock moved back) counts as the same day.
    pub fn record_question(&mut self, today: Date) {
        let Some(last) = self.last_active else {
            self.streak = 1;
            self.total_days = 1;
            self.daily_questions = 1;
            self.last_active = Some(today);
            return;
        };

        match (today - last).whole_days() {
            ..=0 => self.daily_questions += 1,
            1 => {
                self.streak += 1;
                self.total_days += 1;
                self.daily_questions = 1;
            }
            _ => {
                self.streak = 1;
                self.total_days += 1;
                self.daily_questions = 1;
            }
        }

        self.last_active = Some(today.max(last));
    }

    /// Body for `/leaderboard/submit`.
    #[must_use]
    pub fn submission(&self) -> LeaderboardSubmission {
        LeaderboardSubmission {
            streak: self.streak,
            daily_questions: self.daily_questions,
            total_days: self.total_days,
        }
    }

    /// Loads stats from `path`; missing or undecodable files give zeroed stats.
    #[must_use]
    pub fn load(path: &Path) -> Self {
        storage::read_json_or_default(path)
    }

    /// # Errors
    ///
    /// Returns the I/O or serialization error.
    pub fn save(&self, path: &Path) -> Result<(), StoreError> {
        storage::write_json_atomically(path, self)
    }
}
