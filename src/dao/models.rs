use serde::{Deserialize, Serialize};
use std::time::SystemTime;
use thiserror::Error;

/// The draw counter cannot move past `u32::MAX`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("draw counter exhausted at draw {current_draw_number}")]
pub struct CounterExhausted {
    /// Current draw number of the state that could not advance.
    pub current_draw_number: u32,
}

/// Singleton game-state record persisted by the storage layer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GameStateEntity {
    /// Last draw number that has been completed.
    pub current_draw_number: u32,
    /// Upcoming draw number, always `current_draw_number + 1`.
    pub next_draw_number: u32,
    /// When the upcoming draw is scheduled, if a schedule exists.
    pub next_draw_time: Option<SystemTime>,
    /// Seconds between two consecutive draws.
    pub draw_interval_seconds: u32,
    /// Last time the record was written.
    pub updated_at: SystemTime,
}

impl GameStateEntity {
    /// Compute the state that follows `self` once a draw has been completed at `now`.
    ///
    /// Fails when the new upcoming draw number would not fit the counter.
    pub fn advanced(&self, now: SystemTime) -> Result<Self, CounterExhausted> {
        let exhausted = CounterExhausted {
            current_draw_number: self.current_draw_number,
        };
        let current_draw_number = self.current_draw_number.checked_add(1).ok_or(exhausted)?;
        let next_draw_number = current_draw_number.checked_add(1).ok_or(exhausted)?;
        Ok(Self {
            current_draw_number,
            next_draw_number,
            next_draw_time: Some(
                now + std::time::Duration::from_secs(u64::from(self.draw_interval_seconds)),
            ),
            draw_interval_seconds: self.draw_interval_seconds,
            updated_at: now,
        })
    }
}

/// Persisted wheel color.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ColorEntity {
    Red,
    Black,
    Green,
}

/// How the winning number of a draw was produced.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DrawSourceEntity {
    /// Entered by an administrator after the fact.
    Manual,
    /// Taken from a pre-set override by the draw cycle.
    Override,
    /// Generated at random by the draw cycle.
    Random,
}

/// Authoritative, append-only result of a single draw.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DrawResultEntity {
    /// Unique draw number.
    pub draw_number: u32,
    /// Winning pocket.
    pub winning_number: u8,
    /// Color of the winning pocket, derived once at recording time.
    pub winning_color: ColorEntity,
    /// When the result was recorded.
    pub draw_time: SystemTime,
    /// Number of bets settled against this draw.
    pub total_bets: u64,
    /// Total staked amount, in minor currency units.
    pub total_stake: u64,
    /// Total paid out amount, in minor currency units.
    pub total_payout: u64,
    /// Origin of the winning number.
    pub source: DrawSourceEntity,
}

/// Admin-forced winning number for a draw that has not happened yet.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DrawOverrideEntity {
    /// Draw the override applies to (unique).
    pub draw_number: u32,
    /// Forced winning pocket.
    pub winning_number: u8,
    /// Color of the forced pocket, reused verbatim when the draw fires.
    pub winning_color: ColorEntity,
    /// Whether an administrator set the value by hand.
    pub is_manual: bool,
    /// Who or what forced the number (`admin`, `manual`, a tool name).
    pub source: String,
    /// Free-text justification kept for auditing.
    pub reason: String,
    /// Last time the override was written.
    pub created_at: SystemTime,
}

/// Filter applied when listing draw results. Every bound is inclusive except `until`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DrawQuery {
    /// Lowest draw number returned.
    pub from_draw: Option<u32>,
    /// Highest draw number returned.
    pub to_draw: Option<u32>,
    /// Earliest draw time returned.
    pub since: Option<SystemTime>,
    /// Draws at or after this time are left out.
    pub until: Option<SystemTime>,
    /// Maximum number of rows returned, newest draw first.
    pub limit: Option<usize>,
}

impl DrawQuery {
    /// Whether `draw` falls inside every bound of the query.
    pub fn matches(&self, draw: &DrawResultEntity) -> bool {
        self.from_draw.is_none_or(|from| draw.draw_number >= from)
            && self.to_draw.is_none_or(|to| draw.draw_number <= to)
            && self.since.is_none_or(|since| draw.draw_time >= since)
            && self.until.is_none_or(|until| draw.draw_time < until)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn draw(draw_number: u32, draw_time: SystemTime) -> DrawResultEntity {
        DrawResultEntity {
            draw_number,
            winning_number: 3,
            winning_color: ColorEntity::Red,
            draw_time,
            total_bets: 0,
            total_stake: 0,
            total_payout: 0,
            source: DrawSourceEntity::Manual,
        }
    }

    #[test]
    fn advancing_keeps_next_one_ahead() {
        let now = SystemTime::UNIX_EPOCH + Duration::from_secs(1_000);
        let state = GameStateEntity {
            current_draw_number: 41,
            next_draw_number: 42,
            next_draw_time: None,
            draw_interval_seconds: 180,
            updated_at: SystemTime::UNIX_EPOCH,
        };

        let next = state.advanced(now).unwrap();
        assert_eq!(next.current_draw_number, 42);
        assert_eq!(next.next_draw_number, 43);
        assert_eq!(next.next_draw_time, Some(now + Duration::from_secs(180)));
        assert_eq!(next.updated_at, now);
    }

    #[test]
    fn advancing_at_the_top_of_the_counter_fails() {
        let state = GameStateEntity {
            current_draw_number: u32::MAX - 1,
            next_draw_number: u32::MAX,
            next_draw_time: None,
            draw_interval_seconds: 180,
            updated_at: SystemTime::UNIX_EPOCH,
        };

        assert_eq!(
            state.advanced(SystemTime::UNIX_EPOCH),
            Err(CounterExhausted {
                current_draw_number: u32::MAX - 1
            })
        );
    }

    #[test]
    fn query_bounds() {
        let base = SystemTime::UNIX_EPOCH + Duration::from_secs(10_000);
        let query = DrawQuery {
            from_draw: Some(5),
            to_draw: Some(9),
            since: Some(base),
            until: Some(base + Duration::from_secs(60)),
            limit: None,
        };

        assert!(query.matches(&draw(5, base)));
        assert!(query.matches(&draw(9, base + Duration::from_secs(59))));
        assert!(!query.matches(&draw(4, base)));
        assert!(!query.matches(&draw(10, base)));
        assert!(!query.matches(&draw(6, base - Duration::from_secs(1))));
        assert!(!query.matches(&draw(6, base + Duration::from_secs(60))));
        assert!(DrawQuery::default().matches(&draw(1, SystemTime::UNIX_EPOCH)));
    }
}
