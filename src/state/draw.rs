//! Domain view of the game state, draw results and next-draw overrides.

use std::time::{Duration, SystemTime};

use crate::{
    dao::models::{
        ColorEntity, DrawOverrideEntity, DrawResultEntity, DrawSourceEntity, GameStateEntity,
    },
    state::wheel::{InvalidNumber, RouletteNumber, WheelColor},
};

/// Shortest allowed pause between two draws.
pub const MIN_DRAW_INTERVAL_SECONDS: u32 = 30;
/// Longest allowed pause between two draws.
pub const MAX_DRAW_INTERVAL_SECONDS: u32 = 300;
/// Largest draw number a fresh state may start at; the counter needs room for `next`.
pub const MAX_START_DRAW_NUMBER: u32 = u32::MAX - 1;

/// Snapshot of the singleton game state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameState {
    /// Last completed draw; `0` before the first one.
    pub current_draw_number: u32,
    /// Draw the cycle will run next. Always `current_draw_number + 1`.
    pub next_draw_number: u32,
    /// When the next draw is due, if scheduled.
    pub next_draw_time: Option<SystemTime>,
    pub draw_interval_seconds: u32,
    pub updated_at: SystemTime,
}

impl GameState {
    /// Fresh state whose first upcoming draw is `start_draw_number`.
    pub fn seed(start_draw_number: u32, draw_interval_seconds: u32, now: SystemTime) -> Self {
        let current_draw_number = start_draw_number.saturating_sub(1);
        Self {
            current_draw_number,
            next_draw_number: current_draw_number + 1,
            next_draw_time: Some(now + Duration::from_secs(u64::from(draw_interval_seconds))),
            draw_interval_seconds,
            updated_at: now,
        }
    }

    /// Pause between two draws.
    pub fn draw_interval(&self) -> Duration {
        Duration::from_secs(u64::from(self.draw_interval_seconds))
    }
}

impl From<GameStateEntity> for GameState {
    fn from(value: GameStateEntity) -> Self {
        Self {
            current_draw_number: value.current_draw_number,
            next_draw_number: value.next_draw_number,
            next_draw_time: value.next_draw_time,
            draw_interval_seconds: value.draw_interval_seconds,
            updated_at: value.updated_at,
        }
    }
}

impl From<GameState> for GameStateEntity {
    fn from(value: GameState) -> Self {
        Self {
            current_draw_number: value.current_draw_number,
            next_draw_number: value.next_draw_number,
            next_draw_time: value.next_draw_time,
            draw_interval_seconds: value.draw_interval_seconds,
            updated_at: value.updated_at,
        }
    }
}

/// Where a winning number came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrawSource {
    /// Recorded by an administrator through the admin API.
    Manual,
    /// Drawn by the cycle from a pending override.
    Override,
    /// Drawn by the cycle at random.
    Random,
}

impl DrawSource {
    /// Lowercase name used in responses and log fields.
    pub fn as_str(self) -> &'static str {
        match self {
            DrawSource::Manual => "manual",
            DrawSource::Override => "override",
            DrawSource::Random => "random",
        }
    }
}

/// Settlement totals attached to a draw. Amounts are in minor currency units.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BetTotals {
    /// Number of bets settled.
    pub bets: u64,
    pub stake: u64,
    pub payout: u64,
}

/// Recorded, immutable outcome of a draw.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DrawResult {
    pub draw_number: u32,
    pub winning_number: RouletteNumber,
    /// Derived from `winning_number` when the draw was recorded.
    pub winning_color: WheelColor,
    /// When the result was recorded.
    pub draw_time: SystemTime,
    pub totals: BetTotals,
    pub source: DrawSource,
}

/// Source recorded when the caller does not name one.
pub const DEFAULT_OVERRIDE_SOURCE: &str = "admin";
/// Reason recorded when the caller does not give one.
pub const DEFAULT_OVERRIDE_REASON: &str = "Set by administrator";

/// Audit trail attached to an override: who forced the number and why.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OverrideNote {
    /// Who forced the number, `admin` unless named.
    pub source: String,
    /// Free-text justification kept with the override.
    pub reason: String,
}

impl OverrideNote {
    /// Build a note, falling back to the defaults for missing or blank values.
    pub fn new(source: Option<String>, reason: Option<String>) -> Self {
        let non_blank = |value: Option<String>| {
            value
                .map(|text| text.trim().to_owned())
                .filter(|text| !text.is_empty())
        };
        Self {
            source: non_blank(source).unwrap_or_else(|| DEFAULT_OVERRIDE_SOURCE.to_owned()),
            reason: non_blank(reason).unwrap_or_else(|| DEFAULT_OVERRIDE_REASON.to_owned()),
        }
    }
}

impl Default for OverrideNote {
    fn default() -> Self {
        Self::new(None, None)
    }
}

/// Winning number forced by an administrator for an upcoming draw.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OverrideRecord {
    pub draw_number: u32,
    pub winning_number: RouletteNumber,
    /// Reused verbatim when the draw fires.
    pub winning_color: WheelColor,
    /// Set by hand rather than by a tool.
    pub is_manual: bool,
    pub note: OverrideNote,
    /// Last time the override was written; replacing it refreshes this.
    pub created_at: SystemTime,
}

/// Lifecycle of the override slot for a single draw number.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OverrideStatus {
    /// Nothing has been set; the draw cycle will pick at random.
    NoOverride,
    /// An override is waiting for the draw to fire. It can still be replaced.
    Pending(OverrideRecord),
    /// The draw has been recorded. Terminal.
    Consumed(DrawResult),
}

impl From<ColorEntity> for WheelColor {
    fn from(value: ColorEntity) -> Self {
        match value {
            ColorEntity::Red => WheelColor::Red,
            ColorEntity::Black => WheelColor::Black,
            ColorEntity::Green => WheelColor::Green,
        }
    }
}

impl From<WheelColor> for ColorEntity {
    fn from(value: WheelColor) -> Self {
        match value {
            WheelColor::Red => ColorEntity::Red,
            WheelColor::Black => ColorEntity::Black,
            WheelColor::Green => ColorEntity::Green,
        }
    }
}

impl From<DrawSourceEntity> for DrawSource {
    fn from(value: DrawSourceEntity) -> Self {
        match value {
            DrawSourceEntity::Manual => DrawSource::Manual,
            DrawSourceEntity::Override => DrawSource::Override,
            DrawSourceEntity::Random => DrawSource::Random,
        }
    }
}

impl From<DrawSource> for DrawSourceEntity {
    fn from(value: DrawSource) -> Self {
        match value {
            DrawSource::Manual => DrawSourceEntity::Manual,
            DrawSource::Override => DrawSourceEntity::Override,
            DrawSource::Random => DrawSourceEntity::Random,
        }
    }
}

impl TryFrom<DrawResultEntity> for DrawResult {
    type Error = InvalidNumber;

    fn try_from(value: DrawResultEntity) -> Result<Self, Self::Error> {
        Ok(Self {
            draw_number: value.draw_number,
            winning_number: RouletteNumber::try_from(i64::from(value.winning_number))?,
            // Stored color is authoritative; it was derived once when the draw was written.
            winning_color: value.winning_color.into(),
            draw_time: value.draw_time,
            totals: BetTotals {
                bets: value.total_bets,
                stake: value.total_stake,
                payout: value.total_payout,
            },
            source: value.source.into(),
        })
    }
}

impl From<DrawResult> for DrawResultEntity {
    fn from(value: DrawResult) -> Self {
        Self {
            draw_number: value.draw_number,
            winning_number: value.winning_number.value(),
            winning_color: value.winning_color.into(),
            draw_time: value.draw_time,
            total_bets: value.totals.bets,
            total_stake: value.totals.stake,
            total_payout: value.totals.payout,
            source: value.source.into(),
        }
    }
}

impl TryFrom<DrawOverrideEntity> for OverrideRecord {
    type Error = InvalidNumber;

    fn try_from(value: DrawOverrideEntity) -> Result<Self, Self::Error> {
        Ok(Self {
            draw_number: value.draw_number,
            winning_number: RouletteNumber::try_from(i64::from(value.winning_number))?,
            winning_color: value.winning_color.into(),
            is_manual: value.is_manual,
            note: OverrideNote::new(Some(value.source), Some(value.reason)),
            created_at: value.created_at,
        })
    }
}

impl From<OverrideRecord> for DrawOverrideEntity {
    fn from(value: OverrideRecord) -> Self {
        Self {
            draw_number: value.draw_number,
            winning_number: value.winning_number.value(),
            winning_color: value.winning_color.into(),
            is_manual: value.is_manual,
            source: value.note.source,
            reason: value.note.reason,
            created_at: value.created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seed_points_next_draw_at_start() {
        let now = SystemTime::UNIX_EPOCH + Duration::from_secs(500);
        let state = GameState::seed(1, 180, now);
        assert_eq!(state.current_draw_number, 0);
        assert_eq!(state.next_draw_number, 1);
        assert_eq!(state.next_draw_time, Some(now + Duration::from_secs(180)));

        let resumed = GameState::seed(1_200, 60, now);
        assert_eq!(resumed.current_draw_number, 1_199);
        assert_eq!(resumed.next_draw_number, 1_200);
    }

    #[test]
    fn stored_color_survives_conversion() {
        let entity = DrawResultEntity {
            draw_number: 9,
            winning_number: 17,
            winning_color: ColorEntity::Black,
            draw_time: SystemTime::UNIX_EPOCH,
            total_bets: 4,
            total_stake: 2_000,
            total_payout: 0,
            source: DrawSourceEntity::Override,
        };
        let draw = DrawResult::try_from(entity.clone()).unwrap();
        assert_eq!(draw.winning_color, WheelColor::Black);
        assert_eq!(draw.source, DrawSource::Override);
        assert_eq!(draw.totals.stake, 2_000);
        assert_eq!(DrawResultEntity::from(draw), entity);
    }

    #[test]
    fn corrupt_pocket_is_rejected() {
        let entity = DrawOverrideEntity {
            draw_number: 3,
            winning_number: 99,
            winning_color: ColorEntity::Red,
            is_manual: true,
            source: DEFAULT_OVERRIDE_SOURCE.into(),
            reason: DEFAULT_OVERRIDE_REASON.into(),
            created_at: SystemTime::UNIX_EPOCH,
        };
        assert_eq!(OverrideRecord::try_from(entity), Err(InvalidNumber(99)));
    }

    #[test]
    fn blank_note_falls_back_to_defaults() {
        let note = OverrideNote::new(Some("  ".into()), None);
        assert_eq!(note, OverrideNote::default());
        assert_eq!(note.source, "admin");
        assert_eq!(note.reason, "Set by administrator");

        let named = OverrideNote::new(Some("floor".into()), Some("rigged wheel test".into()));
        assert_eq!(named.source, "floor");
        assert_eq!(named.reason, "rigged wheel test");
    }

    #[test]
    fn stored_override_without_note_reads_defaults() {
        let entity = DrawOverrideEntity {
            draw_number: 4,
            winning_number: 7,
            winning_color: ColorEntity::Red,
            is_manual: true,
            source: String::new(),
            reason: String::new(),
            created_at: SystemTime::UNIX_EPOCH,
        };
        let record = OverrideRecord::try_from(entity).unwrap();
        assert_eq!(record.note, OverrideNote::default());
    }
}
