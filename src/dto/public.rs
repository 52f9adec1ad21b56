//! DTOs returned by the public read-only API and streamed to displays.

use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use crate::{
    dao::models::DrawQuery,
    dto::{
        format_system_time,
        validation::{parse_timestamp, validate_timestamp},
    },
    state::{
        draw::{DrawResult, GameState},
        wheel::WheelColor,
    },
};

/// Current and upcoming draw numbers with the schedule.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct GameStateResponse {
    pub current_draw_number: u32,
    pub next_draw_number: u32,
    /// RFC 3339 time of the next draw, if scheduled.
    pub next_draw_time: Option<String>,
    pub draw_interval_seconds: u32,
    pub updated_at: String,
}

impl From<GameState> for GameStateResponse {
    fn from(value: GameState) -> Self {
        Self {
            current_draw_number: value.current_draw_number,
            next_draw_number: value.next_draw_number,
            next_draw_time: value.next_draw_time.map(format_system_time),
            draw_interval_seconds: value.draw_interval_seconds,
            updated_at: format_system_time(value.updated_at),
        }
    }
}

/// A recorded draw.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct DrawResultResponse {
    pub draw_number: u32,
    pub winning_number: u8,
    pub winning_color: WheelColor,
    pub draw_time: String,
    pub total_bets: u64,
    /// Minor currency units.
    pub total_stake: u64,
    /// Minor currency units.
    pub total_payout: u64,
    /// `manual`, `override` or `random`.
    pub source: String,
}

impl From<DrawResult> for DrawResultResponse {
    fn from(value: DrawResult) -> Self {
        Self {
            draw_number: value.draw_number,
            winning_number: value.winning_number.value(),
            winning_color: value.winning_color,
            draw_time: format_system_time(value.draw_time),
            total_bets: value.totals.bets,
            total_stake: value.totals.stake,
            total_payout: value.totals.payout,
            source: value.source.as_str().to_string(),
        }
    }
}

/// Filters shared by the history listing and the analytics views.
#[derive(Debug, Default, Deserialize, IntoParams, Validate)]
#[into_params(parameter_in = Query)]
pub struct DrawWindowQuery {
    /// Lowest draw number included.
    #[validate(range(min = 1))]
    pub from_draw: Option<u32>,
    /// Highest draw number included.
    #[validate(range(min = 1))]
    pub to_draw: Option<u32>,
    /// RFC 3339 lower bound on the draw time (inclusive).
    #[validate(custom(function = "validate_timestamp"))]
    pub since: Option<String>,
    /// RFC 3339 upper bound on the draw time (exclusive).
    #[validate(custom(function = "validate_timestamp"))]
    pub until: Option<String>,
    /// Maximum number of draws considered, newest first.
    #[validate(range(min = 1))]
    pub limit: Option<usize>,
}

impl From<DrawWindowQuery> for DrawQuery {
    fn from(value: DrawWindowQuery) -> Self {
        Self {
            from_draw: value.from_draw,
            to_draw: value.to_draw,
            since: value.since.as_deref().and_then(parse_timestamp),
            until: value.until.as_deref().and_then(parse_timestamp),
            limit: value.limit,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::{Duration, SystemTime};

    use super::*;
    use crate::state::{
        draw::{BetTotals, DrawSource},
        wheel::RouletteNumber,
    };

    #[test]
    fn draw_payload_shape() {
        let number = RouletteNumber::try_from(36).unwrap();
        let draw = DrawResult {
            draw_number: 5,
            winning_number: number,
            winning_color: number.color(),
            draw_time: SystemTime::UNIX_EPOCH + Duration::from_secs(60),
            totals: BetTotals::default(),
            source: DrawSource::Manual,
        };

        let json = serde_json::to_value(DrawResultResponse::from(draw)).unwrap();
        assert_eq!(json["winning_number"], 36);
        assert_eq!(json["winning_color"], "red");
        assert_eq!(json["draw_time"], "1970-01-01T00:01:00Z");
        assert_eq!(json["source"], "manual");
    }

    #[test]
    fn window_validation_and_conversion() {
        let bad = DrawWindowQuery {
            since: Some("last week".into()),
            ..DrawWindowQuery::default()
        };
        assert!(bad.validate().is_err());

        let zero = DrawWindowQuery {
            from_draw: Some(0),
            ..DrawWindowQuery::default()
        };
        assert!(zero.validate().is_err());

        let good = DrawWindowQuery {
            from_draw: Some(2),
            since: Some("1970-01-01T00:00:10Z".into()),
            limit: Some(5),
            ..DrawWindowQuery::default()
        };
        assert!(good.validate().is_ok());
        let query = DrawQuery::from(good);
        assert_eq!(query.from_draw, Some(2));
        assert_eq!(
            query.since,
            Some(SystemTime::UNIX_EPOCH + Duration::from_secs(10))
        );
        assert_eq!(query.limit, Some(5));
    }
}
