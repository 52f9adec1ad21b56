//! DTOs for the analytics views computed from draw history.

use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use crate::{
    dto::format_system_time,
    services::analytics_service::{
        ColorFrequency, NumberFrequency, SequenceGaps, SettlementSummary, UpcomingDraw,
    },
    state::wheel::WheelColor,
};

#[derive(Debug, Serialize, ToSchema)]
pub struct NumberFrequencyResponse {
    pub number: u8,
    pub color: WheelColor,
    pub hits: u64,
    /// Most recent draw this number won, if any.
    pub last_draw_number: Option<u32>,
}

impl From<NumberFrequency> for NumberFrequencyResponse {
    fn from(value: NumberFrequency) -> Self {
        Self {
            number: value.number.value(),
            color: value.color,
            hits: value.hits,
            last_draw_number: value.last_draw_number,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ColorFrequencyResponse {
    pub color: WheelColor,
    pub hits: u64,
    pub last_draw_number: Option<u32>,
}

impl From<ColorFrequency> for ColorFrequencyResponse {
    fn from(value: ColorFrequency) -> Self {
        Self {
            color: value.color,
            hits: value.hits,
            last_draw_number: value.last_draw_number,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SequenceGapsResponse {
    pub first_draw_number: Option<u32>,
    pub last_draw_number: Option<u32>,
    pub recorded: u64,
    pub missing_count: u64,
    /// Missing draw numbers in ascending order; may be truncated, see `missing_count`.
    pub missing: Vec<u32>,
}

impl From<SequenceGaps> for SequenceGapsResponse {
    fn from(value: SequenceGaps) -> Self {
        Self {
            first_draw_number: value.first_draw_number,
            last_draw_number: value.last_draw_number,
            recorded: value.recorded,
            missing_count: value.missing_count,
            missing: value.missing,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct UpcomingDrawResponse {
    pub draw_number: u32,
    pub scheduled_at: Option<String>,
}

impl From<UpcomingDraw> for UpcomingDrawResponse {
    fn from(value: UpcomingDraw) -> Self {
        Self {
            draw_number: value.draw_number,
            scheduled_at: value.scheduled_at.map(format_system_time),
        }
    }
}

#[derive(Debug, Deserialize, IntoParams, Validate)]
#[into_params(parameter_in = Query)]
pub struct UpcomingQuery {
    /// How many draws to list.
    #[validate(range(min = 1, max = 100))]
    pub count: Option<usize>,
}

/// Totals over the selected window, in minor currency units.
#[derive(Debug, Serialize, ToSchema)]
pub struct SettlementSummaryResponse {
    pub draws: u64,
    pub total_bets: u64,
    pub total_stake: u64,
    pub total_payout: u64,
    /// Stake minus payout, serialized as a string to survive JSON number limits.
    pub house_result: String,
}

impl From<SettlementSummary> for SettlementSummaryResponse {
    fn from(value: SettlementSummary) -> Self {
        Self {
            draws: value.draws,
            total_bets: value.total_bets,
            total_stake: value.total_stake,
            total_payout: value.total_payout,
            house_result: value.house_result.to_string(),
        }
    }
}
