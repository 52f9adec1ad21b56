//! DTO definitions used by the admin REST API and documentation layer.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::{
    dto::{
        format_system_time,
        public::{DrawResultResponse, GameStateResponse},
    },
    services::draw_cycle::SpinOutcome,
    state::{
        draw::{BetTotals, OverrideRecord, OverrideStatus},
        wheel::WheelColor,
    },
};

/// Settlement totals supplied when recording a draw. Amounts are minor currency units.
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct BetTotalsInput {
    #[serde(default)]
    pub total_bets: u64,
    #[serde(default)]
    pub total_stake: u64,
    #[serde(default)]
    pub total_payout: u64,
}

impl From<BetTotalsInput> for BetTotals {
    fn from(value: BetTotalsInput) -> Self {
        Self {
            bets: value.total_bets,
            stake: value.total_stake,
            payout: value.total_payout,
        }
    }
}

/// Manually record the result of a draw.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct RecordDrawRequest {
    #[validate(range(min = 1))]
    pub draw_number: i64,
    #[validate(range(min = 0, max = 36))]
    pub winning_number: i64,
    #[serde(default)]
    pub totals: Option<BetTotalsInput>,
}

/// Confirmation returned once a draw has been recorded.
#[derive(Debug, Serialize, ToSchema)]
pub struct RecordDrawResponse {
    pub success: bool,
    pub message: String,
    pub draw: DrawResultResponse,
}

/// Force the winning number of an upcoming draw.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct SetOverrideRequest {
    /// Defaults to the next draw number of the game state.
    #[validate(range(min = 1))]
    pub draw_number: Option<i64>,
    #[validate(range(min = 0, max = 36))]
    pub winning_number: i64,
    /// Who forces the number. Defaults to `admin`.
    #[serde(default)]
    #[validate(length(max = 64))]
    pub source: Option<String>,
    /// Why the number is forced. Defaults to `Set by administrator`.
    #[serde(default)]
    #[validate(length(max = 255))]
    pub reason: Option<String>,
}

/// Stored override for a draw.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct OverrideView {
    pub draw_number: u32,
    pub winning_number: u8,
    pub winning_color: WheelColor,
    pub is_manual: bool,
    pub source: String,
    pub reason: String,
    pub created_at: String,
}

impl From<OverrideRecord> for OverrideView {
    fn from(value: OverrideRecord) -> Self {
        Self {
            draw_number: value.draw_number,
            winning_number: value.winning_number.value(),
            winning_color: value.winning_color,
            is_manual: value.is_manual,
            source: value.note.source,
            reason: value.note.reason,
            created_at: format_system_time(value.created_at),
        }
    }
}

/// `{success, message}` acknowledgement carrying the stored override.
#[derive(Debug, Serialize, ToSchema)]
pub struct SetOverrideResponse {
    pub success: bool,
    pub message: String,
    #[serde(rename = "override")]
    pub record: OverrideView,
}

impl From<OverrideRecord> for SetOverrideResponse {
    fn from(value: OverrideRecord) -> Self {
        Self {
            success: true,
            message: format!(
                "Winning number for draw #{} set to {} ({})",
                value.draw_number, value.winning_number, value.winning_color
            ),
            record: value.into(),
        }
    }
}

/// Lifecycle state of the override slot of a draw.
#[derive(Debug, Clone, Copy, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum OverrideState {
    NoOverride,
    Pending,
    Consumed,
}

/// Override slot of a draw with whichever record backs its state.
#[derive(Debug, Serialize, ToSchema)]
pub struct OverrideStatusResponse {
    pub draw_number: u32,
    pub status: OverrideState,
    #[serde(rename = "override", skip_serializing_if = "Option::is_none")]
    pub record: Option<OverrideView>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub draw: Option<DrawResultResponse>,
}

impl From<(u32, OverrideStatus)> for OverrideStatusResponse {
    fn from((draw_number, status): (u32, OverrideStatus)) -> Self {
        match status {
            OverrideStatus::NoOverride => Self {
                draw_number,
                status: OverrideState::NoOverride,
                record: None,
                draw: None,
            },
            OverrideStatus::Pending(record) => Self {
                draw_number,
                status: OverrideState::Pending,
                record: Some(record.into()),
                draw: None,
            },
            OverrideStatus::Consumed(draw) => Self {
                draw_number,
                status: OverrideState::Consumed,
                record: None,
                draw: Some(draw.into()),
            },
        }
    }
}

/// Seed the game state. Omitted fields use the configured defaults.
#[derive(Debug, Default, Deserialize, ToSchema, Validate)]
pub struct InitStateRequest {
    #[validate(range(min = 1, max = 4_294_967_294u32))]
    pub start_draw_number: Option<u32>,
    #[validate(range(min = 30, max = 300))]
    pub draw_interval_seconds: Option<u32>,
}

/// Game state after seeding and whether this request created it.
#[derive(Debug, Serialize, ToSchema)]
pub struct InitStateResponse {
    pub created: bool,
    pub state: GameStateResponse,
}

/// Advance the game state, optionally guarded by the current draw number the caller observed.
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct AdvanceStateRequest {
    pub expected_current: Option<u32>,
}

/// Change the pause between draws.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct UpdateIntervalRequest {
    #[validate(range(min = 30, max = 300))]
    pub draw_interval_seconds: u32,
}

/// Result of one run of the draw cycle.
#[derive(Debug, Serialize, ToSchema)]
pub struct SpinResponse {
    pub draw: DrawResultResponse,
    pub state: GameStateResponse,
    /// The draw had already been recorded; only the state moved.
    pub resumed: bool,
}

impl From<SpinOutcome> for SpinResponse {
    fn from(value: SpinOutcome) -> Self {
        Self {
            draw: value.draw.into(),
            state: value.state.into(),
            resumed: value.resumed,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::SystemTime;

    use super::*;
    use crate::state::{draw::OverrideNote, wheel::RouletteNumber};

    #[test]
    fn override_ack_shape() {
        let number = RouletteNumber::try_from(22).unwrap();
        let response = SetOverrideResponse::from(OverrideRecord {
            draw_number: 10,
            winning_number: number,
            winning_color: number.color(),
            is_manual: true,
            note: OverrideNote::new(None, Some("jackpot audit".into())),
            created_at: SystemTime::UNIX_EPOCH,
        });

        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["success"], true);
        assert_eq!(json["override"]["winning_number"], 22);
        assert_eq!(json["override"]["winning_color"], "black");
        assert_eq!(json["override"]["source"], "admin");
        assert_eq!(json["override"]["reason"], "jackpot audit");
        assert!(json["message"].as_str().unwrap().contains("#10"));
    }

    #[test]
    fn request_ranges() {
        let out_of_range = RecordDrawRequest {
            draw_number: 5,
            winning_number: 37,
            totals: None,
        };
        assert!(out_of_range.validate().is_err());

        let negative_draw = SetOverrideRequest {
            draw_number: Some(-1),
            winning_number: 3,
            source: None,
            reason: None,
        };
        assert!(negative_draw.validate().is_err());

        let interval = UpdateIntervalRequest {
            draw_interval_seconds: 20,
        };
        assert!(interval.validate().is_err());

        let top_of_counter = InitStateRequest {
            start_draw_number: Some(u32::MAX),
            draw_interval_seconds: None,
        };
        assert!(top_of_counter.validate().is_err());

        let last_start = InitStateRequest {
            start_draw_number: Some(u32::MAX - 1),
            draw_interval_seconds: None,
        };
        assert!(last_start.validate().is_ok());
    }
}
