use mongodb::bson::{DateTime, Document, doc};
use serde::{Deserialize, Serialize};

use super::error::MongoDaoError;
use crate::dao::models::{
    ColorEntity, DrawOverrideEntity, DrawResultEntity, DrawSourceEntity, GameStateEntity,
};

/// Fixed `_id` of the singleton game-state document.
pub const GAME_STATE_ID: &str = "game_state";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoGameStateDocument {
    #[serde(rename = "_id")]
    id: String,
    current_draw_number: i64,
    next_draw_number: i64,
    next_draw_time: Option<DateTime>,
    draw_interval_seconds: i64,
    updated_at: DateTime,
}

impl From<GameStateEntity> for MongoGameStateDocument {
    fn from(value: GameStateEntity) -> Self {
        Self {
            id: GAME_STATE_ID.to_owned(),
            current_draw_number: i64::from(value.current_draw_number),
            next_draw_number: i64::from(value.next_draw_number),
            next_draw_time: value.next_draw_time.map(DateTime::from_system_time),
            draw_interval_seconds: i64::from(value.draw_interval_seconds),
            updated_at: DateTime::from_system_time(value.updated_at),
        }
    }
}

impl TryFrom<MongoGameStateDocument> for GameStateEntity {
    type Error = MongoDaoError;

    fn try_from(value: MongoGameStateDocument) -> Result<Self, Self::Error> {
        Ok(Self {
            current_draw_number: to_u32(&value.id, value.current_draw_number)?,
            next_draw_number: to_u32(&value.id, value.next_draw_number)?,
            next_draw_time: value.next_draw_time.map(DateTime::to_system_time),
            draw_interval_seconds: to_u32(&value.id, value.draw_interval_seconds)?,
            updated_at: value.updated_at.to_system_time(),
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoDrawDocument {
    /// The draw number doubles as primary key so uniqueness is enforced by `_id`.
    #[serde(rename = "_id")]
    draw_number: i64,
    winning_number: i32,
    winning_color: ColorEntity,
    draw_time: DateTime,
    total_bets: i64,
    total_stake: i64,
    total_payout: i64,
    source: DrawSourceEntity,
}

impl From<DrawResultEntity> for MongoDrawDocument {
    fn from(value: DrawResultEntity) -> Self {
        Self {
            draw_number: i64::from(value.draw_number),
            winning_number: i32::from(value.winning_number),
            winning_color: value.winning_color,
            draw_time: DateTime::from_system_time(value.draw_time),
            total_bets: saturating_i64(value.total_bets),
            total_stake: saturating_i64(value.total_stake),
            total_payout: saturating_i64(value.total_payout),
            source: value.source,
        }
    }
}

impl TryFrom<MongoDrawDocument> for DrawResultEntity {
    type Error = MongoDaoError;

    fn try_from(value: MongoDrawDocument) -> Result<Self, Self::Error> {
        let id = format!("draw:{}", value.draw_number);
        Ok(Self {
            draw_number: to_u32(&id, value.draw_number)?,
            winning_number: to_pocket(&id, value.winning_number)?,
            winning_color: value.winning_color,
            draw_time: value.draw_time.to_system_time(),
            total_bets: to_u64(&id, value.total_bets)?,
            total_stake: to_u64(&id, value.total_stake)?,
            total_payout: to_u64(&id, value.total_payout)?,
            source: value.source,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoOverrideDocument {
    #[serde(rename = "_id")]
    draw_number: i64,
    winning_number: i32,
    winning_color: ColorEntity,
    is_manual: bool,
    #[serde(default)]
    source: String,
    #[serde(default)]
    reason: String,
    created_at: DateTime,
}

impl From<DrawOverrideEntity> for MongoOverrideDocument {
    fn from(value: DrawOverrideEntity) -> Self {
        Self {
            draw_number: i64::from(value.draw_number),
            winning_number: i32::from(value.winning_number),
            winning_color: value.winning_color,
            is_manual: value.is_manual,
            source: value.source,
            reason: value.reason,
            created_at: DateTime::from_system_time(value.created_at),
        }
    }
}

impl TryFrom<MongoOverrideDocument> for DrawOverrideEntity {
    type Error = MongoDaoError;

    fn try_from(value: MongoOverrideDocument) -> Result<Self, Self::Error> {
        let id = format!("override:{}", value.draw_number);
        Ok(Self {
            draw_number: to_u32(&id, value.draw_number)?,
            winning_number: to_pocket(&id, value.winning_number)?,
            winning_color: value.winning_color,
            is_manual: value.is_manual,
            source: value.source,
            reason: value.reason,
            created_at: value.created_at.to_system_time(),
        })
    }
}

pub fn doc_id(id: impl Into<mongodb::bson::Bson>) -> Document {
    doc! {"_id": id.into()}
}

fn saturating_i64(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

fn to_u32(id: &str, value: i64) -> Result<u32, MongoDaoError> {
    u32::try_from(value).map_err(|_| MongoDaoError::Malformed {
        id: id.to_owned(),
        reason: "draw counter out of range",
    })
}

fn to_u64(id: &str, value: i64) -> Result<u64, MongoDaoError> {
    u64::try_from(value).map_err(|_| MongoDaoError::Malformed {
        id: id.to_owned(),
        reason: "negative settlement total",
    })
}

fn to_pocket(id: &str, value: i32) -> Result<u8, MongoDaoError> {
    u8::try_from(value).map_err(|_| MongoDaoError::Malformed {
        id: id.to_owned(),
        reason: "winning number out of range",
    })
}
