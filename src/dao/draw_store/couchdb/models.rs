use std::time::SystemTime;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::error::CouchDaoError;
use crate::{
    dao::models::{
        ColorEntity, DrawOverrideEntity, DrawResultEntity, DrawSourceEntity, GameStateEntity,
    },
    state::wheel::MAX_NUMBER,
};

pub const GAME_STATE_DOC_ID: &str = "state::game";
pub const DRAW_PREFIX: &str = "draw::";
pub const OVERRIDE_PREFIX: &str = "override::";
pub const END_SUFFIX: &str = "\u{ffff}";

#[derive(Debug, Deserialize)]
pub struct AllDocsResponse {
    pub rows: Vec<AllDocsRow>,
}

#[derive(Debug, Deserialize)]
pub struct AllDocsRow {
    #[serde(default)]
    pub doc: Option<Value>,
}

/// Draw numbers are zero-padded so `_all_docs` key order matches numeric order.
pub fn draw_doc_id(draw_number: u32) -> String {
    format!("{DRAW_PREFIX}{draw_number:010}")
}

pub fn override_doc_id(draw_number: u32) -> String {
    format!("{OVERRIDE_PREFIX}{draw_number:010}")
}

fn check_pocket(doc_id: &str, number: u8) -> Result<u8, CouchDaoError> {
    if number > MAX_NUMBER {
        return Err(CouchDaoError::Malformed {
            doc_id: doc_id.to_owned(),
            reason: "winning number out of range",
        });
    }
    Ok(number)
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CouchGameStateDocument {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(rename = "_rev", skip_serializing_if = "Option::is_none")]
    pub rev: Option<String>,
    pub current_draw_number: u32,
    pub next_draw_number: u32,
    pub next_draw_time: Option<SystemTime>,
    pub draw_interval_seconds: u32,
    pub updated_at: SystemTime,
}

impl From<(GameStateEntity, Option<String>)> for CouchGameStateDocument {
    fn from((state, rev): (GameStateEntity, Option<String>)) -> Self {
        Self {
            id: GAME_STATE_DOC_ID.to_owned(),
            rev,
            current_draw_number: state.current_draw_number,
            next_draw_number: state.next_draw_number,
            next_draw_time: state.next_draw_time,
            draw_interval_seconds: state.draw_interval_seconds,
            updated_at: state.updated_at,
        }
    }
}

impl From<CouchGameStateDocument> for GameStateEntity {
    fn from(doc: CouchGameStateDocument) -> Self {
        Self {
            current_draw_number: doc.current_draw_number,
            next_draw_number: doc.next_draw_number,
            next_draw_time: doc.next_draw_time,
            draw_interval_seconds: doc.draw_interval_seconds,
            updated_at: doc.updated_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CouchDrawDocument {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(rename = "_rev", skip_serializing_if = "Option::is_none")]
    pub rev: Option<String>,
    pub draw_number: u32,
    pub winning_number: u8,
    pub winning_color: ColorEntity,
    pub draw_time: SystemTime,
    pub total_bets: u64,
    pub total_stake: u64,
    pub total_payout: u64,
    pub source: DrawSourceEntity,
}

impl From<DrawResultEntity> for CouchDrawDocument {
    fn from(draw: DrawResultEntity) -> Self {
        Self {
            id: draw_doc_id(draw.draw_number),
            rev: None,
            draw_number: draw.draw_number,
            winning_number: draw.winning_number,
            winning_color: draw.winning_color,
            draw_time: draw.draw_time,
            total_bets: draw.total_bets,
            total_stake: draw.total_stake,
            total_payout: draw.total_payout,
            source: draw.source,
        }
    }
}

impl TryFrom<CouchDrawDocument> for DrawResultEntity {
    type Error = CouchDaoError;

    fn try_from(doc: CouchDrawDocument) -> Result<Self, Self::Error> {
        Ok(Self {
            draw_number: doc.draw_number,
            winning_number: check_pocket(&doc.id, doc.winning_number)?,
            winning_color: doc.winning_color,
            draw_time: doc.draw_time,
            total_bets: doc.total_bets,
            total_stake: doc.total_stake,
            total_payout: doc.total_payout,
            source: doc.source,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CouchOverrideDocument {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(rename = "_rev", skip_serializing_if = "Option::is_none")]
    pub rev: Option<String>,
    pub draw_number: u32,
    pub winning_number: u8,
    pub winning_color: ColorEntity,
    pub is_manual: bool,
    #[serde(default)]
    pub source: String,
    #[serde(default)]
    pub reason: String,
    pub created_at: SystemTime,
}

impl From<(DrawOverrideEntity, Option<String>)> for CouchOverrideDocument {
    fn from((entry, rev): (DrawOverrideEntity, Option<String>)) -> Self {
        Self {
            id: override_doc_id(entry.draw_number),
            rev,
            draw_number: entry.draw_number,
            winning_number: entry.winning_number,
            winning_color: entry.winning_color,
            is_manual: entry.is_manual,
            source: entry.source,
            reason: entry.reason,
            created_at: entry.created_at,
        }
    }
}

impl TryFrom<CouchOverrideDocument> for DrawOverrideEntity {
    type Error = CouchDaoError;

    fn try_from(doc: CouchOverrideDocument) -> Result<Self, Self::Error> {
        Ok(Self {
            draw_number: doc.draw_number,
            winning_number: check_pocket(&doc.id, doc.winning_number)?,
            winning_color: doc.winning_color,
            is_manual: doc.is_manual,
            source: doc.source,
            reason: doc.reason,
            created_at: doc.created_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn draw_ids_sort_numerically() {
        assert_eq!(draw_doc_id(7), "draw::0000000007");
        assert!(draw_doc_id(9) < draw_doc_id(10));
        assert!(override_doc_id(99) < override_doc_id(100));
    }

    #[test]
    fn out_of_range_pocket_is_rejected() {
        let doc = CouchDrawDocument {
            id: draw_doc_id(1),
            rev: Some("1-a".into()),
            draw_number: 1,
            winning_number: 40,
            winning_color: ColorEntity::Red,
            draw_time: SystemTime::UNIX_EPOCH,
            total_bets: 0,
            total_stake: 0,
            total_payout: 0,
            source: DrawSourceEntity::Manual,
        };
        let err = DrawResultEntity::try_from(doc).unwrap_err();
        assert!(matches!(err, CouchDaoError::Malformed { .. }));
    }

    #[test]
    fn override_document_carries_audit_fields() {
        let entry = DrawOverrideEntity {
            draw_number: 10,
            winning_number: 22,
            winning_color: ColorEntity::Black,
            is_manual: true,
            source: "floor".into(),
            reason: "calibration".into(),
            created_at: SystemTime::UNIX_EPOCH,
        };
        let doc = CouchOverrideDocument::from((entry.clone(), Some("3-c".into())));
        let json = serde_json::to_value(&doc).unwrap();
        assert_eq!(json["_id"], override_doc_id(10));
        assert_eq!(json["source"], "floor");
        assert_eq!(json["reason"], "calibration");
        assert_eq!(DrawOverrideEntity::try_from(doc).unwrap(), entry);
    }

    #[test]
    fn state_document_keeps_revision() {
        let state = GameStateEntity {
            current_draw_number: 3,
            next_draw_number: 4,
            next_draw_time: None,
            draw_interval_seconds: 60,
            updated_at: SystemTime::UNIX_EPOCH,
        };
        let doc = CouchGameStateDocument::from((state.clone(), Some("2-b".into())));
        let json = serde_json::to_value(&doc).unwrap();
        assert_eq!(json["_id"], GAME_STATE_DOC_ID);
        assert_eq!(json["_rev"], "2-b");
        assert_eq!(GameStateEntity::from(doc), state);
    }
}
