use serde::Serialize;
use tracing::warn;

use crate::{
    dto::{
        admin::OverrideView,
        public::{DrawResultResponse, GameStateResponse},
        sse::{ServerEvent, SystemStatus},
    },
    state::{
        SharedState,
        draw::{DrawResult, GameState, OverrideRecord},
    },
};

const EVENT_DRAW_RECORDED: &str = "draw.recorded";
const EVENT_STATE_ADVANCED: &str = "state.advanced";
const EVENT_OVERRIDE_SET: &str = "override.set";
const EVENT_SYSTEM_STATUS: &str = "system_status";

/// Announce a freshly recorded result to displays and the admin console.
pub fn broadcast_draw_recorded(state: &SharedState, draw: &DrawResult) {
    let payload = DrawResultResponse::from(draw.clone());
    send_public_event(state, EVENT_DRAW_RECORDED, &payload);
    send_admin_event(state, EVENT_DRAW_RECORDED, &payload);
}

/// Announce the new current/next draw numbers and schedule.
pub fn broadcast_state_advanced(state: &SharedState, game_state: &GameState) {
    let payload = GameStateResponse::from(game_state.clone());
    send_public_event(state, EVENT_STATE_ADVANCED, &payload);
    send_admin_event(state, EVENT_STATE_ADVANCED, &payload);
}

/// Overrides are only ever sent to the admin stream.
pub fn broadcast_override_set(state: &SharedState, record: &OverrideRecord) {
    let payload = OverrideView::from(record.clone());
    send_admin_event(state, EVENT_OVERRIDE_SET, &payload);
}

/// Broadcast entering or leaving degraded mode.
pub fn broadcast_system_status(state: &SharedState, degraded: bool) {
    let payload = SystemStatus { degraded };
    send_public_event(state, EVENT_SYSTEM_STATUS, &payload);
    send_admin_event(state, EVENT_SYSTEM_STATUS, &payload);
}

fn send_public_event(state: &SharedState, event: &str, payload: &impl Serialize) {
    match ServerEvent::json(Some(event.to_string()), payload) {
        Ok(event) => state.public_sse().broadcast(event),
        Err(err) => warn!(event, error = %err, "failed to serialize public SSE payload"),
    }
}

fn send_admin_event(state: &SharedState, event: &str, payload: &impl Serialize) {
    match ServerEvent::json(Some(event.to_string()), payload) {
        Ok(event) => state.admin_sse().broadcast(event),
        Err(err) => warn!(event, error = %err, "failed to serialize admin SSE payload"),
    }
}
