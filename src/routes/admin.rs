use axum::{
    Json, Router,
    body::Body,
    extract::{Path, State},
    http::Request,
    middleware::{self, Next},
    response::Response,
    routing::{get, post, put},
};
use axum_valid::Valid;
use validator::Validate;

use crate::{
    dto::{
        admin::{
            AdvanceStateRequest, InitStateRequest, InitStateResponse, OverrideStatusResponse,
            RecordDrawRequest, RecordDrawResponse, SetOverrideRequest, SetOverrideResponse,
            SpinResponse, UpdateIntervalRequest,
        },
        public::{DrawResultResponse, GameStateResponse},
    },
    error::AppError,
    services::{draw_cycle, draw_service, game_state_service, override_service},
    state::{SharedState, draw::OverrideNote},
};

const ADMIN_TOKEN_HEADER: &str = "x-admin-token";

/// Admin-only endpoints driving draws, overrides and the game state.
pub fn router(state: SharedState) -> Router<SharedState> {
    Router::new()
        .route("/admin/draws", post(record_draw))
        .route("/admin/draws/spin", post(spin))
        .route("/admin/overrides", post(set_override))
        .route("/admin/overrides/{draw_number}", get(get_override_status))
        .route("/admin/state/init", post(init_state))
        .route("/admin/state/advance", post(advance_state))
        .route("/admin/state/interval", put(update_interval))
        .route_layer(middleware::from_fn_with_state(state, require_admin_token))
}

/// Record the winning number of a draw.
#[utoipa::path(
    post,
    path = "/admin/draws",
    tag = "admin",
    params(("X-Admin-Token" = String, Header, description = "Admin token issued by the /sse/admin stream")),
    request_body = RecordDrawRequest,
    responses(
        (status = 200, description = "Draw recorded", body = RecordDrawResponse),
        (status = 400, description = "Draw or winning number out of range", body = crate::error::ErrorBody),
        (status = 409, description = "Draw already recorded", body = crate::error::ErrorBody)
    )
)]
pub async fn record_draw(
    State(state): State<SharedState>,
    Valid(Json(payload)): Valid<Json<RecordDrawRequest>>,
) -> Result<Json<RecordDrawResponse>, AppError> {
    let totals = payload.totals.map(Into::into).unwrap_or_default();
    let draw = draw_service::record_draw(
        &state,
        payload.draw_number,
        payload.winning_number,
        totals,
    )
    .await?;

    let draw = DrawResultResponse::from(draw);
    Ok(Json(RecordDrawResponse {
        success: true,
        message: format!(
            "Draw #{} recorded: {} {}",
            draw.draw_number, draw.winning_number, draw.winning_color
        ),
        draw,
    }))
}

/// Run the draw cycle for the upcoming draw.
#[utoipa::path(
    post,
    path = "/admin/draws/spin",
    tag = "admin",
    params(("X-Admin-Token" = String, Header, description = "Admin token issued by the /sse/admin stream")),
    responses(
        (status = 200, description = "Draw completed and state advanced", body = SpinResponse),
        (status = 409, description = "Not initialized or raced with another spin", body = crate::error::ErrorBody)
    )
)]
pub async fn spin(State(state): State<SharedState>) -> Result<Json<SpinResponse>, AppError> {
    let outcome = draw_cycle::spin(&state).await?;
    Ok(Json(outcome.into()))
}

/// Set or replace the forced winning number of an upcoming draw.
#[utoipa::path(
    post,
    path = "/admin/overrides",
    tag = "admin",
    params(("X-Admin-Token" = String, Header, description = "Admin token issued by the /sse/admin stream")),
    request_body = SetOverrideRequest,
    responses(
        (status = 200, description = "Override stored", body = SetOverrideResponse),
        (status = 400, description = "Winning number out of range", body = crate::error::ErrorBody),
        (status = 409, description = "Draw already recorded", body = crate::error::ErrorBody)
    )
)]
pub async fn set_override(
    State(state): State<SharedState>,
    Valid(Json(payload)): Valid<Json<SetOverrideRequest>>,
) -> Result<Json<SetOverrideResponse>, AppError> {
    let note = OverrideNote::new(payload.source, payload.reason);
    let record = match payload.draw_number {
        Some(draw_number) => {
            override_service::set_override_with_note(
                &state,
                draw_number,
                payload.winning_number,
                note,
            )
            .await?
        }
        None => {
            override_service::set_next_draw_override(&state, payload.winning_number, note).await?
        }
    };
    Ok(Json(record.into()))
}

/// Inspect the override slot of a draw.
#[utoipa::path(
    get,
    path = "/admin/overrides/{draw_number}",
    tag = "admin",
    params(("X-Admin-Token" = String, Header, description = "Admin token issued by the /sse/admin stream"),
    ("draw_number" = i64, Path, description = "Draw number to inspect")),
    responses((status = 200, description = "Override status", body = OverrideStatusResponse))
)]
pub async fn get_override_status(
    State(state): State<SharedState>,
    Path(draw_number): Path<i64>,
) -> Result<Json<OverrideStatusResponse>, AppError> {
    let status = override_service::override_status(&state, draw_number).await?;
    let draw_number = draw_service::validate_draw_number(draw_number)?;
    Ok(Json(OverrideStatusResponse::from((draw_number, status))))
}

/// Seed the game state if it does not exist yet.
#[utoipa::path(
    post,
    path = "/admin/state/init",
    tag = "admin",
    params(("X-Admin-Token" = String, Header, description = "Admin token issued by the /sse/admin stream")),
    request_body = InitStateRequest,
    responses((status = 200, description = "Game state present", body = InitStateResponse))
)]
pub async fn init_state(
    State(state): State<SharedState>,
    payload: Option<Json<InitStateRequest>>,
) -> Result<Json<InitStateResponse>, AppError> {
    let request = payload.map(|Json(body)| body).unwrap_or_default();
    request.validate()?;
    let (game_state, created) = game_state_service::initialize_state(
        &state,
        request.start_draw_number,
        request.draw_interval_seconds,
    )
    .await?;

    Ok(Json(InitStateResponse {
        created,
        state: game_state.into(),
    }))
}

/// Move the game state to the next draw.
#[utoipa::path(
    post,
    path = "/admin/state/advance",
    tag = "admin",
    params(("X-Admin-Token" = String, Header, description = "Admin token issued by the /sse/admin stream")),
    request_body = AdvanceStateRequest,
    responses(
        (status = 200, description = "State advanced", body = GameStateResponse),
        (status = 409, description = "Another caller advanced first", body = crate::error::ErrorBody)
    )
)]
pub async fn advance_state(
    State(state): State<SharedState>,
    payload: Option<Json<AdvanceStateRequest>>,
) -> Result<Json<GameStateResponse>, AppError> {
    let expected = payload.and_then(|Json(body)| body.expected_current);
    let next = match expected {
        Some(expected_current) => {
            game_state_service::advance_draw_from(&state, expected_current).await?
        }
        None => game_state_service::advance_draw(&state).await?,
    };
    Ok(Json(next.into()))
}

/// Change the pause between draws.
#[utoipa::path(
    put,
    path = "/admin/state/interval",
    tag = "admin",
    params(("X-Admin-Token" = String, Header, description = "Admin token issued by the /sse/admin stream")),
    request_body = UpdateIntervalRequest,
    responses((status = 200, description = "Interval updated", body = GameStateResponse))
)]
pub async fn update_interval(
    State(state): State<SharedState>,
    Valid(Json(payload)): Valid<Json<UpdateIntervalRequest>>,
) -> Result<Json<GameStateResponse>, AppError> {
    let updated =
        game_state_service::update_draw_interval(&state, payload.draw_interval_seconds).await?;
    Ok(Json(updated.into()))
}

/// Single authorization check in front of every admin route.
async fn require_admin_token(
    State(state): State<SharedState>,
    req: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let provided = req
        .headers()
        .get(ADMIN_TOKEN_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(|value| value.to_owned())
        .ok_or_else(|| {
            AppError::Unauthorized("missing admin token header `X-Admin-Token`".into())
        })?;

    if state.accepts_admin_token(&provided).await {
        Ok(next.run(req).await)
    } else {
        Err(AppError::Unauthorized("invalid admin token".into()))
    }
}
