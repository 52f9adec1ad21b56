use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::get,
};
use axum_valid::Valid;

use crate::{
    dto::{
        analytics::{
            ColorFrequencyResponse, NumberFrequencyResponse, SequenceGapsResponse,
            SettlementSummaryResponse, UpcomingDrawResponse, UpcomingQuery,
        },
        public::{DrawResultResponse, DrawWindowQuery, GameStateResponse},
    },
    error::AppError,
    services::{analytics_service, draw_service, game_state_service},
    state::SharedState,
};

/// Read-only endpoints for displays, cashier screens and dashboards.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/public/state", get(get_state))
        .route("/public/draws", get(list_draws))
        .route("/public/draws/{draw_number}", get(get_draw))
        .route("/public/analytics/numbers", get(number_frequency))
        .route("/public/analytics/colors", get(color_frequency))
        .route("/public/analytics/gaps", get(sequence_gaps))
        .route("/public/analytics/upcoming", get(upcoming_draws))
        .route("/public/analytics/summary", get(settlement_summary))
}

#[utoipa::path(
    get,
    path = "/public/state",
    tag = "public",
    responses(
        (status = 200, description = "Current game state", body = GameStateResponse),
        (status = 409, description = "Game state not seeded yet", body = crate::error::ErrorBody)
    )
)]
/// Current and next draw numbers with the schedule.
pub async fn get_state(
    State(state): State<SharedState>,
) -> Result<Json<GameStateResponse>, AppError> {
    Ok(Json(game_state_service::get_state(&state).await?.into()))
}

#[utoipa::path(
    get,
    path = "/public/draws",
    tag = "public",
    params(DrawWindowQuery),
    responses((status = 200, description = "Recorded draws, newest first", body = [DrawResultResponse]))
)]
/// Draw history filtered by draw number and time range.
pub async fn list_draws(
    State(state): State<SharedState>,
    Valid(Query(window)): Valid<Query<DrawWindowQuery>>,
) -> Result<Json<Vec<DrawResultResponse>>, AppError> {
    let draws = draw_service::list_draws(&state, window.into()).await?;
    Ok(Json(draws.into_iter().map(Into::into).collect()))
}

#[utoipa::path(
    get,
    path = "/public/draws/{draw_number}",
    tag = "public",
    params(("draw_number" = i64, Path, description = "Draw number")),
    responses(
        (status = 200, description = "Recorded draw", body = DrawResultResponse),
        (status = 404, description = "Draw not recorded", body = crate::error::ErrorBody)
    )
)]
/// A single recorded draw.
pub async fn get_draw(
    State(state): State<SharedState>,
    Path(draw_number): Path<i64>,
) -> Result<Json<DrawResultResponse>, AppError> {
    Ok(Json(draw_service::find_draw(&state, draw_number).await?.into()))
}

#[utoipa::path(
    get,
    path = "/public/analytics/numbers",
    tag = "analytics",
    params(DrawWindowQuery),
    responses((status = 200, description = "Hits per pocket, 0 to 36", body = [NumberFrequencyResponse]))
)]
pub async fn number_frequency(
    State(state): State<SharedState>,
    Valid(Query(window)): Valid<Query<DrawWindowQuery>>,
) -> Result<Json<Vec<NumberFrequencyResponse>>, AppError> {
    let table = analytics_service::number_frequency(&state, window.into()).await?;
    Ok(Json(table.into_iter().map(Into::into).collect()))
}

#[utoipa::path(
    get,
    path = "/public/analytics/colors",
    tag = "analytics",
    params(DrawWindowQuery),
    responses((status = 200, description = "Hits per color", body = [ColorFrequencyResponse]))
)]
pub async fn color_frequency(
    State(state): State<SharedState>,
    Valid(Query(window)): Valid<Query<DrawWindowQuery>>,
) -> Result<Json<Vec<ColorFrequencyResponse>>, AppError> {
    let table = analytics_service::color_frequency(&state, window.into()).await?;
    Ok(Json(table.into_iter().map(Into::into).collect()))
}

#[utoipa::path(
    get,
    path = "/public/analytics/gaps",
    tag = "analytics",
    params(DrawWindowQuery),
    responses((status = 200, description = "Missing draw numbers", body = SequenceGapsResponse))
)]
pub async fn sequence_gaps(
    State(state): State<SharedState>,
    Valid(Query(window)): Valid<Query<DrawWindowQuery>>,
) -> Result<Json<SequenceGapsResponse>, AppError> {
    let gaps = analytics_service::sequence_gaps(&state, window.into()).await?;
    Ok(Json(gaps.into()))
}

#[utoipa::path(
    get,
    path = "/public/analytics/upcoming",
    tag = "analytics",
    params(UpcomingQuery),
    responses((status = 200, description = "Scheduled draws", body = [UpcomingDrawResponse]))
)]
pub async fn upcoming_draws(
    State(state): State<SharedState>,
    Valid(Query(query)): Valid<Query<UpcomingQuery>>,
) -> Result<Json<Vec<UpcomingDrawResponse>>, AppError> {
    let upcoming = analytics_service::upcoming_draws(&state, query.count).await?;
    Ok(Json(upcoming.into_iter().map(Into::into).collect()))
}

#[utoipa::path(
    get,
    path = "/public/analytics/summary",
    tag = "analytics",
    params(DrawWindowQuery),
    responses((status = 200, description = "Settlement totals", body = SettlementSummaryResponse))
)]
pub async fn settlement_summary(
    State(state): State<SharedState>,
    Valid(Query(window)): Valid<Query<DrawWindowQuery>>,
) -> Result<Json<SettlementSummaryResponse>, AppError> {
    let summary = analytics_service::settlement_summary(&state, window.into()).await?;
    Ok(Json(summary.into()))
}
