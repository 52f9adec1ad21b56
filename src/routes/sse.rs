use std::convert::Infallible;

use axum::{Router, extract::State, response::sse::Sse, routing::get};
use futures::Stream;
use tracing::info;

use crate::{
    error::AppError,
    services::sse_service::{self, StreamKind},
    state::SharedState,
};

#[utoipa::path(
    get,
    path = "/sse/public",
    tag = "sse",
    responses((status = 200, description = "Recorded draws and state changes", content_type = "text/event-stream", body = String))
)]
/// Stream recorded draws and state changes to displays.
pub async fn public_stream(
    State(state): State<SharedState>,
) -> Sse<impl Stream<Item = Result<axum::response::sse::Event, Infallible>>> {
    let receiver = sse_service::subscribe_public(&state);
    info!("new public SSE connection");
    let greeting = sse_service::handshake(&state, "public", None).await;
    sse_service::to_sse_stream(receiver, StreamKind::Public, greeting)
}

#[utoipa::path(
    get,
    path = "/sse/admin",
    tag = "sse",
    responses(
        (status = 200, description = "Admin stream; the handshake carries the admin token", content_type = "text/event-stream", body = String),
        (status = 401, description = "Another admin stream is already connected", body = crate::error::ErrorBody)
    )
)]
/// Stream admin events, issuing the token required by the admin routes.
pub async fn admin_stream(
    State(state): State<SharedState>,
) -> Result<Sse<impl Stream<Item = Result<axum::response::sse::Event, Infallible>>>, AppError> {
    let (receiver, token) = sse_service::subscribe_admin(&state).await?;
    info!("new admin SSE connection");
    let greeting = sse_service::handshake(&state, "admin", Some(token)).await;
    Ok(sse_service::to_sse_stream(
        receiver,
        StreamKind::Admin(state),
        greeting,
    ))
}

/// Configure the SSE endpoints.
pub fn router() -> Router<SharedState> {
    Router::<SharedState>::new()
        .route("/sse/public", get(public_stream))
        .route("/sse/admin", get(admin_stream))
}
