use utoipa::OpenApi;

#[derive(OpenApi)]
/// Aggregated OpenAPI specification for Roulette Back.
#[openapi(
    paths(
        crate::routes::health::healthcheck,
        crate::routes::sse::public_stream,
        crate::routes::sse::admin_stream,
        crate::routes::public::get_state,
        crate::routes::public::list_draws,
        crate::routes::public::get_draw,
        crate::routes::public::number_frequency,
        crate::routes::public::color_frequency,
        crate::routes::public::sequence_gaps,
        crate::routes::public::upcoming_draws,
        crate::routes::public::settlement_summary,
        crate::routes::admin::record_draw,
        crate::routes::admin::spin,
        crate::routes::admin::set_override,
        crate::routes::admin::get_override_status,
        crate::routes::admin::init_state,
        crate::routes::admin::advance_state,
        crate::routes::admin::update_interval,
    ),
    components(
        schemas(
            crate::error::ErrorBody,
            crate::dto::health::HealthResponse,
            crate::dto::sse::Handshake,
            crate::dto::sse::SystemStatus,
            crate::dto::public::GameStateResponse,
            crate::dto::public::DrawResultResponse,
            crate::dto::admin::OverrideView,
            crate::dto::admin::OverrideState,
            crate::state::wheel::WheelColor,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "sse", description = "Server-sent events streams"),
        (name = "public", description = "Game state and draw history"),
        (name = "analytics", description = "Aggregates computed from draw history"),
        (name = "admin", description = "Draw recording, overrides and game state control"),
    )
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_route_is_documented() {
        let doc = ApiDoc::openapi();
        for path in [
            "/public/draws/{draw_number}",
            "/admin/overrides",
            "/admin/state/advance",
            "/public/analytics/gaps",
            "/sse/admin",
        ] {
            assert!(doc.paths.paths.contains_key(path), "missing {path}");
        }
    }
}
