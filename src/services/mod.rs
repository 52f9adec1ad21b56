/// Statistics recomputed from the draw history.
pub mod analytics_service;
/// Picks, records and advances a single draw.
pub mod draw_cycle;
/// Draw result recording and history.
pub mod draw_service;
/// OpenAPI documentation generation.
pub mod documentation;
/// Game state seeding, reads and advances.
pub mod game_state_service;
/// Health check service.
pub mod health_service;
/// Forced winning numbers for upcoming draws.
pub mod override_service;
/// Server-Sent Events message generation.
pub mod sse_events;
/// Server-Sent Events broadcasting service.
pub mod sse_service;
/// Storage connection supervisor toggling degraded mode.
pub mod storage_supervisor;
