//! Aggregated OpenAPI document.

use utoipa::OpenApi;

#[derive(OpenApi)]
/// Aggregated OpenAPI specification for the charades backend.
#[openapi(
    paths(
        crate::routes::health::healthcheck,
        crate::routes::sse::public_stream,
        crate::routes::intents::register,
        crate::routes::intents::answer,
        crate::routes::intents::replay,
        crate::routes::intents::end,
        crate::routes::public::get_state,
        crate::routes::public::get_player,
    ),
    components(
        schemas(
            crate::dto::health::HealthResponse,
            crate::dto::intents::RegisterIntentRequest,
            crate::dto::intents::AnswerIntentRequest,
            crate::dto::intents::ActionResponse,
            crate::dto::public::StateResponse,
            crate::dto::public::PlayerSummary,
            crate::dto::common::PhaseKind,
            crate::dto::common::SessionPhaseSnapshot,
            crate::dto::common::AnswerSummary,
            crate::dto::sse::RoundPresentedEvent,
            crate::dto::sse::ClockTickEvent,
            crate::dto::sse::RoundReplayEvent,
            crate::dto::sse::SessionResultEvent,
            crate::dto::sse::SystemStatus,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "sse", description = "Server-sent events stream"),
        (name = "intents", description = "UI-originated game intents"),
        (name = "public", description = "Read-only state and player lookups"),
    )
)]
pub struct ApiDoc;
