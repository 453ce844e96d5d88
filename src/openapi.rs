//! OpenAPI documentation for the feed core.

use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Feed Core API",
        version = "1.0.0",
        description = "Personalized feed ranking and playback continuity for short-form video.",
        license(name = "MIT")
    ),
    tags(
        (name = "health", description = "Service health and readiness checks"),
        (name = "feed", description = "Personalized, trending, and editorial feeds"),
        (name = "content", description = "Title and episode lookups, search"),
        (name = "watchlist", description = "Watch history, ratings, and progress"),
    )
)]
pub struct ApiDoc;

impl ApiDoc {
    pub fn title() -> &'static str {
        "Feed Core API"
    }

    pub fn openapi_json_path() -> &'static str {
        "/api/v1/openapi.json"
    }
}
