use crate::error::ApiError;
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::health::health_check,
        crate::health::detailed_health_check,
        crate::health::version_info,
        crate::event::controller::create_event_handler,
        crate::event::controller::update_event_handler,
        crate::tagging::controller::request_tag_handler,
        crate::tagging::controller::decide_handler,
        crate::reactions::controller::react_handler,
        crate::tv::controller::tv_sections_handler,
    ),
    components(schemas(
        crate::health::HealthResponse,
        crate::health::VersionInfo,
        ApiError,
    )),
    tags(
        (name = "health", description = "Liveness and dependency checks"),
        (name = "version", description = "Build information"),
        (name = "events", description = "Events, sections, brackets and videos"),
        (name = "tagging", description = "Crediting dancers, judges and other roles"),
        (name = "reactions", description = "Timestamped reactions on videos"),
        (name = "tv", description = "Video-first feed of event sections"),
    ),
    info(
        title = "Dance Events API",
        description = "Backend for a dance event community: events with sections, brackets and videos, role tagging and reactions.\n\n## Authentication\n\nEndpoints under `/api` require a session:\n\n```\nAuthorization: Bearer <session_id>\n```\n\nGet a session_id from `/api/users/login` or `/api/users/register`.",
        version = "0.3.0",
        license(
            name = "MIT",
            url = "https://opensource.org/licenses/MIT"
        )
    ),
    servers(
        (url = "http://localhost:50002", description = "Development server"),
    )
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_lists_feature_paths() {
        let doc = ApiDoc::openapi();
        let paths: Vec<&String> = doc.paths.paths.keys().collect();
        for expected in ["/health", "/api/events", "/api/tagging", "/api/tv/sections"] {
            assert!(paths.iter().any(|p| p.as_str() == expected), "missing {}", expected);
        }
    }
}
