use axum::http::HeaderValue;
use axum::{
    middleware,
    routing::{get, patch, post},
    Router,
};
use tower_http::cors::{AllowHeaders, AllowMethods, AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::warn;

use crate::{auth::AuthenticatedUser, state::AppState};

pub mod document_types;
pub mod documents;
pub mod employees;
pub mod folders;
pub mod health;

pub fn create_router(state: AppState) -> Router<()> {
    let allow_origin = match state.config.cors_allowed_origin.as_ref() {
        Some(origins) => AllowOrigin::list(parse_origins(origins)),
        None => AllowOrigin::mirror_request(),
    };
    let cors = CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods(AllowMethods::mirror_request())
        .allow_headers(AllowHeaders::mirror_request())
        .allow_credentials(true);

    let document_type_routes = Router::new()
        .route(
            "/",
            get(document_types::list_document_types).post(document_types::create_document_type),
        )
        .route(
            "/:id",
            get(document_types::get_document_type)
                .patch(document_types::update_document_type)
                .delete(document_types::delete_document_type),
        )
        .route("/:id/fields", post(document_types::add_field))
        .route(
            "/:id/fields/:field_id",
            patch(document_types::update_field).delete(document_types::delete_field),
        );

    let document_routes = Router::new()
        .route("/", post(documents::create_document))
        .route(
            "/:id",
            get(documents::get_document)
                .patch(documents::update_document)
                .delete(documents::delete_document),
        )
        .route("/:id/not-applicable", post(documents::mark_not_applicable));

    let employee_routes = Router::new()
        .route(
            "/:employee_id/documents",
            get(employees::list_employee_documents),
        )
        .route(
            "/:employee_id/compliance",
            get(employees::employee_compliance),
        );

    let folder_routes = Router::new()
        .route("/:id/document-types", get(folders::list_folder_document_types))
        .route("/:id/documents", get(folders::list_folder_documents));

    let protected_state = state.clone();
    let protected_routes = Router::new()
        .nest("/api/document-types", document_type_routes)
        .nest("/api/documents", document_routes)
        .nest("/api/employees", employee_routes)
        .nest("/api/folders", folder_routes)
        .layer(middleware::from_extractor_with_state::<AuthenticatedUser, _>(protected_state));

    Router::new()
        .merge(protected_routes)
        .route("/api/health", get(health::health_check))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}

fn parse_origins(raw: &str) -> Vec<HeaderValue> {
    raw.split(',')
        .map(str::trim)
        .filter(|origin| !origin.is_empty())
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(origin, "ignoring invalid CORS origin");
                None
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::parse_origins;

    #[test]
    fn splits_and_trims_origins() {
        let origins = parse_origins("https://hr.example.com, ,https://admin.example.com");
        assert_eq!(origins.len(), 2);
        assert_eq!(origins[1], "https://admin.example.com");
    }
}
