pub mod health;

use axum::{
    routing::{get, post, put},
    Router,
};

use crate::generation::handlers;
use crate::ingest::handlers::handle_upload_document;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Sessions
        .route("/api/v1/sessions", post(handlers::handle_create_session))
        .route(
            "/api/v1/sessions/:id",
            get(handlers::handle_get_session).delete(handlers::handle_delete_session),
        )
        .route("/api/v1/sessions/:id/document", post(handle_upload_document))
        .route("/api/v1/sessions/:id/slots", get(handlers::handle_get_slots))
        .route(
            "/api/v1/sessions/:id/figure-selection",
            put(handlers::handle_select_figure),
        )
        // Fragments
        .route(
            "/api/v1/sessions/:id/fragments/:fragment",
            put(handlers::handle_edit_fragment).delete(handlers::handle_clear_fragment),
        )
        .route(
            "/api/v1/sessions/:id/fragments/:fragment/generate",
            post(handlers::handle_generate_fragment),
        )
        .with_state(state)
}
