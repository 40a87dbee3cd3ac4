use axum::{
    extract::DefaultBodyLimit,
    routing::{delete, get, post, put},
    Router,
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use super::handlers;
use crate::AppState;

pub fn create_router(state: Arc<AppState>) -> Router {
    let upload_limit = state.config.max_upload_size as usize;

    let mut router = Router::new()
        // Documents
        .route("/documents", get(handlers::list_documents))
        .route(
            "/documents",
            post(handlers::upload_document).layer(DefaultBodyLimit::max(upload_limit)),
        )
        .route("/documents/shared-with-me", get(handlers::shared_with_me))
        // Lifecycle (single id or id set)
        .route("/documents/trash", post(handlers::trash_documents))
        .route("/documents/restore", post(handlers::restore_documents))
        .route("/documents/purge", post(handlers::purge_documents))
        .route("/documents/:id", get(handlers::get_document))
        .route("/documents/:id/rename", put(handlers::rename_document))
        .route("/documents/:id/open", get(handlers::open_document))
        // Sharing
        .route("/documents/:id/share", post(handlers::create_share))
        .route("/documents/:id/recipients", post(handlers::add_recipients))
        .route("/documents/:id/revoke", post(handlers::revoke_share))
        .route("/share/:share_id", get(handlers::access_share))
        // Local-backend capability URLs
        .route("/blob/*key", get(handlers::serve_blob))
        // Internal
        .route("/_internal/health", get(handlers::health));

    // Test-only routes
    if state.config.test_mode {
        tracing::warn!("Test mode enabled — purge route is available.");
        router = router.route("/admin/purge", delete(handlers::admin_purge));
    }

    router.layer(TraceLayer::new_for_http()).with_state(state)
}
