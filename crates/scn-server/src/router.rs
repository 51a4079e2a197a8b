use axum::routing::{delete, get, post, put};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::handler;
use crate::state::AppState;

/// Build the axum router with every scenario endpoint.
pub fn build_router(state: AppState, cors_permissive: bool) -> Router {
    let router = Router::new()
        .route("/health", get(handler::health_handler))
        .route(
            "/api/scenarios",
            get(handler::list_scenarios).post(handler::create_scenario),
        )
        .route("/api/scenarios/tree", get(handler::scenario_tree))
        .route(
            "/api/scenarios/:id",
            get(handler::get_scenario).delete(handler::delete_scenario),
        )
        .route("/api/scenarios/:id/snapshot", get(handler::get_snapshot))
        .route("/api/scenarios/:id/archive", post(handler::archive_scenario))
        .route("/api/scenarios/:id/merge", post(handler::merge_scenario))
        .route("/api/scenarios/:id/merge/preview", post(handler::preview_merge))
        .route("/api/scenarios/:id/merges", get(handler::merge_history))
        .route("/api/scenarios/:id/compare", get(handler::compare_scenarios))
        .route(
            "/api/scenarios/:id/assignments",
            get(handler::list_assignments).post(handler::upsert_assignment),
        )
        .route(
            "/api/scenarios/:id/assignments/:assignment_id",
            delete(handler::delete_assignment),
        )
        .route("/api/scenarios/:id/overrides", put(handler::upsert_override))
        .route("/api/scenarios/:id/phases", put(handler::upsert_phase_timeline))
        .with_state(state)
        .layer(TraceLayer::new_for_http());

    if cors_permissive {
        router.layer(CorsLayer::permissive())
    } else {
        router
    }
}
