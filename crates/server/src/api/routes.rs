use axum::{
    middleware,
    routing::{delete, get, post, put},
    Router,
};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::services::{ServeDir, ServeFile};
use tower_http::trace::TraceLayer;

use super::middleware::{auth_middleware, metrics_middleware, require_admin};
use super::{audit, counters, display, handlers, queue, services, stats, tickets, users, ws};
use crate::state::AppState;

pub fn create_router(state: Arc<AppState>) -> Router {
    // Kiosk/display front-end bundle (configurable via env)
    let web_dir = std::env::var("QUEUE_BUDDY_WEB_DIR").unwrap_or_else(|_| "web/dist".to_string());

    // Customers and display boards
    let public_routes = Router::new()
        .route("/health", get(handlers::health))
        .route("/services", get(services::list_services))
        .route("/tickets", post(tickets::take_ticket))
        .route("/tickets/{id}", get(tickets::get_ticket))
        .route("/display", get(display::get_display))
        .route("/queue/waiting", get(queue::waiting))
        .route("/queue/serving", get(queue::serving))
        .route("/queue/waiting-count", get(queue::waiting_count))
        .route("/ws", get(ws::ws_handler));

    // Officers at counters
    let officer_routes = Router::new()
        .route("/tickets", get(tickets::list_tickets))
        .route("/counters", get(counters::list_counters))
        .route("/counters/{id}/call-next", post(counters::call_next))
        .route("/counters/{id}/complete", post(counters::complete))
        .route("/counters/{id}/skip", post(counters::skip))
        .route("/counters/{id}/active", put(counters::set_active))
        .route("/counters/{id}/officer", put(counters::set_officer))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    // Administrators
    let admin_routes = Router::new()
        .route("/config", get(handlers::get_config))
        .route("/stats/today", get(stats::today))
        .route("/queue/reset", post(queue::reset))
        .route("/users", get(users::list_users).post(users::create_user))
        .route("/users/{user_id}", delete(users::delete_user))
        .route(
            "/users/{user_id}/admin",
            post(users::grant_admin).delete(users::revoke_admin),
        )
        .route("/audit", get(audit::query_audit))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_admin))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    let api_routes = public_routes
        .merge(officer_routes)
        .merge(admin_routes)
        .with_state(state.clone());

    // Serve the front-end with SPA fallback
    let index_path = format!("{}/index.html", web_dir);
    let serve_dir = ServeDir::new(&web_dir).fallback(ServeFile::new(&index_path));

    Router::new()
        .route("/metrics", get(handlers::metrics))
        .with_state(state)
        .nest("/api/v1", api_routes)
        .fallback_service(serve_dir)
        .layer(middleware::from_fn(metrics_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}
