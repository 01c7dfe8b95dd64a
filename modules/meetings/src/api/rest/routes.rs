use std::sync::Arc;

use axum::{
    routing::{get, post},
    Extension, Router,
};
use modkit::AuthGate;

use crate::api::rest::handlers;
use crate::domain::service::Service;

/// Mount the `/meetings` routes. Admin-only and caller-scoped handlers
/// authenticate through the gate carried in request extensions.
pub fn register_routes(
    router: Router,
    service: Arc<Service>,
    gate: Arc<dyn AuthGate>,
) -> anyhow::Result<Router> {
    let meetings = Router::new()
        .route(
            "/meetings",
            post(handlers::create_meeting).get(handlers::list_meetings),
        )
        .route("/meetings/by-date/{date}", get(handlers::get_by_date))
        .route("/meetings/by-date/{date}/code", post(handlers::regenerate_code))
        .route("/meetings/by-code/{code}", get(handlers::get_by_code))
        .route("/meetings/attendance/start", post(handlers::start_attendance))
        .route("/meetings/attendance/finish", post(handlers::finish_attendance))
        .route(
            "/meetings/{id}",
            get(handlers::get_by_id)
                .patch(handlers::update_meeting)
                .delete(handlers::delete_meeting),
        )
        .route("/meetings/{id}/recover", post(handlers::recover_meeting))
        .layer(Extension(service))
        .layer(Extension(gate));

    Ok(router.merge(meetings))
}
