use std::sync::Arc;

use axum::{
    routing::{get, post},
    Extension, Router,
};
use modkit::AuthGate;

use crate::api::rest::handlers;
use crate::domain::service::Service;

/// Mount the `/users` routes. Handlers read the service and the auth gate
/// from request extensions.
pub fn register_routes(
    router: Router,
    service: Arc<Service>,
    gate: Arc<dyn AuthGate>,
) -> anyhow::Result<Router> {
    let users = Router::new()
        .route("/users/register", post(handlers::register))
        .route("/users/login", post(handlers::login))
        .route("/users", get(handlers::list_users))
        .route("/users/me", get(handlers::me))
        .route(
            "/users/{id}",
            get(handlers::get_user)
                .put(handlers::update_user)
                .delete(handlers::delete_user),
        )
        .route("/users/{id}/recover", post(handlers::recover_user))
        .layer(Extension(service))
        .layer(Extension(gate));

    Ok(router.merge(users))
}
