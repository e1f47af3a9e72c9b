use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, post},
};

/// Customer Router Module
///
/// The customer-facing surface, nested under `/customer`. The OTP pair at the
/// top is reachable without a session (it is how a session comes to exist);
/// everything below requires a live customer session, enforced both by the
/// guard middleware and by the `CustomerUser` extractor on each handler.
pub fn customer_routes() -> Router<AppState> {
    Router::new()
        // POST /customer/otp/request
        // Asks the identity provider to text a one-time code. Public.
        .route("/otp/request", post(handlers::request_otp))
        // POST /customer/otp/verify
        // Exchanges phone + code for a session; the response carries the
        // opaque session id the SPA keeps as its bearer. Public.
        .route("/otp/verify", post(handlers::verify_otp))
        // GET /customer/me
        // The session's own identity, answered locally.
        .route("/me", get(handlers::customer_me))
        // POST /customer/logout
        // Tears the session down: refresher aborted, mirror row removed.
        .route("/logout", post(handlers::customer_logout))
        // GET /customer/vehicles
        .route("/vehicles", get(handlers::get_my_vehicles))
        // POST /customer/vehicles/register
        // Files a registration request for a purchased vehicle.
        .route("/vehicles/register", post(handlers::register_vehicle))
        // GET /customer/vas
        .route("/vas", get(handlers::get_vas))
        // POST /customer/vas/{id}/activate
        // Activates a value-added service on one of the customer's vehicles.
        .route("/vas/{id}/activate", post(handlers::activate_vas))
        // GET + POST /customer/bookings
        // Service bookings: list mine, book a slot.
        .route(
            "/bookings",
            get(handlers::get_my_bookings).post(handlers::create_booking),
        )
}
