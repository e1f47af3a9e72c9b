use crate::{AppState, handlers};
use axum::{Router, routing::get};

/// Public Router Module
///
/// Endpoints any client may reach, session or not: the vehicle catalog, the
/// finance calculator, and a health probe. Customer onboarding (`/customer/otp/*`)
/// and staff login (`/admin/login`) are also public, but live inside their
/// section routers so the whole surface of each section is declared in one
/// place; the guard table is what makes them reachable without a session.
pub fn public_routes() -> Router<AppState> {
    Router::new()
        // GET /health
        // Unauthenticated liveness probe for monitors and load balancers.
        .route("/health", get(|| async { "ok" }))
        // GET /bikes?category=...&search=...
        // Lists the vehicle inventory, browsable before signing in.
        .route("/bikes", get(handlers::get_bikes))
        // GET /bikes/{id}
        // Detail view of a single inventory entry.
        .route("/bikes/{id}", get(handlers::get_bike_details))
        // GET /finance/emi?price=...&down_payment=...&annual_rate_pct=...&tenure_months=...
        // Computes an instalment quote locally; nothing leaves the portal.
        .route("/finance/emi", get(handlers::emi_quote))
}
