use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, post},
};

/// Admin Router Module
///
/// The staff surface, nested under `/admin`. Only `/admin/login` is public.
/// The guard middleware keeps customers and anonymous visitors out of the
/// rest, and narrows `/admin/branches/add` and `/admin/managers/add` to
/// super-admins; the two handlers re-check the role as the second layer.
pub fn admin_routes() -> Router<AppState> {
    Router::new()
        // POST /admin/login
        // Staff credential exchange; the backend mints the JWT. Public.
        .route("/login", post(handlers::staff_login))
        // GET /admin/dashboard
        // Dealership counters for the landing screen.
        .route("/dashboard", get(handlers::admin_dashboard))
        // GET /admin/branches
        // Branch listing, visible to any staff role.
        .route("/branches", get(handlers::get_branches))
        // POST /admin/branches/add
        // Creates a branch. Super-admin only.
        .route("/branches/add", post(handlers::create_branch))
        // POST /admin/managers/add
        // Creates a branch manager account. Super-admin only.
        .route("/managers/add", post(handlers::create_manager))
        // POST /admin/stock/assign
        // Assigns inventory units to a branch.
        .route("/stock/assign", post(handlers::assign_stock))
        // POST /admin/stock/import
        // Bulk CSV import; multipart upload forwarded to the backend.
        .route("/stock/import", post(handlers::import_stock))
        // GET /admin/bookings
        // Every branch's service bookings, for oversight.
        .route("/bookings", get(handlers::get_admin_bookings))
}
