use axum::{
    Router,
    extract::{FromRef, Request},
    http::HeaderName,
    middleware::{self, Next},
    response::{IntoResponse, Redirect, Response},
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use tower::ServiceBuilder;
use tower_http::{
    catch_panic::CatchPanicLayer,
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::{DefaultOnResponse, TraceLayer},
};
use tracing::{Level, Span};

// --- Module Structure ---

// Core session machinery.
pub mod auth;
pub mod authorizer;
pub mod identity;
pub mod provider;
pub mod refresher;
pub mod session;

// Domain surface and its plumbing.
pub mod client;
pub mod config;
pub mod emi;
pub mod handlers;
pub mod models;

// Module for routing segregation (Public, Customer, Admin).
pub mod routes;
use routes::{admin, customer, public};

// --- Public Re-exports ---

// Makes core state types easily accessible to the main application entry point (main.rs).
pub use client::{ApiClient, ClientState};
pub use config::{AppConfig, Env};
pub use identity::Identity;
pub use provider::{HttpIdentityProvider, MockIdentityProvider, ProviderState};
pub use session::{MirrorState, MockSessionMirror, PostgresSessionMirror, SessionRegistry};

/// ApiDoc
///
/// Auto-generates the OpenAPI documentation (Swagger JSON) for the portal.
/// Aggregates every handler decorated with `#[utoipa::path]` and every schema
/// derived with `utoipa::ToSchema`. Served at `/api-docs/openapi.json`.
#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::get_bikes, handlers::get_bike_details, handlers::emi_quote,
        handlers::request_otp, handlers::verify_otp, handlers::customer_me,
        handlers::customer_logout, handlers::get_my_vehicles, handlers::register_vehicle,
        handlers::get_vas, handlers::activate_vas, handlers::get_my_bookings,
        handlers::create_booking, handlers::staff_login, handlers::admin_dashboard,
        handlers::get_branches, handlers::create_branch, handlers::create_manager,
        handlers::assign_stock, handlers::import_stock, handlers::get_admin_bookings
    ),
    components(
        schemas(
            models::Bike, models::EmiQuote, models::OtpRequest, models::OtpVerifyRequest,
            models::CustomerLoginResponse, models::StaffLoginRequest, models::StaffLoginResponse,
            models::Branch, models::CreateBranchRequest, models::CreateManagerRequest,
            models::Manager, models::Vehicle, models::RegisterVehicleRequest, models::Vas,
            models::ActivateVasRequest, models::VasActivation, models::ServiceBooking,
            models::CreateBookingRequest, models::StockAssignmentRequest,
            models::StockAssignment, models::CsvImportReport, models::DealerStats,
            identity::CustomerIdentity, identity::StaffIdentity, identity::StaffRole,
        )
    ),
    tags(
        (name = "moto-portal", description = "Motorcycle Dealership Portal API")
    )
)]
struct ApiDoc;

/// AppState
///
/// The single, thread-safe container holding every service the handlers need.
/// Shared across all incoming requests.
#[derive(Clone)]
pub struct AppState {
    /// Upstream proxy: typed calls to the dealer backend with bearer attachment.
    pub client: ClientState,
    /// Identity provider: OTP delivery and token refresh.
    pub provider: ProviderState,
    /// Live customer sessions and their refreshers.
    pub sessions: SessionRegistry,
    /// Durable copy of session state, for restart recovery.
    pub mirror: MirrorState,
    /// Configuration: the loaded, immutable environment configuration.
    pub config: AppConfig,
}

// --- Axum FromRef Extractor Implementations ---

// These let handlers and extractors pull single components out of AppState.

impl FromRef<AppState> for ClientState {
    fn from_ref(app_state: &AppState) -> ClientState {
        app_state.client.clone()
    }
}

impl FromRef<AppState> for ProviderState {
    fn from_ref(app_state: &AppState) -> ProviderState {
        app_state.provider.clone()
    }
}

impl FromRef<AppState> for SessionRegistry {
    fn from_ref(app_state: &AppState) -> SessionRegistry {
        app_state.sessions.clone()
    }
}

impl FromRef<AppState> for MirrorState {
    fn from_ref(app_state: &AppState) -> MirrorState {
        app_state.mirror.clone()
    }
}

impl FromRef<AppState> for AppConfig {
    fn from_ref(app_state: &AppState) -> AppConfig {
        app_state.config.clone()
    }
}

/// route_guard
///
/// Middleware applying the declarative route table to every request before a
/// handler runs. The `Identity` extractor is infallible: it resolves whoever
/// the bearer names, or `Unauthenticated`, and the pure `authorize` call then
/// decides. Denials answer a 303 redirect to the section the visitor belongs
/// in, so a browser lands on the right login or dashboard rather than an
/// error page.
async fn route_guard(identity: Identity, request: Request, next: Next) -> Response {
    let decision = authorizer::authorize(request.uri().path(), &identity);
    match decision.redirect_to {
        None => next.run(request).await,
        Some(target) => Redirect::to(target).into_response(),
    }
}

/// create_router
///
/// Assembles the portal's routing structure, applies the guard and the
/// observability stack, and registers the application state.
pub fn create_router(state: AppState) -> Router {
    // 1. CORS Configuration
    let cors = CorsLayer::new()
        .allow_methods(Any)
        .allow_origin(Any)
        .allow_headers(Any);

    // Header name constant for Request Correlation.
    let x_request_id = HeaderName::from_static("x-request-id");

    // 2. Base Router Assembly
    let base_router = Router::new()
        // Documentation: serve the auto-generated Swagger UI.
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        // Public surface: catalog, finance, health.
        .merge(public::public_routes())
        // Customer surface, including its public onboarding sub-paths.
        .nest("/customer", customer::customer_routes())
        // Staff surface, including its public login.
        .nest("/admin", admin::admin_routes())
        // The guard sits over every route; the table decides who passes.
        .layer(middleware::from_fn_with_state(state.clone(), route_guard))
        // Apply the unified state to all routes.
        .with_state(state);

    // 3. Observability and Correlation Layers (applied outermost/first)
    base_router
        .layer(
            ServiceBuilder::new()
                // 3a. Request ID generation: a unique UUID for every request.
                .layer(SetRequestIdLayer::new(x_request_id.clone(), MakeRequestUuid))
                // 3b. Request tracing: wraps the request/response lifecycle in a
                // span correlated by the generated id.
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(trace_span_logger)
                        .on_response(
                            DefaultOnResponse::new()
                                .level(Level::INFO)
                                .latency_unit(tower_http::LatencyUnit::Millis),
                        ),
                )
                // 3c. Request ID propagation back to the client.
                .layer(PropagateRequestIdLayer::new(x_request_id)),
        )
        // 4. Panic containment: a handler panic answers 500 instead of
        // tearing down the connection.
        .layer(CatchPanicLayer::new())
        // 5. CORS layer.
        .layer(cors)
}

/// trace_span_logger
///
/// Helper used by `TraceLayer` to customize span creation: pulls the
/// `x-request-id` header (if present) into the structured metadata alongside
/// the HTTP method and URI, so every log line of a request is correlated.
fn trace_span_logger(request: &axum::http::Request<axum::body::Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|value| value.to_str().ok())
        .unwrap_or("unknown");

    tracing::info_span!(
        "http_request",
        method = ?request.method(),
        uri = ?request.uri(),
        req_id = %request_id,
    )
}
