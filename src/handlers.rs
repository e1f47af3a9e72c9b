use axum::{
    Json,
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
};
use uuid::Uuid;

use crate::{
    AppState,
    auth::{CustomerUser, StaffUser},
    client::customer_bearer,
    emi,
    identity::{CustomerIdentity, Identity, SessionToken, StaffRole},
    models::{
        self, ActivateVasRequest, Bike, BikeFilter, Branch, CreateBookingRequest,
        CreateBranchRequest, CreateManagerRequest, CsvImportReport, CustomerLoginResponse,
        DealerStats, EmiQuote, EmiRequest, Manager, OtpRequest, OtpVerifyRequest,
        RegisterVehicleRequest, ServiceBooking, StaffLoginRequest, StaffLoginResponse,
        StockAssignment, StockAssignmentRequest, Vas, VasActivation, Vehicle,
    },
    refresher::{REFRESH_PERIOD, TokenRefresher},
    session::SessionStore,
};
use std::sync::Arc;

/// Resolves the upstream bearer for a customer request: the live session's
/// token snapshot, with the provider-wait fallback applied.
async fn customer_token(state: &AppState, session_id: Uuid) -> Result<SessionToken, StatusCode> {
    let store = state
        .sessions
        .store(session_id)
        .await
        .ok_or(StatusCode::UNAUTHORIZED)?;
    customer_bearer(&state.provider, &store)
        .await
        .ok_or(StatusCode::UNAUTHORIZED)
}

// --- Public: catalog & finance ---

/// get_bikes
///
/// [Public Route] Lists the vehicle inventory with optional category and
/// search filters, proxied from the dealer backend without a token.
#[utoipa::path(
    get,
    path = "/bikes",
    params(BikeFilter),
    responses((status = 200, description = "Inventory listing", body = [Bike]))
)]
pub async fn get_bikes(
    State(state): State<AppState>,
    Query(filter): Query<BikeFilter>,
) -> Result<Json<Vec<models::Bike>>, StatusCode> {
    state.client.list_bikes(&filter).await.map(Json)
}

/// get_bike_details
///
/// [Public Route] Retrieves a single inventory entry by id.
#[utoipa::path(
    get,
    path = "/bikes/{id}",
    params(("id" = Uuid, Path, description = "Bike ID")),
    responses((status = 200, description = "Found", body = Bike))
)]
pub async fn get_bike_details(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<models::Bike>, StatusCode> {
    state.client.get_bike(id).await.map(Json)
}

/// emi_quote
///
/// [Public Route] Computes a finance quote locally. Invalid parameters
/// (zero tenure, negative rate, down payment at or above price) answer 400.
#[utoipa::path(
    get,
    path = "/finance/emi",
    params(EmiRequest),
    responses(
        (status = 200, description = "Quote", body = EmiQuote),
        (status = 400, description = "Invalid parameters")
    )
)]
pub async fn emi_quote(Query(req): Query<EmiRequest>) -> Result<Json<EmiQuote>, StatusCode> {
    match emi::quote(&req) {
        Ok(quote) => Ok(Json(quote)),
        Err(reason) => {
            tracing::debug!("emi quote rejected: {reason}");
            Err(StatusCode::BAD_REQUEST)
        }
    }
}

// --- Customer onboarding (public sub-paths of /customer) ---

/// request_otp
///
/// [Public Route] Asks the identity provider to deliver a one-time code to
/// the given phone number. The portal never sees the code in this flow.
#[utoipa::path(
    post,
    path = "/customer/otp/request",
    request_body = OtpRequest,
    responses(
        (status = 204, description = "Code sent"),
        (status = 502, description = "Provider unavailable")
    )
)]
pub async fn request_otp(
    State(state): State<AppState>,
    Json(payload): Json<OtpRequest>,
) -> StatusCode {
    match state.provider.send_otp(&payload.phone_number).await {
        Ok(()) => StatusCode::NO_CONTENT,
        Err(e) => {
            tracing::warn!("otp delivery failed: {e}");
            StatusCode::BAD_GATEWAY
        }
    }
}

/// verify_otp
///
/// [Public Route] Exchanges a phone number and one-time code for a customer
/// session. On success a session store is created, mirrored, and handed a
/// lifecycle-scoped token refresher; the SPA receives the opaque session id
/// as its bearer.
#[utoipa::path(
    post,
    path = "/customer/otp/verify",
    request_body = OtpVerifyRequest,
    responses(
        (status = 200, description = "Session created", body = CustomerLoginResponse),
        (status = 401, description = "Verification rejected")
    )
)]
pub async fn verify_otp(
    State(state): State<AppState>,
    Json(payload): Json<OtpVerifyRequest>,
) -> Result<Json<CustomerLoginResponse>, StatusCode> {
    let verified = state
        .provider
        .verify_otp(&payload.phone_number, &payload.code)
        .await
        .map_err(|e| {
            tracing::warn!("otp verification failed: {e}");
            StatusCode::UNAUTHORIZED
        })?;

    let customer = CustomerIdentity {
        id: verified.id,
        phone_number: verified.phone_number,
        email: verified.email,
    };

    let session_id = Uuid::new_v4();
    let store = Arc::new(SessionStore::open(session_id, state.mirror.clone()));
    store
        .login(Identity::Customer(customer.clone()), verified.token)
        .await;

    // The refresher is owned by the registry entry and aborted on logout.
    let refresher = TokenRefresher::spawn(store.clone(), state.provider.clone(), REFRESH_PERIOD);
    state.sessions.insert(session_id, store, refresher).await;

    tracing::info!(customer_id = %customer.id, "customer session established");
    Ok(Json(CustomerLoginResponse {
        session_id,
        customer,
    }))
}

// --- Customer surface ---

/// customer_me
///
/// [Customer Route] The authenticated customer's own identity, served from
/// the session layer without an upstream call.
#[utoipa::path(
    get,
    path = "/customer/me",
    responses((status = 200, description = "Profile", body = CustomerIdentity))
)]
pub async fn customer_me(customer: CustomerUser) -> Json<CustomerIdentity> {
    Json(customer.identity)
}

/// customer_logout
///
/// [Customer Route] Ends the session: aborts the refresher, clears identity
/// and token together, removes the mirrored row.
#[utoipa::path(
    post,
    path = "/customer/logout",
    responses((status = 204, description = "Logged out"))
)]
pub async fn customer_logout(customer: CustomerUser, State(state): State<AppState>) -> StatusCode {
    if state.sessions.end(customer.session_id).await {
        StatusCode::NO_CONTENT
    } else {
        StatusCode::UNAUTHORIZED
    }
}

/// get_my_vehicles
///
/// [Customer Route] Lists the customer's vehicles, proxied with the current
/// identity-token snapshot.
#[utoipa::path(
    get,
    path = "/customer/vehicles",
    responses((status = 200, description = "My vehicles", body = [Vehicle]))
)]
pub async fn get_my_vehicles(
    customer: CustomerUser,
    State(state): State<AppState>,
) -> Result<Json<Vec<models::Vehicle>>, StatusCode> {
    let token = customer_token(&state, customer.session_id).await?;
    state.client.customer_vehicles(&token.value).await.map(Json)
}

/// register_vehicle
///
/// [Customer Route] Starts the registration workflow for a newly purchased
/// vehicle. The backend owns plate assignment; the portal only forwards.
#[utoipa::path(
    post,
    path = "/customer/vehicles/register",
    request_body = RegisterVehicleRequest,
    responses((status = 200, description = "Registration filed", body = Vehicle))
)]
pub async fn register_vehicle(
    customer: CustomerUser,
    State(state): State<AppState>,
    Json(payload): Json<RegisterVehicleRequest>,
) -> Result<Json<models::Vehicle>, StatusCode> {
    let token = customer_token(&state, customer.session_id).await?;
    state
        .client
        .register_vehicle(&token.value, &payload)
        .await
        .map(Json)
}

/// get_vas
///
/// [Customer Route] Lists the value-added services available to the
/// customer's vehicles.
#[utoipa::path(
    get,
    path = "/customer/vas",
    responses((status = 200, description = "Available services", body = [Vas]))
)]
pub async fn get_vas(
    customer: CustomerUser,
    State(state): State<AppState>,
) -> Result<Json<Vec<models::Vas>>, StatusCode> {
    let token = customer_token(&state, customer.session_id).await?;
    state.client.list_vas(&token.value).await.map(Json)
}

/// activate_vas
///
/// [Customer Route] Activates a service on one of the customer's vehicles.
/// Ownership of the vehicle is enforced by the backend.
#[utoipa::path(
    post,
    path = "/customer/vas/{id}/activate",
    params(("id" = Uuid, Path, description = "VAS ID")),
    request_body = ActivateVasRequest,
    responses((status = 200, description = "Activated", body = VasActivation))
)]
pub async fn activate_vas(
    customer: CustomerUser,
    State(state): State<AppState>,
    Path(vas_id): Path<Uuid>,
    Json(payload): Json<ActivateVasRequest>,
) -> Result<Json<models::VasActivation>, StatusCode> {
    let token = customer_token(&state, customer.session_id).await?;
    state
        .client
        .activate_vas(&token.value, vas_id, payload.vehicle_id)
        .await
        .map(Json)
}

/// get_my_bookings
///
/// [Customer Route] Lists the customer's service bookings.
#[utoipa::path(
    get,
    path = "/customer/bookings",
    responses((status = 200, description = "My bookings", body = [ServiceBooking]))
)]
pub async fn get_my_bookings(
    customer: CustomerUser,
    State(state): State<AppState>,
) -> Result<Json<Vec<models::ServiceBooking>>, StatusCode> {
    let token = customer_token(&state, customer.session_id).await?;
    state.client.customer_bookings(&token.value).await.map(Json)
}

/// create_booking
///
/// [Customer Route] Books a service slot at a branch.
#[utoipa::path(
    post,
    path = "/customer/bookings",
    request_body = CreateBookingRequest,
    responses((status = 200, description = "Booked", body = ServiceBooking))
)]
pub async fn create_booking(
    customer: CustomerUser,
    State(state): State<AppState>,
    Json(payload): Json<CreateBookingRequest>,
) -> Result<Json<models::ServiceBooking>, StatusCode> {
    let token = customer_token(&state, customer.session_id).await?;
    state
        .client
        .create_booking(&token.value, &payload)
        .await
        .map(Json)
}

// --- Staff surface ---

/// staff_login
///
/// [Public Route] Forwards staff credentials to the dealer backend, which
/// answers with the signed JWT the SPA keeps as its bearer. The credentials
/// are never persisted or logged here.
#[utoipa::path(
    post,
    path = "/admin/login",
    request_body = StaffLoginRequest,
    responses(
        (status = 200, description = "Logged in", body = StaffLoginResponse),
        (status = 401, description = "Rejected")
    )
)]
pub async fn staff_login(
    State(state): State<AppState>,
    Json(payload): Json<StaffLoginRequest>,
) -> Result<Json<StaffLoginResponse>, StatusCode> {
    state.client.staff_login(&payload).await.map(Json)
}

/// admin_dashboard
///
/// [Admin Route] Core dealership counters for the dashboard.
#[utoipa::path(
    get,
    path = "/admin/dashboard",
    responses((status = 200, description = "Stats", body = DealerStats))
)]
pub async fn admin_dashboard(
    staff: StaffUser,
    State(state): State<AppState>,
) -> Result<Json<models::DealerStats>, StatusCode> {
    state.client.dealer_stats(&staff.bearer).await.map(Json)
}

/// get_branches
///
/// [Admin Route] Lists all branches. Any staff role may view.
#[utoipa::path(
    get,
    path = "/admin/branches",
    responses((status = 200, description = "Branches", body = [Branch]))
)]
pub async fn get_branches(
    staff: StaffUser,
    State(state): State<AppState>,
) -> Result<Json<Vec<models::Branch>>, StatusCode> {
    state.client.list_branches(&staff.bearer).await.map(Json)
}

/// create_branch
///
/// [Admin Route, Super-Admin only] Creates a branch. The route guard already
/// gates this path; the role is re-checked here as the second layer.
#[utoipa::path(
    post,
    path = "/admin/branches/add",
    request_body = CreateBranchRequest,
    responses(
        (status = 200, description = "Created", body = Branch),
        (status = 403, description = "Not a super-admin")
    )
)]
pub async fn create_branch(
    staff: StaffUser,
    State(state): State<AppState>,
    Json(payload): Json<CreateBranchRequest>,
) -> Result<Json<models::Branch>, StatusCode> {
    if staff.identity.role != StaffRole::SuperAdmin {
        return Err(StatusCode::FORBIDDEN);
    }
    state
        .client
        .create_branch(&staff.bearer, &payload)
        .await
        .map(Json)
}

/// create_manager
///
/// [Admin Route, Super-Admin only] Creates a branch manager account.
#[utoipa::path(
    post,
    path = "/admin/managers/add",
    request_body = CreateManagerRequest,
    responses(
        (status = 200, description = "Created", body = Manager),
        (status = 403, description = "Not a super-admin")
    )
)]
pub async fn create_manager(
    staff: StaffUser,
    State(state): State<AppState>,
    Json(payload): Json<CreateManagerRequest>,
) -> Result<Json<models::Manager>, StatusCode> {
    if staff.identity.role != StaffRole::SuperAdmin {
        return Err(StatusCode::FORBIDDEN);
    }
    state
        .client
        .create_manager(&staff.bearer, &payload)
        .await
        .map(Json)
}

/// assign_stock
///
/// [Admin Route] Assigns inventory units to a branch.
#[utoipa::path(
    post,
    path = "/admin/stock/assign",
    request_body = StockAssignmentRequest,
    responses((status = 200, description = "Assigned", body = StockAssignment))
)]
pub async fn assign_stock(
    staff: StaffUser,
    State(state): State<AppState>,
    Json(payload): Json<StockAssignmentRequest>,
) -> Result<Json<models::StockAssignment>, StatusCode> {
    state
        .client
        .assign_stock(&staff.bearer, &payload)
        .await
        .map(Json)
}

/// import_stock
///
/// [Admin Route] Bulk stock import: accepts a multipart CSV upload and
/// forwards it to the dealer backend, which parses and validates rows and
/// answers with the import report for the review screen.
#[utoipa::path(
    post,
    path = "/admin/stock/import",
    responses(
        (status = 200, description = "Import report", body = CsvImportReport),
        (status = 400, description = "No file field in the upload")
    )
)]
pub async fn import_stock(
    staff: StaffUser,
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<models::CsvImportReport>, StatusCode> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|_| StatusCode::BAD_REQUEST)?
    {
        if field.name() != Some("file") {
            continue;
        }
        let filename = field
            .file_name()
            .unwrap_or("stock.csv")
            .to_string();
        let bytes = field
            .bytes()
            .await
            .map_err(|_| StatusCode::BAD_REQUEST)?
            .to_vec();

        let report = state
            .client
            .import_stock_csv(&staff.bearer, &filename, bytes)
            .await?;
        return Ok(Json(report));
    }

    Err(StatusCode::BAD_REQUEST)
}

/// get_admin_bookings
///
/// [Admin Route] All service bookings across branches, for oversight.
#[utoipa::path(
    get,
    path = "/admin/bookings",
    responses((status = 200, description = "All bookings", body = [ServiceBooking]))
)]
pub async fn get_admin_bookings(
    staff: StaffUser,
    State(state): State<AppState>,
) -> Result<Json<Vec<models::ServiceBooking>>, StatusCode> {
    state.client.admin_bookings(&staff.bearer).await.map(Json)
}
