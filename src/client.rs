use std::sync::Arc;
use std::time::Duration;

use axum::http::StatusCode;
use serde::Serialize;
use serde::de::DeserializeOwned;
use uuid::Uuid;

use crate::identity::{Identity, SessionToken};
use crate::models::{
    Bike, BikeFilter, Branch, CreateBookingRequest, CreateBranchRequest, CreateManagerRequest,
    CsvImportReport, DealerStats, Manager, RegisterVehicleRequest, ServiceBooking,
    StaffLoginRequest, StaffLoginResponse, StockAssignment, StockAssignmentRequest, Vas,
    VasActivation, Vehicle,
};
use crate::provider::ProviderState;
use crate::session::SessionStore;

/// Soft bound on how long a request waits for the identity provider to hand
/// over the current token before proceeding with the stored fallback.
pub const TOKEN_WAIT: Duration = Duration::from_secs(2);

/// Concrete type used to share the upstream client across the application state.
pub type ClientState = Arc<ApiClient>;

/// ApiClient
///
/// Per-resource request/response layer against the dealer REST backend. Every
/// authenticated method takes the bearer value as an argument: the caller
/// snapshots the token at dispatch time, so a refresh landing mid-flight
/// never alters a request already sent. The next request picks up the
/// refreshed token.
///
/// Error mapping: an upstream non-2xx passes through as the same status, a
/// transport failure maps to 502. Nothing here is fatal to the process.
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
}

impl ApiClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn dispatch<T: DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
        bearer: Option<&str>,
    ) -> Result<T, StatusCode> {
        let request = match bearer {
            Some(token) => request.bearer_auth(token),
            None => request,
        };

        let response = request.send().await.map_err(|e| {
            tracing::error!("upstream transport error: {e}");
            StatusCode::BAD_GATEWAY
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(
                StatusCode::from_u16(status.as_u16()).unwrap_or(StatusCode::BAD_GATEWAY),
            );
        }

        response.json::<T>().await.map_err(|e| {
            tracing::error!("upstream returned a malformed body: {e}");
            StatusCode::BAD_GATEWAY
        })
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        bearer: Option<&str>,
    ) -> Result<T, StatusCode> {
        self.dispatch(self.http.get(self.url(path)), bearer).await
    }

    async fn post_json<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        path: &str,
        bearer: Option<&str>,
        body: &B,
    ) -> Result<T, StatusCode> {
        self.dispatch(self.http.post(self.url(path)).json(body), bearer)
            .await
    }

    // --- Public catalog ---

    pub async fn list_bikes(&self, filter: &BikeFilter) -> Result<Vec<Bike>, StatusCode> {
        let mut query: Vec<(&str, &str)> = Vec::new();
        if let Some(category) = filter.category.as_deref() {
            query.push(("category", category));
        }
        if let Some(search) = filter.search.as_deref() {
            query.push(("search", search));
        }
        self.dispatch(self.http.get(self.url("/bikes")).query(&query), None)
            .await
    }

    pub async fn get_bike(&self, id: Uuid) -> Result<Bike, StatusCode> {
        self.get_json(&format!("/bikes/{id}"), None).await
    }

    // --- Staff auth ---

    pub async fn staff_login(
        &self,
        req: &StaffLoginRequest,
    ) -> Result<StaffLoginResponse, StatusCode> {
        self.post_json("/auth/staff/login", None, req).await
    }

    // --- Admin resources ---

    pub async fn list_branches(&self, bearer: &str) -> Result<Vec<Branch>, StatusCode> {
        self.get_json("/branches", Some(bearer)).await
    }

    pub async fn create_branch(
        &self,
        bearer: &str,
        req: &CreateBranchRequest,
    ) -> Result<Branch, StatusCode> {
        self.post_json("/branches", Some(bearer), req).await
    }

    pub async fn create_manager(
        &self,
        bearer: &str,
        req: &CreateManagerRequest,
    ) -> Result<Manager, StatusCode> {
        self.post_json("/managers", Some(bearer), req).await
    }

    pub async fn assign_stock(
        &self,
        bearer: &str,
        req: &StockAssignmentRequest,
    ) -> Result<StockAssignment, StatusCode> {
        self.post_json("/stock/assignments", Some(bearer), req).await
    }

    /// Forwards a bulk stock CSV as multipart form data. The file is passed
    /// through untouched; parsing and row-level validation belong to the
    /// backend, which answers with the import report.
    pub async fn import_stock_csv(
        &self,
        bearer: &str,
        filename: &str,
        bytes: Vec<u8>,
    ) -> Result<CsvImportReport, StatusCode> {
        let part = reqwest::multipart::Part::bytes(bytes)
            .file_name(filename.to_string())
            .mime_str("text/csv")
            .map_err(|e| {
                tracing::error!("csv multipart assembly failed: {e}");
                StatusCode::INTERNAL_SERVER_ERROR
            })?;
        let form = reqwest::multipart::Form::new().part("file", part);

        self.dispatch(
            self.http.post(self.url("/stock/import")).multipart(form),
            Some(bearer),
        )
        .await
    }

    pub async fn admin_bookings(&self, bearer: &str) -> Result<Vec<ServiceBooking>, StatusCode> {
        self.get_json("/bookings", Some(bearer)).await
    }

    pub async fn dealer_stats(&self, bearer: &str) -> Result<DealerStats, StatusCode> {
        self.get_json("/stats", Some(bearer)).await
    }

    // --- Customer resources ---

    pub async fn customer_vehicles(&self, bearer: &str) -> Result<Vec<Vehicle>, StatusCode> {
        self.get_json("/vehicles", Some(bearer)).await
    }

    pub async fn register_vehicle(
        &self,
        bearer: &str,
        req: &RegisterVehicleRequest,
    ) -> Result<Vehicle, StatusCode> {
        self.post_json("/vehicles/register", Some(bearer), req).await
    }

    pub async fn list_vas(&self, bearer: &str) -> Result<Vec<Vas>, StatusCode> {
        self.get_json("/vas", Some(bearer)).await
    }

    pub async fn activate_vas(
        &self,
        bearer: &str,
        vas_id: Uuid,
        vehicle_id: Uuid,
    ) -> Result<VasActivation, StatusCode> {
        self.post_json(
            &format!("/vas/{vas_id}/activate"),
            Some(bearer),
            &serde_json::json!({ "vehicle_id": vehicle_id }),
        )
        .await
    }

    pub async fn customer_bookings(&self, bearer: &str) -> Result<Vec<ServiceBooking>, StatusCode> {
        self.get_json("/bookings/my", Some(bearer)).await
    }

    pub async fn create_booking(
        &self,
        bearer: &str,
        req: &CreateBookingRequest,
    ) -> Result<ServiceBooking, StatusCode> {
        self.post_json("/bookings", Some(bearer), req).await
    }
}

/// customer_bearer
///
/// Resolves the token to attach to a customer's upstream request. Asks the
/// identity provider for the current token but waits at most `TOKEN_WAIT`;
/// past that, or on a provider error, it proceeds with the stored snapshot
/// (possibly stale) rather than blocking the request. The backend rejects a
/// genuinely expired token with a clean 401, so staleness degrades to a
/// visible auth failure instead of a hang.
pub async fn customer_bearer(
    provider: &ProviderState,
    store: &SessionStore,
) -> Option<SessionToken> {
    let identity = store.identity().await;
    let Identity::Customer(customer) = identity else {
        return store.token_snapshot().await;
    };

    match tokio::time::timeout(TOKEN_WAIT, provider.get_id_token(customer.id, false)).await {
        Ok(Ok(token)) => Some(token),
        Ok(Err(e)) => {
            tracing::warn!(
                session_id = %store.id(),
                "provider token fetch failed, using stored token: {e}"
            );
            store.token_snapshot().await
        }
        Err(_) => {
            tracing::debug!(
                session_id = %store.id(),
                "provider did not answer within the wait bound, using stored token"
            );
            store.token_snapshot().await
        }
    }
}
