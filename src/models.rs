use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::identity::{CustomerIdentity, StaffIdentity};

// --- Catalog ---

/// Bike
///
/// One model in the vehicle inventory, as served by the dealer backend.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct Bike {
    pub id: Uuid,
    pub model_name: String,
    pub brand: String,
    pub category: String,
    pub engine_cc: i32,
    pub ex_showroom_price: f64,
    pub in_stock: i32,
}

/// BikeFilter
///
/// Accepted query parameters for the public catalog listing (GET /bikes).
#[derive(Deserialize, utoipa::IntoParams)]
pub struct BikeFilter {
    /// Optional category filter (e.g., "commuter", "sport").
    pub category: Option<String>,
    /// Optional search string matched against model name and brand.
    pub search: Option<String>,
}

// --- Finance ---

/// EmiRequest
///
/// Query parameters for the EMI quote endpoint (GET /finance/emi).
#[derive(Debug, Clone, Deserialize, Serialize, utoipa::IntoParams)]
pub struct EmiRequest {
    /// On-road price of the vehicle.
    pub price: f64,
    /// Up-front payment deducted from the financed amount.
    pub down_payment: f64,
    /// Annual interest rate in percent (e.g., 9.5).
    pub annual_rate_pct: f64,
    /// Loan tenure in months.
    pub tenure_months: u32,
}

/// EmiQuote
///
/// Output of the EMI calculation, all amounts rounded to two decimals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct EmiQuote {
    pub loan_amount: f64,
    pub monthly_installment: f64,
    pub total_payment: f64,
    pub total_interest: f64,
}

// --- Authentication payloads ---

/// OtpRequest
///
/// Input for requesting a one-time code (POST /customer/otp/request).
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct OtpRequest {
    pub phone_number: String,
}

/// OtpVerifyRequest
///
/// Input for exchanging a one-time code for a session
/// (POST /customer/otp/verify).
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct OtpVerifyRequest {
    pub phone_number: String,
    pub code: String,
}

/// CustomerLoginResponse
///
/// Handed to the SPA after OTP verification. The session id is the opaque
/// bearer the SPA attaches from here on; the identity token itself stays on
/// the server and rotates transparently.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct CustomerLoginResponse {
    pub session_id: Uuid,
    pub customer: CustomerIdentity,
}

/// StaffLoginRequest
///
/// Input for the staff login endpoint (POST /admin/login). The credentials
/// are passed through to the dealer backend and never persisted here.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct StaffLoginRequest {
    pub email: String,
    pub password: String,
}

/// StaffLoginResponse
///
/// The dealer backend's answer to a successful staff login: the signed JWT
/// the SPA will present as its bearer, plus the resolved staff profile.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct StaffLoginResponse {
    pub token: String,
    pub staff: StaffIdentity,
}

// --- Branch & staff management ---

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct Branch {
    pub id: Uuid,
    pub name: String,
    pub city: String,
    pub address: String,
    pub manager_id: Option<Uuid>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct CreateBranchRequest {
    pub name: String,
    pub city: String,
    pub address: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct CreateManagerRequest {
    pub name: String,
    pub email: String,
    pub branch_id: Uuid,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct Manager {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub branch_id: Uuid,
}

// --- Vehicles & VAS ---

/// Vehicle
///
/// A customer-owned vehicle. `registration_number` stays empty until the
/// registration workflow completes on the backend.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct Vehicle {
    pub id: Uuid,
    pub customer_id: Uuid,
    pub bike_id: Uuid,
    pub chassis_number: String,
    pub registration_number: Option<String>,
    #[ts(type = "string")]
    pub registered_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct RegisterVehicleRequest {
    pub bike_id: Uuid,
    pub chassis_number: String,
    pub color: String,
}

/// Vas
///
/// A value-added service: a purchasable coverage product attachable to a
/// customer's vehicle.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct Vas {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub price: f64,
    pub duration_months: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct ActivateVasRequest {
    pub vehicle_id: Uuid,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct VasActivation {
    pub id: Uuid,
    pub vas_id: Uuid,
    pub vehicle_id: Uuid,
    #[ts(type = "string")]
    pub activated_at: DateTime<Utc>,
    #[ts(type = "string")]
    pub expires_at: DateTime<Utc>,
}

// --- Service bookings ---

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct ServiceBooking {
    pub id: Uuid,
    pub customer_id: Uuid,
    pub vehicle_id: Uuid,
    pub branch_id: Uuid,
    #[ts(type = "string")]
    pub slot: DateTime<Utc>,
    /// "pending" | "confirmed" | "completed" | "cancelled", owned by the backend.
    pub status: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct CreateBookingRequest {
    pub vehicle_id: Uuid,
    pub branch_id: Uuid,
    #[ts(type = "string")]
    pub slot: DateTime<Utc>,
}

// --- Stock ---

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct StockAssignmentRequest {
    pub bike_id: Uuid,
    pub branch_id: Uuid,
    pub quantity: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct StockAssignment {
    pub id: Uuid,
    pub bike_id: Uuid,
    pub branch_id: Uuid,
    pub quantity: i32,
    #[ts(type = "string")]
    pub assigned_at: DateTime<Utc>,
}

/// CsvImportReport
///
/// The backend's verdict on a bulk stock upload: row counts plus per-row
/// rejection messages for the review screen. The CSV shape itself is owned
/// by the backend; the portal only forwards the file.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct CsvImportReport {
    pub total_rows: i64,
    pub imported: i64,
    pub rejected: i64,
    pub errors: Vec<String>,
}

// --- Dashboard ---

/// DealerStats
///
/// Core counters for the admin dashboard (GET /admin/dashboard).
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct DealerStats {
    pub total_bikes: i64,
    pub total_branches: i64,
    pub pending_bookings: i64,
    pub low_stock_alerts: i64,
}
