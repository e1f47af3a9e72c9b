use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;
use utoipa::ToSchema;
use uuid::Uuid;

/// StaffRole
///
/// The two staff tiers recognized by the portal. `SuperAdmin` can additionally
/// create branches and branch managers; `BranchAdmin` is restricted to the
/// day-to-day surface of their own branch.
///
/// Serialized as `super-admin` / `branch-admin`, matching the role claim
/// issued by the dealer backend's JWTs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema)]
#[serde(rename_all = "kebab-case")]
#[ts(export)]
pub enum StaffRole {
    SuperAdmin,
    BranchAdmin,
}

impl StaffRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            StaffRole::SuperAdmin => "super-admin",
            StaffRole::BranchAdmin => "branch-admin",
        }
    }
}

/// StaffIdentity
///
/// The resolved identity of a staff member, decoded from a dealer-backend JWT.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct StaffIdentity {
    pub id: Uuid,
    pub role: StaffRole,
    pub name: String,
    pub email: String,
}

/// CustomerIdentity
///
/// The resolved identity of a phone-verified customer. The email is optional
/// because OTP onboarding only requires a phone number.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct CustomerIdentity {
    pub id: Uuid,
    pub phone_number: String,
    pub email: Option<String>,
}

/// Identity
///
/// The authenticated principal driving a session. A single tagged union owned
/// by the session layer: exactly one variant holds at a time, so a staff and a
/// customer identity can never be simultaneously active. Route authorization
/// resolves the kind by pattern match rather than by probing two nullable
/// slots.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema)]
#[serde(tag = "kind", rename_all = "snake_case")]
#[ts(export)]
pub enum Identity {
    Unauthenticated,
    Staff(StaffIdentity),
    Customer(CustomerIdentity),
}

impl Identity {
    pub fn is_authenticated(&self) -> bool {
        !matches!(self, Identity::Unauthenticated)
    }

    /// Returns the customer payload when this identity is a customer.
    pub fn as_customer(&self) -> Option<&CustomerIdentity> {
        match self {
            Identity::Customer(c) => Some(c),
            _ => None,
        }
    }

    pub fn as_staff(&self) -> Option<&StaffIdentity> {
        match self {
            Identity::Staff(s) => Some(s),
            _ => None,
        }
    }
}

/// SessionToken
///
/// An opaque bearer credential with its issuance time. Owned exclusively by
/// the session store; the raw value is attached to outbound requests and is
/// never written to logs.
///
/// Customer identity tokens expire at the provider roughly 60 minutes after
/// issuance, which is why the refresher renews them on a 50 minute cadence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionToken {
    pub value: String,
    pub issued_at: DateTime<Utc>,
}

impl SessionToken {
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            issued_at: Utc::now(),
        }
    }
}
