/// Router Module Index
///
/// Organizes the portal's routing into visibility-segregated modules. The
/// split mirrors the guard table: which module a route lives in states who it
/// is for, while the guard middleware enforces it for every request before a
/// handler runs.

/// Routes accessible without a session (catalog, finance, onboarding).
pub mod public;

/// Routes scoped to an authenticated customer session.
pub mod customer;

/// Routes restricted to staff; two of them further to super-admins.
pub mod admin;
