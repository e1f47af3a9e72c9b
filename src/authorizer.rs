use crate::identity::{Identity, StaffRole};

// Redirect targets handed back with every denial. The SPA treats these as
// client-side navigation targets; the route guard middleware turns them into
// 303 responses.
pub const CUSTOMER_LOGIN: &str = "/customer/login";
pub const CUSTOMER_DASHBOARD: &str = "/customer/dashboard";
pub const ADMIN_LOGIN: &str = "/admin/login";
pub const ADMIN_DASHBOARD: &str = "/admin/dashboard";

/// RouteVisibility
///
/// The access tier of a route. The three tiers are mutually exclusive: an
/// admin route always denies customers and vice versa, regardless of any
/// role refinement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteVisibility {
    Public,
    Admin,
    Customer,
}

/// How a descriptor's pattern is matched against a request path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchKind {
    Exact,
    /// Matches the pattern itself and anything below it (`/bikes`, `/bikes/7`).
    Prefix,
}

/// RouteDescriptor
///
/// One row of the route metadata table: a path pattern, its visibility tier,
/// and an optional refinement to a subset of staff roles. `allowed_roles` of
/// `None` on an admin route admits any staff role.
#[derive(Debug, Clone, Copy)]
pub struct RouteDescriptor {
    pub pattern: &'static str,
    pub match_kind: MatchKind,
    pub visibility: RouteVisibility,
    pub allowed_roles: Option<&'static [StaffRole]>,
}

const SUPER_ADMIN_ONLY: &[StaffRole] = &[StaffRole::SuperAdmin];

/// The route metadata table. Order matters: the first matching row wins, so
/// specific entries (login pages, super-admin sub-gates) precede the
/// catch-all prefix rows for their tier. The two trailing prefix rows
/// guarantee that nothing under `/admin` or `/customer` can fall through to
/// the public default.
pub const ROUTE_TABLE: &[RouteDescriptor] = &[
    // Public surface: marketing pages, catalog browsing, finance quoting,
    // health probe, and both login gateways.
    route(MatchKind::Exact, "/", RouteVisibility::Public),
    route(MatchKind::Exact, "/health", RouteVisibility::Public),
    route(MatchKind::Prefix, "/bikes", RouteVisibility::Public),
    route(MatchKind::Prefix, "/finance", RouteVisibility::Public),
    route(MatchKind::Exact, "/customer/login", RouteVisibility::Public),
    route(MatchKind::Prefix, "/customer/otp", RouteVisibility::Public),
    route(MatchKind::Exact, "/admin/login", RouteVisibility::Public),
    // Super-admin sub-gates: branch and manager creation.
    restricted(MatchKind::Exact, "/admin/branches/add", SUPER_ADMIN_ONLY),
    restricted(MatchKind::Exact, "/admin/managers/add", SUPER_ADMIN_ONLY),
    // Tier catch-alls.
    route(MatchKind::Prefix, "/admin", RouteVisibility::Admin),
    route(MatchKind::Prefix, "/customer", RouteVisibility::Customer),
];

const fn route(
    match_kind: MatchKind,
    pattern: &'static str,
    visibility: RouteVisibility,
) -> RouteDescriptor {
    RouteDescriptor {
        pattern,
        match_kind,
        visibility,
        allowed_roles: None,
    }
}

const fn restricted(
    match_kind: MatchKind,
    pattern: &'static str,
    allowed_roles: &'static [StaffRole],
) -> RouteDescriptor {
    RouteDescriptor {
        pattern,
        match_kind,
        visibility: RouteVisibility::Admin,
        allowed_roles: Some(allowed_roles),
    }
}

impl RouteDescriptor {
    pub fn matches(&self, path: &str) -> bool {
        match self.match_kind {
            MatchKind::Exact => path == self.pattern,
            MatchKind::Prefix => path
                .strip_prefix(self.pattern)
                .is_some_and(|rest| rest.is_empty() || rest.starts_with('/')),
        }
    }
}

/// Decision
///
/// The outcome of authorizing one path for one identity. A denial always
/// carries a redirect target; it is a navigation outcome, not an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decision {
    pub allowed: bool,
    pub redirect_to: Option<&'static str>,
}

impl Decision {
    fn allow() -> Self {
        Self {
            allowed: true,
            redirect_to: None,
        }
    }

    fn redirect(target: &'static str) -> Self {
        Self {
            allowed: false,
            redirect_to: Some(target),
        }
    }
}

/// The login page appropriate for a path, chosen by prefix.
fn login_for(path: &str) -> &'static str {
    if path == "/customer" || path.starts_with("/customer/") {
        CUSTOMER_LOGIN
    } else {
        ADMIN_LOGIN
    }
}

/// authorize
///
/// Pure function mapping `(path, identity)` to an allow-or-redirect decision.
/// Deterministic and total: every path has a defined outcome. Paths matching
/// no table row are public; the SPA's not-found handling owns them.
///
/// The two identity spaces are mutually exclusive here: a staff identity on a
/// customer route is sent to the admin dashboard and a customer identity on
/// an admin route is sent to the customer dashboard, never to a login page.
pub fn authorize(path: &str, identity: &Identity) -> Decision {
    let descriptor = ROUTE_TABLE.iter().find(|d| d.matches(path));

    let Some(descriptor) = descriptor else {
        return Decision::allow();
    };

    match descriptor.visibility {
        RouteVisibility::Public => Decision::allow(),
        _ if !identity.is_authenticated() => Decision::redirect(login_for(path)),
        RouteVisibility::Admin => match identity {
            Identity::Customer(_) => Decision::redirect(CUSTOMER_DASHBOARD),
            Identity::Staff(staff) => {
                let permitted = descriptor
                    .allowed_roles
                    .is_none_or(|roles| roles.contains(&staff.role));
                if permitted {
                    Decision::allow()
                } else {
                    Decision::redirect(ADMIN_DASHBOARD)
                }
            }
            Identity::Unauthenticated => Decision::redirect(login_for(path)),
        },
        RouteVisibility::Customer => match identity {
            Identity::Staff(_) => Decision::redirect(ADMIN_DASHBOARD),
            _ => Decision::allow(),
        },
    }
}
