use moto_portal::{
    authorizer::{self, ADMIN_DASHBOARD, ADMIN_LOGIN, CUSTOMER_DASHBOARD, CUSTOMER_LOGIN},
    identity::{CustomerIdentity, Identity, StaffIdentity, StaffRole},
};
use uuid::Uuid;

// --- Identity fixtures ---

fn customer() -> Identity {
    Identity::Customer(CustomerIdentity {
        id: Uuid::from_u128(0xC1),
        phone_number: "+353871234567".to_string(),
        email: None,
    })
}

fn staff(role: StaffRole) -> Identity {
    Identity::Staff(StaffIdentity {
        id: Uuid::from_u128(0x5A),
        role,
        name: "Test Staff".to_string(),
        email: "staff@dealer.test".to_string(),
    })
}

// --- Public routes ---

#[test]
fn test_public_paths_allow_every_identity() {
    let identities = [
        Identity::Unauthenticated,
        customer(),
        staff(StaffRole::SuperAdmin),
        staff(StaffRole::BranchAdmin),
    ];
    let paths = [
        "/",
        "/health",
        "/bikes",
        "/bikes/9b2e7a30-0000-0000-0000-000000000001",
        "/finance/emi",
        "/customer/login",
        "/customer/otp/request",
        "/customer/otp/verify",
        "/admin/login",
    ];

    for identity in &identities {
        for path in &paths {
            let decision = authorizer::authorize(path, identity);
            assert!(decision.allowed, "{path} should be public for {identity:?}");
            assert_eq!(decision.redirect_to, None);
        }
    }
}

#[test]
fn test_unlisted_paths_outside_guarded_sections_are_open() {
    let decision = authorizer::authorize("/favicon.ico", &Identity::Unauthenticated);
    assert!(decision.allowed);

    let decision = authorizer::authorize("/api-docs/openapi.json", &customer());
    assert!(decision.allowed);
}

// --- Customer section ---

#[test]
fn test_anonymous_visitor_on_customer_page_redirects_to_customer_login() {
    let decision = authorizer::authorize("/customer/dashboard", &Identity::Unauthenticated);
    assert!(!decision.allowed);
    assert_eq!(decision.redirect_to, Some(CUSTOMER_LOGIN));
}

#[test]
fn test_customer_reaches_customer_pages() {
    for path in ["/customer/me", "/customer/vehicles", "/customer/bookings"] {
        let decision = authorizer::authorize(path, &customer());
        assert!(decision.allowed, "{path} should admit a customer");
    }
}

#[test]
fn test_staff_on_customer_page_is_sent_to_their_own_dashboard() {
    let decision = authorizer::authorize("/customer/vehicles", &staff(StaffRole::BranchAdmin));
    assert!(!decision.allowed);
    assert_eq!(decision.redirect_to, Some(ADMIN_DASHBOARD));
}

// --- Admin section ---

#[test]
fn test_anonymous_visitor_on_admin_page_redirects_to_admin_login() {
    let decision = authorizer::authorize("/admin/dashboard", &Identity::Unauthenticated);
    assert!(!decision.allowed);
    assert_eq!(decision.redirect_to, Some(ADMIN_LOGIN));
}

#[test]
fn test_customer_on_admin_page_is_sent_to_customer_dashboard() {
    let decision = authorizer::authorize("/admin/dashboard", &customer());
    assert!(!decision.allowed);
    assert_eq!(decision.redirect_to, Some(CUSTOMER_DASHBOARD));
}

#[test]
fn test_any_staff_role_reaches_general_admin_pages() {
    for role in [StaffRole::SuperAdmin, StaffRole::BranchAdmin] {
        for path in ["/admin/dashboard", "/admin/branches", "/admin/bookings"] {
            let decision = authorizer::authorize(path, &staff(role));
            assert!(decision.allowed, "{path} should admit {role:?}");
        }
    }
}

#[test]
fn test_super_admin_reaches_restricted_admin_pages() {
    for path in ["/admin/branches/add", "/admin/managers/add"] {
        let decision = authorizer::authorize(path, &staff(StaffRole::SuperAdmin));
        assert!(decision.allowed, "{path} should admit a super-admin");
    }
}

#[test]
fn test_branch_admin_bounced_from_restricted_admin_pages() {
    for path in ["/admin/branches/add", "/admin/managers/add"] {
        let decision = authorizer::authorize(path, &staff(StaffRole::BranchAdmin));
        assert!(!decision.allowed);
        assert_eq!(decision.redirect_to, Some(ADMIN_DASHBOARD));
    }
}

// --- Matching semantics ---

#[test]
fn test_prefix_match_does_not_cross_segment_boundaries() {
    // "/bikesale" must not inherit the "/bikes" prefix rule; with no rule of
    // its own it falls through to the open default.
    let decision = authorizer::authorize("/bikesale", &Identity::Unauthenticated);
    assert!(decision.allowed);

    // "/customerish" is likewise not part of the customer section.
    let decision = authorizer::authorize("/customerish", &Identity::Unauthenticated);
    assert!(decision.allowed);
}

#[test]
fn test_exact_login_rule_shadows_the_section_prefix() {
    // "/customer/login" sits above the "/customer" prefix rule, so it stays
    // public while its sibling pages do not.
    assert!(authorizer::authorize("/customer/login", &Identity::Unauthenticated).allowed);
    assert!(!authorizer::authorize("/customer/settings", &Identity::Unauthenticated).allowed);
}
