use axum::{
    extract::FromRequestParts,
    http::{Method, Request, StatusCode, Uri, header, request::Parts},
};
use jsonwebtoken::{EncodingKey, Header, encode};
use moto_portal::{
    AppState,
    auth::{Claims, CustomerUser, StaffUser},
    client::ApiClient,
    config::{AppConfig, Env},
    identity::{CustomerIdentity, Identity, SessionToken, StaffRole},
    provider::MockIdentityProvider,
    refresher::TokenRefresher,
    session::{MirrorState, MockSessionMirror, SessionRegistry, SessionStore},
};
use std::{
    sync::Arc,
    time::{Duration, SystemTime},
};
use uuid::Uuid;

// --- Helper Functions ---

const TEST_JWT_SECRET: &str = "test-secret-value-1234567890";
const TEST_STAFF_ID: Uuid = Uuid::from_u128(1);

fn create_token(staff_id: Uuid, role: StaffRole, exp_offset: i64) -> String {
    let now = SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .unwrap()
        .as_secs() as i64;

    let claims = Claims {
        sub: staff_id,
        role,
        name: "Test Staff".to_string(),
        email: "staff@dealer.test".to_string(),
        iat: now as usize,
        exp: (now + exp_offset) as usize,
    };

    let key = EncodingKey::from_secret(TEST_JWT_SECRET.as_bytes());
    encode(&Header::default(), &claims, &key).unwrap()
}

fn create_app_state(env: Env) -> AppState {
    let mut config = AppConfig::default();
    config.env = env;
    config.jwt_secret = TEST_JWT_SECRET.to_string();

    AppState {
        client: Arc::new(ApiClient::new("http://localhost:9100")),
        provider: Arc::new(MockIdentityProvider::new()),
        sessions: SessionRegistry::new(),
        mirror: Arc::new(MockSessionMirror::new()),
        config,
    }
}

/// Seeds a live customer session into the state's registry and returns its id.
async fn seed_customer_session(state: &AppState) -> Uuid {
    let session_id = Uuid::new_v4();
    let mirror = Arc::new(MockSessionMirror::new()) as MirrorState;
    let store = Arc::new(SessionStore::open(session_id, mirror));
    store
        .login(
            Identity::Customer(CustomerIdentity {
                id: Uuid::from_u128(0xC1),
                phone_number: "+353871234567".to_string(),
                email: None,
            }),
            SessionToken::new("provider-token"),
        )
        .await;
    let refresher = TokenRefresher::spawn(
        store.clone(),
        state.provider.clone(),
        Duration::from_secs(3000),
    );
    state.sessions.insert(session_id, store, refresher).await;
    session_id
}

/// Helper to get the mutable Parts struct from a generated Request.
fn get_request_parts(method: Method, uri: Uri) -> Parts {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .body(axum::body::Body::empty())
        .unwrap();
    let (parts, _) = request.into_parts();
    parts
}

fn with_bearer(mut parts: Parts, token: &str) -> Parts {
    parts.headers.insert(
        header::AUTHORIZATION,
        header::HeaderValue::from_str(&format!("Bearer {token}")).unwrap(),
    );
    parts
}

// --- StaffUser ---

#[tokio::test]
async fn test_staff_success_with_valid_jwt() {
    let token = create_token(TEST_STAFF_ID, StaffRole::BranchAdmin, 3600);
    let state = create_app_state(Env::Production);

    let mut parts = with_bearer(get_request_parts(Method::GET, "/".parse().unwrap()), &token);

    let staff = StaffUser::from_request_parts(&mut parts, &state).await;

    assert!(staff.is_ok());
    let staff = staff.unwrap();
    assert_eq!(staff.identity.id, TEST_STAFF_ID);
    assert_eq!(staff.identity.role, StaffRole::BranchAdmin);
    // The raw bearer is kept for upstream forwarding.
    assert_eq!(staff.bearer, token);
}

#[tokio::test]
async fn test_staff_failure_with_missing_header() {
    let state = create_app_state(Env::Production);
    let mut parts = get_request_parts(Method::GET, "/".parse().unwrap());

    let staff = StaffUser::from_request_parts(&mut parts, &state).await;

    assert_eq!(staff.unwrap_err(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_staff_failure_with_expired_jwt() {
    let token = create_token(TEST_STAFF_ID, StaffRole::SuperAdmin, -3600);
    let state = create_app_state(Env::Production);

    let mut parts = with_bearer(get_request_parts(Method::GET, "/".parse().unwrap()), &token);

    let staff = StaffUser::from_request_parts(&mut parts, &state).await;

    assert_eq!(staff.unwrap_err(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_staff_failure_with_wrong_secret() {
    let state = create_app_state(Env::Production);
    let key = EncodingKey::from_secret(b"some-other-secret-entirely");
    let now = SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .unwrap()
        .as_secs() as usize;
    let claims = Claims {
        sub: TEST_STAFF_ID,
        role: StaffRole::SuperAdmin,
        name: "Forger".to_string(),
        email: "forger@evil.test".to_string(),
        iat: now,
        exp: now + 3600,
    };
    let token = encode(&Header::default(), &claims, &key).unwrap();

    let mut parts = with_bearer(get_request_parts(Method::GET, "/".parse().unwrap()), &token);

    let staff = StaffUser::from_request_parts(&mut parts, &state).await;

    assert_eq!(staff.unwrap_err(), StatusCode::UNAUTHORIZED);
}

// --- Local bypass ---

#[tokio::test]
async fn test_local_bypass_injects_a_staff_identity() {
    let state = create_app_state(Env::Local);
    let staff_id = Uuid::new_v4();

    let mut parts = get_request_parts(Method::GET, "/".parse().unwrap());
    parts.headers.insert(
        "x-staff-role",
        header::HeaderValue::from_static("super-admin"),
    );
    parts.headers.insert(
        "x-staff-id",
        header::HeaderValue::from_str(&staff_id.to_string()).unwrap(),
    );

    let staff = StaffUser::from_request_parts(&mut parts, &state)
        .await
        .unwrap();
    assert_eq!(staff.identity.id, staff_id);
    assert_eq!(staff.identity.role, StaffRole::SuperAdmin);
}

#[tokio::test]
async fn test_local_bypass_is_inert_in_production() {
    let state = create_app_state(Env::Production);

    let mut parts = get_request_parts(Method::GET, "/".parse().unwrap());
    parts.headers.insert(
        "x-staff-role",
        header::HeaderValue::from_static("super-admin"),
    );

    let staff = StaffUser::from_request_parts(&mut parts, &state).await;

    assert_eq!(staff.unwrap_err(), StatusCode::UNAUTHORIZED);
}

// --- CustomerUser ---

#[tokio::test]
async fn test_customer_success_with_live_session_id() {
    let state = create_app_state(Env::Production);
    let session_id = seed_customer_session(&state).await;

    let mut parts = with_bearer(
        get_request_parts(Method::GET, "/".parse().unwrap()),
        &session_id.to_string(),
    );

    let customer = CustomerUser::from_request_parts(&mut parts, &state)
        .await
        .unwrap();
    assert_eq!(customer.session_id, session_id);
    assert_eq!(customer.identity.id, Uuid::from_u128(0xC1));
}

#[tokio::test]
async fn test_customer_failure_with_unknown_session_id() {
    let state = create_app_state(Env::Production);

    let mut parts = with_bearer(
        get_request_parts(Method::GET, "/".parse().unwrap()),
        &Uuid::new_v4().to_string(),
    );

    let customer = CustomerUser::from_request_parts(&mut parts, &state).await;

    assert_eq!(customer.unwrap_err(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_customer_failure_with_non_uuid_bearer() {
    let state = create_app_state(Env::Production);

    let mut parts = with_bearer(
        get_request_parts(Method::GET, "/".parse().unwrap()),
        "not-a-session-id",
    );

    let customer = CustomerUser::from_request_parts(&mut parts, &state).await;

    assert_eq!(customer.unwrap_err(), StatusCode::UNAUTHORIZED);
}

// --- Identity (infallible) ---

#[tokio::test]
async fn test_identity_resolves_unauthenticated_without_a_bearer() {
    let state = create_app_state(Env::Production);
    let mut parts = get_request_parts(Method::GET, "/".parse().unwrap());

    let identity = Identity::from_request_parts(&mut parts, &state)
        .await
        .unwrap();
    assert_eq!(identity, Identity::Unauthenticated);
}

#[tokio::test]
async fn test_identity_resolves_garbage_bearer_to_unauthenticated() {
    let state = create_app_state(Env::Production);
    let mut parts = with_bearer(
        get_request_parts(Method::GET, "/".parse().unwrap()),
        "garbage-token",
    );

    let identity = Identity::from_request_parts(&mut parts, &state)
        .await
        .unwrap();
    assert_eq!(identity, Identity::Unauthenticated);
}

#[tokio::test]
async fn test_identity_resolves_a_staff_jwt() {
    let token = create_token(TEST_STAFF_ID, StaffRole::SuperAdmin, 3600);
    let state = create_app_state(Env::Production);
    let mut parts = with_bearer(get_request_parts(Method::GET, "/".parse().unwrap()), &token);

    let identity = Identity::from_request_parts(&mut parts, &state)
        .await
        .unwrap();
    let staff = identity.as_staff().expect("expected a staff identity");
    assert_eq!(staff.id, TEST_STAFF_ID);
}

#[tokio::test]
async fn test_identity_resolves_a_customer_session_bearer() {
    let state = create_app_state(Env::Production);
    let session_id = seed_customer_session(&state).await;

    let mut parts = with_bearer(
        get_request_parts(Method::GET, "/".parse().unwrap()),
        &session_id.to_string(),
    );

    let identity = Identity::from_request_parts(&mut parts, &state)
        .await
        .unwrap();
    assert!(identity.as_customer().is_some());
}
