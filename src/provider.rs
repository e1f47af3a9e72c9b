use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use serde::Deserialize;
use uuid::Uuid;

use crate::identity::SessionToken;

/// VerifiedCustomer
///
/// The outcome of a successful OTP verification at the identity provider:
/// the canonical customer id, the verified phone number, an optional email
/// the provider already knows, and the initial identity token.
#[derive(Debug, Clone)]
pub struct VerifiedCustomer {
    pub id: Uuid,
    pub phone_number: String,
    pub email: Option<String>,
    pub token: SessionToken,
}

/// IdentityProvider
///
/// Abstract contract to the external identity provider. The portal only
/// consumes OTP verification and token issuance/refresh; OTP delivery and
/// token cryptography stay on the provider's side.
///
/// `Send + Sync + async_trait` so the trait object (`Arc<dyn IdentityProvider>`)
/// is shareable across Axum's asynchronous task boundaries.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Asks the provider to deliver a one-time code to the given phone number.
    async fn send_otp(&self, phone_number: &str) -> Result<(), String>;

    /// Exchanges a phone number and one-time code for a verified customer
    /// identity plus its initial token.
    async fn verify_otp(&self, phone_number: &str, code: &str)
    -> Result<VerifiedCustomer, String>;

    /// Fetches a bearer token for an already-verified customer.
    /// `force_refresh` bypasses the provider's token cache; the refresher
    /// uses it to renew tokens ahead of natural expiry.
    async fn get_id_token(&self, uid: Uuid, force_refresh: bool) -> Result<SessionToken, String>;
}

/// Concrete type used to share the provider across the application state.
pub type ProviderState = Arc<dyn IdentityProvider>;

// --- Wire shapes for the provider's REST surface ---

#[derive(Deserialize)]
struct VerifyOtpResponse {
    uid: Uuid,
    phone_number: String,
    email: Option<String>,
    id_token: String,
}

#[derive(Deserialize)]
struct TokenResponse {
    id_token: String,
}

/// HttpIdentityProvider
///
/// The real implementation, talking to the identity provider's REST surface
/// with an `apikey` header on every call.
#[derive(Clone)]
pub struct HttpIdentityProvider {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl HttpIdentityProvider {
    pub fn new(base_url: &str, api_key: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        }
    }
}

#[async_trait]
impl IdentityProvider for HttpIdentityProvider {
    async fn send_otp(&self, phone_number: &str) -> Result<(), String> {
        let response = self
            .http
            .post(format!("{}/otp/send", self.base_url))
            .header("apikey", &self.api_key)
            .json(&serde_json::json!({ "phone_number": phone_number }))
            .send()
            .await
            .map_err(|e| format!("otp send transport error: {e}"))?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(format!("otp send rejected: {}", response.status()))
        }
    }

    async fn verify_otp(
        &self,
        phone_number: &str,
        code: &str,
    ) -> Result<VerifiedCustomer, String> {
        let response = self
            .http
            .post(format!("{}/otp/verify", self.base_url))
            .header("apikey", &self.api_key)
            .json(&serde_json::json!({ "phone_number": phone_number, "code": code }))
            .send()
            .await
            .map_err(|e| format!("otp verify transport error: {e}"))?;

        if !response.status().is_success() {
            return Err(format!("otp verify rejected: {}", response.status()));
        }

        let verified = response
            .json::<VerifyOtpResponse>()
            .await
            .map_err(|e| format!("otp verify malformed response: {e}"))?;

        Ok(VerifiedCustomer {
            id: verified.uid,
            phone_number: verified.phone_number,
            email: verified.email,
            token: SessionToken::new(verified.id_token),
        })
    }

    async fn get_id_token(&self, uid: Uuid, force_refresh: bool) -> Result<SessionToken, String> {
        let response = self
            .http
            .post(format!("{}/token", self.base_url))
            .header("apikey", &self.api_key)
            .json(&serde_json::json!({ "uid": uid, "force_refresh": force_refresh }))
            .send()
            .await
            .map_err(|e| format!("token fetch transport error: {e}"))?;

        if !response.status().is_success() {
            return Err(format!("token fetch rejected: {}", response.status()));
        }

        let body = response
            .json::<TokenResponse>()
            .await
            .map_err(|e| format!("token fetch malformed response: {e}"))?;

        Ok(SessionToken::new(body.id_token))
    }
}

/// MockIdentityProvider
///
/// Test double. Issues deterministic tokens (`mock-token-1`, `mock-token-2`,
/// ...) and accepts the fixed OTP code `123456` for any phone number.
pub struct MockIdentityProvider {
    /// When true, all operations return a simulated failure.
    pub should_fail: bool,
    /// When set, every operation sleeps this long before answering,
    /// simulating a slow or unresponsive provider.
    pub delay: Option<std::time::Duration>,
    /// The customer id handed out by `verify_otp`.
    pub customer_id: Uuid,
    token_counter: AtomicUsize,
}

impl MockIdentityProvider {
    pub fn new() -> Self {
        Self {
            should_fail: false,
            delay: None,
            customer_id: Uuid::from_u128(0xC1),
            token_counter: AtomicUsize::new(0),
        }
    }

    pub fn new_failing() -> Self {
        Self {
            should_fail: true,
            ..Self::new()
        }
    }

    pub fn new_delayed(delay: std::time::Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Self::new()
        }
    }

    async fn simulate_latency(&self) {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
    }

    /// Number of tokens issued so far, across both verify and refresh paths.
    pub fn tokens_issued(&self) -> usize {
        self.token_counter.load(Ordering::SeqCst)
    }

    fn next_token(&self) -> SessionToken {
        let n = self.token_counter.fetch_add(1, Ordering::SeqCst) + 1;
        SessionToken::new(format!("mock-token-{n}"))
    }
}

impl Default for MockIdentityProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl IdentityProvider for MockIdentityProvider {
    async fn send_otp(&self, _phone_number: &str) -> Result<(), String> {
        self.simulate_latency().await;
        if self.should_fail {
            return Err("Mock Provider Error: simulation requested".to_string());
        }
        Ok(())
    }

    async fn verify_otp(
        &self,
        phone_number: &str,
        code: &str,
    ) -> Result<VerifiedCustomer, String> {
        self.simulate_latency().await;
        if self.should_fail {
            return Err("Mock Provider Error: simulation requested".to_string());
        }
        if code != "123456" {
            return Err("otp verify rejected: invalid code".to_string());
        }
        Ok(VerifiedCustomer {
            id: self.customer_id,
            phone_number: phone_number.to_string(),
            email: None,
            token: self.next_token(),
        })
    }

    async fn get_id_token(&self, _uid: Uuid, _force_refresh: bool) -> Result<SessionToken, String> {
        self.simulate_latency().await;
        if self.should_fail {
            return Err("Mock Provider Error: simulation requested".to_string());
        }
        Ok(self.next_token())
    }
}
