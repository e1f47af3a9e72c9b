use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::provider::ProviderState;
use crate::session::SessionStore;

/// Customer identity tokens expire at the provider after roughly 60 minutes;
/// renewing every 50 leaves a margin for a failed tick to be retried by the
/// next one before natural expiry.
pub const REFRESH_PERIOD: Duration = Duration::from_secs(50 * 60);

/// TokenRefresher
///
/// A lifecycle-scoped background task that keeps one customer session's
/// identity token fresh. Started when the session is created, torn down with
/// it: the handle is owned by the session registry entry, and `shutdown`
/// aborts the task so no refresher outlives its session.
///
/// Tick behavior:
/// - fires once immediately, then every `period`;
/// - skips silently when the store holds no customer identity;
/// - on success, hands the new token to `SessionStore::refresh_token`;
/// - on failure, leaves the existing token in place (it may still be valid
///   until natural expiry), flags the mirrored copy stale, and reports via
///   tracing. A single failed refresh never logs the customer out.
pub struct TokenRefresher {
    handle: JoinHandle<()>,
}

impl TokenRefresher {
    pub fn spawn(store: Arc<SessionStore>, provider: ProviderState, period: Duration) -> Self {
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                // The first tick completes immediately.
                ticker.tick().await;

                let identity = store.identity().await;
                let Some(customer) = identity.as_customer() else {
                    tracing::debug!(session_id = %store.id(), "no customer authenticated; skipping refresh tick");
                    continue;
                };

                match provider.get_id_token(customer.id, true).await {
                    Ok(token) => {
                        store.refresh_token(token).await;
                        tracing::debug!(session_id = %store.id(), "identity token refreshed");
                    }
                    Err(e) => {
                        tracing::warn!(
                            session_id = %store.id(),
                            "token refresh failed, keeping current token until next tick: {e}"
                        );
                        store.mark_stale().await;
                    }
                }
            }
        });

        Self { handle }
    }

    /// Aborts the background task. Idempotent.
    pub fn shutdown(&self) {
        self.handle.abort();
    }
}

impl Drop for TokenRefresher {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
