use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sqlx::{PgPool, Row};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::identity::{Identity, SessionToken};
use crate::provider::ProviderState;
use crate::refresher::TokenRefresher;

/// SessionState
///
/// The full state of one session: the active identity, its current bearer
/// token, and whether the token has been flagged stale (a refresh attempt
/// failed, so the persisted copy may be past its natural expiry).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionState {
    pub identity: Identity,
    pub token: Option<SessionToken>,
    pub stale: bool,
}

impl Default for SessionState {
    fn default() -> Self {
        Self {
            identity: Identity::Unauthenticated,
            token: None,
            stale: false,
        }
    }
}

/// SessionMirror
///
/// Durable mirror of session state. Every token mutation is written through so
/// a process restart can rehydrate sessions without forcing re-login. A failed
/// refresh flags the persisted token rather than deleting it: a later manual
/// refresh may still succeed within the grace window.
#[async_trait]
pub trait SessionMirror: Send + Sync {
    async fn persist(&self, id: Uuid, state: &SessionState) -> Result<(), String>;
    async fn flag_stale(&self, id: Uuid) -> Result<(), String>;
    async fn remove(&self, id: Uuid) -> Result<(), String>;
    async fn load_all(&self) -> Result<Vec<(Uuid, SessionState)>, String>;
}

/// Concrete type used to share the mirror across the application state.
pub type MirrorState = Arc<dyn SessionMirror>;

/// SessionStore
///
/// Holds at most one active Identity + Token pair. All mutations write
/// through to the durable mirror; mirror failures are logged, never fatal,
/// since the in-memory state remains authoritative for the running process.
pub struct SessionStore {
    id: Uuid,
    inner: RwLock<SessionState>,
    mirror: MirrorState,
}

impl SessionStore {
    /// Opens a fresh, unauthenticated store under the given session id.
    pub fn open(id: Uuid, mirror: MirrorState) -> Self {
        Self {
            id,
            inner: RwLock::new(SessionState::default()),
            mirror,
        }
    }

    /// Reconstructs a store from mirrored state, used during rehydration.
    pub fn resume(id: Uuid, state: SessionState, mirror: MirrorState) -> Self {
        Self {
            id,
            inner: RwLock::new(state),
            mirror,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub async fn identity(&self) -> Identity {
        self.inner.read().await.identity.clone()
    }

    /// The token as of this instant. Callers attach this snapshot to outbound
    /// requests; a refresh landing afterwards only affects later requests.
    pub async fn token_snapshot(&self) -> Option<SessionToken> {
        self.inner.read().await.token.clone()
    }

    pub async fn snapshot(&self) -> SessionState {
        self.inner.read().await.clone()
    }

    /// login
    ///
    /// Replaces any prior state unconditionally. There is no merge between
    /// identity kinds: logging in as staff while a customer session was
    /// active leaves only the staff identity.
    pub async fn login(&self, identity: Identity, token: SessionToken) {
        let mut state = self.inner.write().await;
        state.identity = identity;
        state.token = Some(token);
        state.stale = false;
        self.write_through(&state).await;
    }

    /// refresh_token
    ///
    /// Replaces the token field only, leaving the identity unchanged. Calling
    /// it with no active identity is a logged no-op, not an error.
    pub async fn refresh_token(&self, token: SessionToken) {
        let mut state = self.inner.write().await;
        if !state.identity.is_authenticated() {
            tracing::warn!(
                session_id = %self.id,
                "refresh_token called with no active identity; ignoring"
            );
            return;
        }
        state.token = Some(token);
        state.stale = false;
        self.write_through(&state).await;
    }

    /// mark_stale
    ///
    /// Records that the latest refresh attempt failed. The existing token is
    /// kept in place (it may still be valid until natural expiry) and the
    /// mirrored copy is flagged rather than deleted.
    pub async fn mark_stale(&self) {
        let mut state = self.inner.write().await;
        if !state.identity.is_authenticated() {
            return;
        }
        state.stale = true;
        if let Err(e) = self.mirror.flag_stale(self.id).await {
            tracing::error!(session_id = %self.id, "mirror flag_stale failed: {e}");
        }
    }

    /// logout
    ///
    /// Clears identity and token together, back to the exact initial state,
    /// and removes the mirrored row.
    pub async fn logout(&self) {
        let mut state = self.inner.write().await;
        *state = SessionState::default();
        if let Err(e) = self.mirror.remove(self.id).await {
            tracing::error!(session_id = %self.id, "mirror remove failed: {e}");
        }
    }

    async fn write_through(&self, state: &SessionState) {
        if let Err(e) = self.mirror.persist(self.id, state).await {
            tracing::error!(session_id = %self.id, "mirror persist failed: {e}");
        }
    }
}

// --- Postgres mirror ---

/// PostgresSessionMirror
///
/// The real mirror, one row per session in `portal_sessions`. The identity is
/// stored as its JSON encoding; the token value is stored as an opaque string
/// and is never logged.
pub struct PostgresSessionMirror {
    pool: PgPool,
}

impl PostgresSessionMirror {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Provisions the session table. Called at startup in the local
    /// environment only; production schemas are managed externally.
    pub async fn ensure_schema(&self) -> Result<(), String> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS portal_sessions (
                id UUID PRIMARY KEY,
                identity TEXT NOT NULL,
                token TEXT,
                token_issued_at TIMESTAMPTZ,
                stale BOOLEAN NOT NULL DEFAULT FALSE,
                updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map(|_| ())
        .map_err(|e| e.to_string())
    }
}

#[async_trait]
impl SessionMirror for PostgresSessionMirror {
    async fn persist(&self, id: Uuid, state: &SessionState) -> Result<(), String> {
        let identity_json = serde_json::to_string(&state.identity).map_err(|e| e.to_string())?;
        let (token_value, issued_at) = match &state.token {
            Some(t) => (Some(t.value.clone()), Some(t.issued_at)),
            None => (None, None),
        };

        sqlx::query(
            r#"
            INSERT INTO portal_sessions (id, identity, token, token_issued_at, stale, updated_at)
            VALUES ($1, $2, $3, $4, $5, NOW())
            ON CONFLICT (id) DO UPDATE SET
                identity = EXCLUDED.identity,
                token = EXCLUDED.token,
                token_issued_at = EXCLUDED.token_issued_at,
                stale = EXCLUDED.stale,
                updated_at = NOW()
            "#,
        )
        .bind(id)
        .bind(identity_json)
        .bind(token_value)
        .bind(issued_at)
        .bind(state.stale)
        .execute(&self.pool)
        .await
        .map(|_| ())
        .map_err(|e| e.to_string())
    }

    async fn flag_stale(&self, id: Uuid) -> Result<(), String> {
        sqlx::query("UPDATE portal_sessions SET stale = TRUE, updated_at = NOW() WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map(|_| ())
            .map_err(|e| e.to_string())
    }

    async fn remove(&self, id: Uuid) -> Result<(), String> {
        sqlx::query("DELETE FROM portal_sessions WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map(|_| ())
            .map_err(|e| e.to_string())
    }

    async fn load_all(&self) -> Result<Vec<(Uuid, SessionState)>, String> {
        let rows = sqlx::query(
            "SELECT id, identity, token, token_issued_at, stale FROM portal_sessions",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| e.to_string())?;

        let mut sessions = Vec::with_capacity(rows.len());
        for row in rows {
            let id: Uuid = row.get("id");
            let identity_json: String = row.get("identity");
            let identity: Identity = match serde_json::from_str(&identity_json) {
                Ok(i) => i,
                Err(e) => {
                    // A row this process cannot decode is skipped, not fatal.
                    tracing::error!(session_id = %id, "undecodable mirrored identity: {e}");
                    continue;
                }
            };
            let token = row
                .get::<Option<String>, _>("token")
                .zip(row.get::<Option<chrono::DateTime<chrono::Utc>>, _>("token_issued_at"))
                .map(|(value, issued_at)| SessionToken { value, issued_at });
            sessions.push((
                id,
                SessionState {
                    identity,
                    token,
                    stale: row.get("stale"),
                },
            ));
        }
        Ok(sessions)
    }
}

// --- Mock mirror (for unit and integration tests) ---

/// MockSessionMirror
///
/// In-memory mirror used by tests. Records every write so assertions can
/// inspect exactly what would have been persisted.
#[derive(Default)]
pub struct MockSessionMirror {
    /// When true, all operations return a simulated failure.
    pub should_fail: bool,
    entries: std::sync::Mutex<HashMap<Uuid, SessionState>>,
}

impl MockSessionMirror {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn new_failing() -> Self {
        Self {
            should_fail: true,
            ..Self::default()
        }
    }

    pub fn entry(&self, id: Uuid) -> Option<SessionState> {
        self.entries.lock().unwrap().get(&id).cloned()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl SessionMirror for MockSessionMirror {
    async fn persist(&self, id: Uuid, state: &SessionState) -> Result<(), String> {
        if self.should_fail {
            return Err("Mock Mirror Error: simulation requested".to_string());
        }
        self.entries.lock().unwrap().insert(id, state.clone());
        Ok(())
    }

    async fn flag_stale(&self, id: Uuid) -> Result<(), String> {
        if self.should_fail {
            return Err("Mock Mirror Error: simulation requested".to_string());
        }
        if let Some(state) = self.entries.lock().unwrap().get_mut(&id) {
            state.stale = true;
        }
        Ok(())
    }

    async fn remove(&self, id: Uuid) -> Result<(), String> {
        if self.should_fail {
            return Err("Mock Mirror Error: simulation requested".to_string());
        }
        self.entries.lock().unwrap().remove(&id);
        Ok(())
    }

    async fn load_all(&self) -> Result<Vec<(Uuid, SessionState)>, String> {
        if self.should_fail {
            return Err("Mock Mirror Error: simulation requested".to_string());
        }
        Ok(self
            .entries
            .lock()
            .unwrap()
            .iter()
            .map(|(id, state)| (*id, state.clone()))
            .collect())
    }
}

// --- Registry ---

struct CustomerSessionEntry {
    store: Arc<SessionStore>,
    refresher: TokenRefresher,
}

/// SessionRegistry
///
/// Server-side owner of all live customer sessions, keyed by the opaque
/// session id the SPA holds as its bearer. Each entry carries the session's
/// refresher handle so ending the session also tears the timer down; no
/// orphaned background refreshes survive a logout.
#[derive(Clone)]
pub struct SessionRegistry {
    inner: Arc<RwLock<HashMap<Uuid, CustomerSessionEntry>>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Restores sessions persisted by a previous process and restarts a
    /// refresher for each, so a restart does not force customers to re-login.
    pub async fn rehydrate(
        mirror: MirrorState,
        provider: ProviderState,
        refresh_period: Duration,
    ) -> Self {
        let registry = Self::new();
        let persisted = match mirror.load_all().await {
            Ok(rows) => rows,
            Err(e) => {
                tracing::error!("session rehydration failed, starting empty: {e}");
                return registry;
            }
        };

        let mut restored = 0usize;
        for (id, state) in persisted {
            if state.identity.as_customer().is_none() {
                continue;
            }
            let store = Arc::new(SessionStore::resume(id, state, mirror.clone()));
            let refresher =
                TokenRefresher::spawn(store.clone(), provider.clone(), refresh_period);
            registry.insert(id, store, refresher).await;
            restored += 1;
        }
        tracing::info!("rehydrated {restored} customer session(s) from the mirror");
        registry
    }

    pub async fn insert(&self, id: Uuid, store: Arc<SessionStore>, refresher: TokenRefresher) {
        self.inner
            .write()
            .await
            .insert(id, CustomerSessionEntry { store, refresher });
    }

    pub async fn store(&self, id: Uuid) -> Option<Arc<SessionStore>> {
        self.inner.read().await.get(&id).map(|e| e.store.clone())
    }

    /// The identity behind a session id; `Unauthenticated` for unknown ids.
    pub async fn identity(&self, id: Uuid) -> Identity {
        match self.store(id).await {
            Some(store) => store.identity().await,
            None => Identity::Unauthenticated,
        }
    }

    /// end
    ///
    /// Ends a session: aborts its refresher, clears the store, removes the
    /// mirrored row. Returns false when the id was not a live session.
    pub async fn end(&self, id: Uuid) -> bool {
        let entry = self.inner.write().await.remove(&id);
        match entry {
            Some(entry) => {
                entry.refresher.shutdown();
                entry.store.logout().await;
                true
            }
            None => false,
        }
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.len()
    }
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::new()
    }
}
