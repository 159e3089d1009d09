//! Token manager for the Trakt device-code flow
//!
//! Manages the OAuth token lifecycle:
//! - Hydration from the credential store on first use
//! - Refresh grant when the token has expired
//! - Device-code grant as the single fallback when refresh fails
//! - Proactive refresh ahead of expiry for background schedulers
//!
//! Credentials sit behind an `RwLock`; a separate grant gate ensures only one
//! refresh or device-code grant runs at a time. The device-code grant runs on
//! its own task that every waiting caller shares. Dropping a caller (a client
//! disconnect, a scheduler timeout) never abandons the grant half way: the
//! task still finishes, persists the token or clears the device code, and
//! records the final state. The task is bounded by `grant_timeout` and
//! cancelled by the shutdown token.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use futures::future::{BoxFuture, FutureExt, Shared};
use overtrakt_domain::constants::{
    ACTION_REQUIRED_MESSAGE, DEFAULT_GRANT_TIMEOUT_SECS, DEVICE_POLL_SLOW_DOWN_SECS,
    OAUTH_REDIRECT_URI, REFRESH_GRANT_TYPE,
};
use overtrakt_domain::{
    impl_str_enum, AccessTokenResponse, BearerToken, Credentials, DeviceCodeResponse,
    DeviceTokenRequest, OvertraktError, RefreshTokenRequest, Result,
};
use tokio::sync::{Mutex, RwLock};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

use super::ports::{CredentialStore, DeviceAuthClient, DevicePoll};
use crate::notification_ports::Notifier;

/// Position of the device-code grant state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GrantState {
    Idle,
    CodeRequested,
    Polling,
    Authorized,
    Expired,
    Denied,
    TransportFailed,
    Cancelled,
}

impl_str_enum!(GrantState {
    Idle => "idle",
    CodeRequested => "code_requested",
    Polling => "polling",
    Authorized => "authorized",
    Expired => "expired",
    Denied => "denied",
    TransportFailed => "transport_failed",
    Cancelled => "cancelled",
});

/// Token manager configuration
#[derive(Debug, Clone)]
pub struct TokenManagerConfig {
    /// Upper bound on one device-code grant, regardless of the server's
    /// `expires_in`.
    pub grant_timeout: Duration,
}

impl Default for TokenManagerConfig {
    fn default() -> Self {
        Self { grant_timeout: Duration::from_secs(DEFAULT_GRANT_TIMEOUT_SECS) }
    }
}

/// In-flight device-code grant, awaited by every caller that needs it.
type GrantTask = Shared<BoxFuture<'static, Result<()>>>;

/// Owns the OAuth credentials for one Trakt client.
pub struct TokenManager {
    inner: Arc<GrantContext>,
    grant_gate: Mutex<()>,
    inflight: Arc<parking_lot::Mutex<Option<GrantTask>>>,
    shutdown: CancellationToken,
    config: TokenManagerConfig,
}

/// State shared with the spawned grant task.
struct GrantContext {
    credentials: RwLock<Credentials>,
    state: parking_lot::RwLock<GrantState>,
    client: Arc<dyn DeviceAuthClient>,
    store: Arc<dyn CredentialStore>,
    notifier: Arc<dyn Notifier>,
}

impl TokenManager {
    /// Create a manager with empty credentials.
    ///
    /// Nothing is loaded until the first `authenticate` call.
    pub fn new(
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        client: Arc<dyn DeviceAuthClient>,
        store: Arc<dyn CredentialStore>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            inner: Arc::new(GrantContext {
                credentials: RwLock::new(Credentials::new(client_id, client_secret)),
                state: parking_lot::RwLock::new(GrantState::Idle),
                client,
                store,
                notifier,
            }),
            grant_gate: Mutex::new(()),
            inflight: Arc::new(parking_lot::Mutex::new(None)),
            shutdown: CancellationToken::new(),
            config: TokenManagerConfig::default(),
        }
    }

    pub fn with_config(mut self, config: TokenManagerConfig) -> Self {
        self.config = config;
        self
    }

    /// Cancel in-flight grants when `token` is cancelled.
    pub fn with_shutdown(mut self, token: CancellationToken) -> Self {
        self.shutdown = token;
        self
    }

    /// Ensure a non-expired access token is held.
    ///
    /// Cheap when the current token is still valid: no store or network
    /// access. Otherwise tries a refresh grant once, then falls back to a
    /// single device-code grant. A grant already in flight is joined rather
    /// than repeated.
    ///
    /// # Errors
    /// - `AuthExpired` when the device code window closes first
    /// - `Auth` when the user denies the request
    /// - `Transport`/`Decode` when the OAuth endpoints fail
    /// - `Cancelled` on shutdown
    pub async fn authenticate(&self) -> Result<()> {
        if self.inner.credentials.read().await.is_valid_at(Utc::now()) {
            return Ok(());
        }

        let _gate = self.grant_gate.lock().await;

        self.inner.hydrate_if_empty().await;
        let snapshot = self.inner.credentials.read().await.clone();
        if snapshot.is_valid_at(Utc::now()) {
            return Ok(());
        }

        let inflight = self.inflight.lock().clone();
        if let Some(grant) = inflight {
            debug!("joining device code grant already in flight");
            return grant.await;
        }

        if snapshot.has_refresh_token() {
            info!(client_id = %snapshot.client_id, "access token expired, requesting refreshed token");
            match self.inner.refresh(&snapshot).await {
                Ok(token) => {
                    self.inner.save_token(&token).await;
                    return Ok(());
                }
                Err(err) => {
                    warn!(error = %err, "refresh grant failed, falling back to device code grant");
                }
            }
        }

        let grant = self.device_grant_task(snapshot);
        grant.await
    }

    /// Refresh when the token expires within `margin`.
    ///
    /// Returns `Ok(true)` when a refresh happened. Never starts a device-code
    /// grant; without a refresh token this is a no-op and the next
    /// `authenticate` call handles it.
    ///
    /// # Errors
    /// Propagates refresh grant failures.
    #[instrument(skip(self))]
    pub async fn refresh_if_expiring(&self, margin: chrono::Duration) -> Result<bool> {
        if !self.inner.credentials.read().await.expires_within(Utc::now(), margin) {
            return Ok(false);
        }

        let _gate = self.grant_gate.lock().await;

        self.inner.hydrate_if_empty().await;
        let snapshot = self.inner.credentials.read().await.clone();
        if !snapshot.expires_within(Utc::now(), margin) {
            return Ok(false);
        }
        if !snapshot.has_refresh_token() {
            debug!("no refresh token held, skipping proactive refresh");
            return Ok(false);
        }

        let token = self.inner.refresh(&snapshot).await?;
        self.inner.save_token(&token).await;
        let expires_at = self.expires_at().await;
        info!(expires_at = ?expires_at, "access token refreshed ahead of expiry");
        Ok(true)
    }

    /// Current token for signing requests.
    pub async fn bearer(&self) -> Option<BearerToken> {
        self.inner.credentials.read().await.bearer()
    }

    pub async fn has_access_token(&self) -> bool {
        self.inner.credentials.read().await.has_access_token()
    }

    pub async fn expires_at(&self) -> Option<chrono::DateTime<Utc>> {
        self.inner.credentials.read().await.expires_at
    }

    /// Last observed device-code grant state.
    pub fn grant_state(&self) -> GrantState {
        self.inner.grant_state()
    }

    /// Join the in-flight grant or spawn a new one.
    fn device_grant_task(&self, creds: Credentials) -> GrantTask {
        let mut slot = self.inflight.lock();
        if let Some(grant) = slot.as_ref() {
            return grant.clone();
        }

        let inner = Arc::clone(&self.inner);
        let inflight = Arc::clone(&self.inflight);
        let shutdown = self.shutdown.clone();
        let timeout = self.config.grant_timeout;
        let handle = tokio::spawn(async move {
            let outcome = inner.device_grant(&creds, timeout, &shutdown).await;
            if let Ok(token) = &outcome {
                inner.save_token(token).await;
            }
            inflight.lock().take();
            outcome.map(|_| ())
        });

        let inflight = Arc::clone(&self.inflight);
        let grant = async move {
            handle.await.unwrap_or_else(|err| {
                inflight.lock().take();
                Err(OvertraktError::Internal(format!("device code grant task failed: {err}")))
            })
        }
        .boxed()
        .shared();

        *slot = Some(grant.clone());
        grant
    }
}

impl GrantContext {
    fn grant_state(&self) -> GrantState {
        *self.state.read()
    }

    async fn hydrate_if_empty(&self) {
        let client_id = {
            let creds = self.credentials.read().await;
            if creds.has_access_token() {
                return;
            }
            creds.client_id.clone()
        };

        match self.store.get(&client_id).await {
            Ok(Some(stored)) => {
                debug!(client_id = %client_id, expires_at = %stored.expires_at, "loaded stored credentials");
                self.credentials.write().await.hydrate(stored);
            }
            Ok(None) => debug!(client_id = %client_id, "no stored credentials"),
            Err(err) => {
                error!(client_id = %client_id, error = %err, "failed to load stored credentials");
            }
        }
    }

    async fn refresh(&self, creds: &Credentials) -> Result<AccessTokenResponse> {
        let request = RefreshTokenRequest {
            client_id: creds.client_id.clone(),
            client_secret: creds.client_secret.clone(),
            grant_type: REFRESH_GRANT_TYPE.to_string(),
            redirect_uri: OAUTH_REDIRECT_URI.to_string(),
            refresh_token: creds.refresh_token.clone(),
        };

        let token = self.client.refresh_token(&request).await?;
        if token.is_pending() {
            return Err(OvertraktError::Auth("refresh grant returned no access token".into()));
        }
        Ok(token)
    }

    async fn device_grant(
        &self,
        creds: &Credentials,
        grant_timeout: Duration,
        shutdown: &CancellationToken,
    ) -> Result<AccessTokenResponse> {
        let outcome = tokio::select! {
            () = shutdown.cancelled() => {
                self.set_state(GrantState::Cancelled);
                Err(OvertraktError::Cancelled("device code grant cancelled by shutdown".into()))
            }
            result = tokio::time::timeout(grant_timeout, self.poll_device_grant(creds)) => {
                result.unwrap_or_else(|_| {
                    self.set_state(GrantState::Expired);
                    Err(OvertraktError::AuthExpired(format!(
                        "device code grant did not finish within {}s",
                        grant_timeout.as_secs()
                    )))
                })
            }
        };

        if let Err(err) = &outcome {
            self.credentials.write().await.device_code = None;
            warn!(error = %err, state = %self.grant_state(), "device code grant failed");
        }
        outcome
    }

    async fn poll_device_grant(&self, creds: &Credentials) -> Result<AccessTokenResponse> {
        self.set_state(GrantState::CodeRequested);
        let code = self.client.request_device_code(&creds.client_id).await.inspect_err(|_| {
            self.set_state(GrantState::TransportFailed);
        })?;

        let deadline = Instant::now() + Duration::from_secs(code.expires_in);
        self.credentials.write().await.device_code = Some(code.device_code.clone());
        self.announce(&code);

        self.set_state(GrantState::Polling);
        let request = DeviceTokenRequest {
            code: code.device_code.clone(),
            client_id: creds.client_id.clone(),
            client_secret: creds.client_secret.clone(),
        };
        let mut interval = Duration::from_secs(code.interval.max(1));
        let mut attempt: u32 = 0;

        loop {
            if Instant::now() >= deadline {
                self.set_state(GrantState::Expired);
                return Err(OvertraktError::AuthExpired(
                    "unable to fetch trakt access token within allowed time limit".into(),
                ));
            }

            attempt += 1;
            let poll = self.client.poll_device_token(&request).await.inspect_err(|_| {
                self.set_state(GrantState::TransportFailed);
            })?;

            match poll {
                DevicePoll::Authorized(token) if !token.is_pending() => {
                    self.set_state(GrantState::Authorized);
                    info!(attempt, "device code authorised");
                    return Ok(token);
                }
                DevicePoll::Authorized(_) | DevicePoll::Pending => {
                    debug!(attempt, user_code = %code.user_code, "waiting for authorisation");
                }
                DevicePoll::SlowDown => {
                    interval += Duration::from_secs(DEVICE_POLL_SLOW_DOWN_SECS);
                    debug!(attempt, interval_secs = interval.as_secs(), "server asked to slow down");
                }
                DevicePoll::Denied => {
                    self.set_state(GrantState::Denied);
                    return Err(OvertraktError::Auth("user denied the device code request".into()));
                }
                DevicePoll::Expired => {
                    self.set_state(GrantState::Expired);
                    return Err(OvertraktError::AuthExpired("device code expired".into()));
                }
            }

            tokio::time::sleep(interval).await;
        }
    }

    /// Log the banner and hand the code to the notifier without waiting on
    /// delivery; polling starts as soon as the code is issued.
    fn announce(&self, code: &DeviceCodeResponse) {
        let window = u32::try_from(code.expires_in).unwrap_or(u32::MAX);
        let expires_at = Utc::now() + chrono::Duration::seconds(i64::from(window));
        let expires_label = expires_at.format("%d %b %y %H:%M UTC");

        warn!("******************************** ACTION REQUIRED ********************************");
        warn!(
            verification_url = %code.verification_url,
            user_code = %code.user_code,
            expires_at = %expires_at,
            "Please go to {} and enter the following code: {}",
            code.verification_url,
            code.user_code
        );
        warn!("Code will expire at {expires_label}");
        warn!("*********************************************************************************");

        let message = format!(
            "{ACTION_REQUIRED_MESSAGE} Go to {} and enter code {} before {expires_label}.",
            code.verification_url, code.user_code
        );
        let notifier = Arc::clone(&self.notifier);
        tokio::spawn(async move { notifier.send(&message).await });
    }

    async fn save_token(&self, token: &AccessTokenResponse) {
        let stored = {
            let mut creds = self.credentials.write().await;
            *creds = creds.with_token(token);
            creds.to_stored()
        };

        let Some(stored) = stored else {
            warn!("granted token has no usable expiry, not persisting");
            return;
        };

        if let Err(err) = self.store.upsert(&stored).await {
            error!(client_id = %stored.client_id, error = %err, "failed to persist credentials");
        }
    }

    fn set_state(&self, state: GrantState) {
        *self.state.write() = state;
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use overtrakt_domain::StoredCredentials;
    use parking_lot::Mutex as SyncMutex;

    use super::*;

    #[derive(Default)]
    struct ScriptedClient {
        code_requests: AtomicUsize,
        polls: SyncMutex<VecDeque<Result<DevicePoll>>>,
        poll_calls: AtomicUsize,
        refresh_result: SyncMutex<Option<Result<AccessTokenResponse>>>,
        refresh_calls: AtomicUsize,
        expires_in: u64,
        interval: u64,
    }

    impl ScriptedClient {
        fn with_window(expires_in: u64, interval: u64) -> Self {
            Self { expires_in, interval, ..Self::default() }
        }

        fn push_poll(&self, poll: Result<DevicePoll>) {
            self.polls.lock().push_back(poll);
        }

        fn total_calls(&self) -> usize {
            self.code_requests.load(Ordering::SeqCst)
                + self.poll_calls.load(Ordering::SeqCst)
                + self.refresh_calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl DeviceAuthClient for ScriptedClient {
        async fn request_device_code(&self, _client_id: &str) -> Result<DeviceCodeResponse> {
            self.code_requests.fetch_add(1, Ordering::SeqCst);
            Ok(DeviceCodeResponse {
                device_code: "device".into(),
                user_code: "ABCD1234".into(),
                verification_url: "https://trakt.tv/activate".into(),
                expires_in: self.expires_in,
                interval: self.interval,
            })
        }

        async fn poll_device_token(&self, request: &DeviceTokenRequest) -> Result<DevicePoll> {
            assert_eq!(request.code, "device");
            self.poll_calls.fetch_add(1, Ordering::SeqCst);
            self.polls.lock().pop_front().unwrap_or(Ok(DevicePoll::Pending))
        }

        async fn refresh_token(&self, request: &RefreshTokenRequest) -> Result<AccessTokenResponse> {
            assert_eq!(request.grant_type, "refresh_token");
            assert_eq!(request.redirect_uri, "urn:ietf:wg:oauth:2.0:oob");
            self.refresh_calls.fetch_add(1, Ordering::SeqCst);
            self.refresh_result
                .lock()
                .take()
                .unwrap_or_else(|| Err(OvertraktError::Transport("refresh unavailable".into())))
        }
    }

    #[derive(Default)]
    struct MemoryStore {
        rows: SyncMutex<Option<StoredCredentials>>,
        upserts: AtomicUsize,
        gets: AtomicUsize,
    }

    #[async_trait]
    impl CredentialStore for MemoryStore {
        async fn get(&self, _client_id: &str) -> Result<Option<StoredCredentials>> {
            self.gets.fetch_add(1, Ordering::SeqCst);
            Ok(self.rows.lock().clone())
        }

        async fn upsert(&self, credentials: &StoredCredentials) -> Result<()> {
            self.upserts.fetch_add(1, Ordering::SeqCst);
            *self.rows.lock() = Some(credentials.clone());
            Ok(())
        }
    }

    #[derive(Default)]
    struct RecordingNotifier {
        messages: SyncMutex<Vec<String>>,
    }

    #[async_trait]
    impl Notifier for RecordingNotifier {
        async fn send(&self, message: &str) {
            self.messages.lock().push(message.to_string());
        }
    }

    fn granted(access: &str) -> AccessTokenResponse {
        AccessTokenResponse {
            access_token: access.into(),
            created_at: Utc::now().timestamp(),
            expires_in: 7_776_000,
            refresh_token: format!("{access}-refresh"),
            scope: "public".into(),
            token_type: "Bearer".into(),
        }
    }

    fn stored(expires_in_secs: i64, refresh: &str) -> StoredCredentials {
        StoredCredentials {
            client_id: "client".into(),
            access_token: "stored-access".into(),
            refresh_token: refresh.into(),
            token_type: "Bearer".into(),
            expires_at: Utc::now() + chrono::Duration::seconds(expires_in_secs),
        }
    }

    struct Harness {
        client: Arc<ScriptedClient>,
        store: Arc<MemoryStore>,
        notifier: Arc<RecordingNotifier>,
        manager: Arc<TokenManager>,
    }

    fn harness(client: ScriptedClient, store: MemoryStore) -> Harness {
        let client = Arc::new(client);
        let store = Arc::new(store);
        let notifier = Arc::new(RecordingNotifier::default());
        let manager = Arc::new(TokenManager::new(
            "client",
            "secret",
            client.clone(),
            store.clone(),
            notifier.clone(),
        ));
        Harness { client, store, notifier, manager }
    }

    /// Verifies a valid stored token short-circuits with zero network calls.
    #[tokio::test]
    async fn valid_stored_token_needs_no_network() {
        let store = MemoryStore::default();
        *store.rows.lock() = Some(stored(3600, "refresh"));
        let h = harness(ScriptedClient::with_window(600, 5), store);

        h.manager.authenticate().await.unwrap();
        h.manager.authenticate().await.unwrap();

        assert_eq!(h.client.total_calls(), 0);
        assert_eq!(h.store.gets.load(Ordering::SeqCst), 1, "hydrates once");
        assert_eq!(h.manager.bearer().await.unwrap().access_token, "stored-access");
    }

    /// Verifies an expired token with a refresh token uses the refresh grant.
    #[tokio::test]
    async fn expired_token_is_refreshed() {
        let store = MemoryStore::default();
        *store.rows.lock() = Some(stored(-60, "refresh"));
        let client = ScriptedClient::with_window(600, 5);
        *client.refresh_result.lock() = Some(Ok(granted("refreshed")));
        let h = harness(client, store);

        h.manager.authenticate().await.unwrap();

        assert_eq!(h.client.refresh_calls.load(Ordering::SeqCst), 1);
        assert_eq!(h.client.code_requests.load(Ordering::SeqCst), 0);
        assert_eq!(h.store.upserts.load(Ordering::SeqCst), 1);
        assert_eq!(h.store.rows.lock().as_ref().unwrap().access_token, "refreshed");
    }

    /// Verifies a failed refresh falls back to exactly one device grant.
    #[tokio::test(start_paused = true)]
    async fn failed_refresh_falls_back_to_one_device_grant() {
        let store = MemoryStore::default();
        *store.rows.lock() = Some(stored(-60, "refresh"));
        let client = ScriptedClient::with_window(600, 5);
        client.push_poll(Ok(DevicePoll::Authorized(granted("device-token"))));
        let h = harness(client, store);

        h.manager.authenticate().await.unwrap();

        assert_eq!(h.client.refresh_calls.load(Ordering::SeqCst), 1);
        assert_eq!(h.client.code_requests.load(Ordering::SeqCst), 1);
        assert_eq!(h.manager.grant_state(), GrantState::Authorized);
    }

    /// Verifies three pending polls followed by a token succeed and persist once.
    #[tokio::test(start_paused = true)]
    async fn device_grant_polls_until_authorised() {
        let client = ScriptedClient::with_window(600, 5);
        client.push_poll(Ok(DevicePoll::Pending));
        client.push_poll(Ok(DevicePoll::Authorized(AccessTokenResponse::default())));
        client.push_poll(Ok(DevicePoll::Pending));
        client.push_poll(Ok(DevicePoll::Authorized(granted("fresh"))));
        let h = harness(client, MemoryStore::default());

        h.manager.authenticate().await.unwrap();

        assert_eq!(h.client.poll_calls.load(Ordering::SeqCst), 4);
        assert_eq!(h.store.upserts.load(Ordering::SeqCst), 1);
        let bearer = h.manager.bearer().await.unwrap();
        assert_eq!(bearer.header_value(), "Bearer fresh");
        assert!(h.notifier.messages.lock()[0].starts_with("Action required"));
        assert!(h.notifier.messages.lock()[0].contains("ABCD1234"));
    }

    /// Verifies the deadline stops polling and leaves credentials untouched.
    #[tokio::test(start_paused = true)]
    async fn device_grant_expires_at_deadline() {
        let h = harness(ScriptedClient::with_window(10, 5), MemoryStore::default());
        let before = h.manager.inner.credentials.read().await.clone();

        let err = h.manager.authenticate().await.unwrap_err();

        assert!(matches!(err, OvertraktError::AuthExpired(_)));
        assert_eq!(h.client.poll_calls.load(Ordering::SeqCst), 2);
        assert_eq!(*h.manager.inner.credentials.read().await, before);
        assert_eq!(h.store.upserts.load(Ordering::SeqCst), 0);
        assert_eq!(h.manager.grant_state(), GrantState::Expired);
    }

    /// Verifies a transport error ends the grant without retrying.
    #[tokio::test(start_paused = true)]
    async fn poll_transport_error_terminates_grant() {
        let client = ScriptedClient::with_window(600, 5);
        client.push_poll(Ok(DevicePoll::Pending));
        client.push_poll(Err(OvertraktError::Transport("connection reset".into())));
        let h = harness(client, MemoryStore::default());

        let err = h.manager.authenticate().await.unwrap_err();

        assert!(matches!(err, OvertraktError::Transport(_)));
        assert_eq!(h.client.poll_calls.load(Ordering::SeqCst), 2);
        assert_eq!(h.manager.grant_state(), GrantState::TransportFailed);
        assert!(h.manager.inner.credentials.read().await.device_code.is_none());
    }

    /// Verifies explicit denial surfaces as an auth error.
    #[tokio::test(start_paused = true)]
    async fn denied_grant_is_auth_error() {
        let client = ScriptedClient::with_window(600, 5);
        client.push_poll(Ok(DevicePoll::Denied));
        let h = harness(client, MemoryStore::default());

        let err = h.manager.authenticate().await.unwrap_err();

        assert!(matches!(err, OvertraktError::Auth(_)));
        assert_eq!(h.manager.grant_state(), GrantState::Denied);
    }

    /// Verifies shutdown cancels a grant waiting on the user.
    #[tokio::test(start_paused = true)]
    async fn shutdown_cancels_pending_grant() {
        let client = Arc::new(ScriptedClient::with_window(600, 5));
        let shutdown = CancellationToken::new();
        let manager = Arc::new(
            TokenManager::new(
                "client",
                "secret",
                client.clone(),
                Arc::new(MemoryStore::default()),
                Arc::new(RecordingNotifier::default()),
            )
            .with_shutdown(shutdown.clone()),
        );

        let task = tokio::spawn({
            let manager = manager.clone();
            async move { manager.authenticate().await }
        });
        tokio::time::sleep(Duration::from_secs(12)).await;
        shutdown.cancel();

        let err = task.await.unwrap().unwrap_err();
        assert!(matches!(err, OvertraktError::Cancelled(_)));
        assert_eq!(manager.grant_state(), GrantState::Cancelled);
    }

    /// Verifies the overall grant timeout caps long server windows.
    #[tokio::test(start_paused = true)]
    async fn grant_timeout_caps_device_window() {
        let client = Arc::new(ScriptedClient::with_window(3600, 5));
        let manager = TokenManager::new(
            "client",
            "secret",
            client.clone(),
            Arc::new(MemoryStore::default()),
            Arc::new(RecordingNotifier::default()),
        )
        .with_config(TokenManagerConfig { grant_timeout: Duration::from_secs(30) });

        let err = manager.authenticate().await.unwrap_err();

        assert!(matches!(err, OvertraktError::AuthExpired(msg) if msg.contains("30s")));
        assert!(client.poll_calls.load(Ordering::SeqCst) <= 7);
    }

    /// Verifies concurrent callers share a single device grant.
    #[tokio::test(start_paused = true)]
    async fn concurrent_callers_share_one_grant() {
        let client = ScriptedClient::with_window(600, 5);
        client.push_poll(Ok(DevicePoll::Pending));
        client.push_poll(Ok(DevicePoll::Authorized(granted("shared"))));
        let h = harness(client, MemoryStore::default());

        let (first, second) = tokio::join!(h.manager.authenticate(), h.manager.authenticate());

        first.unwrap();
        second.unwrap();
        assert_eq!(h.client.code_requests.load(Ordering::SeqCst), 1);
        assert_eq!(h.store.upserts.load(Ordering::SeqCst), 1);
    }

    /// Verifies a dropped caller does not abandon the grant it started.
    #[tokio::test(start_paused = true)]
    async fn aborted_caller_leaves_grant_running_for_the_next_caller() {
        let client = ScriptedClient::with_window(600, 5);
        client.push_poll(Ok(DevicePoll::Pending));
        client.push_poll(Ok(DevicePoll::Pending));
        client.push_poll(Ok(DevicePoll::Pending));
        client.push_poll(Ok(DevicePoll::Authorized(granted("late"))));
        let h = harness(client, MemoryStore::default());

        let task = tokio::spawn({
            let manager = h.manager.clone();
            async move { manager.authenticate().await }
        });
        tokio::time::sleep(Duration::from_secs(7)).await;
        assert_eq!(h.manager.grant_state(), GrantState::Polling);
        task.abort();
        assert!(task.await.unwrap_err().is_cancelled());

        h.manager.authenticate().await.unwrap();

        assert_eq!(h.client.code_requests.load(Ordering::SeqCst), 1, "joined the running grant");
        assert_eq!(h.manager.grant_state(), GrantState::Authorized);
        assert!(h.manager.inner.credentials.read().await.device_code.is_none());
        assert_eq!(h.store.upserts.load(Ordering::SeqCst), 1);
        assert_eq!(h.manager.bearer().await.unwrap().access_token, "late");
    }

    /// Verifies an abandoned grant still clears the device code when it ends.
    #[tokio::test(start_paused = true)]
    async fn abandoned_grant_clears_device_code_on_expiry() {
        let h = harness(ScriptedClient::with_window(20, 5), MemoryStore::default());

        let task = tokio::spawn({
            let manager = h.manager.clone();
            async move { manager.authenticate().await }
        });
        tokio::time::sleep(Duration::from_secs(3)).await;
        assert!(h.manager.inner.credentials.read().await.device_code.is_some());
        task.abort();

        tokio::time::sleep(Duration::from_secs(60)).await;

        assert!(h.manager.inner.credentials.read().await.device_code.is_none());
        assert_eq!(h.manager.grant_state(), GrantState::Expired);
        assert!(h.manager.inflight.lock().is_none());
        assert_eq!(h.store.upserts.load(Ordering::SeqCst), 0);
    }

    struct SlowNotifier;

    #[async_trait]
    impl Notifier for SlowNotifier {
        async fn send(&self, _message: &str) {
            tokio::time::sleep(Duration::from_secs(130)).await;
        }
    }

    /// Verifies polling starts without waiting on notification delivery.
    #[tokio::test(start_paused = true)]
    async fn slow_notifier_does_not_consume_device_window() {
        let client = Arc::new(ScriptedClient::with_window(120, 5));
        client.push_poll(Ok(DevicePoll::Authorized(granted("quick"))));
        let manager = TokenManager::new(
            "client",
            "secret",
            client.clone(),
            Arc::new(MemoryStore::default()),
            Arc::new(SlowNotifier),
        );

        manager.authenticate().await.unwrap();

        assert_eq!(client.poll_calls.load(Ordering::SeqCst), 1);
        assert_eq!(manager.bearer().await.unwrap().access_token, "quick");
    }

    /// Verifies proactive refresh only fires inside the margin.
    #[tokio::test]
    async fn refresh_if_expiring_respects_margin() {
        let store = MemoryStore::default();
        *store.rows.lock() = Some(stored(3600, "refresh"));
        let client = ScriptedClient::with_window(600, 5);
        *client.refresh_result.lock() = Some(Ok(granted("early")));
        let h = harness(client, store);

        assert!(!h.manager.refresh_if_expiring(chrono::Duration::minutes(30)).await.unwrap());
        assert_eq!(h.client.refresh_calls.load(Ordering::SeqCst), 0);

        assert!(h.manager.refresh_if_expiring(chrono::Duration::hours(2)).await.unwrap());
        assert_eq!(h.client.refresh_calls.load(Ordering::SeqCst), 1);
        assert_eq!(h.manager.bearer().await.unwrap().access_token, "early");
    }

    /// Verifies proactive refresh never starts an interactive grant.
    #[tokio::test]
    async fn refresh_if_expiring_without_refresh_token_is_noop() {
        let h = harness(ScriptedClient::with_window(600, 5), MemoryStore::default());

        assert!(!h.manager.refresh_if_expiring(chrono::Duration::hours(1)).await.unwrap());
        assert_eq!(h.client.total_calls(), 0);
    }
}
