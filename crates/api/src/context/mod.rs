//! Application context - dependency injection container

use std::sync::Arc;
use std::time::Duration;

use overtrakt_core::{CredentialStore, ListSyncEngine, Notifier, TokenManager, TokenManagerConfig};
use overtrakt_domain::constants::HTTP_REQUEST_TIMEOUT_SECS;
use overtrakt_domain::{Config, ListTargets, OvertraktError, Result};
use overtrakt_infra::scheduling::{
    ResyncScheduler, ResyncSchedulerConfig, SchedulerResult, TokenRefreshScheduler,
    TokenRefreshSchedulerConfig,
};
use overtrakt_infra::{
    ApiTransport, BroadcastNotifier, DbManager, HttpClient, PushoverNotifier,
    SqliteCredentialStore, SqliteSyncLedger, TraktApiClient, TraktOAuthClient, WebhookNotifier,
};
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::utils::health::HealthReport;

const SCHEDULER_START_TIMEOUT: Duration = Duration::from_secs(10);

/// Background jobs owned by the context.
struct Schedulers {
    token_refresh: TokenRefreshScheduler,
    resync: Option<ResyncScheduler>,
}

/// Application context - holds all services and dependencies
pub struct AppContext {
    pub config: Config,
    pub db: Arc<DbManager>,
    pub credentials: Arc<SqliteCredentialStore>,
    pub ledger: Arc<SqliteSyncLedger>,
    pub notifier: Arc<dyn Notifier>,
    pub tokens: Arc<TokenManager>,
    pub api: Arc<TraktApiClient>,
    pub engine: Arc<ListSyncEngine>,
    pub targets: ListTargets,
    shutdown: CancellationToken,
    schedulers: Mutex<Schedulers>,
}

impl AppContext {
    /// Wire every adapter for `config`.
    ///
    /// Opens (and migrates) the SQLite database. Nothing touches the network
    /// and no background task is started until [`AppContext::start_background`].
    ///
    /// # Errors
    /// Database or HTTP client construction failures.
    pub fn new(config: Config, shutdown: CancellationToken) -> Result<Self> {
        let db = Arc::new(DbManager::new(&config.database.path, config.database.pool_size)?);
        db.run_migrations()?;
        info!(path = %db.path().display(), "database ready");

        let credentials = Arc::new(SqliteCredentialStore::new(Arc::clone(&db)));
        let ledger = Arc::new(SqliteSyncLedger::new(Arc::clone(&db)));
        let notifier = build_notifier(&config)?;

        let trakt = &config.trakt;
        let transport = ApiTransport::new(&trakt.api_url, &trakt.client_id)?;
        let tokens = Arc::new(
            TokenManager::new(
                trakt.client_id.clone(),
                trakt.client_secret.clone(),
                Arc::new(TraktOAuthClient::new(transport.clone())),
                credentials.clone(),
                Arc::clone(&notifier),
            )
            .with_config(TokenManagerConfig {
                grant_timeout: Duration::from_secs(config.scheduler.grant_timeout_seconds.max(1)),
            })
            .with_shutdown(shutdown.clone()),
        );

        let api = Arc::new(TraktApiClient::new(transport, Arc::clone(&tokens)));
        let engine = Arc::new(ListSyncEngine::new(api.clone(), ledger.clone(), Arc::clone(&notifier)));
        let targets = ListTargets {
            user_id: trakt.user.clone(),
            movie_list: trakt.movie_list.clone(),
            show_list: trakt.show_list.clone(),
        };

        let token_refresh = TokenRefreshScheduler::new(
            Arc::clone(&tokens),
            TokenRefreshSchedulerConfig {
                check_interval: Duration::from_secs(config.scheduler.token_check_interval_seconds.max(1)),
                margin: Duration::from_secs(config.scheduler.token_refresh_margin_seconds),
            },
        );
        let resync = config.scheduler.resync_enabled.then(|| {
            ResyncScheduler::new(
                Arc::clone(&engine),
                targets.clone(),
                ResyncSchedulerConfig {
                    interval: Duration::from_secs(config.scheduler.resync_interval_seconds.max(1)),
                    ..ResyncSchedulerConfig::default()
                },
            )
        });

        Ok(Self {
            config,
            db,
            credentials,
            ledger,
            notifier,
            tokens,
            api,
            engine,
            targets,
            shutdown,
            schedulers: Mutex::new(Schedulers { token_refresh, resync }),
        })
    }

    /// Start the schedulers and an initial authentication in the background.
    ///
    /// The initial authentication may run a device-code grant; its failure is
    /// logged and retried lazily by the next request that needs a token.
    ///
    /// # Errors
    /// A scheduler that fails to start within 10 seconds.
    pub async fn start_background(&self) -> Result<()> {
        let mut schedulers = self.schedulers.lock().await;
        start_scheduler("token refresh", schedulers.token_refresh.start()).await?;
        if let Some(resync) = schedulers.resync.as_mut() {
            start_scheduler("resync", resync.start()).await?;
        }
        drop(schedulers);

        let tokens = Arc::clone(&self.tokens);
        tokio::spawn(async move {
            if let Err(err) = tokens.authenticate().await {
                warn!(error = %err, kind = err.label(), "initial trakt authentication failed");
            }
        });

        Ok(())
    }

    /// Cancel in-flight grants and stop the schedulers.
    pub async fn shutdown(&self) {
        self.shutdown.cancel();

        let mut schedulers = self.schedulers.lock().await;
        if schedulers.token_refresh.is_running() {
            if let Err(err) = schedulers.token_refresh.stop().await {
                error!(error = %err, "failed to stop token refresh scheduler");
            }
        }
        if let Some(resync) = schedulers.resync.as_mut().filter(|s| s.is_running()) {
            if let Err(err) = resync.stop().await {
                error!(error = %err, "failed to stop resync scheduler");
            }
        }
        info!("background tasks stopped");
    }

    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Probe the stored credentials and the in-memory token.
    pub async fn health(&self) -> HealthReport {
        let database = match self.credentials.get(&self.config.trakt.client_id).await {
            Ok(Some(stored)) => !stored.access_token.is_empty(),
            Ok(None) => false,
            Err(err) => {
                warn!(error = %err, "health check could not read credentials");
                false
            }
        };
        let trakt = self.tokens.has_access_token().await;

        HealthReport { database, trakt }
    }
}

/// Broadcast to every configured URL plus Pushover when both of its keys are set.
fn build_notifier(config: &Config) -> Result<Arc<dyn Notifier>> {
    let http = HttpClient::builder()
        .timeout(Duration::from_secs(HTTP_REQUEST_TIMEOUT_SECS))
        .user_agent(concat!("overtrakt/", env!("CARGO_PKG_VERSION")))
        .build()?;

    let mut broadcast = BroadcastNotifier::new();
    for url in &config.notifications.urls {
        if !WebhookNotifier::supports(url) {
            warn!(url = %url, "skipping notification URL: only http(s) webhook endpoints are supported");
            continue;
        }
        broadcast = broadcast.with_channel(Arc::new(WebhookNotifier::new(http.clone(), url.clone())));
    }
    if let Some((token, user)) = config.notifications.pushover() {
        broadcast = broadcast.with_channel(Arc::new(PushoverNotifier::new(http.clone(), token, user)));
    }

    info!(channels = broadcast.channel_count(), "notification channels configured");
    Ok(Arc::new(broadcast))
}

async fn start_scheduler<F>(name: &str, start: F) -> Result<()>
where
    F: std::future::Future<Output = SchedulerResult<()>>,
{
    tokio::time::timeout(SCHEDULER_START_TIMEOUT, start)
        .await
        .map_err(|_| {
            error!(scheduler = name, timeout_secs = SCHEDULER_START_TIMEOUT.as_secs(), "scheduler start timed out");
            OvertraktError::Internal(format!("{name} scheduler start timed out after 10s"))
        })?
        .map_err(|err| {
            error!(scheduler = name, error = %err, "failed to start scheduler");
            OvertraktError::from(err)
        })
}
