//! One generation of the offline worker.
//!
//! The worker owns the router, the strategy executors, and the store manager
//! for a single version, and exposes one entry point per event kind. Its
//! lifecycle runs parsed → installing → installed → activating → activated;
//! a failed install leaves it redundant. Requests are only intercepted once
//! activated.

pub mod message;
pub mod notify;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};
use std::time::Instant;

use precache_core::{AppConfig, CacheDb, ConfigError, Error};
use reqwest::Url;
use tokio::sync::{broadcast, oneshot};

use crate::fetch::{Fetch, FetchRequest, FetchResponse, resolve};
use crate::router::{Router, Strategy};
use crate::store::{ProvisionReport, StoreManager};
use crate::strategy::StrategyExecutor;

pub use message::{ClientEvent, ClientMessage, MessageReply, RawMessage};
pub use notify::{LogNotifier, Notification, Notifier, PushPayload, VIEW_ACTION};

/// Lifecycle state of a worker generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerState {
    Parsed,
    Installing,
    Installed,
    Activating,
    Activated,
    Redundant,
}

impl std::fmt::Display for WorkerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            WorkerState::Parsed => "parsed",
            WorkerState::Installing => "installing",
            WorkerState::Installed => "installed",
            WorkerState::Activating => "activating",
            WorkerState::Activated => "activated",
            WorkerState::Redundant => "redundant",
        };
        f.write_str(name)
    }
}

const EVENT_CAPACITY: usize = 16;

pub struct Worker {
    config: AppConfig,
    db: CacheDb,
    fetcher: Arc<dyn Fetch>,
    router: Router,
    executor: StrategyExecutor,
    store: StoreManager,
    notifier: Arc<dyn Notifier>,
    state: RwLock<WorkerState>,
    skip_waiting: AtomicBool,
    events: broadcast::Sender<ClientEvent>,
}

impl Worker {
    pub fn new(config: AppConfig, db: CacheDb, fetcher: Arc<dyn Fetch>) -> Result<Self, ConfigError> {
        let router = Router::from_config(&config)?;
        let executor = StrategyExecutor::new(fetcher.clone(), db.clone(), &config)?;
        let store = StoreManager::new(db.clone(), fetcher.clone(), &config)?;
        let (events, _) = broadcast::channel(EVENT_CAPACITY);

        Ok(Self {
            config,
            db,
            fetcher,
            router,
            executor,
            store,
            notifier: Arc::new(LogNotifier),
            state: RwLock::new(WorkerState::Parsed),
            skip_waiting: AtomicBool::new(false),
            events,
        })
    }

    /// Replace the notification surface.
    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = notifier;
        self
    }

    pub fn version(&self) -> &str {
        &self.config.version
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn state(&self) -> WorkerState {
        *self.state.read().unwrap_or_else(|e| e.into_inner())
    }

    /// Receive worker-to-page events.
    pub fn subscribe(&self) -> broadcast::Receiver<ClientEvent> {
        self.events.subscribe()
    }

    fn transition(&self, from: WorkerState, to: WorkerState) -> Result<(), Error> {
        let mut state = self.state.write().unwrap_or_else(|e| e.into_inner());
        if *state != from {
            return Err(Error::InvalidState(format!("cannot move to {to} from {}", *state)));
        }
        *state = to;
        tracing::info!(version = %self.config.version, state = %to, "worker state changed");
        Ok(())
    }

    fn set_state(&self, to: WorkerState) {
        *self.state.write().unwrap_or_else(|e| e.into_inner()) = to;
        tracing::info!(version = %self.config.version, state = %to, "worker state changed");
    }

    /// Install event: provision the static area.
    ///
    /// Activates straight away if SKIP_WAITING arrived earlier. A failed
    /// activation is logged and leaves the worker installed; the report is
    /// still returned.
    pub async fn install(&self) -> Result<ProvisionReport, Error> {
        self.transition(WorkerState::Parsed, WorkerState::Installing)?;

        let report = match self.store.provision().await {
            Ok(report) => report,
            Err(e) => {
                self.set_state(WorkerState::Redundant);
                return Err(e);
            }
        };
        self.set_state(WorkerState::Installed);

        if self.skip_waiting.load(Ordering::SeqCst)
            && let Err(e) = self.activate().await
        {
            tracing::warn!(error = %e, "skip-waiting activation failed");
        }

        Ok(report)
    }

    /// Activate event: reap areas of older versions, then start intercepting.
    pub async fn activate(&self) -> Result<Vec<String>, Error> {
        self.transition(WorkerState::Installed, WorkerState::Activating)?;

        match self.store.activate_and_reap(&self.store.current_area_names()).await {
            Ok(deleted) => {
                self.set_state(WorkerState::Activated);
                Ok(deleted)
            }
            Err(e) => {
                self.set_state(WorkerState::Installed);
                Err(e)
            }
        }
    }

    /// Strategy the router picks for `request`.
    pub fn classify(&self, request: &FetchRequest) -> Strategy {
        self.router.classify(request)
    }

    /// Fetch event. `None` means the request is not intercepted.
    pub async fn handle_fetch(&self, request: &FetchRequest) -> Option<FetchResponse> {
        if self.state() != WorkerState::Activated {
            return None;
        }

        let strategy = self.router.classify(request);
        if strategy == Strategy::Bypass {
            tracing::debug!(method = %request.method, url = %request.url, "not intercepted");
            return None;
        }

        let start = Instant::now();
        let response = self.executor.execute(strategy, request).await;
        let elapsed = start.elapsed();

        if elapsed > self.config.slow_request_threshold() {
            tracing::warn!(
                url = %request.url,
                strategy = %strategy,
                elapsed_ms = elapsed.as_millis() as u64,
                "slow request"
            );
        }

        response
    }

    /// Message event. Replies, when the message has one, go to `reply`.
    pub async fn handle_message(&self, message: ClientMessage, reply: Option<oneshot::Sender<MessageReply>>) {
        let answer = match message {
            ClientMessage::SkipWaiting => {
                self.skip_waiting.store(true, Ordering::SeqCst);
                if self.state() == WorkerState::Installed
                    && let Err(e) = self.activate().await
                {
                    tracing::warn!(error = %e, "skip-waiting activation failed");
                }
                None
            }
            ClientMessage::GetVersion => Some(MessageReply::Version { version: self.config.version.clone() }),
            ClientMessage::ClearCache => {
                let success = self.clear_all().await.is_ok();
                Some(MessageReply::Success { success })
            }
            ClientMessage::SyncTrigger { tag } => {
                let tag = tag.unwrap_or_else(|| self.config.sync_tag.clone());
                let success = self.handle_sync(&tag).await;
                Some(MessageReply::Success { success })
            }
            ClientMessage::Unknown(kind) => {
                tracing::debug!(kind = %kind, "ignoring unknown message type");
                None
            }
        };

        if let (Some(answer), Some(reply)) = (answer, reply)
            && reply.send(answer).is_err()
        {
            tracing::debug!("message reply dropped; sender went away");
        }
    }

    /// Delete every area of this application.
    pub async fn clear_all(&self) -> Result<Vec<String>, Error> {
        self.store.clear_all().await.inspect_err(|e| {
            tracing::warn!(error = %e, "clearing cache areas failed");
        })
    }

    /// Sync event. Refreshes the live data file when `tag` is the sync tag.
    ///
    /// Returns whether fresh data was stored; failures are logged only.
    pub async fn handle_sync(&self, tag: &str) -> bool {
        if tag != self.config.sync_tag {
            tracing::debug!(tag = %tag, "ignoring sync tag");
            return false;
        }

        match self.sync_data().await {
            Ok(()) => {
                let _ = self.events.send(ClientEvent::DataUpdated { message: "Product data has been updated".into() });
                tracing::info!(url = %self.config.sync_url, "data synced");
                true
            }
            Err(e) => {
                tracing::warn!(error = %e, "background sync failed");
                false
            }
        }
    }

    async fn sync_data(&self) -> Result<(), Error> {
        let url = resolve(self.router.origin(), &self.config.sync_url).map_err(|e| Error::InvalidUrl(e.to_string()))?;
        let request = FetchRequest::get(url.as_str())?;

        let response = self.fetcher.fetch(&request).await?;
        if !response.is_success() {
            return Err(Error::NetworkFailure(format!("{} returned {}", request.url, response.status.as_u16())));
        }

        self.db.put_entry(self.executor.dynamic_area(), &response.to_entry(&request)).await
    }

    /// Push event. Returns the notification shown, if any.
    pub async fn handle_push(&self, payload: Option<&str>) -> Option<Notification> {
        let raw = payload.map(str::trim).filter(|p| !p.is_empty())?;

        let data: serde_json::Value = match serde_json::from_str(raw) {
            Ok(data) => data,
            Err(e) => {
                tracing::warn!(error = %e, "ignoring push payload that is not JSON");
                return None;
            }
        };
        let fields: PushPayload = serde_json::from_value(data.clone()).unwrap_or_default();

        let notification = notify::build_notification(
            data,
            fields,
            &self.config.notification_title,
            &self.config.notification_body,
            self.config.notification_icon.as_deref(),
        );

        if let Err(e) = self.notifier.show_notification(&notification).await {
            tracing::warn!(error = %e, "showing notification failed");
        }

        Some(notification)
    }

    /// Notification click. Returns the page to open.
    pub fn handle_notification_click(&self, action: Option<&str>) -> Option<Url> {
        match action {
            Some(VIEW_ACTION) => resolve(self.router.origin(), "/").ok(),
            _ => None,
        }
    }
}
