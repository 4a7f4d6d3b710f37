// ── Coordinator ──
//
// Lifecycle for one controller: uid discovery, the periodic poll task,
// concurrent endpoint fetches, the single-threaded pipeline cycle, and
// the write path with its lock check and confirmation refresh.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use futures_util::future::join_all;
use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, watch};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use econet_api::{EconetClient, Endpoint, Envelope, ServiceQuery, SysParams};

use crate::config::{CoordinatorConfig, DeviceConfig, resolve_lang};
use crate::error::CoreError;
use crate::host::EntityHost;
use crate::model::{ClassifiedParameter, Control, EntityRegistration, ParamValue};
use crate::pipeline::{CycleReport, LockTracker, Pipeline};
use crate::store::{EndpointCache, ParameterSnapshot, ParameterStore};

// ── Transport seam ───────────────────────────────────────────────

/// What the coordinator needs from the controller's HTTP surface.
pub trait Transport: Send + Sync + 'static {
    fn fetch(
        &self,
        endpoint: Endpoint,
        query: &ServiceQuery,
    ) -> impl Future<Output = Result<Envelope, econet_api::Error>> + Send;

    fn write(
        &self,
        number: u32,
        value: &str,
    ) -> impl Future<Output = Result<(), econet_api::Error>> + Send;

    fn sys_params(&self) -> impl Future<Output = Result<SysParams, econet_api::Error>> + Send;
}

impl Transport for EconetClient {
    fn fetch(
        &self,
        endpoint: Endpoint,
        query: &ServiceQuery,
    ) -> impl Future<Output = Result<Envelope, econet_api::Error>> + Send {
        EconetClient::fetch(self, endpoint, query)
    }

    fn write(
        &self,
        number: u32,
        value: &str,
    ) -> impl Future<Output = Result<(), econet_api::Error>> + Send {
        self.set_param(number, value)
    }

    fn sys_params(&self) -> impl Future<Output = Result<SysParams, econet_api::Error>> + Send {
        EconetClient::sys_params(self)
    }
}

// ── ConnectionState ──────────────────────────────────────────────

/// Connection health observable by consumers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    /// Some endpoints failed; stale snapshots filled in.
    Degraded { failed_endpoints: usize },
    /// Every endpoint failed this cycle.
    Unreachable { consecutive_failures: u32 },
    /// Failures reached the repair threshold; the host should raise an issue.
    RepairNeeded { consecutive_failures: u32 },
    /// The controller rejected our credentials.
    ReauthRequired,
}

impl ConnectionState {
    pub fn is_reachable(&self) -> bool {
        matches!(self, Self::Connected | Self::Degraded { .. })
    }
}

/// Controller identity reported by `sysParams`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceInfo {
    pub uid: Option<String>,
    pub model: Option<String>,
    pub software_version: Option<String>,
}

impl From<SysParams> for DeviceInfo {
    fn from(p: SysParams) -> Self {
        Self {
            uid: p.uid,
            model: p.controller_id,
            software_version: p.soft_ver,
        }
    }
}

// ── Coordinator ──────────────────────────────────────────────────

/// Entry point for hosts.
///
/// Cheaply cloneable via `Arc<CoordinatorInner>`. Reads go straight to
/// the published store; cycles serialize on an internal lock.
pub struct Coordinator<T: Transport> {
    inner: Arc<CoordinatorInner<T>>,
}

impl<T: Transport> Clone for Coordinator<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

struct CoordinatorInner<T> {
    config: CoordinatorConfig,
    transport: T,
    store: ParameterStore,
    locks: Arc<LockTracker>,
    cycle: Mutex<CycleState>,
    connection_state: watch::Sender<ConnectionState>,
    device_info: watch::Sender<Option<DeviceInfo>>,
    cancel: CancellationToken,
    task_handles: Mutex<Vec<JoinHandle<()>>>,
}

/// Everything only the poll cycle touches.
struct CycleState {
    uid: Option<String>,
    cache: EndpointCache,
    pipeline: Pipeline,
    host: Box<dyn EntityHost>,
    consecutive_failures: u32,
}

impl Coordinator<EconetClient> {
    /// Build the HTTP transport from `device` and wrap it.
    pub fn from_device(
        device: &DeviceConfig,
        config: CoordinatorConfig,
        host: impl EntityHost + 'static,
    ) -> Result<Self, CoreError> {
        Ok(Self::new(config, device.build_client()?, host))
    }
}

impl<T: Transport> Coordinator<T> {
    /// Create a coordinator. Does NOT poll: call
    /// [`connect()`](Self::connect) to discover the device and start.
    pub fn new(config: CoordinatorConfig, transport: T, host: impl EntityHost + 'static) -> Self {
        let locks = Arc::new(LockTracker::new());
        let uid = config.uid.clone();
        let pipeline = Pipeline::new(
            uid.clone().unwrap_or_default(),
            config.pipeline.clone(),
            Arc::clone(&locks),
        );
        let (connection_state, _) = watch::channel(ConnectionState::Disconnected);
        let (device_info, _) = watch::channel(None);

        Self {
            inner: Arc::new(CoordinatorInner {
                config,
                transport,
                store: ParameterStore::new(),
                locks,
                cycle: Mutex::new(CycleState {
                    uid,
                    cache: EndpointCache::new(),
                    pipeline,
                    host: Box::new(host),
                    consecutive_failures: 0,
                }),
                connection_state,
                device_info,
                cancel: CancellationToken::new(),
                task_handles: Mutex::new(Vec::new()),
            }),
        }
    }

    pub fn config(&self) -> &CoordinatorConfig {
        &self.inner.config
    }

    // ── Lifecycle ────────────────────────────────────────────────

    /// Discover the device, run the first cycle, and spawn the poll task.
    pub async fn connect(&self) -> Result<(), CoreError> {
        self.inner.connection_state.send_replace(ConnectionState::Connecting);

        self.discover_device().await?;
        self.refresh().await?;
        let uid = self.inner.cycle.lock().await.uid.clone();

        let interval = self.inner.config.poll_interval;
        if !interval.is_zero() {
            let ctrl = self.clone();
            let cancel = self.inner.cancel.child_token();
            self.inner
                .task_handles
                .lock()
                .await
                .push(tokio::spawn(poll_task(ctrl, interval, cancel)));
        }

        info!(
            uid = ?uid,
            interval_secs = interval.as_secs(),
            "connected to controller"
        );
        Ok(())
    }

    /// Stop background tasks and wait for them to finish.
    pub async fn shutdown(&self) {
        self.inner.cancel.cancel();
        let handles: Vec<_> = self.inner.task_handles.lock().await.drain(..).collect();
        for handle in handles {
            let _ = handle.await;
        }
        self.inner.connection_state.send_replace(ConnectionState::Disconnected);
        debug!("coordinator shut down");
    }

    /// Fetch `sysParams` for device identity. Fatal only when the uid is
    /// not configured and cannot be learned.
    async fn discover_device(&self) -> Result<(), CoreError> {
        let configured = self.inner.config.uid.clone();

        let reported = match self.inner.transport.sys_params().await {
            Ok(params) => {
                let info = DeviceInfo::from(params);
                let uid = info.uid.clone();
                self.inner.device_info.send_replace(Some(info));
                uid
            }
            Err(e) if e.is_auth_failure() => {
                self.inner.connection_state.send_replace(ConnectionState::ReauthRequired);
                return Err(e.into());
            }
            Err(e) if configured.is_some() => {
                warn!(error = %e, "sysParams unavailable (non-fatal)");
                None
            }
            Err(e) => return Err(e.into()),
        };

        let uid = configured.or(reported).ok_or_else(|| CoreError::Config {
            message: "controller did not report a uid and none is configured".into(),
        })?;

        let mut state = self.inner.cycle.lock().await;
        state.pipeline.set_uid(uid.clone());
        state.uid = Some(uid);
        Ok(())
    }

    // ── Poll cycle ───────────────────────────────────────────────

    /// Run one cycle, waiting for any running cycle to finish first.
    pub async fn refresh(&self) -> Result<CycleReport, CoreError> {
        let mut state = self.inner.cycle.lock().await;
        self.run_cycle(&mut state).await
    }

    /// Run one cycle unless one is already running. `Ok(None)` means the
    /// tick was skipped.
    pub async fn try_refresh(&self) -> Result<Option<CycleReport>, CoreError> {
        let Ok(mut state) = self.inner.cycle.try_lock() else {
            debug!("cycle already running, skipping tick");
            return Ok(None);
        };
        self.run_cycle(&mut state).await.map(Some)
    }

    async fn run_cycle(&self, state: &mut CycleState) -> Result<CycleReport, CoreError> {
        let uid = state.uid.clone().ok_or_else(|| CoreError::Config {
            message: "device uid unknown, call connect() first".into(),
        })?;
        let query = ServiceQuery::new(uid, resolve_lang(Some(&self.inner.config.lang)));

        let transport = &self.inner.transport;
        let query_ref = &query;
        let results = join_all(Endpoint::all().map(|endpoint| async move {
            (endpoint, transport.fetch(endpoint, query_ref).await)
        }))
        .await;

        let total = results.len();
        let mut failed = 0;
        let mut auth_failure = None;
        for (endpoint, result) in results {
            match result {
                Ok(envelope) => state.cache.record_success(endpoint, envelope),
                Err(e) => {
                    failed += 1;
                    state.cache.record_failure(endpoint, &e);
                    if e.is_auth_failure() && auth_failure.is_none() {
                        auth_failure = Some(e.to_string());
                    }
                }
            }
        }

        if let Some(message) = auth_failure {
            // Endpoints that did answer are still fresh; publish them
            // before asking for credentials.
            if failed < total {
                state.consecutive_failures = 0;
                let CycleState {
                    cache,
                    pipeline,
                    host,
                    ..
                } = state;
                let report = pipeline.run(cache, host.as_mut());
                self.inner.store.publish(report.classified);
            }
            warn!(failed, total, "controller rejected credentials");
            self.inner.connection_state.send_replace(ConnectionState::ReauthRequired);
            return Err(CoreError::AuthenticationFailed { message });
        }

        if failed == total {
            return Err(self.record_unreachable(state));
        }

        state.consecutive_failures = 0;
        let CycleState {
            cache,
            pipeline,
            host,
            ..
        } = state;
        let report = pipeline.run(cache, host.as_mut());
        self.inner.store.publish(report.classified.clone());

        let next = if failed == 0 {
            ConnectionState::Connected
        } else {
            ConnectionState::Degraded {
                failed_endpoints: failed,
            }
        };
        self.inner.connection_state.send_replace(next);
        Ok(report)
    }

    /// Total transport failure: keep the previous state, mark entities
    /// unavailable, and escalate once the failure threshold is reached.
    fn record_unreachable(&self, state: &mut CycleState) -> CoreError {
        state.cache.mark_all_stale();
        state.consecutive_failures += 1;
        let consecutive_failures = state.consecutive_failures;
        state.pipeline.mark_unreachable(state.host.as_mut());

        let next = if consecutive_failures >= self.inner.config.failure_threshold {
            warn!(
                consecutive_failures,
                threshold = self.inner.config.failure_threshold,
                "controller unreachable, repair needed"
            );
            ConnectionState::RepairNeeded {
                consecutive_failures,
            }
        } else {
            warn!(consecutive_failures, "controller unreachable, keeping previous state");
            ConnectionState::Unreachable {
                consecutive_failures,
            }
        };
        self.inner.connection_state.send_replace(next);
        CoreError::AllEndpointsFailed {
            consecutive_failures,
        }
    }

    // ── Writes ───────────────────────────────────────────────────

    /// Write a raw device value, then trigger a confirmation cycle.
    ///
    /// Locked keys are refused before any request is made.
    pub async fn set_value(&self, key: &str, value: ParamValue) -> Result<(), CoreError> {
        self.inner.locks.check_writable(key)?;
        let parameter = self.writable(key)?;

        if let Control::Number { min, max, .. } = parameter.control {
            let n = value.as_f64().ok_or_else(|| CoreError::InvalidValue {
                key: key.to_owned(),
                message: format!("{value} is not a number"),
            })?;
            if n < min || n > max {
                return Err(CoreError::InvalidValue {
                    key: key.to_owned(),
                    message: format!("{value} outside {min}..={max}"),
                });
            }
        }

        self.write(key, &parameter, &value).await
    }

    /// Turn a switch on or off.
    pub async fn set_switch(&self, key: &str, on: bool) -> Result<(), CoreError> {
        self.inner.locks.check_writable(key)?;
        let parameter = self.writable(key)?;
        let Control::Switch { off_value, on_value } = parameter.control else {
            return Err(CoreError::InvalidValue {
                key: key.to_owned(),
                message: "not a switch".into(),
            });
        };
        let value = ParamValue::from(if on { on_value } else { off_value });
        self.write(key, &parameter, &value).await
    }

    /// Pick a select option by label.
    pub async fn select_option(&self, key: &str, label: &str) -> Result<(), CoreError> {
        self.inner.locks.check_writable(key)?;
        let parameter = self.writable(key)?;
        let device_value = parameter
            .param
            .enumeration
            .as_ref()
            .filter(|_| matches!(parameter.control, Control::Select { .. }))
            .and_then(|e| e.value_of(label))
            .ok_or_else(|| CoreError::InvalidValue {
                key: key.to_owned(),
                message: format!("'{label}' is not an option"),
            })?;
        self.write(key, &parameter, &ParamValue::from(device_value))
            .await
    }

    fn writable(&self, key: &str) -> Result<Arc<ClassifiedParameter>, CoreError> {
        let parameter = self
            .inner
            .store
            .get(key)
            .ok_or_else(|| CoreError::UnknownParameter { key: key.to_owned() })?;
        if matches!(parameter.control, Control::ReadOnlySensor { .. }) {
            return Err(CoreError::ReadOnly { key: key.to_owned() });
        }
        Ok(parameter)
    }

    async fn write(
        &self,
        key: &str,
        parameter: &ClassifiedParameter,
        value: &ParamValue,
    ) -> Result<(), CoreError> {
        let number = parameter
            .param
            .number
            .ok_or_else(|| CoreError::Unbound { key: key.to_owned() })?;

        info!(key, number, %value, "writing parameter");
        self.inner.transport.write(number, &value.to_string()).await?;

        // Confirm from the device rather than trusting the written value.
        // Registered under the handle lock so shutdown either sees it or
        // we see the cancellation.
        let mut handles = self.inner.task_handles.lock().await;
        if self.inner.cancel.is_cancelled() {
            debug!(key, "shutting down, skipping confirmation refresh");
            return Ok(());
        }
        handles.retain(|h| !h.is_finished());
        let cancel = self.inner.cancel.child_token();
        handles.push(tokio::spawn(confirm_task(self.clone(), cancel)));
        Ok(())
    }

    // ── Reads ────────────────────────────────────────────────────

    /// Latest classified state for a key.
    pub fn parameter(&self, key: &str) -> Option<Arc<ClassifiedParameter>> {
        self.inner.store.get(key)
    }

    pub fn parameters(&self) -> ParameterSnapshot {
        self.inner.store.snapshot()
    }

    pub fn subscribe(&self) -> watch::Receiver<ParameterSnapshot> {
        self.inner.store.subscribe()
    }

    pub fn connection_state(&self) -> watch::Receiver<ConnectionState> {
        self.inner.connection_state.subscribe()
    }

    pub fn device_info(&self) -> Option<DeviceInfo> {
        self.inner.device_info.borrow().clone()
    }

    /// Reachable transport and not locked.
    pub fn is_available(&self, key: &str) -> bool {
        let reachable = self.inner.connection_state.borrow().is_reachable();
        self.inner.locks.is_available(key, reachable) && self.inner.store.get(key).is_some()
    }

    /// Registrations handed to the host so far.
    pub async fn registrations(&self) -> Vec<EntityRegistration> {
        let state = self.inner.cycle.lock().await;
        state.pipeline.entities().registrations().cloned().collect()
    }
}

// ── Background tasks ─────────────────────────────────────────────

async fn poll_task<T: Transport>(
    coordinator: Coordinator<T>,
    interval: Duration,
    cancel: CancellationToken,
) {
    let mut interval = tokio::time::interval(interval);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
    interval.tick().await; // consume the immediate first tick

    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            _ = interval.tick() => {
                if let Err(e) = coordinator.try_refresh().await {
                    warn!(error = %e, "periodic refresh failed");
                }
            }
        }
    }
}

async fn confirm_task<T: Transport>(coordinator: Coordinator<T>, cancel: CancellationToken) {
    tokio::select! {
        biased;
        () = cancel.cancelled() => debug!("confirmation refresh cancelled"),
        result = coordinator.refresh() => {
            if let Err(e) = result {
                warn!(error = %e, "confirmation refresh failed");
            }
        }
    }
}
