//! Polling coordinator.
//!
//! A [`Coordinator`] owns the protocol client for one stove and keeps the
//! latest [`StoveSnapshot`] for everyone else. It polls only while at least
//! one [`Subscription`] is alive. Concurrent refresh requests share a single
//! in-flight cycle, and a failed cycle keeps the previous snapshot.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, Weak};
use std::time::Duration;

use futures::FutureExt;
use futures::future::{BoxFuture, Shared};
use tokio::sync::{Mutex, watch};
use tokio::task::JoinHandle;

use crate::client::StoveClient;
use crate::config::StoveConfig;
use crate::error::{Error, RefreshError, RefreshStage, Result};
use crate::event::{CoordinatorEvent, EventDispatcher, Subscription};
use crate::protocol::{Command, DesiredTemperature};
use crate::transport::{TcpTransport, Transport};
use crate::types::StoveSnapshot;

type RefreshOutcome = std::result::Result<Arc<StoveSnapshot>, RefreshError>;
type PendingRefresh = Shared<BoxFuture<'static, RefreshOutcome>>;

const EVENT_CAPACITY: usize = 64;

struct Inner<T> {
    config: StoveConfig,
    client: Mutex<StoveClient<T>>,
    snapshot: watch::Sender<Option<Arc<StoveSnapshot>>>,
    dispatcher: EventDispatcher,
    in_flight: std::sync::Mutex<Option<PendingRefresh>>,
    version: AtomicU64,
    last_update_success: AtomicBool,
}

impl<T: Transport + 'static> Inner<T> {
    /// Joins the in-flight cycle, or starts one.
    fn refresh(self: &Arc<Self>) -> PendingRefresh {
        let mut slot = self
            .in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if let Some(pending) = slot.as_ref() {
            tracing::debug!("refresh already in flight, joining it");
            return pending.clone();
        }

        let inner = Arc::clone(self);
        let task = tokio::spawn(async move { inner.run_cycle().await });

        let pending = async move {
            task.await
                .unwrap_or_else(|_| Err(RefreshError::Cancelled))
        }
        .boxed()
        .shared();
        *slot = Some(pending.clone());
        pending
    }

    /// Fetches, publishes and retires the cycle under the client lock.
    ///
    /// The slot is cleared before the lock is released, so a command sent
    /// after this cycle's queries can never join it.
    async fn run_cycle(&self) -> RefreshOutcome {
        let name = self.config.display_name();
        let mut client = self.client.lock().await;
        tracing::debug!("refreshing {}", name);

        let outcome = match self.fetch(&mut client).await {
            Ok(snapshot) => {
                if !snapshot.status.is_known() {
                    tracing::warn!(
                        "{} reported unknown status code {}",
                        name,
                        snapshot.status.code()
                    );
                }
                self.snapshot.send_replace(Some(Arc::clone(&snapshot)));
                self.last_update_success.store(true, Ordering::SeqCst);
                tracing::debug!("{} updated (version {})", name, snapshot.version);
                self.dispatcher
                    .dispatch(CoordinatorEvent::Updated(Arc::clone(&snapshot)));
                Ok(snapshot)
            }
            Err(e) => {
                self.last_update_success.store(false, Ordering::SeqCst);
                tracing::warn!("{} refresh failed: {}", name, e);
                self.dispatcher
                    .dispatch(CoordinatorEvent::UpdateFailed(e.clone()));
                Err(e)
            }
        };

        *self
            .in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = None;
        drop(client);
        outcome
    }

    /// Runs both queries and merges them. Publishes nothing.
    async fn fetch(&self, client: &mut StoveClient<T>) -> RefreshOutcome {
        let primary = client
            .fetch_primary_status()
            .await
            .map_err(|source| RefreshError::Fetch {
                stage: RefreshStage::Primary,
                source,
            })?;
        let secondary = client
            .fetch_secondary_status()
            .await
            .map_err(|source| RefreshError::Fetch {
                stage: RefreshStage::Secondary,
                source,
            })?;

        let version = self.version.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(Arc::new(StoveSnapshot::merge(version, &primary, &secondary)))
    }
}

/// Scheduled refreshes. Idle while nobody is subscribed.
async fn poll_loop<T: Transport + 'static>(
    inner: Weak<Inner<T>>,
    mut listeners: watch::Receiver<usize>,
    interval: Duration,
) {
    loop {
        while *listeners.borrow_and_update() == 0 {
            if listeners.changed().await.is_err() {
                return;
            }
        }

        let tick = tokio::time::sleep(interval);
        tokio::pin!(tick);
        let due = loop {
            tokio::select! {
                () = &mut tick => break true,
                changed = listeners.changed() => {
                    if changed.is_err() {
                        return;
                    }
                    if *listeners.borrow_and_update() == 0 {
                        break false;
                    }
                }
            }
        };
        if !due {
            tracing::debug!("no subscribers left, polling paused");
            continue;
        }

        let Some(inner) = inner.upgrade() else {
            return;
        };
        // Failures are logged and dispatched by the cycle itself.
        let _ = inner.refresh().await;
    }
}

/// Coordinates polling and control of one stove.
///
/// # Example
///
/// ```no_run
/// use appfire::{Coordinator, CoordinatorEvent, StoveConfig};
///
/// # async fn example() -> appfire::Result<()> {
/// let config = StoveConfig::new("192.168.1.50").poll_interval_secs(30);
/// let coordinator = Coordinator::new(config)?;
/// let snapshot = coordinator.first_refresh().await?;
/// println!("status: {}", snapshot.status);
///
/// let mut events = coordinator.subscribe();
/// while let Some(CoordinatorEvent::Updated(snapshot)) = events.recv().await {
///     println!("ambient: {:.1}°C", snapshot.ambient_temperature);
/// }
/// # Ok(())
/// # }
/// ```
pub struct Coordinator<T> {
    inner: Arc<Inner<T>>,
    poll_task: Option<JoinHandle<()>>,
}

impl Coordinator<TcpTransport> {
    /// Creates a coordinator that talks to the stove over TCP.
    ///
    /// Nothing is sent until the first refresh.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`] if the configuration is unusable.
    pub fn new(config: StoveConfig) -> Result<Self> {
        let transport = TcpTransport::from_config(&config);
        Self::with_transport(config, transport)
    }
}

impl<T: Transport + 'static> Coordinator<T> {
    /// Creates a coordinator with the given transport.
    ///
    /// Must be called from within a Tokio runtime; the polling task is
    /// spawned immediately but stays idle until someone subscribes.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`] if the configuration is unusable.
    pub fn with_transport(config: StoveConfig, transport: T) -> Result<Self> {
        config.validate()?;
        let config = config.clamped();

        let mut client = StoveClient::new(transport);
        client.set_timeout(config.io_timeout);
        let interval = config.poll_interval;

        let (snapshot, _) = watch::channel(None);
        let inner = Arc::new(Inner {
            config,
            client: Mutex::new(client),
            snapshot,
            dispatcher: EventDispatcher::new(EVENT_CAPACITY),
            in_flight: std::sync::Mutex::new(None),
            version: AtomicU64::new(0),
            last_update_success: AtomicBool::new(false),
        });

        let listeners = inner.dispatcher.watch_listeners();
        let poll_task = tokio::spawn(poll_loop(Arc::downgrade(&inner), listeners, interval));

        tracing::info!(
            "coordinator for {} created, polling every {:?}",
            inner.config.display_name(),
            interval
        );

        Ok(Self {
            inner,
            poll_task: Some(poll_task),
        })
    }

    /// Runs one refresh cycle, or joins the one already running.
    ///
    /// On success the new snapshot is published before this returns. On
    /// failure the previous snapshot stays current.
    ///
    /// # Errors
    ///
    /// Returns the failure of the shared cycle, tagged with the failing stage.
    pub async fn refresh(&self) -> std::result::Result<Arc<StoveSnapshot>, RefreshError> {
        self.inner.refresh().await
    }

    /// Runs the initial refresh during setup.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotReady`] if the stove could not be read; the host
    /// should retry setup later.
    pub async fn first_refresh(&self) -> Result<Arc<StoveSnapshot>> {
        self.refresh().await.map_err(|e| {
            tracing::warn!("{} not ready: {}", self.inner.config.display_name(), e);
            Error::NotReady(e)
        })
    }

    /// Sends a control command, then refreshes.
    ///
    /// A failed command triggers no refresh. A failed refresh after a
    /// successful command is reported to subscribers only.
    ///
    /// # Errors
    ///
    /// Returns [`RefreshError::Command`] if the stove did not acknowledge.
    pub async fn issue_command(&self, command: Command) -> std::result::Result<(), RefreshError> {
        let name = self.inner.config.display_name();
        tracing::info!("{}: {}", name, command);

        let sent = self.inner.client.lock().await.send_command(command).await;
        if let Err(source) = sent {
            tracing::warn!("{}: command {} failed: {}", name, command, source);
            return Err(RefreshError::Command { command, source });
        }

        if let Err(e) = self.refresh().await {
            tracing::debug!("{}: refresh after {} failed: {}", name, command, e);
        }
        Ok(())
    }

    /// Turns the stove on.
    ///
    /// # Errors
    ///
    /// See [`issue_command`](Self::issue_command).
    pub async fn turn_on(&self) -> Result<()> {
        Ok(self.issue_command(Command::TurnOn).await?)
    }

    /// Turns the stove off.
    ///
    /// # Errors
    ///
    /// See [`issue_command`](Self::issue_command).
    pub async fn turn_off(&self) -> Result<()> {
        Ok(self.issue_command(Command::TurnOff).await?)
    }

    /// Sets the desired ambient temperature in °C.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidTemperature`] for values the stove does not
    /// accept, otherwise see [`issue_command`](Self::issue_command).
    pub async fn set_desired_temperature(&self, celsius: f64) -> Result<()> {
        let value = DesiredTemperature::from_celsius(celsius)?;
        Ok(self
            .issue_command(Command::SetDesiredTemperature(value))
            .await?)
    }

    /// Returns the latest published snapshot.
    #[must_use]
    pub fn snapshot(&self) -> Option<Arc<StoveSnapshot>> {
        self.inner.snapshot.borrow().clone()
    }

    /// Returns a receiver that observes every published snapshot.
    #[must_use]
    pub fn watch_snapshot(&self) -> watch::Receiver<Option<Arc<StoveSnapshot>>> {
        self.inner.snapshot.subscribe()
    }

    /// Subscribes to refresh events. Polling runs while subscriptions exist.
    #[must_use]
    pub fn subscribe(&self) -> Subscription {
        let subscription = self.inner.dispatcher.subscribe();
        tracing::debug!(
            "{} subscriber(s) for {}",
            self.inner.dispatcher.listener_count(),
            self.inner.config.display_name()
        );
        subscription
    }

    /// Returns the number of live subscriptions.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.inner.dispatcher.listener_count()
    }

    /// Returns true if the most recent cycle succeeded.
    #[must_use]
    pub fn last_update_success(&self) -> bool {
        self.inner.last_update_success.load(Ordering::SeqCst)
    }

    /// Returns true while a refresh cycle is running.
    #[must_use]
    pub fn is_refreshing(&self) -> bool {
        self.inner
            .in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    /// Returns the configuration.
    #[must_use]
    pub fn config(&self) -> &StoveConfig {
        &self.inner.config
    }

    /// Returns the label, or the address when no label is set.
    #[must_use]
    pub fn display_name(&self) -> String {
        self.inner.config.display_name()
    }

    /// Stops polling and closes the connection.
    pub async fn shutdown(&mut self) {
        if let Some(task) = self.poll_task.take() {
            task.abort();
        }
        self.inner.client.lock().await.disconnect().await;
        tracing::info!("coordinator for {} shut down", self.display_name());
    }
}

impl<T> Drop for Coordinator<T> {
    fn drop(&mut self) {
        if let Some(task) = self.poll_task.take() {
            task.abort();
        }
    }
}
