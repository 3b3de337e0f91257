//! Notification listener: subscription lifecycle and dispatch.
//!
//! The listener owns two pattern subscriptions, one per channel family,
//! for as long as it lives, and releases both on teardown. A single
//! spawned task drains both receivers and applies decoded events to
//! every registered database. Within one family, events are handled in
//! the order the transport delivered them; across families no ordering
//! is guaranteed (invalidation is idempotent, so interleavings are safe).
//!
//! Nothing escapes the handler task. Malformed payloads, unknown events,
//! and self-originated events are dropped; the worst consequence of any
//! dropped notification is a stale local entry, which self-corrects on
//! the next write-through or TTL expiry.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};

use bytes::Bytes;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::dispatch::Database;
use crate::event::{Channels, Event, ParsedInput};
use crate::identity::ProcessId;

/// One publication delivered by the subscription transport.
#[derive(Debug, Clone)]
pub struct RawNotification {
    /// The channel the notification was published to.
    pub channel: Arc<str>,
    /// The raw payload bytes.
    pub payload: Bytes,
}

impl RawNotification {
    /// Convenience constructor for transports and tests.
    pub fn new(channel: impl Into<Arc<str>>, payload: impl Into<Bytes>) -> Self {
        Self {
            channel: channel.into(),
            payload: payload.into(),
        }
    }
}

/// The subscription primitive the listener consumes.
///
/// Implemented by the transport that owns the connection to the remote
/// store. `psubscribe` registers a pattern and returns a receiver of
/// matching publications; `punsubscribe` releases the pattern.
pub trait PatternSubscriber: Send + Sync + 'static {
    /// Subscribes to a glob pattern, returning the delivery channel.
    fn psubscribe(&self, pattern: &str) -> broadcast::Receiver<RawNotification>;

    /// Releases a pattern subscription.
    fn punsubscribe(&self, pattern: &str);
}

/// Listener configuration.
#[derive(Debug, Clone)]
pub struct ListenerConfig {
    /// Remote database index the channel prefixes are built from.
    pub db_index: u32,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self { db_index: 0 }
    }
}

/// State shared between the listener handle and its task.
struct Inner {
    channels: Channels,
    /// Copy-on-write snapshot: registration swaps the Arc, dispatch
    /// clones it and iterates without holding the lock.
    databases: RwLock<Arc<[Arc<Database>]>>,
    paused: AtomicBool,
}

impl Inner {
    /// Handles one notification end to end: pause gate, parse,
    /// self-filter, decode, dispatch.
    fn handle(&self, notification: &RawNotification) {
        if self.paused.load(Ordering::Relaxed) {
            return;
        }

        let parsed = match self
            .channels
            .parse(&notification.channel, &notification.payload)
        {
            Ok(parsed) => parsed,
            Err(reason) => {
                debug!(channel = %notification.channel, %reason, "dropping notification");
                return;
            }
        };

        let event = match parsed {
            ParsedInput::Standard { key, event } => Event::decode_standard(key, event),
            ParsedInput::Detailed {
                key,
                originator,
                event,
                arg,
            } => {
                if originator == ProcessId::current().as_str() {
                    debug!(key, event, "dropping self-originated event");
                    return;
                }
                Event::decode_detailed(key, event, arg)
            }
            ParsedInput::Unknown => return,
        };

        if event == Event::Ignored {
            return;
        }

        let databases = self
            .databases
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone();
        for db in databases.iter() {
            db.apply(&event);
        }
    }

    fn register(&self, db: Arc<Database>) {
        let mut guard = self
            .databases
            .write()
            .unwrap_or_else(|e| e.into_inner());
        let mut next: Vec<Arc<Database>> = guard.iter().cloned().collect();
        next.push(db);
        *guard = next.into();
    }
}

/// Owns the two keyspace subscriptions and keeps registered databases
/// coherent with the remote store.
///
/// Dropping the listener (or calling [`close`](Self::close)) stops the
/// task and releases both pattern subscriptions. Registered databases
/// are owned by the application and outlive the listener.
pub struct NotificationListener {
    inner: Arc<Inner>,
    subscriber: Arc<dyn PatternSubscriber>,
    standard_pattern: String,
    detailed_pattern: String,
    task: Option<JoinHandle<()>>,
}

impl NotificationListener {
    /// Subscribes to both channel families and spawns the handler task.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(subscriber: Arc<dyn PatternSubscriber>, config: ListenerConfig) -> Self {
        let channels = Channels::new(config.db_index);
        let standard_pattern = channels.standard_pattern();
        let detailed_pattern = channels.detailed_pattern();

        let standard_rx = subscriber.psubscribe(&standard_pattern);
        let detailed_rx = subscriber.psubscribe(&detailed_pattern);

        let inner = Arc::new(Inner {
            channels,
            databases: RwLock::new(Vec::new().into()),
            paused: AtomicBool::new(false),
        });

        let task = tokio::spawn(run(Arc::clone(&inner), standard_rx, detailed_rx));

        Self {
            inner,
            subscriber,
            standard_pattern,
            detailed_pattern,
            task: Some(task),
        }
    }

    /// Registers a database to receive future invalidations.
    ///
    /// Membership is monotonic: there is no deregistration. Events are
    /// applied to databases in registration order.
    pub fn register(&self, db: Arc<Database>) {
        self.inner.register(db);
    }

    /// Suppresses (or re-enables) event handling. Best-effort: an event
    /// racing the flag write may still be applied.
    pub fn pause(&self, paused: bool) {
        self.inner.paused.store(paused, Ordering::Relaxed);
    }

    /// Stops the handler task and releases both pattern subscriptions.
    pub fn close(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
            self.subscriber.punsubscribe(&self.standard_pattern);
            self.subscriber.punsubscribe(&self.detailed_pattern);
        }
    }
}

impl Drop for NotificationListener {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Drains both family receivers until both close.
async fn run(
    inner: Arc<Inner>,
    mut standard: broadcast::Receiver<RawNotification>,
    mut detailed: broadcast::Receiver<RawNotification>,
) {
    let mut standard_open = true;
    let mut detailed_open = true;

    while standard_open || detailed_open {
        tokio::select! {
            msg = standard.recv(), if standard_open => match msg {
                Ok(notification) => inner.handle(&notification),
                Err(broadcast::error::RecvError::Lagged(missed)) => {
                    warn!(missed, "standard keyspace subscriber lagged, notifications lost");
                }
                Err(broadcast::error::RecvError::Closed) => standard_open = false,
            },
            msg = detailed.recv(), if detailed_open => match msg {
                Ok(notification) => inner.handle(&notification),
                Err(broadcast::error::RecvError::Lagged(missed)) => {
                    warn!(missed, "detailed keyspace subscriber lagged, notifications lost");
                }
                Err(broadcast::error::RecvError::Closed) => detailed_open = false,
            },
        }
    }
}
