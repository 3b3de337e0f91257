//! hearth-sync: the invalidation and coherence engine.
//!
//! Keeps the typed shadow stores of [`hearth_store`] coherent with a
//! remote Redis-compatible store by consuming its keyspace-notification
//! channels. Other clients' writes arrive as asynchronous events; the
//! listener parses them, filters out this process's own writes, and
//! applies the tabulated invalidation to every registered database so
//! stale reads fall through to the remote store.
//!
//! Convergence is eventual, bounded by notification latency: this is a
//! best-effort coherence layer, not a linearizable one.

pub mod dispatch;
pub mod event;
pub mod identity;
pub mod listener;

pub use dispatch::Database;
pub use event::{Channels, Event, ParseError, ParsedInput};
pub use identity::ProcessId;
pub use listener::{ListenerConfig, NotificationListener, PatternSubscriber, RawNotification};
