//! Transport collaborator boundary.
//!
//! Checkpoints talk to external sensing plugins through two primitives:
//! asynchronous unary request/response calls addressed by service name, and
//! topic-based publish/subscribe. Both carry boolean payloads. The trait is
//! object-safe so checkpoints can hold an `Arc<dyn Transport>` without
//! knowing which backend is wired in.
//!
//! Delivery context: response and message callbacks run on whatever thread
//! the transport backend delivers from, concurrently with the tick-driven
//! side. Callers must guard any state they share with a callback.

pub mod local;

use std::sync::Arc;

pub use local::LocalTransport;

use crate::error::CompetitionError;

/// Callback invoked once with the response payload and a success flag.
///
/// A lost request never invokes its callback; callers that need progress
/// must re-send (the contain handshake retries on the next tick).
pub type ResponseCallback = Box<dyn FnOnce(bool, bool) + Send + 'static>;

/// Callback invoked for every message delivered on a subscribed topic.
pub type MessageCallback = Arc<dyn Fn(bool) + Send + Sync + 'static>;

/// Request/response and publish/subscribe transport for boolean payloads.
pub trait Transport: Send + Sync {
    /// Send an asynchronous unary request to `service`.
    ///
    /// The callback receives the response payload and whether the call
    /// succeeded. It may run on an arbitrary thread, and may never run at
    /// all if the request is lost or the service does not exist.
    fn request(&self, service: &str, payload: bool, on_response: ResponseCallback);

    /// Subscribe `callback` to messages published on `topic`.
    ///
    /// Delivery is at-least-once: duplicates are possible and subscribers
    /// must tolerate them.
    fn subscribe(&self, topic: &str, callback: MessageCallback) -> Result<(), CompetitionError>;

    /// Remove every subscription this node holds on `topic`.
    fn unsubscribe(&self, topic: &str) -> Result<(), CompetitionError>;
}
