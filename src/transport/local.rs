//! In-process transport backend.
//!
//! `LocalTransport` routes requests and topic messages between components
//! living in the same process: the checkpoint side uses the [`Transport`]
//! trait, while the sensing side registers service handlers with
//! [`LocalTransport::advertise`] and emits events with
//! [`LocalTransport::publish`]. Handlers and subscriber callbacks run on the
//! calling thread, so a sensor publishing from its own thread exercises the
//! same concurrency the checkpoint code must tolerate in production.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tracing::debug;

use super::{MessageCallback, ResponseCallback, Transport};
use crate::error::CompetitionError;

/// Service handler: returns `Some(reply)` on success, `None` for a failure
/// response (the requester's callback sees `success = false`).
type ServiceHandler = Arc<dyn Fn(bool) -> Option<bool> + Send + Sync>;

/// Single-process message bus implementing [`Transport`].
#[derive(Default)]
pub struct LocalTransport {
    services: Mutex<HashMap<String, ServiceHandler>>,
    subscriptions: Mutex<HashMap<String, Vec<MessageCallback>>>,
}

impl LocalTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a service handler. A later registration under the same name
    /// replaces the earlier one.
    pub fn advertise<F>(&self, service: &str, handler: F)
    where
        F: Fn(bool) -> Option<bool> + Send + Sync + 'static,
    {
        self.services
            .lock()
            .expect("services lock")
            .insert(service.to_string(), Arc::new(handler));
    }

    /// Deliver `payload` to every subscriber of `topic`.
    ///
    /// Returns the number of callbacks invoked. Callbacks run on the
    /// caller's thread, outside any internal lock.
    pub fn publish(&self, topic: &str, payload: bool) -> usize {
        let callbacks: Vec<MessageCallback> = self
            .subscriptions
            .lock()
            .expect("subscriptions lock")
            .get(topic)
            .map(|subs| subs.to_vec())
            .unwrap_or_default();

        for callback in &callbacks {
            callback(payload);
        }
        callbacks.len()
    }

    /// Number of live subscriptions on `topic`.
    pub fn subscriber_count(&self, topic: &str) -> usize {
        self.subscriptions
            .lock()
            .expect("subscriptions lock")
            .get(topic)
            .map(Vec::len)
            .unwrap_or(0)
    }
}

impl Transport for LocalTransport {
    fn request(&self, service: &str, payload: bool, on_response: ResponseCallback) {
        let handler = self
            .services
            .lock()
            .expect("services lock")
            .get(service)
            .cloned();

        // Handler runs outside the lock: it may publish or re-enter.
        match handler {
            Some(handler) => match handler(payload) {
                Some(reply) => on_response(reply, true),
                None => on_response(false, false),
            },
            None => {
                // No such service: the request is lost and the callback is
                // never invoked, like an unanswered call on a real bus.
                debug!(service, "request dropped: no such service");
            }
        }
    }

    fn subscribe(&self, topic: &str, callback: MessageCallback) -> Result<(), CompetitionError> {
        self.subscriptions
            .lock()
            .expect("subscriptions lock")
            .entry(topic.to_string())
            .or_default()
            .push(callback);
        Ok(())
    }

    fn unsubscribe(&self, topic: &str) -> Result<(), CompetitionError> {
        match self
            .subscriptions
            .lock()
            .expect("subscriptions lock")
            .remove(topic)
        {
            Some(_) => Ok(()),
            None => Err(CompetitionError::NotSubscribed(topic.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    use super::*;

    #[test]
    fn request_reaches_handler_and_response_returns() {
        let bus = LocalTransport::new();
        bus.advertise("sensor/enable", |payload| Some(payload));

        let got = Arc::new(Mutex::new(None));
        let got_clone = Arc::clone(&got);
        bus.request(
            "sensor/enable",
            true,
            Box::new(move |reply, success| {
                *got_clone.lock().unwrap() = Some((reply, success));
            }),
        );

        assert_eq!(*got.lock().unwrap(), Some((true, true)));
    }

    #[test]
    fn handler_failure_reports_unsuccessful_response() {
        let bus = LocalTransport::new();
        bus.advertise("sensor/enable", |_| None);

        let got = Arc::new(Mutex::new(None));
        let got_clone = Arc::clone(&got);
        bus.request(
            "sensor/enable",
            true,
            Box::new(move |reply, success| {
                *got_clone.lock().unwrap() = Some((reply, success));
            }),
        );

        assert_eq!(*got.lock().unwrap(), Some((false, false)));
    }

    #[test]
    fn request_to_unknown_service_is_lost() {
        let bus = LocalTransport::new();
        let invoked = Arc::new(AtomicBool::new(false));
        let invoked_clone = Arc::clone(&invoked);
        bus.request(
            "nowhere/enable",
            true,
            Box::new(move |_, _| invoked_clone.store(true, Ordering::SeqCst)),
        );
        assert!(!invoked.load(Ordering::SeqCst));
    }

    #[test]
    fn publish_fans_out_to_all_subscribers() {
        let bus = LocalTransport::new();
        let count = Arc::new(AtomicUsize::new(0));

        for _ in 0..3 {
            let count = Arc::clone(&count);
            bus.subscribe(
                "sensor/contain",
                Arc::new(move |payload| {
                    if payload {
                        count.fetch_add(1, Ordering::SeqCst);
                    }
                }),
            )
            .unwrap();
        }

        assert_eq!(bus.publish("sensor/contain", true), 3);
        assert_eq!(count.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn publish_without_subscribers_delivers_nothing() {
        let bus = LocalTransport::new();
        assert_eq!(bus.publish("sensor/contain", true), 0);
    }

    #[test]
    fn unsubscribe_removes_topic() {
        let bus = LocalTransport::new();
        bus.subscribe("sensor/contain", Arc::new(|_| {})).unwrap();
        assert_eq!(bus.subscriber_count("sensor/contain"), 1);

        bus.unsubscribe("sensor/contain").unwrap();
        assert_eq!(bus.subscriber_count("sensor/contain"), 0);
        assert_eq!(bus.publish("sensor/contain", true), 0);
    }

    #[test]
    fn unsubscribe_unknown_topic_errors() {
        let bus = LocalTransport::new();
        let err = bus.unsubscribe("sensor/contain").unwrap_err();
        assert!(matches!(err, CompetitionError::NotSubscribed(_)));
    }

    #[test]
    fn publish_from_another_thread_is_delivered() {
        let bus = Arc::new(LocalTransport::new());
        let seen = Arc::new(AtomicBool::new(false));

        let seen_clone = Arc::clone(&seen);
        bus.subscribe(
            "sensor/contain",
            Arc::new(move |payload| seen_clone.store(payload, Ordering::SeqCst)),
        )
        .unwrap();

        let bus_clone = Arc::clone(&bus);
        std::thread::spawn(move || {
            bus_clone.publish("sensor/contain", true);
        })
        .join()
        .unwrap();

        assert!(seen.load(Ordering::SeqCst));
    }
}
