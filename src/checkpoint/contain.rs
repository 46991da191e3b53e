//! Containment-sensor checkpoint.
//!
//! Completion is reported by an external containment sensor that runs
//! independently of the tick loop. The checkpoint drives it through an
//! enable/disable handshake on `<namespace>/enable` and listens for
//! containment events on `<namespace>/contain`:
//!
//! 1. first `check` subscribes to the feed and requests enable;
//! 2. once the sensor acknowledges, the checkpoint waits for a containment
//!    event (latched, never cleared);
//! 3. the tick after the event it unsubscribes and requests disable;
//! 4. once the disable is acknowledged the checkpoint is complete and
//!    performs no further I/O.
//!
//! Responses and events arrive on the transport's delivery context,
//! concurrently with `check`. The handshake phase therefore lives behind a
//! mutex shared with the callbacks, and each response is applied only if
//! the phase still matches the request that produced it, so duplicate or
//! stale responses cannot double-toggle the sensor. A failure response
//! retreats one phase and the next `check` re-sends the request.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use tracing::{debug, warn};

use super::{Checkpoint, CheckpointCore};
use crate::time::SimMicros;
use crate::transport::{MessageCallback, Transport};

/// Handshake phase with the external sensor.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum SensorPhase {
    /// Sensor off, no request outstanding. Entered again if an enable
    /// request fails, which makes the next `check` retry it.
    Idle,
    /// Enable request in flight.
    Enabling,
    /// Sensor on, waiting for a containment event.
    Armed,
    /// Disable request in flight.
    Disabling,
    /// Sensor off again, containment confirmed: the checkpoint is complete.
    Done,
}

/// State shared between the tick side and transport callbacks.
///
/// Callbacks hold a `Weak` to this, so a response landing after the
/// checkpoint was dropped upgrades to nothing and is discarded.
struct SensorLink {
    phase: Mutex<SensorPhase>,
    /// Containment latch. Set by a `true` event, never cleared within the
    /// checkpoint's lifetime.
    observed: AtomicBool,
}

/// Checkpoint completed by an external containment sensor.
pub struct ContainCheckpoint {
    core: CheckpointCore,
    namespace: Option<String>,
    transport: Arc<dyn Transport>,
    link: Arc<SensorLink>,
    subscribed: bool,
}

impl ContainCheckpoint {
    /// A missing or empty namespace is a configuration defect: the
    /// checkpoint still constructs but can never complete.
    pub fn new(
        ordinal: u8,
        weight: f64,
        namespace: Option<String>,
        transport: Arc<dyn Transport>,
    ) -> Self {
        let namespace = namespace.filter(|ns| !ns.is_empty());
        if namespace.is_none() {
            warn!(ordinal, "contain checkpoint has no namespace; it will never complete");
        }
        Self {
            core: CheckpointCore::new(ordinal, weight),
            namespace,
            transport,
            link: Arc::new(SensorLink {
                phase: Mutex::new(SensorPhase::Idle),
                observed: AtomicBool::new(false),
            }),
            subscribed: false,
        }
    }

    /// Whether the remote sensor is currently switched on, as far as the
    /// acknowledged handshake state knows.
    pub fn sensor_enabled(&self) -> bool {
        matches!(self.phase(), SensorPhase::Armed | SensorPhase::Disabling)
    }

    /// Whether a containment event has been observed.
    pub fn containment_observed(&self) -> bool {
        self.link.observed.load(Ordering::Acquire)
    }

    fn phase(&self) -> SensorPhase {
        *self.link.phase.lock().expect("sensor phase lock")
    }

    fn set_phase(&self, phase: SensorPhase) {
        *self.link.phase.lock().expect("sensor phase lock") = phase;
    }

    fn contain_topic(namespace: &str) -> String {
        format!("{namespace}/contain")
    }

    fn enable_service(namespace: &str) -> String {
        format!("{namespace}/enable")
    }

    fn ensure_subscribed(&mut self, namespace: &str) {
        if self.subscribed {
            return;
        }
        let link = Arc::downgrade(&self.link);
        let callback: MessageCallback = Arc::new(move |contained| {
            let Some(link) = link.upgrade() else {
                return;
            };
            if contained {
                link.observed.store(true, Ordering::Release);
            }
        });
        match self
            .transport
            .subscribe(&Self::contain_topic(namespace), callback)
        {
            Ok(()) => self.subscribed = true,
            Err(err) => debug!(%err, "containment feed subscription failed; will retry"),
        }
    }

    fn drop_subscription(&mut self, namespace: &str) {
        if !self.subscribed {
            return;
        }
        if let Err(err) = self.transport.unsubscribe(&Self::contain_topic(namespace)) {
            debug!(%err, "containment feed unsubscribe failed");
        }
        self.subscribed = false;
    }

    /// Send an enable or disable request. The response is applied only if
    /// the handshake is still in the phase that issued it, which makes the
    /// effect of each accepted toggle exactly-once under duplicate or stale
    /// responses.
    fn send_toggle(&self, namespace: &str, enable: bool) {
        let link = Arc::downgrade(&self.link);
        let ordinal = self.core.ordinal();
        self.transport.request(
            &Self::enable_service(namespace),
            enable,
            Box::new(move |_reply, success| {
                let Some(link) = link.upgrade() else {
                    debug!(ordinal, "sensor response after checkpoint teardown; ignored");
                    return;
                };
                let mut phase = link.phase.lock().expect("sensor phase lock");
                let expected = if enable {
                    SensorPhase::Enabling
                } else {
                    SensorPhase::Disabling
                };
                if *phase != expected {
                    debug!(ordinal, enable, "stale sensor response ignored");
                    return;
                }
                *phase = match (enable, success) {
                    (true, true) => SensorPhase::Armed,
                    (true, false) => SensorPhase::Idle,
                    (false, true) => SensorPhase::Done,
                    (false, false) => SensorPhase::Armed,
                };
            }),
        );
    }
}

impl Checkpoint for ContainCheckpoint {
    fn core(&self) -> &CheckpointCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut CheckpointCore {
        &mut self.core
    }

    fn check(&mut self, _now_us: SimMicros) -> bool {
        let Some(namespace) = self.namespace.clone() else {
            return false;
        };

        // The tick side is the only writer while the phase is Idle or
        // Armed; callbacks only move the in-flight phases. Reading the
        // phase, then transitioning before the request goes out, is
        // therefore race-free.
        match self.phase() {
            SensorPhase::Idle => {
                self.ensure_subscribed(&namespace);
                if self.subscribed {
                    self.set_phase(SensorPhase::Enabling);
                    self.send_toggle(&namespace, true);
                }
                false
            }
            SensorPhase::Enabling | SensorPhase::Disabling => false,
            SensorPhase::Armed => {
                if !self.link.observed.load(Ordering::Acquire) {
                    return false;
                }
                self.drop_subscription(&namespace);
                self.set_phase(SensorPhase::Disabling);
                self.send_toggle(&namespace, false);
                false
            }
            SensorPhase::Done => true,
        }
    }
}
