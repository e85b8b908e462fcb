//! Event Ingestion
//!
//! Transports never call into the synth directly. They push [`SynthEvent`]s
//! into a channel that the synth drains in arrival order, so every
//! voice-mutating event is handled one at a time.
//!
//! Device discovery is a one-shot [`Discovery`] the transport resolves with
//! the current device list or rejects with a reason.

use crate::device::DeviceInfo;
use crate::error::DeviceBindingError;
use crossbeam_channel::{bounded, unbounded, Receiver, RecvTimeoutError, Sender, TryRecvError};
use std::time::Duration;

/// An event delivered by a transport
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SynthEvent {
    /// Hot-plug notification
    DeviceStateChanged(DeviceInfo),

    /// Raw message from a bound device
    Message { device_id: String, data: Vec<u8> },
}

pub type EventSender = Sender<SynthEvent>;
pub type EventReceiver = Receiver<SynthEvent>;

/// Create the ingestion channel
pub fn event_channel() -> (EventSender, EventReceiver) {
    unbounded()
}

type DiscoveryResult = Result<Vec<DeviceInfo>, String>;

/// Resolving side of a [`Discovery`]
///
/// Dropping it without resolving rejects the discovery.
#[derive(Debug)]
pub struct DiscoveryResolver {
    tx: Sender<DiscoveryResult>,
}

impl DiscoveryResolver {
    pub fn resolve(self, devices: Vec<DeviceInfo>) {
        // A dropped Discovery means nobody is waiting any more
        let _ = self.tx.send(Ok(devices));
    }

    pub fn reject(self, reason: impl Into<String>) {
        let _ = self.tx.send(Err(reason.into()));
    }
}

/// One-shot result of device discovery
#[derive(Debug)]
pub struct Discovery {
    rx: Receiver<DiscoveryResult>,
}

impl Discovery {
    /// Create a pending discovery and its resolver
    pub fn pending() -> (DiscoveryResolver, Discovery) {
        let (tx, rx) = bounded(1);
        (DiscoveryResolver { tx }, Discovery { rx })
    }

    pub fn resolved(devices: Vec<DeviceInfo>) -> Self {
        let (resolver, discovery) = Self::pending();
        resolver.resolve(devices);
        discovery
    }

    pub fn rejected(reason: impl Into<String>) -> Self {
        let (resolver, discovery) = Self::pending();
        resolver.reject(reason);
        discovery
    }

    /// Block until the transport answers
    pub fn wait(self) -> Result<Vec<DeviceInfo>, DeviceBindingError> {
        match self.rx.recv() {
            Ok(result) => result.map_err(DeviceBindingError::AccessRejected),
            Err(_) => Err(abandoned()),
        }
    }

    /// Block for at most `timeout`
    pub fn wait_timeout(self, timeout: Duration) -> Result<Vec<DeviceInfo>, DeviceBindingError> {
        match self.rx.recv_timeout(timeout) {
            Ok(result) => result.map_err(DeviceBindingError::AccessRejected),
            Err(RecvTimeoutError::Timeout) => Err(DeviceBindingError::AccessRejected(format!(
                "device discovery timed out after {:?}",
                timeout
            ))),
            Err(RecvTimeoutError::Disconnected) => Err(abandoned()),
        }
    }

    /// Poll without blocking; `None` while still pending
    pub fn try_take(&self) -> Option<Result<Vec<DeviceInfo>, DeviceBindingError>> {
        match self.rx.try_recv() {
            Ok(result) => Some(result.map_err(DeviceBindingError::AccessRejected)),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => Some(Err(abandoned())),
        }
    }
}

fn abandoned() -> DeviceBindingError {
    DeviceBindingError::AccessRejected("device discovery was abandoned".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_events_arrive_in_order() {
        let (tx, rx) = event_channel();
        for note in [60u8, 62, 64] {
            tx.send(SynthEvent::Message {
                device_id: "a".into(),
                data: vec![0x90, note, 100],
            })
            .unwrap();
        }

        let notes: Vec<u8> = rx
            .try_iter()
            .map(|event| match event {
                SynthEvent::Message { data, .. } => data[1],
                other => panic!("unexpected {:?}", other),
            })
            .collect();
        assert_eq!(notes, vec![60, 62, 64]);
    }

    #[test]
    fn test_resolved_discovery() {
        let devices = vec![DeviceInfo::input("a", "A")];
        assert_eq!(Discovery::resolved(devices.clone()).wait().unwrap(), devices);
    }

    #[test]
    fn test_rejected_discovery() {
        let err = Discovery::rejected("No MIDI support found").wait().unwrap_err();
        assert_eq!(err.to_string(), "Device access rejected: No MIDI support found");
    }

    #[test]
    fn test_resolved_from_another_thread() {
        let (resolver, discovery) = Discovery::pending();
        let handle = std::thread::spawn(move || {
            resolver.resolve(vec![DeviceInfo::input("b", "B")]);
        });

        let devices = discovery.wait_timeout(Duration::from_secs(5)).unwrap();
        handle.join().unwrap();
        assert_eq!(devices[0].id, "b");
    }

    #[test]
    fn test_pending_and_abandoned() {
        let (resolver, discovery) = Discovery::pending();
        assert!(discovery.try_take().is_none());

        drop(resolver);
        assert!(matches!(
            discovery.try_take(),
            Some(Err(DeviceBindingError::AccessRejected(_)))
        ));
    }

    #[test]
    fn test_wait_timeout_expires() {
        let (_resolver, discovery) = Discovery::pending();
        assert!(discovery.wait_timeout(Duration::from_millis(10)).is_err());
    }
}
