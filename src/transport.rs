//! Virtual Transport
//!
//! An in-memory [`Transport`] with software-defined ports. Clones share the
//! same state, so one handle can sit inside a [`crate::Synth`] while another
//! plugs devices in and plays notes, possibly from another thread.

use crate::device::{DeviceInfo, PortKind, PortState, Transport};
use crate::event::{Discovery, EventSender, SynthEvent};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

#[derive(Debug, Default)]
struct Inner {
    devices: Vec<DeviceInfo>,
    access: Option<EventSender>,
    listeners: HashMap<String, EventSender>,
    rejection: Option<String>,
}

/// Shared in-memory transport
#[derive(Debug, Clone, Default)]
pub struct VirtualTransport {
    inner: Arc<Mutex<Inner>>,
}

impl VirtualTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start with a connected input port
    pub fn with_input(self, id: &str, name: &str) -> Self {
        self.lock().devices.push(DeviceInfo::input(id, name));
        self
    }

    /// Start with a connected output port
    pub fn with_output(self, id: &str, name: &str) -> Self {
        self.lock().devices.push(DeviceInfo::output(id, name));
        self
    }

    /// Reject every access request with `reason`
    pub fn rejecting(self, reason: &str) -> Self {
        self.lock().rejection = Some(reason.to_string());
        self
    }

    /// Currently connected ports
    pub fn devices(&self) -> Vec<DeviceInfo> {
        self.lock().devices.clone()
    }

    pub fn is_listening(&self, id: &str) -> bool {
        self.lock().listeners.contains_key(id)
    }

    /// Connect an input port and announce it
    pub fn plug(&self, id: &str, name: &str) {
        self.plug_port(DeviceInfo::input(id, name));
    }

    /// Connect an output port and announce it
    pub fn plug_output(&self, id: &str, name: &str) {
        self.plug_port(DeviceInfo::output(id, name));
    }

    fn plug_port(&self, info: DeviceInfo) {
        let mut inner = self.lock();
        inner.devices.retain(|d| d.id != info.id);
        inner.devices.push(info.clone());
        if let Some(access) = &inner.access {
            let _ = access.send(SynthEvent::DeviceStateChanged(info));
        }
    }

    /// Disconnect a port and announce it; false if it was not connected
    pub fn unplug(&self, id: &str) -> bool {
        let mut inner = self.lock();
        let Some(position) = inner.devices.iter().position(|d| d.id == id) else {
            return false;
        };

        let mut info = inner.devices.remove(position);
        info.state = PortState::Disconnected;
        if let Some(access) = &inner.access {
            let _ = access.send(SynthEvent::DeviceStateChanged(info));
        }
        true
    }

    /// Deliver a raw message from an input; false if nobody listens to it
    pub fn send(&self, id: &str, data: &[u8]) -> bool {
        let inner = self.lock();
        let is_input = inner
            .devices
            .iter()
            .any(|d| d.id == id && d.kind == PortKind::Input);

        match inner.listeners.get(id) {
            Some(listener) if is_input => listener
                .send(SynthEvent::Message {
                    device_id: id.to_string(),
                    data: data.to_vec(),
                })
                .is_ok(),
            _ => false,
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Transport for VirtualTransport {
    fn request_access(&mut self, events: EventSender) -> Discovery {
        let mut inner = self.lock();
        if let Some(reason) = &inner.rejection {
            return Discovery::rejected(reason.clone());
        }
        inner.access = Some(events);
        Discovery::resolved(inner.devices.clone())
    }

    fn listen(&mut self, device_id: &str, events: EventSender) {
        self.lock().listeners.insert(device_id.to_string(), events);
    }

    fn unlisten(&mut self, device_id: &str) {
        self.lock().listeners.remove(device_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::event_channel;

    #[test]
    fn test_access_reports_devices() {
        let (tx, _rx) = event_channel();
        let mut transport = VirtualTransport::new()
            .with_input("a", "A")
            .with_output("b", "B");

        let devices = transport.request_access(tx).wait().unwrap();
        assert_eq!(devices.len(), 2);
        assert_eq!(devices[1].kind, PortKind::Output);
    }

    #[test]
    fn test_hot_plug_is_announced_after_access() {
        let (tx, rx) = event_channel();
        let mut transport = VirtualTransport::new();

        transport.plug("early", "Early");
        assert!(rx.try_recv().is_err());

        transport.request_access(tx).wait().unwrap();
        transport.plug("late", "Late");
        assert!(transport.unplug("late"));
        assert!(!transport.unplug("late"));

        let events: Vec<_> = rx.try_iter().collect();
        assert_eq!(
            events,
            vec![
                SynthEvent::DeviceStateChanged(DeviceInfo::input("late", "Late")),
                SynthEvent::DeviceStateChanged(DeviceInfo::input("late", "Late").disconnected()),
            ]
        );
    }

    #[test]
    fn test_send_requires_listener() {
        let (tx, rx) = event_channel();
        let mut transport = VirtualTransport::new().with_input("a", "A");

        assert!(!transport.send("a", &[0x90, 60, 1]));
        transport.listen("a", tx);
        assert!(transport.send("a", &[0x90, 60, 1]));
        assert_eq!(rx.try_iter().count(), 1);

        transport.unlisten("a");
        assert!(!transport.send("a", &[0x80, 60, 0]));
    }

    #[test]
    fn test_clones_share_state() {
        let transport = VirtualTransport::new();
        let other = transport.clone();
        other.plug("a", "A");
        assert_eq!(transport.devices().len(), 1);
    }

    #[test]
    fn test_rejecting_transport() {
        let (tx, _rx) = event_channel();
        let mut transport = VirtualTransport::new().rejecting("denied");
        assert!(transport.request_access(tx).wait().is_err());
    }
}
