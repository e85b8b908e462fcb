//! Input Device Binding
//!
//! Tracks every input the transport reports (`available`) and the subset the
//! synth listens to (`bound`). An input filter by id and/or name decides
//! which devices get bound; with no filter, every input matches.

use crate::error::DeviceBindingError;
use crate::event::{Discovery, EventSender};
use crate::registry::Registry;
use serde::{Deserialize, Serialize};

/// Direction of a transport port
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PortKind {
    Input,
    Output,
}

/// Connection state carried by hot-plug notifications
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PortState {
    Connected,
    Disconnected,
}

/// A port as reported by the transport
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceInfo {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: PortKind,
    pub state: PortState,
}

impl DeviceInfo {
    /// A connected input port
    pub fn input(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            kind: PortKind::Input,
            state: PortState::Connected,
        }
    }

    /// A connected output port
    pub fn output(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            kind: PortKind::Output,
            ..Self::input(id, name)
        }
    }

    /// The same port, marked disconnected
    pub fn disconnected(mut self) -> Self {
        self.state = PortState::Disconnected;
        self
    }
}

/// Opaque handle assigned when a device is first registered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DeviceHandle(pub u64);

/// A registered input device
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceRecord {
    pub id: String,
    pub name: String,
    pub handle: DeviceHandle,
}

impl core::fmt::Display for DeviceRecord {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{} ({})", self.name, self.id)
    }
}

/// Which inputs to bind
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputFilter {
    pub id: Option<String>,
    pub name: Option<String>,
}

impl InputFilter {
    /// Match every input
    pub fn any() -> Self {
        Self::default()
    }

    /// Match the input with this id
    pub fn by_id(id: impl Into<String>) -> Self {
        Self {
            id: Some(id.into()),
            name: None,
        }
    }

    /// Match inputs with this name
    pub fn by_name(name: impl Into<String>) -> Self {
        Self {
            id: None,
            name: Some(name.into()),
        }
    }

    /// Check if neither id nor name is set
    pub fn is_match_all(&self) -> bool {
        self.id.is_none() && self.name.is_none()
    }

    /// Check an input against the id OR the name
    pub fn matches(&self, id: &str, name: &str) -> bool {
        self.is_match_all()
            || self.id.as_deref() == Some(id)
            || self.name.as_deref() == Some(name)
    }
}

/// Available and bound devices at one point in time
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceSnapshot {
    pub available: Vec<DeviceRecord>,
    pub bound: Vec<DeviceRecord>,
}

/// Outcome of a hot-plug notification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceChange {
    Connected { bound: bool },
    Disconnected { was_bound: bool },
    /// Output port, or a repeated notification
    Ignored,
}

/// Source of devices, hot-plug notifications and raw messages
pub trait Transport {
    /// Begin discovery; hot-plug notifications are sent to `events` from now on
    fn request_access(&mut self, events: EventSender) -> Discovery;

    /// Deliver raw messages and state changes of `device_id` to `events`
    fn listen(&mut self, device_id: &str, events: EventSender);

    /// Stop delivering for `device_id`
    fn unlisten(&mut self, device_id: &str);
}

/// Reconciles transport devices with the configured input filter
#[derive(Debug, Clone)]
pub struct DeviceBindingManager {
    available: Registry<String, DeviceRecord>,
    bound: Registry<String, DeviceRecord>,
    filter: InputFilter,
    bind_to_inputs: bool,
    next_handle: u64,
}

impl DeviceBindingManager {
    /// Create a manager with nothing registered
    pub fn new(filter: InputFilter, bind_to_inputs: bool) -> Self {
        Self {
            available: Registry::new(),
            bound: Registry::new(),
            filter,
            bind_to_inputs,
            next_handle: 0,
        }
    }

    /// Filter deciding which inputs bind
    pub fn filter(&self) -> &InputFilter {
        &self.filter
    }

    /// Whether matching inputs are bound automatically
    pub fn bind_to_inputs(&self) -> bool {
        self.bind_to_inputs
    }

    /// Check if an input is registered
    pub fn is_available(&self, id: &str) -> bool {
        self.available.has(id)
    }

    /// Check if an input is being listened to
    pub fn is_bound(&self, id: &str) -> bool {
        self.bound.has(id)
    }

    /// Registered inputs, in discovery order
    pub fn available(&self) -> impl Iterator<Item = &DeviceRecord> {
        self.available.values()
    }

    /// Bound inputs, in binding order
    pub fn bound(&self) -> impl Iterator<Item = &DeviceRecord> {
        self.bound.values()
    }

    /// Copy of the available and bound sets
    pub fn snapshot(&self) -> DeviceSnapshot {
        DeviceSnapshot {
            available: self.available.values().cloned().collect(),
            bound: self.bound.values().cloned().collect(),
        }
    }

    /// Add an input to the available set, returning its record
    pub fn register(&mut self, info: &DeviceInfo) -> DeviceRecord {
        if let Ok(existing) = self.available.get(&info.id) {
            return existing.clone();
        }

        let record = DeviceRecord {
            id: info.id.clone(),
            name: info.name.clone(),
            handle: DeviceHandle(self.next_handle),
        };
        self.next_handle += 1;
        self.available.push(record.id.clone(), record.clone());
        record
    }

    /// Start listening to an available device; false if unknown or already bound
    pub fn bind_to_input<T: Transport>(
        &mut self,
        id: &str,
        transport: &mut T,
        events: &EventSender,
    ) -> bool {
        if self.bound.has(id) {
            return false;
        }
        let Ok(record) = self.available.get(id) else {
            return false;
        };

        let record = record.clone();
        transport.listen(&record.id, events.clone());
        log::info!("binding to input: {}", record);
        self.bound.push(record.id.clone(), record);
        true
    }

    /// Stop listening to a device; false if it was not bound
    pub fn unbind_input<T: Transport>(&mut self, id: &str, transport: &mut T) -> bool {
        let Some(record) = self.bound.remove(id) else {
            return false;
        };
        transport.unlisten(&record.id);
        log::info!("unbinding input: {}", record);
        true
    }

    /// Register every discovered input and bind the matching ones
    ///
    /// With binding enabled, ending up with no bound input is an error that
    /// lists the filter and every available input.
    pub fn scan<T: Transport>(
        &mut self,
        devices: &[DeviceInfo],
        transport: &mut T,
        events: &EventSender,
    ) -> Result<DeviceSnapshot, DeviceBindingError> {
        let inputs: Vec<&DeviceInfo> = devices
            .iter()
            .filter(|d| d.kind == PortKind::Input && d.state == PortState::Connected)
            .collect();

        for info in &inputs {
            self.register(info);
        }

        if self.bind_to_inputs {
            for info in &inputs {
                if self.filter.matches(&info.id, &info.name) {
                    self.bind_to_input(&info.id, transport, events);
                }
            }

            if self.bound.is_empty() {
                return Err(DeviceBindingError::NoMatchingInputs {
                    filter: self.filter.clone(),
                    available: self
                        .available
                        .map(|record, _, _| (record.name.clone(), record.id.clone())),
                });
            }
        }

        Ok(self.snapshot())
    }

    /// Apply a hot-plug notification
    pub fn handle_state_change<T: Transport>(
        &mut self,
        info: &DeviceInfo,
        transport: &mut T,
        events: &EventSender,
    ) -> DeviceChange {
        if info.kind != PortKind::Input {
            return DeviceChange::Ignored;
        }

        match info.state {
            PortState::Connected => {
                if self.is_available(&info.id) {
                    return DeviceChange::Ignored;
                }
                self.register(info);
                let bound = self.bind_to_inputs
                    && self.filter.matches(&info.id, &info.name)
                    && self.bind_to_input(&info.id, transport, events);
                DeviceChange::Connected { bound }
            }
            PortState::Disconnected => {
                if !self.is_available(&info.id) {
                    return DeviceChange::Ignored;
                }
                let was_bound = self.unbind_input(&info.id, transport);
                self.available.remove(info.id.as_str());
                log::info!("input disconnected: {} ({})", info.name, info.id);
                DeviceChange::Disconnected { was_bound }
            }
        }
    }

    /// Run discovery and bind matching inputs
    pub fn discover<T: Transport>(
        &mut self,
        transport: &mut T,
        events: &EventSender,
    ) -> Result<DeviceSnapshot, DeviceBindingError> {
        let devices = transport.request_access(events.clone()).wait()?;
        self.scan(&devices, transport, events)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::{event_channel, SynthEvent};
    use crate::transport::VirtualTransport;

    fn transport() -> VirtualTransport {
        VirtualTransport::new()
            .with_input("in-1", "Launchkey")
            .with_input("in-2", "Through Port")
            .with_output("out-1", "Synth Out")
    }

    #[test]
    fn test_filter_matching() {
        assert!(InputFilter::any().matches("x", "y"));
        assert!(InputFilter::by_id("x").matches("x", "other"));
        assert!(InputFilter::by_name("y").matches("other", "y"));
        assert!(!InputFilter::by_id("x").matches("z", "y"));

        let both = InputFilter {
            id: Some("a".into()),
            name: Some("b".into()),
        };
        assert!(both.matches("a", "zzz"));
        assert!(both.matches("zzz", "b"));
        assert!(!both.matches("zzz", "zzz"));
    }

    #[test]
    fn test_scan_without_filter_binds_every_input() {
        let (tx, _rx) = event_channel();
        let mut transport = transport();
        let mut devices = DeviceBindingManager::new(InputFilter::any(), true);

        let snapshot = devices.discover(&mut transport, &tx).unwrap();
        assert_eq!(snapshot.available.len(), 2);
        assert_eq!(snapshot.bound.len(), 2);
        assert!(transport.is_listening("in-1"));
        assert!(transport.is_listening("in-2"));
        assert!(!devices.is_available("out-1"));
    }

    #[test]
    fn test_scan_with_name_filter() {
        let (tx, _rx) = event_channel();
        let mut transport = transport();
        let mut devices = DeviceBindingManager::new(InputFilter::by_name("Through Port"), true);

        let snapshot = devices.discover(&mut transport, &tx).unwrap();
        assert_eq!(snapshot.available.len(), 2);
        assert_eq!(snapshot.bound.len(), 1);
        assert_eq!(snapshot.bound[0].id, "in-2");
        assert!(!transport.is_listening("in-1"));
    }

    #[test]
    fn test_scan_with_unmatched_filter_fails_descriptively() {
        let (tx, _rx) = event_channel();
        let mut transport = transport();
        let mut devices = DeviceBindingManager::new(InputFilter::by_id("nope"), true);

        let err = devices.discover(&mut transport, &tx).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("No input matching ID \"nope\"."));
        assert!(msg.contains("Launchkey (in-1)"));
        assert!(msg.contains("Through Port (in-2)"));

        // Devices stay registered as available
        assert_eq!(devices.available().count(), 2);
        assert_eq!(devices.bound().count(), 0);
    }

    #[test]
    fn test_scan_without_binding_succeeds_empty() {
        let (tx, _rx) = event_channel();
        let mut transport = transport();
        let mut devices = DeviceBindingManager::new(InputFilter::by_id("nope"), false);

        let snapshot = devices.discover(&mut transport, &tx).unwrap();
        assert_eq!(snapshot.available.len(), 2);
        assert!(snapshot.bound.is_empty());
    }

    #[test]
    fn test_rejected_access() {
        let (tx, _rx) = event_channel();
        let mut transport = VirtualTransport::new().rejecting("No MIDI support found");
        let mut devices = DeviceBindingManager::new(InputFilter::any(), true);

        match devices.discover(&mut transport, &tx) {
            Err(DeviceBindingError::AccessRejected(reason)) => {
                assert_eq!(reason, "No MIDI support found")
            }
            other => panic!("expected rejection, got {:?}", other),
        }
    }

    #[test]
    fn test_bind_and_unbind() {
        let (tx, _rx) = event_channel();
        let mut transport = transport();
        let mut devices = DeviceBindingManager::new(InputFilter::any(), false);
        devices.discover(&mut transport, &tx).unwrap();

        assert!(devices.bind_to_input("in-1", &mut transport, &tx));
        assert!(!devices.bind_to_input("in-1", &mut transport, &tx));
        assert!(!devices.bind_to_input("missing", &mut transport, &tx));
        assert!(devices.is_bound("in-1"));

        assert!(devices.unbind_input("in-1", &mut transport));
        assert!(!devices.unbind_input("in-1", &mut transport));
        assert!(!transport.is_listening("in-1"));
        assert!(devices.is_available("in-1"));
    }

    #[test]
    fn test_hot_plug_connect_binds_matching_device() {
        let (tx, _rx) = event_channel();
        let mut transport = VirtualTransport::new();
        let mut devices = DeviceBindingManager::new(InputFilter::by_name("Keys"), true);

        let change =
            devices.handle_state_change(&DeviceInfo::input("k", "Keys"), &mut transport, &tx);
        assert_eq!(change, DeviceChange::Connected { bound: true });

        let change =
            devices.handle_state_change(&DeviceInfo::input("p", "Pads"), &mut transport, &tx);
        assert_eq!(change, DeviceChange::Connected { bound: false });
        assert!(devices.is_available("p"));

        let change =
            devices.handle_state_change(&DeviceInfo::input("k", "Keys"), &mut transport, &tx);
        assert_eq!(change, DeviceChange::Ignored);
    }

    #[test]
    fn test_hot_plug_disconnect_removes_from_both_sets() {
        let (tx, _rx) = event_channel();
        let mut transport = transport();
        let mut devices = DeviceBindingManager::new(InputFilter::any(), true);
        devices.discover(&mut transport, &tx).unwrap();

        let gone = DeviceInfo::input("in-1", "Launchkey").disconnected();
        let change = devices.handle_state_change(&gone, &mut transport, &tx);

        assert_eq!(change, DeviceChange::Disconnected { was_bound: true });
        assert!(!devices.is_bound("in-1"));
        assert!(!devices.is_available("in-1"));
        assert!(!transport.is_listening("in-1"));
        assert!(devices.is_bound("in-2"));
    }

    #[test]
    fn test_output_ports_are_ignored() {
        let (tx, _rx) = event_channel();
        let mut transport = VirtualTransport::new();
        let mut devices = DeviceBindingManager::new(InputFilter::any(), true);

        let change =
            devices.handle_state_change(&DeviceInfo::output("o", "Out"), &mut transport, &tx);
        assert_eq!(change, DeviceChange::Ignored);
        assert_eq!(devices.available().count(), 0);
    }

    #[test]
    fn test_handles_are_stable() {
        let mut devices = DeviceBindingManager::new(InputFilter::any(), false);
        let a = devices.register(&DeviceInfo::input("a", "A"));
        let b = devices.register(&DeviceInfo::input("b", "B"));
        let again = devices.register(&DeviceInfo::input("a", "A"));

        assert_ne!(a.handle, b.handle);
        assert_eq!(a, again);
    }

    #[test]
    fn test_bound_device_messages_reach_channel() {
        let (tx, rx) = event_channel();
        let mut transport = transport();
        let mut devices = DeviceBindingManager::new(InputFilter::by_id("in-1"), true);
        devices.discover(&mut transport, &tx).unwrap();

        assert!(transport.send("in-1", &[0x90, 60, 100]));
        assert!(!transport.send("in-2", &[0x90, 60, 100]));

        let received: Vec<SynthEvent> = rx.try_iter().collect();
        assert_eq!(
            received,
            vec![SynthEvent::Message {
                device_id: "in-1".into(),
                data: vec![0x90, 60, 100]
            }]
        );
    }
}
