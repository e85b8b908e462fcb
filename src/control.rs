//! Shared Control Targets
//!
//! The audible frequency and envelope gain targets, published for a
//! rendering thread. Only the voice controller writes them.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Atomic f64 for lock-free communication between threads
///
/// Uses AtomicU64 internally since there's no native AtomicF64.
#[derive(Debug)]
pub struct AtomicF64(AtomicU64);

impl AtomicF64 {
    pub fn new(value: f64) -> Self {
        Self(AtomicU64::new(value.to_bits()))
    }

    pub fn get(&self) -> f64 {
        f64::from_bits(self.0.load(Ordering::Relaxed))
    }

    pub fn set(&self, value: f64) {
        self.0.store(value.to_bits(), Ordering::Relaxed);
    }
}

impl Default for AtomicF64 {
    fn default() -> Self {
        Self::new(0.0)
    }
}

/// A published target value and the glide time used to reach it
#[derive(Debug, Default)]
pub struct ControlTarget {
    value: AtomicF64,
    time_constant: AtomicF64,
}

impl ControlTarget {
    pub fn new(value: f64) -> Self {
        Self {
            value: AtomicF64::new(value),
            time_constant: AtomicF64::new(0.0),
        }
    }

    pub fn value(&self) -> f64 {
        self.value.get()
    }

    pub fn time_constant(&self) -> f64 {
        self.time_constant.get()
    }

    pub(crate) fn retarget(&self, value: f64, time_constant: f64) {
        self.time_constant.set(time_constant);
        self.value.set(value);
    }
}

/// Frequency and gain targets shared with the rendering side
///
/// Cloning shares the same underlying values.
#[derive(Debug, Clone)]
pub struct ControlTargets {
    pub frequency: Arc<ControlTarget>,
    pub gain: Arc<ControlTarget>,
}

impl ControlTargets {
    pub fn new(frequency: f64, gain: f64) -> Self {
        Self {
            frequency: Arc::new(ControlTarget::new(frequency)),
            gain: Arc::new(ControlTarget::new(gain)),
        }
    }
}
