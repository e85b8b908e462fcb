//! Automated Scalar Parameters
//!
//! [`AudioParam`] holds an intrinsic value plus a timeline of automation
//! events. It supports the two operations the controller relies on:
//! cancelling pending ramps and gliding toward a target.

use libm::Libm;

/// A scheduled change on a parameter timeline
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AutomationEvent {
    /// Jump to `value` at `time`
    SetValue { time: f64, value: f64 },

    /// Approach `target` exponentially from `start`, with time constant
    /// `time_constant` seconds
    SetTarget {
        start: f64,
        target: f64,
        time_constant: f64,
    },
}

impl AutomationEvent {
    pub fn time(&self) -> f64 {
        match self {
            AutomationEvent::SetValue { time, .. } => *time,
            AutomationEvent::SetTarget { start, .. } => *start,
        }
    }
}

/// Scalar parameter with an automation timeline
#[derive(Debug, Clone, PartialEq)]
pub struct AudioParam {
    default: f64,
    value: f64,
    events: Vec<AutomationEvent>,
}

impl AudioParam {
    pub fn new(default: f64) -> Self {
        Self {
            default,
            value: default,
            events: Vec::new(),
        }
    }

    pub fn default_value(&self) -> f64 {
        self.default
    }

    /// Intrinsic value, ignoring automation
    pub fn value(&self) -> f64 {
        self.value
    }

    /// Set the intrinsic value
    pub fn set_value(&mut self, value: f64) {
        self.value = value;
    }

    /// Scheduled automation events, in time order
    pub fn events(&self) -> &[AutomationEvent] {
        &self.events
    }

    pub fn set_value_at_time(&mut self, value: f64, time: f64) {
        self.insert(AutomationEvent::SetValue { time, value });
    }

    /// Glide toward `target`, starting at `start`
    pub fn set_target_at_time(&mut self, target: f64, start: f64, time_constant: f64) {
        self.insert(AutomationEvent::SetTarget {
            start,
            target,
            time_constant,
        });
    }

    /// Drop every event scheduled at or after `time`
    pub fn cancel_scheduled_values(&mut self, time: f64) {
        self.events.retain(|event| event.time() < time);
    }

    /// Computed value at `time`
    pub fn value_at(&self, time: f64) -> f64 {
        Self::evaluate(self.value, &self.events, time)
    }

    fn evaluate(intrinsic: f64, events: &[AutomationEvent], time: f64) -> f64 {
        let mut current = intrinsic;
        let mut active: Option<(f64, f64, f64)> = None;

        for event in events {
            if event.time() > time {
                break;
            }
            current = Self::approach(active, current, event.time());
            match *event {
                AutomationEvent::SetValue { value, .. } => {
                    current = value;
                    active = None;
                }
                AutomationEvent::SetTarget {
                    start,
                    target,
                    time_constant,
                } => active = Some((start, target, time_constant)),
            }
        }

        Self::approach(active, current, time)
    }

    fn approach(active: Option<(f64, f64, f64)>, from: f64, time: f64) -> f64 {
        match active {
            Some((_, target, tc)) if tc <= 0.0 => target,
            Some((start, target, tc)) => {
                target + (from - target) * Libm::<f64>::exp(-(time - start) / tc)
            }
            None => from,
        }
    }

    /// Fold every event before the last one preceding `time` into a single
    /// `SetValue`, so the timeline holds at most two past events
    fn compact_before(&mut self, time: f64) {
        let past = self.events.iter().take_while(|e| e.time() < time).count();
        if past < 2 {
            return;
        }

        let last = past - 1;
        let replacement = match self.events[last] {
            AutomationEvent::SetValue { .. } => None,
            AutomationEvent::SetTarget { start, .. } => Some(AutomationEvent::SetValue {
                time: start,
                value: Self::evaluate(self.value, &self.events[..last], start),
            }),
        };
        self.events.splice(..last, replacement);
    }

    fn insert(&mut self, event: AutomationEvent) {
        self.compact_before(event.time());
        let at = self
            .events
            .iter()
            .position(|e| e.time() > event.time())
            .unwrap_or(self.events.len());
        self.events.insert(at, event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_intrinsic_value() {
        let mut p = AudioParam::new(0.5);
        assert_eq!(p.value_at(10.0), 0.5);
        p.set_value(0.25);
        assert_eq!(p.value(), 0.25);
        assert_eq!(p.default_value(), 0.5);
    }

    #[test]
    fn test_set_target_approaches_exponentially() {
        let mut p = AudioParam::new(0.0);
        p.set_target_at_time(1.0, 0.0, 0.1);

        assert_relative_eq!(p.value_at(0.0), 0.0);
        assert_relative_eq!(p.value_at(0.1), 1.0 - (-1.0f64).exp(), epsilon = 1e-12);
        assert!(p.value_at(1.0) > 0.9999);
    }

    #[test]
    fn test_retarget_continues_from_current_value() {
        let mut p = AudioParam::new(0.0);
        p.set_target_at_time(1.0, 0.0, 0.1);
        let halfway = p.value_at(0.05);

        p.cancel_scheduled_values(0.05);
        p.set_target_at_time(0.0, 0.05, 0.1);

        assert_relative_eq!(p.value_at(0.05), halfway, epsilon = 1e-12);
        assert!(p.value_at(0.2) < halfway);
        assert_eq!(p.events().len(), 2);
    }

    #[test]
    fn test_cancel_drops_future_events() {
        let mut p = AudioParam::new(0.0);
        p.set_value_at_time(1.0, 1.0);
        p.set_value_at_time(2.0, 2.0);
        p.cancel_scheduled_values(1.5);

        assert_eq!(p.events().len(), 1);
        assert_eq!(p.value_at(3.0), 1.0);
    }

    #[test]
    fn test_retargeting_keeps_timeline_bounded() {
        let mut p = AudioParam::new(0.0);
        let mut reference = Vec::new();

        for i in 0..1000 {
            let now = i as f64 * 0.01;
            let target = if i % 2 == 0 { 1.0 } else { 0.0 };
            let before = p.value_at(now);

            p.cancel_scheduled_values(now);
            p.set_target_at_time(target, now, 0.1);

            assert!(p.events().len() <= 3);
            assert_relative_eq!(p.value_at(now), before, epsilon = 1e-12);
            reference.push(before);
        }

        // Still continuous with the last retarget
        assert_relative_eq!(p.value_at(9.99), reference[999], epsilon = 1e-12);
        assert!(p.value_at(20.0) < 1e-9);
    }

    #[test]
    fn test_compaction_preserves_future_values() {
        let mut p = AudioParam::new(0.0);
        p.set_value_at_time(0.5, 1.0);
        p.set_target_at_time(1.0, 2.0, 0.5);
        let expected = p.value_at(2.7);

        p.set_value_at_time(0.0, 3.0);
        assert_eq!(p.events().len(), 3);
        assert_relative_eq!(p.value_at(2.7), expected, epsilon = 1e-12);
        assert_eq!(p.value_at(3.5), 0.0);
    }

    #[test]
    fn test_zero_time_constant_jumps() {
        let mut p = AudioParam::new(110.0);
        p.set_target_at_time(440.0, 0.0, 0.0);
        assert_eq!(p.value_at(0.0), 440.0);
    }

    #[test]
    fn test_events_are_time_ordered() {
        let mut p = AudioParam::new(0.0);
        p.set_value_at_time(3.0, 3.0);
        p.set_value_at_time(1.0, 1.0);
        let times: Vec<f64> = p.events().iter().map(AutomationEvent::time).collect();
        assert_eq!(times, vec![1.0, 3.0]);
        assert_eq!(p.value_at(2.0), 1.0);
    }
}
