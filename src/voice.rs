//! Monophonic Voice Priority
//!
//! [`VoiceController`] keeps every held frequency in an ordered registry
//! (most recent last) and decides which one is audible: the most recently
//! triggered voice that is still held wins ("last-note priority").
//!
//! The controller does not touch the rendering engine. Each call returns the
//! [`Ramp`]s the caller must apply to the audible-frequency and envelope-gain
//! controls, and mirrors the latest targets into [`ControlTargets`].

use crate::control::ControlTargets;
use crate::midi::frequency_from_note_number;
use crate::registry::Registry;
use serde::{Deserialize, Serialize};

/// Default attack, release and portamento time in seconds
pub const DEFAULT_TIMING: f64 = 0.1;

/// Audible frequency before the first note
pub const DEFAULT_FREQUENCY: f64 = 110.0;

/// Registry key for a frequency value
///
/// Frequencies are compared by their exact bit pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FrequencyKey(u64);

impl FrequencyKey {
    pub fn new(frequency: f64) -> Self {
        // +0.0 and -0.0 share a key
        Self((frequency + 0.0).to_bits())
    }

    pub fn frequency(&self) -> f64 {
        f64::from_bits(self.0)
    }
}

/// A held frequency and its envelope timing
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ActiveVoice {
    pub frequency: f64,
    pub attack: f64,
    pub release: f64,
    pub portamento: f64,
}

/// Per-note timing overrides
///
/// `None`, negative and non-finite values fall back to the controller
/// defaults.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct VoiceParams {
    pub attack: Option<f64>,
    pub release: Option<f64>,
    pub portamento: Option<f64>,
}

impl VoiceParams {
    pub fn with_attack(mut self, attack: f64) -> Self {
        self.attack = Some(attack);
        self
    }

    pub fn with_release(mut self, release: f64) -> Self {
        self.release = Some(release);
        self
    }

    pub fn with_portamento(mut self, portamento: f64) -> Self {
        self.portamento = Some(portamento);
        self
    }
}

/// Default envelope timing
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VoiceTiming {
    pub attack: f64,
    pub release: f64,
    pub portamento: f64,
}

impl Default for VoiceTiming {
    fn default() -> Self {
        Self {
            attack: DEFAULT_TIMING,
            release: DEFAULT_TIMING,
            portamento: DEFAULT_TIMING,
        }
    }
}

/// Which shared control a ramp drives
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlKind {
    /// Audible oscillator frequency
    Frequency,
    /// Envelope (summing) gain
    Gain,
}

/// "Cancel pending ramps, then glide toward `value`" on one control
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ramp {
    pub control: ControlKind,
    pub value: f64,
    pub time_constant: f64,
}

/// Last-note-priority monophonic voice state
#[derive(Debug, Clone)]
pub struct VoiceController {
    voices: Registry<FrequencyKey, ActiveVoice>,
    timing: VoiceTiming,
    gain_ceiling: f64,
    targets: ControlTargets,
}

impl VoiceController {
    pub fn new(timing: VoiceTiming) -> Self {
        Self::with_targets(timing, ControlTargets::new(DEFAULT_FREQUENCY, 0.0))
    }

    /// Create a controller publishing into existing targets
    pub fn with_targets(timing: VoiceTiming, targets: ControlTargets) -> Self {
        Self {
            voices: Registry::new(),
            timing,
            gain_ceiling: 1.0,
            targets,
        }
    }

    pub fn timing(&self) -> VoiceTiming {
        self.timing
    }

    pub fn set_timing(&mut self, timing: VoiceTiming) {
        self.timing = timing;
    }

    /// Gain the envelope ramps toward while any voice is held
    pub fn gain_ceiling(&self) -> f64 {
        self.gain_ceiling
    }

    /// Change the gain ceiling, re-targeting the envelope if a voice is held
    pub fn set_gain_ceiling(&mut self, gain: f64) -> Option<Ramp> {
        self.gain_ceiling = gain;
        let attack = self.voices.last().ok()?.attack;
        Some(self.ramp(ControlKind::Gain, gain, attack))
    }

    pub fn targets(&self) -> &ControlTargets {
        &self.targets
    }

    pub fn is_active(&self, frequency: f64) -> bool {
        self.voices.has(&FrequencyKey::new(frequency))
    }

    pub fn active_count(&self) -> usize {
        self.voices.len()
    }

    /// Held voices, oldest first
    pub fn active_voices(&self) -> impl Iterator<Item = &ActiveVoice> {
        self.voices.values()
    }

    /// The voice currently controlling pitch
    pub fn current(&self) -> Option<&ActiveVoice> {
        self.voices.last().ok()
    }

    /// Start sounding `frequency`
    ///
    /// A frequency that is already held is left alone, so a repeated
    /// note-on does not restart its envelope.
    pub fn frequency_on(&mut self, frequency: f64, params: VoiceParams) -> Vec<Ramp> {
        if !frequency.is_finite() || frequency <= 0.0 {
            log::warn!("ignoring note-on for invalid frequency {}", frequency);
            return Vec::new();
        }

        let key = FrequencyKey::new(frequency);
        if self.voices.has(&key) {
            return Vec::new();
        }

        let voice = ActiveVoice {
            frequency,
            attack: timing_or_default("attack", params.attack, self.timing.attack),
            release: timing_or_default("release", params.release, self.timing.release),
            portamento: timing_or_default(
                "portamento",
                params.portamento,
                self.timing.portamento,
            ),
        };
        self.voices.push(key, voice);
        log::debug!("on {:?}", voice);

        vec![
            self.ramp(ControlKind::Frequency, frequency, voice.portamento),
            self.ramp(ControlKind::Gain, self.gain_ceiling, voice.attack),
        ]
    }

    /// Stop sounding `frequency`
    ///
    /// Releases the envelope when nothing is left held; otherwise glides to
    /// the most recently added remaining voice.
    pub fn frequency_off(&mut self, frequency: f64) -> Vec<Ramp> {
        let Some(removed) = self.voices.remove(&FrequencyKey::new(frequency)) else {
            return Vec::new();
        };
        log::debug!("off {:?}", removed);

        match self.voices.last() {
            Ok(&next) => vec![self.ramp(ControlKind::Frequency, next.frequency, next.portamento)],
            Err(_) => vec![self.ramp(ControlKind::Gain, 0.0, removed.release)],
        }
    }

    /// Note-on when `frequency` is silent, note-off when it is held
    pub fn toggle_frequency(&mut self, frequency: f64, params: VoiceParams) -> Vec<Ramp> {
        if self.is_active(frequency) {
            self.frequency_off(frequency)
        } else {
            self.frequency_on(frequency, params)
        }
    }

    pub fn note_on(&mut self, note: u8, params: VoiceParams) -> Vec<Ramp> {
        self.frequency_on(frequency_from_note_number(note), params)
    }

    pub fn note_off(&mut self, note: u8) -> Vec<Ramp> {
        self.frequency_off(frequency_from_note_number(note))
    }

    pub fn toggle_note(&mut self, note: u8, params: VoiceParams) -> Vec<Ramp> {
        self.toggle_frequency(frequency_from_note_number(note), params)
    }

    /// Release every held voice with the default release time
    pub fn all_notes_off(&mut self) -> Vec<Ramp> {
        if self.voices.is_empty() {
            return Vec::new();
        }
        self.voices.clear();
        vec![self.ramp(ControlKind::Gain, 0.0, self.timing.release)]
    }

    fn ramp(&self, control: ControlKind, value: f64, time_constant: f64) -> Ramp {
        let target = match control {
            ControlKind::Frequency => &self.targets.frequency,
            ControlKind::Gain => &self.targets.gain,
        };
        target.retarget(value, time_constant);

        Ramp {
            control,
            value,
            time_constant,
        }
    }
}

/// A per-note timing override, or `default` when absent or unusable
fn timing_or_default(name: &str, value: Option<f64>, default: f64) -> f64 {
    match value {
        Some(seconds) if seconds.is_finite() && seconds >= 0.0 => seconds,
        Some(seconds) => {
            log::warn!("ignoring invalid {} time {}, using {}", name, seconds, default);
            default
        }
        None => default,
    }
}

impl Default for VoiceController {
    fn default() -> Self {
        Self::new(VoiceTiming::default())
    }
}
