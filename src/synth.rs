//! Monophonic Synth Controller
//!
//! [`Synth`] owns the engine graph, the voice controller and the device
//! bindings. Transports push events into its channel; [`Synth::process_events`]
//! drains them in order and turns note messages into parameter ramps on the
//! oscillators and the envelope.
//!
//! ```text
//! transport ──events──▶ Synth ──ramps──▶ oscillator.frequency (every pipeline)
//!                                   └──▶ envelope.gain ──▶ destination
//! ```

use crate::config::SynthOptions;
use crate::control::ControlTargets;
use crate::device::{DeviceBindingManager, DeviceChange, DeviceSnapshot, Transport};
use crate::engine::{Engine, ParamName};
use crate::error::Result;
use crate::event::{event_channel, EventReceiver, EventSender, SynthEvent};
use crate::midi::NoteMessage;
use crate::pipeline::{GraphConfig, PipelineAssembler};
use crate::voice::{ControlKind, Ramp, VoiceController, VoiceParams};

/// Last-note-priority monophonic synth
pub struct Synth<E: Engine, T: Transport> {
    options: SynthOptions,
    assembler: PipelineAssembler<E>,
    voices: VoiceController,
    devices: DeviceBindingManager,
    transport: T,
    events: EventSender,
    inbox: EventReceiver,
}

impl<E: Engine, T: Transport> Synth<E, T> {
    /// Build the graph described by `options` on `engine`
    ///
    /// Inputs are not touched until [`Synth::connect_inputs`].
    pub fn new(engine: E, transport: T, options: SynthOptions) -> Result<Self> {
        options.validate()?;

        let mut assembler = PipelineAssembler::new(engine)?;
        assembler.apply_config(&options.graph)?;

        let targets = ControlTargets::new(options.initial_frequency, 0.0);
        let mut voices = VoiceController::with_targets(options.timing(), targets);
        voices.set_gain_ceiling(assembler.gain());

        let devices = DeviceBindingManager::new(options.input_filter(), options.bind_to_inputs);
        let (events, inbox) = event_channel();

        let mut synth = Self {
            options,
            assembler,
            voices,
            devices,
            transport,
            events,
            inbox,
        };
        synth.sync_oscillators();
        Ok(synth)
    }

    /// Discover inputs and bind the matching ones
    ///
    /// A failure here leaves the synth fully usable; notes can still be
    /// played programmatically and hot-plugged inputs still bind.
    pub fn connect_inputs(&mut self) -> Result<DeviceSnapshot> {
        match self.devices.discover(&mut self.transport, &self.events) {
            Ok(snapshot) => Ok(snapshot),
            Err(err) => {
                log::warn!("input binding failed: {}", err);
                Err(err.into())
            }
        }
    }

    /// Sender transports and other threads can push events through
    pub fn event_sender(&self) -> EventSender {
        self.events.clone()
    }

    /// Handle every queued event in arrival order, returning how many ran
    pub fn process_events(&mut self) -> usize {
        let mut handled = 0;
        while let Ok(event) = self.inbox.try_recv() {
            self.handle_event(event);
            handled += 1;
        }
        handled
    }

    /// Handle one event as if it had been queued
    pub fn handle_event(&mut self, event: SynthEvent) {
        match event {
            SynthEvent::DeviceStateChanged(info) => {
                let change =
                    self.devices
                        .handle_state_change(&info, &mut self.transport, &self.events);
                if change == (DeviceChange::Disconnected { was_bound: true })
                    && self.devices.bound().next().is_none()
                {
                    log::warn!("last bound input disconnected");
                }
            }
            SynthEvent::Message { device_id, data } => self.handle_message(&device_id, &data),
        }
    }

    /// Decode a raw message from `device_id`
    ///
    /// Messages from unbound devices and anything that is not a note message
    /// are ignored.
    pub fn handle_message(&mut self, device_id: &str, data: &[u8]) {
        log::trace!("{}: {:02x?}", device_id, data);
        if !self.devices.is_bound(device_id) {
            log::warn!("ignoring message from unbound input {}", device_id);
            return;
        }

        match NoteMessage::parse(data) {
            Some(NoteMessage::On { note, .. }) => {
                self.note_on(note, VoiceParams::default());
            }
            Some(NoteMessage::Off { note, .. }) => {
                self.note_off(note);
            }
            None => {}
        }
    }

    /// Start sounding `frequency`; a held frequency is left alone
    pub fn frequency_on(&mut self, frequency: f64, params: VoiceParams) {
        let ramps = self.voices.frequency_on(frequency, params);
        self.apply_ramps(&ramps);
    }

    /// Stop sounding `frequency`
    pub fn frequency_off(&mut self, frequency: f64) {
        let ramps = self.voices.frequency_off(frequency);
        self.apply_ramps(&ramps);
    }

    pub fn toggle_frequency(&mut self, frequency: f64, params: VoiceParams) {
        let ramps = self.voices.toggle_frequency(frequency, params);
        self.apply_ramps(&ramps);
    }

    /// Start sounding an equal-tempered note number
    pub fn note_on(&mut self, note: u8, params: VoiceParams) {
        let ramps = self.voices.note_on(note, params);
        self.apply_ramps(&ramps);
    }

    pub fn note_off(&mut self, note: u8) {
        let ramps = self.voices.note_off(note);
        self.apply_ramps(&ramps);
    }

    pub fn toggle_note(&mut self, note: u8, params: VoiceParams) {
        let ramps = self.voices.toggle_note(note, params);
        self.apply_ramps(&ramps);
    }

    /// Release every held voice
    pub fn all_notes_off(&mut self) {
        let ramps = self.voices.all_notes_off();
        self.apply_ramps(&ramps);
    }

    /// Rebuild the pipelines from `config`
    ///
    /// Held voices keep sounding: new oscillators start at the current pitch
    /// and the envelope is re-targeted to the new gain ceiling.
    pub fn apply_config(&mut self, config: &GraphConfig) -> Result<()> {
        self.assembler.apply_config(config)?;
        self.sync_oscillators();
        if let Some(ramp) = self.voices.set_gain_ceiling(self.assembler.gain()) {
            self.apply_ramps(&[ramp]);
        }
        Ok(())
    }

    /// Describe the live graph
    pub fn export_config(&self) -> GraphConfig {
        self.assembler.export_config()
    }

    /// Current options, with the graph read back from the engine
    pub fn settings(&self) -> SynthOptions {
        let timing = self.voices.timing();
        SynthOptions {
            attack: timing.attack,
            release: timing.release,
            portamento: timing.portamento,
            graph: self.export_config(),
            ..self.options.clone()
        }
    }

    /// Listen to an available input; false if unknown or already bound
    pub fn bind_input(&mut self, id: &str) -> bool {
        self.devices.bind_to_input(id, &mut self.transport, &self.events)
    }

    /// Stop listening to an input; false if it was not bound
    pub fn unbind_input(&mut self, id: &str) -> bool {
        self.devices.unbind_input(id, &mut self.transport)
    }

    pub fn devices(&self) -> &DeviceBindingManager {
        &self.devices
    }

    pub fn voices(&self) -> &VoiceController {
        &self.voices
    }

    /// Shared frequency/gain targets for a rendering thread
    pub fn controls(&self) -> ControlTargets {
        self.voices.targets().clone()
    }

    pub fn engine(&self) -> &E {
        self.assembler.engine()
    }

    pub fn engine_mut(&mut self) -> &mut E {
        self.assembler.engine_mut()
    }

    pub fn assembler(&self) -> &PipelineAssembler<E> {
        &self.assembler
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    fn sync_oscillators(&mut self) {
        let frequency = self.voices.targets().frequency.value();
        for node in self.assembler.oscillators() {
            if let Some(param) = self.assembler.engine_mut().param_mut(node, ParamName::Frequency) {
                param.set_value(frequency);
            }
        }
    }

    fn apply_ramps(&mut self, ramps: &[Ramp]) {
        let now = self.assembler.engine().current_time();
        for ramp in ramps {
            let nodes = match ramp.control {
                ControlKind::Frequency => self.assembler.oscillators(),
                ControlKind::Gain => vec![self.assembler.envelope()],
            };
            let name = match ramp.control {
                ControlKind::Frequency => ParamName::Frequency,
                ControlKind::Gain => ParamName::Gain,
            };

            for node in nodes {
                if let Some(param) = self.assembler.engine_mut().param_mut(node, name) {
                    param.cancel_scheduled_values(now);
                    param.set_target_at_time(ramp.value, now, ramp.time_constant);
                }
            }
        }
    }
}
