//! Raw MIDI Message Decoding
//!
//! Only note-on / note-off are recognised; every other status byte passes
//! through as `None`.

use libm::Libm;

/// MIDI note number of the tuning reference (A4)
pub const REFERENCE_NOTE: u8 = 69;

/// Frequency of the tuning reference in Hz
pub const REFERENCE_FREQUENCY: f64 = 440.0;

/// A decoded note message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoteMessage {
    On { channel: u8, note: u8, velocity: u8 },
    Off { channel: u8, note: u8 },
}

impl NoteMessage {
    /// Decode a raw message buffer
    ///
    /// Note-on with velocity 0 is reported as note-off.
    pub fn parse(msg: &[u8]) -> Option<Self> {
        if msg.len() < 3 {
            return None;
        }

        let status = msg[0] & 0xF0;
        let channel = msg[0] & 0x0F;
        let note = msg[1] & 0x7F;

        match status {
            0x90 if msg[2] != 0 => Some(NoteMessage::On {
                channel,
                note,
                velocity: msg[2] & 0x7F,
            }),
            0x90 | 0x80 => Some(NoteMessage::Off { channel, note }),
            _ => None,
        }
    }

    pub fn note(&self) -> u8 {
        match self {
            NoteMessage::On { note, .. } | NoteMessage::Off { note, .. } => *note,
        }
    }

    pub fn frequency(&self) -> f64 {
        frequency_from_note_number(self.note())
    }
}

/// Equal-tempered frequency for a MIDI note number (note 69 = 440 Hz)
#[inline]
pub fn frequency_from_note_number(note: u8) -> f64 {
    REFERENCE_FREQUENCY
        * Libm::<f64>::pow(2.0, (note as f64 - REFERENCE_NOTE as f64) / 12.0)
}
