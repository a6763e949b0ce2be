//! Messages exchanged between the initiator and the responder
//!
//! Timed payloads carry a control byte at offset 0 followed by zero padding up
//! to the configured message size. The setup message is a small JSON document
//! sent once, before any timed exchange.

use crate::error::{AppError, Result};
use crate::transport::MAX_FRAME_SIZE;
use crate::types::{Rank, Tag};
use serde::{Deserialize, Serialize};

/// Rank of the endpoint that drives the run and records samples
pub const INITIATOR_RANK: Rank = Rank(0);
/// Rank of the endpoint that receives (and optionally echoes) payloads
pub const RESPONDER_RANK: Rank = Rank(1);

/// Tag of the one-off setup message
pub const SETUP_TAG: Tag = Tag(1);
/// Tag of timed payloads and the final STOP message
pub const DATA_TAG: Tag = Tag(2);

/// Smallest payload: the control byte alone
pub const MIN_MESSAGE_SIZE: usize = 1;

/// Individual bits of the control byte
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ControlBit {
    /// Responder leaves its loop after handling this payload
    Stop = 0b0000_0001,
    /// Responder sends the payload back
    Echo = 0b0000_0010,
}

impl ControlBit {
    const ALL: u8 = ControlBit::Stop as u8 | ControlBit::Echo as u8;

    pub fn mask(self) -> u8 {
        self as u8
    }
}

/// Decoded control byte
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ControlFlags {
    pub stop: bool,
    pub echo: bool,
}

impl ControlFlags {
    pub fn new(stop: bool, echo: bool) -> Self {
        Self { stop, echo }
    }

    pub fn encode(&self) -> u8 {
        let mut byte = 0;
        if self.stop {
            byte |= ControlBit::Stop.mask();
        }
        if self.echo {
            byte |= ControlBit::Echo.mask();
        }
        byte
    }

    pub fn decode(byte: u8) -> Result<Self> {
        if byte & !ControlBit::ALL != 0 {
            return Err(AppError::protocol(format!("unknown control bits 0x{:02x}", byte)));
        }
        Ok(Self {
            stop: byte & ControlBit::Stop.mask() != 0,
            echo: byte & ControlBit::Echo.mask() != 0,
        })
    }

    /// Read the control byte at the head of a payload
    pub fn from_payload(payload: &[u8]) -> Result<Self> {
        match payload.first() {
            Some(byte) => Self::decode(*byte),
            None => Err(AppError::protocol("empty payload has no control byte")),
        }
    }
}

/// Fixed-size payload buffer reused for every timed send
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Payload {
    bytes: Vec<u8>,
}

impl Payload {
    pub fn new(size: usize, flags: ControlFlags) -> Result<Self> {
        if size < MIN_MESSAGE_SIZE {
            return Err(AppError::validation(format!(
                "Message size must be at least {} byte",
                MIN_MESSAGE_SIZE
            )));
        }
        let mut bytes = vec![0u8; size];
        bytes[0] = flags.encode();
        Ok(Self { bytes })
    }

    pub fn set_control(&mut self, flags: ControlFlags) {
        self.bytes[0] = flags.encode();
    }

    pub fn control(&self) -> Result<ControlFlags> {
        ControlFlags::from_payload(&self.bytes)
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }
}

/// Parameters the initiator announces before the first timed exchange
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SetupMessage {
    /// Payload size in bytes, control byte included
    pub message_size: usize,
    /// Planned timed iterations including skipped ones; 0 in duration mode
    pub iterations: u64,
}

impl SetupMessage {
    pub fn encode(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }

    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let setup: SetupMessage = serde_json::from_slice(bytes)
            .map_err(|e| AppError::protocol(format!("malformed setup message: {}", e)))?;
        if setup.message_size < MIN_MESSAGE_SIZE || setup.message_size > MAX_FRAME_SIZE {
            return Err(AppError::protocol(format!(
                "setup announced message size {}",
                setup.message_size
            )));
        }
        Ok(setup)
    }

    pub fn is_duration_mode(&self) -> bool {
        self.iterations == 0
    }
}
