//! LIFX LAN wire protocol: header, typed payloads and framed messages.

mod header;
pub mod packets;

pub use header::{Header, HEADER_SIZE, LIFX_PROTOCOL};
pub use packets::Payload;

use crate::error::{Error, Result};
use std::fmt;

/// The all-zero target that marks a frame as a broadcast.
pub const TARGET_BROADCAST: [u8; 8] = [0; 8];

/// A LIFX LAN protocol message: a 36-byte header followed by a typed payload.
#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    header: Header,
    pub payload: Payload,
}

impl Message {
    /// Returns a new Message with the given payload.
    pub fn new(payload: Payload) -> Self {
        let mut header = Header {
            size: (HEADER_SIZE + payload.size()) as u16,
            payload_type: payload.payload_type(),
            ..Default::default()
        };
        header.set_protocol(LIFX_PROTOCOL);
        header.set_addressable(true);
        header.set_origin(0);

        Message { header, payload }
    }

    /// The payload type tag set in the header.
    pub fn payload_type(&self) -> u16 {
        self.header.payload_type
    }

    pub fn source(&self) -> u32 {
        self.header.source
    }

    /// Sets the source of the message, which devices echo back in responses.
    pub fn set_source(&mut self, source: u32) {
        self.header.source = source;
    }

    pub fn sequence(&self) -> u8 {
        self.header.sequence
    }

    /// Sets the sequence of a message, used to track message order.
    pub fn set_sequence(&mut self, seq: u8) {
        self.header.sequence = seq;
    }

    pub fn target(&self) -> [u8; 8] {
        self.header.target
    }

    /// Sets the target device of a message.
    /// The all-zero target marks the frame as a tagged broadcast.
    pub fn set_target(&mut self, target: [u8; 8]) {
        self.header.target = target;
        self.header.set_tagged(target == TARGET_BROADCAST);
    }

    pub fn set_ack_required(&mut self, v: bool) {
        self.header.set_ack_required(v);
    }

    pub fn set_response_required(&mut self, v: bool) {
        self.header.set_response_required(v);
    }

    /// Encodes the message into its binary wire format.
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(HEADER_SIZE + self.payload.size());
        let mut header = self.header;
        header.payload_type = self.payload.payload_type();
        header.size = (HEADER_SIZE + self.payload.size()) as u16;
        buf.extend_from_slice(&header.encode());
        self.payload.encode(&mut buf);
        buf
    }

    /// Decodes a message from its binary wire format.
    pub fn decode(data: &[u8]) -> Result<Message> {
        if data.len() < HEADER_SIZE {
            return Err(Error::Codec(format!(
                "frame too short: got {} bytes, want at least {}",
                data.len(),
                HEADER_SIZE
            )));
        }
        let header = Header::decode(data)?;
        let payload = Payload::decode(header.payload_type, &data[HEADER_SIZE..])?;
        Ok(Message { header, payload })
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Message{{type: {}, size: {}, seq: {}}}",
            self.header.payload_type, self.header.size, self.header.sequence
        )
    }
}
