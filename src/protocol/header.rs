//! 36-byte LIFX LAN message header
//!
//! Layout (little-endian):
//!
//! ```text
//! bytes  0-1   size of the entire message
//! bytes  2-3   frame flags: protocol (12 bits), addressable (1), tagged (1), origin (2)
//! bytes  4-7   source
//! bytes  8-15  target (6-byte serial + 2 zero bytes, all-zero for broadcast)
//! bytes 16-21  reserved
//! byte  22     address flags: res_required (bit 0), ack_required (bit 1)
//! byte  23     sequence
//! bytes 24-31  reserved
//! bytes 32-33  payload type
//! bytes 34-35  reserved
//! ```

use crate::error::{Error, Result};

pub const HEADER_SIZE: usize = 36;

/// The 12-bit protocol number carried by every LIFX LAN frame.
pub const LIFX_PROTOCOL: u16 = 1024;

/// Full 36-byte LIFX message header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Header {
    pub size: u16,
    pub frame_flags: u16,
    pub source: u32,
    pub target: [u8; 8],
    pub addr_flags: u8,
    pub sequence: u8,
    pub payload_type: u16,
}

impl Header {
    /// Returns the 12-bit protocol field from the frame flags.
    pub fn protocol(&self) -> u16 {
        self.frame_flags & 0x0FFF
    }

    /// Sets the 12-bit protocol field in the frame flags.
    pub fn set_protocol(&mut self, p: u16) {
        self.frame_flags = (self.frame_flags & 0xF000) | (p & 0x0FFF);
    }

    /// Returns true if the message carries a target address (bit 12).
    pub fn is_addressable(&self) -> bool {
        (self.frame_flags >> 12) & 0x1 == 1
    }

    pub fn set_addressable(&mut self, v: bool) {
        if v {
            self.frame_flags |= 1 << 12;
        } else {
            self.frame_flags &= !(1 << 12);
        }
    }

    /// Returns true if the tagged bit (bit 13) is set.
    /// Tagged is set on broadcast frames and clear on unicast ones.
    pub fn is_tagged(&self) -> bool {
        (self.frame_flags >> 13) & 0x1 == 1
    }

    pub fn set_tagged(&mut self, v: bool) {
        if v {
            self.frame_flags |= 1 << 13;
        } else {
            self.frame_flags &= !(1 << 13);
        }
    }

    /// Returns the 2-bit origin field (bits 14-15). Zero in practice.
    pub fn origin(&self) -> u8 {
        ((self.frame_flags >> 14) & 0x3) as u8
    }

    pub fn set_origin(&mut self, o: u8) {
        self.frame_flags = (self.frame_flags & 0x3FFF) | ((u16::from(o) & 0x3) << 14);
    }

    pub fn ack_required(&self) -> bool {
        self.addr_flags & 0x2 != 0
    }

    pub fn set_ack_required(&mut self, v: bool) {
        if v {
            self.addr_flags |= 0x2;
        } else {
            self.addr_flags &= !0x2;
        }
    }

    pub fn response_required(&self) -> bool {
        self.addr_flags & 0x1 != 0
    }

    /// Set to true to explicitly request a State response from the device.
    pub fn set_response_required(&mut self, v: bool) {
        if v {
            self.addr_flags |= 0x1;
        } else {
            self.addr_flags &= !0x1;
        }
    }

    pub fn encode(&self) -> [u8; HEADER_SIZE] {
        let mut buf = [0u8; HEADER_SIZE];
        buf[0..2].copy_from_slice(&self.size.to_le_bytes());
        buf[2..4].copy_from_slice(&self.frame_flags.to_le_bytes());
        buf[4..8].copy_from_slice(&self.source.to_le_bytes());
        buf[8..16].copy_from_slice(&self.target);
        buf[22] = self.addr_flags;
        buf[23] = self.sequence;
        buf[32..34].copy_from_slice(&self.payload_type.to_le_bytes());
        buf
    }

    pub fn decode(data: &[u8]) -> Result<Header> {
        if data.len() < HEADER_SIZE {
            return Err(Error::Codec(format!(
                "header too short: got {} bytes, want {}",
                data.len(),
                HEADER_SIZE
            )));
        }
        let mut target = [0u8; 8];
        target.copy_from_slice(&data[8..16]);
        Ok(Header {
            size: u16::from_le_bytes([data[0], data[1]]),
            frame_flags: u16::from_le_bytes([data[2], data[3]]),
            source: u32::from_le_bytes([data[4], data[5], data[6], data[7]]),
            target,
            addr_flags: data[22],
            sequence: data[23],
            payload_type: u16::from_le_bytes([data[32], data[33]]),
        })
    }
}
