//! The typed payload record produced by the client response parser (and consumed by the
//! multi-register client builders).
//!
//! This mirrors the source's `Modbus_Data` container, which is reused across every response
//! shape by tagging it with a `type` and a `length` whose *unit* depends on that tag. That
//! mixed unit is preserved here rather than normalized away — see the note on [`DataType`].

use bitvec::prelude::*;
use byteorder::{BigEndian, ByteOrder};

/// Capacity of [`TypedPayload`]'s backing store, in bytes.
///
/// Sized for the largest response this crate parses: a Read Coils reply for the maximum
/// allowed quantity (2000 bits = 250 bytes). The source's `Modbus_Data` instead sized this
/// array in 125 register-sized slots, which silently truncates a maximal FC 01/02 response;
/// this is corrected here rather than reproduced (see DESIGN.md).
pub const PAYLOAD_CAPACITY: usize = 250;

/// Which of the four payload shapes a [`TypedPayload`] currently holds.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DataType {
    #[default]
    Bit,
    Byte,
    Word,
    Long,
}

/// A caller-owned, codec-mutated-in-place record of parsed response data.
///
/// `length` counts *logical items*, not bytes, for every type except [`DataType::Bit`], where
/// it counts bytes (the source's own convention: FC 01/02 set `length` to the response byte
/// count, FC 03/04/23 set it to the register count). This is a sharp edge, not a bug: callers
/// reading bit-typed payloads must unpack `length` bytes of LSB-first bits themselves.
#[derive(Debug, Clone, Copy)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TypedPayload {
    pub r#type: DataType,
    pub length: usize,
    data: [u8; PAYLOAD_CAPACITY],
}

impl Default for TypedPayload {
    fn default() -> Self {
        TypedPayload {
            r#type: DataType::default(),
            length: 0,
            data: [0u8; PAYLOAD_CAPACITY],
        }
    }
}

impl TypedPayload {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resets to an empty payload, as the client response parser does on every call before
    /// attempting to fill it.
    pub fn clear(&mut self) {
        self.length = 0;
    }

    /// Raw bytes backing a [`DataType::Bit`] or [`DataType::Byte`] payload.
    pub fn as_bytes(&self) -> &[u8] {
        match self.r#type {
            DataType::Bit | DataType::Byte => &self.data[..self.length],
            DataType::Word => &self.data[..self.length * 2],
            DataType::Long => &self.data[..self.length * 4],
        }
    }

    /// Fills the payload with raw bytes, tagging it [`DataType::Bit`] and setting `length` to
    /// the byte count (FC 01 / FC 02 response convention).
    pub fn set_bits(&mut self, bytes: &[u8]) {
        self.r#type = DataType::Bit;
        self.length = bytes.len();
        self.data[..bytes.len()].copy_from_slice(bytes);
    }

    /// Fills the payload with a single byte (FC 07 response convention).
    pub fn set_byte(&mut self, value: u8) {
        self.r#type = DataType::Byte;
        self.length = 1;
        self.data[0] = value;
    }

    /// Fills the payload from an iterator of big-endian registers, tagging it
    /// [`DataType::Word`] and setting `length` to the register count.
    pub fn set_words<I: IntoIterator<Item = u16>>(&mut self, words: I) {
        self.r#type = DataType::Word;
        let mut count = 0;
        for (i, word) in words.into_iter().enumerate() {
            BigEndian::write_u16(&mut self.data[i * 2..], word);
            count = i + 1;
        }
        self.length = count;
    }

    /// Iterates the register values of a [`DataType::Word`] payload, big-endian decoded.
    pub fn words(&self) -> impl Iterator<Item = u16> + '_ {
        self.data[..self.length * 2]
            .chunks_exact(2)
            .map(BigEndian::read_u16)
    }

    /// Iterates the bits of a [`DataType::Bit`] payload, LSB-first within each byte, in wire
    /// order. Trailing pad bits beyond the requested quantity are included; callers that asked
    /// for e.g. 10 coils must truncate to the first 10 themselves.
    pub fn bits(&self) -> impl Iterator<Item = bool> + '_ {
        self.data[..self.length].view_bits::<Lsb0>().iter().by_vals()
    }
}
