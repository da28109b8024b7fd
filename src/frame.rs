//! `Frame` views a byte buffer as a modbus RTU data frame:
//! `|address(1)|function(1)|payload(0..252)|crc16(2)|`
//!
//! Unlike a transport-facing codec, this crate never owns a socket or a serial port, so a
//! `Frame` owns a fixed-capacity buffer rather than borrowing one: the server dispatcher needs
//! to turn a received frame into a response in place, and an owned buffer lets it do that
//! without juggling two borrows of the same backing array.

use byteorder::{BigEndian, ByteOrder};

use crate::builder::{self, AddData, Builder};
use crate::crc;
use crate::{Error, Exception, Function};

/// Largest frame RTU allows: 1 address + 1 function + 252 payload + 2 CRC.
pub const MAX_FRAME_LEN: usize = 256;
/// Smallest frame that could possibly be valid: address + function + CRC, no payload.
pub const MIN_FRAME_LEN: usize = 4;

/// A fixed-capacity owned modbus frame.
#[derive(Debug, Clone, Copy)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Frame {
    data: [u8; MAX_FRAME_LEN],
    len: usize,
}

impl Frame {
    /// Builds a frame directly from its constituent bytes without validation.
    ///
    /// # UNCHECKED
    /// `bytes.len()` is expected to be in `[MIN_FRAME_LEN, MAX_FRAME_LEN]`; callers that build
    /// frames through [`crate::builder`] never need this directly.
    pub fn new_unchecked(bytes: &[u8]) -> Self {
        let mut data = [0u8; MAX_FRAME_LEN];
        data[..bytes.len()].copy_from_slice(bytes);
        Frame {
            data,
            len: bytes.len(),
        }
    }

    /// The address byte of the frame.
    pub fn address(&self) -> u8 {
        self.data[0]
    }

    /// The function code of the frame, exception bit included if present.
    pub fn function(&self) -> Function {
        Function(self.data[1])
    }

    /// All bytes between the function code and the CRC.
    pub fn payload(&self) -> &[u8] {
        &self.data[2..self.len - 2]
    }

    /// The CRC actually carried by the frame, assembled per [`crc::compute`]'s convention.
    pub fn crc(&self) -> u16 {
        BigEndian::read_u16(self.crc_bytes())
    }

    /// The two CRC bytes, in wire order.
    pub fn crc_bytes(&self) -> &[u8] {
        &self.data[self.len - 2..self.len]
    }

    /// The CRC recomputed from the address/function/payload bytes actually present.
    pub fn calculate_crc(&self) -> u16 {
        crc::compute(&self.data[..self.len - 2])
    }

    /// All bytes in the frame: address, function, payload, CRC.
    pub fn raw_bytes(&self) -> &[u8] {
        &self.data[..self.len]
    }

    /// Starts building a response to this frame, addressed back to the requester.
    pub fn response_builder(self, response_buffer: &mut [u8]) -> Builder<'_, AddData> {
        builder::build_frame(response_buffer)
            .for_address(self.address())
            .function(self.function())
    }

    /// Builds the exception response corresponding to this frame's function code.
    pub fn response_exception(self, response_buffer: &mut [u8], exception: Exception) -> Frame {
        builder::build_frame(response_buffer)
            .for_address(self.address())
            .exception(self.function(), exception)
    }
}

impl PartialEq for Frame {
    fn eq(&self, other: &Self) -> bool {
        self.raw_bytes() == other.raw_bytes()
    }
}
impl Eq for Frame {}

impl TryFrom<&[u8]> for Frame {
    type Error = Error;

    fn try_from(bytes: &[u8]) -> Result<Self, Self::Error> {
        if bytes.len() < MIN_FRAME_LEN {
            Err(Error::InvalidLength)
        } else if bytes.len() > MAX_FRAME_LEN {
            Err(Error::FrameTooLong)
        } else {
            let frame = Frame::new_unchecked(bytes);
            if frame.crc() != frame.calculate_crc() {
                Err(Error::InvalidCrc)
            } else {
                Ok(frame)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::function;

    #[test]
    fn views() {
        let test_data = [0x11, 0x03, 0x00, 0x6B, 0x00, 0x03, 0x76, 0x87];
        let frame = Frame::new_unchecked(&test_data);

        assert_eq!(frame.address(), 0x11);
        assert_eq!(frame.function(), function::READ_HOLDING_REGISTERS);
        assert_eq!(frame.payload(), [0x00, 0x6B, 0x00, 0x03]);
        assert_eq!(frame.raw_bytes(), test_data);
        assert_eq!(frame.crc_bytes(), [0x76, 0x87]);
        assert_eq!(frame.crc(), frame.calculate_crc());
    }

    #[test]
    fn decode_valid_frame() {
        let bytes: &[u8] = &[0x11, 0x03, 0x00, 0x6B, 0x00, 0x03, 0x76, 0x87];
        let frame = Frame::try_from(bytes).unwrap();
        assert_eq!(frame.address(), 0x11);
        assert_eq!(frame.function(), function::READ_HOLDING_REGISTERS);
        assert_eq!(frame.payload(), [0x00, 0x6B, 0x00, 0x03]);
    }

    #[test]
    fn decode_rejects_bad_crc() {
        let bytes: &[u8] = &[0x11, 0x03, 0x00, 0x6B, 0x00, 0x03, 0x00, 0x00];
        assert_eq!(Frame::try_from(bytes), Err(Error::InvalidCrc));
    }

    #[test]
    fn decode_rejects_short_frame() {
        let bytes: &[u8] = &[0x11, 0x03, 0x00];
        assert_eq!(Frame::try_from(bytes), Err(Error::InvalidLength));
    }

    #[test]
    fn decode_rejects_oversized_frame() {
        let bytes = [0u8; MAX_FRAME_LEN + 1];
        assert_eq!(Frame::try_from(&bytes[..]), Err(Error::FrameTooLong));
    }
}
