//! function codes as documented by https://en.wikipedia.org/wiki/Modbus#Available_function/command_codes
//!
//! Only the ten codes this crate's dispatcher and client builders support are
//! listed here (spec §6); anything else reaching the server is answered with
//! `exception::ILLEGAL_FUNCTION`.

/// function code specifies how a device processes the frame
/// top bit is set to indicate an exception response so valid range is 0-127
#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Clone, Copy, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Function(pub u8);

impl Function {
    pub const EXCEPTION_BIT: u8 = 0x80;

    /// true if bit 7 is set, i.e. this is the function code of an exception response
    pub fn is_exception(self) -> bool {
        self.0 & Self::EXCEPTION_BIT != 0
    }

    /// the function code with the exception bit cleared
    pub fn without_exception_bit(self) -> Function {
        Function(self.0 & !Self::EXCEPTION_BIT)
    }

    /// the function code with the exception bit set
    pub fn with_exception_bit(self) -> Function {
        Function(self.0 | Self::EXCEPTION_BIT)
    }

    /// is this one of the ten function codes this crate implements
    pub fn is_supported(self) -> bool {
        matches!(self.0, 1 | 2 | 3 | 4 | 5 | 6 | 7 | 8 | 16 | 23)
    }
}

impl From<u8> for Function {
    fn from(f: u8) -> Self {
        Function(f)
    }
}

impl From<Function> for u8 {
    fn from(f: Function) -> Self {
        f.0
    }
}

/// Request: address of first coil to read (16-bit), number of coils to read (16-bit).
/// First requested coil is stored as the least significant bit of the first response byte;
/// trailing bits in the last byte are zero-padded.
///
/// Normal response: byte count (8-bit), coil values (8 per byte).
pub const READ_COILS: Function = Function(1);

/// Request: address of first discrete input to read (16-bit), count (16-bit).
///
/// Normal response: byte count (8-bit), input values (8 per byte), LSB-first.
pub const READ_DISCRETE_INPUTS: Function = Function(2);

/// Request: address of first register to read (16-bit), count (16-bit).
///
/// Normal response: byte count (8-bit), register values (16 bits each, big-endian).
pub const READ_HOLDING_REGISTERS: Function = Function(3);

/// Request: address of first register to read (16-bit), count (16-bit).
///
/// Normal response: byte count (8-bit), register values (16 bits each, big-endian).
pub const READ_INPUT_REGISTERS: Function = Function(4);

/// Request: coil address (16-bit), value to force (`0x0000` off or `0xFF00` on).
///
/// Normal response: echo of the request.
pub const WRITE_COIL: Function = Function(5);

/// Request: register address (16-bit), new value (16-bit).
///
/// Normal response: echo of the request.
pub const WRITE_HOLDING_REGISTER: Function = Function(6);

/// Request: none.
///
/// Normal response: one exception-status byte.
pub const READ_EXCEPTION_STATUS: Function = Function(7);

/// Request: subfunction (16-bit), data (16-bit). See spec §4.2 for the recognized subfunctions.
///
/// Normal response: echo of the request (subfunction-dependent).
pub const DIAGNOSTICS: Function = Function(8);

/// Request: start address (16-bit), quantity N (16-bit), byte count `2N` (8-bit), N big-endian words.
///
/// Normal response: start address (16-bit), quantity (16-bit).
pub const WRITE_MULTIPLE_REGISTERS: Function = Function(16);

/// Request: read-start (16-bit), read-quantity (16-bit), write-start (16-bit), write-quantity `wN` (16-bit),
/// write byte count `2*wN` (8-bit), `wN` big-endian words. Writes are applied before reads.
///
/// Normal response: byte count (8-bit), the registers read after writing (16 bits each, big-endian).
pub const READ_WRITE_MULTIPLE_REGISTERS: Function = Function(23);
