use core::fmt;

/// Library-local failure plane (see spec §7). These are returned as `Err` and
/// never touch the wire; a `NOK` return to the transport always corresponds to
/// one of these (or to an `Ok` that the caller is told not to transmit).
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
#[non_exhaustive] // new variants may be added later
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    /// frame shorter than the 4-byte minimum (address + function + CRC16)
    InvalidLength,
    /// frame longer than the 256-byte maximum
    FrameTooLong,
    /// CRC in the frame does not match the recomputed CRC
    InvalidCrc,
    /// a client builder or parser was invoked on a `Device` configured as `Role::Server`, or vice versa
    RoleMismatch,
    /// the destination buffer is too small to hold the frame being built
    BufferOverflow,
    /// baud rate is not one of the enumerated values in §3
    InvalidBaud,
    /// parity is not one of the enumerated values in §3
    InvalidParity,
    /// server address is not in the assignable range `[1, 247]`
    InvalidServerAddress,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match self {
            Error::InvalidLength => "frame shorter than the minimum 4 bytes",
            Error::FrameTooLong => "frame longer than the maximum 256 bytes",
            Error::InvalidCrc => "CRC mismatch",
            Error::RoleMismatch => "operation not valid for the device's configured role",
            Error::BufferOverflow => "destination buffer too small for the frame being built",
            Error::InvalidBaud => "unrecognized baud rate",
            Error::InvalidParity => "unrecognized parity setting",
            Error::InvalidServerAddress => "server address outside the assignable range [1, 247]",
        };
        f.write_str(msg)
    }
}

#[cfg(feature = "std")]
impl std::error::Error for Error {}

pub type Result<T> = core::result::Result<T, Error>;
