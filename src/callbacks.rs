//! The data a server device exposes to the dispatcher.
//!
//! The reference implementation this crate is modeled on reached into a handful of free
//! functions (`Modbus_ReadCoil`, `Modbus_WriteCoil`, ...) that the embedding application defined
//! at file scope, with no way to pass them any state. Here the same seam is a trait instead: one
//! object, implemented once per device, that owns however it actually stores coils and
//! registers. [`crate::server::process_request`] never touches storage directly, it only calls
//! through this trait.
//!
//! Every method defaults to returning `ILLEGAL_DATA_ADDRESS`, so an implementation only needs
//! to override the handful of methods its device actually supports.

use crate::exception::{self, Exception};

/// Storage a modbus server device exposes for the dispatcher to read and write.
///
/// All addresses are zero-based 16-bit offsets, as carried on the wire; mapping them onto
/// whatever the embedding application calls its own coils/registers is this trait's job.
pub trait DataObjects {
    /// Reads the coil at `address`.
    fn get_coil(&self, address: u16) -> Result<bool, Exception> {
        let _ = address;
        Err(exception::ILLEGAL_DATA_ADDRESS)
    }

    /// Sets the coil at `address`.
    fn set_coil(&mut self, address: u16, value: bool) -> Result<(), Exception> {
        let _ = (address, value);
        Err(exception::ILLEGAL_DATA_ADDRESS)
    }

    /// Reads the discrete input at `address`.
    fn get_discrete_input(&self, address: u16) -> Result<bool, Exception> {
        let _ = address;
        Err(exception::ILLEGAL_DATA_ADDRESS)
    }

    /// Reads the holding register at `address`.
    fn get_holding_register(&self, address: u16) -> Result<u16, Exception> {
        let _ = address;
        Err(exception::ILLEGAL_DATA_ADDRESS)
    }

    /// Sets the holding register at `address`.
    fn set_holding_register(&mut self, address: u16, value: u16) -> Result<(), Exception> {
        let _ = (address, value);
        Err(exception::ILLEGAL_DATA_ADDRESS)
    }

    /// Reads the input register at `address`.
    fn get_input_register(&self, address: u16) -> Result<u16, Exception> {
        let _ = address;
        Err(exception::ILLEGAL_DATA_ADDRESS)
    }

    /// Returns the device's exception status byte (FC07), bit-per-condition, meaning defined by
    /// the embedding application.
    fn get_exception_status(&self) -> Result<u8, Exception> {
        Err(exception::ILLEGAL_DATA_ADDRESS)
    }
}
