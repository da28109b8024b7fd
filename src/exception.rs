//! Exception codes as documented by https://en.wikipedia.org/wiki/Modbus#Exception_responses
//!
//! Only the four codes this crate's dispatcher recognizes (spec §6) are defined.

/// A Modbus exception code, carried as the single payload byte of an exception response.
#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Clone, Copy, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Exception(pub u8);

impl From<u8> for Exception {
    fn from(e: u8) -> Self {
        Exception(e)
    }
}

impl From<Exception> for u8 {
    fn from(e: Exception) -> Self {
        e.0
    }
}

/// Function code received in the query is not recognized or allowed by the server.
pub const ILLEGAL_FUNCTION: Exception = Exception(1);
/// Data address of some or all of the required entities is not allowed or does not exist on the server.
pub const ILLEGAL_DATA_ADDRESS: Exception = Exception(2);
/// Value in the query is not accepted by the server (quantity out of range, bad coil value, byte-count mismatch).
pub const ILLEGAL_DATA_VALUE: Exception = Exception(3);
/// Unrecoverable error occurred while the server was attempting to perform the requested action.
///
/// No path in this dispatcher synthesizes this code itself (see DESIGN.md Open Question 2);
/// it is exported so an embedding `DataObjects` implementation has somewhere to point a
/// caller-visible "hard failure" distinct from "address absent".
pub const SERVER_DEVICE_FAILURE: Exception = Exception(4);
