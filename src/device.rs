//! Device configuration and the per-device diagnostic counters maintained alongside it.

use crate::{Error, Result};

/// Lowest assignable server address. `0` is broadcast, `248` is the mono-drop convention,
/// `255` is the uninitialized sentinel; none of those are assignable to a real device.
pub const SERVER_ADDRESS_MIN: u8 = 1;
/// Highest assignable server address.
pub const SERVER_ADDRESS_MAX: u8 = 247;
/// Broadcast address: requests sent here are processed but never answered.
pub const ADDRESS_BROADCAST: u8 = 0;
/// Mono-drop address (Schneider convention): answered like any unicast address.
pub const ADDRESS_MONODROP: u8 = 248;
/// Sentinel meaning "address not yet configured".
pub const ADDRESS_UNINITIALIZED: u8 = 255;

/// Which side of a conversation a `Device` is configured to play.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Role {
    #[default]
    Server,
    Client,
}

/// Supported line rates, in bits per second.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Baud {
    B1200,
    B2400,
    B4800,
    B9600,
    B19200,
    B38400,
}

impl Baud {
    pub fn bits_per_second(self) -> u32 {
        match self {
            Baud::B1200 => 1200,
            Baud::B2400 => 2400,
            Baud::B4800 => 4800,
            Baud::B9600 => 9600,
            Baud::B19200 => 19200,
            Baud::B38400 => 38400,
        }
    }
}

impl TryFrom<u32> for Baud {
    type Error = Error;

    fn try_from(bps: u32) -> Result<Self> {
        match bps {
            1200 => Ok(Baud::B1200),
            2400 => Ok(Baud::B2400),
            4800 => Ok(Baud::B4800),
            9600 => Ok(Baud::B9600),
            19200 => Ok(Baud::B19200),
            38400 => Ok(Baud::B38400),
            _ => Err(Error::InvalidBaud),
        }
    }
}

/// Supported character parity settings.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Parity {
    Even,
    Odd,
    None,
}

/// Running diagnostic counters for a device (spec §5).
#[derive(Debug, PartialEq, Eq, Clone, Copy, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Counters {
    /// every frame handed to the dispatcher, including ones with a bad CRC or addressed to
    /// another device
    pub frames_received: u32,
    /// frames addressed to this device (unicast match, broadcast, or mono-drop) that passed CRC
    pub frames_addressed: u32,
    /// frames addressed to this device that did not produce a response (broadcast, or listen-only)
    pub frames_not_responded: u32,
    /// exception responses returned
    pub exceptions_sent: u32,
    /// normal (non-exception) responses returned
    pub responses_sent: u32,
}

impl Counters {
    pub fn clear(&mut self) {
        *self = Counters::default();
    }
}

/// A device's static and run-time state: role, line configuration, and diagnostics.
///
/// Built with validated setters rather than a public-field struct literal, since the original
/// enum-valued fields (`t_baud`, `t_parity`) admit values with no defined meaning on the wire.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Device {
    role: Role,
    server_address: u8,
    baud: Baud,
    parity: Parity,
    listen_only: bool,
    counters: Counters,
}

impl Device {
    /// A server device at `server_address`, 9600 8N1, listening normally.
    pub fn server(server_address: u8) -> Result<Self> {
        if !(SERVER_ADDRESS_MIN..=SERVER_ADDRESS_MAX).contains(&server_address) {
            return Err(Error::InvalidServerAddress);
        }
        Ok(Device {
            role: Role::Server,
            server_address,
            baud: Baud::B9600,
            parity: Parity::None,
            listen_only: false,
            counters: Counters::default(),
        })
    }

    /// A client device. `server_address` is unused for dispatch purposes (a client addresses
    /// each request explicitly) but is still tracked, matching the source's single address field.
    pub fn client() -> Self {
        Device {
            role: Role::Client,
            server_address: ADDRESS_UNINITIALIZED,
            baud: Baud::B9600,
            parity: Parity::None,
            listen_only: false,
            counters: Counters::default(),
        }
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn server_address(&self) -> u8 {
        self.server_address
    }

    pub fn set_server_address(&mut self, address: u8) -> Result<()> {
        if !(SERVER_ADDRESS_MIN..=SERVER_ADDRESS_MAX).contains(&address) {
            return Err(Error::InvalidServerAddress);
        }
        self.server_address = address;
        Ok(())
    }

    pub fn baud(&self) -> Baud {
        self.baud
    }

    pub fn set_baud(&mut self, baud: Baud) {
        self.baud = baud;
    }

    pub fn parity(&self) -> Parity {
        self.parity
    }

    pub fn set_parity(&mut self, parity: Parity) {
        self.parity = parity;
    }

    pub fn listen_only(&self) -> bool {
        self.listen_only
    }

    pub fn set_listen_only(&mut self, listen_only: bool) {
        self.listen_only = listen_only;
    }

    /// Whether `address` is one this device should answer or act on a frame for: an exact
    /// unicast match or the mono-drop address. Broadcast is handled separately, since it is
    /// acted on but never answered.
    pub fn is_addressed_to_me(&self, address: u8) -> bool {
        address == self.server_address || address == ADDRESS_MONODROP
    }

    pub fn counters(&self) -> &Counters {
        &self.counters
    }

    pub fn counters_mut(&mut self) -> &mut Counters {
        &mut self.counters
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn server_rejects_reserved_addresses() {
        assert_eq!(Device::server(0), Err(Error::InvalidServerAddress));
        assert_eq!(Device::server(248), Err(Error::InvalidServerAddress));
        assert_eq!(Device::server(255), Err(Error::InvalidServerAddress));
    }

    #[test]
    fn server_accepts_full_assignable_range() {
        for addr in SERVER_ADDRESS_MIN..=SERVER_ADDRESS_MAX {
            assert_eq!(Device::server(addr).unwrap().server_address(), addr);
        }
    }

    #[test]
    fn baud_try_from_rejects_unsupported_rates() {
        assert_eq!(Baud::try_from(57600), Err(Error::InvalidBaud));
        assert_eq!(Baud::try_from(9600), Ok(Baud::B9600));
    }

    #[test]
    fn addressed_to_me_matches_unicast_and_monodrop() {
        let dev = Device::server(17).unwrap();
        assert!(dev.is_addressed_to_me(17));
        assert!(dev.is_addressed_to_me(ADDRESS_MONODROP));
        assert!(!dev.is_addressed_to_me(18));
    }
}
