//! the minimum inter-frame gap, the one timing fact this crate exposes to a transport
//!
//! everything else about RTU framing (3.5-character silence detection, line turnaround) is the
//! transport's job; this only answers "how long is 3.5 characters at this baud rate".

use crate::device::Baud;

/// A modbus RTU character is 11 bit-times regardless of the parity setting in use
/// (start + 8 data + parity-or-extra-stop + stop).
const BITS_PER_CHARACTER: u64 = 11;

/// Minimum inter-frame silence, in microseconds, for `baud`: `⌊3,500,000 · 11 / baud⌋`.
///
/// Deliberately unclamped: some RTU stacks apply a 1.75 ms floor at low baud rates, but this
/// crate returns the raw truncated value, matching the computation as specified rather than
/// guessing at a floor the caller may not want.
pub fn frame_timeout_us(baud: Baud) -> u64 {
    3_500_000 * BITS_PER_CHARACTER / baud.bits_per_second() as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matches_the_published_value_at_19200_baud() {
        assert_eq!(frame_timeout_us(Baud::B19200), 2005);
    }

    #[test]
    fn decreases_as_baud_increases() {
        assert!(frame_timeout_us(Baud::B1200) > frame_timeout_us(Baud::B38400));
    }

    #[test]
    fn exact_for_every_supported_baud() {
        for (baud, bps) in [
            (Baud::B1200, 1200u64),
            (Baud::B2400, 2400),
            (Baud::B4800, 4800),
            (Baud::B9600, 9600),
            (Baud::B19200, 19200),
            (Baud::B38400, 38400),
        ] {
            assert_eq!(frame_timeout_us(baud), 3_500_000 * 11 / bps);
        }
    }
}
