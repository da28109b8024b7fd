//! The server-side request dispatcher (spec's "responder" role): address filter, CRC check,
//! function-code demultiplex, per-function bounds/value checks, and exception synthesis.
//!
//! [`process_request`] is the single entry point. It never touches a transport: given the bytes
//! of one complete received frame and a scratch buffer to build a response into, it returns
//! the response frame to transmit, or `None` when nothing should be transmitted at all (bad
//! address, bad CRC, or listen-only mode).

use bitvec::prelude::*;
use byteorder::{BigEndian, ByteOrder};

use crate::callbacks::DataObjects;
use crate::device::{Device, ADDRESS_BROADCAST};
use crate::exception::{self, Exception};
use crate::frame::{self, Frame};
use crate::function;

/// Maximum coils/discrete inputs requested by a single FC 01/02.
const MAX_READ_BITS: u16 = 2000;
/// Maximum holding/input registers requested by a single FC 03/04.
const MAX_READ_REGISTERS: u16 = 125;
/// Maximum registers written by a single FC 16.
const MAX_WRITE_REGISTERS: u16 = 123;
/// Maximum registers read by a single FC 23 (after writing).
const MAX_READWRITE_READ_REGISTERS: u16 = 125;
/// Maximum registers written by a single FC 23 (before reading).
const MAX_READWRITE_WRITE_REGISTERS: u16 = 121;

/// `true` if `[start, start+count)` would wrap past the 16-bit address space.
fn would_wrap(start: u16, count: u16) -> bool {
    start as u32 + count as u32 > 0x1_0000
}

/// Reads `count` single-bit values starting at `start`, packing them LSB-first into bytes.
/// Stops and returns the callback's exception on the first failure.
fn read_bits<D, F>(objects: &D, start: u16, count: u16, read: F) -> Result<([u8; 250], usize), Exception>
where
    F: Fn(&D, u16) -> Result<bool, Exception>,
{
    let mut packed = [0u8; 250];
    {
        let bits = packed.view_bits_mut::<Lsb0>();
        for i in 0..count {
            if read(objects, start.wrapping_add(i))? {
                bits.set(i as usize, true);
            }
        }
    }
    Ok((packed, (count as usize + 7) / 8))
}

/// Reads `count` registers starting at `start`. Stops and returns the callback's exception on
/// the first failure.
fn read_registers<D, F>(objects: &D, start: u16, count: u16, read: F) -> Result<([u16; 125], usize), Exception>
where
    F: Fn(&D, u16) -> Result<u16, Exception>,
{
    let mut values = [0u16; 125];
    for i in 0..count {
        values[i as usize] = read(objects, start.wrapping_add(i))?;
    }
    Ok((values, count as usize))
}

/// Writes `words` starting at `start`. Stops and returns the callback's exception on the first
/// failure; registers before the failing one have already been written (matching the source,
/// which does not roll back partial writes).
fn write_registers<D, F>(objects: &mut D, start: u16, words: &[u16], write: F) -> Result<(), Exception>
where
    F: Fn(&mut D, u16, u16) -> Result<(), Exception>,
{
    for (i, &word) in words.iter().enumerate() {
        write(objects, start.wrapping_add(i as u16), word)?;
    }
    Ok(())
}

/// What processing one request should translate into at the transport boundary.
enum Outcome {
    /// Transmit this response.
    Respond,
    /// Suppress transmission (an exception is still a "respond" case; this is listen-only).
    Suppress,
}

/// Processes one received, already-length-checked, already-CRC-checked frame and writes a
/// response into `response_buffer`. Returns whether the caller should actually transmit it.
fn dispatch<D: DataObjects>(
    device: &mut Device,
    objects: &mut D,
    request: &Frame,
    response_buffer: &mut [u8],
) -> (Frame, Outcome) {
    let fc = request.function();
    let payload = request.payload();

    if !fc.is_supported() {
        return (
            request.response_exception(response_buffer, exception::ILLEGAL_FUNCTION),
            Outcome::Respond,
        );
    }

    let result: Result<Frame, Exception> = match fc {
        function::READ_COILS => {
            handle_read_bits(objects, payload, response_buffer, request, |o, a| {
                o.get_coil(a)
            })
        }
        function::READ_DISCRETE_INPUTS => {
            handle_read_bits(objects, payload, response_buffer, request, |o, a| {
                o.get_discrete_input(a)
            })
        }
        function::READ_HOLDING_REGISTERS => {
            handle_read_registers(objects, payload, response_buffer, request, |o, a| {
                o.get_holding_register(a)
            })
        }
        function::READ_INPUT_REGISTERS => {
            handle_read_registers(objects, payload, response_buffer, request, |o, a| {
                o.get_input_register(a)
            })
        }
        function::WRITE_COIL => handle_write_coil(objects, payload, response_buffer, request),
        function::WRITE_HOLDING_REGISTER => {
            handle_write_register(objects, payload, response_buffer, request)
        }
        function::READ_EXCEPTION_STATUS => {
            handle_read_exception_status(objects, payload, response_buffer, request)
        }
        function::DIAGNOSTICS => {
            return handle_diagnostics(device, payload, response_buffer, request)
        }
        function::WRITE_MULTIPLE_REGISTERS => {
            handle_write_multiple_registers(objects, payload, response_buffer, request)
        }
        function::READ_WRITE_MULTIPLE_REGISTERS => {
            handle_read_write_multiple_registers(objects, payload, response_buffer, request)
        }
        _ => unreachable!("is_supported() was checked above"),
    };

    match result {
        Ok(frame) => (frame, Outcome::Respond),
        Err(exc) => (
            request.response_exception(response_buffer, exc),
            Outcome::Respond,
        ),
    }
}

fn handle_read_bits<D: DataObjects>(
    objects: &D,
    payload: &[u8],
    response_buffer: &mut [u8],
    request: &Frame,
    read: impl Fn(&D, u16) -> Result<bool, Exception>,
) -> Result<Frame, Exception> {
    if payload.len() != 4 {
        return Err(exception::ILLEGAL_DATA_VALUE);
    }
    let start = BigEndian::read_u16(&payload[0..2]);
    let count = BigEndian::read_u16(&payload[2..4]);
    if count == 0 || count > MAX_READ_BITS || would_wrap(start, count) {
        return Err(exception::ILLEGAL_DATA_VALUE);
    }
    let (packed, byte_len) = read_bits(objects, start, count, read)?;
    Ok(request
        .response_builder(response_buffer)
        .count_following_bytes(|b| b.bytes(packed[..byte_len].iter().copied()))
        .finalise())
}

fn handle_read_registers<D: DataObjects>(
    objects: &D,
    payload: &[u8],
    response_buffer: &mut [u8],
    request: &Frame,
    read: impl Fn(&D, u16) -> Result<u16, Exception>,
) -> Result<Frame, Exception> {
    if payload.len() != 4 {
        return Err(exception::ILLEGAL_DATA_VALUE);
    }
    let start = BigEndian::read_u16(&payload[0..2]);
    let count = BigEndian::read_u16(&payload[2..4]);
    if count == 0 || count > MAX_READ_REGISTERS || would_wrap(start, count) {
        return Err(exception::ILLEGAL_DATA_VALUE);
    }
    let (values, len) = read_registers(objects, start, count, read)?;
    Ok(request
        .response_builder(response_buffer)
        .count_following_bytes(|b| b.registers(values[..len].iter().copied()))
        .finalise())
}

fn handle_write_coil<D: DataObjects>(
    objects: &mut D,
    payload: &[u8],
    response_buffer: &mut [u8],
    request: &Frame,
) -> Result<Frame, Exception> {
    if payload.len() != 4 {
        return Err(exception::ILLEGAL_DATA_VALUE);
    }
    let address = BigEndian::read_u16(&payload[0..2]);
    let value = BigEndian::read_u16(&payload[2..4]);
    let normalized = match value {
        0x0000 => false,
        0xFF00 => true,
        _ => return Err(exception::ILLEGAL_DATA_VALUE),
    };
    objects.set_coil(address, normalized)?;
    Ok(request
        .response_builder(response_buffer)
        .bytes(payload.iter().copied())
        .finalise())
}

fn handle_write_register<D: DataObjects>(
    objects: &mut D,
    payload: &[u8],
    response_buffer: &mut [u8],
    request: &Frame,
) -> Result<Frame, Exception> {
    if payload.len() != 4 {
        return Err(exception::ILLEGAL_DATA_VALUE);
    }
    let address = BigEndian::read_u16(&payload[0..2]);
    let value = BigEndian::read_u16(&payload[2..4]);
    objects.set_holding_register(address, value)?;
    Ok(request
        .response_builder(response_buffer)
        .bytes(payload.iter().copied())
        .finalise())
}

fn handle_read_exception_status<D: DataObjects>(
    objects: &D,
    payload: &[u8],
    response_buffer: &mut [u8],
    request: &Frame,
) -> Result<Frame, Exception> {
    if !payload.is_empty() {
        return Err(exception::ILLEGAL_DATA_VALUE);
    }
    let status = objects.get_exception_status()?;
    Ok(request
        .response_builder(response_buffer)
        .byte(status)
        .finalise())
}

/// Subfunctions this dispatcher recognizes, beyond 0 (echo), 1 (clear + exit listen-only), and
/// 4 (enter listen-only), which get dedicated handling.
const RECOGNIZED_DIAGNOSTIC_SUBFUNCTIONS: [u16; 12] =
    [2, 3, 10, 11, 12, 13, 14, 15, 16, 17, 18, 20];

fn handle_diagnostics(
    device: &mut Device,
    payload: &[u8],
    response_buffer: &mut [u8],
    request: &Frame,
) -> (Frame, Outcome) {
    if payload.len() != 4 {
        return (
            request.response_exception(response_buffer, exception::ILLEGAL_DATA_VALUE),
            Outcome::Respond,
        );
    }
    let subfunction = BigEndian::read_u16(&payload[0..2]);
    let echo = || {
        request
            .response_builder(response_buffer)
            .bytes(payload.iter().copied())
            .finalise()
    };
    match subfunction {
        0 => (echo(), Outcome::Respond),
        1 => {
            device.counters_mut().clear();
            device.set_listen_only(false);
            (echo(), Outcome::Respond)
        }
        4 => {
            device.set_listen_only(true);
            // no response is ever sent for this subfunction; the content here is discarded
            (echo(), Outcome::Suppress)
        }
        s if RECOGNIZED_DIAGNOSTIC_SUBFUNCTIONS.contains(&s) => (echo(), Outcome::Respond),
        _ => (
            request.response_exception(response_buffer, exception::ILLEGAL_FUNCTION),
            Outcome::Respond,
        ),
    }
}

fn handle_write_multiple_registers<D: DataObjects>(
    objects: &mut D,
    payload: &[u8],
    response_buffer: &mut [u8],
    request: &Frame,
) -> Result<Frame, Exception> {
    if payload.len() < 5 {
        return Err(exception::ILLEGAL_DATA_VALUE);
    }
    let start = BigEndian::read_u16(&payload[0..2]);
    let count = BigEndian::read_u16(&payload[2..4]);
    let byte_count = payload[4];
    if count == 0
        || count > MAX_WRITE_REGISTERS
        || would_wrap(start, count)
        || byte_count as usize != count as usize * 2
        || payload.len() != 5 + byte_count as usize
    {
        return Err(exception::ILLEGAL_DATA_VALUE);
    }
    let mut words = [0u16; MAX_WRITE_REGISTERS as usize];
    BigEndian::read_u16_into(&payload[5..5 + byte_count as usize], &mut words[..count as usize]);
    write_registers(objects, start, &words[..count as usize], |o, a, v| {
        o.set_holding_register(a, v)
    })?;
    Ok(request
        .response_builder(response_buffer)
        .register(start)
        .register(count)
        .finalise())
}

fn handle_read_write_multiple_registers<D: DataObjects>(
    objects: &mut D,
    payload: &[u8],
    response_buffer: &mut [u8],
    request: &Frame,
) -> Result<Frame, Exception> {
    if payload.len() < 9 {
        return Err(exception::ILLEGAL_DATA_VALUE);
    }
    let read_start = BigEndian::read_u16(&payload[0..2]);
    let read_count = BigEndian::read_u16(&payload[2..4]);
    let write_start = BigEndian::read_u16(&payload[4..6]);
    let write_count = BigEndian::read_u16(&payload[6..8]);
    let write_byte_count = payload[8];
    if read_count == 0
        || read_count > MAX_READWRITE_READ_REGISTERS
        || would_wrap(read_start, read_count)
        || write_count == 0
        || write_count > MAX_READWRITE_WRITE_REGISTERS
        || would_wrap(write_start, write_count)
        || write_byte_count as usize != write_count as usize * 2
        || payload.len() != 9 + write_byte_count as usize
    {
        return Err(exception::ILLEGAL_DATA_VALUE);
    }
    let mut write_words = [0u16; MAX_READWRITE_WRITE_REGISTERS as usize];
    BigEndian::read_u16_into(
        &payload[9..9 + write_byte_count as usize],
        &mut write_words[..write_count as usize],
    );
    // writes before reads, so a client can atomically modify and observe
    write_registers(
        objects,
        write_start,
        &write_words[..write_count as usize],
        |o, a, v| o.set_holding_register(a, v),
    )?;
    let (values, len) = read_registers(objects, read_start, read_count, |o, a| {
        o.get_holding_register(a)
    })?;
    Ok(request
        .response_builder(response_buffer)
        .count_following_bytes(|b| b.registers(values[..len].iter().copied()))
        .finalise())
}

/// Processes the raw bytes of one received frame, address-filters, CRC-verifies, dispatches,
/// and updates `device`'s diagnostic counters throughout.
///
/// This takes raw bytes rather than an already-parsed [`Frame`] so that `frames_received`
/// counts every frame the transport hands over, bad CRC included — per the dispatcher
/// procedure, the counter increments before either the address filter or the CRC check.
///
/// Returns `Some(frame)` when a response should be transmitted, `None` when it should not:
/// too short/long to be a frame, bad CRC, wrong address, listen-only mode, a broadcast request
/// (which is still dispatched and counted, but never gets a reply on the wire), or FC 08
/// subfunction 4 (enter listen-only).
pub fn process_request<D: DataObjects>(
    device: &mut Device,
    objects: &mut D,
    request_bytes: &[u8],
    response_buffer: &mut [u8],
) -> Option<Frame> {
    device.counters_mut().frames_received += 1;

    if request_bytes.len() < frame::MIN_FRAME_LEN || request_bytes.len() > frame::MAX_FRAME_LEN {
        return None;
    }
    let request = Frame::new_unchecked(request_bytes);

    let address = request.address();
    let is_broadcast = address == ADDRESS_BROADCAST;
    if !is_broadcast && !device.is_addressed_to_me(address) {
        device.counters_mut().frames_not_responded += 1;
        return None;
    }

    if request.crc() != request.calculate_crc() {
        return None;
    }

    device.counters_mut().frames_addressed += 1;

    let was_listen_only = device.listen_only();
    let (response, outcome) = dispatch(device, objects, &request, response_buffer);

    let transmit = !was_listen_only && !is_broadcast && matches!(outcome, Outcome::Respond);
    if transmit {
        if response.function().is_exception() {
            device.counters_mut().exceptions_sent += 1;
        } else {
            device.counters_mut().responses_sent += 1;
        }
        Some(response)
    } else {
        device.counters_mut().frames_not_responded += 1;
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::Device;

    #[derive(Default)]
    struct TestServer {
        holding: [u16; 200],
        coils: [bool; 200],
    }

    impl DataObjects for TestServer {
        fn get_coil(&self, address: u16) -> Result<bool, Exception> {
            self.coils
                .get(address as usize)
                .copied()
                .ok_or(exception::ILLEGAL_DATA_ADDRESS)
        }

        fn set_coil(&mut self, address: u16, value: bool) -> Result<(), Exception> {
            *self
                .coils
                .get_mut(address as usize)
                .ok_or(exception::ILLEGAL_DATA_ADDRESS)? = value;
            Ok(())
        }

        fn get_holding_register(&self, address: u16) -> Result<u16, Exception> {
            self.holding
                .get(address as usize)
                .copied()
                .ok_or(exception::ILLEGAL_DATA_ADDRESS)
        }

        fn set_holding_register(&mut self, address: u16, value: u16) -> Result<(), Exception> {
            *self
                .holding
                .get_mut(address as usize)
                .ok_or(exception::ILLEGAL_DATA_ADDRESS)? = value;
            Ok(())
        }
    }

    fn with_crc<const N: usize, const M: usize>(bytes: [u8; N]) -> [u8; M] {
        assert_eq!(M, N + 2);
        let crc = crate::crc::compute_be_bytes(&bytes);
        let mut full = [0u8; M];
        full[..N].copy_from_slice(&bytes);
        full[N..].copy_from_slice(&crc);
        full
    }

    #[test]
    fn fc03_happy_path() {
        let mut device = Device::server(0x11).unwrap();
        let mut server = TestServer::default();
        server.holding[0x6B] = 0x022B;
        server.holding[0x6C] = 0x0000;
        server.holding[0x6D] = 0x0064;

        let request = [0x11, 0x03, 0x00, 0x6B, 0x00, 0x03, 0x76, 0x87];
        let mut buf = [0u8; 256];
        let response = process_request(&mut device, &mut server, &request, &mut buf).unwrap();
        assert_eq!(
            response.raw_bytes(),
            [0x11, 0x03, 0x06, 0x02, 0x2B, 0x00, 0x00, 0x00, 0x64, response.crc_bytes()[0], response.crc_bytes()[1]]
        );
        assert_eq!(device.counters().frames_received, 1);
        assert_eq!(device.counters().frames_addressed, 1);
        assert_eq!(device.counters().responses_sent, 1);
    }

    #[test]
    fn fc05_write_on_echoes_request() {
        let mut device = Device::server(0x11).unwrap();
        let mut server = TestServer::default();
        let request = [0x11, 0x05, 0x00, 0xAC, 0xFF, 0x00, 0x4E, 0x8B];
        let mut buf = [0u8; 256];
        let response = process_request(&mut device, &mut server, &request, &mut buf).unwrap();
        assert_eq!(response.raw_bytes(), request);
        assert!(server.coils[0x00AC]);
    }

    #[test]
    fn fc05_rejects_value_other_than_on_or_off() {
        let mut device = Device::server(0x11).unwrap();
        let mut server = TestServer::default();
        let request: [u8; 8] = with_crc([0x11u8, 0x05, 0x00, 0xAC, 0x12, 0x34]);
        let mut buf = [0u8; 256];
        let response = process_request(&mut device, &mut server, &request, &mut buf).unwrap();
        assert_eq!(response.function(), function::WRITE_COIL.with_exception_bit());
        assert_eq!(response.payload(), [0x03]);
        assert_eq!(response.raw_bytes().len(), 5);
    }

    #[test]
    fn fc01_bit_packing() {
        let mut device = Device::server(0x11).unwrap();
        let mut server = TestServer::default();
        for (i, &bit) in [true, false, true, true, false, false, true, true, true, false]
            .iter()
            .enumerate()
        {
            server.coils[i] = bit;
        }
        let request: [u8; 8] = with_crc([0x11u8, 0x01, 0x00, 0x00, 0x00, 0x0A]);
        let mut buf = [0u8; 256];
        let response = process_request(&mut device, &mut server, &request, &mut buf).unwrap();
        assert_eq!(response.payload()[0], 2); // byte count
        assert_eq!(response.payload()[1], 0xCD);
        assert_eq!(response.payload()[2], 0x01);
    }

    #[test]
    fn wrong_address_produces_no_response() {
        let mut device = Device::server(0x11).unwrap();
        let mut server = TestServer::default();
        let request: [u8; 8] = with_crc([0x12u8, 0x03, 0x00, 0x6B, 0x00, 0x03]);
        let mut buf = [0u8; 256];
        assert!(process_request(&mut device, &mut server, &request, &mut buf).is_none());
        assert_eq!(device.counters().frames_received, 1);
        assert_eq!(device.counters().frames_not_responded, 1);
        assert_eq!(device.counters().frames_addressed, 0);
    }

    #[test]
    fn bad_crc_still_counts_frames_received_but_nothing_else() {
        let mut device = Device::server(0x11).unwrap();
        let mut server = TestServer::default();
        let mut request = [0x11, 0x03, 0x00, 0x6B, 0x00, 0x03, 0x76, 0x87];
        request[7] ^= 0xFF; // corrupt the CRC
        let mut buf = [0u8; 256];
        assert!(process_request(&mut device, &mut server, &request, &mut buf).is_none());
        assert_eq!(device.counters().frames_received, 1);
        assert_eq!(device.counters().frames_addressed, 0);
        assert_eq!(device.counters().frames_not_responded, 0);
    }

    #[test]
    fn listen_only_suppresses_responses_but_still_updates_counters() {
        let mut device = Device::server(0x11).unwrap();
        device.set_listen_only(true);
        let mut server = TestServer::default();
        let request = [0x11, 0x03, 0x00, 0x6B, 0x00, 0x03, 0x76, 0x87];
        let mut buf = [0u8; 256];
        assert!(process_request(&mut device, &mut server, &request, &mut buf).is_none());
        assert_eq!(device.counters().frames_addressed, 1);
        assert_eq!(device.counters().frames_not_responded, 1);
    }

    #[test]
    fn diagnostics_subfunction_one_exits_listen_only_and_clears_counters() {
        let mut device = Device::server(0x11).unwrap();
        device.set_listen_only(true);
        let mut server = TestServer::default();
        let request: [u8; 8] = with_crc([0x11u8, 0x08, 0x00, 0x01, 0x00, 0x00]);
        let mut buf = [0u8; 256];
        // still listen-only when this frame arrives, so still suppressed
        assert!(process_request(&mut device, &mut server, &request, &mut buf).is_none());
        assert!(!device.listen_only());
        assert_eq!(device.counters().frames_received, 0); // cleared by subfunction 1
    }

    #[test]
    fn unsupported_function_code_yields_illegal_function() {
        let mut device = Device::server(0x11).unwrap();
        let mut server = TestServer::default();
        let request: [u8; 6] = with_crc([0x11u8, 99, 0x00, 0x00]);
        let mut buf = [0u8; 256];
        let response = process_request(&mut device, &mut server, &request, &mut buf).unwrap();
        assert_eq!(response.function().0, 99 | 0x80);
        assert_eq!(response.payload(), [exception::ILLEGAL_FUNCTION.0]);
    }

    #[test]
    fn fc07_rejects_trailing_payload_bytes() {
        let mut device = Device::server(0x11).unwrap();
        let mut server = TestServer::default();
        let request: [u8; 6] = with_crc([0x11u8, 0x07, 0x00, 0x00]);
        let mut buf = [0u8; 256];
        let response = process_request(&mut device, &mut server, &request, &mut buf).unwrap();
        assert_eq!(response.function(), function::READ_EXCEPTION_STATUS.with_exception_bit());
        assert_eq!(response.payload(), [exception::ILLEGAL_DATA_VALUE.0]);
    }
}
