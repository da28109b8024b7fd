//! Client-side (requester) request builders and response parser.
//!
//! Every builder requires `device.role()` to be [`crate::device::Role::Client`]; called on a
//! server-configured device they fail with `Error::RoleMismatch` without touching the buffer.

use crate::builder;
use crate::crc;
use crate::device::{Device, Role};
use crate::frame::Frame;
use crate::function::{self, Function};
use crate::payload::TypedPayload;
use crate::{Error, Result};

fn check_role(device: &Device) -> Result<()> {
    if device.role() != Role::Client {
        Err(Error::RoleMismatch)
    } else {
        Ok(())
    }
}

fn read_request(
    device: &Device,
    buffer: &mut [u8],
    server_address: u8,
    function: Function,
    start: u16,
    quantity: u16,
) -> Result<Frame> {
    check_role(device)?;
    Ok(builder::build_frame(buffer)
        .for_address(server_address)
        .function(function)
        .register(start)
        .register(quantity)
        .finalise())
}

/// FC 01: Read Coils.
pub fn read_coils(
    device: &Device,
    buffer: &mut [u8],
    server_address: u8,
    start: u16,
    quantity: u16,
) -> Result<Frame> {
    read_request(device, buffer, server_address, function::READ_COILS, start, quantity)
}

/// FC 02: Read Discrete Inputs.
pub fn read_discrete_inputs(
    device: &Device,
    buffer: &mut [u8],
    server_address: u8,
    start: u16,
    quantity: u16,
) -> Result<Frame> {
    read_request(
        device,
        buffer,
        server_address,
        function::READ_DISCRETE_INPUTS,
        start,
        quantity,
    )
}

/// FC 03: Read Holding Registers.
pub fn read_holding_registers(
    device: &Device,
    buffer: &mut [u8],
    server_address: u8,
    start: u16,
    quantity: u16,
) -> Result<Frame> {
    read_request(
        device,
        buffer,
        server_address,
        function::READ_HOLDING_REGISTERS,
        start,
        quantity,
    )
}

/// FC 04: Read Input Registers.
pub fn read_input_registers(
    device: &Device,
    buffer: &mut [u8],
    server_address: u8,
    start: u16,
    quantity: u16,
) -> Result<Frame> {
    read_request(
        device,
        buffer,
        server_address,
        function::READ_INPUT_REGISTERS,
        start,
        quantity,
    )
}

/// FC 05: Write Single Coil. `value` is normalized to the wire's `0x0000`/`0xFF00` convention.
pub fn write_coil(
    device: &Device,
    buffer: &mut [u8],
    server_address: u8,
    address: u16,
    value: bool,
) -> Result<Frame> {
    check_role(device)?;
    Ok(builder::build_frame(buffer)
        .for_address(server_address)
        .function(function::WRITE_COIL)
        .register(address)
        .register(if value { 0xFF00 } else { 0x0000 })
        .finalise())
}

/// FC 06: Preset Single Register.
pub fn write_holding_register(
    device: &Device,
    buffer: &mut [u8],
    server_address: u8,
    address: u16,
    value: u16,
) -> Result<Frame> {
    check_role(device)?;
    Ok(builder::build_frame(buffer)
        .for_address(server_address)
        .function(function::WRITE_HOLDING_REGISTER)
        .register(address)
        .register(value)
        .finalise())
}

/// FC 07: Read Exception Status. No request fields beyond address and function code.
pub fn read_exception_status(device: &Device, buffer: &mut [u8], server_address: u8) -> Result<Frame> {
    check_role(device)?;
    Ok(builder::build_frame(buffer)
        .for_address(server_address)
        .function(function::READ_EXCEPTION_STATUS)
        .finalise())
}

/// FC 08: Diagnostics.
pub fn diagnostics(
    device: &Device,
    buffer: &mut [u8],
    server_address: u8,
    subfunction: u16,
    data: u16,
) -> Result<Frame> {
    check_role(device)?;
    Ok(builder::build_frame(buffer)
        .for_address(server_address)
        .function(function::DIAGNOSTICS)
        .register(subfunction)
        .register(data)
        .finalise())
}

/// FC 16: Preset Multiple Registers.
pub fn write_multiple_registers(
    device: &Device,
    buffer: &mut [u8],
    server_address: u8,
    start: u16,
    registers: &[u16],
) -> Result<Frame> {
    check_role(device)?;
    Ok(builder::build_frame(buffer)
        .for_address(server_address)
        .function(function::WRITE_MULTIPLE_REGISTERS)
        .register(start)
        .count_registers(registers.iter().copied())
        .finalise())
}

/// FC 23: Read/Write Multiple Registers.
pub fn read_write_multiple_registers(
    device: &Device,
    buffer: &mut [u8],
    server_address: u8,
    read_start: u16,
    read_quantity: u16,
    write_start: u16,
    write_registers: &[u16],
) -> Result<Frame> {
    check_role(device)?;
    Ok(builder::build_frame(buffer)
        .for_address(server_address)
        .function(function::READ_WRITE_MULTIPLE_REGISTERS)
        .register(read_start)
        .register(read_quantity)
        .register(write_start)
        .count_registers(write_registers.iter().copied())
        .finalise())
}

/// Parses a received response `frame` into `output`, per spec §4.4.
///
/// `output.length` is always reset to 0 first. CRC has already been verified by
/// [`Frame::try_from`]; this only needs to branch on the exception bit and function code.
/// Exception responses leave `output.length == 0` — the caller is expected to read the
/// exception code directly from `frame.payload()[0]`.
pub fn parse_response(device: &Device, frame: &Frame, output: &mut TypedPayload) -> Result<()> {
    check_role(device)?;
    output.clear();

    if frame.function().is_exception() {
        return Ok(());
    }

    match frame.function().without_exception_bit() {
        function::READ_COILS | function::READ_DISCRETE_INPUTS => {
            output.set_bits(&frame.payload()[1..]);
        }
        function::READ_HOLDING_REGISTERS
        | function::READ_INPUT_REGISTERS
        | function::READ_WRITE_MULTIPLE_REGISTERS => {
            let byte_count = frame.payload()[0] as usize;
            let words = frame.payload()[1..1 + byte_count]
                .chunks_exact(2)
                .map(|w| ((w[0] as u16) << 8) | w[1] as u16);
            output.set_words(words);
        }
        function::WRITE_COIL | function::WRITE_HOLDING_REGISTER | function::WRITE_MULTIPLE_REGISTERS => {
            // acknowledgment only, no payload to surface
        }
        function::READ_EXCEPTION_STATUS => {
            output.set_byte(frame.payload()[0]);
        }
        function::DIAGNOSTICS => {
            // caller inspects the echoed subfunction/data directly
        }
        _ => return Err(Error::InvalidLength),
    }

    Ok(())
}

/// Recomputes and returns the CRC a frame built from `bytes` (sans CRC) would carry.
pub fn crc_of(bytes: &[u8]) -> u16 {
    crc::compute(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::payload::DataType;

    fn client() -> Device {
        Device::client()
    }

    #[test]
    fn read_holding_registers_matches_published_example() {
        let mut buf = [0u8; 20];
        let frame = read_holding_registers(&client(), &mut buf, 0x11, 0x6B, 0x03).unwrap();
        assert_eq!(
            frame.raw_bytes(),
            [0x11, 0x03, 0x00, 0x6B, 0x00, 0x03, 0x76, 0x87]
        );
    }

    #[test]
    fn write_coil_normalizes_bool_to_wire_values() {
        let mut buf = [0u8; 20];
        let frame = write_coil(&client(), &mut buf, 0x11, 0x00AC, true).unwrap();
        assert_eq!(
            frame.raw_bytes(),
            [0x11, 0x05, 0x00, 0xAC, 0xFF, 0x00, 0x4E, 0x8B]
        );
    }

    #[test]
    fn builders_reject_server_role() {
        let server = Device::server(1).unwrap();
        let mut buf = [0u8; 20];
        assert_eq!(
            read_holding_registers(&server, &mut buf, 0x11, 0, 1),
            Err(Error::RoleMismatch)
        );
    }

    #[test]
    fn parse_response_decodes_holding_registers() {
        let device = client();
        let bytes = [0x11u8, 0x03, 0x06, 0x02, 0x2B, 0x00, 0x00, 0x00, 0x64];
        let crc = crc::compute_be_bytes(&bytes);
        let mut full = [0u8; 11];
        full[..9].copy_from_slice(&bytes);
        full[9..11].copy_from_slice(&crc);
        let frame = Frame::try_from(&full[..]).unwrap();

        let mut output = TypedPayload::new();
        parse_response(&device, &frame, &mut output).unwrap();
        assert_eq!(output.r#type, DataType::Word);
        assert_eq!(output.length, 3);
        assert_eq!(output.words().collect::<Vec<_>>(), [0x022B, 0x0000, 0x0064]);
    }

    #[test]
    fn parse_response_leaves_exception_for_caller_to_inspect() {
        let device = client();
        let bytes = [0x11u8, 0x83, 0x02];
        let crc = crc::compute_be_bytes(&bytes);
        let mut full = [0u8; 5];
        full[..3].copy_from_slice(&bytes);
        full[3..5].copy_from_slice(&crc);
        let frame = Frame::try_from(&full[..]).unwrap();

        let mut output = TypedPayload::new();
        parse_response(&device, &frame, &mut output).unwrap();
        assert_eq!(output.length, 0);
        assert_eq!(frame.payload()[0], 0x02);
    }
}
