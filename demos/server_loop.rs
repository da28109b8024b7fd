use modbus_rtu_frames::callbacks::DataObjects;
use modbus_rtu_frames::device::Device;
use modbus_rtu_frames::{exception, server, Exception};

const ADDRESS: u8 = 1;

struct HoldingRegisters([u16; 5]);

impl DataObjects for HoldingRegisters {
    fn get_holding_register(&self, address: u16) -> Result<u16, Exception> {
        self.0
            .get(address as usize)
            .copied()
            .ok_or(exception::ILLEGAL_DATA_ADDRESS)
    }

    fn set_holding_register(&mut self, address: u16, value: u16) -> Result<(), Exception> {
        *self
            .0
            .get_mut(address as usize)
            .ok_or(exception::ILLEGAL_DATA_ADDRESS)? = value;
        Ok(())
    }
}

fn main() {
    let mut device = Device::server(ADDRESS).unwrap();
    let mut registers = HoldingRegisters([0, 3, 6, 9, 12]);

    // a transport collaborator hands us complete received frames; this stands in for one
    let received = receive_frame();

    let mut response_buffer = [0u8; 256];
    // process_request validates length and CRC itself; too short or bad CRC falls through to
    // `None`, and the Modbus convention is to say nothing and let the client's own timeout
    // handle it
    if let Some(response) =
        server::process_request(&mut device, &mut registers, &received, &mut response_buffer)
    {
        transmit_frame(response.raw_bytes());
    }
}

fn receive_frame() -> [u8; 8] {
    // read holding registers, starting address 1, quantity 3, valid CRC
    [0x01, 0x03, 0x00, 0x01, 0x00, 0x03, 0x54, 0x0B]
}

fn transmit_frame(bytes: &[u8]) {
    let _ = bytes;
    // hand `bytes` to the UART/RS-485 transport
}
