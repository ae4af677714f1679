/// Byte-level transport between the protocol engine and the weather station
use log::debug;
use serialport::{ClearBuffer, DataBits, FlowControl, Parity, SerialPort, StopBits};
use std::io::{self, Read, Write};
use std::time::Duration;

// Line settings required by the WS2300 family
const BAUD_RATE: u32 = 2400;
const READ_TIMEOUT: Duration = Duration::from_millis(500);

/// Duplex byte stream used by the protocol engine.
///
/// `read_byte` is only called after `bytes_available` reported pending data, so
/// implementations may treat reading from an empty buffer as an error.
pub trait ByteChannel {
    fn write_byte(&mut self, byte: u8) -> io::Result<()>;

    fn flush(&mut self) -> io::Result<()>;

    fn bytes_available(&mut self) -> io::Result<usize>;

    fn read_byte(&mut self) -> io::Result<u8>;

    /// Drop any received bytes that have not been read yet.
    fn discard_buffered(&mut self) -> io::Result<()>;
}

impl<C: ByteChannel + ?Sized> ByteChannel for &mut C {
    fn write_byte(&mut self, byte: u8) -> io::Result<()> {
        (**self).write_byte(byte)
    }

    fn flush(&mut self) -> io::Result<()> {
        (**self).flush()
    }

    fn bytes_available(&mut self) -> io::Result<usize> {
        (**self).bytes_available()
    }

    fn read_byte(&mut self) -> io::Result<u8> {
        (**self).read_byte()
    }

    fn discard_buffered(&mut self) -> io::Result<()> {
        (**self).discard_buffered()
    }
}

/// Serial port connection to the station. The port is closed when the value is dropped.
pub struct SerialChannel {
    port: Box<dyn SerialPort>,
    device: String,
}

impl SerialChannel {
    /// Open the serial device with the station's fixed line settings
    ///
    /// 2400 baud, 8N1, no flow control. RTS is raised and DTR lowered, which
    /// powers the station's interface circuit.
    pub fn open(device: &str) -> io::Result<Self> {
        let mut port = serialport::new(device, BAUD_RATE)
            .data_bits(DataBits::Eight)
            .stop_bits(StopBits::One)
            .parity(Parity::None)
            .flow_control(FlowControl::None)
            .timeout(READ_TIMEOUT)
            .open()
            .map_err(io::Error::from)?;

        port.write_request_to_send(true).map_err(io::Error::from)?;
        port.write_data_terminal_ready(false).map_err(io::Error::from)?;

        debug!("Serial device '{}' opened at {} baud", device, BAUD_RATE);

        Ok(SerialChannel {
            port,
            device: device.to_string(),
        })
    }
}

impl ByteChannel for SerialChannel {
    fn write_byte(&mut self, byte: u8) -> io::Result<()> {
        self.port.write_all(&[byte])
    }

    fn flush(&mut self) -> io::Result<()> {
        self.port.flush()
    }

    fn bytes_available(&mut self) -> io::Result<usize> {
        let pending = self.port.bytes_to_read().map_err(io::Error::from)?;
        Ok(pending as usize)
    }

    fn read_byte(&mut self) -> io::Result<u8> {
        let mut buf = [0u8; 1];
        self.port.read_exact(&mut buf)?;
        Ok(buf[0])
    }

    fn discard_buffered(&mut self) -> io::Result<()> {
        self.port.clear(ClearBuffer::Input).map_err(io::Error::from)
    }
}

impl Drop for SerialChannel {
    fn drop(&mut self) {
        debug!("Serial device '{}' closed", self.device);
    }
}
