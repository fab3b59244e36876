//! Serial port transport (tokio-serial).

use std::time::Duration;

use async_trait::async_trait;
use log::debug;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::time::timeout;
use tokio_serial::{SerialPortBuilderExt, SerialStream};

use crate::error::Result;
use crate::transport::Transport;

/// Transport over a local serial port.
///
/// Configured 8N1 without flow control, the controller's fixed framing.
/// The read timeout bounds every delimiter read; once the first byte of
/// a frame has arrived, the rest must arrive within the same window.
pub struct SerialTransport {
    port: SerialStream,
    timeout: Duration,
}

impl SerialTransport {
    /// Open a serial port, e.g. `/dev/ttyUSB0` or `COM4` at 500000 baud.
    pub fn open(path: &str, baud_rate: u32, read_timeout: Duration) -> Result<Self> {
        let port = tokio_serial::new(path, baud_rate)
            .data_bits(tokio_serial::DataBits::Eight)
            .parity(tokio_serial::Parity::None)
            .stop_bits(tokio_serial::StopBits::One)
            .flow_control(tokio_serial::FlowControl::None)
            .open_native_async()
            .map_err(std::io::Error::from)?;

        debug!("serial port '{}' opened at {} baud", path, baud_rate);
        Ok(Self {
            port,
            timeout: read_timeout,
        })
    }
}

#[async_trait]
impl Transport for SerialTransport {
    async fn write_all(&mut self, buf: &[u8]) -> Result<()> {
        self.port.write_all(buf).await?;
        self.port.flush().await?;
        Ok(())
    }

    async fn read_until(&mut self, delimiter: u8) -> Result<Vec<u8>> {
        let mut frame = Vec::new();
        let mut byte = [0u8; 1];

        loop {
            match timeout(self.timeout, self.port.read(&mut byte)).await {
                // Quiet link before the first byte: the no-more-data signal.
                Err(_) if frame.is_empty() => return Ok(frame),
                Err(_) => {
                    return Err(std::io::Error::new(
                        std::io::ErrorKind::TimedOut,
                        "serial read timed out mid-frame",
                    )
                    .into())
                }
                Ok(Ok(0)) => {
                    return Err(std::io::Error::new(
                        std::io::ErrorKind::UnexpectedEof,
                        "serial port closed",
                    )
                    .into())
                }
                Ok(Ok(_)) => {
                    frame.push(byte[0]);
                    if byte[0] == delimiter {
                        return Ok(frame);
                    }
                }
                Ok(Err(e)) => return Err(e.into()),
            }
        }
    }
}
