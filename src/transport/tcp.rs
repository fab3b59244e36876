//! Serial-over-TCP transport.
//!
//! Lab serial bridges (ser2net, Moxa NPort and friends) expose the
//! controller's serial line on a TCP port. Framing is identical to the
//! direct serial case.

use std::time::Duration;

use async_trait::async_trait;
use log::debug;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::time::timeout;

use crate::error::Result;
use crate::transport::Transport;

/// Transport over a TCP connection to a serial bridge.
pub struct TcpTransport {
    stream: BufReader<TcpStream>,
    timeout: Duration,
}

impl TcpTransport {
    /// Connect to `host:port`.
    pub async fn connect(addr: &str, read_timeout: Duration) -> Result<Self> {
        let stream = TcpStream::connect(addr).await?;
        stream.set_nodelay(true)?;
        debug!("connected to serial bridge at {}", addr);
        Ok(Self {
            stream: BufReader::new(stream),
            timeout: read_timeout,
        })
    }
}

#[async_trait]
impl Transport for TcpTransport {
    async fn write_all(&mut self, buf: &[u8]) -> Result<()> {
        self.stream.get_mut().write_all(buf).await?;
        self.stream.get_mut().flush().await?;
        Ok(())
    }

    async fn read_until(&mut self, delimiter: u8) -> Result<Vec<u8>> {
        let mut frame = Vec::new();
        match timeout(self.timeout, self.stream.read_until(delimiter, &mut frame)).await {
            // Quiet link: the no-more-data signal. Mid-frame silence is a
            // real timeout, the bridge left us desynchronized.
            Err(_) if frame.is_empty() => Ok(frame),
            Err(_) => Err(std::io::Error::new(
                std::io::ErrorKind::TimedOut,
                "tcp read timed out mid-frame",
            )
            .into()),
            Ok(Ok(0)) => Err(std::io::Error::new(
                std::io::ErrorKind::UnexpectedEof,
                "serial bridge closed the connection",
            )
            .into()),
            Ok(Ok(_)) => Ok(frame),
            Ok(Err(e)) => Err(e.into()),
        }
    }
}
