//! Driver configuration.
//!
//! Settings are loaded from a TOML file with environment-variable
//! overrides (prefix `OMICRON_`), e.g.:
//!
//! ```toml
//! url = "serial:///dev/ttyUSB0"   # or "tcp://bridge.lab:5000"
//! baud_rate = 500000
//! timeout_ms = 500
//! ```

use std::time::Duration;

use serde::Deserialize;

use crate::error::Result;
#[cfg(feature = "serial")]
use crate::transport::SerialTransport;
use crate::transport::{TcpTransport, Transport};

/// Transport endpoint and timing settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LaserSettings {
    /// Endpoint URL: `serial://<path>` (or a bare path) for a local
    /// port, `tcp://<host>:<port>` for a serial bridge.
    pub url: String,
    /// Baud rate for local serial ports. The controller's USB-CDC
    /// interface runs at 500000 baud.
    pub baud_rate: u32,
    /// Read timeout per delimiter read, in milliseconds. Also bounds the
    /// multi-frame sequences, which have no internal retry limit.
    pub timeout_ms: u64,
}

impl Default for LaserSettings {
    fn default() -> Self {
        Self {
            url: "serial:///dev/ttyUSB0".to_string(),
            baud_rate: 500_000,
            timeout_ms: 500,
        }
    }
}

impl LaserSettings {
    /// Load settings from `path` (optional file) overlaid with
    /// `OMICRON_*` environment variables.
    pub fn load(path: &str) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(path).required(false))
            .add_source(config::Environment::with_prefix("OMICRON"))
            .build()?;
        Ok(settings.try_deserialize()?)
    }

    /// Read timeout as a [`Duration`].
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Open the transport this configuration describes.
    pub async fn open_transport(&self) -> Result<Box<dyn Transport>> {
        if let Some(addr) = self.url.strip_prefix("tcp://") {
            return Ok(Box::new(TcpTransport::connect(addr, self.timeout()).await?));
        }

        #[cfg(feature = "serial")]
        {
            let path = self.url.strip_prefix("serial://").unwrap_or(&self.url);
            Ok(Box::new(SerialTransport::open(
                path,
                self.baud_rate,
                self.timeout(),
            )?))
        }

        #[cfg(not(feature = "serial"))]
        {
            Err(crate::error::LaserError::Config(
                config::ConfigError::Message(format!(
                    "'{}' is not a tcp:// url and serial support is not enabled; \
                     rebuild with --features serial",
                    self.url
                )),
            ))
        }
    }
}
