use super::RawLine;
use crate::error::DeviceError;
use futures_lite::io::AsyncReadExt;
use rustix::fs::{Mode, OFlags};
use rustix::termios::{self, OptionalActions};
use smol::Async;
use std::fs::File;
use std::future::Future;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// A stream of newline-terminated records from the bin controller.
pub(crate) trait LineSource {
    /// Wait for the next complete line. No retry: any error ends the cycle.
    fn next_line(&mut self) -> impl Future<Output = Result<RawLine, DeviceError>> + Send;

    /// Close the underlying handle. Calling it again is a no-op.
    fn release(&mut self);
}

/// Open descriptor of the device.
enum Port {
    /// Terminal or FIFO registered with the reactor. Dropping it closes the
    /// descriptor even while a read is pending.
    Polled(Async<File>),
    /// Regular file (a recorded session); reads never block.
    Plain(File),
}

impl Port {
    async fn read_byte(&mut self) -> io::Result<Option<u8>> {
        let mut byte = [0u8; 1];
        let n = match self {
            Port::Polled(file) => file.read(&mut byte).await?,
            Port::Plain(file) => file.read(&mut byte)?,
        };
        Ok((n == 1).then_some(byte[0]))
    }
}

/// Serial port, or any readable node such as a FIFO replaying a capture.
pub(crate) struct SerialDevice {
    path: PathBuf,
    port: Option<Port>,
}

impl SerialDevice {
    pub(crate) fn open(path: &Path, baud_rate: u32) -> Result<Self, DeviceError> {
        let open_err = |source: io::Error| DeviceError::Open {
            path: path.to_path_buf(),
            source,
        };

        // Read-only: a FIFO must see EOF once its writer goes away.
        let fd = rustix::fs::open(
            path,
            OFlags::RDONLY | OFlags::NONBLOCK | OFlags::NOCTTY | OFlags::CLOEXEC,
            Mode::empty(),
        )
        .map_err(|e| open_err(e.into()))?;
        let file = File::from(fd);

        let port = if file.metadata().map_err(open_err)?.is_file() {
            info!("Opened {} (recorded session)", path.display());
            Port::Plain(file)
        } else {
            if termios::isatty(&file) {
                Self::configure(&file, baud_rate).map_err(open_err)?;
                info!("Opened serial device {} at {} baud", path.display(), baud_rate);
            } else {
                info!("Opened {} (not a terminal, reading as-is)", path.display());
            }
            Port::Polled(Async::new(file).map_err(open_err)?)
        };

        Ok(Self {
            path: path.to_path_buf(),
            port: Some(port),
        })
    }

    fn configure(file: &File, baud_rate: u32) -> io::Result<()> {
        let mut attrs = termios::tcgetattr(file)?;
        attrs.make_raw();
        attrs.set_speed(baud_rate)?;
        termios::tcsetattr(file, OptionalActions::Now, &attrs)?;
        Ok(())
    }
}

impl LineSource for SerialDevice {
    /// Assembles one line a byte at a time, so nothing past the newline is
    /// taken off the device.
    async fn next_line(&mut self) -> Result<RawLine, DeviceError> {
        let port = self.port.as_mut().ok_or(DeviceError::Closed)?;
        let mut line = Vec::new();
        loop {
            match port.read_byte().await? {
                Some(byte) => {
                    line.push(byte);
                    if byte == b'\n' {
                        break;
                    }
                }
                None if line.is_empty() => return Err(DeviceError::Closed),
                None => break,
            }
        }
        Ok(RawLine::new(String::from_utf8_lossy(&line)))
    }

    fn release(&mut self) {
        if self.port.take().is_some() {
            info!("Closed serial device {}", self.path.display());
        } else {
            debug!("Serial device {} already closed", self.path.display());
        }
    }
}

impl Drop for SerialDevice {
    fn drop(&mut self) {
        if self.port.is_some() {
            self.release();
        }
    }
}
