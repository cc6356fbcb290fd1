//! Serial command backend.
//!
//! Line protocol, one command per `\n`-terminated line:
//!
//! | sent        | meaning                                  |
//! |-------------|------------------------------------------|
//! | `NIGHT:ON`  | switch night mode on                     |
//! | `NIGHT:OFF` | switch night mode off                    |
//! | `STATUS?`   | reply with a line containing one of the above |
//!
//! The tty is configured raw with `VMIN = 0` and `VTIME` set from the serial timeout, so a
//! read that gets no data returns zero bytes after the timeout instead of blocking.

use std::fs::{File, OpenOptions};
use std::io::{self, ErrorKind, Read, Write};
use std::os::unix::io::AsRawFd;
use std::thread;
use std::time::Duration;

use super::{ActuationBackend, BackendError, DeviceStatus};
use crate::common::constants::{SERIAL_NIGHT_OFF, SERIAL_NIGHT_ON, SERIAL_STATUS_QUERY};
use crate::config::ControllerConfig;

/// Longest status reply we are willing to buffer.
const MAX_RESPONSE_LEN: usize = 256;

/// A bidirectional byte stream to the device.
pub trait SerialLink: Read + Write + Send {
    /// Drop whatever the device sent that nobody has read yet.
    fn discard_input(&mut self) -> io::Result<()>;
}

impl SerialLink for File {
    fn discard_input(&mut self) -> io::Result<()> {
        termios::tcflush(self.as_raw_fd(), termios::os::target::TCIFLUSH)
    }
}

/// Opens the link on demand.
pub type LinkOpener = Box<dyn FnMut() -> io::Result<Box<dyn SerialLink>> + Send>;

/// Sends protocol lines over a serial link.
pub struct SerialBackend {
    port: String,
    opener: LinkOpener,
    link: Option<Box<dyn SerialLink>>,
    settle_delay: Duration,
}

impl SerialBackend {
    /// Backend for the tty named in the configuration.
    pub fn from_config(config: &ControllerConfig) -> Self {
        let port = config.serial_port.clone();
        let baud_rate = config.baud_rate;
        let timeout = config.serial_timeout();

        let path = port.clone();
        let opener: LinkOpener = Box::new(move || {
            open_serial_port(&path, baud_rate, timeout)
                .map(|file| Box::new(file) as Box<dyn SerialLink>)
        });

        Self::with_opener(port, opener, config.toggle_delay())
    }

    /// Backend over an arbitrary link source.
    pub fn with_opener(port: String, opener: LinkOpener, settle_delay: Duration) -> Self {
        Self {
            port,
            opener,
            link: None,
            settle_delay,
        }
    }

    pub fn is_open(&self) -> bool {
        self.link.is_some()
    }

    /// Open the link if it is not open yet.
    pub fn open(&mut self) -> Result<(), BackendError> {
        if self.link.is_none() {
            let link = (self.opener)()
                .map_err(|e| BackendError::NotOpen(format!("{} ({e})", self.port)))?;
            self.link = Some(link);
        }
        Ok(())
    }

    fn send_line(&mut self, line: &str) -> Result<(), BackendError> {
        self.open()?;
        let Some(link) = self.link.as_mut() else {
            return Err(BackendError::NotOpen(self.port.clone()));
        };

        let result = link
            .write_all(format!("{line}\n").as_bytes())
            .and_then(|()| link.flush());

        if let Err(e) = result {
            // Unplugged adapters keep failing; reopen on the next attempt.
            self.link = None;
            return Err(BackendError::Io(e));
        }
        Ok(())
    }

    fn read_line(&mut self) -> Result<String, BackendError> {
        let Some(link) = self.link.as_mut() else {
            return Err(BackendError::NotOpen(self.port.clone()));
        };

        let mut response = Vec::new();
        let mut byte = [0u8; 1];
        loop {
            match link.read(&mut byte) {
                Ok(0) => break,
                Ok(_) if byte[0] == b'\n' => break,
                Ok(_) => {
                    response.push(byte[0]);
                    if response.len() >= MAX_RESPONSE_LEN {
                        break;
                    }
                }
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) if matches!(e.kind(), ErrorKind::TimedOut | ErrorKind::WouldBlock) => {
                    break;
                }
                Err(e) => {
                    self.link = None;
                    return Err(BackendError::Io(e));
                }
            }
        }

        Ok(String::from_utf8_lossy(&response).trim().to_string())
    }
}

/// Parse a status reply.
pub fn parse_status(response: &str) -> DeviceStatus {
    let upper = response.to_ascii_uppercase();
    if upper.contains(SERIAL_NIGHT_OFF) {
        DeviceStatus::Off
    } else if upper.contains(SERIAL_NIGHT_ON) {
        DeviceStatus::On
    } else {
        DeviceStatus::Unknown
    }
}

impl ActuationBackend for SerialBackend {
    fn toggle(&mut self, target: bool) -> Result<(), BackendError> {
        let command = if target {
            SERIAL_NIGHT_ON
        } else {
            SERIAL_NIGHT_OFF
        };
        self.send_line(command)?;
        thread::sleep(self.settle_delay);
        Ok(())
    }

    fn query_status(&mut self) -> DeviceStatus {
        // Late replies and acks must not be taken for the answer to this query.
        if self.open().is_err() {
            return DeviceStatus::Unknown;
        }
        let discarded = self.link.as_mut().map(|link| link.discard_input());
        if matches!(discarded, Some(Err(_))) {
            self.link = None;
            return DeviceStatus::Unknown;
        }

        // Any failure on the way is just "don't know".
        if self.send_line(SERIAL_STATUS_QUERY).is_err() {
            return DeviceStatus::Unknown;
        }
        self.read_line()
            .map(|response| parse_status(&response))
            .unwrap_or(DeviceStatus::Unknown)
    }

    fn supports_status(&self) -> bool {
        true
    }

    fn name(&self) -> &'static str {
        "serial"
    }
}

/// Open a tty and configure it raw at `baud_rate` with a read timeout.
pub fn open_serial_port(path: &str, baud_rate: u32, timeout: Duration) -> io::Result<File> {
    use termios::os::target::{
        B1200, B2400, B4800, B9600, B19200, B38400, B57600, B115200, CLOCAL, CREAD, TCIOFLUSH,
        TCSANOW, VMIN, VTIME,
    };
    use termios::{Termios, cfmakeraw, cfsetspeed, tcflush, tcsetattr};

    let speed = match baud_rate {
        1200 => B1200,
        2400 => B2400,
        4800 => B4800,
        9600 => B9600,
        19200 => B19200,
        38400 => B38400,
        57600 => B57600,
        115200 => B115200,
        other => {
            return Err(io::Error::new(
                ErrorKind::InvalidInput,
                format!("unsupported baud rate {other}"),
            ));
        }
    };

    let file = OpenOptions::new().read(true).write(true).open(path)?;
    let fd = file.as_raw_fd();

    let mut tty = Termios::from_fd(fd)?;
    cfmakeraw(&mut tty);
    tty.c_cflag |= CLOCAL | CREAD;
    cfsetspeed(&mut tty, speed)?;
    tty.c_cc[VMIN] = 0;
    // VTIME counts tenths of a second.
    tty.c_cc[VTIME] = (timeout.as_millis() / 100).clamp(1, 255) as u8;
    tcsetattr(fd, TCSANOW, &tty)?;
    tcflush(fd, TCIOFLUSH)?;

    Ok(file)
}
