//! Sample sources: anything that yields newline-delimited text lines.
//!
//! [`open_device`] opens a serial device (or a plain file standing in for
//! one) and wraps it in a [`LineReader`]. Serial ports are switched to
//! 9600 baud 8N1 with a 100 ms read timeout so a quiet device never blocks
//! the ingest loop for long: termios on Unix, `DCB` and `COMMTIMEOUTS` on
//! Windows.

use std::collections::VecDeque;
use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

use log::warn;

use crate::error::{Result, ThermologError};

/// Size of a single read from the underlying device.
const READ_CHUNK: usize = 256;

/// Longest partial line kept while waiting for its `\n`.
pub const MAX_LINE_BYTES: usize = 4096;

/// Producer of text lines, one sample per line.
pub trait SampleSource {
    /// Return the next complete line, without its terminator.
    ///
    /// `Ok(None)` means "nothing available right now, try later" and is not an
    /// error. `Err` is reserved for genuine device failures.
    fn read_line(&mut self) -> io::Result<Option<String>>;
}

impl<S: SampleSource + ?Sized> SampleSource for Box<S> {
    fn read_line(&mut self) -> io::Result<Option<String>> {
        (**self).read_line()
    }
}

/// Splits any byte stream into lines.
///
/// Partial lines are kept across calls until their `\n` arrives. Carriage
/// returns are dropped and invalid UTF-8 is replaced. A line longer than
/// [`MAX_LINE_BYTES`] is thrown away up to and including its `\n`.
#[derive(Debug)]
pub struct LineReader<R> {
    inner: R,
    pending: Vec<u8>,
    ready: VecDeque<String>,
    /// Set while skipping the rest of an overlong line.
    overflowed: bool,
}

impl<R: Read> LineReader<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            pending: Vec::new(),
            ready: VecDeque::new(),
            overflowed: false,
        }
    }

    /// Consume the reader, returning the underlying stream.
    pub fn into_inner(self) -> R {
        self.inner
    }

    fn fill(&mut self) -> io::Result<usize> {
        let mut buf = [0u8; READ_CHUNK];
        let n = match self.inner.read(&mut buf) {
            Ok(n) => n,
            Err(e)
                if matches!(
                    e.kind(),
                    io::ErrorKind::Interrupted | io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut
                ) =>
            {
                0
            }
            Err(e) => return Err(e),
        };
        for &byte in &buf[..n] {
            match byte {
                b'\n' if self.overflowed => self.overflowed = false,
                b'\n' => {
                    let line = String::from_utf8_lossy(&self.pending).into_owned();
                    self.pending.clear();
                    self.ready.push_back(line);
                }
                b'\r' => {}
                _ if self.overflowed => {}
                _ if self.pending.len() >= MAX_LINE_BYTES => {
                    warn!("discarding sample line longer than {MAX_LINE_BYTES} bytes");
                    self.pending.clear();
                    self.overflowed = true;
                }
                other => self.pending.push(other),
            }
        }
        Ok(n)
    }
}

impl<R: Read> SampleSource for LineReader<R> {
    fn read_line(&mut self) -> io::Result<Option<String>> {
        if self.ready.is_empty() {
            self.fill()?;
        }
        Ok(self.ready.pop_front())
    }
}

/// Open a serial device or simulation file as a line source.
pub fn open_device(port: &str) -> Result<LineReader<File>> {
    open_file(Path::new(port))
        .and_then(|file| {
            configure_tty(&file)?;
            Ok(file)
        })
        .map(LineReader::new)
        .map_err(|source| ThermologError::SourceUnavailable {
            port: port.to_string(),
            source,
        })
}

#[cfg(unix)]
fn open_file(path: &Path) -> io::Result<File> {
    use std::os::unix::fs::OpenOptionsExt;

    std::fs::OpenOptions::new()
        .read(true)
        .custom_flags(libc::O_NOCTTY)
        .open(path)
}

#[cfg(not(unix))]
fn open_file(path: &Path) -> io::Result<File> {
    File::open(path)
}

/// Put a TTY into 9600 8N1 raw-ish mode with a 100 ms read timeout.
/// Regular files are left alone.
#[cfg(unix)]
fn configure_tty(file: &File) -> io::Result<()> {
    use std::os::unix::io::AsRawFd;

    let fd = file.as_raw_fd();
    // SAFETY: fd is a valid open descriptor owned by `file` for this call.
    if unsafe { libc::isatty(fd) } != 1 {
        return Ok(());
    }

    // SAFETY: termios is plain old data; tcgetattr fills it before use.
    let mut tty: libc::termios = unsafe { std::mem::zeroed() };
    // SAFETY: fd is a TTY and tty points to a valid termios struct.
    if unsafe { libc::tcgetattr(fd, &mut tty) } != 0 {
        return Err(io::Error::last_os_error());
    }

    // SAFETY: tty is a valid, initialised termios struct.
    unsafe {
        libc::cfsetispeed(&mut tty, libc::B9600);
        libc::cfsetospeed(&mut tty, libc::B9600);
    }
    tty.c_cflag |= libc::CLOCAL | libc::CREAD;
    tty.c_cflag &= !(libc::PARENB | libc::CSTOPB | libc::CSIZE);
    tty.c_cflag |= libc::CS8;
    tty.c_lflag &= !(libc::ICANON | libc::ECHO | libc::ECHOE | libc::ISIG);
    // Return after at most 100 ms even when no byte arrived.
    tty.c_cc[libc::VMIN] = 0;
    tty.c_cc[libc::VTIME] = 1;

    // SAFETY: fd is a TTY and tty is a valid termios struct.
    if unsafe { libc::tcsetattr(fd, libc::TCSANOW, &tty) } != 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(())
}

/// Put a COM port into 9600 8N1 with a 100 ms read timeout.
/// Handles that are not comm devices (simulation files) are left alone.
#[cfg(windows)]
fn configure_tty(file: &File) -> io::Result<()> {
    use std::os::windows::io::AsRawHandle;

    use windows_sys::Win32::Devices::Communication::{
        DCB, GetCommState, SetCommState, SetCommTimeouts,
    };
    use windows_sys::Win32::Foundation::HANDLE;

    let handle = file.as_raw_handle() as HANDLE;
    // SAFETY: DCB is plain old data; GetCommState fills it before use.
    let mut dcb: DCB = unsafe { std::mem::zeroed() };
    dcb.DCBlength = std::mem::size_of::<DCB>() as u32;
    // SAFETY: handle is owned by `file` for this call and dcb is valid.
    if unsafe { GetCommState(handle, &mut dcb) } == 0 {
        return Ok(());
    }

    apply_serial_settings(&mut dcb);
    // SAFETY: handle is a comm device and dcb was filled by GetCommState.
    if unsafe { SetCommState(handle, &dcb) } == 0 {
        return Err(io::Error::last_os_error());
    }
    let timeouts = read_timeouts();
    // SAFETY: handle is a comm device and timeouts is a valid struct.
    if unsafe { SetCommTimeouts(handle, &timeouts) } == 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(())
}

#[cfg(windows)]
fn apply_serial_settings(dcb: &mut windows_sys::Win32::Devices::Communication::DCB) {
    use windows_sys::Win32::Devices::Communication::{NOPARITY, ONESTOPBIT};

    dcb.BaudRate = 9600;
    dcb.ByteSize = 8;
    dcb.StopBits = ONESTOPBIT;
    dcb.Parity = NOPARITY;
}

/// Return whatever has arrived at once, or wait at most 100 ms for a byte.
#[cfg(windows)]
fn read_timeouts() -> windows_sys::Win32::Devices::Communication::COMMTIMEOUTS {
    windows_sys::Win32::Devices::Communication::COMMTIMEOUTS {
        ReadIntervalTimeout: u32::MAX,
        ReadTotalTimeoutMultiplier: u32::MAX,
        ReadTotalTimeoutConstant: 100,
        WriteTotalTimeoutMultiplier: 0,
        WriteTotalTimeoutConstant: 0,
    }
}

#[cfg(not(any(unix, windows)))]
fn configure_tty(_file: &File) -> io::Result<()> {
    Ok(())
}
