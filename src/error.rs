use std::fmt;
use std::io;

use nix::errno::Errno;

#[derive(Debug)]
pub enum Error {
    /// The I2C or port I/O transaction failed.
    Io(io::Error),
    /// Malformed or out-of-range text handed to a store.
    InvalidArgument(String),
    /// An adapter, bus or client could not be located.
    DeviceNotFound(String),
    /// A field description that can never be valid.
    InvalidField(String),
    ReadOnly(String),
    NoSuchAttribute(String),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        Error::InvalidArgument(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Error::DeviceNotFound(msg.into())
    }

    /// The errno a sysfs handler would hand back to the caller.
    pub fn errno(&self) -> Errno {
        match self {
            Error::Io(e) => e.raw_os_error().map(Errno::from_raw).unwrap_or(Errno::EIO),
            Error::InvalidArgument(_) | Error::InvalidField(_) => Errno::EINVAL,
            Error::DeviceNotFound(_) => Errno::ENODEV,
            Error::ReadOnly(_) => Errno::EACCES,
            Error::NoSuchAttribute(_) => Errno::ENOENT,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Io(e) => write!(f, "I/O error: {}", e),
            Error::InvalidArgument(m) => write!(f, "invalid argument: {}", m),
            Error::DeviceNotFound(m) => write!(f, "device not found: {}", m),
            Error::InvalidField(m) => write!(f, "invalid field: {}", m),
            Error::ReadOnly(m) => write!(f, "attribute '{}' is read-only", m),
            Error::NoSuchAttribute(m) => write!(f, "no attribute named '{}'", m),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for Error {
    fn from(e: io::Error) -> Self {
        Error::Io(e)
    }
}

impl From<Errno> for Error {
    fn from(e: Errno) -> Self {
        Error::Io(io::Error::from(e))
    }
}

impl From<Error> for io::Error {
    fn from(e: Error) -> Self {
        match e {
            Error::Io(e) => e,
            Error::InvalidArgument(m) | Error::InvalidField(m) => {
                io::Error::new(io::ErrorKind::InvalidInput, m)
            }
            Error::DeviceNotFound(m) | Error::NoSuchAttribute(m) => {
                io::Error::new(io::ErrorKind::NotFound, m)
            }
            Error::ReadOnly(m) => io::Error::new(io::ErrorKind::PermissionDenied, m),
        }
    }
}
