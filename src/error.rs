//! Unified error type.

use std::fmt;

/// The error type returned by torii's fallible operations.
///
/// Application-level failures (404, 422, etc.) are expressed as HTTP
/// [`Response`](crate::Response) values, never as `Error`s. This type covers
/// infrastructure only: a bind address that doesn't parse, or the socket
/// refusing to bind or accept.
#[derive(Debug)]
pub enum Error {
    Io(std::io::Error),
    Addr(std::net::AddrParseError),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(e) => write!(f, "io: {e}"),
            Self::Addr(e) => write!(f, "bind address: {e}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            Self::Addr(e) => Some(e),
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}

impl From<std::net::AddrParseError> for Error {
    fn from(e: std::net::AddrParseError) -> Self {
        Self::Addr(e)
    }
}
