// Error taxonomy for the REPL bridge
//
// Library code returns `BridgeError`; the binary and the config loader use
// anyhow on top of it.

use std::io;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, BridgeError>;

#[derive(Debug, Error)]
pub enum BridgeError {
    /// The evaluation server could not be reached, or it did not speak nREPL.
    #[error("Unable to connect to repl at url '{url}': {reason}")]
    Connect { url: String, reason: String },

    /// Transport or pipe failure during a running session.
    #[error("REPL I/O error: {0}")]
    Io(#[from] io::Error),

    /// A response fragment was not valid UTF-8.
    #[error("Unable to convert response to UTF-8: ({partial})")]
    Encoding { partial: String },

    /// Malformed bencode on the wire.
    #[error("nREPL protocol error: {0}")]
    Protocol(String),

    /// Operation the nREPL process surface does not provide.
    #[error("unsupported operation: {0}")]
    Unsupported(&'static str),
}

impl BridgeError {
    pub fn connect(url: impl Into<String>, reason: impl ToString) -> Self {
        BridgeError::Connect {
            url: url.into(),
            reason: reason.to_string(),
        }
    }

    /// Wrap for crossing an `std::io::{Read, Write}` boundary.
    ///
    /// `Io` errors pass through unchanged so their kind survives.
    pub fn into_io(self) -> io::Error {
        match self {
            BridgeError::Io(e) => e,
            BridgeError::Unsupported(op) => io::Error::new(io::ErrorKind::Unsupported, op),
            other => io::Error::other(other),
        }
    }

    /// Inverse of [`BridgeError::into_io`].
    pub fn from_io(err: io::Error) -> Self {
        match err.downcast::<BridgeError>() {
            Ok(bridge) => bridge,
            Err(err) => BridgeError::Io(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_io_roundtrip_keeps_variant() {
        let err = BridgeError::Encoding {
            partial: "user=>".to_string(),
        };
        match BridgeError::from_io(err.into_io()) {
            BridgeError::Encoding { partial } => assert_eq!(partial, "user=>"),
            other => panic!("Expected encoding error, got {:?}", other),
        }
    }

    #[test]
    fn test_plain_io_error_stays_io() {
        let io_err = io::Error::new(io::ErrorKind::BrokenPipe, "gone");
        match BridgeError::from_io(io_err) {
            BridgeError::Io(e) => assert_eq!(e.kind(), io::ErrorKind::BrokenPipe),
            other => panic!("Expected io error, got {:?}", other),
        }
    }

    #[test]
    fn test_unsupported_maps_to_io_kind() {
        let io_err = BridgeError::Unsupported("exitValue").into_io();
        assert_eq!(io_err.kind(), io::ErrorKind::Unsupported);
    }

    #[test]
    fn test_connect_message_names_url() {
        let err = BridgeError::connect("nrepl://localhost:54050", "connection refused");
        assert!(err.to_string().contains("nrepl://localhost:54050"));
        assert!(err.to_string().contains("connection refused"));
    }
}
