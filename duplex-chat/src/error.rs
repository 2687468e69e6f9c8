use std::io;

use thiserror::Error;

/// A session could not be assembled because one of its I/O ends is missing.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum SetupError {
    #[error("no network input stream was provided")]
    MissingNetworkReader,
    #[error("no network output stream was provided")]
    MissingNetworkWriter,
    #[error("no user input source was provided")]
    MissingUserInput,
    #[error("no user output sink was provided")]
    MissingUserOutput,
}

/// Failure while reading or forwarding one unit. Always terminal for the pump.
#[derive(Debug, Error)]
pub enum PumpError {
    #[error("i/o failure: {0}")]
    Io(#[from] io::Error),
    #[error("undecodable unit on the wire: {0}")]
    Decode(#[source] io::Error),
}

impl PumpError {
    /// Sorts an error coming out of the codec: `InvalidData` means the peer
    /// sent something we cannot decode, anything else is a transport failure.
    pub fn from_read(err: io::Error) -> Self {
        if err.kind() == io::ErrorKind::InvalidData {
            Self::Decode(err)
        } else {
            Self::Io(err)
        }
    }
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("{pump} pump task failed: {source}")]
    PumpTask {
        pump: &'static str,
        #[source]
        source: tokio::task::JoinError,
    },
}
