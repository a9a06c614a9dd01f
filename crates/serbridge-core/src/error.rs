use std::io;
use thiserror::Error;

/// Everything that can end a bridge run.
///
/// Each variant renders as `<description>: <underlying error>`, which is the
/// exact line written to the error stream.
#[derive(Debug, Error)]
pub enum BridgeError {
    #[error("Failed to open serial port: {0}")]
    Open(#[source] serialport::Error),

    #[error("Error while getting stdin info: {0}")]
    StdinInfo(#[source] io::Error),

    #[error("Error while reading from stdin: {0}")]
    StdinRead(#[source] io::Error),

    #[error("Failed to write to serial port: {0}")]
    DeviceWrite(#[source] io::Error),

    #[error("Failed to read from serial port: {0}")]
    DeviceRead(#[source] io::Error),

    #[error("Failed to write to stdout: {0}")]
    Output(#[source] io::Error),

    #[error("Failed to close serial port: {0}")]
    Close(#[source] io::Error),
}

pub type Result<T> = std::result::Result<T, BridgeError>;
