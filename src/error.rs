use std::io;

use thiserror::Error;

/// Failure to reach the presentation side.
#[derive(Debug, Error)]
pub enum PortError {
    #[error("presentation thread is no longer running")]
    Disconnected,
}

#[derive(Debug, Error)]
pub enum TermError {
    #[error("terminal I/O failed: {0}")]
    Io(#[from] io::Error),
    #[error("terminal is too small: {width}x{height}")]
    TooSmall { width: u16, height: u16 },
}
