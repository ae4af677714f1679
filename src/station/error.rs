use thiserror::Error;

/// Failures surfaced by the station protocol engine.
///
/// "No data" is not an error: a read that returns the all-zero sentinel yields `Ok(None)`.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// The station never answered a request byte within the retry budget.
    #[error("no response to request 0x{request:02X} after {attempts} attempts")]
    NoResponse { request: u8, attempts: u32 },

    /// The station never acknowledged the reset command with 0x02.
    #[error("station reset not acknowledged after {attempts} attempts")]
    ResetFailed { attempts: u32 },

    /// Dropped bytes or checksum mismatches exhausted the read retry budget.
    #[error("reading {length} byte(s) at address 0x{address:04X} failed")]
    ReadFailed { address: u16, length: usize },

    /// The host asked for shutdown between two field reads.
    #[error("poll interrupted by shutdown")]
    Interrupted,

    /// Channel-level fault such as a disconnected device.
    #[error("serial channel error: {0}")]
    Io(#[from] std::io::Error),
}
