use thiserror::Error;

/// Errors that can occur while driving an FT245R relay board.
///
/// Transport and session failures are always returned as values of this
/// type; the controller layer decides which of them are fatal for a run
/// and which are recoverable (see the crate docs on the error taxonomy).
#[derive(Error, Debug)]
pub enum Error {
    /// Error from the underlying USB stack.
    #[error("USB error: {0}")]
    Usb(#[from] nusb::Error),
    /// A USB bulk transfer failed or was cut short.
    #[error("USB transfer error: {0}")]
    Transfer(#[from] nusb::transfer::TransferError),
    /// No adapter was found with the requested vendor/product ID.
    #[error("no FTDI adapter found with the specified VID/PID")]
    DeviceNotFound,
    /// The adapter interface is claimed by another driver or process.
    ///
    /// During `DeviceSession::open` this condition is tolerated (the
    /// session proceeds and later I/O reports [`Error::NotClaimed`] if
    /// the claim really is held elsewhere); everywhere else it is fatal.
    #[error("adapter interface is already claimed")]
    DeviceBusy,
    /// I/O was attempted on a session whose interface claim never
    /// succeeded.
    #[error("adapter interface is not claimed; cannot transfer")]
    NotClaimed,
    /// The adapter answered a control read with no data.
    #[error("adapter unavailable (empty control response)")]
    DeviceUnavailable,
    /// Relay channel number outside 1-8.
    #[error("relay channel {channel} out of range (must be 1-8)")]
    InvalidChannel {
        /// The rejected channel number.
        channel: u8,
    },
    /// A write or pin read was attempted before the session was
    /// configured for bit-bang operation.
    #[error("session is not configured for bit-bang I/O")]
    NotConfigured,
    /// The session has already been closed.
    #[error("session is closed")]
    SessionClosed,
    /// The requested baud rate cannot be produced by the chip's clock
    /// divider within tolerance.
    #[error("baud rate {requested} not achievable (nearest {actual})")]
    UnsupportedBaudRate {
        /// The rate that was asked for.
        requested: u32,
        /// The closest rate the divider can produce.
        actual: u32,
    },
    /// A function argument is outside the valid range.
    #[error("invalid argument: {0}")]
    InvalidArgument(&'static str),
    /// The synchronous-mode echo bytes for a completed write could not
    /// be drained. Subsequent writes may stall until the adapter is
    /// purged or reset.
    #[error("bit-bang echo drain incomplete (expected {expected} bytes, drained {drained})")]
    EchoDrain {
        /// Echo bytes the adapter was expected to queue.
        expected: usize,
        /// Echo bytes actually read back.
        drained: usize,
    },
}

/// Result type alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;
