//! Adapter session lifecycle: open, configure, raw I/O, teardown.

use log::{debug, warn};

use crate::bridge::{BitbangMode, Bridge};
use crate::consts::{ALL_OUTPUTS_MASK, DEFAULT_BAUD_RATE, DEFAULT_LATENCY_TIMER_MS};
use crate::error::{Error, Result};

/// Configuration applied by [`DeviceSession::configure`].
///
/// The application order is fixed by the protocol: reset, optional
/// buffer purge, baud rate, latency timer, and the mode-set last: the
/// mode-set starts the bit-bang clock and must see the final baud and
/// latency values.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Bit-bang clock baud rate.
    pub baud_rate: u32,
    /// Adapter latency timer in ms; short values keep synchronous-mode
    /// echo bytes flowing.
    pub latency_timer_ms: u8,
    /// Clocking variant to enable.
    pub mode: BitbangMode,
    /// Purge the adapter FIFOs before configuring.
    pub purge_buffers: bool,
    /// Output mask for the mode-set; all lines driven by default.
    pub output_mask: u8,
}

impl Default for SessionConfig {
    fn default() -> Self {
        SessionConfig {
            baud_rate: DEFAULT_BAUD_RATE,
            latency_timer_ms: DEFAULT_LATENCY_TIMER_MS,
            mode: BitbangMode::Sync,
            purge_buffers: true,
            output_mask: ALL_OUTPUTS_MASK,
        }
    }
}

/// Lifecycle state of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Interface claim attempted; no bit-bang I/O possible yet.
    Opened,
    /// Bit-bang mode active; write/read calls are accepted.
    Configured(BitbangMode),
    /// Torn down; the adapter mode has been reset to neutral.
    Closed,
}

/// An exclusively-owned adapter session.
///
/// Created once per run; the owning controller is the only writer. The
/// session guarantees that on every exit path, explicit
/// [`close`](DeviceSession::close) or drop, the adapter mode is reset
/// to neutral so relays are not left latched for the next process.
#[derive(Debug)]
pub struct DeviceSession<B: Bridge> {
    bridge: B,
    state: SessionState,
}

impl<B: Bridge> DeviceSession<B> {
    /// Opens a session over `bridge` by claiming the adapter interface.
    ///
    /// An interface that is already claimed ([`Error::DeviceBusy`]) is
    /// tolerated with a warning and the session proceeds; any other
    /// claim failure is fatal and the bridge is dropped.
    pub fn open(mut bridge: B) -> Result<Self> {
        match bridge.claim() {
            Ok(()) => debug!("Adapter interface claimed"),
            Err(Error::DeviceBusy) => {
                warn!("Adapter interface already claimed; continuing anyway");
            }
            Err(e) => return Err(e),
        }
        Ok(Self {
            bridge,
            state: SessionState::Opened,
        })
    }

    /// Current lifecycle state.
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Active bit-bang mode, if configured.
    pub fn mode(&self) -> Option<BitbangMode> {
        match self.state {
            SessionState::Configured(mode) => Some(mode),
            _ => None,
        }
    }

    /// Configures the adapter for bit-bang operation.
    ///
    /// The reset is best-effort: an adapter that ignores it is not a
    /// failure. Every later step is mandatory, and a mode-set failure
    /// leaves the session in `Opened`: still closable, not usable for
    /// I/O.
    pub fn configure(&mut self, config: &SessionConfig) -> Result<()> {
        match self.state {
            SessionState::Opened => {}
            SessionState::Configured(_) => return Err(Error::InvalidArgument(
                "session is already configured",
            )),
            SessionState::Closed => return Err(Error::SessionClosed),
        }

        if let Err(e) = self.bridge.reset() {
            warn!("Adapter reset failed (continuing): {e}");
        }
        if config.purge_buffers {
            self.bridge.purge_buffers()?;
        }
        self.bridge.set_baud_rate(config.baud_rate)?;
        self.bridge.set_latency_timer(config.latency_timer_ms)?;
        self.bridge
            .enable_bitbang(config.output_mask, config.mode)?;

        debug!(
            "Session configured: {:?} bit-bang, {} baud, {} ms latency",
            config.mode, config.baud_rate, config.latency_timer_ms
        );
        self.state = SessionState::Configured(config.mode);
        Ok(())
    }

    /// Writes raw bytes; only valid on a configured session. Returns
    /// the count the adapter accepted.
    pub fn write_bytes(&mut self, data: &[u8]) -> Result<usize> {
        self.check_configured()?;
        self.bridge.write_data(data)
    }

    /// Reads raw bytes (synchronous-mode echo traffic); only valid on a
    /// configured session.
    pub fn read_bytes(&mut self, buf: &mut [u8]) -> Result<usize> {
        self.check_configured()?;
        self.bridge.read_data(buf)
    }

    /// Samples the instantaneous pin latch state.
    pub fn read_pins(&mut self) -> Result<u8> {
        self.check_configured()?;
        self.bridge.read_pins()
    }

    fn check_configured(&self) -> Result<()> {
        match self.state {
            SessionState::Configured(_) => Ok(()),
            SessionState::Closed => Err(Error::SessionClosed),
            SessionState::Opened => Err(Error::NotConfigured),
        }
    }

    /// Tears the session down: resets the adapter mode to neutral
    /// (releasing all pins) and marks the session closed.
    ///
    /// Idempotent; the mode reset is issued exactly once no matter how
    /// many times close runs or whether it runs via `Drop`.
    pub fn close(&mut self) -> Result<()> {
        if self.state == SessionState::Closed {
            return Ok(());
        }
        self.state = SessionState::Closed;
        self.bridge.disable_bitbang()
    }
}

impl<B: Bridge> Drop for DeviceSession<B> {
    fn drop(&mut self) {
        if self.state != SessionState::Closed {
            if let Err(e) = self.close() {
                warn!("Session teardown failed: {e}");
            }
        }
    }
}
