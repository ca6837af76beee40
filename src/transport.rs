//! Mode-aware register writes and pin reads over an open session.

use log::{trace, warn};

use crate::bridge::{BitbangMode, Bridge};
use crate::error::{Error, Result};
use crate::relay::PinRegister;
use crate::session::DeviceSession;

/// How many empty reads the echo drain tolerates before giving up. The
/// latency timer flushes pending echo bytes within a few milliseconds,
/// so each retry corresponds to one flush interval.
const ECHO_DRAIN_ATTEMPTS: u32 = 8;

/// Result of a register write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WriteOutcome {
    /// Bytes the adapter accepted. A short count (0 for a single
    /// register write) means the register was not applied.
    pub accepted: usize,
}

impl WriteOutcome {
    /// Whether the full register byte was accepted.
    pub fn complete(&self) -> bool {
        self.accepted == 1
    }
}

/// Performs bit-bang writes and pin reads against a configured
/// [`DeviceSession`], enforcing the synchronous-mode write/read pairing.
#[derive(Debug)]
pub struct BitbangTransport<B: Bridge> {
    session: DeviceSession<B>,
}

impl<B: Bridge> BitbangTransport<B> {
    /// Wraps a session. The session should already be configured;
    /// operations on an unconfigured session fail with
    /// [`Error::NotConfigured`].
    pub fn new(session: DeviceSession<B>) -> Self {
        Self { session }
    }

    /// Access to the underlying session (state queries, teardown).
    pub fn session_mut(&mut self) -> &mut DeviceSession<B> {
        &mut self.session
    }

    /// Writes one register byte to the adapter.
    ///
    /// In synchronous mode the adapter enqueues one echo byte per
    /// accepted byte, which is drained and discarded here before
    /// returning; leaving it queued would stall the next write once
    /// the adapter FIFO fills. The echo reflects queued transfer data,
    /// not settled pin state, so it is never interpreted.
    pub fn write(&mut self, register: PinRegister) -> Result<WriteOutcome> {
        let accepted = self.session.write_bytes(&[register.bits()])?;
        if accepted < 1 {
            warn!("Short write: register 0x{register:02X} not accepted");
        }
        if self.session.mode() == Some(BitbangMode::Sync) && accepted > 0 {
            self.drain_echo(accepted)?;
        }
        trace!("wrote register 0x{register:02X} ({accepted} accepted)");
        Ok(WriteOutcome { accepted })
    }

    /// Reads the current pin latch state.
    ///
    /// This is a dedicated control read, distinct from the echo drain;
    /// it is the only trustworthy snapshot of what the relays are
    /// actually being driven to.
    pub fn read_pins(&mut self) -> Result<PinRegister> {
        let pins = self.session.read_pins()?;
        Ok(PinRegister::from_bits(pins))
    }

    fn drain_echo(&mut self, expected: usize) -> Result<()> {
        let mut scratch = [0u8; 8];
        let mut drained = 0;
        let mut attempts = 0;
        while drained < expected {
            let want = (expected - drained).min(scratch.len());
            let n = self.session.read_bytes(&mut scratch[..want])?;
            drained += n;
            if n == 0 {
                attempts += 1;
                if attempts >= ECHO_DRAIN_ATTEMPTS {
                    warn!("Echo drain stalled: {drained}/{expected} bytes");
                    return Err(Error::EchoDrain { expected, drained });
                }
            }
        }
        trace!("drained {drained} echo byte(s)");
        Ok(())
    }
}
