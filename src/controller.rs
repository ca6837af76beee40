//! Channel-level relay control: single-channel operations, verified
//! readback, and the diagnostic sweep.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use log::{debug, warn};

use crate::bridge::Bridge;
use crate::error::{Error, Result};
use crate::readback::{InconclusiveReason, Readback, Verifier};
use crate::relay::{Channel, PinRegister};
use crate::session::{DeviceSession, SessionConfig, SessionState};
use crate::transport::{BitbangTransport, WriteOutcome};
use crate::usb::UsbPort;

/// Cooperative abort signal for long-running operations.
///
/// Clone a flag into a signal handler or UI callback and trigger it;
/// the controller checks it at every step boundary and drives the
/// relays to a safe state before returning.
#[derive(Debug, Clone, Default)]
pub struct AbortFlag(Arc<AtomicBool>);

impl AbortFlag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests an abort. Safe to call from another thread.
    pub fn trigger(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_triggered(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Result of a channel-level operation: the register that is now
/// latched and the transport outcome of writing it.
#[derive(Debug, Clone, Copy)]
pub struct Applied {
    /// The register value that was written.
    pub register: PinRegister,
    /// How much of it the adapter accepted; a short write means the
    /// register did not actually change.
    pub outcome: WriteOutcome,
}

/// Timing and verification policy for [`RelayBoard::sweep`].
#[derive(Debug, Clone)]
pub struct SweepOptions {
    /// How long each channel stays energized.
    pub hold: Duration,
    /// Pause between channels.
    pub pause: Duration,
    /// Read pins back after each ON write and classify the result.
    pub verify: bool,
}

impl Default for SweepOptions {
    fn default() -> Self {
        SweepOptions {
            hold: Duration::from_secs(2),
            pause: Duration::from_millis(500),
            verify: true,
        }
    }
}

/// One channel's worth of a sweep run.
#[derive(Debug)]
pub struct SweepStep {
    pub channel: Channel,
    /// Outcome of energizing the channel. An error here is recoverable;
    /// the sweep continues with the next channel.
    pub on_outcome: Result<WriteOutcome>,
    /// Readback classification, when verification was requested and the
    /// ON write went through.
    pub readback: Option<Readback>,
    /// Outcome of releasing the channel.
    pub off_outcome: Result<WriteOutcome>,
}

/// Aggregated result of a sweep.
#[derive(Debug, Default)]
pub struct SweepReport {
    pub steps: Vec<SweepStep>,
    /// Whether the sweep stopped early on an [`AbortFlag`].
    pub aborted: bool,
}

impl SweepReport {
    /// Number of steps whose ON or OFF write failed or was short.
    pub fn write_failures(&self) -> usize {
        self.steps
            .iter()
            .filter(|s| {
                !matches!(&s.on_outcome, Ok(o) if o.complete())
                    || !matches!(&s.off_outcome, Ok(o) if o.complete())
            })
            .count()
    }

    /// Number of steps whose readback came back as a mismatch.
    pub fn mismatches(&self) -> usize {
        self.steps
            .iter()
            .filter(|s| matches!(s.readback, Some(Readback::Mismatch { .. })))
            .count()
    }
}

/// High-level handle for an 8-channel relay board.
///
/// State is threaded explicitly: channel operations take the current
/// register and return the new one, so there is no hidden current-state
/// to race on. The board owns the session exclusively; dropping it (or
/// calling [`shutdown`](RelayBoard::shutdown)) resets the adapter mode
/// so relays are not left latched.
#[derive(Debug)]
pub struct RelayBoard<B: Bridge> {
    transport: BitbangTransport<B>,
    verifier: Verifier,
}

impl RelayBoard<UsbPort> {
    /// Opens the first FT245R relay board found, configures it with
    /// defaults, and drives all relays off.
    pub fn open_first() -> Result<Self> {
        Self::open_with_config(&SessionConfig::default())
    }

    /// Opens the first board found with an explicit configuration.
    pub fn open_with_config(config: &SessionConfig) -> Result<Self> {
        let port = UsbPort::open_default()?;
        Self::open_port(port, config)
    }

    /// Opens a specific, already-located port.
    pub fn open_port(port: UsbPort, config: &SessionConfig) -> Result<Self> {
        let mut session = DeviceSession::open(port)?;
        session.configure(config)?;
        let mut board = Self::from_session(session);
        // Known-safe starting point
        board.set_all(false)?;
        Ok(board)
    }
}

impl<B: Bridge> RelayBoard<B> {
    /// Builds a board over an already-opened session (typically one the
    /// caller configured itself).
    pub fn from_session(session: DeviceSession<B>) -> Self {
        Self {
            transport: BitbangTransport::new(session),
            verifier: Verifier::default(),
        }
    }

    /// The session lifecycle state.
    pub fn session_state(&mut self) -> SessionState {
        self.transport.session_mut().state()
    }

    /// Adjusts the settle window used by verified reads.
    pub fn set_settle_window(&mut self, window: Duration) {
        self.verifier.settle_window = window;
    }

    /// The verifier applied to readbacks.
    pub fn verifier(&self) -> Verifier {
        self.verifier
    }

    /// Writes a full register as-is.
    pub fn apply(&mut self, register: PinRegister) -> Result<Applied> {
        let outcome = self.transport.write(register)?;
        Ok(Applied { register, outcome })
    }

    /// Sets one channel on or off, leaving all other channels in
    /// `current` untouched, and writes the result.
    pub fn set_channel(&mut self, channel: Channel, on: bool, current: PinRegister) -> Result<Applied> {
        debug!("Channel {channel} -> {}", if on { "ON" } else { "OFF" });
        self.apply(current.with_channel(channel, on))
    }

    /// Flips one channel and writes the result.
    pub fn toggle(&mut self, channel: Channel, current: PinRegister) -> Result<Applied> {
        self.apply(current.toggled(channel))
    }

    /// Drives every channel on or off.
    pub fn set_all(&mut self, on: bool) -> Result<Applied> {
        debug!("All channels -> {}", if on { "ON" } else { "OFF" });
        self.apply(if on { PinRegister::ALL_ON } else { PinRegister::ALL_OFF })
    }

    /// Energizes a channel for `hold`, then releases it. Returns the
    /// final (released) state.
    pub fn pulse(&mut self, channel: Channel, hold: Duration, current: PinRegister) -> Result<Applied> {
        self.set_channel(channel, true, current)?;
        thread::sleep(hold);
        self.set_channel(channel, false, current)
    }

    /// Reads the pin latch state.
    pub fn read_pins(&mut self) -> Result<PinRegister> {
        self.transport.read_pins()
    }

    /// Waits out the settle window, reads the pins, and classifies the
    /// observation against `expected`.
    ///
    /// A failed pin read yields `Inconclusive`, never an assumed-zero
    /// register: readback support is hardware-dependent and its absence
    /// must not look like eight stuck-off relays.
    pub fn verify(&mut self, expected: PinRegister) -> Readback {
        let started = Instant::now();
        if !self.verifier.settle_window.is_zero() {
            thread::sleep(self.verifier.settle_window);
        }
        match self.transport.read_pins() {
            Ok(observed) => self.verifier.classify(expected, observed, started.elapsed()),
            Err(e) => {
                warn!("Pin read failed during verification: {e}");
                Readback::Inconclusive(InconclusiveReason::ReadUnavailable)
            }
        }
    }

    /// Sweeps channels 1-8 in order with default abort/observer hooks.
    pub fn sweep(&mut self, options: &SweepOptions) -> Result<SweepReport> {
        self.sweep_with(options, &AbortFlag::new(), |_| {})
    }

    /// Sweeps channels 1-8 in order: energize one channel against an
    /// all-off baseline, optionally verify, hold, release, pause.
    ///
    /// Individual write or read failures are recoverable, recorded in
    /// the report while the sweep moves on, because one bad transfer
    /// should not void a diagnostic run. Misuse of the session (not
    /// configured, already closed) is fatal and returned as an error.
    ///
    /// `observer` runs after each completed step; it is the hook for
    /// caller-side progress display. When `abort` triggers, the sweep
    /// stops at the next boundary and drives all relays off before
    /// returning.
    pub fn sweep_with<F>(
        &mut self,
        options: &SweepOptions,
        abort: &AbortFlag,
        mut observer: F,
    ) -> Result<SweepReport>
    where
        F: FnMut(&SweepStep),
    {
        let mut report = SweepReport::default();

        for channel in Channel::all() {
            if abort.is_triggered() {
                report.aborted = true;
                break;
            }

            let on_register = PinRegister::ALL_OFF.with_channel(channel, true);
            let on_outcome = Self::recoverable(self.transport.write(on_register))?;
            if let Err(e) = &on_outcome {
                warn!("Channel {channel} ON write failed: {e}");
            }

            let readback = match (&on_outcome, options.verify) {
                (Ok(o), true) if o.complete() => Some(self.verify(on_register)),
                _ => None,
            };

            if !abort.is_triggered() && !options.hold.is_zero() {
                thread::sleep(options.hold);
            }

            let off_outcome = Self::recoverable(self.transport.write(PinRegister::ALL_OFF))?;
            if let Err(e) = &off_outcome {
                warn!("Channel {channel} OFF write failed: {e}");
            }

            let step = SweepStep {
                channel,
                on_outcome,
                readback,
                off_outcome,
            };
            observer(&step);
            report.steps.push(step);

            if abort.is_triggered() {
                report.aborted = true;
                break;
            }
            if !options.pause.is_zero() {
                thread::sleep(options.pause);
            }
        }

        if report.aborted {
            debug!("Sweep aborted; driving all channels off");
            if let Err(e) = self.transport.write(PinRegister::ALL_OFF) {
                warn!("All-off after abort failed: {e}");
            }
        }
        Ok(report)
    }

    /// Drives all relays off and tears the session down (mode reset to
    /// neutral). Consumes the board; the session close is idempotent,
    /// so the drop that follows does not reset the mode a second time.
    pub fn shutdown(mut self) -> Result<()> {
        if let Err(e) = self.transport.write(PinRegister::ALL_OFF) {
            warn!("All-off during shutdown failed: {e}");
        }
        self.transport.session_mut().close()
    }

    /// Splits errors into fatal (session misuse, propagated) and
    /// recoverable (single bad transfer, handed back for recording).
    fn recoverable(result: Result<WriteOutcome>) -> Result<Result<WriteOutcome>> {
        match result {
            Err(e @ (Error::NotConfigured | Error::SessionClosed)) => Err(e),
            other => Ok(other),
        }
    }
}
