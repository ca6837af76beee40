//! Classification of pin readback against the written register.

use std::fmt;
use std::time::Duration;

use crate::consts::DEFAULT_SETTLE_MS;
use crate::relay::PinRegister;

/// Why a readback could not be classified either way.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InconclusiveReason {
    /// The read happened inside the mechanical settle window; relay
    /// coils may not have finished moving yet.
    SettleWindow,
    /// The pin read itself failed; no observation is available.
    ReadUnavailable,
}

impl fmt::Display for InconclusiveReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InconclusiveReason::SettleWindow => write!(f, "within relay settle window"),
            InconclusiveReason::ReadUnavailable => write!(f, "pin read unavailable"),
        }
    }
}

/// Outcome of comparing a written register against observed pin levels.
///
/// Mismatches are diagnostic, never fatal: pin-read support varies
/// between board revisions and a transient mismatch right after a write
/// is expected coil behavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Readback {
    /// Observed levels equal the written register.
    Match,
    /// Observed levels differ after the settle window elapsed.
    Mismatch {
        expected: PinRegister,
        observed: PinRegister,
    },
    /// No authoritative observation could be made.
    Inconclusive(InconclusiveReason),
}

impl fmt::Display for Readback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Readback::Match => write!(f, "match"),
            Readback::Mismatch { expected, observed } => write!(
                f,
                "mismatch (expected 0x{expected:02X}, observed 0x{observed:02X})"
            ),
            Readback::Inconclusive(reason) => write!(f, "inconclusive: {reason}"),
        }
    }
}

/// Classifies readback observations relative to a settle window.
#[derive(Debug, Clone, Copy)]
pub struct Verifier {
    /// Time a relay coil needs after a write before its pin level is
    /// authoritative.
    pub settle_window: Duration,
}

impl Default for Verifier {
    fn default() -> Self {
        Verifier {
            settle_window: Duration::from_millis(DEFAULT_SETTLE_MS),
        }
    }
}

impl Verifier {
    /// Compares `written` against `observed`, taking into account how
    /// long ago the write happened. Equality is a [`Readback::Match`]
    /// regardless of timing; a difference inside the settle window is
    /// [`Readback::Inconclusive`] rather than a mismatch.
    pub fn classify(
        &self,
        written: PinRegister,
        observed: PinRegister,
        elapsed_since_write: Duration,
    ) -> Readback {
        if written == observed {
            return Readback::Match;
        }
        if elapsed_since_write < self.settle_window {
            return Readback::Inconclusive(InconclusiveReason::SettleWindow);
        }
        Readback::Mismatch {
            expected: written,
            observed,
        }
    }
}
