//! # denkovi-relay
//!
//! A Rust crate for controlling 8-channel FTDI FT245R bit-bang relay
//! boards (Denkovi DAE-CB/Ro8-USB and compatibles) over USB.
//!
//! The FT245R on these boards runs in bit-bang GPIO mode: a single byte
//! written to the chip drives all eight relay channels at once (bit *i*
//! is channel *i+1*), and a dedicated control read returns the
//! currently latched pin levels for verification. This crate implements
//! that protocol over the `nusb` USB stack, with no native FTDI library
//! required.
//!
//! ## Features
//!
//! *   Adapter discovery ([`find_all`], [`find_first`], [`find_devices`]).
//! *   Session lifecycle with guaranteed teardown: the adapter is
//!     returned to neutral mode (all pins released) on every exit path,
//!     including panics and aborts, via `Drop`.
//! *   Asynchronous and synchronous bit-bang clocking. Synchronous mode
//!     (required by the Denkovi firmware) pairs every write with the
//!     compensating echo read the chip demands.
//! *   Explicit state threading: channel operations take the current
//!     [`PinRegister`] and return the new one, so there is no hidden
//!     global relay state.
//! *   Verified readback with relay settle-window awareness
//!     ([`Readback`], [`Verifier`]).
//! *   A diagnostic sweep over all channels with per-step reporting,
//!     recoverable-error continuation, and cooperative abort
//!     ([`AbortFlag`]).
//!
//! ## Basic Usage
//!
//! ```no_run
//! use denkovi_relay::{Channel, PinRegister, RelayBoard, Result};
//! use std::time::Duration;
//!
//! fn main() -> Result<()> {
//!     // Opens the first board, enables synchronous bit-bang at
//!     // 9600 baud, and drives all relays off.
//!     let mut board = RelayBoard::open_first()?;
//!
//!     // Turn relay 3 on, keeping the others as they are.
//!     let state = PinRegister::ALL_OFF;
//!     let applied = board.set_channel(Channel::new(3)?, true, state)?;
//!
//!     // Give the coil time to move, then check what actually latched.
//!     println!("readback: {}", board.verify(applied.register));
//!
//!     std::thread::sleep(Duration::from_secs(1));
//!     board.shutdown()
//! }
//! ```
//!
//! ## Error taxonomy
//!
//! *   **Fatal**: open/claim failures other than an already-claimed
//!     interface, and configuration failures (mode-set included). The
//!     session stays closable but unusable for I/O.
//! *   **Recoverable**: a single failed write or read during a sweep.
//!     The step is recorded in the [`SweepReport`] and the run
//!     continues.
//! *   **Diagnostic-only**: readback mismatches. Pin-read support is
//!     hardware-dependent, so mismatches inform, they never abort.
//!
//! ## Hardware Setup Notes
//!
//! *   **Linux udev rules**: grant yourself access to the adapter.
//!     Create `/etc/udev/rules.d/99-denkovi.rules`:
//!     ```udev
//!     SUBSYSTEM=="usb", ATTRS{idVendor}=="0403", ATTRS{idProduct}=="6001", MODE="0666", GROUP="plugdev"
//!     ```
//!     Reload: `sudo udevadm control --reload-rules && sudo udevadm trigger`
//! *   **Kernel VCP driver**: `ftdi_sio` may bind the adapter first;
//!     opening the session detaches it automatically where the platform
//!     allows.
//! *   The echo bytes read back in synchronous mode are transfer-queue
//!     artifacts, not pin state; only [`RelayBoard::read_pins`] (a
//!     control transfer) reflects the latches.

// Internal modules; public types are re-exported below.
mod baudrate;
mod consts;
mod error;

pub mod bridge;
pub mod controller;
pub mod readback;
pub mod relay;
pub mod session;
pub mod transport;
pub mod usb;

pub use bridge::{BitbangMode, Bridge};
pub use controller::{AbortFlag, Applied, RelayBoard, SweepOptions, SweepReport, SweepStep};
pub use error::{Error, Result};
pub use readback::{InconclusiveReason, Readback, Verifier};
pub use relay::{Channel, PinRegister};
pub use session::{DeviceSession, SessionConfig, SessionState};
pub use transport::{BitbangTransport, WriteOutcome};
pub use usb::{find_all, find_devices, find_first, PortInfo, UsbPort};

// Essential identifiers for callers supplying their own VID/PID.
pub use consts::{CHANNEL_COUNT, FT245R_PID, FTDI_VID};
