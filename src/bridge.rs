//! The adapter contract: blocking primitives an FTDI-style USB bridge
//! must provide for bit-bang relay control.
//!
//! The rest of the crate is written against [`Bridge`] rather than a
//! concrete USB stack, so the protocol layers can be exercised against
//! a scripted mock. The production implementation is
//! [`UsbPort`](crate::usb::UsbPort).

use crate::consts::bitmode;
use crate::error::Result;

/// Bit-bang clocking variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BitbangMode {
    /// Asynchronous bit-bang: pins latch on write, nothing is queued
    /// for read.
    Async,
    /// Synchronous bit-bang: every written byte also enqueues one echo
    /// byte of input that must be drained before further writes
    /// proceed. Required by the Denkovi board firmware.
    Sync,
}

impl BitbangMode {
    /// FTDI wire value for the SET_BITMODE request.
    #[inline]
    pub fn wire_value(&self) -> u8 {
        match self {
            BitbangMode::Async => bitmode::ASYNC_BITBANG,
            BitbangMode::Sync => bitmode::SYNC_BITBANG,
        }
    }
}

/// Blocking adapter primitives.
///
/// Every method blocks until the underlying transfer completes or
/// fails; the single-owner session layer guarantees the calls are
/// strictly sequential.
pub trait Bridge {
    /// Claim the adapter interface for exclusive use.
    ///
    /// Returns [`Error::DeviceBusy`](crate::Error::DeviceBusy) when the
    /// interface is already held; the session layer tolerates that
    /// specific condition on open.
    fn claim(&mut self) -> Result<()>;

    /// Hardware reset of the adapter. Also invalidates any buffered
    /// input on the host side.
    fn reset(&mut self) -> Result<()>;

    /// Purge the adapter's RX and TX FIFOs.
    fn purge_buffers(&mut self) -> Result<()>;

    /// Set the baud rate that clocks the bit-bang engine.
    fn set_baud_rate(&mut self, baud_rate: u32) -> Result<()>;

    /// Set the latency timer (1-255 ms) controlling how long the chip
    /// holds partial packets before flushing them to the host.
    fn set_latency_timer(&mut self, latency_ms: u8) -> Result<()>;

    /// Enable bit-bang operation with the given output `mask` (bit = 1
    /// means the pin is driven) and clocking `mode`.
    fn enable_bitbang(&mut self, mask: u8, mode: BitbangMode) -> Result<()>;

    /// Return the chip to its neutral serial mode, releasing all pins.
    fn disable_bitbang(&mut self) -> Result<()>;

    /// Write raw bytes to the chip. Returns the number of bytes the
    /// adapter accepted, which may be short.
    fn write_data(&mut self, data: &[u8]) -> Result<usize>;

    /// Read raw bytes from the chip into `buf`. Returns the number of
    /// payload bytes read; 0 means no payload was available yet.
    fn read_data(&mut self, buf: &mut [u8]) -> Result<usize>;

    /// Sample the instantaneous pin levels, bypassing the data FIFOs.
    ///
    /// This is the only read that reflects the actual latch state; data
    /// read via [`read_data`](Bridge::read_data) in synchronous mode is
    /// echo traffic.
    fn read_pins(&mut self) -> Result<u8>;
}
