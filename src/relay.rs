//! Relay channel and register value types.

use std::fmt;

use crate::consts::CHANNEL_COUNT;
use crate::error::{Error, Result};

/// A valid relay channel number (1-8).
/// Use `Channel::new(num)` to create.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Channel(u8);

impl Channel {
    /// Creates a new Channel, returning an error if the number is out of
    /// range (1-8). Validation happens here, before any I/O can be
    /// attempted with the value.
    pub fn new(channel: u8) -> Result<Self> {
        if (1..=CHANNEL_COUNT).contains(&channel) {
            Ok(Channel(channel))
        } else {
            Err(Error::InvalidChannel { channel })
        }
    }

    /// Returns the channel number (1-8).
    #[inline]
    pub fn number(&self) -> u8 {
        self.0
    }

    /// Returns the zero-based bit index (0-7) of this channel.
    #[inline]
    pub fn index(&self) -> u8 {
        self.0 - 1
    }

    /// Returns the bit mask (1 << index) driving this channel.
    #[inline]
    pub fn mask(&self) -> u8 {
        1u8 << self.index()
    }

    /// Iterator over all eight channels in board order.
    pub fn all() -> impl Iterator<Item = Channel> {
        (1..=CHANNEL_COUNT).map(Channel)
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "R{}", self.0)
    }
}

/// The 8-channel relay state as a single byte: bit *i* drives channel
/// *i+1*. Immutable value type; every operation returns a fresh
/// register rather than mutating shared state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct PinRegister(u8);

impl PinRegister {
    /// All relays off (0x00).
    pub const ALL_OFF: PinRegister = PinRegister(0x00);
    /// All relays on (0xFF).
    pub const ALL_ON: PinRegister = PinRegister(0xFF);

    /// Wraps a raw pin byte (e.g. a value read back from the adapter).
    #[inline]
    pub const fn from_bits(bits: u8) -> Self {
        PinRegister(bits)
    }

    /// Returns the raw byte written to the adapter.
    #[inline]
    pub const fn bits(&self) -> u8 {
        self.0
    }

    /// Returns a register with `channel` set on or off, all other
    /// channels untouched.
    #[inline]
    pub fn with_channel(self, channel: Channel, on: bool) -> Self {
        if on {
            PinRegister(self.0 | channel.mask())
        } else {
            PinRegister(self.0 & !channel.mask())
        }
    }

    /// Returns a register with `channel` flipped.
    #[inline]
    pub fn toggled(self, channel: Channel) -> Self {
        PinRegister(self.0 ^ channel.mask())
    }

    /// Whether `channel` is on in this register.
    #[inline]
    pub fn is_on(&self, channel: Channel) -> bool {
        self.0 & channel.mask() != 0
    }

    /// Number of channels that are on.
    #[inline]
    pub fn count_on(&self) -> u32 {
        self.0.count_ones()
    }
}

impl From<u8> for PinRegister {
    fn from(bits: u8) -> Self {
        PinRegister(bits)
    }
}

impl fmt::Display for PinRegister {
    /// Renders per-channel states, e.g. `R1:ON | R2:OFF | ...`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for ch in Channel::all() {
            if !first {
                write!(f, " | ")?;
            }
            first = false;
            write!(f, "{}:{}", ch, if self.is_on(ch) { "ON" } else { "OFF" })?;
        }
        Ok(())
    }
}

impl fmt::LowerHex for PinRegister {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::LowerHex::fmt(&self.0, f)
    }
}

impl fmt::UpperHex for PinRegister {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::UpperHex::fmt(&self.0, f)
    }
}
