//! Internal constants: USB identifiers, FTDI vendor request codes, and
//! protocol defaults for FT245R-based relay boards.

// Default Vendor/Product IDs
/// FTDI vendor ID.
pub const FTDI_VID: u16 = 0x0403;
/// Product ID of the FT245R/FT232R family used on the Denkovi 8-channel boards.
pub const FT245R_PID: u16 = 0x6001;

/// All eight data lines configured as outputs when enabling bit-bang mode.
pub const ALL_OUTPUTS_MASK: u8 = 0xFF;

/// Number of relay channels on the board.
pub const CHANNEL_COUNT: u8 = 8;

// --- FTDI SIO vendor requests (control transfers) ---
// Request codes shared by the whole FT-X family; only the subset this
// crate issues is listed.
pub mod sio {
    pub const RESET_REQUEST: u8 = 0x00;
    pub const SET_BAUDRATE_REQUEST: u8 = 0x03;
    pub const SET_LATENCY_TIMER_REQUEST: u8 = 0x09;
    pub const GET_LATENCY_TIMER_REQUEST: u8 = 0x0A;
    pub const SET_BITMODE_REQUEST: u8 = 0x0B;
    pub const READ_PINS_REQUEST: u8 = 0x0C;

    // wValue codes for RESET_REQUEST
    pub const RESET_SIO: u16 = 0;
    pub const RESET_PURGE_RX: u16 = 1;
    pub const RESET_PURGE_TX: u16 = 2;
}

// --- USB topology of the FT245R ---
// Single-interface chip: interface A only.
pub mod usb {
    /// Interface number claimed on the device.
    pub const INTERFACE_NUM: u8 = 0;
    /// wIndex used in SIO control transfers (interface A).
    pub const SIO_INDEX: u16 = 1;
    /// Bulk OUT endpoint (host -> chip).
    pub const WRITE_EP: u8 = 0x02;
    /// Bulk IN endpoint (chip -> host).
    pub const READ_EP: u8 = 0x81;
    /// Full-speed bulk packet size; every IN packet starts with two
    /// modem status bytes that must be stripped.
    pub const MAX_PACKET_SIZE: usize = 64;
}

// --- Bit-bang mode wire values (high byte of SET_BITMODE wValue) ---
pub mod bitmode {
    pub const RESET: u8 = 0x00;
    pub const ASYNC_BITBANG: u8 = 0x01;
    pub const SYNC_BITBANG: u8 = 0x04;
}

// --- Protocol defaults ---
/// Default bit-bang clock baud rate (the original board firmware is
/// tested at 9600; the effective pin clock is 4x this).
pub const DEFAULT_BAUD_RATE: u32 = 9600;
/// Default latency timer in ms. A short timer matters in synchronous
/// mode so echo bytes reach the host promptly.
pub const DEFAULT_LATENCY_TIMER_MS: u8 = 2;
/// Nominal mechanical settle window for the relay coils, in ms. Pin
/// reads inside this window after a write are not authoritative.
pub const DEFAULT_SETTLE_MS: u64 = 50;
