//! FTDI FT245R backend over the `nusb` USB stack.
//!
//! [`UsbPort`] speaks the FTDI vendor protocol directly: SIO control
//! requests for configuration, bulk transfers for data, and the
//! two-byte modem status header the chip prepends to every IN packet.

use std::time::Duration;

use log::{debug, trace, warn};
use nusb::transfer::{Bulk, ControlIn, ControlOut, ControlType, In, Out, Recipient};
use nusb::{DeviceInfo, MaybeFuture};

use crate::baudrate;
use crate::bridge::{BitbangMode, Bridge};
use crate::consts::{bitmode, sio, usb, FT245R_PID, FTDI_VID};
use crate::error::{Error, Result};

/// Default blocking-transfer timeouts. Reads are kept short because in
/// synchronous bit-bang mode a missing echo byte would otherwise stall
/// the caller for the full timeout.
const DEFAULT_WRITE_TIMEOUT: Duration = Duration::from_secs(1);
const DEFAULT_READ_TIMEOUT: Duration = Duration::from_millis(500);

/// Internal read buffer size. Bit-bang echo traffic is a handful of
/// bytes; a few packets of headroom is plenty.
const READ_CHUNKSIZE: usize = 256;

/// Information about a discovered FTDI adapter.
/// Can be passed to [`UsbPort::open`] to connect to a specific device.
#[derive(Debug, Clone)]
pub struct PortInfo {
    pub vid: u16,
    pub pid: u16,
    /// USB bus number; together with `device_address` this identifies
    /// the physical port for reliable re-opening.
    pub bus_number: u8,
    pub device_address: u8,
    pub serial_number: Option<String>,
    pub product_string: Option<String>,
    pub manufacturer_string: Option<String>,
}

/// Find adapters matching a specific VID and optional PID.
pub fn find_devices(vid: u16, pid: Option<u16>) -> Result<Vec<PortInfo>> {
    let mut found = Vec::new();
    for info in nusb::list_devices().wait()? {
        if info.vendor_id() != vid {
            continue;
        }
        if let Some(p) = pid {
            if info.product_id() != p {
                continue;
            }
        }
        debug!(
            "Found FTDI adapter: VID={:04X}, PID={:04X}, bus={}, addr={}, SN={:?}",
            info.vendor_id(),
            info.product_id(),
            info.busnum(),
            info.device_address(),
            info.serial_number()
        );
        found.push(PortInfo {
            vid: info.vendor_id(),
            pid: info.product_id(),
            bus_number: info.busnum(),
            device_address: info.device_address(),
            serial_number: info.serial_number().map(String::from),
            product_string: info.product_string().map(String::from),
            manufacturer_string: info.manufacturer_string().map(String::from),
        });
    }
    Ok(found)
}

/// Find all adapters matching the default FTDI VID / FT245R PID.
pub fn find_all() -> Result<Vec<PortInfo>> {
    find_devices(FTDI_VID, Some(FT245R_PID))
}

/// Find the first adapter with the default IDs.
///
/// **Warning:** ambiguous when several adapters are connected; use
/// [`find_all`] and select by serial number for reliable pairing.
pub fn find_first() -> Result<PortInfo> {
    find_all()?.into_iter().next().ok_or(Error::DeviceNotFound)
}

/// An opened FT245R USB port.
///
/// Owns the USB device handle and (after [`Bridge::claim`]) the claimed
/// interface. Not thread-safe by design; the session layer enforces a
/// single owner.
pub struct UsbPort {
    device: nusb::Device,
    interface: Option<nusb::Interface>,

    baud_rate: u32,
    bitbang_enabled: bool,
    read_timeout: Duration,
    write_timeout: Duration,

    // Modem status bytes are stripped into this buffer
    readbuffer: Vec<u8>,
    readbuffer_offset: usize,
    readbuffer_remaining: usize,
}

impl std::fmt::Debug for UsbPort {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UsbPort")
            .field("claimed", &self.interface.is_some())
            .field("baud_rate", &self.baud_rate)
            .field("bitbang_enabled", &self.bitbang_enabled)
            .finish_non_exhaustive()
    }
}

impl UsbPort {
    /// Open the first adapter matching the given vendor and product IDs.
    /// The interface is not claimed yet; the session layer does that.
    pub fn open_by_vid_pid(vid: u16, pid: u16) -> Result<Self> {
        let dev_info = nusb::list_devices()
            .wait()?
            .find(|d| d.vendor_id() == vid && d.product_id() == pid)
            .ok_or(Error::DeviceNotFound)?;
        Self::from_device_info(dev_info)
    }

    /// Open the adapter identified by a discovery record.
    pub fn open(info: &PortInfo) -> Result<Self> {
        let dev_info = nusb::list_devices()
            .wait()?
            .find(|d| d.busnum() == info.bus_number && d.device_address() == info.device_address)
            .ok_or(Error::DeviceNotFound)?;
        Self::from_device_info(dev_info)
    }

    /// Open the first adapter with the default FTDI VID / FT245R PID.
    pub fn open_default() -> Result<Self> {
        Self::open_by_vid_pid(FTDI_VID, FT245R_PID)
    }

    fn from_device_info(dev_info: DeviceInfo) -> Result<Self> {
        let device = dev_info.open().wait()?;
        debug!(
            "Opened FTDI device: VID={:04X}, PID={:04X}",
            dev_info.vendor_id(),
            dev_info.product_id()
        );
        Ok(Self {
            device,
            interface: None,
            baud_rate: 0,
            bitbang_enabled: false,
            read_timeout: DEFAULT_READ_TIMEOUT,
            write_timeout: DEFAULT_WRITE_TIMEOUT,
            readbuffer: vec![0u8; READ_CHUNKSIZE],
            readbuffer_offset: 0,
            readbuffer_remaining: 0,
        })
    }

    /// Override the blocking read timeout.
    pub fn set_read_timeout(&mut self, timeout: Duration) {
        self.read_timeout = timeout;
    }

    /// Override the blocking write timeout.
    pub fn set_write_timeout(&mut self, timeout: Duration) {
        self.write_timeout = timeout;
    }

    /// Current latency timer value in milliseconds.
    pub fn latency_timer(&self) -> Result<u8> {
        let data = self.control_in(sio::GET_LATENCY_TIMER_REQUEST, 0, usb::SIO_INDEX, 1)?;
        data.first().copied().ok_or(Error::DeviceUnavailable)
    }

    fn iface(&self) -> Result<&nusb::Interface> {
        self.interface.as_ref().ok_or(Error::NotClaimed)
    }

    fn control_out(&self, request: u8, value: u16, index: u16) -> Result<()> {
        trace!("SIO control_out: req=0x{request:02X}, value=0x{value:04X}, index=0x{index:04X}");
        self.iface()?
            .control_out(
                ControlOut {
                    control_type: ControlType::Vendor,
                    recipient: Recipient::Device,
                    request,
                    value,
                    index,
                    data: &[],
                },
                self.write_timeout,
            )
            .wait()?;
        Ok(())
    }

    fn control_in(&self, request: u8, value: u16, index: u16, length: u16) -> Result<Vec<u8>> {
        trace!("SIO control_in: req=0x{request:02X}, value=0x{value:04X}, len={length}");
        let data = self
            .iface()?
            .control_in(
                ControlIn {
                    control_type: ControlType::Vendor,
                    recipient: Recipient::Device,
                    request,
                    value,
                    index,
                    length,
                },
                self.read_timeout,
            )
            .wait()?;
        Ok(data)
    }

    fn invalidate_readbuffer(&mut self) {
        self.readbuffer_offset = 0;
        self.readbuffer_remaining = 0;
    }
}

impl Bridge for UsbPort {
    fn claim(&mut self) -> Result<()> {
        if self.interface.is_some() {
            return Ok(());
        }
        match self
            .device
            .detach_and_claim_interface(usb::INTERFACE_NUM)
            .wait()
        {
            Ok(iface) => {
                self.interface = Some(iface);
                Ok(())
            }
            Err(e) if e.kind() == nusb::ErrorKind::Busy => Err(Error::DeviceBusy),
            Err(e) => Err(Error::Usb(e)),
        }
    }

    fn reset(&mut self) -> Result<()> {
        self.control_out(sio::RESET_REQUEST, sio::RESET_SIO, usb::SIO_INDEX)?;
        self.invalidate_readbuffer();
        Ok(())
    }

    fn purge_buffers(&mut self) -> Result<()> {
        self.control_out(sio::RESET_REQUEST, sio::RESET_PURGE_RX, usb::SIO_INDEX)?;
        self.invalidate_readbuffer();
        self.control_out(sio::RESET_REQUEST, sio::RESET_PURGE_TX, usb::SIO_INDEX)
    }

    fn set_baud_rate(&mut self, baud_rate: u32) -> Result<()> {
        // The bit-bang engine clocks at 4x the serial baud rate.
        let effective = if self.bitbang_enabled {
            baud_rate.saturating_mul(4)
        } else {
            baud_rate
        };
        let setting = baudrate::encode(effective)
            .ok_or(Error::InvalidArgument("baud rate must be > 0"))?;
        if !baudrate::within_tolerance(effective, setting.actual) {
            return Err(Error::UnsupportedBaudRate {
                requested: baud_rate,
                actual: setting.actual,
            });
        }
        debug!(
            "Setting baud rate {} (effective {}, actual {})",
            baud_rate, effective, setting.actual
        );
        self.control_out(sio::SET_BAUDRATE_REQUEST, setting.value, setting.index)?;
        self.baud_rate = baud_rate;
        Ok(())
    }

    fn set_latency_timer(&mut self, latency_ms: u8) -> Result<()> {
        if latency_ms < 1 {
            return Err(Error::InvalidArgument("latency must be between 1 and 255"));
        }
        debug!("Setting latency timer to {latency_ms} ms");
        self.control_out(
            sio::SET_LATENCY_TIMER_REQUEST,
            latency_ms as u16,
            usb::SIO_INDEX,
        )
    }

    fn enable_bitbang(&mut self, mask: u8, mode: BitbangMode) -> Result<()> {
        let value = (mask as u16) | ((mode.wire_value() as u16) << 8);
        debug!("Enabling bit-bang: mask=0x{mask:02X}, mode={mode:?}");
        self.control_out(sio::SET_BITMODE_REQUEST, value, usb::SIO_INDEX)?;
        self.bitbang_enabled = true;
        Ok(())
    }

    fn disable_bitbang(&mut self) -> Result<()> {
        let value = (bitmode::RESET as u16) << 8;
        debug!("Disabling bit-bang, releasing pins");
        self.control_out(sio::SET_BITMODE_REQUEST, value, usb::SIO_INDEX)?;
        self.bitbang_enabled = false;
        Ok(())
    }

    fn write_data(&mut self, data: &[u8]) -> Result<usize> {
        let mut ep = self
            .iface()?
            .endpoint::<Bulk, Out>(usb::WRITE_EP)
            .map_err(|_| Error::NotClaimed)?;

        let mut transfer_buf = nusb::transfer::Buffer::new(data.len());
        transfer_buf.extend_from_slice(data);

        let completion = ep.transfer_blocking(transfer_buf, self.write_timeout);
        completion.status.map_err(Error::Transfer)?;
        trace!("bulk OUT: {:02X?} ({} accepted)", data, completion.actual_len);
        Ok(completion.actual_len)
    }

    fn read_data(&mut self, buf: &mut [u8]) -> Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }

        // Serve buffered payload first
        if self.readbuffer_remaining > 0 {
            let n = self.readbuffer_remaining.min(buf.len());
            buf[..n].copy_from_slice(
                &self.readbuffer[self.readbuffer_offset..self.readbuffer_offset + n],
            );
            self.readbuffer_offset += n;
            self.readbuffer_remaining -= n;
            return Ok(n);
        }

        let mut ep = self
            .iface()?
            .endpoint::<Bulk, In>(usb::READ_EP)
            .map_err(|_| Error::NotClaimed)?;

        let transfer_buf = nusb::transfer::Buffer::new(READ_CHUNKSIZE);
        let completion = ep.transfer_blocking(transfer_buf, self.read_timeout);
        completion.status.map_err(Error::Transfer)?;

        let actual = completion.actual_len;
        if actual <= 2 {
            // Only modem status bytes arrived
            return Ok(0);
        }

        let raw = completion.buffer.into_vec();
        self.readbuffer[..actual].copy_from_slice(&raw[..actual]);
        let stripped = strip_modem_status(&mut self.readbuffer[..actual], usb::MAX_PACKET_SIZE);
        trace!("bulk IN: {actual} raw bytes, {stripped} payload");
        if stripped == 0 {
            return Ok(0);
        }

        let n = stripped.min(buf.len());
        buf[..n].copy_from_slice(&self.readbuffer[..n]);
        if stripped > n {
            self.readbuffer.copy_within(n..stripped, 0);
            self.readbuffer_offset = 0;
            self.readbuffer_remaining = stripped - n;
        } else {
            self.invalidate_readbuffer();
        }
        Ok(n)
    }

    fn read_pins(&mut self) -> Result<u8> {
        let data = self.control_in(sio::READ_PINS_REQUEST, 0, usb::SIO_INDEX, 1)?;
        match data.first() {
            Some(&pins) => {
                trace!("read_pins -> 0x{pins:02X}");
                Ok(pins)
            }
            None => {
                warn!("read_pins returned no data");
                Err(Error::DeviceUnavailable)
            }
        }
    }
}

/// Compact a raw bulk IN buffer by removing the two modem status bytes
/// the chip prepends to every `packet_size` chunk. Returns the payload
/// length; payload bytes are moved to the front of `data`.
fn strip_modem_status(data: &mut [u8], packet_size: usize) -> usize {
    let total = data.len();
    if total <= 2 {
        return 0;
    }
    let mut write_pos = 0;
    let mut pkt_start = 0;
    while pkt_start < total {
        let pkt_end = (pkt_start + packet_size).min(total);
        if pkt_end - pkt_start > 2 {
            let payload = pkt_start + 2..pkt_end;
            let len = payload.len();
            data.copy_within(payload, write_pos);
            write_pos += len;
        }
        pkt_start = pkt_end;
    }
    write_pos
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strip_single_packet() {
        let mut data = vec![0u8; 64];
        data[0] = 0x01;
        data[1] = 0x60;
        for i in 2..64 {
            data[i] = i as u8;
        }
        assert_eq!(strip_modem_status(&mut data, 64), 62);
        for i in 0..62 {
            assert_eq!(data[i], (i + 2) as u8);
        }
    }

    #[test]
    fn strip_multiple_packets() {
        let mut data = vec![
            0xAA, 0xBB, 2, 3, 4, 5, 6, 7, // packet 1
            0xCC, 0xDD, 10, 11, 12, 13, 14, 15, // packet 2
        ];
        assert_eq!(strip_modem_status(&mut data, 8), 12);
        assert_eq!(&data[..12], &[2, 3, 4, 5, 6, 7, 10, 11, 12, 13, 14, 15]);
    }

    #[test]
    fn strip_status_only() {
        let mut data = vec![0x01, 0x60];
        assert_eq!(strip_modem_status(&mut data, 64), 0);
    }

    #[test]
    fn strip_trailing_partial_packet() {
        // Full packet plus a status-only tail
        let mut data = vec![0xAA, 0xBB, 1, 2, 0xCC, 0xDD];
        assert_eq!(strip_modem_status(&mut data, 4), 2);
        assert_eq!(&data[..2], &[1, 2]);
    }

    #[test]
    fn strip_empty() {
        let mut data: Vec<u8> = vec![];
        assert_eq!(strip_modem_status(&mut data, 64), 0);
    }
}
