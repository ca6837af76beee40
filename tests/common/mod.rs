//! Scripted in-memory adapter used by the transport and controller
//! tests. Records every bridge call in a shared event log and emulates
//! the FT245R's latch and synchronous-mode echo queue.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use denkovi_relay::{
    BitbangMode, Bridge, DeviceSession, Error, RelayBoard, Result, SessionConfig,
};

/// One recorded bridge call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Claim,
    Reset,
    Purge,
    SetBaud(u32),
    SetLatency(u8),
    EnableBitbang { mask: u8, mode: BitbangMode },
    DisableBitbang,
    /// Register byte written (only bytes the mock accepted).
    Write(u8),
    /// Echo-drain read; payload bytes returned.
    ReadData(usize),
    /// Pin sample; value returned.
    ReadPins(u8),
}

pub type EventLog = Arc<Mutex<Vec<Event>>>;

/// Scripted adapter double.
pub struct MockBridge {
    log: EventLog,
    mode: Option<BitbangMode>,
    latched: u8,
    echo: VecDeque<u8>,
    write_count: usize,

    /// Claim reports the interface as held elsewhere.
    pub claim_busy: bool,
    /// Mode-set fails.
    pub fail_bitmode: bool,
    /// Writes at these 0-based indices fail outright.
    pub fail_writes_at: Vec<usize>,
    /// Writes at these 0-based indices are accepted short (0 bytes).
    pub short_writes_at: Vec<usize>,
    /// Pin reads fail.
    pub fail_pin_reads: bool,
    /// Pin reads return this instead of the latched byte.
    pub pins_override: Option<u8>,
    /// Synchronous writes do not enqueue their echo byte.
    pub swallow_echo: bool,
}

impl MockBridge {
    pub fn new() -> (Self, EventLog) {
        let log: EventLog = Arc::new(Mutex::new(Vec::new()));
        let mock = MockBridge {
            log: Arc::clone(&log),
            mode: None,
            latched: 0,
            echo: VecDeque::new(),
            write_count: 0,
            claim_busy: false,
            fail_bitmode: false,
            fail_writes_at: Vec::new(),
            short_writes_at: Vec::new(),
            fail_pin_reads: false,
            pins_override: None,
            swallow_echo: false,
        };
        (mock, log)
    }

    fn record(&self, event: Event) {
        self.log.lock().unwrap().push(event);
    }
}

impl Bridge for MockBridge {
    fn claim(&mut self) -> Result<()> {
        self.record(Event::Claim);
        if self.claim_busy {
            Err(Error::DeviceBusy)
        } else {
            Ok(())
        }
    }

    fn reset(&mut self) -> Result<()> {
        self.record(Event::Reset);
        Ok(())
    }

    fn purge_buffers(&mut self) -> Result<()> {
        self.record(Event::Purge);
        self.echo.clear();
        Ok(())
    }

    fn set_baud_rate(&mut self, baud_rate: u32) -> Result<()> {
        self.record(Event::SetBaud(baud_rate));
        Ok(())
    }

    fn set_latency_timer(&mut self, latency_ms: u8) -> Result<()> {
        self.record(Event::SetLatency(latency_ms));
        Ok(())
    }

    fn enable_bitbang(&mut self, mask: u8, mode: BitbangMode) -> Result<()> {
        self.record(Event::EnableBitbang { mask, mode });
        if self.fail_bitmode {
            return Err(Error::DeviceUnavailable);
        }
        self.mode = Some(mode);
        Ok(())
    }

    fn disable_bitbang(&mut self) -> Result<()> {
        self.record(Event::DisableBitbang);
        self.mode = None;
        Ok(())
    }

    fn write_data(&mut self, data: &[u8]) -> Result<usize> {
        let index = self.write_count;
        self.write_count += 1;

        if self.fail_writes_at.contains(&index) {
            return Err(Error::DeviceUnavailable);
        }
        if self.short_writes_at.contains(&index) {
            return Ok(0);
        }

        for &byte in data {
            self.record(Event::Write(byte));
            self.latched = byte;
            if self.mode == Some(BitbangMode::Sync) && !self.swallow_echo {
                self.echo.push_back(byte);
            }
        }
        Ok(data.len())
    }

    fn read_data(&mut self, buf: &mut [u8]) -> Result<usize> {
        let mut n = 0;
        while n < buf.len() {
            match self.echo.pop_front() {
                Some(byte) => {
                    buf[n] = byte;
                    n += 1;
                }
                None => break,
            }
        }
        self.record(Event::ReadData(n));
        Ok(n)
    }

    fn read_pins(&mut self) -> Result<u8> {
        if self.fail_pin_reads {
            return Err(Error::DeviceUnavailable);
        }
        let pins = self.pins_override.unwrap_or(self.latched);
        self.record(Event::ReadPins(pins));
        Ok(pins)
    }
}

/// Session config with the given mode; timing fields are irrelevant to
/// the mock.
pub fn test_config(mode: BitbangMode) -> SessionConfig {
    SessionConfig {
        mode,
        ..SessionConfig::default()
    }
}

/// Opens and configures a session over the mock, then wraps it in a
/// board with a zero settle window so tests never sleep.
pub fn configured_board(mock: MockBridge, mode: BitbangMode) -> RelayBoard<MockBridge> {
    let mut session = DeviceSession::open(mock).expect("mock open failed");
    session
        .configure(&test_config(mode))
        .expect("mock configure failed");
    let mut board = RelayBoard::from_session(session);
    board.set_settle_window(Duration::ZERO);
    board
}

/// The register bytes written, in order.
pub fn writes(log: &EventLog) -> Vec<u8> {
    log.lock()
        .unwrap()
        .iter()
        .filter_map(|e| match e {
            Event::Write(b) => Some(*b),
            _ => None,
        })
        .collect()
}

/// Count of a given event kind.
pub fn count_events(log: &EventLog, pred: impl Fn(&Event) -> bool) -> usize {
    log.lock().unwrap().iter().filter(|e| pred(e)).count()
}
