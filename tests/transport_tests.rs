//! Transport-level tests: synchronous-mode write/echo pairing, short
//! writes, and the pin-read path, all against the scripted mock.

mod common;

use common::{count_events, Event, MockBridge};
use denkovi_relay::{
    BitbangMode, BitbangTransport, DeviceSession, Error, PinRegister,
};

fn configured_transport(
    mock: MockBridge,
    mode: BitbangMode,
) -> BitbangTransport<MockBridge> {
    let mut session = DeviceSession::open(mock).unwrap();
    session.configure(&common::test_config(mode)).unwrap();
    BitbangTransport::new(session)
}

#[test]
fn sync_mode_pairs_every_write_with_one_echo_read() {
    let (mock, log) = MockBridge::new();
    let mut transport = configured_transport(mock, BitbangMode::Sync);

    for bits in [0x01u8, 0x00, 0x80, 0xFF, 0x00] {
        let outcome = transport.write(PinRegister::from_bits(bits)).unwrap();
        assert!(outcome.complete());
    }

    // Between any two consecutive writes there must be exactly one
    // drain read, and the last write must be drained too.
    let events = log.lock().unwrap().clone();
    let mut pending_drains = 0usize;
    for event in &events {
        match event {
            Event::Write(_) => {
                assert_eq!(
                    pending_drains, 0,
                    "write issued with an undrained echo outstanding: {events:?}"
                );
                pending_drains += 1;
            }
            Event::ReadData(n) => {
                assert_eq!(*n, 1, "each drain read returns one echo byte");
                pending_drains -= 1;
            }
            _ => {}
        }
    }
    assert_eq!(pending_drains, 0, "final echo byte left undrained");
    assert_eq!(count_events(&log, |e| matches!(e, Event::Write(_))), 5);
    assert_eq!(count_events(&log, |e| matches!(e, Event::ReadData(_))), 5);
}

#[test]
fn async_mode_never_reads_data() {
    let (mock, log) = MockBridge::new();
    let mut transport = configured_transport(mock, BitbangMode::Async);

    for bits in [0x01u8, 0x02, 0x00] {
        transport.write(PinRegister::from_bits(bits)).unwrap();
    }

    assert_eq!(count_events(&log, |e| matches!(e, Event::ReadData(_))), 0);
    assert_eq!(count_events(&log, |e| matches!(e, Event::Write(_))), 3);
}

#[test]
fn short_write_is_reported_and_not_drained() {
    let (mut mock, log) = MockBridge::new();
    mock.short_writes_at = vec![0];
    let mut transport = configured_transport(mock, BitbangMode::Sync);

    let outcome = transport.write(PinRegister::ALL_ON).unwrap();
    assert_eq!(outcome.accepted, 0);
    assert!(!outcome.complete());
    // Nothing was accepted, so nothing may be drained
    assert_eq!(count_events(&log, |e| matches!(e, Event::ReadData(_))), 0);
}

#[test]
fn stalled_echo_surfaces_as_drain_error() {
    let (mut mock, _log) = MockBridge::new();
    mock.swallow_echo = true;
    let mut transport = configured_transport(mock, BitbangMode::Sync);

    match transport.write(PinRegister::from_bits(0x01)) {
        Err(Error::EchoDrain { expected, drained }) => {
            assert_eq!(expected, 1);
            assert_eq!(drained, 0);
        }
        other => panic!("expected EchoDrain, got {other:?}"),
    }
}

#[test]
fn pin_read_is_distinct_from_echo_drain() {
    let (mock, log) = MockBridge::new();
    let mut transport = configured_transport(mock, BitbangMode::Sync);

    transport.write(PinRegister::from_bits(0x12)).unwrap();
    let pins = transport.read_pins().unwrap();
    assert_eq!(pins.bits(), 0x12);

    // The latch snapshot must be a ReadPins event, never a ReadData
    assert_eq!(count_events(&log, |e| matches!(e, Event::ReadPins(_))), 1);
    assert_eq!(count_events(&log, |e| matches!(e, Event::ReadData(_))), 1);
}

#[test]
fn write_on_unconfigured_session_is_rejected() {
    let (mock, log) = MockBridge::new();
    let session = DeviceSession::open(mock).unwrap();
    let mut transport = BitbangTransport::new(session);

    match transport.write(PinRegister::ALL_ON) {
        Err(Error::NotConfigured) => {}
        other => panic!("expected NotConfigured, got {other:?}"),
    }
    // The rejection happens before the bridge sees anything
    assert_eq!(count_events(&log, |e| matches!(e, Event::Write(_))), 0);
}

#[test]
fn failed_write_propagates() {
    let (mut mock, _log) = MockBridge::new();
    mock.fail_writes_at = vec![0];
    let mut transport = configured_transport(mock, BitbangMode::Async);

    assert!(transport.write(PinRegister::ALL_ON).is_err());
    // The next write is unaffected
    assert!(transport.write(PinRegister::ALL_OFF).unwrap().complete());
}
