use std::time::Duration;

use denkovi_relay::{Channel, PinRegister, RelayBoard, Result};

// Which relay to exercise
const CHANNEL: u8 = 1;

fn main() -> Result<()> {
    env_logger::init();

    let channel = Channel::new(CHANNEL)?;

    println!("Opening first FT245R relay board...");
    let mut board = RelayBoard::open_first()?;

    println!("Turning relay {channel} on...");
    let applied = board.set_channel(channel, true, PinRegister::ALL_OFF)?;
    println!("  wrote 0x{:02X}, {}", applied.register, board.verify(applied.register));
    println!("  state: {}", applied.register);

    std::thread::sleep(Duration::from_secs(2));

    println!("Turning relay {channel} off...");
    let applied = board.set_channel(channel, false, applied.register)?;
    println!("  wrote 0x{:02X}, {}", applied.register, board.verify(applied.register));

    board.shutdown()
}
