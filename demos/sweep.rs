use std::time::Duration;

use denkovi_relay::{Readback, RelayBoard, Result, SweepOptions};

fn main() -> Result<()> {
    env_logger::init();

    println!("Opening first FT245R relay board...");
    let mut board = RelayBoard::open_first()?;
    println!("Board opened, all relays off.");

    let options = SweepOptions {
        hold: Duration::from_secs(2),
        pause: Duration::from_millis(500),
        verify: true,
    };

    println!("Sweeping relays 1-8 ({}s hold each)...", options.hold.as_secs());
    let report = board.sweep_with(&options, &denkovi_relay::AbortFlag::new(), |step| {
        let readback = match &step.readback {
            Some(Readback::Match) => "readback ok".to_string(),
            Some(other) => other.to_string(),
            None => "readback skipped".to_string(),
        };
        match &step.on_outcome {
            Ok(o) if o.complete() => println!("Relay {}: ON -> OFF ({readback})", step.channel),
            Ok(_) => println!("Relay {}: short write", step.channel),
            Err(e) => println!("Relay {}: write failed: {e}", step.channel),
        }
    })?;

    println!(
        "Sweep done: {} steps, {} write failures, {} mismatches",
        report.steps.len(),
        report.write_failures(),
        report.mismatches()
    );

    println!("All relays ON for 3 seconds...");
    board.set_all(true)?;
    println!("  pins now: {}", board.read_pins()?);
    std::thread::sleep(Duration::from_secs(3));

    println!("Shutting down (all off, mode reset)...");
    board.shutdown()?;
    println!("Done.");
    Ok(())
}
