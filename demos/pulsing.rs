//! # Pulsing colors
//!
//! Fills the grid with a hue that cycles through the rainbow while the
//! brightness ramps up and down.
//!
//! ```sh
//! MATRIX_EMULATOR=1 MATRIX_EMULATOR_SNAPSHOT=/tmp/pulse.png cargo run --example pulsing
//! ```

use led_grid::render::Pattern;
use led_grid::{Error, HardwareConfig, Matrix, RuntimeConfig, is_running, new_matrix, setup_signal_handler};
use std::thread;
use std::time::Duration;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut matrix = new_matrix(&HardwareConfig::default(), &RuntimeConfig::default())?;
    let running = setup_signal_handler()?;
    let geometry = matrix.geometry();
    let mut tick: u32 = 0;

    while is_running(&running) && !matrix.is_closed() {
        match matrix.apply(&Pattern::Pulse.frame(geometry, tick)) {
            Ok(()) => {}
            Err(Error::Closed) => break,
            Err(e) => return Err(e.into()),
        }
        tick = tick.wrapping_add(1);
        thread::sleep(Duration::from_millis(16));
    }

    matrix.close()?;
    println!("\nShutting down cleanly.");
    Ok(())
}
