//! # Minimal example
//!
//! A white pixel walks along the top row, the center pixel cycles through
//! the rainbow, and a red X is drawn across the grid.
//!
//! Runs on whichever backend the environment selects:
//! ```sh
//! MATRIX_TERMINAL_EMULATOR=1 cargo run --example minimal
//! sudo ./target/release/examples/minimal   # built with --features hardware
//! ```
//! Stop with Ctrl+C, or Esc / q in the terminal emulator.

use led_grid::{Color, Error, HardwareConfig, Matrix, RuntimeConfig, is_running, new_matrix, setup_signal_handler};
use std::thread;
use std::time::Duration;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut matrix = new_matrix(&HardwareConfig::default(), &RuntimeConfig::default())?;
    let running = setup_signal_handler()?;
    let geometry = matrix.geometry();
    let (width, height) = (geometry.width, geometry.height);
    let mut frame: usize = 0;

    while is_running(&running) && !matrix.is_closed() {
        // Walking pixel
        matrix.set(geometry.position(frame % width, 0), &Color::new(255, 255, 255));

        // Color-cycling center
        let hue = (frame.wrapping_mul(5) % 360) as u16;
        matrix.set(geometry.position(width / 2, height / 2), &Color::from_hue(hue));

        // X across the grid
        for i in 0..height.min(width) {
            matrix.set(geometry.position(i, i), &Color::new(255, 0, 0));
            matrix.set(geometry.position(width - 1 - i, i), &Color::new(0, 255, 0));
        }

        match matrix.render() {
            Ok(()) => {}
            Err(Error::Closed) => break,
            Err(e) => return Err(e.into()),
        }
        frame = frame.wrapping_add(1);
        thread::sleep(Duration::from_millis(16));
    }

    matrix.close()?;
    println!("\nShutting down cleanly.");
    Ok(())
}
