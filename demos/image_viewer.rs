//! # Image viewer
//!
//! Loads an image, resizes it to the grid, and shows it until interrupted.
//!
//! ```sh
//! MATRIX_TERMINAL_EMULATOR=1 cargo run --example image_viewer -- photo.png --cols 64
//! ```

use clap::Parser;
use led_grid::render::{image_to_colors, load_and_resize_image};
use led_grid::{Error, HardwareConfig, Matrix, RuntimeConfig, is_running, new_matrix, setup_signal_handler};
use std::path::PathBuf;
use std::thread;
use std::time::Duration;

#[derive(Parser)]
#[command(name = "image_viewer")]
#[command(about = "Display an image on the pixel grid")]
struct Args {
    /// Path to the image file (PNG or JPEG)
    image_path: PathBuf,

    /// Rows per panel
    #[arg(long, default_value = "32")]
    rows: usize,

    /// Columns per panel
    #[arg(long, default_value = "32")]
    cols: usize,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let config = HardwareConfig {
        rows: args.rows,
        cols: args.cols,
        ..HardwareConfig::default()
    };

    let mut matrix = new_matrix(&config, &RuntimeConfig::default())?;
    let running = setup_signal_handler()?;
    let geometry = matrix.geometry();

    let img = load_and_resize_image(&args.image_path, geometry)?;
    let leds = image_to_colors(&img);

    while is_running(&running) && !matrix.is_closed() {
        // Every render clears the buffer, so the image is re-applied.
        match matrix.apply(&leds) {
            Ok(()) => {}
            Err(Error::Closed) => break,
            Err(e) => return Err(e.into()),
        }
        thread::sleep(Duration::from_millis(100));
    }

    matrix.close()?;
    Ok(())
}
