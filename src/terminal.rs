//! [`Matrix`] drawn into a character terminal.
//!
//! Each character cell shows two vertically stacked pixels: the upper half
//! block glyph takes the top pixel as its foreground and the bottom pixel as
//! its background, in 24-bit color.
//!
//! In interactive mode the terminal is switched to raw mode on the alternate
//! screen and a background thread polls for a quit key (Esc, `q`, or Ctrl+C,
//! since raw mode swallows SIGINT). The render path and the input thread
//! share the output behind a mutex and an atomic closed flag; whoever closes
//! first restores the terminal, and the other side sees the flag.

use crate::color::{Color, ColorModel, pack};
use crate::error::{Error, Result};
use crate::geometry::Geometry;
use crate::matrix::Matrix;
use crossterm::cursor::{Hide, MoveTo, Show};
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::style::{Color as TermColor, Print, ResetColor, SetBackgroundColor, SetForegroundColor};
use crossterm::terminal::{
    Clear, ClearType, EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode,
    enable_raw_mode,
};
use crossterm::{execute, queue};
use image::{Rgb, RgbImage};
use std::io::{self, Stdout, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// How long the input thread waits for an event before checking the closed
/// flag again.
pub const POLL_INTERVAL: Duration = Duration::from_millis(10);

const UPPER_HALF_BLOCK: char = '▀';

fn term_color(Rgb([r, g, b]): Rgb<u8>) -> TermColor {
    TermColor::Rgb { r, g, b }
}

/// Draw `raster` at the top-left of `out`, two pixel rows per text row.
/// An odd last row is drawn over black.
pub fn paint<W: Write>(out: &mut W, raster: &RgbImage) -> io::Result<()> {
    let (width, height) = raster.dimensions();
    for row in 0..height.div_ceil(2) {
        let y = row * 2;
        queue!(out, MoveTo(0, row as u16))?;
        for x in 0..width {
            let top = *raster.get_pixel(x, y);
            let bottom = if y + 1 < height {
                *raster.get_pixel(x, y + 1)
            } else {
                Rgb([0, 0, 0])
            };
            queue!(
                out,
                SetForegroundColor(term_color(top)),
                SetBackgroundColor(term_color(bottom)),
                Print(UPPER_HALF_BLOCK)
            )?;
        }
    }
    queue!(out, ResetColor)?;
    out.flush()
}

fn is_quit_key(key: &KeyEvent) -> bool {
    if key.kind != KeyEventKind::Press {
        return false;
    }
    match key.code {
        KeyCode::Esc | KeyCode::Char('q') => true,
        KeyCode::Char('c') => key.modifiers.contains(KeyModifiers::CONTROL),
        _ => false,
    }
}

/// State shared between the render path and the input thread.
struct Shared<W> {
    out: Mutex<W>,
    closed: AtomicBool,
    /// Raw mode and the alternate screen were entered and must be undone.
    raw_mode: bool,
}

impl<W: Write> Shared<W> {
    fn lock(&self) -> MutexGuard<'_, W> {
        self.out.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Mark closed and restore the terminal. Only the first caller does any
    /// work, so the input thread and the owner may both call it.
    fn shutdown(&self) -> io::Result<()> {
        if self.closed.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        if self.raw_mode {
            let mut guard = self.lock();
            let out = &mut *guard;
            execute!(out, ResetColor, Show, LeaveAlternateScreen)?;
            disable_raw_mode()?;
        }
        Ok(())
    }
}

fn poll_input<W: Write>(shared: Arc<Shared<W>>) {
    while !shared.is_closed() {
        match event::poll(POLL_INTERVAL) {
            Ok(false) => {}
            Ok(true) => match event::read() {
                Ok(Event::Key(key)) if is_quit_key(&key) => {
                    tracing::info!("Quit key pressed, closing terminal matrix");
                    if let Err(e) = shared.shutdown() {
                        tracing::warn!("Failed to restore terminal: {}", e);
                    }
                }
                Ok(_) => {}
                Err(e) => {
                    tracing::warn!("Terminal event read failed: {}", e);
                    thread::sleep(POLL_INTERVAL);
                }
            },
            Err(e) => {
                tracing::warn!("Terminal event poll failed, input disabled: {}", e);
                break;
            }
        }
    }
}

pub struct TerminalEmulator<W: Write + Send + 'static = Stdout> {
    geometry: Geometry,
    raster: RgbImage,
    shared: Arc<Shared<W>>,
    input: Option<JoinHandle<()>>,
}

impl TerminalEmulator<Stdout> {
    /// Take over stdout: raw mode, alternate screen, hidden cursor, and an
    /// input thread watching for the quit key.
    pub fn new(geometry: Geometry) -> Result<Self> {
        enable_raw_mode()?;
        let mut out = io::stdout();
        if let Err(e) = execute!(out, EnterAlternateScreen, Hide, Clear(ClearType::All)) {
            let _ = disable_raw_mode();
            return Err(e.into());
        }

        let shared = Arc::new(Shared {
            out: Mutex::new(out),
            closed: AtomicBool::new(false),
            raw_mode: true,
        });

        let input = thread::Builder::new()
            .name("matrix-input".to_string())
            .spawn({
                let shared = shared.clone();
                move || poll_input(shared)
            });
        let input = match input {
            Ok(handle) => handle,
            Err(e) => {
                let _ = shared.shutdown();
                return Err(e.into());
            }
        };

        tracing::info!(
            "Terminal emulator ready: {}x{}",
            geometry.width,
            geometry.height
        );

        Ok(Self {
            geometry,
            raster: RgbImage::new(geometry.width as u32, geometry.height as u32),
            shared,
            input: Some(input),
        })
    }
}

impl<W: Write + Send + 'static> TerminalEmulator<W> {
    /// Paint into `out` without touching the real terminal or reading input.
    pub fn headless(geometry: Geometry, out: W) -> Self {
        Self {
            geometry,
            raster: RgbImage::new(geometry.width as u32, geometry.height as u32),
            shared: Arc::new(Shared {
                out: Mutex::new(out),
                closed: AtomicBool::new(false),
                raw_mode: false,
            }),
            input: None,
        }
    }

    /// The output sink. Holding the guard blocks rendering.
    pub fn output(&self) -> MutexGuard<'_, W> {
        self.shared.lock()
    }

    fn pixel(&self, position: usize) -> (u32, u32) {
        assert!(
            position < self.geometry.pixel_count(),
            "position {position} out of range for {}x{} matrix",
            self.geometry.width,
            self.geometry.height
        );
        let (x, y) = self.geometry.coordinates(position);
        (x as u32, y as u32)
    }
}

impl<W: Write + Send + 'static> Matrix for TerminalEmulator<W> {
    fn geometry(&self) -> Geometry {
        self.geometry
    }

    fn set(&mut self, position: usize, color: &dyn ColorModel) {
        let (x, y) = self.pixel(position);
        self.raster.put_pixel(x, y, Color::from_packed(pack(color)).into());
    }

    fn at(&self, position: usize) -> Color {
        let (x, y) = self.pixel(position);
        Color::from(*self.raster.get_pixel(x, y))
    }

    fn render(&mut self) -> Result<()> {
        {
            let mut out = self.shared.lock();
            if self.shared.is_closed() {
                return Err(Error::Closed);
            }
            paint(&mut *out, &self.raster)?;
        }
        for pixel in self.raster.pixels_mut() {
            *pixel = Rgb([0, 0, 0]);
        }
        Ok(())
    }

    fn brightness(&self) -> u8 {
        0
    }

    fn set_brightness(&mut self, _brightness: u8) {}

    fn close(&mut self) -> Result<()> {
        let already_closed = self.shared.is_closed();
        self.shared.shutdown()?;
        if let Some(input) = self.input.take() {
            if input.join().is_err() {
                tracing::warn!("Terminal input thread panicked");
            }
        }
        if already_closed {
            tracing::debug!("Terminal emulator already closed");
        } else {
            tracing::debug!("Terminal emulator closed");
        }
        Ok(())
    }

    fn is_closed(&self) -> bool {
        self.shared.is_closed()
    }
}

impl<W: Write + Send + 'static> Drop for TerminalEmulator<W> {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            tracing::warn!("Failed to restore terminal: {}", e);
        }
    }
}
