use std::io;
use tui::backend::CrosstermBackend;
use tui::layout::Rect;
use tui::style::{Color, Style};
use tui::symbols::Marker;
use tui::widgets::canvas::{Canvas, Points};
use tui::widgets::{Block, Borders};
use tui::Terminal;

pub const CHIP8_DISPLAY_WIDTH: usize = 64;
pub const CHIP8_DISPLAY_HEIGHT: usize = 32;

/// sprites are always one byte wide
const SPRITE_WIDTH: usize = 8;

/// The 64x32 monochrome screen, row-major from the top-left. Only the
/// interpreter draws on it; hosts get it by shared reference
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Framebuffer {
    pixels: [bool; CHIP8_DISPLAY_WIDTH * CHIP8_DISPLAY_HEIGHT],
}

impl Framebuffer {
    pub fn new() -> Self {
        Framebuffer {
            pixels: [false; CHIP8_DISPLAY_WIDTH * CHIP8_DISPLAY_HEIGHT],
        }
    }

    pub fn width(&self) -> usize {
        CHIP8_DISPLAY_WIDTH
    }

    pub fn height(&self) -> usize {
        CHIP8_DISPLAY_HEIGHT
    }

    pub fn clear(&mut self) {
        self.pixels.fill(false);
    }

    /// pixel at (x, y); coordinates wrap
    pub fn get(&self, x: usize, y: usize) -> bool {
        self.pixels[Self::index(x, y)]
    }

    pub fn pixels(&self) -> &[bool] {
        &self.pixels
    }

    pub fn rows(&self) -> impl Iterator<Item = &[bool]> {
        self.pixels.chunks(CHIP8_DISPLAY_WIDTH)
    }

    pub fn lit_count(&self) -> usize {
        self.pixels.iter().filter(|&&p| p).count()
    }

    /// XOR a sprite onto the screen with its top-left corner at (x, y). each
    /// byte of `sprite` is a row, msb on the left. both the origin and every
    /// pixel wrap around the screen edges.
    ///
    /// returns true if any lit pixel got switched off
    pub fn draw_sprite(&mut self, x: usize, y: usize, sprite: &[u8]) -> bool {
        let mut collision = false;
        for (row, &bits) in sprite.iter().enumerate() {
            for col in 0..SPRITE_WIDTH {
                if bits & (0x80 >> col) == 0 {
                    continue;
                }
                let px = &mut self.pixels[Self::index(x + col, y + row)];
                collision |= *px;
                *px ^= true;
            }
        }
        collision
    }

    fn index(x: usize, y: usize) -> usize {
        (y % CHIP8_DISPLAY_HEIGHT) * CHIP8_DISPLAY_WIDTH + (x % CHIP8_DISPLAY_WIDTH)
    }
}

impl Default for Framebuffer {
    fn default() -> Self {
        Self::new()
    }
}

/// Display is used by the host to put the framebuffer on a screen. It should
/// abstract the implementation details, so a variety of kinds of screen would
/// work.
pub trait Display {
    fn draw(&mut self, frame: &Framebuffer) -> Result<(), io::Error>;
}

// store useful metadata about the terminal canvas
struct Resolution(usize, usize);

impl Resolution {
    fn x_bounds(&self) -> [f64; 2] {
        [0.0, (self.0 - 1) as f64]
    }

    fn y_bounds(&self) -> [f64; 2] {
        [-1.0 * (self.1 - 1) as f64, 0.0]
    }

    /// canvas coordinates of every pixel that is `lit` (or not); y grows
    /// downward on the chip-8 but upward on the canvas
    fn bitplane<'a>(
        &self,
        frame: &'a Framebuffer,
        lit: bool,
    ) -> impl std::iter::Iterator<Item = (f64, f64)> + 'a {
        let w = frame.width();
        frame
            .pixels()
            .iter()
            .enumerate()
            .filter(move |(_, p)| **p == lit)
            .map(move |(n, _)| ((n % w) as f64, -1.0 * (n / w) as f64))
    }
}

/// monochrome display in a terminal, rendered using TUI and Crossterm
pub struct MonoTermDisplay {
    terminal: Terminal<CrosstermBackend<io::Stdout>>,
    resolution: Resolution,
}

impl MonoTermDisplay {
    pub fn new() -> Result<MonoTermDisplay, io::Error> {
        let backend = CrosstermBackend::new(io::stdout());
        let mut terminal = Terminal::new(backend)?;
        terminal.clear()?;
        terminal.hide_cursor()?;
        Ok(MonoTermDisplay {
            terminal,
            resolution: Resolution(CHIP8_DISPLAY_WIDTH, CHIP8_DISPLAY_HEIGHT),
        })
    }
}

impl Drop for MonoTermDisplay {
    fn drop(&mut self) {
        let _ = self.terminal.show_cursor();
    }
}

impl Display for MonoTermDisplay {
    fn draw(&mut self, frame: &Framebuffer) -> Result<(), io::Error> {
        // expand each bitplane into x, y float coords, suitable for
        // rendering with TUI. this just prints blocky points for now
        let dark = self.resolution.bitplane(frame, false).collect::<Vec<_>>();
        let lit = self.resolution.bitplane(frame, true).collect::<Vec<_>>();
        let x_bounds = self.resolution.x_bounds();
        let y_bounds = self.resolution.y_bounds();
        let size = Rect::new(
            0,
            0,
            2 + self.resolution.0 as u16,
            2 + self.resolution.1 as u16,
        );

        // for now this assumes a 1:1 ratio between terminal, chip8 and the
        // internal TUI canvas
        self.terminal.draw(|f| {
            let canvas = Canvas::default()
                .block(
                    Block::default()
                        .title("CHIP-8")
                        .borders(Borders::ALL)
                        .style(Style::default().bg(Color::Black)),
                )
                .x_bounds(x_bounds)
                .y_bounds(y_bounds)
                .marker(Marker::Block)
                .paint(|ctx| {
                    ctx.draw(&Points {
                        coords: &dark,
                        color: Color::Black,
                    });
                    ctx.draw(&Points {
                        coords: &lit,
                        color: Color::White,
                    });
                });
            f.render_widget(canvas, size);
        })?;
        Ok(())
    }
}

/// useful for running headless; remembers how many frames it was given
#[derive(Default)]
pub struct DummyDisplay {
    pub frames: usize,
    pub last_lit: usize,
}

impl DummyDisplay {
    pub fn new() -> DummyDisplay {
        Self::default()
    }
}

impl Display for DummyDisplay {
    fn draw(&mut self, frame: &Framebuffer) -> Result<(), io::Error> {
        self.frames += 1;
        self.last_lit = frame.lit_count();
        Ok(())
    }
}
