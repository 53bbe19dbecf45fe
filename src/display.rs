use crossterm::execute;
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use std::io;
use tui::backend::CrosstermBackend;
use tui::layout::Rect;
use tui::style::{Color, Style};
use tui::symbols::Marker;
use tui::widgets::canvas::{Canvas, Points};
use tui::widgets::{Block, Borders};
use tui::Terminal;

use crate::machine::{Framebuffer, DISPLAY_HEIGHT, DISPLAY_WIDTH};

/// Display is used by the driver to draw things on the screen. It should
/// abstract the implementation details, so a variety of kinds of screen would
/// work. Setting one up is whatever its constructor does.
pub trait Display {
    /// draw the whole framebuffer; never called with a partial frame
    fn draw(&mut self, frame: &Framebuffer) -> Result<(), io::Error>;

    /// give back whatever the display took over
    fn teardown(&mut self) -> Result<(), io::Error> {
        Ok(())
    }
}

// store useful metadata about the terminal
struct Resolution(usize, usize);

impl Resolution {
    fn x_bounds(&self) -> [f64; 2] {
        [0.0, (self.0 - 1) as f64]
    }

    fn y_bounds(&self) -> [f64; 2] {
        [-1.0 * (self.1 - 1) as f64, 0.0]
    }

    /// canvas coords for every pixel in one state; y is flipped because the
    /// canvas origin is bottom-left
    fn bitplane_from_frame(&self, frame: &Framebuffer, on: bool) -> Vec<(f64, f64)> {
        frame
            .points(on)
            .map(|(x, y)| (x as f64, -1.0 * y as f64))
            .collect()
    }
}

/// monochrome display in a terminal, rendered using TUI and crossterm
pub struct MonoTermDisplay {
    terminal: Terminal<CrosstermBackend<io::Stdout>>,
    resolution: Resolution,
    torn_down: bool,
}

impl MonoTermDisplay {
    /// takes over the terminal: raw mode, alternate screen, hidden cursor
    pub fn new() -> Result<MonoTermDisplay, io::Error> {
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen)?;
        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend)?;
        terminal.hide_cursor()?;
        terminal.clear()?;
        Ok(MonoTermDisplay {
            terminal,
            resolution: Resolution(DISPLAY_WIDTH, DISPLAY_HEIGHT),
            torn_down: false,
        })
    }
}

impl Display for MonoTermDisplay {
    fn draw(&mut self, frame: &Framebuffer) -> Result<(), io::Error> {
        let off = self.resolution.bitplane_from_frame(frame, false);
        let on = self.resolution.bitplane_from_frame(frame, true);

        // for now this assumes a 1:1 ratio between terminal, chip8 and the
        // internal TUI canvas
        let size = Rect::new(
            0,
            0,
            2 + self.resolution.0 as u16,
            2 + self.resolution.1 as u16,
        );
        let canvas = Canvas::default()
            .block(
                Block::default()
                    .title("CHIP-8")
                    .borders(Borders::ALL)
                    .style(Style::default().bg(Color::Black)),
            )
            .x_bounds(self.resolution.x_bounds())
            .y_bounds(self.resolution.y_bounds())
            .marker(Marker::Block)
            .paint(|ctx| {
                ctx.draw(&Points {
                    coords: &off,
                    color: Color::Black,
                });
                ctx.draw(&Points {
                    coords: &on,
                    color: Color::White,
                });
            });
        self.terminal.draw(|f| f.render_widget(canvas, size))?;
        Ok(())
    }

    fn teardown(&mut self) -> Result<(), io::Error> {
        if self.torn_down {
            return Ok(());
        }
        self.torn_down = true;
        disable_raw_mode()?;
        execute!(self.terminal.backend_mut(), LeaveAlternateScreen)?;
        self.terminal.show_cursor()
    }
}

impl Drop for MonoTermDisplay {
    fn drop(&mut self) {
        // best effort; there's nowhere left to report a failure to
        let _ = self.teardown();
    }
}

/// useful for testing non-display routines; remembers what it was asked to
/// draw
#[derive(Default)]
pub struct DummyDisplay {
    pub draws: usize,
    pub last_frame: Option<Framebuffer>,
    pub torn_down: bool,
}

impl DummyDisplay {
    pub fn new() -> DummyDisplay {
        DummyDisplay::default()
    }
}

impl Display for DummyDisplay {
    fn draw(&mut self, frame: &Framebuffer) -> Result<(), io::Error> {
        self.draws += 1;
        self.last_frame = Some(frame.clone());
        Ok(())
    }

    fn teardown(&mut self) -> Result<(), io::Error> {
        self.torn_down = true;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Resolution tests
    #[test]
    fn test_x_bounds() {
        let r = Resolution(64, 32);
        assert_eq!(r.x_bounds(), [0.0, 63.0]);
    }

    #[test]
    fn test_y_bounds() {
        let r = Resolution(64, 32);
        assert_eq!(r.y_bounds(), [-31.0, 0.0]);
    }

    #[test]
    fn test_bitplanes_split_the_frame() {
        let r = Resolution(64, 32);
        let mut fb = Framebuffer::new();
        fb.set(3, 2, true);
        assert_eq!(r.bitplane_from_frame(&fb, true), vec![(3.0, -2.0)]);
        assert_eq!(r.bitplane_from_frame(&fb, false).len(), 2047);
    }

    #[test]
    fn test_dummy_display_records_draws() -> Result<(), io::Error> {
        let mut d = DummyDisplay::new();
        let mut fb = Framebuffer::new();
        fb.set(1, 1, true);
        d.draw(&fb)?;
        d.draw(&fb)?;
        d.teardown()?;
        assert_eq!(d.draws, 2);
        assert_eq!(d.last_frame, Some(fb));
        assert!(d.torn_down);
        Ok(())
    }

    #[test]
    #[ignore]
    // NB. needs a real terminal
    fn test_draw_blank_frame() -> Result<(), io::Error> {
        let mut d = MonoTermDisplay::new()?;
        d.draw(&Framebuffer::new())?;
        d.teardown()
    }
}
