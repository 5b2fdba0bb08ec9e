//! Crossterm-backed renderer.

use std::io::{self, Stdout};

use crossterm::cursor;
use crossterm::execute;
use crossterm::terminal::{Clear, ClearType};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use tracing::debug;

use super::chart::draw_groups;
use crate::runtime::{Dimensions, GroupSeries, RenderError, Renderer};

/// Draws charts on the primary screen.
///
/// Raw mode and the alternate screen are left alone, so Ctrl-C reaches the
/// signal handler and the last frame stays on screen after exit.
pub struct TerminalRenderer {
    terminal: Terminal<CrosstermBackend<Stdout>>,
}

impl TerminalRenderer {
    /// Clears the screen and hides the cursor.
    pub fn new() -> Result<Self, RenderError> {
        let mut stdout = io::stdout();
        execute!(stdout, Clear(ClearType::All), cursor::Hide)?;
        let terminal = Terminal::new(CrosstermBackend::new(stdout))?;
        Ok(Self { terminal })
    }
}

/// Size of the controlling terminal.
pub fn terminal_size() -> Result<Dimensions, RenderError> {
    let (width, height) = crossterm::terminal::size()?;
    Ok(Dimensions { width, height })
}

impl Renderer for TerminalRenderer {
    fn dimensions(&mut self) -> Result<Dimensions, RenderError> {
        terminal_size()
    }

    fn render(&mut self, groups: &[GroupSeries], dims: Dimensions) -> Result<(), RenderError> {
        if dims.width == 0 || dims.height == 0 {
            debug!("terminal has no area, skipping frame");
            return Ok(());
        }
        self.terminal.draw(|frame| draw_groups(frame, groups))?;
        Ok(())
    }
}

impl Drop for TerminalRenderer {
    fn drop(&mut self) {
        let _ = execute!(self.terminal.backend_mut(), cursor::Show);
    }
}
