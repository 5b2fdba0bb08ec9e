//! Terminal output.
//!
//! Each display group becomes one chart; charts share the terminal height
//! evenly and are redrawn in place on every render tick.

mod chart;
mod style;
mod terminal;

pub use chart::draw_groups;
pub use terminal::{TerminalRenderer, terminal_size};
