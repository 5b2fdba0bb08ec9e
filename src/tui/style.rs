//! Chart colors.

use ratatui::style::{Color, Style};

pub struct Theme;

impl Theme {
    pub const AXIS: Color = Color::DarkGray;
    pub const BORDER: Color = Color::DarkGray;
    pub const MARKER: Color = Color::Red;

    /// Line colors, cycled per group.
    pub const SERIES: [Color; 6] = [
        Color::Cyan,
        Color::Yellow,
        Color::Green,
        Color::Magenta,
        Color::Blue,
        Color::White,
    ];

    pub fn series(index: usize) -> Style {
        Style::default().fg(Self::SERIES[index % Self::SERIES.len()])
    }

    pub fn marker() -> Style {
        Style::default().fg(Self::MARKER)
    }

    pub fn axis() -> Style {
        Style::default().fg(Self::AXIS)
    }

    pub fn border() -> Style {
        Style::default().fg(Self::BORDER)
    }
}
