//! Status line rendering.
//!
//! Each metric contributes one styled segment; metrics without data
//! contribute nothing at all. A single style reset closes the line.

use std::fmt::{self, Write as _};

use crossterm::Command as _;
use crossterm::style::{Attribute, SetAttribute, SetBackgroundColor, SetForegroundColor};
use serde::{Deserialize, Serialize};

use crate::clock::Clock;
use crate::metrics::Metric;
use crate::refresh::{Coordinator, Launcher};

/// Segment colour, named as tmux names them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Color {
    #[default]
    Default,
    Black,
    Red,
    Green,
    Yellow,
    Blue,
    Magenta,
    Cyan,
    White,
    BrightBlack,
    BrightRed,
    BrightGreen,
    BrightYellow,
    BrightBlue,
    BrightMagenta,
    BrightCyan,
    BrightWhite,
}

impl Color {
    pub fn name(self) -> &'static str {
        match self {
            Color::Default => "default",
            Color::Black => "black",
            Color::Red => "red",
            Color::Green => "green",
            Color::Yellow => "yellow",
            Color::Blue => "blue",
            Color::Magenta => "magenta",
            Color::Cyan => "cyan",
            Color::White => "white",
            Color::BrightBlack => "brightblack",
            Color::BrightRed => "brightred",
            Color::BrightGreen => "brightgreen",
            Color::BrightYellow => "brightyellow",
            Color::BrightBlue => "brightblue",
            Color::BrightMagenta => "brightmagenta",
            Color::BrightCyan => "brightcyan",
            Color::BrightWhite => "brightwhite",
        }
    }

    fn to_crossterm(self) -> crossterm::style::Color {
        use crossterm::style::Color as C;
        match self {
            Color::Default => C::Reset,
            Color::Black => C::Black,
            Color::Red => C::DarkRed,
            Color::Green => C::DarkGreen,
            Color::Yellow => C::DarkYellow,
            Color::Blue => C::DarkBlue,
            Color::Magenta => C::DarkMagenta,
            Color::Cyan => C::DarkCyan,
            Color::White => C::Grey,
            Color::BrightBlack => C::DarkGrey,
            Color::BrightRed => C::Red,
            Color::BrightGreen => C::Green,
            Color::BrightYellow => C::Yellow,
            Color::BrightBlue => C::Blue,
            Color::BrightMagenta => C::Magenta,
            Color::BrightCyan => C::Cyan,
            Color::BrightWhite => C::White,
        }
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Foreground/background pair plus optional emphasis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Style {
    pub fg: Color,
    pub bg: Color,
    pub bright: bool,
}

impl Style {
    pub const fn new(fg: Color, bg: Color) -> Self {
        Self {
            fg,
            bg,
            bright: false,
        }
    }

    #[must_use]
    pub const fn bright(mut self) -> Self {
        self.bright = true;
        self
    }
}

/// Markup dialect for the rendered line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// `#[fg=..,bg=..]` style directives for `status-right` and friends.
    #[default]
    Tmux,
    /// ANSI SGR escapes for a plain terminal.
    Ansi,
}

impl OutputFormat {
    fn write_style(self, out: &mut String, style: Style) {
        match self {
            OutputFormat::Tmux => {
                let _ = write!(out, "#[fg={},bg={}", style.fg, style.bg);
                if style.bright {
                    out.push_str(",bright");
                }
                out.push(']');
            }
            OutputFormat::Ansi => {
                let _ = SetForegroundColor(style.fg.to_crossterm()).write_ansi(out);
                let _ = SetBackgroundColor(style.bg.to_crossterm()).write_ansi(out);
                if style.bright {
                    let _ = SetAttribute(Attribute::Bold).write_ansi(out);
                }
            }
        }
    }

    fn write_reset(self, out: &mut String) {
        match self {
            OutputFormat::Tmux => out.push_str("#[default]"),
            OutputFormat::Ansi => {
                let _ = SetAttribute(Attribute::Reset).write_ansi(out);
            }
        }
    }
}

/// Builds the status line from a list of metrics.
#[derive(Debug, Clone, Copy, Default)]
pub struct Renderer {
    format: OutputFormat,
}

impl Renderer {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    /// Renders every metric in order. Never blocks on a background probe.
    pub fn render<C: Clock, L: Launcher>(
        &self,
        coordinator: &Coordinator<'_, C, L>,
        metrics: &[Metric],
    ) -> String {
        self.render_segments(
            metrics
                .iter()
                .map(|metric| (metric.style(), coordinator.value_for(metric))),
        )
    }

    /// Renders already-resolved segments. `None` and empty texts are skipped.
    pub fn render_segments<I>(&self, segments: I) -> String
    where
        I: IntoIterator<Item = (Style, Option<String>)>,
    {
        let mut out = String::new();
        let mut any = false;
        for (style, text) in segments {
            let Some(text) = text.filter(|t| !t.is_empty()) else {
                continue;
            };
            self.format.write_style(&mut out, style);
            out.push(' ');
            out.push_str(&text);
            out.push(' ');
            any = true;
        }
        if any {
            self.format.write_reset(&mut out);
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tmux_segments_and_single_reset() {
        let renderer = Renderer::new(OutputFormat::Tmux);
        let line = renderer.render_segments([
            (Style::new(Color::Blue, Color::White), Some("1d1h".to_string())),
            (
                Style::new(Color::Black, Color::Yellow).bright(),
                Some("0.42".to_string()),
            ),
        ]);

        assert_eq!(
            line,
            "#[fg=blue,bg=white] 1d1h #[fg=black,bg=yellow,bright] 0.42 #[default]"
        );
    }

    #[test]
    fn test_empty_segments_leave_no_markup() {
        let renderer = Renderer::new(OutputFormat::Tmux);
        let line = renderer.render_segments([
            (Style::new(Color::White, Color::Red), Some(String::new())),
            (Style::new(Color::Blue, Color::White), Some("9s".to_string())),
            (Style::new(Color::Black, Color::Red), None),
        ]);

        assert_eq!(line, "#[fg=blue,bg=white] 9s #[default]");
    }

    #[test]
    fn test_nothing_to_show_renders_empty_line() {
        let renderer = Renderer::new(OutputFormat::Tmux);
        assert_eq!(
            renderer.render_segments([(Style::default(), None)]),
            String::new()
        );
    }

    #[test]
    fn test_ansi_segments() {
        let renderer = Renderer::new(OutputFormat::Ansi);
        let line = renderer.render_segments([(
            Style::new(Color::White, Color::Green).bright(),
            Some("16GB40%".to_string()),
        )]);

        assert!(line.starts_with("\u{1b}["));
        assert!(line.contains(" 16GB40% "));
        assert!(line.ends_with("\u{1b}[0m"));
        assert!(!line.contains("#["));
    }

    #[test]
    fn test_color_names_round_trip_through_serde() {
        let color: Color = serde_json::from_str("\"brightyellow\"").unwrap();
        assert_eq!(color, Color::BrightYellow);
        assert_eq!(color.to_string(), "brightyellow");
    }
}
