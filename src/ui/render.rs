use std::io::{self, Write};

use ratatui::crossterm::queue;
use ratatui::crossterm::style::{Color as TermColor, Print, ResetColor, SetForegroundColor};
use ratatui::style::Color;

const PROMPT: &str = "> ";

/// Writes streamed reply fragments in the configured color.
///
/// When disabled every call is a no-op, so the same callback wiring works
/// for quiet sessions.
pub struct ReplyRenderer<W: Write> {
    out: W,
    color: Color,
    enabled: bool,
    started: bool,
}

impl ReplyRenderer<io::Stdout> {
    pub fn stdout(color: Color, enabled: bool) -> Self {
        Self::new(io::stdout(), color, enabled)
    }
}

impl<W: Write> ReplyRenderer<W> {
    pub fn new(out: W, color: Color, enabled: bool) -> Self {
        Self {
            out,
            color,
            enabled,
            started: false,
        }
    }

    pub fn write_delta(&mut self, text: &str) -> io::Result<()> {
        if !self.enabled {
            return Ok(());
        }
        if !self.started {
            self.started = true;
            self.write_colored(PROMPT)?;
        }
        self.write_colored(text)
    }

    /// Ends the reply line, if anything was printed.
    pub fn finish(&mut self) -> io::Result<()> {
        if !self.enabled || !self.started {
            return Ok(());
        }
        self.started = false;
        writeln!(self.out)?;
        self.out.flush()
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn write_colored(&mut self, text: &str) -> io::Result<()> {
        queue!(
            self.out,
            SetForegroundColor(to_term_color(self.color)),
            Print(text),
            ResetColor
        )?;
        self.out.flush()
    }
}

/// Parses a color name, `#rgb`/`#rrggbb`, or `rgb(r,g,b)`.
pub fn parse_color(s: &str) -> Option<Color> {
    let lower = s.trim().to_ascii_lowercase();
    if let Some(c) = parse_hex_color(&lower) {
        return Some(c);
    }
    if let Some(c) = parse_rgb_func(&lower) {
        return Some(c);
    }
    match lower.as_str() {
        "black" => Some(Color::Black),
        "white" => Some(Color::White),
        "gray" | "grey" => Some(Color::Gray),
        "dark_gray" | "dark-gray" | "dark-grey" | "darkgray" => Some(Color::DarkGray),
        "red" => Some(Color::Red),
        "light_red" | "light-red" | "bright-red" => Some(Color::LightRed),
        "green" => Some(Color::Green),
        "light_green" | "light-green" | "bright-green" => Some(Color::LightGreen),
        "blue" => Some(Color::Blue),
        "light_blue" | "light-blue" | "bright-blue" => Some(Color::LightBlue),
        "cyan" => Some(Color::Cyan),
        "light_cyan" | "light-cyan" | "bright-cyan" => Some(Color::LightCyan),
        "magenta" => Some(Color::Magenta),
        "light_magenta" | "light-magenta" | "bright-magenta" => Some(Color::LightMagenta),
        "yellow" => Some(Color::Yellow),
        "light_yellow" | "light-yellow" | "bright-yellow" => Some(Color::LightYellow),
        "reset" => Some(Color::Reset),
        _ => None,
    }
}

fn parse_hex_color(s: &str) -> Option<Color> {
    let hex = s.strip_prefix('#')?;
    if !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
        return None;
    }
    if hex.len() == 3 {
        let r = u8::from_str_radix(&hex[0..1].repeat(2), 16).ok()?;
        let g = u8::from_str_radix(&hex[1..2].repeat(2), 16).ok()?;
        let b = u8::from_str_radix(&hex[2..3].repeat(2), 16).ok()?;
        Some(Color::Rgb(r, g, b))
    } else if hex.len() == 6 {
        let r = u8::from_str_radix(&hex[0..2], 16).ok()?;
        let g = u8::from_str_radix(&hex[2..4], 16).ok()?;
        let b = u8::from_str_radix(&hex[4..6], 16).ok()?;
        Some(Color::Rgb(r, g, b))
    } else {
        None
    }
}

fn parse_rgb_func(s: &str) -> Option<Color> {
    let content = s.strip_prefix("rgb(")?.strip_suffix(')')?;
    let parts: Vec<_> = content
        .split([',', ' '])
        .filter(|t| !t.is_empty())
        .collect();
    if parts.len() != 3 {
        return None;
    }
    let r = parts[0].parse::<u16>().ok()?;
    let g = parts[1].parse::<u16>().ok()?;
    let b = parts[2].parse::<u16>().ok()?;
    Some(Color::Rgb(
        r.min(255) as u8,
        g.min(255) as u8,
        b.min(255) as u8,
    ))
}

fn to_term_color(color: Color) -> TermColor {
    match color {
        Color::Reset => TermColor::Reset,
        Color::Black => TermColor::Black,
        Color::Red => TermColor::DarkRed,
        Color::Green => TermColor::DarkGreen,
        Color::Yellow => TermColor::DarkYellow,
        Color::Blue => TermColor::DarkBlue,
        Color::Magenta => TermColor::DarkMagenta,
        Color::Cyan => TermColor::DarkCyan,
        Color::Gray => TermColor::Grey,
        Color::DarkGray => TermColor::DarkGrey,
        Color::LightRed => TermColor::Red,
        Color::LightGreen => TermColor::Green,
        Color::LightYellow => TermColor::Yellow,
        Color::LightBlue => TermColor::Blue,
        Color::LightMagenta => TermColor::Magenta,
        Color::LightCyan => TermColor::Cyan,
        Color::White => TermColor::White,
        Color::Rgb(r, g, b) => TermColor::Rgb { r, g, b },
        Color::Indexed(i) => TermColor::AnsiValue(i),
    }
}
