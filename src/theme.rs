//! Colours: neon block palette and UI colours, optionally overridden by a
//! btop-style theme file (`theme[key]="#RRGGBB"`).

use crate::piece::Neon;
use ratatui::style::Color;
use std::collections::HashMap;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Clone)]
pub struct Theme {
    /// Block colours, indexed by [`Neon::index`].
    pub neon: [Color; 5],
    /// Playfield background.
    pub bg: Color,
    /// Grid lines / borders.
    pub grid: Color,
    /// Score text.
    pub main_fg: Color,
    /// Titles.
    pub title: Color,
    /// Record value.
    pub record: Color,
}

#[derive(Debug, Error)]
pub enum ThemeError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid hex: {0}")]
    InvalidHex(String),
}

/// Theme file keys for the five block colours, in [`Neon::ALL`] order.
const NEON_KEYS: [&str; 5] = ["neon_red", "neon_orange", "neon_magenta", "neon_cyan", "neon_purple"];

impl Default for Theme {
    fn default() -> Self {
        Self {
            neon: [
                Color::Rgb(255, 0, 0),
                Color::Rgb(255, 128, 0),
                Color::Rgb(255, 0, 255),
                Color::Rgb(0, 255, 255),
                Color::Rgb(128, 0, 255),
            ],
            bg: Color::Rgb(18, 18, 24),
            grid: Color::Rgb(40, 40, 40),
            main_fg: Color::Rgb(0, 255, 0),
            title: Color::Rgb(255, 140, 0),
            record: Color::Rgb(255, 215, 0),
        }
    }
}

impl Theme {
    /// Load overrides from `path`; defaults when no path is given or the file does not exist.
    pub fn load(path: Option<&Path>) -> Result<Self, ThemeError> {
        let mut theme = Self::default();
        let Some(path) = path.filter(|p| p.exists()) else {
            return Ok(theme);
        };
        let map = parse_theme_file(&std::fs::read_to_string(path)?);
        theme.apply(&map)?;
        log::info!("theme loaded from {}", path.display());
        Ok(theme)
    }

    fn apply(&mut self, map: &HashMap<String, String>) -> Result<(), ThemeError> {
        let pick = |key: &str, slot: &mut Color| -> Result<(), ThemeError> {
            if let Some(v) = map.get(key) {
                *slot = parse_hex(v)?;
            }
            Ok(())
        };
        for (key, slot) in NEON_KEYS.iter().zip(self.neon.iter_mut()) {
            pick(key, slot)?;
        }
        pick("main_bg", &mut self.bg)?;
        pick("div_line", &mut self.grid)?;
        pick("main_fg", &mut self.main_fg)?;
        pick("title", &mut self.title)?;
        pick("record", &mut self.record)?;
        Ok(())
    }

    #[inline]
    pub fn neon(&self, color: Neon) -> Color {
        self.neon[color.index()]
    }
}

/// `theme[key]="value"` lines into a map; comments and malformed lines are skipped.
fn parse_theme_file(s: &str) -> HashMap<String, String> {
    s.lines()
        .map(str::trim)
        .filter(|l| !l.starts_with('#'))
        .filter_map(|l| l.strip_prefix("theme["))
        .filter_map(|rest| {
            let (key, rest) = rest.split_once(']')?;
            let (_, value) = rest.split_once('=')?;
            let value = value.trim().trim_matches(|c| c == '"' || c == '\'');
            (!value.is_empty()).then(|| (key.trim().to_string(), value.to_string()))
        })
        .collect()
}

/// "#RRGGBB" or "#RGB".
pub fn parse_hex(s: &str) -> Result<Color, ThemeError> {
    let hex = s.trim().trim_start_matches('#');
    let bad = || ThemeError::InvalidHex(s.to_string());
    if !hex.is_ascii() {
        return Err(bad());
    }
    let channel = |digits: &str| u8::from_str_radix(digits, 16).map_err(|_| bad());
    match hex.len() {
        6 => Ok(Color::Rgb(
            channel(&hex[0..2])?,
            channel(&hex[2..4])?,
            channel(&hex[4..6])?,
        )),
        3 => Ok(Color::Rgb(
            channel(&hex[0..1])? * 17,
            channel(&hex[1..2])? * 17,
            channel(&hex[2..3])? * 17,
        )),
        _ => Err(bad()),
    }
}
