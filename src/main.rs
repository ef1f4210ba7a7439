//! Neontris: falling blocks with row clears and neon colour matches, in the terminal.

mod app;
mod catalog;
mod engine;
mod field;
mod input;
mod logging;
mod piece;
mod record;
mod scoring;
mod theme;
mod ui;

use anyhow::{Context, Result};
use app::App;
use clap::{Parser, ValueEnum};
use engine::{Engine, EngineConfig};
use log::LevelFilter;
use record::FileRecordStore;
use scoring::MatchScoring;
use std::path::PathBuf;

fn main() -> Result<()> {
    let args = Args::parse();
    let log_path = args
        .log_file
        .clone()
        .unwrap_or_else(|| record::config_dir().join("neontris.log"));
    logging::init_log(args.log_level.into(), &log_path)?;

    let theme = theme::Theme::load(args.theme.as_deref()).context("loading theme")?;
    let store = args
        .record_file
        .clone()
        .map_or_else(FileRecordStore::default_location, FileRecordStore::new);
    log::info!("record file {}", store.path().display());
    let engine = Engine::new(args.engine_config(), store).context("reading record")?;

    let mut app = App::new(engine, theme, args.tick_rate, !args.no_animation);
    app.run()?;
    Ok(())
}

/// Falling-block puzzle: clear full rows, or line up 3+ blocks of one neon colour.
#[derive(Debug, Parser)]
#[command(
    name = "neontris",
    version,
    about = "Falling-block puzzle in the terminal: clear full rows or line up three or more blocks of one colour.",
    long_about = "Neontris is a terminal falling-block puzzle.\n\n\
        Every block of a piece has its own neon colour. Full rows clear as usual; runs of three \
        or more same-coloured blocks in a row or column clear too, and the blocks above fall \
        into the gaps.\n\n\
        CONTROLS:\n  Left/h  Move left    Right/l  Move right   Up/k  Rotate\n  \
        Down/j  Soft drop (hold)   q / Esc / Ctrl-C  Quit"
)]
pub struct Args {
    /// Playfield width in columns.
    #[arg(long, default_value_t = engine::DEFAULT_WIDTH, value_name = "COLS")]
    pub width: usize,

    /// Playfield height in rows (18 classic, 20 tall).
    #[arg(long, default_value_t = engine::DEFAULT_HEIGHT, value_name = "ROWS")]
    pub height: usize,

    /// Game logic ticks per second.
    #[arg(long, default_value = "60.0", value_name = "RATE")]
    pub tick_rate: f64,

    /// Fall counter increment per tick.
    #[arg(long, default_value_t = engine::DEFAULT_FALL_STEP, value_name = "N")]
    pub fall_step: u32,

    /// Fall counter threshold for one row of gravity.
    #[arg(long, default_value_t = engine::DEFAULT_FALL_LIMIT, value_name = "N")]
    pub fall_limit: u32,

    /// Fall counter threshold while soft drop is held.
    #[arg(long, default_value_t = engine::DEFAULT_SOFT_DROP_LIMIT, value_name = "N")]
    pub soft_drop_limit: u32,

    /// Colour match scoring: 'last' scores only the last match found after a lock, 'sum' scores every match.
    #[arg(long, default_value = "last")]
    pub match_scoring: MatchScoring,

    /// Seed for the piece sequence (random when not set).
    #[arg(long, value_name = "SEED")]
    pub seed: Option<u64>,

    /// Record file (default: config dir / neontris / record).
    #[arg(long, value_name = "FILE")]
    pub record_file: Option<PathBuf>,

    /// Path to theme file (btop-style theme[key]="#RRGGBB"), keys neon_red .. neon_purple, main_bg, div_line, main_fg, title, record.
    #[arg(short, long, value_name = "FILE")]
    pub theme: Option<PathBuf>,

    /// Disable the fade on cleared cells.
    #[arg(long)]
    pub no_animation: bool,

    /// Log file (default: config dir / neontris / neontris.log).
    #[arg(long, value_name = "FILE")]
    pub log_file: Option<PathBuf>,

    /// Log level.
    #[arg(long, default_value = "info")]
    pub log_level: LogLevel,
}

impl Args {
    fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            width: self.width.max(4),
            height: self.height.max(4),
            fall_step: self.fall_step,
            fall_limit: self.fall_limit,
            soft_drop_limit: self.soft_drop_limit,
            match_scoring: self.match_scoring,
            seed: self.seed,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum LogLevel {
    Off,
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

impl From<LogLevel> for LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Off => Self::Off,
            LogLevel::Error => Self::Error,
            LogLevel::Warn => Self::Warn,
            LogLevel::Info => Self::Info,
            LogLevel::Debug => Self::Debug,
            LogLevel::Trace => Self::Trace,
        }
    }
}
