//! App: terminal init, main loop, key polling and fixed-rate engine ticks.

use crate::engine::{Engine, TickInput, TickReport};
use crate::input::key_to_intent;
use crate::record::FileRecordStore;
use crate::theme::Theme;
use crate::ui::{self, ClearFlash};
use anyhow::{Context, Result};
use crossterm::event::{self, Event};
use ratatui::DefaultTerminal;
use std::time::{Duration, Instant};

/// Redraw cadence while waiting for the next tick.
const FRAME_MS: u64 = 16;

pub struct App {
    engine: Engine<FileRecordStore>,
    theme: Theme,
    tick_interval: Duration,
    animate: bool,
    last_tick: Instant,
    /// Intents gathered since the last tick.
    pending: TickInput,
    flash: Option<ClearFlash>,
}

impl App {
    pub fn new(engine: Engine<FileRecordStore>, theme: Theme, tick_rate: f64, animate: bool) -> Self {
        let tick_interval = Duration::from_secs_f64(1.0 / tick_rate.max(1.0));
        Self {
            engine,
            theme,
            tick_interval,
            animate,
            last_tick: Instant::now(),
            pending: TickInput::default(),
            flash: None,
        }
    }

    pub fn run(&mut self) -> Result<()> {
        use crossterm::{
            event::{KeyboardEnhancementFlags, PopKeyboardEnhancementFlags, PushKeyboardEnhancementFlags},
            execute,
            terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
        };

        enable_raw_mode().context("enabling raw mode")?;
        let mut stdout = std::io::stdout();
        execute!(stdout, EnterAlternateScreen)?;
        // Release events drive soft drop off; not every terminal supports them.
        if execute!(
            stdout,
            PushKeyboardEnhancementFlags(KeyboardEnhancementFlags::REPORT_EVENT_TYPES)
        )
        .is_err()
        {
            log::warn!("keyboard enhancement unsupported; soft drop stays on until lock");
        }

        let mut terminal =
            DefaultTerminal::new(ratatui::backend::CrosstermBackend::new(stdout))?;
        let result = self.run_loop(&mut terminal);
        let result = self.finish(result);

        let _ = execute!(std::io::stdout(), PopKeyboardEnhancementFlags);
        execute!(std::io::stdout(), LeaveAlternateScreen)?;
        disable_raw_mode()?;
        result
    }

    /// A loop that failed still merges the running score into the record.
    fn finish(&mut self, result: Result<()>) -> Result<()> {
        if let Err(e) = &result {
            log::error!("{e:#}");
            if let Err(save) = self.engine.quit() {
                log::error!("saving record after error: {save}");
            }
        }
        result
    }

    fn run_loop(&mut self, terminal: &mut DefaultTerminal) -> Result<()> {
        loop {
            let now = Instant::now();
            terminal.draw(|f| ui::draw(f, &self.engine, &self.theme, &mut self.flash, now))?;
            if self.flash.as_ref().is_some_and(ClearFlash::done) {
                self.flash = None;
            }

            let until_tick = self.tick_interval.saturating_sub(self.last_tick.elapsed());
            let timeout = until_tick.min(Duration::from_millis(FRAME_MS));
            if event::poll(timeout)? {
                while event::poll(Duration::ZERO)? {
                    if let Event::Key(key) = event::read()? {
                        if let Some(intent) = key_to_intent(key) {
                            self.pending.push(intent);
                        }
                    }
                }
            }

            if self.last_tick.elapsed() >= self.tick_interval {
                self.last_tick = Instant::now();
                let input = std::mem::take(&mut self.pending);
                let report = self.engine.tick(&input).context("saving record")?;
                if report.quit {
                    return Ok(());
                }
                self.on_report(report);
            }
        }
    }

    fn on_report(&mut self, report: TickReport) {
        if let Some(score) = report.game_over {
            log::info!("session over with {score}, record {}", self.engine.record());
            // The field was reset; nothing left to fade.
            self.flash = None;
            return;
        }
        if report.locked {
            log::debug!("lock: +{} (score {})", report.points(), self.engine.score());
        }
        if self.animate && !report.cleared_cells.is_empty() {
            self.flash = ClearFlash::new(report.cleared_cells, self.engine.field());
        }
    }
}
