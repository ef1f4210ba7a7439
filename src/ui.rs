//! Layout and drawing: playfield, active piece, next preview, score and record.
//!
//! Everything here reads the engine; nothing mutates game state.

use crate::catalog::Coord;
use crate::engine::{Engine, Phase};
use crate::field::{Cell, Field};
use crate::piece::Neon;
use crate::record::RecordStore;
use crate::theme::Theme;
use ratatui::Frame;
use ratatui::layout::{Constraint, Direction, Layout, Position, Rect};
use ratatui::style::{Color, Style, Stylize};
use ratatui::text::{Line, Span, Text};
use ratatui::widgets::{Block, Borders, Paragraph, Widget};
use std::collections::HashSet;
use std::time::Instant;
use tachyonfx::{
    CellFilter, Duration as TfxDuration, Effect, EffectRenderer, Interpolation, fx, ref_count,
};

/// Terminal columns per field cell (square-ish blocks).
const CELL_WIDTH: u16 = 2;
const SIDEBAR_WIDTH: u16 = 20;
/// Fade of cleared cells, in ms.
const CLEAR_FADE_MS: u32 = 350;
const BLOCK: &str = "██";
const EMPTY: &str = " ·";

/// Fade over the cells emptied by the last clear.
pub struct ClearFlash {
    /// (row, col) field cells.
    cells: Vec<(usize, usize)>,
    effect: Option<Effect>,
    processed_at: Option<Instant>,
}

impl ClearFlash {
    /// Flash the cleared cells that are still empty after compaction; blocks that fell into
    /// a cleared position stay visible. `None` when nothing is left to flash.
    pub fn new(mut cells: Vec<(usize, usize)>, field: &Field) -> Option<Self> {
        cells.retain(|&(y, x)| field.get(x, y) == Some(Cell::Empty));
        (!cells.is_empty()).then(|| Self {
            cells,
            effect: None,
            processed_at: None,
        })
    }

    pub fn done(&self) -> bool {
        self.effect.as_ref().is_some_and(Effect::done)
    }
}

/// Playfield size in terminal cells, border included.
fn playfield_size(width: usize, height: usize) -> (u16, u16) {
    (width as u16 * CELL_WIDTH + 2, height as u16 + 2)
}

/// Draw one frame: centred playfield with the sidebar on its right.
pub fn draw<S: RecordStore>(
    frame: &mut Frame,
    engine: &Engine<S>,
    theme: &Theme,
    flash: &mut Option<ClearFlash>,
    now: Instant,
) {
    let area = frame.area();
    let field = engine.field();
    let (pw, ph) = playfield_size(field.width, field.height);

    let horiz = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Fill(1),
            Constraint::Length(pw + SIDEBAR_WIDTH),
            Constraint::Fill(1),
        ])
        .split(area);
    let vert = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Fill(1), Constraint::Length(ph), Constraint::Fill(1)])
        .split(horiz[1]);
    let inner = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Length(pw), Constraint::Length(SIDEBAR_WIDTH)])
        .split(vert[1]);

    let board = draw_playfield(frame, engine, theme, flash.as_ref(), inner[0]);
    draw_sidebar(frame, engine, theme, inner[1]);

    if let Some(flash) = flash {
        apply_clear_effect(frame, theme, flash, board, now);
    }
}

/// Border, locked cells and the active piece. Returns the board rect inside the border.
fn draw_playfield<S: RecordStore>(
    frame: &mut Frame,
    engine: &Engine<S>,
    theme: &Theme,
    flash: Option<&ClearFlash>,
    area: Rect,
) -> Rect {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(theme.grid).bg(theme.bg))
        .title(Span::styled(" NEONTRIS ", Style::default().fg(theme.title).bold()));
    let board = block.inner(area);
    block.render(area, frame.buffer_mut());

    let flashing: HashSet<(usize, usize)> = flash
        .map(|f| f.cells.iter().copied().collect())
        .unwrap_or_default();
    let buf = frame.buffer_mut();
    let mut put = |x: usize, y: usize, symbol: &str, style: Style| {
        let rx = board.x + x as u16 * CELL_WIDTH;
        let ry = board.y + y as u16;
        if rx + CELL_WIDTH <= board.x + board.width && ry < board.y + board.height {
            buf.set_string(rx, ry, symbol, style);
        }
    };

    for (y, row) in engine.field().rows().enumerate() {
        for (x, cell) in row.iter().enumerate() {
            let (symbol, fg) = match cell {
                _ if flashing.contains(&(y, x)) => (BLOCK, Color::White),
                Cell::Block(c) => (BLOCK, theme.neon(*c)),
                Cell::Empty => (EMPTY, theme.grid),
            };
            put(x, y, symbol, Style::default().fg(fg).bg(theme.bg));
        }
    }

    for (c, color) in engine.piece().cells() {
        if c.y >= 0 {
            let fg = theme.neon(color);
            put(c.x as usize, c.y as usize, BLOCK, Style::default().fg(fg).bg(theme.bg));
        }
    }
    board
}

fn draw_sidebar<S: RecordStore>(frame: &mut Frame, engine: &Engine<S>, theme: &Theme, area: Rect) {
    let border = Style::default().fg(theme.grid).bg(theme.bg);
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(7), // Next
            Constraint::Length(1),
            Constraint::Length(8), // Score / Record / Session / Status
            Constraint::Fill(1),
        ])
        .split(area);

    let next_block = Block::default()
        .borders(Borders::ALL)
        .border_style(border)
        .title(Span::styled(" Next ", Style::default().fg(theme.title)));
    let next_inner = next_block.inner(chunks[0]);
    next_block.render(chunks[0], frame.buffer_mut());
    let cells: Vec<(Coord, Neon)> = engine.next_cells().collect();
    draw_preview(frame, theme, &cells, next_inner);

    let stats_block = Block::default().borders(Borders::ALL).border_style(border);
    let stats_inner = stats_block.inner(chunks[2]);
    stats_block.render(chunks[2], frame.buffer_mut());
    let lines = vec![
        Line::from(Span::styled("score:", Style::default().fg(theme.main_fg))),
        Line::from(Span::styled(
            engine.score().to_string(),
            Style::default().fg(Color::White).bold(),
        )),
        Line::from(Span::styled("record:", Style::default().fg(theme.title))),
        Line::from(Span::styled(
            engine.record().to_string(),
            Style::default().fg(theme.record).bold(),
        )),
        Line::from(Span::styled(
            format!("game {}", engine.session()),
            Style::default().fg(theme.grid),
        )),
        Line::from(Span::styled(
            status(engine.phase(), engine.soft_drop()),
            Style::default().fg(theme.grid),
        )),
    ];
    Paragraph::new(Text::from(lines)).render(stats_inner, frame.buffer_mut());
}

fn status(phase: Phase, soft_drop: bool) -> &'static str {
    match phase {
        Phase::Falling if soft_drop => "soft drop",
        Phase::Falling => "falling",
        Phase::Spawning => "spawning",
        Phase::Locking => "locking",
        Phase::Clearing => "clearing",
        Phase::GameOver => "game over",
    }
}

/// Blocks of the next piece, normalised to the top-left and centred in `area`.
fn draw_preview(frame: &mut Frame, theme: &Theme, cells: &[(Coord, Neon)], area: Rect) {
    let Some(min_x) = cells.iter().map(|(c, _)| c.x).min() else {
        return;
    };
    let min_y = cells.iter().map(|(c, _)| c.y).min().unwrap_or(0);
    let max_x = cells.iter().map(|(c, _)| c.x).max().unwrap_or(min_x);
    let max_y = cells.iter().map(|(c, _)| c.y).max().unwrap_or(min_y);
    let bw = (max_x - min_x + 1) as u16 * CELL_WIDTH;
    let bh = (max_y - min_y + 1) as u16;
    let off_x = area.width.saturating_sub(bw) / 2;
    let off_y = area.height.saturating_sub(bh) / 2;

    let buf = frame.buffer_mut();
    for (c, color) in cells {
        let rx = area.x + off_x + (c.x - min_x) as u16 * CELL_WIDTH;
        let ry = area.y + off_y + (c.y - min_y) as u16;
        if rx + CELL_WIDTH <= area.x + area.width && ry < area.y + area.height {
            buf.set_string(rx, ry, BLOCK, Style::default().fg(theme.neon(*color)));
        }
    }
}

/// Create the fade on first use, then advance it by the time since the last frame.
fn apply_clear_effect(
    frame: &mut Frame,
    theme: &Theme,
    flash: &mut ClearFlash,
    board: Rect,
    now: Instant,
) {
    let delta = flash
        .processed_at
        .map(|t| now.saturating_duration_since(t))
        .unwrap_or_default();
    let delta_ms = delta.as_millis().min(u128::from(u32::MAX)) as u32;
    flash.processed_at = Some(now);

    if flash.effect.is_none() {
        let positions: HashSet<(u16, u16)> = flash
            .cells
            .iter()
            .flat_map(|&(y, x)| {
                let rx = board.x + x as u16 * CELL_WIDTH;
                let ry = board.y + y as u16;
                (rx..rx + CELL_WIDTH).map(move |bx| (bx, ry))
            })
            .collect();
        let filter = CellFilter::PositionFn(ref_count(move |pos: Position| {
            positions.contains(&(pos.x, pos.y))
        }));
        let effect = fx::fade_to(theme.bg, theme.bg, (CLEAR_FADE_MS, Interpolation::Linear))
            .with_filter(filter)
            .with_area(board);
        flash.effect = Some(effect);
    }

    if let Some(effect) = flash.effect.as_mut() {
        frame.render_effect(effect, board, TfxDuration::from_millis(delta_ms));
    }
}
