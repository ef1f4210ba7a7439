//! Playfield: occupancy grid, collision, row clears, colour matches and compaction.

use crate::catalog::Coord;
use crate::piece::{Neon, Piece};
use crate::scoring::MatchScoring;
use std::collections::{BTreeSet, VecDeque};

/// Runs shorter than this never clear.
pub const MIN_MATCH: usize = 3;

/// Single cell: empty or a locked block of some colour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Cell {
    #[default]
    Empty,
    Block(Neon),
}

impl Cell {
    #[inline]
    pub const fn is_occupied(self) -> bool {
        matches!(self, Self::Block(_))
    }

    #[inline]
    pub const fn color(self) -> Option<Neon> {
        match self {
            Self::Block(c) => Some(c),
            Self::Empty => None,
        }
    }
}

/// A run of at least [`MIN_MATCH`] same-coloured cells in one row or one column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColorMatch {
    pub color: Neon,
    /// (row, col) positions in scan order.
    pub cells: Vec<(usize, usize)>,
}

impl ColorMatch {
    #[inline]
    pub fn len(&self) -> usize {
        self.cells.len()
    }
}

/// Result of [`Field::clear_matches`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MatchClear {
    pub score: u32,
    /// Every (row, col) emptied by the clear, before compaction.
    pub cells: Vec<(usize, usize)>,
}

/// Playfield grid. y=0 is the top row; `rows[y][x]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    pub width: usize,
    pub height: usize,
    rows: VecDeque<Vec<Cell>>,
}

impl Field {
    pub fn new(width: usize, height: usize) -> Self {
        let rows = (0..height).map(|_| vec![Cell::Empty; width]).collect();
        Self {
            width,
            height,
            rows,
        }
    }

    #[inline]
    pub fn get(&self, x: usize, y: usize) -> Option<Cell> {
        self.rows.get(y).and_then(|row| row.get(x)).copied()
    }

    #[inline]
    pub fn set(&mut self, x: usize, y: usize, cell: Cell) {
        if let Some(slot) = self.rows.get_mut(y).and_then(|row| row.get_mut(x)) {
            *slot = cell;
        }
    }

    #[inline]
    fn occupied(&self, x: usize, y: usize) -> bool {
        self.get(x, y).is_some_and(Cell::is_occupied)
    }

    /// Rows top to bottom, for rendering.
    pub fn rows(&self) -> impl Iterator<Item = &[Cell]> {
        self.rows.iter().map(Vec::as_slice)
    }

    /// True if every block is inside the side walls, above the floor and off locked cells.
    /// Blocks above the top edge are allowed and never collide.
    pub fn is_valid_position(&self, blocks: &[Coord]) -> bool {
        blocks.iter().all(|c| {
            if c.x < 0 || c.x >= self.width as i32 || c.y >= self.height as i32 {
                return false;
            }
            c.y < 0 || !self.occupied(c.x as usize, c.y as usize)
        })
    }

    /// Lock the piece's blocks into the grid. Caller has already validated the position;
    /// blocks above the top edge have no cell and are dropped.
    pub fn place(&mut self, piece: &Piece) {
        for (i, c) in piece.blocks().iter().enumerate() {
            debug_assert!(c.x >= 0 && (c.x as usize) < self.width && c.y < self.height as i32);
            if c.y >= 0 {
                self.set(c.x as usize, c.y as usize, Cell::Block(piece.locked_color(i)));
            }
        }
    }

    /// Indices of rows with every cell occupied, top to bottom.
    pub fn full_rows(&self) -> Vec<usize> {
        self.rows
            .iter()
            .enumerate()
            .filter(|(_, row)| row.iter().all(|c| c.is_occupied()))
            .map(|(y, _)| y)
            .collect()
    }

    /// Remove full rows; rows above drop down in order and empty rows refill the top.
    pub fn clear_full_rows(&mut self) -> u32 {
        let before = self.rows.len();
        self.rows.retain(|row| !row.iter().all(|c| c.is_occupied()));
        let cleared = before - self.rows.len();
        for _ in 0..cleared {
            self.rows.push_front(vec![Cell::Empty; self.width]);
        }
        cleared as u32
    }

    /// Colour runs of length >= 3: every row left to right, then every column top to bottom.
    /// A run is extended as far as it goes and the scan resumes after it.
    pub fn find_color_matches(&self) -> Vec<ColorMatch> {
        let mut matches = Vec::new();
        for y in 0..self.height {
            scan_line(self.width, |x| self.get(x, y), |x| (y, x), &mut matches);
        }
        for x in 0..self.width {
            scan_line(self.height, |y| self.get(x, y), |y| (y, x), &mut matches);
        }
        matches
    }

    /// Empty every matched cell, score the matches, then compact the columns that were hit
    /// or that now hold a block floating over a gap.
    pub fn clear_matches(&mut self, scoring: MatchScoring) -> MatchClear {
        let matches = self.find_color_matches();
        if matches.is_empty() {
            return MatchClear::default();
        }

        let mut affected = BTreeSet::new();
        let mut cells = Vec::new();
        for m in &matches {
            log::debug!("{:?} run of {} at {:?}", m.color, m.len(), m.cells[0]);
            for &(y, x) in &m.cells {
                self.set(x, y, Cell::Empty);
                affected.insert(x);
                cells.push((y, x));
            }
        }
        let score = scoring.score(matches.iter().map(ColorMatch::len));

        for x in 0..self.width {
            let floating = (0..self.height.saturating_sub(1))
                .any(|y| !self.occupied(x, y) && self.occupied(x, y + 1));
            if floating {
                affected.insert(x);
            }
        }

        self.apply_gravity(&affected);
        MatchClear { score, cells }
    }

    /// Pull blocks down into gaps in the given columns until nothing moves.
    pub fn apply_gravity(&mut self, columns: &BTreeSet<usize>) {
        let mut moved = true;
        while moved {
            moved = false;
            for &x in columns {
                for y in (0..self.height).rev() {
                    if self.occupied(x, y) {
                        continue;
                    }
                    if let Some(src) = (0..y).rev().find(|&above| self.occupied(x, above)) {
                        let cell = self.get(x, src).unwrap_or_default();
                        self.set(x, y, cell);
                        self.set(x, src, Cell::Empty);
                        moved = true;
                    }
                }
            }
        }
    }

    /// Any block in row 0 ends the game.
    pub fn top_row_occupied(&self) -> bool {
        self.rows
            .front()
            .is_some_and(|row| row.iter().any(|c| c.is_occupied()))
    }
}

/// Scan one row or column of `len` cells for colour runs.
fn scan_line<G, P>(len: usize, get: G, pos: P, out: &mut Vec<ColorMatch>)
where
    G: Fn(usize) -> Option<Cell>,
    P: Fn(usize) -> (usize, usize),
{
    let color_at = |i: usize| get(i).and_then(Cell::color);
    let mut i = 0;
    while i + MIN_MATCH <= len {
        let Some(color) = color_at(i) else {
            i += 1;
            continue;
        };
        let run = (i..len).take_while(|&j| color_at(j) == Some(color)).count();
        if run >= MIN_MATCH {
            out.push(ColorMatch {
                color,
                cells: (i..i + run).map(&pos).collect(),
            });
            i += run;
        } else {
            i += 1;
        }
    }
}
