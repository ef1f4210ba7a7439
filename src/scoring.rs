//! Score tables for row clears and colour matches.

use clap::ValueEnum;

/// Points for clearing 0, 1, 2, 3 or 4 rows with one lock.
const ROW_CLEAR_POINTS: [u32; 5] = [0, 100, 300, 700, 1500];

/// Points for clearing `rows` full rows at once. Saturates above 4 rows.
pub fn row_clear_score(rows: u32) -> u32 {
    let i = (rows as usize).min(ROW_CLEAR_POINTS.len() - 1);
    ROW_CLEAR_POINTS[i]
}

/// Points for one colour run of `len` cells.
pub fn match_score(len: usize) -> u32 {
    debug_assert!(len >= 3, "colour match shorter than 3 reached scoring: {len}");
    match len {
        0..=3 => 100,
        4 => 300,
        5 => 500,
        _ => 1000,
    }
}

/// How the colour matches found after one lock are turned into points.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum MatchScoring {
    /// Only the last match in scan order scores (classic behaviour).
    #[default]
    Last,
    /// Every match scores and the points add up.
    Sum,
}

impl MatchScoring {
    /// Points for a set of match lengths given in scan order.
    pub fn score<I>(self, lengths: I) -> u32
    where
        I: IntoIterator<Item = usize>,
    {
        match self {
            Self::Last => lengths.into_iter().last().map_or(0, match_score),
            Self::Sum => lengths.into_iter().map(match_score).sum(),
        }
    }
}
