//! Game engine: per-tick input, piece gravity, locking, clears, scoring and game over.
//!
//! The engine owns the field, the active piece, the piece generator and the record store.
//! One call to [`Engine::tick`] is one frame of game logic; nothing in here blocks or reads
//! the clock, so a fixed tick rate fully determines the fall speed.

use crate::catalog::Coord;
use crate::field::Field;
use crate::piece::{Neon, NextPiece, Piece, PieceGenerator};
use crate::record::{RecordError, RecordStore};
use crate::scoring::{MatchScoring, row_clear_score};

pub const DEFAULT_WIDTH: usize = 10;
pub const DEFAULT_HEIGHT: usize = 18;
/// Added to the fall counter every tick.
pub const DEFAULT_FALL_STEP: u32 = 60;
/// Fall counter threshold at normal speed.
pub const DEFAULT_FALL_LIMIT: u32 = 2000;
/// Fall counter threshold while soft drop is held.
pub const DEFAULT_SOFT_DROP_LIMIT: u32 = 80;

/// Engine tuning, derived from CLI options.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    pub width: usize,
    pub height: usize,
    pub fall_step: u32,
    pub fall_limit: u32,
    pub soft_drop_limit: u32,
    pub match_scoring: MatchScoring,
    /// Fixed RNG seed for the piece sequence; OS entropy when None.
    pub seed: Option<u64>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            width: DEFAULT_WIDTH,
            height: DEFAULT_HEIGHT,
            fall_step: DEFAULT_FALL_STEP,
            fall_limit: DEFAULT_FALL_LIMIT,
            soft_drop_limit: DEFAULT_SOFT_DROP_LIMIT,
            match_scoring: MatchScoring::default(),
            seed: None,
        }
    }
}

/// Player intent fed to the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Intent {
    MoveLeft,
    MoveRight,
    SoftDropOn,
    SoftDropOff,
    RotateClockwise,
    QuitRequested,
}

/// Intents folded into what one tick consumes: one horizontal move (the last one wins),
/// one rotation, the latest soft-drop toggle and quit.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickInput {
    pub horizontal: i32,
    pub rotate: bool,
    pub soft_drop: Option<bool>,
    pub quit: bool,
}

impl TickInput {
    pub fn push(&mut self, intent: Intent) {
        match intent {
            Intent::MoveLeft => self.horizontal = -1,
            Intent::MoveRight => self.horizontal = 1,
            Intent::SoftDropOn => self.soft_drop = Some(true),
            Intent::SoftDropOff => self.soft_drop = Some(false),
            Intent::RotateClockwise => self.rotate = true,
            Intent::QuitRequested => self.quit = true,
        }
    }
}

impl FromIterator<Intent> for TickInput {
    fn from_iter<I: IntoIterator<Item = Intent>>(iter: I) -> Self {
        let mut input = Self::default();
        for intent in iter {
            input.push(intent);
        }
        input
    }
}

/// Where the engine is in the life of the current piece.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Spawning,
    Falling,
    Locking,
    Clearing,
    GameOver,
}

/// What happened during one tick.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickReport {
    pub locked: bool,
    pub rows_cleared: u32,
    pub row_score: u32,
    pub match_score: u32,
    /// (row, col) cells emptied by clears, in pre-clear coordinates.
    pub cleared_cells: Vec<(usize, usize)>,
    /// Final score of a session that just ended.
    pub game_over: Option<u32>,
    pub quit: bool,
}

impl TickReport {
    pub fn points(&self) -> u32 {
        self.row_score + self.match_score
    }
}

pub struct Engine<S: RecordStore> {
    config: EngineConfig,
    store: S,
    field: Field,
    generator: PieceGenerator,
    piece: Piece,
    score: u32,
    record: u32,
    phase: Phase,
    fall_counter: u32,
    soft_drop: bool,
    session: u32,
}

impl<S: RecordStore> Engine<S> {
    /// Read the record from `store` and start the first session.
    pub fn new(config: EngineConfig, mut store: S) -> Result<Self, RecordError> {
        let record = store.read_record()?;
        let mut generator = PieceGenerator::new(config.seed);
        let piece = spawn(&mut generator, config.width);
        log::info!(
            "engine ready: {}x{} field, record {}, match scoring {:?}",
            config.width,
            config.height,
            record,
            config.match_scoring
        );
        Ok(Self {
            field: Field::new(config.width, config.height),
            config,
            store,
            generator,
            piece,
            score: 0,
            record,
            phase: Phase::Falling,
            fall_counter: 0,
            soft_drop: false,
            session: 1,
        })
    }

    /// Fresh field, score and pieces. The record and the store are kept.
    pub fn reset(&mut self) {
        self.field = Field::new(self.config.width, self.config.height);
        self.score = 0;
        self.fall_counter = 0;
        self.soft_drop = false;
        self.phase = Phase::Spawning;
        self.piece = spawn(&mut self.generator, self.config.width);
        self.phase = Phase::Falling;
        self.session += 1;
        log::info!("session {} started", self.session);
    }

    /// Advance one frame.
    pub fn tick(&mut self, input: &TickInput) -> Result<TickReport, RecordError> {
        let mut report = TickReport::default();
        if input.quit {
            self.quit()?;
            report.quit = true;
            return Ok(report);
        }

        if let Some(on) = input.soft_drop {
            self.soft_drop = on;
        }
        if input.horizontal != 0 {
            self.try_commit(self.piece.translated(input.horizontal, 0));
        }
        if input.rotate {
            self.try_commit(self.piece.rotated());
        }

        self.fall_counter = self.fall_counter.saturating_add(self.config.fall_step);
        if self.fall_counter > self.fall_threshold() {
            self.fall_counter = 0;
            if !self.try_commit(self.piece.translated(0, 1)) {
                self.lock(&mut report)?;
            }
        }
        Ok(report)
    }

    /// Persist max(record, score). Call before the process exits.
    pub fn quit(&mut self) -> Result<(), RecordError> {
        log::info!("quit with score {} (record {})", self.score, self.record);
        self.persist_record()
    }

    fn fall_threshold(&self) -> u32 {
        if self.soft_drop {
            self.config.soft_drop_limit
        } else {
            self.config.fall_limit
        }
    }

    /// Move the piece to `candidate` if the field allows it.
    fn try_commit(&mut self, candidate: [Coord; 4]) -> bool {
        let ok = self.field.is_valid_position(&candidate);
        if ok {
            self.piece.commit(candidate);
        }
        ok
    }

    fn lock(&mut self, report: &mut TickReport) -> Result<(), RecordError> {
        self.phase = Phase::Locking;
        self.field.place(&self.piece);
        self.soft_drop = false;
        report.locked = true;
        log::debug!("{:?} locked at {:?}", self.piece.shape, self.piece.blocks());

        self.phase = Phase::Clearing;
        let matched = self.field.clear_matches(self.config.match_scoring);
        report.match_score = matched.score;
        report.cleared_cells = matched.cells;

        let full = self.field.full_rows();
        report.rows_cleared = self.field.clear_full_rows();
        report.row_score = row_clear_score(report.rows_cleared);
        let width = self.field.width;
        report
            .cleared_cells
            .extend(full.into_iter().flat_map(|y| (0..width).map(move |x| (y, x))));

        if report.points() > 0 {
            self.score += report.points();
            log::info!(
                "cleared {} rows (+{}), matches +{}, score {}",
                report.rows_cleared,
                report.row_score,
                report.match_score,
                self.score
            );
        }

        if self.field.top_row_occupied() {
            return self.game_over(report);
        }

        self.phase = Phase::Spawning;
        self.piece = spawn(&mut self.generator, self.config.width);
        if !self.field.is_valid_position(self.piece.blocks()) {
            log::info!("spawn blocked");
            return self.game_over(report);
        }
        self.phase = Phase::Falling;
        Ok(())
    }

    fn game_over(&mut self, report: &mut TickReport) -> Result<(), RecordError> {
        self.phase = Phase::GameOver;
        log::info!("game over: score {} (record {})", self.score, self.record);
        report.game_over = Some(self.score);
        self.persist_record()?;
        self.reset();
        Ok(())
    }

    fn persist_record(&mut self) -> Result<(), RecordError> {
        self.record = self.record.max(self.score);
        self.store.write_record(self.record)
    }

    pub fn field(&self) -> &Field {
        &self.field
    }

    pub fn piece(&self) -> &Piece {
        &self.piece
    }

    /// Upcoming piece's blocks at the spawn position, with colours.
    pub fn next_cells(&self) -> impl Iterator<Item = (Coord, Neon)> + '_ {
        let next = self.generator.next();
        next.blocks(self.config.width)
            .into_iter()
            .zip(next.colors)
    }

    pub fn score(&self) -> u32 {
        self.score
    }

    /// Best score so far, including the running session once it ends.
    pub fn record(&self) -> u32 {
        self.record
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn soft_drop(&self) -> bool {
        self.soft_drop
    }

    /// 1-based number of the running session.
    pub fn session(&self) -> u32 {
        self.session
    }

    #[cfg(test)]
    pub fn store(&self) -> &S {
        &self.store
    }
}

fn spawn(generator: &mut PieceGenerator, width: usize) -> Piece {
    let NextPiece { shape, colors } = generator.promote_next();
    Piece::spawn(shape, colors, width)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Shape;
    use crate::field::Cell;
    use crate::field::tests::{field_from, render};
    use crate::record::MemoryRecordStore;

    const IDLE: TickInput = TickInput {
        horizontal: 0,
        rotate: false,
        soft_drop: None,
        quit: false,
    };

    /// Gravity moves the piece one row on every tick.
    fn fast_config() -> EngineConfig {
        EngineConfig {
            fall_step: 10,
            fall_limit: 5,
            soft_drop_limit: 1,
            seed: Some(3),
            ..EngineConfig::default()
        }
    }

    fn engine(config: EngineConfig) -> Engine<MemoryRecordStore> {
        Engine::new(config, MemoryRecordStore::default()).unwrap()
    }

    fn tick_until_lock(e: &mut Engine<MemoryRecordStore>) -> TickReport {
        for _ in 0..100 {
            let r = e.tick(&IDLE).unwrap();
            if r.locked {
                return r;
            }
        }
        panic!("piece never locked");
    }

    const DISTINCT: [Neon; 4] = [Neon::Red, Neon::Orange, Neon::Magenta, Neon::Cyan];

    fn set_piece(e: &mut Engine<MemoryRecordStore>, shape: Shape, colors: [Neon; 4]) {
        e.piece = Piece::spawn(shape, colors, e.config.width);
    }

    #[test]
    fn intents_fold_into_one_tick() {
        let input: TickInput = [
            Intent::MoveLeft,
            Intent::RotateClockwise,
            Intent::MoveRight,
            Intent::SoftDropOn,
        ]
        .into_iter()
        .collect();
        assert_eq!(input.horizontal, 1);
        assert!(input.rotate);
        assert_eq!(input.soft_drop, Some(true));
        assert!(!input.quit);
    }

    #[test]
    fn new_reads_record_from_store() {
        let store = MemoryRecordStore {
            value: Some(777),
            writes: 0,
        };
        let e = Engine::new(EngineConfig::default(), store).unwrap();
        assert_eq!(e.record(), 777);
        assert_eq!(e.score(), 0);
        assert_eq!(e.phase(), Phase::Falling);
    }

    #[test]
    fn corrupt_store_fails_startup() {
        struct Broken;
        impl RecordStore for Broken {
            fn read_record(&mut self) -> Result<u32, RecordError> {
                Err(RecordError::Corrupt {
                    path: "record".into(),
                    content: "x".into(),
                })
            }
            fn write_record(&mut self, _: u32) -> Result<(), RecordError> {
                Ok(())
            }
        }
        assert!(Engine::new(EngineConfig::default(), Broken).is_err());
    }

    #[test]
    fn horizontal_move_is_applied_and_wall_rejects() {
        let mut e = engine(EngineConfig::default());
        set_piece(&mut e, Shape::O, DISTINCT);
        let left = TickInput {
            horizontal: -1,
            ..IDLE
        };
        let start = *e.piece().blocks();
        e.tick(&left).unwrap();
        assert_eq!(e.piece().blocks(), &start.map(|c| c.offset(-1, 0)));
        for _ in 0..20 {
            e.tick(&left).unwrap();
        }
        let min_x = e.piece().blocks().iter().map(|c| c.x).min().unwrap();
        assert_eq!(min_x, 0);
    }

    #[test]
    fn blocked_rotation_is_discarded() {
        let mut e = engine(EngineConfig::default());
        set_piece(&mut e, Shape::T, DISTINCT);
        // T pivot (5,1); rotation wants (6,1)
        e.field.set(6, 1, Cell::Block(Neon::Purple));
        let start = *e.piece().blocks();
        e.tick(&TickInput {
            rotate: true,
            ..IDLE
        })
        .unwrap();
        assert_eq!(e.piece().blocks(), &start);

        e.field.set(6, 1, Cell::Empty);
        e.tick(&TickInput {
            rotate: true,
            ..IDLE
        })
        .unwrap();
        assert_eq!(
            e.piece().blocks(),
            &[
                Coord::new(5, 1),
                Coord::new(6, 1),
                Coord::new(4, 1),
                Coord::new(5, 0)
            ]
        );
    }

    #[test]
    fn gravity_waits_for_threshold() {
        let mut e = engine(EngineConfig {
            fall_step: 60,
            fall_limit: 2000,
            ..EngineConfig::default()
        });
        let start = *e.piece().blocks();
        // 2000 / 60 = 33.3, so the 34th tick pushes the counter past the limit
        for _ in 0..33 {
            e.tick(&IDLE).unwrap();
        }
        assert_eq!(e.piece().blocks(), &start);
        e.tick(&IDLE).unwrap();
        assert_eq!(e.piece().blocks(), &start.map(|c| c.offset(0, 1)));
    }

    #[test]
    fn soft_drop_speeds_up_until_lock() {
        let mut e = engine(EngineConfig {
            fall_step: 60,
            fall_limit: 2000,
            soft_drop_limit: 80,
            seed: Some(9),
            ..EngineConfig::default()
        });
        let start = *e.piece().blocks();
        e.tick(&TickInput {
            soft_drop: Some(true),
            ..IDLE
        })
        .unwrap();
        e.tick(&IDLE).unwrap();
        assert!(e.soft_drop());
        assert_eq!(e.piece().blocks(), &start.map(|c| c.offset(0, 1)));

        tick_until_lock(&mut e);
        assert!(!e.soft_drop());
    }

    #[test]
    fn soft_drop_off_restores_speed() {
        let mut e = engine(EngineConfig::default());
        e.tick(&TickInput {
            soft_drop: Some(true),
            ..IDLE
        })
        .unwrap();
        e.tick(&TickInput {
            soft_drop: Some(false),
            ..IDLE
        })
        .unwrap();
        assert!(!e.soft_drop());
    }

    #[test]
    fn piece_locks_on_floor_without_ending_game() {
        let mut e = engine(fast_config());
        set_piece(&mut e, Shape::T, DISTINCT);
        let r = tick_until_lock(&mut e);
        assert_eq!(r.game_over, None);
        let h = e.field().height;
        let rows = render(e.field());
        assert_eq!(rows[h - 1], ".....M....");
        assert_eq!(rows[h - 2], "....CR....");
        assert_eq!(rows[h - 3], ".....O....");
        assert!(!e.field().top_row_occupied());
        assert_eq!(e.session(), 1);
    }

    #[test]
    fn lock_touching_top_row_ends_session() {
        let mut e = engine(fast_config());
        set_piece(&mut e, Shape::T, DISTINCT);
        // support directly under the spawned T so it locks in rows 0..=2
        e.field.set(5, 3, Cell::Block(Neon::Purple));
        e.score = 1200;
        let r = tick_until_lock(&mut e);
        assert_eq!(r.game_over, Some(1200));
        assert_eq!(e.record(), 1200);
        assert_eq!(e.store().value, Some(1200));
        assert_eq!(e.score(), 0);
        assert_eq!(e.session(), 2);
        assert_eq!(e.phase(), Phase::Falling);
        assert!(render(e.field()).iter().all(|row| row == ".........."));
    }

    #[test]
    fn record_keeps_the_better_score() {
        let store = MemoryRecordStore {
            value: Some(5000),
            writes: 0,
        };
        let mut e = Engine::new(fast_config(), store).unwrap();
        set_piece(&mut e, Shape::T, DISTINCT);
        e.field.set(5, 3, Cell::Block(Neon::Purple));
        e.score = 300;
        tick_until_lock(&mut e);
        assert_eq!(e.record(), 5000);
        assert_eq!(e.store().value, Some(5000));
    }

    #[test]
    fn quit_persists_record() {
        let mut e = engine(EngineConfig::default());
        e.score = 900;
        let r = e
            .tick(&TickInput {
                quit: true,
                ..IDLE
            })
            .unwrap();
        assert!(r.quit);
        assert_eq!(e.store().value, Some(900));
        assert_eq!(e.store().writes, 1);
    }

    #[test]
    fn reset_keeps_record_and_clears_board() {
        let mut e = engine(EngineConfig::default());
        e.record = 4000;
        e.score = 100;
        e.field.set(0, 17, Cell::Block(Neon::Red));
        e.reset();
        assert_eq!(e.record(), 4000);
        assert_eq!(e.score(), 0);
        assert_eq!(e.field().get(0, 17), Some(Cell::Empty));
    }

    /// Bottom row with a gap at column 9 and no colour runs; a vertical bar fills the gap.
    fn single_row_clear(e: &mut Engine<MemoryRecordStore>) -> TickReport {
        let mut rows = vec![".........."; 17];
        rows.push("ROMCPROMC.");
        e.field = field_from(&rows);
        let mut piece = Piece::spawn(Shape::I, DISTINCT, 10);
        piece.commit([
            Coord::new(9, 17),
            Coord::new(9, 16),
            Coord::new(9, 15),
            Coord::new(9, 14),
        ]);
        e.piece = piece;
        tick_until_lock(e)
    }

    #[test]
    fn single_row_clears_score_100_each() {
        let mut e = engine(fast_config());
        for n in 1..=5 {
            let r = single_row_clear(&mut e);
            assert_eq!(r.rows_cleared, 1);
            assert_eq!(r.match_score, 0);
            assert_eq!(e.score(), 100 * n);
        }
        let rows = render(e.field());
        assert_eq!(&rows[15..], [".........C", ".........M", ".........O"]);
    }

    #[test]
    fn colour_match_scores_on_lock() {
        let mut e = engine(fast_config());
        let mut rows = vec![".........."; 17];
        rows.push("RR........");
        e.field = field_from(&rows);
        // O piece resting on the floor at columns 2..=3, red in the bottom-left block
        let mut piece = Piece::spawn(
            Shape::O,
            [Neon::Cyan, Neon::Magenta, Neon::Red, Neon::Orange],
            10,
        );
        piece.commit([
            Coord::new(3, 16),
            Coord::new(2, 16),
            Coord::new(2, 17),
            Coord::new(3, 17),
        ]);
        e.piece = piece;
        let r = tick_until_lock(&mut e);
        assert_eq!(r.match_score, 100);
        assert_eq!(r.rows_cleared, 0);
        assert_eq!(r.cleared_cells, vec![(17, 0), (17, 1), (17, 2)]);
        assert_eq!(e.score(), 100);
        let rows = render(e.field());
        assert_eq!(rows[16], "...C......");
        assert_eq!(rows[17], "..MO......");
    }

    #[test]
    fn blocked_spawn_ends_the_session() {
        let mut e = engine(fast_config());
        // Occupy the next piece's cells below row 0 with colours that form no run.
        let under_spawn: Vec<Coord> = e.next_cells().map(|(c, _)| c).filter(|c| c.y >= 1).collect();
        assert!(!under_spawn.is_empty());
        for (c, color) in under_spawn.iter().zip(DISTINCT) {
            e.field.set(c.x as usize, c.y as usize, Cell::Block(color));
        }
        let mut piece = Piece::spawn(Shape::O, DISTINCT, 10);
        piece.commit([
            Coord::new(1, 16),
            Coord::new(0, 16),
            Coord::new(0, 17),
            Coord::new(1, 17),
        ]);
        e.piece = piece;

        let r = tick_until_lock(&mut e);
        assert_eq!(r.rows_cleared, 0);
        assert_eq!(r.match_score, 0);
        assert_eq!(r.game_over, Some(0));
        assert_eq!(e.session(), 2);
        assert_eq!(e.store().writes, 1);
        assert!(e.field().rows().flatten().all(|c| !c.is_occupied()));
    }

    #[test]
    fn fall_counter_saturates() {
        let mut e = engine(EngineConfig {
            fall_step: u32::MAX / 2 + 1,
            fall_limit: u32::MAX,
            seed: Some(3),
            ..EngineConfig::default()
        });
        let start = *e.piece().blocks();
        for _ in 0..3 {
            e.tick(&IDLE).unwrap();
        }
        assert_eq!(e.fall_counter, u32::MAX);
        assert_eq!(e.piece().blocks(), &start);
    }
}
