//! Active piece geometry and the next-piece generator.
//!
//! Geometry is computed, never committed, here: [`Piece::translated`] and [`Piece::rotated`]
//! return candidate blocks which the engine validates against the field before calling
//! [`Piece::commit`].

use crate::catalog::{Coord, Shape, spawn_origin};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Block colour: one of the five neon palette entries. RGB values live in the theme.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Neon {
    Red,
    Orange,
    Magenta,
    Cyan,
    Purple,
}

impl Neon {
    pub const ALL: [Self; 5] = [Self::Red, Self::Orange, Self::Magenta, Self::Cyan, Self::Purple];

    #[inline]
    pub const fn index(self) -> usize {
        self as usize
    }
}

/// The falling figure: 4 blocks (block 0 is the pivot), each with its own colour.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Piece {
    pub shape: Shape,
    blocks: [Coord; 4],
    colors: [Neon; 4],
}

impl Piece {
    /// Piece of `shape` at the spawn position of a field `width` columns wide.
    pub fn spawn(shape: Shape, colors: [Neon; 4], width: usize) -> Self {
        Self {
            shape,
            blocks: shape.instantiate(spawn_origin(width)),
            colors,
        }
    }

    #[inline]
    pub fn blocks(&self) -> &[Coord; 4] {
        &self.blocks
    }

    /// Colour to paint block `i` with when it locks.
    #[inline]
    pub fn locked_color(&self, i: usize) -> Neon {
        self.colors[i]
    }

    /// Shift every block by (dx, dy). Legality is the field's business. The engine moves
    /// through [`Self::commit`]; this is for setting up positions directly.
    #[allow(dead_code)]
    pub fn translate(&mut self, dx: i32, dy: i32) {
        self.blocks = self.translated(dx, dy);
    }

    /// Blocks shifted by (dx, dy), without moving the piece.
    pub fn translated(&self, dx: i32, dy: i32) -> [Coord; 4] {
        self.blocks.map(|c| c.offset(dx, dy))
    }

    /// Blocks turned 90° about block 0, without moving the piece.
    pub fn rotated(&self) -> [Coord; 4] {
        let center = self.blocks[0];
        self.blocks.map(|c| {
            Coord::new(
                center.x - (c.y - center.y),
                center.y + (c.x - center.x),
            )
        })
    }

    /// Adopt candidate blocks from [`Self::translated`] or [`Self::rotated`].
    pub fn commit(&mut self, blocks: [Coord; 4]) {
        self.blocks = blocks;
    }

    /// (coordinate, colour) for each block.
    pub fn cells(&self) -> impl Iterator<Item = (Coord, Neon)> + '_ {
        self.blocks.iter().copied().zip(self.colors.iter().copied())
    }
}

/// Shape and colours of the upcoming piece.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NextPiece {
    pub shape: Shape,
    pub colors: [Neon; 4],
}

impl NextPiece {
    /// Preview blocks anchored at the spawn position of a field `width` columns wide.
    pub fn blocks(&self, width: usize) -> [Coord; 4] {
        self.shape.instantiate(spawn_origin(width))
    }
}

/// Draws shapes uniformly from the catalog and every block colour uniformly from [`Neon::ALL`].
#[derive(Debug, Clone)]
pub struct PieceGenerator {
    rng: StdRng,
    next: NextPiece,
}

impl PieceGenerator {
    pub fn new(seed: Option<u64>) -> Self {
        let mut rng = match seed {
            Some(s) => StdRng::seed_from_u64(s),
            None => StdRng::from_os_rng(),
        };
        let next = Self::draw(&mut rng);
        Self { rng, next }
    }

    fn draw(rng: &mut StdRng) -> NextPiece {
        let shape = Shape::ALL[rng.random_range(0..Shape::ALL.len())];
        let colors = [(); 4].map(|()| Neon::ALL[rng.random_range(0..Neon::ALL.len())]);
        NextPiece { shape, colors }
    }

    #[inline]
    pub fn next(&self) -> &NextPiece {
        &self.next
    }

    /// Hand out the previewed piece and draw a fresh preview.
    pub fn promote_next(&mut self) -> NextPiece {
        let fresh = Self::draw(&mut self.rng);
        std::mem::replace(&mut self.next, fresh)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t_piece() -> Piece {
        Piece::spawn(Shape::T, [Neon::Red; 4], 10)
    }

    #[test]
    fn translated_does_not_move_piece() {
        let p = t_piece();
        let moved = p.translated(1, 2);
        assert_eq!(moved[0], p.blocks()[0].offset(1, 2));
        assert_eq!(p.blocks(), &Shape::T.instantiate(spawn_origin(10)));
    }

    #[test]
    fn translate_moves_every_block() {
        let mut p = t_piece();
        let before = *p.blocks();
        p.translate(-1, 3);
        for (a, b) in before.iter().zip(p.blocks()) {
            assert_eq!(a.offset(-1, 3), *b);
        }
    }

    #[test]
    fn rotation_keeps_pivot_fixed() {
        let p = t_piece();
        assert_eq!(p.rotated()[0], p.blocks()[0]);
    }

    #[test]
    fn rotation_follows_quarter_turn_formula() {
        let p = t_piece();
        // T: pivot (5,1); (5,0) -> (6,1); (5,2) -> (4,1); (4,1) -> (5,0)
        assert_eq!(
            p.rotated(),
            [
                Coord::new(5, 1),
                Coord::new(6, 1),
                Coord::new(4, 1),
                Coord::new(5, 0)
            ]
        );
    }

    #[test]
    fn four_rotations_are_identity() {
        for shape in Shape::ALL {
            let mut p = Piece::spawn(shape, [Neon::Cyan; 4], 10);
            p.translate(0, 5);
            let start = *p.blocks();
            for _ in 0..4 {
                let r = p.rotated();
                p.commit(r);
            }
            assert_eq!(p.blocks(), &start, "{shape:?}");
        }
    }

    #[test]
    fn locked_color_is_per_block() {
        let colors = [Neon::Red, Neon::Orange, Neon::Magenta, Neon::Purple];
        let p = Piece::spawn(Shape::L, colors, 10);
        for (i, c) in colors.iter().enumerate() {
            assert_eq!(p.locked_color(i), *c);
        }
    }

    #[test]
    fn promote_hands_out_previous_preview() {
        let mut g = PieceGenerator::new(Some(7));
        let preview = *g.next();
        let promoted = g.promote_next();
        assert_eq!(promoted, preview);
    }

    #[test]
    fn same_seed_same_sequence() {
        let mut a = PieceGenerator::new(Some(42));
        let mut b = PieceGenerator::new(Some(42));
        for _ in 0..50 {
            assert_eq!(a.promote_next(), b.promote_next());
        }
    }

    #[test]
    fn generator_reaches_every_shape_and_colour() {
        let mut g = PieceGenerator::new(Some(1));
        let mut shapes = std::collections::HashSet::new();
        let mut colors = std::collections::HashSet::new();
        for _ in 0..500 {
            let n = g.promote_next();
            shapes.insert(n.shape);
            colors.extend(n.colors);
        }
        assert_eq!(shapes.len(), Shape::ALL.len());
        assert_eq!(colors.len(), Neon::ALL.len());
    }
}
