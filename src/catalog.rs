//! Piece catalog: the seven shape templates and spawn placement.

/// Cell coordinate on the field. `y` grows downwards and may be negative above the field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Coord {
    pub x: i32,
    pub y: i32,
}

impl Coord {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    #[inline]
    pub const fn offset(self, dx: i32, dy: i32) -> Self {
        Self::new(self.x + dx, self.y + dy)
    }
}

/// Row the pivot of a freshly spawned piece sits on.
pub const SPAWN_ROW: i32 = 1;

/// Shape kinds (I, O, S, Z, J, L, T).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Shape {
    I,
    O,
    S,
    Z,
    J,
    L,
    T,
}

impl Shape {
    pub const ALL: [Self; 7] = [Self::I, Self::O, Self::S, Self::Z, Self::J, Self::L, Self::T];

    /// 4 offsets relative to the spawn anchor. Index 0 is the rotation pivot.
    pub const fn offsets(self) -> &'static [(i8, i8); 4] {
        match self {
            Self::I => &[(-1, 0), (-2, 0), (0, 0), (1, 0)],
            Self::O => &[(0, -1), (-1, -1), (-1, 0), (0, 0)],
            Self::S => &[(-1, 0), (-1, 1), (0, 0), (0, -1)],
            Self::Z => &[(0, 0), (-1, 0), (0, 1), (-1, -1)],
            Self::J => &[(0, 0), (0, -1), (0, 1), (-1, -1)],
            Self::L => &[(0, 0), (0, -1), (0, 1), (1, -1)],
            Self::T => &[(0, 0), (0, -1), (0, 1), (-1, 0)],
        }
    }

    /// Absolute block coordinates of this shape anchored at `origin`.
    pub fn instantiate(self, origin: Coord) -> [Coord; 4] {
        self.offsets()
            .map(|(dx, dy)| origin.offset(i32::from(dx), i32::from(dy)))
    }
}

/// Spawn anchor for a field `width` columns wide: horizontal centre, [`SPAWN_ROW`].
pub const fn spawn_origin(width: usize) -> Coord {
    Coord::new((width / 2) as i32, SPAWN_ROW)
}
