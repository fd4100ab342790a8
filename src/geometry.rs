use glam::Vec2;

// ---------------------------------------------------------------------------
// Axis / Direction
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Axis {
    X,
    Y,
}

impl Axis {
    /// Resolution order.
    pub const ALL: [Axis; 2] = [Axis::X, Axis::Y];

    pub fn perpendicular(self) -> Axis {
        match self {
            Axis::X => Axis::Y,
            Axis::Y => Axis::X,
        }
    }

    /// Component of `v` along this axis.
    pub fn of(self, v: Vec2) -> f32 {
        match self {
            Axis::X => v.x,
            Axis::Y => v.y,
        }
    }

    pub fn set(self, v: &mut Vec2, value: f32) {
        match self {
            Axis::X => v.x = value,
            Axis::Y => v.y = value,
        }
    }

    pub fn unit(self) -> Vec2 {
        match self {
            Axis::X => Vec2::X,
            Axis::Y => Vec2::Y,
        }
    }
}

/// Compass direction in screen space (y grows downward).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Direction {
    Right = 0,
    Down = 1,
    Left = 2,
    Up = 3,
}

impl Direction {
    pub const ALL: [Direction; 4] = [
        Direction::Right,
        Direction::Down,
        Direction::Left,
        Direction::Up,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn axis(self) -> Axis {
        match self {
            Direction::Right | Direction::Left => Axis::X,
            Direction::Down | Direction::Up => Axis::Y,
        }
    }

    /// +1 for Right/Down, -1 for Left/Up.
    pub fn sign(self) -> f32 {
        match self {
            Direction::Right | Direction::Down => 1.0,
            Direction::Left | Direction::Up => -1.0,
        }
    }

    pub fn reverse(self) -> Direction {
        match self {
            Direction::Right => Direction::Left,
            Direction::Down => Direction::Up,
            Direction::Left => Direction::Right,
            Direction::Up => Direction::Down,
        }
    }

    /// Direction along `axis` pointing the same way as `sign`.
    /// Zero counts as positive.
    pub fn from_axis_sign(axis: Axis, sign: f32) -> Direction {
        match (axis, sign < 0.0) {
            (Axis::X, false) => Direction::Right,
            (Axis::X, true) => Direction::Left,
            (Axis::Y, false) => Direction::Down,
            (Axis::Y, true) => Direction::Up,
        }
    }

    pub fn to_vec2(self) -> Vec2 {
        self.axis().unit() * self.sign()
    }

    /// Dominant cardinal direction of `v`, or `None` for a zero vector.
    pub fn dominant(v: Vec2) -> Option<Direction> {
        if v == Vec2::ZERO {
            return None;
        }
        if v.x.abs() >= v.y.abs() {
            Some(Direction::from_axis_sign(Axis::X, v.x))
        } else {
            Some(Direction::from_axis_sign(Axis::Y, v.y))
        }
    }
}

// ---------------------------------------------------------------------------
// Rect
// ---------------------------------------------------------------------------

/// Axis-aligned box, `min` is the top-left corner.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Rect {
    pub min: Vec2,
    pub size: Vec2,
}

impl Rect {
    pub const fn new(x: f32, y: f32, w: f32, h: f32) -> Self {
        Self {
            min: Vec2::new(x, y),
            size: Vec2::new(w, h),
        }
    }

    pub fn from_min_max(min: Vec2, max: Vec2) -> Self {
        Self {
            min,
            size: max - min,
        }
    }

    /// Box of `size` centered on the origin.
    pub fn centered(size: Vec2) -> Self {
        Self {
            min: size * -0.5,
            size,
        }
    }

    pub fn max(&self) -> Vec2 {
        self.min + self.size
    }

    pub fn left(&self) -> f32 {
        self.min.x
    }

    pub fn right(&self) -> f32 {
        self.min.x + self.size.x
    }

    pub fn top(&self) -> f32 {
        self.min.y
    }

    pub fn bottom(&self) -> f32 {
        self.min.y + self.size.y
    }

    pub fn center(&self) -> Vec2 {
        self.min + self.size * 0.5
    }

    pub fn min_on(&self, axis: Axis) -> f32 {
        axis.of(self.min)
    }

    pub fn max_on(&self, axis: Axis) -> f32 {
        axis.of(self.min) + axis.of(self.size)
    }

    pub fn translated(&self, offset: Vec2) -> Rect {
        Rect {
            min: self.min + offset,
            size: self.size,
        }
    }

    pub fn inflated(&self, amount: f32) -> Rect {
        Rect {
            min: self.min - Vec2::splat(amount),
            size: self.size + Vec2::splat(amount * 2.0),
        }
    }

    pub fn union(&self, other: &Rect) -> Rect {
        Rect::from_min_max(self.min.min(other.min), self.max().max(other.max()))
    }

    /// Strict overlap; boxes sharing only an edge do not intersect.
    pub fn intersects(&self, other: &Rect) -> bool {
        self.left() < other.right()
            && other.left() < self.right()
            && self.top() < other.bottom()
            && other.top() < self.bottom()
    }

    pub fn contains_point(&self, p: Vec2) -> bool {
        p.x >= self.left() && p.x < self.right() && p.y >= self.top() && p.y < self.bottom()
    }

    /// Signed overlap of the two projections on `axis`. Negative is a gap.
    pub fn overlap_on(&self, axis: Axis, other: &Rect) -> f32 {
        self.max_on(axis).min(other.max_on(axis)) - self.min_on(axis).max(other.min_on(axis))
    }

    /// How far `self` reaches past the face of `solid` it meets when
    /// travelling in `dir`. Negative when there is still a gap.
    pub fn penetration(&self, solid: &Rect, dir: Direction) -> f32 {
        match dir {
            Direction::Right => self.right() - solid.left(),
            Direction::Left => solid.right() - self.left(),
            Direction::Down => self.bottom() - solid.top(),
            Direction::Up => solid.bottom() - self.top(),
        }
    }

    /// True when both axis overlaps exceed `tolerance`.
    pub fn overlaps_by(&self, other: &Rect, tolerance: f32) -> bool {
        self.overlap_on(Axis::X, other) > tolerance && self.overlap_on(Axis::Y, other) > tolerance
    }
}
