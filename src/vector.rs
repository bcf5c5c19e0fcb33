use std::ops::{Add, AddAssign, Div, Mul, Neg, Sub};

/// Integer 2D vector used for grid positions and heading vectors.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct Vec2i {
    pub x: i32,
    pub y: i32,
}

impl Vec2i {
    pub const UP: Vec2i = Vec2i::new(0, -1);
    pub const DOWN: Vec2i = Vec2i::new(0, 1);
    pub const LEFT: Vec2i = Vec2i::new(-1, 0);
    pub const RIGHT: Vec2i = Vec2i::new(1, 0);

    /// "No direction change requested."
    pub const NONE: Vec2i = Vec2i::new(0, 0);

    pub const fn new(x: i32, y: i32) -> Self {
        Vec2i { x, y }
    }

    pub fn opposite(self) -> Self {
        -self
    }
}

impl Add for Vec2i {
    type Output = Vec2i;

    fn add(self, rhs: Vec2i) -> Vec2i {
        Vec2i::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl AddAssign for Vec2i {
    fn add_assign(&mut self, rhs: Vec2i) {
        self.x += rhs.x;
        self.y += rhs.y;
    }
}

impl Sub for Vec2i {
    type Output = Vec2i;

    fn sub(self, rhs: Vec2i) -> Vec2i {
        Vec2i::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl Neg for Vec2i {
    type Output = Vec2i;

    fn neg(self) -> Vec2i {
        Vec2i::new(-self.x, -self.y)
    }
}

impl Mul<i32> for Vec2i {
    type Output = Vec2i;

    fn mul(self, rhs: i32) -> Vec2i {
        Vec2i::new(self.x * rhs, self.y * rhs)
    }
}

// Component-wise
impl Mul for Vec2i {
    type Output = Vec2i;

    fn mul(self, rhs: Vec2i) -> Vec2i {
        Vec2i::new(self.x * rhs.x, self.y * rhs.y)
    }
}

impl Div<i32> for Vec2i {
    type Output = Vec2i;

    fn div(self, rhs: i32) -> Vec2i {
        Vec2i::new(self.x / rhs, self.y / rhs)
    }
}

/// A direction signal coming out of the input device.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

impl Direction {
    pub fn vector(self) -> Vec2i {
        match self {
            Direction::Up => Vec2i::UP,
            Direction::Down => Vec2i::DOWN,
            Direction::Left => Vec2i::LEFT,
            Direction::Right => Vec2i::RIGHT,
        }
    }
}

impl From<Direction> for Vec2i {
    fn from(dir: Direction) -> Self {
        dir.vector()
    }
}
