use crate::vector::Vec2i;

/// The single active piece of food.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Food {
    pub position: Vec2i,
}

impl Food {
    pub fn new(position: Vec2i) -> Self {
        Food { position }
    }
}
