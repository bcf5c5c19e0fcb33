use rand::Rng;

use crate::vector::Vec2i;

/// Maximum coordinate extents of the play field, recomputed from the
/// surface size on every query.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct GridBounds {
    pub max_x: i32,
    pub max_y: i32,
}

impl GridBounds {
    pub fn from_surface(width: i32, height: i32, segment_size: i32) -> Self {
        let max_x = (width / segment_size) * segment_size;
        let max_y = (height / segment_size + 1) * segment_size;
        GridBounds { max_x, max_y }
    }

    /// Applies the wrap policy to a single position. Negative overflow adds the
    /// extent, positive overflow resets to 1.
    pub fn wrap(&self, mut pos: Vec2i) -> Vec2i {
        if pos.x < 0 {
            pos.x += self.max_x;
        }
        if pos.y < 0 {
            pos.y += self.max_y;
        }
        if pos.x > self.max_x {
            pos.x = 1;
        }
        if pos.y > self.max_y {
            pos.y = 1;
        }
        pos
    }

    /// Picks a random grid-aligned cell for food. Cell 0 on either axis is
    /// never chosen unless it is the only one. The snake body is not taken
    /// into account.
    pub fn random_food_cell<R: Rng + ?Sized>(&self, rng: &mut R, segment_size: i32) -> Vec2i {
        let x = random_cell_index(rng, self.max_x / segment_size) * segment_size + 1;
        let y = random_cell_index(rng, self.max_y / segment_size) * segment_size + 1;
        Vec2i::new(x, y)
    }
}

fn random_cell_index<R: Rng + ?Sized>(rng: &mut R, cells: i32) -> i32 {
    // Narrower than two cells: fall back to the first one, which stays in bounds
    if cells <= 1 {
        return 0;
    }
    rng.gen_range(1..cells)
}
