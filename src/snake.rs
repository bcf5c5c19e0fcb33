use crate::registry::EntityId;
use crate::vector::Vec2i;

/// One grid cell occupied by the snake. Only the head's `direction` drives
/// movement; followers just take their predecessor's position.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Segment {
    pub position: Vec2i,
    pub direction: Vec2i,
    pub visual: EntityId,
}

#[derive(Clone, Debug)]
pub struct Snake {
    segments: Vec<Segment>,
    pub should_grow: bool,
}

impl Snake {
    pub fn new(head: Segment) -> Self {
        Snake { segments: vec![head], should_grow: false }
    }

    #[cfg(test)]
    pub fn from_segments(segments: Vec<Segment>) -> Self {
        assert!(!segments.is_empty());
        Snake { segments, should_grow: false }
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub(crate) fn segments_mut(&mut self) -> &mut [Segment] {
        &mut self.segments
    }

    pub fn head(&self) -> &Segment {
        &self.segments[0]
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn grow(&mut self) {
        self.should_grow = true;
    }

    /// True when the head shares its cell with any other segment.
    pub fn is_self_colliding(&self) -> bool {
        let head = self.head().position;
        self.segments[1..].iter().any(|seg| seg.position == head)
    }

    /// Appends a segment directly behind the current tail and clears the
    /// growth request. Existing segments are left untouched.
    pub fn add_tail(&mut self, visual: EntityId, segment_size: i32) -> &Segment {
        let tail = self.segments[self.segments.len() - 1];

        let step = match self.segments.len() {
            1 => tail.direction.opposite(),
            n => trailing_step(tail.position - self.segments[n - 2].position, segment_size),
        };

        self.segments.push(Segment {
            position: tail.position + step * segment_size,
            direction: tail.direction,
            visual,
        });
        self.should_grow = false;

        &self.segments[self.segments.len() - 1]
    }
}

// Unit step pointing away from the predecessor. A gap wider than one cell
// means the pair straddles a wrap, so the step is reversed on that axis.
fn trailing_step(delta: Vec2i, segment_size: i32) -> Vec2i {
    let axis = |d: i32| {
        if d.abs() > segment_size {
            -d.signum()
        } else {
            d.signum()
        }
    };
    Vec2i::new(axis(delta.x), axis(delta.y))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seg(x: i32, y: i32) -> Segment {
        Segment { position: Vec2i::new(x, y), direction: Vec2i::RIGHT, visual: 0 }
    }

    #[test]
    fn collision_needs_a_duplicate_of_the_head() {
        let ok = Snake::from_segments(vec![seg(61, 1), seg(41, 1), seg(21, 1)]);
        assert!(!ok.is_self_colliding());

        let hit = Snake::from_segments(vec![seg(41, 1), seg(41, 21), seg(61, 21), seg(61, 1), seg(41, 1)]);
        assert!(hit.is_self_colliding());

        // Body overlapping itself is not a head collision
        let body_only = Snake::from_segments(vec![seg(81, 1), seg(41, 1), seg(41, 1)]);
        assert!(!body_only.is_self_colliding());
    }

    #[test]
    fn single_head_never_collides() {
        assert!(!Snake::from_segments(vec![seg(1, 1)]).is_self_colliding());
    }

    #[test]
    fn tail_continues_the_heading() {
        let mut snake = Snake::from_segments(vec![seg(61, 1), seg(41, 1), seg(41, 21)]);
        snake.grow();
        let before: Vec<_> = snake.segments().to_vec();

        let added = *snake.add_tail(9, 20);

        assert_eq!(added.position, Vec2i::new(41, 41));
        assert_eq!(added.visual, 9);
        assert_eq!(snake.len(), 4);
        assert!(!snake.should_grow);
        assert_eq!(&snake.segments()[..3], &before[..]);
    }

    #[test]
    fn tail_behind_lone_head() {
        let mut snake = Snake::new(seg(81, 1));
        let added = *snake.add_tail(1, 20);
        assert_eq!(added.position, Vec2i::new(61, 1));
    }

    #[test]
    fn tail_across_a_wrap() {
        // Head wrapped from 481 to 1, follower still at 481
        let mut snake = Snake::from_segments(vec![seg(1, 1), seg(481, 1)]);
        let added = *snake.add_tail(2, 20);
        assert_eq!(added.position, Vec2i::new(461, 1));
    }
}
