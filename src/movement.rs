use crate::grid::GridBounds;
use crate::snake::Snake;
use crate::vector::Vec2i;

/// Advances the snake one grid step.
///
/// A non-`NONE` input replaces the head's heading before it moves; reversals
/// are accepted as-is. Followers are shifted from the tail forward so each
/// one picks up its predecessor's position from before this step. Only the
/// head is wrapped. Collision detection is left to the caller.
pub fn advance(snake: &mut Snake, input: Vec2i, segment_size: i32, bounds: GridBounds) {
    let segments = snake.segments_mut();

    for i in (0..segments.len()).rev() {
        if i > 0 {
            segments[i].position = segments[i - 1].position;
            continue;
        }

        let head = &mut segments[0];
        if input != Vec2i::NONE {
            head.direction = input;
        }
        head.position += head.direction * segment_size;
        head.position = bounds.wrap(head.position);
    }
}
