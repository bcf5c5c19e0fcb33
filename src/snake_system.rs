use std::time::Duration;

use log::{debug, info};

use crate::error::PortError;
use crate::game::Session;
use crate::movement;
use crate::port::{PresentationPort, VisualKind};
use crate::vector::Vec2i;

/// Rate limiter for snake steps, independent of the frame rate.
///
/// The first call always fires. After that the schedule advances by whole
/// periods so the long-run rate matches the tick rate; after a stall it
/// restarts from `now` rather than firing back to back.
#[derive(Debug)]
pub struct MovementCadence {
    period: Duration,
    last: Option<Duration>,
}

impl MovementCadence {
    pub fn new(period: Duration) -> Self {
        MovementCadence { period, last: None }
    }

    pub fn ready(&mut self, now: Duration) -> bool {
        let last = match self.last {
            None => {
                self.last = Some(now);
                return true;
            }
            Some(last) => last,
        };

        if now.saturating_sub(last) < self.period {
            return false;
        }

        let next = last + self.period;
        self.last = Some(if now.saturating_sub(next) >= self.period { now } else { next });
        true
    }
}

/// Per-frame driver for the snake: game over check, growth, input latching
/// and throttled movement.
pub struct SnakeSystem {
    current_direction: Vec2i,
    cadence: MovementCadence,
}

impl SnakeSystem {
    pub fn new(tick_period: Duration) -> Self {
        SnakeSystem { current_direction: Vec2i::NONE, cadence: MovementCadence::new(tick_period) }
    }

    pub fn run<P>(&mut self, session: &mut Session, port: &mut P, now: Duration) -> Result<(), PortError>
    where
        P: PresentationPort + ?Sized,
    {
        let segment_size = session.config.segment_size;

        let (colliding, should_grow) = match session.registry.snake() {
            Some(snake) => (snake.is_self_colliding(), snake.should_grow),
            None => return Ok(()),
        };

        if colliding {
            info!("Snake ran into itself, game over");
            session.game_over = true;
            return Ok(());
        }

        if should_grow {
            let visual = session.registry.allocate_id();
            if let Some(snake) = session.registry.snake_mut() {
                let tail = *snake.add_tail(visual, segment_size);
                debug!("Snake grew to {} segments", snake.len());
                port.spawn_visual(tail.visual, tail.position, segment_size, VisualKind::Snake)?;
            }
        }

        // Latched here so a key press counts even between movement ticks
        if let Some(dir) = port.read_direction_input()? {
            self.current_direction = dir.vector();
        }

        if !self.cadence.ready(now) {
            return Ok(());
        }

        let bounds = port.query_grid_bounds(segment_size)?;
        if let Some(snake) = session.registry.snake_mut() {
            movement::advance(snake, self.current_direction, segment_size, bounds);

            for seg in snake.segments() {
                port.move_visual(seg.visual, seg.position)?;
            }
            debug!("Snake head at {:?}", snake.head().position);
        }

        Ok(())
    }
}
