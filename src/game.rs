use log::{debug, info};

use crate::clock::Clock;
use crate::config::GameConfig;
use crate::error::PortError;
use crate::food_system::FoodSystem;
use crate::port::{PresentationPort, VisualKind};
use crate::registry::{Entity, EntityId, Registry};
use crate::snake::{Segment, Snake};
use crate::snake_system::SnakeSystem;
use crate::vector::Vec2i;

const START_POSITION: Vec2i = Vec2i::new(1, 1);
const START_DIRECTION: Vec2i = Vec2i::RIGHT;

/// State of one game, owned by its loop.
pub struct Session {
    pub config: GameConfig,
    pub registry: Registry,
    pub score: u32,
    pub game_over: bool,
}

impl Session {
    pub fn new(config: GameConfig) -> Self {
        Session { config, registry: Registry::new(), score: 0, game_over: false }
    }

    /// Replaces the score and pushes it to the display.
    pub fn set_score<P>(&mut self, score: u32, port: &mut P) -> Result<(), PortError>
    where
        P: PresentationPort + ?Sized,
    {
        self.score = score;
        port.set_score_display(score)
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum SessionEnd {
    GameOver,
    Quit,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct SessionOutcome {
    pub final_score: u32,
    pub end: SessionEnd,
}

pub struct GameLoop {
    session: Session,
    snake_system: SnakeSystem,
    food_system: FoodSystem,
}

impl GameLoop {
    pub fn new(config: GameConfig) -> Self {
        let snake_system = SnakeSystem::new(config.tick_period());
        let food_system = FoodSystem::new(config.seed);
        GameLoop { session: Session::new(config), snake_system, food_system }
    }

    /// Sets up a session and plays it until game over or quit.
    pub fn run<P, C>(mut self, port: &mut P, clock: &C) -> Result<SessionOutcome, PortError>
    where
        P: PresentationPort + ?Sized,
        C: Clock + ?Sized,
    {
        self.setup(port)?;
        self.play(port, clock)
    }

    /// Spawns the one-segment snake and the first food, and resets the score.
    pub fn setup<P>(&mut self, port: &mut P) -> Result<(), PortError>
    where
        P: PresentationPort + ?Sized,
    {
        info!("Setting up game entities");
        let segment_size = self.session.config.segment_size;

        let head = Segment {
            position: START_POSITION,
            direction: START_DIRECTION,
            visual: self.session.registry.allocate_id(),
        };
        self.session.registry.spawn(Entity::Snake(Snake::new(head)));
        port.spawn_visual(head.visual, head.position, segment_size, VisualKind::Snake)?;

        self.food_system.spawn_food(&mut self.session, port)?;
        self.session.set_score(0, port)
    }

    pub fn play<P, C>(&mut self, port: &mut P, clock: &C) -> Result<SessionOutcome, PortError>
    where
        P: PresentationPort + ?Sized,
        C: Clock + ?Sized,
    {
        info!("Starting game loop");
        let frame_budget = self.session.config.frame_budget();

        let end = loop {
            if self.session.game_over {
                break SessionEnd::GameOver;
            }
            if port.quit_requested() {
                break SessionEnd::Quit;
            }

            let frame_start = clock.now();
            self.frame(port, clock)?;

            // Only fast frames are throttled, slow ones are not made up for
            let frame_time = clock.now().saturating_sub(frame_start);
            if frame_time < frame_budget {
                clock.sleep(frame_budget - frame_time);
            }
        };

        let final_score = self.session.score;
        match end {
            SessionEnd::GameOver => {
                info!("Game over after {} food, final score {}", self.food_system.food_eaten(), final_score);
                port.show_game_over(final_score)?;
            }
            SessionEnd::Quit => info!("Player quit with score {}", final_score),
        }

        self.teardown(port)?;
        Ok(SessionOutcome { final_score, end })
    }

    /// One update: snake, then food, then the removal pass.
    pub fn frame<P, C>(&mut self, port: &mut P, clock: &C) -> Result<(), PortError>
    where
        P: PresentationPort + ?Sized,
        C: Clock + ?Sized,
    {
        debug!("Updating frame");
        self.snake_system.run(&mut self.session, port, clock.now())?;

        if !self.session.game_over {
            self.food_system.run(&mut self.session, port)?;
        }

        for (id, entity) in self.session.registry.remove_flagged() {
            remove_visuals(port, id, &entity)?;
        }
        Ok(())
    }

    fn teardown<P>(&mut self, port: &mut P) -> Result<(), PortError>
    where
        P: PresentationPort + ?Sized,
    {
        if self.session.registry.is_empty() {
            return Ok(());
        }

        info!("Removing {} remaining entities", self.session.registry.len());
        for (id, entity) in self.session.registry.drain_all() {
            remove_visuals(port, id, &entity)?;
        }
        Ok(())
    }
}

fn remove_visuals<P>(port: &mut P, id: EntityId, entity: &Entity) -> Result<(), PortError>
where
    P: PresentationPort + ?Sized,
{
    match entity {
        Entity::Snake(snake) => {
            for seg in snake.segments() {
                port.remove_visual(seg.visual)?;
            }
        }
        Entity::Food(_) => port.remove_visual(id)?,
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::clock::ManualClock;
    use crate::food::Food;
    use crate::port::testing::RecordingPort;
    use crate::vector::Direction;

    // One frame per tick keeps the arithmetic simple
    fn one_step_per_frame() -> GameConfig {
        GameConfig { frame_rate: 10, ticks_per_second: 10, seed: Some(1), ..GameConfig::default() }
    }

    fn place_food(game: &mut GameLoop, port: &mut RecordingPort, at: Vec2i) {
        if let Some((id, _)) = game.session.registry.food() {
            game.session.registry.flag_for_deletion(id);
        }
        for (id, entity) in game.session.registry.remove_flagged() {
            remove_visuals(port, id, &entity).unwrap();
        }
        let id = game.session.registry.spawn(Entity::Food(Food::new(at)));
        port.spawn_visual(id, at, 20, VisualKind::Food).unwrap();
    }

    #[test]
    fn setup_spawns_head_and_food() {
        let mut game = GameLoop::new(one_step_per_frame());
        let mut port = RecordingPort::new(500, 380);

        game.setup(&mut port).unwrap();

        let snake = game.session.registry.snake().unwrap();
        assert_eq!(snake.len(), 1);
        assert_eq!(snake.head().position, Vec2i::new(1, 1));
        assert_eq!(snake.head().direction, Vec2i::RIGHT);
        assert!(game.session.registry.food().is_some());
        assert_eq!(port.visuals_of(VisualKind::Snake), vec![Vec2i::new(1, 1)]);
        assert_eq!(port.visuals_of(VisualKind::Food).len(), 1);
        assert_eq!(port.scores, vec![0]);
    }

    #[test]
    fn walk_eat_and_grow() {
        let mut game = GameLoop::new(one_step_per_frame());
        let mut port = RecordingPort::new(500, 380);
        let clock = ManualClock::new();
        game.setup(&mut port).unwrap();
        place_food(&mut game, &mut port, Vec2i::new(401, 301));

        for _ in 0..3 {
            game.frame(&mut port, &clock).unwrap();
            clock.advance(Duration::from_millis(100));
        }
        assert_eq!(game.session.registry.snake().unwrap().head().position, Vec2i::new(61, 1));

        place_food(&mut game, &mut port, Vec2i::new(81, 1));
        game.frame(&mut port, &clock).unwrap();
        clock.advance(Duration::from_millis(100));

        let snake = game.session.registry.snake().unwrap();
        assert_eq!(snake.head().position, Vec2i::new(81, 1));
        assert!(snake.should_grow);
        assert_eq!(snake.len(), 1);
        assert_eq!(game.session.score, 5);

        // Keep the respawned food out of the way
        place_food(&mut game, &mut port, Vec2i::new(401, 301));
        game.frame(&mut port, &clock).unwrap();

        let snake = game.session.registry.snake().unwrap();
        assert_eq!(snake.len(), 2);
        assert!(!snake.should_grow);
        // The eaten food's visual is gone, its replacement is up
        assert_eq!(port.visuals_of(VisualKind::Food).len(), 1);
        assert_eq!(port.visuals_of(VisualKind::Snake).len(), 2);
    }

    #[test]
    fn session_ends_on_self_collision() {
        let mut game = GameLoop::new(one_step_per_frame());
        let mut port = RecordingPort::new(500, 380).with_inputs(&[
            Some(Direction::Down),
            Some(Direction::Left),
            Some(Direction::Up),
        ]);
        let clock = ManualClock::new();

        let segments = [(101, 101), (81, 101), (61, 101), (41, 101), (21, 101)]
            .iter()
            .map(|&(x, y)| {
                let visual = game.session.registry.allocate_id();
                port.spawn_visual(visual, Vec2i::new(x, y), 20, VisualKind::Snake).unwrap();
                Segment { position: Vec2i::new(x, y), direction: Vec2i::RIGHT, visual }
            })
            .collect();
        game.session.registry.spawn(Entity::Snake(Snake::from_segments(segments)));
        place_food(&mut game, &mut port, Vec2i::new(401, 301));

        let outcome = game.play(&mut port, &clock).unwrap();

        assert_eq!(outcome, SessionOutcome { final_score: 0, end: SessionEnd::GameOver });
        assert_eq!(port.game_over, Some(0));
        // Three moving frames plus the one that noticed the collision
        assert_eq!(clock.total_slept(), Duration::from_millis(400));
        assert!(game.session.registry.is_empty());
        assert!(port.visuals.is_empty());
    }

    #[test]
    fn quitting_skips_the_game_over_screen() {
        let mut game = GameLoop::new(GameConfig { seed: Some(5), ..GameConfig::default() });
        let mut port = RecordingPort::new(500, 380);
        port.quit_after_reads = Some(3);
        let clock = ManualClock::new();

        game.setup(&mut port).unwrap();
        let outcome = game.play(&mut port, &clock).unwrap();

        assert_eq!(outcome.end, SessionEnd::Quit);
        assert_eq!(port.game_over, None);
        assert!(port.visuals.is_empty());
        // Three fast frames, each padded to the 10ms budget
        assert_eq!(clock.total_slept(), Duration::from_millis(30));
    }

    /// Port whose input read takes longer than a whole frame.
    struct SlowPort<'a> {
        inner: RecordingPort,
        clock: &'a ManualClock,
    }

    impl PresentationPort for SlowPort<'_> {
        fn read_direction_input(&mut self) -> Result<Option<Direction>, PortError> {
            self.clock.advance(Duration::from_millis(25));
            self.inner.read_direction_input()
        }

        fn query_grid_bounds(&mut self, segment_size: i32) -> Result<crate::grid::GridBounds, PortError> {
            self.inner.query_grid_bounds(segment_size)
        }

        fn spawn_visual(&mut self, id: EntityId, position: Vec2i, size: i32, kind: VisualKind) -> Result<(), PortError> {
            self.inner.spawn_visual(id, position, size, kind)
        }

        fn remove_visual(&mut self, id: EntityId) -> Result<(), PortError> {
            self.inner.remove_visual(id)
        }

        fn move_visual(&mut self, id: EntityId, position: Vec2i) -> Result<(), PortError> {
            self.inner.move_visual(id, position)
        }

        fn set_score_display(&mut self, score: u32) -> Result<(), PortError> {
            self.inner.set_score_display(score)
        }

        fn show_game_over(&mut self, final_score: u32) -> Result<(), PortError> {
            self.inner.show_game_over(final_score)
        }

        fn quit_requested(&self) -> bool {
            self.inner.quit_requested()
        }
    }

    #[test]
    fn slow_frames_are_not_padded() {
        let clock = ManualClock::new();
        let mut inner = RecordingPort::new(500, 380);
        inner.quit_after_reads = Some(4);
        let mut port = SlowPort { inner, clock: &clock };

        let outcome = GameLoop::new(GameConfig { seed: Some(5), ..GameConfig::default() })
            .run(&mut port, &clock)
            .unwrap();

        assert_eq!(outcome.end, SessionEnd::Quit);
        assert_eq!(clock.total_slept(), Duration::ZERO);
        assert_eq!(clock.now(), Duration::from_millis(100));
    }
}
