use log::{debug, info};
use rand::{rngs::StdRng, SeedableRng};

use crate::error::PortError;
use crate::food::Food;
use crate::game::Session;
use crate::port::{PresentationPort, VisualKind};
use crate::registry::{Entity, EntityId};

/// Eating, scoring and food placement.
pub struct FoodSystem {
    food_eaten: u32,
    rng: StdRng,
}

impl FoodSystem {
    pub fn new(seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        FoodSystem { food_eaten: 0, rng }
    }

    pub fn food_eaten(&self) -> u32 {
        self.food_eaten
    }

    pub fn run<P>(&mut self, session: &mut Session, port: &mut P) -> Result<(), PortError>
    where
        P: PresentationPort + ?Sized,
    {
        let head = match session.registry.snake() {
            Some(snake) => snake.head().position,
            None => return Ok(()),
        };
        let (food_id, food_pos) = match session.registry.food() {
            Some((id, food)) => (id, food.position),
            None => return Ok(()),
        };

        if head != food_pos {
            return Ok(());
        }

        session.registry.flag_for_deletion(food_id);
        if let Some(snake) = session.registry.snake_mut() {
            snake.grow();
        }

        self.food_eaten = self.food_eaten.saturating_add(1);
        // Tops out at u32::MAX instead of wrapping
        let score = self.food_eaten.saturating_mul(session.config.food_score);
        info!("Food eaten at {:?}, score {}", food_pos, score);
        session.set_score(score, port)?;

        self.spawn_food(session, port)?;
        Ok(())
    }

    /// Places a new food on a random cell. The snake body is not avoided.
    pub fn spawn_food<P>(&mut self, session: &mut Session, port: &mut P) -> Result<EntityId, PortError>
    where
        P: PresentationPort + ?Sized,
    {
        let segment_size = session.config.segment_size;
        let bounds = port.query_grid_bounds(segment_size)?;
        let position = bounds.random_food_cell(&mut self.rng, segment_size);

        let id = session.registry.spawn(Entity::Food(Food::new(position)));
        debug!("Spawned food {} at {:?}", id, position);
        port.spawn_visual(id, position, segment_size, VisualKind::Food)?;
        Ok(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GameConfig;
    use crate::grid::GridBounds;
    use crate::port::testing::RecordingPort;
    use crate::snake::{Segment, Snake};
    use crate::vector::Vec2i;

    fn session(head: Vec2i, food: Vec2i) -> (Session, EntityId) {
        let mut session = Session::new(GameConfig::default());
        let visual = session.registry.allocate_id();
        session.registry.spawn(Entity::Snake(Snake::new(Segment { position: head, direction: Vec2i::RIGHT, visual })));
        let food_id = session.registry.spawn(Entity::Food(Food::new(food)));
        (session, food_id)
    }

    #[test]
    fn eating_grows_scores_and_respawns() {
        let (mut session, old_food) = session(Vec2i::new(81, 1), Vec2i::new(81, 1));
        let mut port = RecordingPort::new(500, 380);
        let mut system = FoodSystem::new(Some(3));

        system.run(&mut session, &mut port).unwrap();

        assert_eq!(system.food_eaten(), 1);
        assert_eq!(session.score, 5);
        assert_eq!(port.scores, vec![5]);
        assert!(session.registry.snake().unwrap().should_grow);

        let (new_food, food) = session.registry.food().unwrap();
        assert_ne!(new_food, old_food);
        let bounds = GridBounds::from_surface(500, 380, 20);
        assert!(1 <= food.position.x && food.position.x <= bounds.max_x);
        assert!(1 <= food.position.y && food.position.y <= bounds.max_y);
        assert_eq!((food.position.x - 1) % 20, 0);
        assert_eq!((food.position.y - 1) % 20, 0);
        assert_eq!(port.visuals_of(VisualKind::Food), vec![food.position]);

        // Old food only goes away in the end-of-frame pass
        let removed = session.registry.remove_flagged();
        assert_eq!(removed.len(), 1);
        assert_eq!(removed[0].0, old_food);
    }

    #[test]
    fn score_is_count_times_food_score() {
        let (mut session, _) = session(Vec2i::new(81, 1), Vec2i::new(81, 1));
        let mut port = RecordingPort::new(500, 380);
        let mut system = FoodSystem::new(Some(11));

        for _ in 0..3 {
            // Put the active food under the head again
            let (id, _) = session.registry.food().unwrap();
            session.registry.flag_for_deletion(id);
            session.registry.spawn(Entity::Food(Food::new(Vec2i::new(81, 1))));
            system.run(&mut session, &mut port).unwrap();
        }

        assert_eq!(system.food_eaten(), 3);
        assert_eq!(port.scores, vec![5, 10, 15]);
        assert_eq!(session.score, 15);
    }

    #[test]
    fn score_saturates_with_a_large_food_score() {
        let (mut session, _) = session(Vec2i::new(81, 1), Vec2i::new(81, 1));
        session.config.food_score = 3_000_000_000;
        let mut port = RecordingPort::new(500, 380);
        let mut system = FoodSystem::new(Some(5));

        for _ in 0..2 {
            let (id, _) = session.registry.food().unwrap();
            session.registry.flag_for_deletion(id);
            session.registry.spawn(Entity::Food(Food::new(Vec2i::new(81, 1))));
            system.run(&mut session, &mut port).unwrap();
        }

        assert_eq!(system.food_eaten(), 2);
        assert_eq!(port.scores, vec![3_000_000_000, u32::MAX]);
        assert_eq!(session.score, u32::MAX);
    }

    #[test]
    fn nothing_happens_off_food() {
        let (mut session, food_id) = session(Vec2i::new(61, 1), Vec2i::new(81, 1));
        let mut port = RecordingPort::new(500, 380);
        let mut system = FoodSystem::new(Some(3));

        system.run(&mut session, &mut port).unwrap();

        assert_eq!(system.food_eaten(), 0);
        assert!(port.scores.is_empty());
        assert_eq!(session.registry.food().map(|(id, _)| id), Some(food_id));
        assert!(!session.registry.snake().unwrap().should_grow);
    }

    #[test]
    fn missing_food_is_a_no_op() {
        let mut session = Session::new(GameConfig::default());
        let mut port = RecordingPort::new(500, 380);
        let mut system = FoodSystem::new(Some(3));

        system.run(&mut session, &mut port).unwrap();
        assert_eq!(port.bounds_queries, 0);
    }

    // Known gap: food placement ignores the snake body.
    #[test]
    fn food_may_land_on_the_snake_body() {
        // The only candidate cell on this surface is (21, 21)
        let mut session = Session::new(GameConfig::default());
        let head = Segment { position: Vec2i::new(41, 21), direction: Vec2i::RIGHT, visual: session.registry.allocate_id() };
        let body = Segment { position: Vec2i::new(21, 21), direction: Vec2i::RIGHT, visual: session.registry.allocate_id() };
        session.registry.spawn(Entity::Snake(Snake::from_segments(vec![head, body])));
        let mut port = RecordingPort::new(40, 20);
        let mut system = FoodSystem::new(None);

        system.spawn_food(&mut session, &mut port).unwrap();

        let (_, food) = session.registry.food().unwrap();
        assert_eq!(food.position, Vec2i::new(21, 21));
    }
}
