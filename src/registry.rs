use log::warn;

use crate::food::Food;
use crate::snake::Snake;

pub type EntityId = u32;

/// The fixed set of things that can live in a session.
#[derive(Debug)]
pub enum Entity {
    Snake(Snake),
    Food(Food),
}

#[derive(Debug)]
struct Slot {
    id: EntityId,
    entity: Entity,
    flagged: bool,
}

/// Live entities of one session. Ids are never reused while the registry
/// lives; segment visuals draw from the same counter.
#[derive(Debug, Default)]
pub struct Registry {
    next_id: EntityId,
    slots: Vec<Slot>,
}

impl Registry {
    pub fn new() -> Self {
        Registry::default()
    }

    pub fn allocate_id(&mut self) -> EntityId {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    pub fn spawn(&mut self, entity: Entity) -> EntityId {
        let id = self.allocate_id();
        self.slots.push(Slot { id, entity, flagged: false });
        id
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Marks an entity for removal at the end of the frame.
    pub fn flag_for_deletion(&mut self, id: EntityId) {
        match self.slots.iter_mut().find(|slot| slot.id == id) {
            Some(slot) => slot.flagged = true,
            None => warn!("Tried to flag unknown entity {}", id),
        }
    }

    pub fn remove_flagged(&mut self) -> Vec<(EntityId, Entity)> {
        let (flagged, kept) = std::mem::take(&mut self.slots)
            .into_iter()
            .partition::<Vec<_>, _>(|slot| slot.flagged);
        self.slots = kept;

        flagged.into_iter().map(|slot| (slot.id, slot.entity)).collect()
    }

    pub fn drain_all(&mut self) -> Vec<(EntityId, Entity)> {
        self.slots.drain(..).map(|slot| (slot.id, slot.entity)).collect()
    }

    pub fn snake(&self) -> Option<&Snake> {
        self.active().find_map(|slot| match &slot.entity {
            Entity::Snake(snake) => Some(snake),
            _ => None,
        })
    }

    pub fn snake_mut(&mut self) -> Option<&mut Snake> {
        self.slots.iter_mut().filter(|slot| !slot.flagged).find_map(|slot| match &mut slot.entity {
            Entity::Snake(snake) => Some(snake),
            _ => None,
        })
    }

    /// The active food, if any. Food already eaten this frame is skipped.
    pub fn food(&self) -> Option<(EntityId, &Food)> {
        self.active().find_map(|slot| match &slot.entity {
            Entity::Food(food) => Some((slot.id, food)),
            _ => None,
        })
    }

    fn active(&self) -> impl Iterator<Item = &Slot> {
        self.slots.iter().filter(|slot| !slot.flagged)
    }
}
