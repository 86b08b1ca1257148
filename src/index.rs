//! Intrusive doubly linked list over arena entities.
//!
//! The prev/next fields live inside each [`Entity`]; the list only keeps the
//! head, tail and length. Insert at the tail and unlink from anywhere are O(1).

use crate::entity::{Entities, Entity, EntityId, ListId, next_tag};

#[derive(Debug)]
pub struct LinkedIndex {
    id: ListId,
    head: Option<EntityId>,
    tail: Option<EntityId>,
    len: usize,
}

impl Default for LinkedIndex {
    fn default() -> Self {
        Self::new()
    }
}

impl LinkedIndex {
    pub fn new() -> Self {
        Self {
            id: ListId(next_tag()),
            head: None,
            tail: None,
            len: 0,
        }
    }

    pub fn id(&self) -> ListId {
        self.id
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn head(&self) -> Option<EntityId> {
        self.head
    }

    pub fn tail(&self) -> Option<EntityId> {
        self.tail
    }

    pub fn contains(&self, arena: &Entities, id: EntityId) -> bool {
        arena.get(id).and_then(Entity::list) == Some(self.id)
    }

    /// Append `id` at the tail. Returns false (and does nothing) if the handle
    /// is stale or the entity already sits in some list.
    pub fn add(&mut self, arena: &mut Entities, id: EntityId) -> bool {
        let prev_tail = self.tail;
        match arena.get_mut(id) {
            Some(e) if e.links.list.is_none() => {
                e.links.list = Some(self.id);
                e.links.prev = prev_tail;
                e.links.next = None;
            }
            _ => return false,
        }

        match prev_tail {
            None => self.head = Some(id),
            Some(t) => {
                if let Some(tail) = arena.get_mut(t) {
                    tail.links.next = Some(id);
                }
            }
        }
        self.tail = Some(id);
        self.len += 1;
        true
    }

    /// Unlink `id`. Stale handles and entities not in this list are a no-op,
    /// so removing twice never corrupts the chain or the length.
    /// The entity is freed afterwards if no grid holds it either.
    pub fn remove(&mut self, arena: &mut Entities, id: EntityId) -> bool {
        let links = match arena.get(id) {
            Some(e) if e.links.list == Some(self.id) => e.links,
            _ => return false,
        };

        match (links.prev, links.next) {
            // sole node
            (None, None) => {
                self.head = None;
                self.tail = None;
            }
            // head
            (None, Some(next)) => {
                self.head = Some(next);
                if let Some(n) = arena.get_mut(next) {
                    n.links.prev = None;
                }
            }
            // tail
            (Some(prev), None) => {
                self.tail = Some(prev);
                if let Some(p) = arena.get_mut(prev) {
                    p.links.next = None;
                }
            }
            (Some(prev), Some(next)) => {
                if let Some(p) = arena.get_mut(prev) {
                    p.links.next = Some(next);
                }
                if let Some(n) = arena.get_mut(next) {
                    n.links.prev = Some(prev);
                }
            }
        }
        self.len -= 1;

        if let Some(e) = arena.get_mut(id) {
            e.links = Default::default();
        }
        arena.release(id);
        true
    }

    /// Walk the chain head to tail, or tail to head when `reverse`.
    /// The arena is borrowed shared, so the chain cannot change mid-walk;
    /// collect [`LinkedIndex::ids`] first to mutate while iterating.
    pub fn for_each(&self, arena: &Entities, mut f: impl FnMut(EntityId, &Entity), reverse: bool) {
        let mut cursor = if reverse { self.tail } else { self.head };
        while let Some(id) = cursor {
            let Some(e) = arena.get(id) else { break };
            f(id, e);
            cursor = if reverse { e.links.prev } else { e.links.next };
        }
    }

    pub fn ids(&self, arena: &Entities, reverse: bool) -> Vec<EntityId> {
        let mut out = Vec::with_capacity(self.len);
        self.for_each(arena, |id, _| out.push(id), reverse);
        out
    }

    /// Unlink everything.
    pub fn reset(&mut self, arena: &mut Entities) {
        for id in self.ids(arena, false) {
            if let Some(e) = arena.get_mut(id) {
                e.links = Default::default();
            }
            arena.release(id);
        }
        self.head = None;
        self.tail = None;
        self.len = 0;
    }
}
