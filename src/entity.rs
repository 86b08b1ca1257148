//! Live-cell records and the arena that owns them.
//!
//! Grids and linked indexes never hold entities directly; they hold
//! [`EntityId`] handles into an [`Entities`] arena. Handles carry a generation
//! so a handle to a freed slot is detected instead of aliasing whatever
//! entity reuses the slot.

use std::sync::atomic::{AtomicU32, Ordering};

use crate::point::Point;

/// Default dot fill (#adb5bd).
pub const DOT_COLOR: [u8; 4] = [0xAD, 0xB5, 0xBD, 255];

static NEXT_TAG: AtomicU32 = AtomicU32::new(1);

#[inline]
pub(crate) fn next_tag() -> u32 {
    NEXT_TAG.fetch_add(1, Ordering::Relaxed)
}

/// Identity of a grid, stored on entities it owns.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct GridId(pub(crate) u32);

/// Identity of a linked index, stored on entities it threads.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ListId(pub(crate) u32);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityId {
    slot: u32,
    generation: u32,
}

impl EntityId {
    pub fn slot(self) -> usize {
        self.slot as usize
    }
}

/// Intrusive link fields. Only `LinkedIndex` writes these.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub(crate) struct Links {
    pub(crate) prev: Option<EntityId>,
    pub(crate) next: Option<EntityId>,
    pub(crate) list: Option<ListId>,
}

/// A live cell ("dot").
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Entity {
    position: Point,
    owner: Option<GridId>,
    pub(crate) links: Links,
    /// Visual tag for the drawing layer (RGBA).
    pub color: [u8; 4],
}

impl Entity {
    pub fn new() -> Self {
        Self::at(Point::default())
    }

    /// A detached entity that records `position` but belongs to no grid yet.
    pub fn at(position: Point) -> Self {
        Self {
            position,
            owner: None,
            links: Links::default(),
            color: DOT_COLOR,
        }
    }

    pub fn with_color(mut self, color: [u8; 4]) -> Self {
        self.color = color;
        self
    }

    pub fn position(&self) -> Point {
        self.position
    }

    pub fn owner(&self) -> Option<GridId> {
        self.owner
    }

    pub fn list(&self) -> Option<ListId> {
        self.links.list
    }

    pub fn prev(&self) -> Option<EntityId> {
        self.links.prev
    }

    pub fn next(&self) -> Option<EntityId> {
        self.links.next
    }

    pub(crate) fn set_position(&mut self, p: Point) {
        self.position = p;
    }

    pub(crate) fn set_owner(&mut self, owner: Option<GridId>) {
        self.owner = owner;
    }
}

impl Default for Entity {
    fn default() -> Self {
        Self::new()
    }
}

struct Slot {
    generation: u32,
    entity: Option<Entity>,
}

/// Slot arena with generational handles and a free list.
#[derive(Default)]
pub struct Entities {
    slots: Vec<Slot>,
    free: Vec<u32>,
    len: usize,
}

impl Entities {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn insert(&mut self, entity: Entity) -> EntityId {
        self.len += 1;
        if let Some(slot) = self.free.pop() {
            let s = &mut self.slots[slot as usize];
            s.entity = Some(entity);
            return EntityId {
                slot,
                generation: s.generation,
            };
        }
        let slot = self.slots.len() as u32;
        self.slots.push(Slot {
            generation: 0,
            entity: Some(entity),
        });
        EntityId { slot, generation: 0 }
    }

    #[inline]
    pub fn get(&self, id: EntityId) -> Option<&Entity> {
        self.slots
            .get(id.slot as usize)
            .filter(|s| s.generation == id.generation)
            .and_then(|s| s.entity.as_ref())
    }

    #[inline]
    pub fn get_mut(&mut self, id: EntityId) -> Option<&mut Entity> {
        self.slots
            .get_mut(id.slot as usize)
            .filter(|s| s.generation == id.generation)
            .and_then(|s| s.entity.as_mut())
    }

    pub fn contains(&self, id: EntityId) -> bool {
        self.get(id).is_some()
    }

    /// Free the entity once nothing references it: it must be off every grid
    /// and out of every list. Returns true if the slot was freed.
    pub fn release(&mut self, id: EntityId) -> bool {
        let Some(entity) = self.get(id) else {
            return false;
        };
        if entity.owner.is_some() || entity.links.list.is_some() {
            return false;
        }
        self.free_slot(id.slot);
        true
    }

    /// Drop every entity. Outstanding handles become stale.
    pub fn clear(&mut self) {
        for slot in 0..self.slots.len() as u32 {
            if self.slots[slot as usize].entity.is_some() {
                self.free_slot(slot);
            }
        }
        debug_assert_eq!(self.len, 0);
    }

    fn free_slot(&mut self, slot: u32) {
        let s = &mut self.slots[slot as usize];
        s.entity = None;
        s.generation = s.generation.wrapping_add(1);
        self.free.push(slot);
        self.len -= 1;
    }
}
