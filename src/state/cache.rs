use std::collections::HashMap;
use std::hash::Hash;

use crate::models::{MediaItem, MovieId, Review, ReviewId};

/// An entity with a stable server-assigned identifier
pub trait Entity: Clone {
    type Id: Copy + Eq + Hash + std::fmt::Debug;

    fn entity_id(&self) -> Self::Id;
}

impl Entity for MediaItem {
    type Id = MovieId;

    fn entity_id(&self) -> MovieId {
        self.id
    }
}

impl Entity for Review {
    type Id = ReviewId;

    fn entity_id(&self) -> ReviewId {
        self.id
    }
}

/// Per-view snapshot of server entities keyed by id
///
/// Each view owns its own instance. Writes are last-write-wins with no merge,
/// and iteration follows the order of the latest `put_all` followed by any
/// entities first seen through `put`.
#[derive(Debug, Clone)]
pub struct EntityCache<E: Entity> {
    entries: HashMap<E::Id, E>,
    order: Vec<E::Id>,
}

impl<E: Entity> Default for EntityCache<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: Entity> EntityCache<E> {
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
            order: Vec::new(),
        }
    }

    pub fn get(&self, id: &E::Id) -> Option<&E> {
        self.entries.get(id)
    }

    pub fn contains(&self, id: &E::Id) -> bool {
        self.entries.contains_key(id)
    }

    /// Stores `entity`, overwriting whatever was cached under its id
    pub fn put(&mut self, entity: E) {
        let id = entity.entity_id();
        if self.entries.insert(id, entity).is_none() {
            self.order.push(id);
        }
    }

    /// Replaces the whole snapshot with `entities`
    ///
    /// Entries missing from the new list are dropped. A duplicate id keeps its
    /// first position and its last value.
    pub fn put_all(&mut self, entities: impl IntoIterator<Item = E>) {
        self.entries.clear();
        self.order.clear();
        for entity in entities {
            self.put(entity);
        }
    }

    pub fn remove(&mut self, id: &E::Id) -> Option<E> {
        let removed = self.entries.remove(id);
        if removed.is_some() {
            self.order.retain(|existing| existing != id);
        }
        removed
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.order.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Cached entities in display order
    pub fn values(&self) -> impl Iterator<Item = &E> {
        self.order.iter().filter_map(|id| self.entries.get(id))
    }

    pub fn ids(&self) -> &[E::Id] {
        &self.order
    }
}
