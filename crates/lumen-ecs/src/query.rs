//! Lookups over the live entity list.
//!
//! Queries see what the event passes see: entities merged into the live list that are not
//! destroyed. Entities created during the current frame become visible after the next merge.

use crate::entity::{Entity, EntityBehavior, EntityId, EntityKind};
use crate::world::World;

/// Predicate selecting live entities.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityFilter<'a> {
    /// Entities whose tag equals the string
    Tag(&'a str),
    /// Entities created with a given behavior type
    Kind(EntityKind),
}

impl EntityFilter<'_> {
    pub fn of<B: EntityBehavior>() -> Self {
        EntityFilter::Kind(EntityKind::of::<B>())
    }

    fn matches(&self, entity: &Entity) -> bool {
        match self {
            EntityFilter::Tag(tag) => entity.tag() == *tag,
            EntityFilter::Kind(kind) => entity.kind() == Some(*kind),
        }
    }
}

impl World {
    /// Iterate live, non-destroyed entities matching `filter`, in live-list order.
    pub fn query_entities<'w>(
        &'w self,
        filter: EntityFilter<'w>,
    ) -> impl Iterator<Item = EntityId> + 'w {
        self.live_entities().iter().copied().filter(move |&id| {
            self.entity(id)
                .is_some_and(|entity| !entity.is_destroyed() && filter.matches(entity))
        })
    }

    // ---- By tag ----

    pub fn entities_with_tag(&self, tag: &str) -> Vec<EntityId> {
        self.query_entities(EntityFilter::Tag(tag)).collect()
    }

    pub fn count_tagged(&self, tag: &str) -> usize {
        self.query_entities(EntityFilter::Tag(tag)).count()
    }

    pub fn tag_exists(&self, tag: &str) -> bool {
        self.query_entities(EntityFilter::Tag(tag)).next().is_some()
    }

    /// The `n`-th (zero-based) live entity carrying `tag`.
    pub fn find_tagged(&self, tag: &str, n: usize) -> Option<EntityId> {
        self.query_entities(EntityFilter::Tag(tag)).nth(n)
    }

    // ---- By behavior type ----

    pub fn entities_of<B: EntityBehavior>(&self) -> Vec<EntityId> {
        self.query_entities(EntityFilter::of::<B>()).collect()
    }

    pub fn count_of<B: EntityBehavior>(&self) -> usize {
        self.query_entities(EntityFilter::of::<B>()).count()
    }

    pub fn exists_of<B: EntityBehavior>(&self) -> bool {
        self.query_entities(EntityFilter::of::<B>()).next().is_some()
    }

    /// The `n`-th (zero-based) live entity created with behavior `B`.
    pub fn find_of<B: EntityBehavior>(&self, n: usize) -> Option<EntityId> {
        self.query_entities(EntityFilter::of::<B>()).nth(n)
    }
}
