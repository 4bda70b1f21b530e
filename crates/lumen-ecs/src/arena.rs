use std::fmt;

/// A generational slot index. The generation is bumped every time the slot is freed, so
/// handles to a previous occupant never resolve again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub(crate) struct Index {
    pub(crate) index: u32,
    pub(crate) generation: u32,
}

impl fmt::Display for Index {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}v{}", self.index, self.generation)
    }
}

struct Slot<T> {
    generation: u32,
    value: Option<T>,
}

/// Dense storage addressed by generation-checked indices, recycling freed slots.
pub(crate) struct Arena<T> {
    slots: Vec<Slot<T>>,
    free_list: Vec<u32>,
    len: usize,
}

impl<T> Arena<T> {
    pub fn new() -> Self {
        Self {
            slots: Vec::new(),
            free_list: Vec::new(),
            len: 0,
        }
    }

    /// Store a value, reusing a freed slot if available.
    pub fn insert(&mut self, value: T) -> Index {
        self.len += 1;
        if let Some(index) = self.free_list.pop() {
            let slot = &mut self.slots[index as usize];
            slot.value = Some(value);
            Index {
                index,
                generation: slot.generation,
            }
        } else {
            let index = self.slots.len() as u32;
            self.slots.push(Slot {
                generation: 0,
                value: Some(value),
            });
            Index {
                index,
                generation: 0,
            }
        }
    }

    /// Free a slot and return its value. Stale or unknown indices return `None`.
    pub fn remove(&mut self, index: Index) -> Option<T> {
        let slot = self.slots.get_mut(index.index as usize)?;
        if slot.generation != index.generation {
            return None;
        }
        let value = slot.value.take()?;
        slot.generation += 1;
        self.free_list.push(index.index);
        self.len -= 1;
        Some(value)
    }

    pub fn get(&self, index: Index) -> Option<&T> {
        self.slots
            .get(index.index as usize)
            .filter(|slot| slot.generation == index.generation)
            .and_then(|slot| slot.value.as_ref())
    }

    pub fn get_mut(&mut self, index: Index) -> Option<&mut T> {
        self.slots
            .get_mut(index.index as usize)
            .filter(|slot| slot.generation == index.generation)
            .and_then(|slot| slot.value.as_mut())
    }

    pub fn contains(&self, index: Index) -> bool {
        self.get(index).is_some()
    }

    /// Number of occupied slots.
    pub fn len(&self) -> usize {
        self.len
    }
}

impl<T> Default for Arena<T> {
    fn default() -> Self {
        Self::new()
    }
}
