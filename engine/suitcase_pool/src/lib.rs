//! Bounded object pools.
//!
//! A [`Pool`] is a fixed-capacity arena: storage for every element is
//! reserved when the pool is created, elements are addressed by [`Slot`]
//! indices handed out in allocation order, and the only way to give space
//! back is [`Pool::reset`], which reclaims every slot at once.
//!
//! Running out of slots is an ordinary, recoverable condition
//! ([`PoolError::Exhausted`]); a failed allocation never disturbs the
//! elements already in the pool.
//!
//! # Usage
//!
//! ```
//! use suitcase_pool::{Pool, PoolError};
//!
//! let mut pool = Pool::with_capacity(2).unwrap();
//! let a = pool.alloc("a").unwrap();
//! let _b = pool.alloc("b").unwrap();
//! assert_eq!(pool.alloc("c"), Err(PoolError::Exhausted { capacity: 2 }));
//! assert_eq!(pool[a], "a");
//! ```

use std::fmt;
use std::ops::{Index, IndexMut};

/// Index of an element inside a [`Pool`].
///
/// Slots are dense: the n-th successful allocation since the last reset
/// gets index n.
#[derive(Copy, Clone, Eq, PartialEq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct Slot(u32);

impl Slot {
    /// Create a slot from a raw index.
    #[inline]
    pub const fn new(index: u32) -> Self {
        Slot(index)
    }

    /// Index into the pool's storage.
    #[inline]
    pub const fn index(self) -> usize {
        self.0 as usize
    }

    /// Raw `u32` value.
    #[inline]
    pub const fn raw(self) -> u32 {
        self.0
    }
}

impl fmt::Debug for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Slot({})", self.0)
    }
}

/// Errors produced by pool operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PoolError {
    /// Every slot is in use.
    #[error("pool exhausted: all {capacity} slots are in use")]
    Exhausted { capacity: usize },
    /// Backing storage for the pool could not be reserved.
    #[error("could not reserve storage for {capacity} pool slots")]
    Reserve { capacity: usize },
    /// Requested capacity does not fit the `u32` slot space.
    #[error("pool capacity {capacity} exceeds the slot index range")]
    TooLarge { capacity: usize },
}

/// Fixed-capacity arena with bulk reset.
pub struct Pool<T> {
    items: Vec<T>,
    capacity: usize,
}

impl<T> Pool<T> {
    /// Create a pool holding at most `capacity` elements.
    ///
    /// All storage is reserved here so that later allocations never touch
    /// the global allocator.
    pub fn with_capacity(capacity: usize) -> Result<Self, PoolError> {
        if u32::try_from(capacity).is_err() {
            return Err(PoolError::TooLarge { capacity });
        }
        let mut items = Vec::new();
        items
            .try_reserve_exact(capacity)
            .map_err(|_| PoolError::Reserve { capacity })?;
        Ok(Pool { items, capacity })
    }

    /// Place `value` in the next free slot.
    pub fn alloc(&mut self, value: T) -> Result<Slot, PoolError> {
        let index = self.items.len();
        if index >= self.capacity {
            return Err(PoolError::Exhausted {
                capacity: self.capacity,
            });
        }
        // `with_capacity` guarantees capacity fits in u32.
        let slot = Slot(u32::try_from(index).map_err(|_| PoolError::TooLarge {
            capacity: self.capacity,
        })?);
        self.items.push(value);
        Ok(slot)
    }

    /// Reclaim every slot. Previously handed-out slots become invalid.
    pub fn reset(&mut self) {
        self.items.clear();
    }

    #[inline]
    pub fn get(&self, slot: Slot) -> Option<&T> {
        self.items.get(slot.index())
    }

    #[inline]
    pub fn get_mut(&mut self, slot: Slot) -> Option<&mut T> {
        self.items.get_mut(slot.index())
    }

    /// Number of slots in use.
    #[inline]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of slots still available.
    #[inline]
    pub fn remaining(&self) -> usize {
        self.capacity - self.items.len()
    }

    #[inline]
    pub fn is_full(&self) -> bool {
        self.items.len() >= self.capacity
    }

    /// Elements in allocation order.
    pub fn iter(&self) -> impl ExactSizeIterator<Item = &T> + '_ {
        self.items.iter()
    }

    /// Elements with their slots, in allocation order.
    pub fn iter_slots(&self) -> impl Iterator<Item = (Slot, &T)> + '_ {
        (0u32..).map(Slot).zip(self.items.iter())
    }

    /// Contiguous view of the elements allocated at or after `from`.
    ///
    /// Returns an empty slice when `from` is past the last element.
    pub fn tail(&self, from: usize) -> &[T] {
        self.items.get(from..).unwrap_or(&[])
    }

    /// Every element, in allocation order.
    pub fn as_slice(&self) -> &[T] {
        &self.items
    }
}

impl<T> Index<Slot> for Pool<T> {
    type Output = T;

    #[inline]
    fn index(&self, slot: Slot) -> &T {
        &self.items[slot.index()]
    }
}

impl<T> IndexMut<Slot> for Pool<T> {
    #[inline]
    fn index_mut(&mut self, slot: Slot) -> &mut T {
        &mut self.items[slot.index()]
    }
}

impl<T: fmt::Debug> fmt::Debug for Pool<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pool")
            .field("len", &self.items.len())
            .field("capacity", &self.capacity)
            .field("items", &self.items)
            .finish()
    }
}
