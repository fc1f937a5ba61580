use std::marker::PhantomData;
use std::ops::{Index, IndexMut};

/// Raw index access shared by every handle type
pub trait ArenaHandle: Copy + Eq {
    fn from_raw(raw: u32) -> Self;
    fn raw(self) -> u32;
}

macro_rules! define_handle {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
        pub struct $name(pub(crate) u32);

        impl $name {
            /// Handle that never refers to a live object
            pub const INVALID: Self = Self(u32::MAX);

            #[inline]
            pub const fn new(index: u32) -> Self {
                Self(index)
            }

            /// Slot index inside the owning arena
            #[inline]
            pub const fn index(self) -> usize {
                self.0 as usize
            }

            #[inline]
            pub const fn is_valid(self) -> bool {
                self.0 != u32::MAX
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::INVALID
            }
        }

        impl ArenaHandle for $name {
            #[inline]
            fn from_raw(raw: u32) -> Self {
                Self(raw)
            }

            #[inline]
            fn raw(self) -> u32 {
                self.0
            }
        }
    };
}

define_handle!(
    /// Identifies a body in a [`World`](crate::World)
    BodyHandle
);
define_handle!(
    /// Identifies a fixture in a [`World`](crate::World)
    FixtureHandle
);
define_handle!(
    /// Identifies a live contact
    ContactHandle
);
define_handle!(
    /// Identifies a joint in a [`World`](crate::World)
    JointHandle
);
define_handle!(
    /// Identifies a controller in a [`World`](crate::World)
    ControllerHandle
);

/// Slot storage with a free list. Removed slots are reused by later
/// insertions, so a handle stays valid until its object is removed.
#[derive(Debug, Clone)]
pub struct Arena<H, T> {
    slots: Vec<Option<T>>,
    free: Vec<u32>,
    len: usize,
    _handle: PhantomData<H>,
}

impl<H: ArenaHandle, T> Default for Arena<H, T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<H: ArenaHandle, T> Arena<H, T> {
    pub fn new() -> Self {
        Self {
            slots: Vec::new(),
            free: Vec::new(),
            len: 0,
            _handle: PhantomData,
        }
    }

    /// Stores `value` and returns its handle
    pub fn insert(&mut self, value: T) -> H {
        self.len += 1;
        if let Some(raw) = self.free.pop() {
            self.slots[raw as usize] = Some(value);
            return H::from_raw(raw);
        }
        let raw = self.slots.len() as u32;
        self.slots.push(Some(value));
        H::from_raw(raw)
    }

    /// Removes and returns the object, or `None` for a stale handle
    pub fn remove(&mut self, handle: H) -> Option<T> {
        let slot = self.slots.get_mut(handle.raw() as usize)?;
        let value = slot.take()?;
        self.free.push(handle.raw());
        self.len -= 1;
        Some(value)
    }

    #[inline]
    pub fn get(&self, handle: H) -> Option<&T> {
        self.slots.get(handle.raw() as usize)?.as_ref()
    }

    #[inline]
    pub fn get_mut(&mut self, handle: H) -> Option<&mut T> {
        self.slots.get_mut(handle.raw() as usize)?.as_mut()
    }

    #[inline]
    pub fn contains(&self, handle: H) -> bool {
        self.get(handle).is_some()
    }

    /// Number of live objects
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Live objects in slot order
    pub fn iter(&self) -> impl Iterator<Item = (H, &T)> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(i, slot)| slot.as_ref().map(|v| (H::from_raw(i as u32), v)))
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (H, &mut T)> {
        self.slots
            .iter_mut()
            .enumerate()
            .filter_map(|(i, slot)| slot.as_mut().map(|v| (H::from_raw(i as u32), v)))
    }

    /// Handles of live objects, collected so the arena can be mutated while
    /// walking them
    pub fn handles(&self) -> Vec<H> {
        self.iter().map(|(h, _)| h).collect()
    }

    /// Mutable access to two distinct objects at once.
    ///
    /// Panics if the handles are equal or stale.
    pub fn pair_mut(&mut self, a: H, b: H) -> (&mut T, &mut T) {
        let (ia, ib) = (a.raw() as usize, b.raw() as usize);
        assert_ne!(ia, ib, "pair_mut requires two distinct handles");

        let (lo, hi) = if ia < ib { (ia, ib) } else { (ib, ia) };
        let (left, right) = self.slots.split_at_mut(hi);
        match (left[lo].as_mut(), right[0].as_mut()) {
            (Some(first), Some(second)) => {
                if ia < ib {
                    (first, second)
                } else {
                    (second, first)
                }
            }
            _ => panic!("stale handle passed to pair_mut"),
        }
    }
}

impl<H: ArenaHandle, T> Index<H> for Arena<H, T> {
    type Output = T;

    fn index(&self, handle: H) -> &T {
        match self.get(handle) {
            Some(value) => value,
            None => panic!("stale arena handle {}", handle.raw()),
        }
    }
}

impl<H: ArenaHandle, T> IndexMut<H> for Arena<H, T> {
    fn index_mut(&mut self, handle: H) -> &mut T {
        let raw = handle.raw();
        match self.get_mut(handle) {
            Some(value) => value,
            None => panic!("stale arena handle {}", raw),
        }
    }
}
