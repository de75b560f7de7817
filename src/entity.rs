//! Typed handles and the containers indexed by them.
//!
//! Blocks, instructions, arguments and functions are named by small
//! copyable handles. Analysis results are tables keyed by handle, so
//! they can outlive any borrow of the function they describe.

use std::fmt::Debug;
use std::hash::Hash;
use std::iter::FromIterator;
use std::marker::PhantomData;
use std::ops::{Index, IndexMut};

pub trait EntityRef: Clone + Copy + PartialEq + Eq + PartialOrd + Ord + Hash {
    fn new(value: usize) -> Self;
    fn index(self) -> usize;
    fn invalid() -> Self;
    fn is_valid(self) -> bool {
        self != Self::invalid()
    }
}

/// The first `count` handles of a kind, in index order.
pub fn entities<Idx: EntityRef>(count: usize) -> impl Iterator<Item = Idx> + Clone {
    (0..count).map(Idx::new)
}

/// Declares a handle type printed as `prefix` followed by its index.
#[macro_export]
macro_rules! declare_entity {
    ($name:tt, $prefix:tt) => {
        #[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
        pub struct $name(u32);

        impl $crate::entity::EntityRef for $name {
            fn new(value: usize) -> Self {
                // u32::MAX is reserved for `invalid()`.
                assert!(value < u32::MAX as usize, "{} index overflow", $prefix);
                Self(value as u32)
            }
            fn index(self) -> usize {
                self.0 as usize
            }
            fn invalid() -> Self {
                Self(u32::MAX)
            }
        }

        impl std::default::Default for $name {
            fn default() -> Self {
                <Self as $crate::entity::EntityRef>::invalid()
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
                if <Self as $crate::entity::EntityRef>::is_valid(*self) {
                    write!(f, "{}{}", $prefix, self.0)
                } else {
                    write!(f, "{}?", $prefix)
                }
            }
        }

        impl std::fmt::Debug for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
                std::fmt::Display::fmt(self, f)
            }
        }
    };
}

/// A dense table with one slot per handle, allocated in order by
/// `push`.
#[derive(Clone, Debug)]
pub struct EntityVec<Idx: EntityRef, T: Clone + Debug> {
    items: Vec<T>,
    _idx: PhantomData<Idx>,
}

impl<Idx: EntityRef, T: Clone + Debug> Default for EntityVec<Idx, T> {
    fn default() -> Self {
        Self::from(vec![])
    }
}

impl<Idx: EntityRef, T: Clone + Debug> From<Vec<T>> for EntityVec<Idx, T> {
    fn from(items: Vec<T>) -> Self {
        Self {
            items,
            _idx: PhantomData,
        }
    }
}

impl<Idx: EntityRef, T: Clone + Debug> FromIterator<T> for EntityVec<Idx, T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Self::from(iter.into_iter().collect::<Vec<_>>())
    }
}

impl<Idx: EntityRef, T: Clone + Debug> EntityVec<Idx, T> {
    /// One slot per handle in `0..len`, each a clone of `value`.
    pub fn filled(len: usize, value: T) -> Self {
        Self::from(vec![value; len])
    }

    pub fn push(&mut self, t: T) -> Idx {
        let idx = Idx::new(self.items.len());
        self.items.push(t);
        idx
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = Idx> {
        entities(self.items.len())
    }

    pub fn values(&self) -> impl Iterator<Item = &T> {
        self.items.iter()
    }

    pub fn values_mut(&mut self) -> impl Iterator<Item = &mut T> {
        self.items.iter_mut()
    }

    pub fn entries(&self) -> impl Iterator<Item = (Idx, &T)> {
        self.items
            .iter()
            .enumerate()
            .map(|(index, t)| (Idx::new(index), t))
    }

    pub fn get(&self, idx: Idx) -> Option<&T> {
        self.items.get(idx.index())
    }

    pub fn get_mut(&mut self, idx: Idx) -> Option<&mut T> {
        self.items.get_mut(idx.index())
    }
}

impl<Idx: EntityRef, T: Clone + Debug> Index<Idx> for EntityVec<Idx, T> {
    type Output = T;
    fn index(&self, idx: Idx) -> &T {
        &self.items[idx.index()]
    }
}

impl<Idx: EntityRef, T: Clone + Debug> IndexMut<Idx> for EntityVec<Idx, T> {
    fn index_mut(&mut self, idx: Idx) -> &mut T {
        &mut self.items[idx.index()]
    }
}

/// A side table that reads as `T::default()` for every handle never
/// written, and grows on write.
#[derive(Clone, Debug, Default)]
pub struct PerEntity<Idx: EntityRef, T: Clone + Debug + Default> {
    items: Vec<T>,
    default: T,
    _idx: PhantomData<Idx>,
}

impl<Idx: EntityRef, T: Clone + Debug + Default> Index<Idx> for PerEntity<Idx, T> {
    type Output = T;
    fn index(&self, idx: Idx) -> &T {
        self.items.get(idx.index()).unwrap_or(&self.default)
    }
}

impl<Idx: EntityRef, T: Clone + Debug + Default> IndexMut<Idx> for PerEntity<Idx, T> {
    fn index_mut(&mut self, idx: Idx) -> &mut T {
        if idx.index() >= self.items.len() {
            self.items.resize(idx.index() + 1, T::default());
        }
        &mut self.items[idx.index()]
    }
}
