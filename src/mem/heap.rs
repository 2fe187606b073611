//! This module contains the heap of a state.

use crate::{
    constant::FIRST_HEAP_ADDRESS,
    error::memory::{Error, Result},
    mem::objekt::Objekt,
    val::Address,
};

/// A mapping from addresses to objects.
///
/// Addresses are handed out in increasing order and never reused, so the
/// address order of the heap is also its insertion order. The map is
/// persistent: cloning a heap is cheap, and writes after a clone copy only
/// the touched entries.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Heap {
    objects: im::OrdMap<Address, Objekt>,
    next:    u64,
}

impl Heap {
    #[must_use]
    pub fn new() -> Self {
        Self {
            objects: im::OrdMap::new(),
            next:    FIRST_HEAP_ADDRESS,
        }
    }

    /// Stores `objekt` at a fresh address and returns that address.
    pub fn allocate(&mut self, objekt: impl Into<Objekt>) -> Address {
        let address = Address(self.next);
        self.next += 1;
        self.objects.insert(address, objekt.into());
        address
    }

    /// Stores `objekt` at `address`, which must have been handed out by a
    /// heap this one is a copy of.
    pub(crate) fn insert_at(&mut self, address: Address, objekt: Objekt) {
        self.next = self.next.max(address.0 + 1);
        self.objects.insert(address, objekt);
    }

    /// Gets the object at `address`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NoSuchObject`] if there is no object at `address`.
    pub fn get(&self, address: Address) -> Result<&Objekt> {
        self.objects
            .get(&address)
            .ok_or(Error::NoSuchObject { address: address.0 })
    }

    /// Gets the object at `address` for writing.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NoSuchObject`] if there is no object at `address`.
    pub fn get_mut(&mut self, address: Address) -> Result<&mut Objekt> {
        self.objects
            .get_mut(&address)
            .ok_or(Error::NoSuchObject { address: address.0 })
    }

    /// Iterates over the objects in address order.
    pub fn iter(&self) -> impl Iterator<Item = (Address, &Objekt)> {
        self.objects.iter().map(|(address, objekt)| (*address, objekt))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// Gets the address the next allocation will use.
    #[must_use]
    pub fn next_address(&self) -> Address {
        Address(self.next)
    }
}

impl Default for Heap {
    fn default() -> Self {
        Self::new()
    }
}
