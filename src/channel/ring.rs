//! Fixed-capacity ring buffer backing a channel.
//!
//! `head == tail` is ambiguous between empty and full, so both states are
//! carried as explicit flags and updated on every push/pop.

use crate::types::{Error, Result};

#[derive(Debug)]
pub(crate) struct RingBuffer<T> {
    slots: Box<[Option<T>]>,
    head: usize,
    tail: usize,
    is_empty: bool,
    is_full: bool,
}

impl<T> RingBuffer<T> {
    /// Allocate `capacity` empty slots. Fails without side effects.
    pub(crate) fn with_capacity(capacity: usize) -> Result<Self> {
        if capacity == 0 {
            return Err(Error::InvalidCapacity(capacity));
        }

        let mut slots = Vec::new();
        slots.try_reserve_exact(capacity).map_err(|e| {
            Error::out_of_memory(format!("cannot allocate {capacity} channel slots: {e}"))
        })?;
        slots.resize_with(capacity, || None);

        Ok(Self {
            slots: slots.into_boxed_slice(),
            head: 0,
            tail: 0,
            is_empty: true,
            is_full: false,
        })
    }

    pub(crate) fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.is_empty
    }

    pub(crate) fn is_full(&self) -> bool {
        self.is_full
    }

    pub(crate) fn len(&self) -> usize {
        if self.is_full {
            self.capacity()
        } else if self.tail >= self.head {
            self.tail - self.head
        } else {
            self.capacity() - self.head + self.tail
        }
    }

    /// Store `item` at the tail. Caller must check `is_full` first.
    pub(crate) fn push(&mut self, item: T) {
        debug_assert!(!self.is_full, "push into a full ring buffer");
        debug_assert!(self.slots[self.tail].is_none());

        self.slots[self.tail] = Some(item);
        self.tail = self.advance(self.tail);
        self.is_full = self.tail == self.head;
        self.is_empty = false;
    }

    /// Take the item at the head, clearing its slot.
    pub(crate) fn pop(&mut self) -> Option<T> {
        if self.is_empty {
            return None;
        }

        let item = self.slots[self.head].take();
        self.head = self.advance(self.head);
        self.is_full = false;
        self.is_empty = self.head == self.tail;
        item
    }

    /// Drop every queued item and reset to the empty state.
    pub(crate) fn clear(&mut self) -> usize {
        let mut dropped = 0;
        while self.pop().is_some() {
            dropped += 1;
        }
        dropped
    }

    fn advance(&self, index: usize) -> usize {
        let next = index + 1;
        if next >= self.slots.len() {
            0
        } else {
            next
        }
    }

    #[cfg(test)]
    pub(crate) fn check_invariants(&self) {
        assert!(self.head < self.capacity());
        assert!(self.tail < self.capacity());
        assert!(!(self.is_empty && self.is_full));
        if self.is_empty || self.is_full {
            assert_eq!(self.head, self.tail);
        } else {
            assert_ne!(self.head, self.tail);
        }
        let occupied = self.slots.iter().filter(|s| s.is_some()).count();
        assert_eq!(occupied, self.len());
    }
}
