//! Registry of the connections the dispatcher is currently watching
//!
//! Every accepted client gets a descriptor that is unique for the lifetime
//! of the process. The set is the single owner of per-connection state, and
//! `add`/`remove` are its only mutators, so a descriptor that has been
//! removed can never be reached by a later broadcast.

use log::{debug, info};
use std::collections::BTreeMap;
use thiserror::Error;

/// Opaque handle for one accepted client connection
pub type Descriptor = u32;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConnectionSetError {
    #[error("connection set is full ({capacity} connections)")]
    Full { capacity: usize },

    #[error("no descriptors left to hand out")]
    Exhausted,
}

/// Watched connections indexed by descriptor
///
/// Iteration is always in ascending descriptor order, which keeps fan-out
/// order deterministic from one message to the next.
#[derive(Debug)]
pub struct ConnectionSet<T> {
    /// Live connections indexed by descriptor
    connections: BTreeMap<Descriptor, T>,
    /// Next descriptor handed out by `add`
    next_descriptor: Descriptor,
    /// Maximum number of connections watched at once
    capacity: usize,
}

impl<T> ConnectionSet<T> {
    /// Creates an empty set that refuses to grow beyond `capacity` members.
    /// Descriptors start at 1 and are never reused.
    pub fn new(capacity: usize) -> Self {
        Self {
            connections: BTreeMap::new(),
            next_descriptor: 1,
            capacity,
        }
    }

    /// Starts watching a new connection
    ///
    /// Returns the descriptor assigned to it, or an error if the set is
    /// already at capacity. A refused connection consumes no descriptor.
    pub fn add(&mut self, connection: T) -> Result<Descriptor, ConnectionSetError> {
        self.add_with(|_| connection)
    }

    /// Like `add`, for connection state that needs to know its own descriptor
    pub fn add_with<F>(&mut self, make: F) -> Result<Descriptor, ConnectionSetError>
    where
        F: FnOnce(Descriptor) -> T,
    {
        if self.connections.len() >= self.capacity {
            return Err(ConnectionSetError::Full {
                capacity: self.capacity,
            });
        }

        let descriptor = self.next_descriptor;
        self.next_descriptor = descriptor
            .checked_add(1)
            .ok_or(ConnectionSetError::Exhausted)?;
        self.connections.insert(descriptor, make(descriptor));
        debug!("Watching socket {} ({} open)", descriptor, self.len());

        Ok(descriptor)
    }

    /// Stops watching a connection and hands its state back to the caller.
    /// Returns None if the descriptor was already gone.
    pub fn remove(&mut self, descriptor: Descriptor) -> Option<T> {
        let removed = self.connections.remove(&descriptor);
        if removed.is_some() {
            info!("Socket {} removed ({} open)", descriptor, self.len());
        }
        removed
    }

    pub fn contains(&self, descriptor: Descriptor) -> bool {
        self.connections.contains_key(&descriptor)
    }

    pub fn get_mut(&mut self, descriptor: Descriptor) -> Option<&mut T> {
        self.connections.get_mut(&descriptor)
    }

    /// All current descriptors in ascending order
    pub fn all(&self) -> impl Iterator<Item = Descriptor> + '_ {
        self.connections.keys().copied()
    }

    /// Mutable access to every member, ascending by descriptor
    pub fn iter_mut(&mut self) -> impl Iterator<Item = (Descriptor, &mut T)> + '_ {
        self.connections
            .iter_mut()
            .map(|(descriptor, connection)| (*descriptor, connection))
    }

    /// Largest descriptor currently watched, if any
    pub fn watermark(&self) -> Option<Descriptor> {
        self.connections.keys().next_back().copied()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.connections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }
}
