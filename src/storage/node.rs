//! Node Module
//!
//! Defines the reusable slot shared by the live and free lists, and the arena
//! that owns every slot.

use std::ops::{Index, IndexMut};
use std::sync::Arc;

use chrono::Utc;

/// Stable handle to a slot in the [`Arena`].
pub type NodeId = usize;

// == Node ==
/// A slot representing at most one live entry.
///
/// An idle node (sitting in the free list or just evicted) has an empty key
/// and no value.
#[derive(Debug)]
pub struct Node<V> {
    /// Key of the represented entry
    pub key: String,
    /// Shared handle to the stored value
    pub value: Option<Arc<V>>,
    /// Absolute expiration timestamp (Unix seconds)
    pub expiration: i64,
    pub(crate) prev: Option<NodeId>,
    pub(crate) next: Option<NodeId>,
}

impl<V> Node<V> {
    // == Constructor ==
    /// Creates an idle node.
    pub fn new() -> Self {
        Self {
            key: String::new(),
            value: None,
            expiration: 0,
            prev: None,
            next: None,
        }
    }

    // == Fill ==
    /// Makes the node represent `key`.
    ///
    /// The key buffer is reused, so a recycled node does not reallocate for
    /// keys that fit its previous capacity.
    pub fn fill(&mut self, key: &str, value: Arc<V>, expiration: i64) {
        self.key.clear();
        self.key.push_str(key);
        self.value = Some(value);
        self.expiration = expiration;
    }

    // == Clear ==
    /// Releases the value and blanks the key.
    pub fn clear(&mut self) {
        self.key.clear();
        self.value = None;
        self.expiration = 0;
    }

    /// Returns true when the node does not represent an entry.
    #[cfg(test)]
    pub fn is_idle(&self) -> bool {
        self.value.is_none()
    }

    // == Is Expired ==
    /// Checks the node against `now` (Unix seconds).
    ///
    /// Boundary condition: the entry is still valid during the second equal to
    /// its expiration and expires strictly after it.
    pub fn is_expired(&self, now: i64) -> bool {
        now > self.expiration
    }
}

impl<V> Default for Node<V> {
    fn default() -> Self {
        Self::new()
    }
}

// == Arena ==
/// Owns every node; lists and the index refer to nodes by [`NodeId`].
///
/// Discarding a node drops its storage and leaves a vacant slot that the next
/// allocation takes. Vacant slots at the tail are released by [`Arena::compact`];
/// interior holes only go away when the owner rebuilds the arena with
/// [`Arena::take`] and [`Arena::insert`].
#[derive(Debug)]
pub struct Arena<V> {
    slots: Vec<Option<Node<V>>>,
    vacant: Vec<NodeId>,
}

impl<V> Arena<V> {
    pub fn new() -> Self {
        Self::with_capacity(0)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            slots: Vec::with_capacity(capacity),
            vacant: Vec::new(),
        }
    }

    // == Allocate ==
    /// Creates an idle node and returns its handle.
    pub fn allocate(&mut self) -> NodeId {
        self.insert(Node::new())
    }

    // == Discard ==
    /// Drops the node behind `id`. The handle must not be linked in any list.
    pub fn discard(&mut self, id: NodeId) {
        if let Some(slot) = self.slots.get_mut(id) {
            if slot.take().is_some() {
                self.vacant.push(id);
            }
        }
    }

    // == Take ==
    /// Moves the node behind `id` out of the arena, leaving its slot vacant.
    ///
    /// Links are kept as they were; the caller relinks the node wherever it
    /// inserts it next.
    pub fn take(&mut self, id: NodeId) -> Option<Node<V>> {
        let node = self.slots.get_mut(id)?.take()?;
        self.vacant.push(id);
        Some(node)
    }

    // == Insert ==
    /// Stores an existing node, in a vacant slot if there is one, and returns its handle.
    pub fn insert(&mut self, node: Node<V>) -> NodeId {
        if let Some(id) = self.vacant.pop() {
            self.slots[id] = Some(node);
            return id;
        }
        self.slots.push(Some(node));
        self.slots.len() - 1
    }

    // == Compact ==
    /// Releases vacant slots at the end of the arena.
    ///
    /// Returns the number of slots released.
    pub fn compact(&mut self) -> usize {
        let before = self.slots.len();
        while matches!(self.slots.last(), Some(None)) {
            self.slots.pop();
        }

        let released = before - self.slots.len();
        if released > 0 {
            let len = self.slots.len();
            self.vacant.retain(|&id| id < len);
            if self.slots.capacity() > 2 * len {
                self.slots.shrink_to_fit();
            }
        }
        released
    }

    /// Number of nodes currently allocated.
    pub fn allocated(&self) -> usize {
        self.slots.len() - self.vacant.len()
    }

    /// Length of the backing storage, vacant slots included.
    pub fn slot_count(&self) -> usize {
        self.slots.len()
    }

    /// Returns the node behind `id`, if it is allocated.
    #[cfg(test)]
    pub fn get(&self, id: NodeId) -> Option<&Node<V>> {
        self.slots.get(id).and_then(Option::as_ref)
    }
}

impl<V> Default for Arena<V> {
    fn default() -> Self {
        Self::new()
    }
}

/// # Panics
/// Panics if `id` does not refer to an allocated node.
impl<V> Index<NodeId> for Arena<V> {
    type Output = Node<V>;

    fn index(&self, id: NodeId) -> &Node<V> {
        match self.slots.get(id) {
            Some(Some(node)) => node,
            _ => panic!("node {id} is not allocated"),
        }
    }
}

impl<V> IndexMut<NodeId> for Arena<V> {
    fn index_mut(&mut self, id: NodeId) -> &mut Node<V> {
        match self.slots.get_mut(id) {
            Some(Some(node)) => node,
            _ => panic!("node {id} is not allocated"),
        }
    }
}

// == Utility Functions ==
/// Returns current Unix timestamp in seconds.
pub fn current_timestamp() -> i64 {
    Utc::now().timestamp()
}
