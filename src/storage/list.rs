//! Intrusive List Module
//!
//! Doubly linked list threaded through the nodes of an [`Arena`].

use crate::storage::node::{Arena, NodeId};

// == Intrusive List ==
/// Tracks an ordered sequence of arena nodes.
///
/// The list never allocates or frees nodes, it only relinks them. Every
/// operation is O(1) given the node handle; callers must only pass handles
/// of nodes that are linked into this list (or, for `push_front`, into none).
#[derive(Debug, Default, Clone)]
pub struct IntrusiveList {
    head: Option<NodeId>,
    tail: Option<NodeId>,
    len: usize,
}

impl IntrusiveList {
    // == Constructor ==
    /// Creates an empty list.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of linked nodes.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Most recently pushed node.
    #[cfg(test)]
    pub fn front(&self) -> Option<NodeId> {
        self.head
    }

    /// Least recently pushed node.
    pub fn back(&self) -> Option<NodeId> {
        self.tail
    }

    // == Push Front ==
    /// Links a detached node at the front.
    pub fn push_front<V>(&mut self, arena: &mut Arena<V>, id: NodeId) {
        let old_head = self.head;
        {
            let node = &mut arena[id];
            node.prev = None;
            node.next = old_head;
        }

        match old_head {
            Some(head) => arena[head].prev = Some(id),
            None => self.tail = Some(id),
        }
        self.head = Some(id);
        self.len += 1;
    }

    // == Pop Front ==
    /// Unlinks and returns the front node.
    pub fn pop_front<V>(&mut self, arena: &mut Arena<V>) -> Option<NodeId> {
        let id = self.head?;
        self.remove(arena, id);
        Some(id)
    }

    // == Remove ==
    /// Unlinks `id` from anywhere in the list, leaving it detached.
    pub fn remove<V>(&mut self, arena: &mut Arena<V>, id: NodeId) {
        let (prev, next) = {
            let node = &mut arena[id];
            (node.prev.take(), node.next.take())
        };

        match prev {
            Some(prev) => arena[prev].next = next,
            None => self.head = next,
        }
        match next {
            Some(next) => arena[next].prev = prev,
            None => self.tail = prev,
        }
        self.len -= 1;
    }

    // == Move To Front ==
    /// Relinks `id` at the front.
    pub fn move_to_front<V>(&mut self, arena: &mut Arena<V>, id: NodeId) {
        if self.head == Some(id) {
            return;
        }
        self.remove(arena, id);
        self.push_front(arena, id);
    }

    /// Iterates node handles front to back.
    pub fn iter<'a, V>(&self, arena: &'a Arena<V>) -> Iter<'a, V> {
        Iter {
            arena,
            cursor: self.head,
        }
    }
}

/// Front-to-back iterator over an [`IntrusiveList`].
pub struct Iter<'a, V> {
    arena: &'a Arena<V>,
    cursor: Option<NodeId>,
}

impl<V> Iterator for Iter<'_, V> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let id = self.cursor?;
        self.cursor = self.arena[id].next;
        Some(id)
    }
}
