//! Key Order Module
//!
//! Ordered key lists backing LRU and FIFO eviction.

use std::collections::HashMap;

#[derive(Debug)]
struct Node {
    key: String,
    prev: Option<usize>,
    next: Option<usize>,
}

// == Key Order ==
/// Doubly linked list of keys with a hash index, so that touching, removing
/// and popping the oldest key are all O(1).
///
/// - Front = oldest (least recently touched / first inserted)
/// - Back = newest
///
/// Nodes live in a slab; freed slots are reused on the next insert.
#[derive(Debug, Default)]
pub struct KeyOrder {
    nodes: Vec<Option<Node>>,
    free: Vec<usize>,
    index: HashMap<String, usize>,
    head: Option<usize>,
    tail: Option<usize>,
}

impl KeyOrder {
    // == Constructor ==
    pub fn new() -> Self {
        Self::default()
    }

    // == Touch ==
    /// Moves a key to the back, inserting it if absent.
    pub fn touch(&mut self, key: &str) {
        match self.index.get(key).copied() {
            Some(idx) => {
                if self.tail != Some(idx) {
                    self.unlink(idx);
                    self.link_back(idx);
                }
            }
            None => self.push(key),
        }
    }

    // == Insert ==
    /// Appends a key if absent; an existing key keeps its position.
    pub fn insert(&mut self, key: &str) {
        if !self.index.contains_key(key) {
            self.push(key);
        }
    }

    // == Remove ==
    /// Removes a key. Returns false if it was not tracked.
    pub fn remove(&mut self, key: &str) -> bool {
        match self.index.remove(key) {
            Some(idx) => {
                self.unlink(idx);
                self.nodes[idx] = None;
                self.free.push(idx);
                true
            }
            None => false,
        }
    }

    // == Peek Oldest ==
    pub fn peek_oldest(&self) -> Option<&str> {
        self.head
            .and_then(|idx| self.nodes[idx].as_ref())
            .map(|node| node.key.as_str())
    }

    // == Pop Oldest ==
    /// Returns and removes the oldest key.
    pub fn pop_oldest(&mut self) -> Option<String> {
        let key = self.peek_oldest()?.to_string();
        self.remove(&key);
        Some(key)
    }

    /// Iterates keys from oldest to newest.
    pub fn iter(&self) -> impl Iterator<Item = &str> + '_ {
        let mut cursor = self.head;
        std::iter::from_fn(move || {
            let node = self.nodes[cursor?].as_ref()?;
            cursor = node.next;
            Some(node.key.as_str())
        })
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.index.contains_key(key)
    }

    pub fn clear(&mut self) {
        self.nodes.clear();
        self.free.clear();
        self.index.clear();
        self.head = None;
        self.tail = None;
    }

    fn push(&mut self, key: &str) {
        let node = Node {
            key: key.to_string(),
            prev: None,
            next: None,
        };
        let idx = match self.free.pop() {
            Some(idx) => {
                self.nodes[idx] = Some(node);
                idx
            }
            None => {
                self.nodes.push(Some(node));
                self.nodes.len() - 1
            }
        };
        self.index.insert(key.to_string(), idx);
        self.link_back(idx);
    }

    fn unlink(&mut self, idx: usize) {
        let (prev, next) = match self.nodes[idx].as_ref() {
            Some(node) => (node.prev, node.next),
            None => return,
        };

        match prev {
            Some(p) => {
                if let Some(node) = self.nodes[p].as_mut() {
                    node.next = next;
                }
            }
            None => self.head = next,
        }
        match next {
            Some(n) => {
                if let Some(node) = self.nodes[n].as_mut() {
                    node.prev = prev;
                }
            }
            None => self.tail = prev,
        }
    }

    fn link_back(&mut self, idx: usize) {
        let old_tail = self.tail;
        if let Some(node) = self.nodes[idx].as_mut() {
            node.prev = old_tail;
            node.next = None;
        }
        match old_tail {
            Some(t) => {
                if let Some(node) = self.nodes[t].as_mut() {
                    node.next = Some(idx);
                }
            }
            None => self.head = Some(idx),
        }
        self.tail = Some(idx);
    }
}
