//! Pending split queues
//!
//! Encoder and decoder must pop items in the same order, so both build their
//! queue from the same [`Traversal`].

use std::cmp::Ordering;
use std::collections::{BinaryHeap, VecDeque};

use super::policy::Traversal;

pub trait Worklist<T> {
    fn push(&mut self, item: T);

    fn pop(&mut self) -> Option<T>;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Items ordered by [`PriorityWorklist`]
pub trait Weighted {
    fn weight(&self) -> u64;
}

#[derive(Debug, Clone)]
pub struct LifoWorklist<T>(Vec<T>);

impl<T> Default for LifoWorklist<T> {
    fn default() -> Self {
        Self(Vec::new())
    }
}

impl<T> Worklist<T> for LifoWorklist<T> {
    fn push(&mut self, item: T) {
        self.0.push(item);
    }

    fn pop(&mut self) -> Option<T> {
        self.0.pop()
    }

    fn len(&self) -> usize {
        self.0.len()
    }
}

#[derive(Debug, Clone)]
pub struct FifoWorklist<T>(VecDeque<T>);

impl<T> Default for FifoWorklist<T> {
    fn default() -> Self {
        Self(VecDeque::new())
    }
}

impl<T> Worklist<T> for FifoWorklist<T> {
    fn push(&mut self, item: T) {
        self.0.push_back(item);
    }

    fn pop(&mut self) -> Option<T> {
        self.0.pop_front()
    }

    fn len(&self) -> usize {
        self.0.len()
    }
}

#[derive(Debug)]
struct Entry<T> {
    weight: u64,
    seq: u64,
    item: T,
}

impl<T> PartialEq for Entry<T> {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl<T> Eq for Entry<T> {}

impl<T> PartialOrd for Entry<T> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<T> Ord for Entry<T> {
    // Max-heap: heavier first, then earlier pushes.
    fn cmp(&self, other: &Self) -> Ordering {
        self.weight
            .cmp(&other.weight)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

/// Heaviest item first, ties broken by push order
#[derive(Debug)]
pub struct PriorityWorklist<T> {
    heap: BinaryHeap<Entry<T>>,
    next_seq: u64,
}

impl<T> Default for PriorityWorklist<T> {
    fn default() -> Self {
        Self {
            heap: BinaryHeap::new(),
            next_seq: 0,
        }
    }
}

impl<T: Weighted> Worklist<T> for PriorityWorklist<T> {
    fn push(&mut self, item: T) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.heap.push(Entry {
            weight: item.weight(),
            seq,
            item,
        });
    }

    fn pop(&mut self) -> Option<T> {
        self.heap.pop().map(|entry| entry.item)
    }

    fn len(&self) -> usize {
        self.heap.len()
    }
}

/// Worklist picked at run time from a [`Traversal`]
#[derive(Debug)]
pub enum AnyWorklist<T> {
    Lifo(LifoWorklist<T>),
    Fifo(FifoWorklist<T>),
    Priority(PriorityWorklist<T>),
}

impl<T> AnyWorklist<T> {
    pub fn new(traversal: Traversal) -> Self {
        match traversal {
            Traversal::Lifo => Self::Lifo(LifoWorklist::default()),
            Traversal::Fifo => Self::Fifo(FifoWorklist::default()),
            Traversal::PriorityByCount => Self::Priority(PriorityWorklist::default()),
        }
    }
}

impl<T: Weighted> Worklist<T> for AnyWorklist<T> {
    fn push(&mut self, item: T) {
        match self {
            Self::Lifo(w) => w.push(item),
            Self::Fifo(w) => w.push(item),
            Self::Priority(w) => w.push(item),
        }
    }

    fn pop(&mut self) -> Option<T> {
        match self {
            Self::Lifo(w) => w.pop(),
            Self::Fifo(w) => w.pop(),
            Self::Priority(w) => w.pop(),
        }
    }

    fn len(&self) -> usize {
        match self {
            Self::Lifo(w) => w.len(),
            Self::Fifo(w) => w.len(),
            Self::Priority(w) => w.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq)]
    struct Item(u64, char);

    impl Weighted for Item {
        fn weight(&self) -> u64 {
            self.0
        }
    }

    fn drain(traversal: Traversal) -> Vec<char> {
        let mut list = AnyWorklist::new(traversal);
        for item in [Item(3, 'a'), Item(9, 'b'), Item(3, 'c'), Item(9, 'd'), Item(1, 'e')] {
            list.push(item);
        }
        assert_eq!(list.len(), 5);
        let mut order = Vec::new();
        while let Some(Item(_, name)) = list.pop() {
            order.push(name);
        }
        assert!(list.is_empty());
        order
    }

    #[test]
    fn test_lifo_order() {
        assert_eq!(drain(Traversal::Lifo), vec!['e', 'd', 'c', 'b', 'a']);
    }

    #[test]
    fn test_fifo_order() {
        assert_eq!(drain(Traversal::Fifo), vec!['a', 'b', 'c', 'd', 'e']);
    }

    #[test]
    fn test_priority_order_breaks_ties_by_push() {
        assert_eq!(drain(Traversal::PriorityByCount), vec!['b', 'd', 'a', 'c', 'e']);
    }
}
