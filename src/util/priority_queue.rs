//! Bounded binary min-heap that keeps the K best elements.
//!
//! The queue is ordered by an injected `less_than` predicate. Its top is the
//! smallest element, so once the queue is full a new element only gets in if
//! it beats the current minimum. Popping yields elements in ascending order.

use std::fmt;

/// Outcome of [`PriorityQueue::insert`].
#[derive(Debug, Clone, PartialEq)]
pub enum InsertResult<T> {
    /// The queue had room; the element was added.
    Added,
    /// The queue was full; the element replaced the old top, which is returned.
    Replaced(T),
    /// The queue was full and the element did not beat the top; it is returned unchanged.
    Dropped(T),
}

fn natural_less_than<T: PartialOrd>(a: &T, b: &T) -> bool {
    a < b
}

/// A capacity-limited binary heap.
///
/// Slot `i` (1-based) has children `2i` and `2i + 1`; the 1-based slot `i` lives
/// at `heap[i - 1]`.
pub struct PriorityQueue<T, F = fn(&T, &T) -> bool>
where
    F: Fn(&T, &T) -> bool,
{
    heap: Vec<T>,
    capacity: usize,
    less_than: F,
}

impl<T: PartialOrd> PriorityQueue<T> {
    /// Create a queue ordered by the natural `<` of `T`.
    pub fn new(capacity: usize) -> Self {
        Self::with_less_than(capacity, natural_less_than::<T> as fn(&T, &T) -> bool)
    }
}

impl<T, F> PriorityQueue<T, F>
where
    F: Fn(&T, &T) -> bool,
{
    /// Create a queue ordered by `less_than`.
    pub fn with_less_than(capacity: usize, less_than: F) -> Self {
        PriorityQueue {
            heap: Vec::with_capacity(capacity.min(4096)),
            capacity,
            less_than,
        }
    }

    /// Maximum number of elements retained.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of elements currently held.
    pub fn len(&self) -> usize {
        self.heap.len()
    }

    /// Whether the queue holds no elements.
    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    /// Whether the queue holds `capacity` elements.
    pub fn is_full(&self) -> bool {
        self.heap.len() >= self.capacity
    }

    /// Insert `item`, keeping only the `capacity` greatest elements.
    pub fn insert(&mut self, item: T) -> InsertResult<T> {
        if self.heap.len() < self.capacity {
            self.heap.push(item);
            self.up_heap();
            return InsertResult::Added;
        }
        match self.heap.first() {
            Some(top) if (self.less_than)(top, &item) => {
                let old = std::mem::replace(&mut self.heap[0], item);
                self.down_heap();
                InsertResult::Replaced(old)
            }
            _ => InsertResult::Dropped(item),
        }
    }

    /// Peek at the least element.
    pub fn top(&self) -> Option<&T> {
        self.heap.first()
    }

    /// Mutable access to the least element. Call [`adjust`](Self::adjust) afterwards.
    pub fn top_mut(&mut self) -> Option<&mut T> {
        self.heap.first_mut()
    }

    /// Remove and return the least element.
    pub fn pop(&mut self) -> Option<T> {
        if self.heap.is_empty() {
            return None;
        }
        let top = self.heap.swap_remove(0);
        if !self.heap.is_empty() {
            self.down_heap();
        }
        Some(top)
    }

    /// Restore heap order after the top element was changed in place.
    pub fn adjust(&mut self) {
        if !self.heap.is_empty() {
            self.down_heap();
        }
    }

    /// Remove every element.
    pub fn clear(&mut self) {
        self.heap.clear();
    }

    /// Iterate the elements in heap order (not sorted).
    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.heap.iter()
    }

    /// Drain the queue into a vector in ascending order.
    pub fn into_sorted_vec(mut self) -> Vec<T> {
        let mut sorted = Vec::with_capacity(self.heap.len());
        while let Some(item) = self.pop() {
            sorted.push(item);
        }
        sorted
    }

    fn up_heap(&mut self) {
        let mut i = self.heap.len();
        let mut parent = i >> 1;
        while parent > 0 && (self.less_than)(&self.heap[i - 1], &self.heap[parent - 1]) {
            self.heap.swap(i - 1, parent - 1);
            i = parent;
            parent = i >> 1;
        }
    }

    fn down_heap(&mut self) {
        let size = self.heap.len();
        let mut i = 1;
        loop {
            let left = i << 1;
            if left > size {
                break;
            }
            let right = left + 1;
            let mut smallest = left;
            if right <= size && (self.less_than)(&self.heap[right - 1], &self.heap[left - 1]) {
                smallest = right;
            }
            if !(self.less_than)(&self.heap[smallest - 1], &self.heap[i - 1]) {
                break;
            }
            self.heap.swap(i - 1, smallest - 1);
            i = smallest;
        }
    }
}

impl<T: Clone, F> Clone for PriorityQueue<T, F>
where
    F: Fn(&T, &T) -> bool + Clone,
{
    fn clone(&self) -> Self {
        PriorityQueue {
            heap: self.heap.clone(),
            capacity: self.capacity,
            less_than: self.less_than.clone(),
        }
    }
}

impl<T: fmt::Debug, F> fmt::Debug for PriorityQueue<T, F>
where
    F: Fn(&T, &T) -> bool,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PriorityQueue")
            .field("capacity", &self.capacity)
            .field("heap", &self.heap)
            .finish()
    }
}
