//! Ordering strategies backing a [`ConcurrentCollection`](super::ConcurrentCollection).

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Storage plus ordering rule for a concurrent collection.
///
/// Implementations are plain single-threaded containers; the wrapper supplies
/// the locking.
pub trait Discipline<T>: Send {
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn push(&mut self, item: T);

    /// Remove the next item according to this discipline.
    fn pop(&mut self) -> Option<T>;

    /// The item `pop` would return next.
    fn peek(&self) -> Option<&T>;

    /// Remove the first item (in iteration order) matching `pred`.
    fn remove_first(&mut self, pred: &mut dyn FnMut(&T) -> bool) -> Option<T>;

    /// Visit items in iteration order without removing them.
    fn for_each(&self, f: &mut dyn FnMut(&T));
}

/// First in, first out.
#[derive(Debug)]
pub struct Fifo<T>(VecDeque<T>);

impl<T> Default for Fifo<T> {
    fn default() -> Self {
        Self(VecDeque::new())
    }
}

impl<T: Send> Discipline<T> for Fifo<T> {
    fn len(&self) -> usize {
        self.0.len()
    }

    fn push(&mut self, item: T) {
        self.0.push_back(item);
    }

    fn pop(&mut self) -> Option<T> {
        self.0.pop_front()
    }

    fn peek(&self) -> Option<&T> {
        self.0.front()
    }

    fn remove_first(&mut self, pred: &mut dyn FnMut(&T) -> bool) -> Option<T> {
        let idx = self.0.iter().position(|item| pred(item))?;
        self.0.remove(idx)
    }

    fn for_each(&self, f: &mut dyn FnMut(&T)) {
        self.0.iter().for_each(f);
    }
}

/// Last in, first out. Iteration runs from the top of the stack down.
#[derive(Debug)]
pub struct Lifo<T>(Vec<T>);

impl<T> Default for Lifo<T> {
    fn default() -> Self {
        Self(Vec::new())
    }
}

impl<T: Send> Discipline<T> for Lifo<T> {
    fn len(&self) -> usize {
        self.0.len()
    }

    fn push(&mut self, item: T) {
        self.0.push(item);
    }

    fn pop(&mut self) -> Option<T> {
        self.0.pop()
    }

    fn peek(&self) -> Option<&T> {
        self.0.last()
    }

    fn remove_first(&mut self, pred: &mut dyn FnMut(&T) -> bool) -> Option<T> {
        let idx = self.0.iter().rposition(|item| pred(item))?;
        Some(self.0.remove(idx))
    }

    fn for_each(&self, f: &mut dyn FnMut(&T)) {
        self.0.iter().rev().for_each(f);
    }
}

/// Bag semantics: no ordering promise. `pop` takes the first slot and moves the
/// last item into it, so removal is O(1).
#[derive(Debug)]
pub struct Unordered<T>(Vec<T>);

impl<T> Default for Unordered<T> {
    fn default() -> Self {
        Self(Vec::new())
    }
}

impl<T: Send> Discipline<T> for Unordered<T> {
    fn len(&self) -> usize {
        self.0.len()
    }

    fn push(&mut self, item: T) {
        self.0.push(item);
    }

    fn pop(&mut self) -> Option<T> {
        if self.0.is_empty() {
            return None;
        }
        Some(self.0.swap_remove(0))
    }

    fn peek(&self) -> Option<&T> {
        self.0.first()
    }

    fn remove_first(&mut self, pred: &mut dyn FnMut(&T) -> bool) -> Option<T> {
        let idx = self.0.iter().position(|item| pred(item))?;
        Some(self.0.swap_remove(idx))
    }

    fn for_each(&self, f: &mut dyn FnMut(&T)) {
        self.0.iter().for_each(f);
    }
}

/// Configurable choice of discipline (`queue_order` in config.toml).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueueOrder {
    #[default]
    Fifo,
    Lifo,
    Unordered,
}

impl QueueOrder {
    /// Build an empty discipline of this kind.
    pub fn discipline<T: Send + 'static>(self) -> Box<dyn Discipline<T>> {
        match self {
            QueueOrder::Fifo => Box::new(Fifo::default()),
            QueueOrder::Lifo => Box::new(Lifo::default()),
            QueueOrder::Unordered => Box::new(Unordered::default()),
        }
    }
}
