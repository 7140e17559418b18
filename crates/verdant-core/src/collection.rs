#![forbid(unsafe_code)]

//! Shared list with content-change notification.
//!
//! [`ObservableCollection<T>`] is a cheaply cloneable handle; clones share
//! one backing list and one `collection_changed` event. Equality is
//! identity: two handles are equal only when they point at the same list,
//! which makes replacing a collection-valued property an observable change
//! even when both lists hold the same items.
//!
//! # Invariants
//!
//! 1. Every mutation that alters the list raises exactly one
//!    [`CollectionChange`].
//! 2. Mutations that leave the list untouched raise nothing.
//! 3. The list borrow is released before handlers run.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use crate::error::{Result, VmError};
use crate::event::{Event, Subscription};

/// What happened to a collection's contents.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollectionChange {
    /// `count` items were inserted starting at `index`.
    Added { index: usize, count: usize },
    /// `count` items were removed starting at `index`.
    Removed { index: usize, count: usize },
    /// The item at `index` was overwritten.
    Replaced { index: usize },
    /// An item moved from `from` to `to`.
    Moved { from: usize, to: usize },
    /// The contents changed wholesale.
    Reset,
}

struct CollectionInner<T> {
    items: RefCell<Vec<T>>,
    changed: Event<CollectionChange>,
}

/// A shared `Vec<T>` that reports content mutations.
pub struct ObservableCollection<T: 'static> {
    inner: Rc<CollectionInner<T>>,
}

impl<T: 'static> Clone for ObservableCollection<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T: 'static> PartialEq for ObservableCollection<T> {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

impl<T: 'static> Eq for ObservableCollection<T> {}

impl<T: fmt::Debug + 'static> fmt::Debug for ObservableCollection<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObservableCollection")
            .field("items", &self.inner.items.borrow())
            .field("subscribers", &self.inner.changed.subscriber_count())
            .finish()
    }
}

impl<T: 'static> Default for ObservableCollection<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: 'static> From<Vec<T>> for ObservableCollection<T> {
    fn from(items: Vec<T>) -> Self {
        Self {
            inner: Rc::new(CollectionInner {
                items: RefCell::new(items),
                changed: Event::new(),
            }),
        }
    }
}

impl<T: 'static> FromIterator<T> for ObservableCollection<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Self::from(iter.into_iter().collect::<Vec<_>>())
    }
}

impl<T: 'static> ObservableCollection<T> {
    #[must_use]
    pub fn new() -> Self {
        Self::from(Vec::new())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.items.borrow().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.items.borrow().is_empty()
    }

    /// Borrow the items for the duration of `f`.
    ///
    /// # Panics
    ///
    /// Panics if `f` mutates this collection (re-entrant borrow).
    pub fn with<R>(&self, f: impl FnOnce(&[T]) -> R) -> R {
        f(&self.inner.items.borrow())
    }

    /// Whether `other` shares this handle's backing list.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    pub fn push(&self, item: T) {
        let index = {
            let mut items = self.inner.items.borrow_mut();
            items.push(item);
            items.len() - 1
        };
        self.notify(CollectionChange::Added { index, count: 1 });
    }

    pub fn insert(&self, index: usize, item: T) -> Result<()> {
        {
            let mut items = self.inner.items.borrow_mut();
            let len = items.len();
            if index > len {
                return Err(VmError::IndexOutOfBounds { index, len });
            }
            items.insert(index, item);
        }
        self.notify(CollectionChange::Added { index, count: 1 });
        Ok(())
    }

    pub fn extend(&self, iter: impl IntoIterator<Item = T>) {
        let (index, count) = {
            let mut items = self.inner.items.borrow_mut();
            let start = items.len();
            items.extend(iter);
            (start, items.len() - start)
        };
        if count > 0 {
            self.notify(CollectionChange::Added { index, count });
        }
    }

    /// Remove the item at `index`; `None` (and no notification) when out of
    /// range.
    pub fn remove(&self, index: usize) -> Option<T> {
        let removed = {
            let mut items = self.inner.items.borrow_mut();
            (index < items.len()).then(|| items.remove(index))
        };
        if removed.is_some() {
            self.notify(CollectionChange::Removed { index, count: 1 });
        }
        removed
    }

    pub fn pop(&self) -> Option<T> {
        let popped = {
            let mut items = self.inner.items.borrow_mut();
            items.pop().map(|item| (items.len(), item))
        };
        popped.map(|(index, item)| {
            self.notify(CollectionChange::Removed { index, count: 1 });
            item
        })
    }

    /// Overwrite the item at `index`, returning the previous one.
    pub fn set(&self, index: usize, item: T) -> Result<T> {
        let previous = {
            let mut items = self.inner.items.borrow_mut();
            let len = items.len();
            let slot = items
                .get_mut(index)
                .ok_or(VmError::IndexOutOfBounds { index, len })?;
            std::mem::replace(slot, item)
        };
        self.notify(CollectionChange::Replaced { index });
        Ok(previous)
    }

    pub fn move_item(&self, from: usize, to: usize) -> Result<()> {
        {
            let mut items = self.inner.items.borrow_mut();
            let len = items.len();
            if from >= len {
                return Err(VmError::IndexOutOfBounds { index: from, len });
            }
            if to >= len {
                return Err(VmError::IndexOutOfBounds { index: to, len });
            }
            if from == to {
                return Ok(());
            }
            let item = items.remove(from);
            items.insert(to, item);
        }
        self.notify(CollectionChange::Moved { from, to });
        Ok(())
    }

    pub fn clear(&self) {
        let had_items = {
            let mut items = self.inner.items.borrow_mut();
            let had = !items.is_empty();
            items.clear();
            had
        };
        if had_items {
            self.notify(CollectionChange::Reset);
        }
    }

    /// Keep only the items matching `keep`. Raises `Reset` if anything was
    /// dropped.
    pub fn retain(&self, keep: impl FnMut(&T) -> bool) {
        let changed = {
            let mut items = self.inner.items.borrow_mut();
            let before = items.len();
            items.retain(keep);
            items.len() != before
        };
        if changed {
            self.notify(CollectionChange::Reset);
        }
    }

    /// Subscribe to content changes.
    #[must_use = "dropping the Subscription unsubscribes immediately"]
    pub fn on_changed(&self, handler: impl Fn(&CollectionChange) + 'static) -> Subscription {
        self.inner.changed.subscribe(handler)
    }

    fn notify(&self, change: CollectionChange) {
        tracing::trace!(message = "collection.changed", ?change);
        self.inner.changed.raise(&change);
    }
}

impl<T: Clone + 'static> ObservableCollection<T> {
    #[must_use]
    pub fn get(&self, index: usize) -> Option<T> {
        self.inner.items.borrow().get(index).cloned()
    }

    #[must_use]
    pub fn to_vec(&self) -> Vec<T> {
        self.inner.items.borrow().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record<T: 'static>(
        collection: &ObservableCollection<T>,
    ) -> (Rc<RefCell<Vec<CollectionChange>>>, Subscription) {
        let log = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&log);
        let sub = collection.on_changed(move |change| sink.borrow_mut().push(*change));
        (log, sub)
    }

    #[test]
    fn push_and_insert_report_positions() {
        let c = ObservableCollection::new();
        let (log, _sub) = record(&c);
        c.push(1);
        c.push(3);
        c.insert(1, 2).expect("insert in range");
        assert_eq!(c.to_vec(), vec![1, 2, 3]);
        assert_eq!(
            *log.borrow(),
            vec![
                CollectionChange::Added { index: 0, count: 1 },
                CollectionChange::Added { index: 1, count: 1 },
                CollectionChange::Added { index: 1, count: 1 },
            ]
        );
    }

    #[test]
    fn insert_out_of_range_is_an_error() {
        let c: ObservableCollection<i32> = ObservableCollection::new();
        let (log, _sub) = record(&c);
        assert_eq!(
            c.insert(2, 1),
            Err(VmError::IndexOutOfBounds { index: 2, len: 0 })
        );
        assert!(log.borrow().is_empty());
    }

    #[test]
    fn no_op_mutations_are_silent() {
        let c: ObservableCollection<i32> = ObservableCollection::new();
        let (log, _sub) = record(&c);
        c.clear();
        assert_eq!(c.remove(0), None);
        assert_eq!(c.pop(), None);
        c.extend(Vec::new());
        c.retain(|_| true);
        assert!(log.borrow().is_empty());
    }

    #[test]
    fn remove_set_move_and_clear() {
        let c: ObservableCollection<i32> = vec![10, 20, 30].into();
        let (log, _sub) = record(&c);
        assert_eq!(c.set(0, 11), Ok(10));
        c.move_item(0, 2).expect("move in range");
        assert_eq!(c.to_vec(), vec![20, 30, 11]);
        assert_eq!(c.remove(1), Some(30));
        assert_eq!(c.pop(), Some(11));
        c.clear();
        assert!(c.is_empty());
        assert_eq!(
            *log.borrow(),
            vec![
                CollectionChange::Replaced { index: 0 },
                CollectionChange::Moved { from: 0, to: 2 },
                CollectionChange::Removed { index: 1, count: 1 },
                CollectionChange::Removed { index: 1, count: 1 },
                CollectionChange::Reset,
            ]
        );
    }

    #[test]
    fn equality_is_identity() {
        let a: ObservableCollection<i32> = vec![1].into();
        let b: ObservableCollection<i32> = vec![1].into();
        let a2 = a.clone();
        assert_eq!(a, a2);
        assert_ne!(a, b);
        a2.push(2);
        assert_eq!(a.len(), 2);
    }

    #[test]
    fn extend_and_retain() {
        let c: ObservableCollection<i32> = (1..=3).collect();
        let (log, _sub) = record(&c);
        c.extend([4, 5]);
        c.retain(|v| v % 2 == 0);
        assert_eq!(c.with(|items| items.to_vec()), vec![2, 4]);
        assert_eq!(
            *log.borrow(),
            vec![
                CollectionChange::Added { index: 3, count: 2 },
                CollectionChange::Reset,
            ]
        );
    }
}
