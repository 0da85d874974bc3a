#![forbid(unsafe_code)]

//! Version-tracked size state with change notification.
//!
//! # Design
//!
//! [`SizeState`] holds the detector's [`ObservedSize`] in shared storage
//! (`Rc<RefCell<..>>`) so deferred frame tasks can apply a measurement after
//! the notification that scheduled them has returned. Hosts subscribe to
//! learn when a re-render is due.
//!
//! # Invariants
//!
//! 1. `version` increments by exactly 1 on every [`apply`](SizeState::apply),
//!    whether or not the value differs. Each apply produces a new state
//!    identity, and update suppression compares identities, not values.
//! 2. Subscribers are notified in registration order, after the value and
//!    version are updated.
//! 3. Dropping a [`Subscription`] stops delivery before the next apply.
//!
//! # Failure Modes
//!
//! - **Re-entrant apply**: a subscriber that calls `apply` recurses into
//!   notification. The borrow is released before callbacks run, so this is
//!   legal, but it is the subscriber's job to terminate.

use crate::geometry::ObservedSize;
use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

type Listener = Rc<dyn Fn(&ObservedSize)>;

struct Inner {
    size: ObservedSize,
    version: u64,
    listeners: Vec<Weak<dyn Fn(&ObservedSize)>>,
}

/// Shared observed-size cell. Clones share the same state.
#[derive(Clone)]
pub struct SizeState {
    inner: Rc<RefCell<Inner>>,
}

impl Default for SizeState {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for SizeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.borrow();
        f.debug_struct("SizeState")
            .field("size", &inner.size)
            .field("version", &inner.version)
            .field("listeners", &inner.listeners.len())
            .finish()
    }
}

impl SizeState {
    /// Unknown size, version 0, no listeners.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Rc::new(RefCell::new(Inner {
                size: ObservedSize::UNKNOWN,
                version: 0,
                listeners: Vec::new(),
            })),
        }
    }

    #[must_use]
    pub fn get(&self) -> ObservedSize {
        self.inner.borrow().size
    }

    #[must_use]
    pub fn version(&self) -> u64 {
        self.inner.borrow().version
    }

    /// Replace the size, bump the version and notify listeners.
    pub fn apply(&self, size: ObservedSize) {
        let listeners: Vec<Listener> = {
            let mut inner = self.inner.borrow_mut();
            inner.size = size;
            inner.version += 1;
            inner.listeners.retain(|w| w.strong_count() > 0);
            inner.listeners.iter().filter_map(Weak::upgrade).collect()
        };
        for listener in &listeners {
            listener(&size);
        }
    }

    /// Register a listener for applied sizes.
    pub fn subscribe(&self, listener: impl Fn(&ObservedSize) + 'static) -> Subscription {
        let strong: Listener = Rc::new(listener);
        self.inner
            .borrow_mut()
            .listeners
            .push(Rc::downgrade(&strong));
        Subscription { _listener: strong }
    }

    /// Registered listeners, including dropped ones not yet pruned.
    #[must_use]
    pub fn listener_count(&self) -> usize {
        self.inner.borrow().listeners.len()
    }
}

/// RAII guard for a [`SizeState`] listener.
pub struct Subscription {
    _listener: Listener,
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription").finish_non_exhaustive()
    }
}
