#![forbid(unsafe_code)]

//! Host capabilities consumed by the detector.
//!
//! The detector never touches global state. Everything it needs from its
//! environment is expressed as a trait and handed over in a [`Host`] bundle:
//!
//! | Capability          | Browser equivalent                         |
//! |---------------------|--------------------------------------------|
//! | [`ObserverFactory`] | `new ResizeObserver(cb)`                   |
//! | [`SizeObserver`]    | `observe(el)` / `unobserve(el)`            |
//! | [`ElementResolver`] | `document.getElementById`, `parentElement` |
//! | [`FrameScheduler`]  | `requestAnimationFrame` / cancel           |
//! | [`TimerHost`]       | `performance.now`, `setTimeout` / clear    |
//!
//! All capabilities are single-threaded (`Rc`, no `Send`), matching the
//! browser's one UI thread.

use crate::geometry::ResizeEntry;
use std::fmt;
use std::rc::Rc;
use std::time::Duration;

/// Callback receiving one batch of resize entries.
pub type EntriesCallback<E> = Rc<dyn Fn(&[ResizeEntry<E>])>;

/// Deferred task handed to a [`FrameScheduler`] or [`TimerHost`].
pub type Task = Box<dyn FnOnce()>;

/// Identifies a task scheduled with [`FrameScheduler::request_frame`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FrameHandle(pub u64);

/// Identifies a task armed with [`TimerHost::set_timeout`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerHandle(pub u64);

/// Creates size observers bound to a notification callback.
pub trait ObserverFactory<E> {
    /// Create an observer that delivers batches to `on_entries`.
    fn create(&self, on_entries: EntriesCallback<E>) -> Box<dyn SizeObserver<E>>;
}

/// A live size observer.
pub trait SizeObserver<E> {
    /// Start delivering entries for `target`.
    fn observe(&self, target: &E);

    /// Stop delivering entries for `target`. Unknown targets are ignored.
    fn unobserve(&self, target: &E);
}

/// Element lookup in the ambient document.
pub trait ElementResolver<E> {
    /// Element carrying the given identifier, if any.
    fn element_by_id(&self, id: &str) -> Option<E>;

    /// Parent element of `element`, if it is attached.
    fn parent_of(&self, element: &E) -> Option<E>;
}

/// Runs tasks right before the next paint.
pub trait FrameScheduler {
    /// Schedule `task`. Returns `None` if the task could not be scheduled,
    /// in which case it is dropped without running.
    fn request_frame(&self, task: Task) -> Option<FrameHandle>;

    /// Cancel a scheduled task. Handles that already ran are ignored.
    fn cancel_frame(&self, handle: FrameHandle);
}

/// Monotonic clock and one-shot timers.
pub trait TimerHost {
    /// Monotonic time since an arbitrary host-defined origin.
    fn now(&self) -> Duration;

    /// Run `task` once after `delay`. Returns `None` if no timer could be
    /// armed; the task is dropped in that case.
    fn set_timeout(&self, delay: Duration, task: Task) -> Option<TimerHandle>;

    /// Disarm a timer. Handles that already fired are ignored.
    fn clear_timeout(&self, handle: TimerHandle);
}

/// Capability bundle handed to a detector at construction.
///
/// `frames` is optional: a host without a frame scheduler models a
/// non-browser execution context, where size changes are observed but never
/// applied.
pub struct Host<E> {
    pub observers: Rc<dyn ObserverFactory<E>>,
    pub elements: Rc<dyn ElementResolver<E>>,
    pub timers: Rc<dyn TimerHost>,
    pub frames: Option<Rc<dyn FrameScheduler>>,
}

impl<E> Host<E> {
    pub fn new(
        observers: Rc<dyn ObserverFactory<E>>,
        elements: Rc<dyn ElementResolver<E>>,
        timers: Rc<dyn TimerHost>,
        frames: Option<Rc<dyn FrameScheduler>>,
    ) -> Self {
        Self {
            observers,
            elements,
            timers,
            frames,
        }
    }

    /// Drop the frame scheduler, leaving every other capability in place.
    #[must_use]
    pub fn without_frames(mut self) -> Self {
        self.frames = None;
        self
    }
}

// Manual Clone: `E` itself need not be Clone to share the capabilities.
impl<E> Clone for Host<E> {
    fn clone(&self) -> Self {
        Self {
            observers: Rc::clone(&self.observers),
            elements: Rc::clone(&self.elements),
            timers: Rc::clone(&self.timers),
            frames: self.frames.clone(),
        }
    }
}

impl<E> fmt::Debug for Host<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Host")
            .field("has_frames", &self.frames.is_some())
            .finish_non_exhaustive()
    }
}
