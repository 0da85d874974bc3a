#![forbid(unsafe_code)]

//! Headless host for tests and non-browser embedding.
//!
//! [`HeadlessHost`] implements every host capability over an in-memory
//! element tree and a virtual clock. Nothing happens on its own: the caller
//! delivers size changes with [`resize`](HeadlessHost::resize), runs frame
//! tasks with [`flush_frames`](HeadlessHost::flush_frames) and moves time
//! with [`advance`](HeadlessHost::advance). Replaying the same calls yields
//! the same callbacks in the same order.
//!
//! # Example
//!
//! ```
//! use resize_detector::{DetectorConfig, DetectorProps, HeadlessHost, ObservedSize, ResizeDetector};
//! use std::rc::Rc;
//!
//! let sim = HeadlessHost::new();
//! let parent = sim.create_element(None);
//! let probe = sim.create_element(Some(parent));
//!
//! let props = Rc::new(DetectorProps::new(DetectorConfig::both()));
//! let mut detector = ResizeDetector::new(props, sim.host());
//! detector.attach_probe(Some(probe));
//! detector.mount();
//!
//! sim.resize(parent, 100.0, 50.0);
//! sim.flush_frames();
//! assert_eq!(detector.size(), ObservedSize::new(100.0, 50.0));
//! ```

use crate::geometry::ResizeEntry;
use crate::host::{
    ElementResolver, EntriesCallback, FrameHandle, FrameScheduler, Host, ObserverFactory,
    SizeObserver, Task, TimerHandle, TimerHost,
};
use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::rc::Rc;
use std::time::Duration;

/// An element in the headless tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HeadlessElement(pub u32);

#[derive(Debug)]
struct ElementRecord {
    id: Option<String>,
    parent: Option<HeadlessElement>,
}

struct ObserverRecord {
    callback: EntriesCallback<HeadlessElement>,
    targets: Vec<HeadlessElement>,
    live: bool,
}

#[derive(Default)]
struct State {
    now: Duration,
    elements: Vec<ElementRecord>,
    observers: Vec<ObserverRecord>,
    observe_calls: usize,
    next_frame: u64,
    frames: BTreeMap<u64, Task>,
    next_timer: u64,
    /// Keyed by (due, handle) so equal deadlines fire in arming order.
    timers: BTreeMap<(Duration, u64), Task>,
    timer_due: HashMap<u64, Duration>,
    refuse_timers: bool,
}

/// Deterministic in-memory host. Clones share the same state.
#[derive(Clone, Default)]
pub struct HeadlessHost {
    state: Rc<RefCell<State>>,
}

impl fmt::Debug for HeadlessHost {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = self.state.borrow();
        f.debug_struct("HeadlessHost")
            .field("now", &s.now)
            .field("elements", &s.elements.len())
            .field("observers", &s.observers.len())
            .field("pending_frames", &s.frames.len())
            .field("pending_timers", &s.timers.len())
            .finish()
    }
}

impl HeadlessHost {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Capability bundle backed by this host, frame scheduler included.
    #[must_use]
    pub fn host(&self) -> Host<HeadlessElement> {
        let shared = Rc::new(self.clone());
        let frames: Rc<dyn FrameScheduler> = shared.clone();
        Host::new(shared.clone(), shared.clone(), shared, Some(frames))
    }

    #[must_use]
    pub fn timer_host(&self) -> Rc<dyn TimerHost> {
        Rc::new(self.clone())
    }

    // -- Element tree -------------------------------------------------------

    /// Add an element under `parent`.
    pub fn create_element(&self, parent: Option<HeadlessElement>) -> HeadlessElement {
        self.insert(parent, None)
    }

    /// Add an element carrying `id` under `parent`.
    pub fn create_element_with_id(
        &self,
        parent: Option<HeadlessElement>,
        id: &str,
    ) -> HeadlessElement {
        self.insert(parent, Some(id.to_string()))
    }

    /// Detach `element` from its parent.
    pub fn detach(&self, element: HeadlessElement) {
        if let Some(record) = self.state.borrow_mut().elements.get_mut(element.0 as usize) {
            record.parent = None;
        }
    }

    fn insert(&self, parent: Option<HeadlessElement>, id: Option<String>) -> HeadlessElement {
        let mut s = self.state.borrow_mut();
        let element = HeadlessElement(s.elements.len() as u32);
        s.elements.push(ElementRecord { id, parent });
        element
    }

    // -- Observation --------------------------------------------------------

    /// Deliver a single-entry batch for `element` to every observer of it.
    pub fn resize(&self, element: HeadlessElement, width: f64, height: f64) {
        self.deliver(&[ResizeEntry::new(element, width, height)]);
    }

    /// Deliver a batch. Each live observer receives, in order, the entries
    /// whose targets it observes.
    pub fn deliver(&self, batch: &[ResizeEntry<HeadlessElement>]) {
        let deliveries: Vec<_> = {
            let s = self.state.borrow();
            s.observers
                .iter()
                .filter(|o| o.live)
                .filter_map(|o| {
                    let entries: Vec<_> = batch
                        .iter()
                        .filter(|e| o.targets.contains(&e.target))
                        .cloned()
                        .collect();
                    (!entries.is_empty()).then(|| (Rc::clone(&o.callback), entries))
                })
                .collect()
        };
        for (callback, entries) in deliveries {
            callback(&entries);
        }
    }

    /// Whether any live observer watches `element`.
    #[must_use]
    pub fn is_observed(&self, element: HeadlessElement) -> bool {
        self.state
            .borrow()
            .observers
            .iter()
            .any(|o| o.live && o.targets.contains(&element))
    }

    /// Total `observe` calls made against this host.
    #[must_use]
    pub fn observe_calls(&self) -> usize {
        self.state.borrow().observe_calls
    }

    // -- Frames -------------------------------------------------------------

    /// Run every frame task queued before this call, in scheduling order.
    ///
    /// Tasks scheduled while flushing wait for the next flush. Returns the
    /// number of tasks run.
    pub fn flush_frames(&self) -> usize {
        let Some(last) = self.state.borrow().frames.keys().next_back().copied() else {
            return 0;
        };
        let mut ran = 0;
        loop {
            let task = {
                let mut s = self.state.borrow_mut();
                match s.frames.first_key_value() {
                    Some((&handle, _)) if handle <= last => s.frames.remove(&handle),
                    _ => None,
                }
            };
            let Some(task) = task else {
                break;
            };
            task();
            ran += 1;
        }
        ran
    }

    #[must_use]
    pub fn pending_frames(&self) -> usize {
        self.state.borrow().frames.len()
    }

    // -- Time ---------------------------------------------------------------

    /// Move the clock forward by `delta`, firing due timers in order.
    ///
    /// Timers armed by a firing timer also fire if they fall due within the
    /// same advance.
    pub fn advance(&self, delta: Duration) {
        let target = self.state.borrow().now + delta;
        loop {
            let task = {
                let mut s = self.state.borrow_mut();
                let due = s
                    .timers
                    .first_key_value()
                    .map(|(&key, _)| key)
                    .filter(|(at, _)| *at <= target);
                match due {
                    Some(key) => {
                        s.now = key.0;
                        s.timer_due.remove(&key.1);
                        s.timers.remove(&key)
                    }
                    None => None,
                }
            };
            let Some(task) = task else {
                break;
            };
            task();
        }
        self.state.borrow_mut().now = target;
    }

    #[must_use]
    pub fn pending_timers(&self) -> usize {
        self.state.borrow().timers.len()
    }

    /// Make `set_timeout` fail, as a host without timers would.
    pub fn refuse_timers(&self, refuse: bool) {
        self.state.borrow_mut().refuse_timers = refuse;
    }
}

/// Observer handed out by [`HeadlessHost`]. Dropping it disconnects.
struct HeadlessObserver {
    host: HeadlessHost,
    index: usize,
}

impl SizeObserver<HeadlessElement> for HeadlessObserver {
    fn observe(&self, target: &HeadlessElement) {
        let mut s = self.host.state.borrow_mut();
        s.observe_calls += 1;
        let record = &mut s.observers[self.index];
        if !record.targets.contains(target) {
            record.targets.push(*target);
        }
    }

    fn unobserve(&self, target: &HeadlessElement) {
        let mut s = self.host.state.borrow_mut();
        s.observers[self.index].targets.retain(|t| t != target);
    }
}

impl Drop for HeadlessObserver {
    fn drop(&mut self) {
        // The callback is released outside the borrow; it may own handles
        // back into this host.
        let released = self.host.state.try_borrow_mut().ok().map(|mut s| {
            let record = &mut s.observers[self.index];
            record.live = false;
            record.targets.clear();
            let idle: EntriesCallback<HeadlessElement> =
                Rc::new(|_: &[ResizeEntry<HeadlessElement>]| {});
            std::mem::replace(&mut record.callback, idle)
        });
        drop(released);
    }
}

impl ObserverFactory<HeadlessElement> for HeadlessHost {
    fn create(
        &self,
        on_entries: EntriesCallback<HeadlessElement>,
    ) -> Box<dyn SizeObserver<HeadlessElement>> {
        let index = {
            let mut s = self.state.borrow_mut();
            s.observers.push(ObserverRecord {
                callback: on_entries,
                targets: Vec::new(),
                live: true,
            });
            s.observers.len() - 1
        };
        Box::new(HeadlessObserver {
            host: self.clone(),
            index,
        })
    }
}

impl ElementResolver<HeadlessElement> for HeadlessHost {
    fn element_by_id(&self, id: &str) -> Option<HeadlessElement> {
        self.state
            .borrow()
            .elements
            .iter()
            .position(|record| record.id.as_deref() == Some(id))
            .map(|idx| HeadlessElement(idx as u32))
    }

    fn parent_of(&self, element: &HeadlessElement) -> Option<HeadlessElement> {
        self.state
            .borrow()
            .elements
            .get(element.0 as usize)
            .and_then(|record| record.parent)
    }
}

impl FrameScheduler for HeadlessHost {
    fn request_frame(&self, task: Task) -> Option<FrameHandle> {
        let mut s = self.state.borrow_mut();
        s.next_frame += 1;
        let handle = s.next_frame;
        s.frames.insert(handle, task);
        Some(FrameHandle(handle))
    }

    fn cancel_frame(&self, handle: FrameHandle) {
        self.state.borrow_mut().frames.remove(&handle.0);
    }
}

impl TimerHost for HeadlessHost {
    fn now(&self) -> Duration {
        self.state.borrow().now
    }

    fn set_timeout(&self, delay: Duration, task: Task) -> Option<TimerHandle> {
        let mut s = self.state.borrow_mut();
        if s.refuse_timers {
            return None;
        }
        s.next_timer += 1;
        let handle = s.next_timer;
        let due = s.now.saturating_add(delay);
        s.timers.insert((due, handle), task);
        s.timer_due.insert(handle, due);
        Some(TimerHandle(handle))
    }

    fn clear_timeout(&self, handle: TimerHandle) {
        let mut s = self.state.borrow_mut();
        if let Some(due) = s.timer_due.remove(&handle.0) {
            s.timers.remove(&(due, handle.0));
        }
    }
}
