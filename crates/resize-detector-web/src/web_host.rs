#![forbid(unsafe_code)]

//! Host capabilities backed by the browser.
//!
//! [`WebHost`] implements every `resize_detector::host` trait over `web-sys`:
//! `ResizeObserver` for size observation, `document.getElementById` and
//! `parentElement` for element lookup, `requestAnimationFrame` for deferred
//! application, and `setTimeout` plus `web-time` for rate limiting.
//!
//! Outside a window (a worker, for example) there is no frame scheduler and
//! no timers. The detector then observes but never applies sizes, and rate
//! limiting degrades to direct delivery.

use js_sys::{Array, Function};
use resize_detector::{
    ElementResolver, FrameHandle, FrameScheduler, Host, ObserverFactory, ResizeEntry,
    SizeObserver, TimerHandle, TimerHost,
    host::{EntriesCallback, Task},
};
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;
use std::time::Duration;
use tracing::{debug, warn};
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use web_sys::{Document, Element, ResizeObserver, ResizeObserverEntry, Window};
use web_time::Instant;

/// One-shot JS callbacks kept alive until they run or are cancelled.
///
/// Handles given to the detector are local keys, not JS ids, so a cancelled
/// callback can be dropped. A callback that ran is dropped on the next
/// register or cancel, never while it is executing.
#[derive(Default)]
struct Callbacks {
    next_key: Cell<u64>,
    live: RefCell<HashMap<u64, (i32, Closure<dyn FnMut()>)>>,
    running: Rc<Cell<Option<u64>>>,
    spent: Rc<RefCell<Vec<u64>>>,
}

impl Callbacks {
    fn sweep(&self) {
        let spent: Vec<u64> = self.spent.borrow_mut().drain(..).collect();
        let mut live = self.live.borrow_mut();
        for key in spent {
            live.remove(&key);
        }
    }

    fn register(
        &self,
        task: Task,
        schedule: impl FnOnce(&Function) -> Result<i32, JsValue>,
    ) -> Result<u64, JsValue> {
        self.sweep();
        let key = self.next_key.get() + 1;
        self.next_key.set(key);

        let running = Rc::clone(&self.running);
        let spent = Rc::clone(&self.spent);
        let closure: Closure<dyn FnMut()> = Closure::once(move || {
            running.set(Some(key));
            task();
            running.set(None);
            spent.borrow_mut().push(key);
        });
        let js_id = schedule(closure.as_ref().unchecked_ref())?;
        self.live.borrow_mut().insert(key, (js_id, closure));
        Ok(key)
    }

    /// Forget `key` and return its JS id, unless it is the callback running now.
    fn cancel(&self, key: u64) -> Option<i32> {
        if self.running.get() == Some(key) {
            return None;
        }
        self.sweep();
        let removed = self.live.borrow_mut().remove(&key);
        removed.map(|(js_id, _closure)| js_id)
    }

    /// Forget every pending callback and return the JS ids to cancel.
    fn drain(&self) -> Vec<i32> {
        self.sweep();
        let running = self.running.get();
        let mut live = self.live.borrow_mut();
        let ids = live
            .iter()
            .filter(|(key, _)| Some(**key) != running)
            .map(|(_, (js_id, _))| *js_id)
            .collect();
        live.clear();
        ids
    }
}

/// Browser implementation of the detector's host capabilities.
pub struct WebHost {
    window: Option<Window>,
    document: Option<Document>,
    origin: Instant,
    frames: Callbacks,
    timers: Callbacks,
}

impl fmt::Debug for WebHost {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WebHost")
            .field("has_window", &self.window.is_some())
            .field("has_document", &self.document.is_some())
            .field("live_frames", &self.frames.live.borrow().len())
            .field("live_timers", &self.timers.live.borrow().len())
            .finish()
    }
}

impl Default for WebHost {
    fn default() -> Self {
        Self::new()
    }
}

impl WebHost {
    pub fn new() -> Self {
        let window = web_sys::window();
        let document = window.as_ref().and_then(Window::document);
        Self {
            window,
            document,
            origin: Instant::now(),
            frames: Callbacks::default(),
            timers: Callbacks::default(),
        }
    }

    /// Capability bundle. The frame scheduler is present only in a window.
    pub fn host(self: &Rc<Self>) -> Host<Element> {
        let frames = self
            .window
            .as_ref()
            .map(|_| Rc::clone(self) as Rc<dyn FrameScheduler>);
        Host::new(Rc::clone(self), Rc::clone(self), Rc::clone(self), frames)
    }

    #[must_use]
    pub fn document(&self) -> Option<&Document> {
        self.document.as_ref()
    }
}

impl Drop for WebHost {
    fn drop(&mut self) {
        let frames = self.frames.drain();
        let timers = self.timers.drain();
        let Some(window) = &self.window else {
            return;
        };
        debug!(
            frames = frames.len(),
            timers = timers.len(),
            "cancelling pending web callbacks"
        );
        for id in frames {
            let _ = window.cancel_animation_frame(id);
        }
        for id in timers {
            window.clear_timeout_with_handle(id);
        }
    }
}

/// Convert the observer's entry array, skipping anything that is not an entry.
fn collect_entries(entries: &Array) -> Vec<ResizeEntry<Element>> {
    entries
        .iter()
        .filter_map(|value| value.dyn_into::<ResizeObserverEntry>().ok())
        .map(|entry| {
            let rect = entry.content_rect();
            ResizeEntry::new(entry.target(), rect.width(), rect.height())
        })
        .collect()
}

struct WebObserver {
    observer: Option<ResizeObserver>,
    _callback: Closure<dyn FnMut(Array, ResizeObserver)>,
}

impl SizeObserver<Element> for WebObserver {
    fn observe(&self, target: &Element) {
        if let Some(observer) = &self.observer {
            observer.observe(target);
        }
    }

    fn unobserve(&self, target: &Element) {
        if let Some(observer) = &self.observer {
            observer.unobserve(target);
        }
    }
}

impl Drop for WebObserver {
    fn drop(&mut self) {
        if let Some(observer) = &self.observer {
            observer.disconnect();
        }
    }
}

impl ObserverFactory<Element> for WebHost {
    fn create(&self, on_entries: EntriesCallback<Element>) -> Box<dyn SizeObserver<Element>> {
        let callback = Closure::<dyn FnMut(Array, ResizeObserver)>::new(
            move |entries: Array, _observer: ResizeObserver| {
                on_entries(&collect_entries(&entries));
            },
        );
        let observer = match ResizeObserver::new(callback.as_ref().unchecked_ref()) {
            Ok(observer) => Some(observer),
            Err(err) => {
                warn!(?err, "ResizeObserver unavailable, sizes will not be observed");
                None
            }
        };
        Box::new(WebObserver {
            observer,
            _callback: callback,
        })
    }
}

impl ElementResolver<Element> for WebHost {
    fn element_by_id(&self, id: &str) -> Option<Element> {
        self.document.as_ref()?.get_element_by_id(id)
    }

    fn parent_of(&self, element: &Element) -> Option<Element> {
        element.parent_element()
    }
}

impl FrameScheduler for WebHost {
    fn request_frame(&self, task: Task) -> Option<FrameHandle> {
        let window = self.window.as_ref()?;
        match self
            .frames
            .register(task, |f| window.request_animation_frame(f))
        {
            Ok(key) => Some(FrameHandle(key)),
            Err(err) => {
                warn!(?err, "requestAnimationFrame failed");
                None
            }
        }
    }

    fn cancel_frame(&self, handle: FrameHandle) {
        if let (Some(window), Some(id)) = (&self.window, self.frames.cancel(handle.0)) {
            let _ = window.cancel_animation_frame(id);
        }
    }
}

impl TimerHost for WebHost {
    fn now(&self) -> Duration {
        self.origin.elapsed()
    }

    fn set_timeout(&self, delay: Duration, task: Task) -> Option<TimerHandle> {
        let window = self.window.as_ref()?;
        let delay_ms = i32::try_from(delay.as_millis()).unwrap_or(i32::MAX);
        match self.timers.register(task, |f| {
            window.set_timeout_with_callback_and_timeout_and_arguments_0(f, delay_ms)
        }) {
            Ok(key) => Some(TimerHandle(key)),
            Err(err) => {
                warn!(?err, "setTimeout failed");
                None
            }
        }
    }

    fn clear_timeout(&self, handle: TimerHandle) {
        if let (Some(window), Some(id)) = (&self.window, self.timers.cancel(handle.0)) {
            window.clear_timeout_with_handle(id);
        }
    }
}
