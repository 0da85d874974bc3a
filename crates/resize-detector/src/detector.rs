#![forbid(unsafe_code)]

//! The resize detector component.
//!
//! [`ResizeDetector`] owns a hidden probe, registers its target with the
//! host's size observer, and fans measured sizes out to three consumer
//! channels: the `on_resize` callback, the `render` function and the
//! children.
//!
//! # Lifecycle
//!
//! ```text
//! new(props, host)    build rate-limited handler + observer (once)
//! attach_probe(el)    host reports the DOM node created for the probe
//! mount()             resolve target, observe it
//!   ... entries → handler → handle_entries → request_frame → apply ...
//! unmount()           unobserve, cancel latest frame, cancel rate limiter
//! ```
//!
//! # Notification flow
//!
//! Raw batches from the observer go through the [`RateLimited`] handler.
//! For every entry the detector compares the watched dimensions against the
//! current [`SizeState`]; on a change it schedules a frame task that calls
//! `on_resize` and then applies the new size. Only the most recently
//! scheduled frame handle is retained.
//!
//! # Failure Modes
//!
//! None are surfaced. A missing target skips observation, a host without a
//! frame scheduler drops size changes, and a handler without a cancel
//! operation is simply not cancelled.

use crate::children::{Child, resolve_children};
use crate::config::DetectorConfig;
use crate::geometry::{ContentRect, ObservedSize, ResizeEntry};
use crate::host::{FrameHandle, FrameScheduler, Host, SizeObserver};
use crate::node::{ElementNode, Node};
use crate::rate_limit::RateLimited;
use crate::state::{SizeState, Subscription};
use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;
use tracing::{debug, trace};

/// Key of the hidden probe element.
pub const PROBE_KEY: &str = "resize-detector";

/// Key of the render-function output.
pub const RENDER_KEY: &str = "render";

/// Inline style of the probe: zero-size, hidden, out of flow.
pub const PROBE_STYLE: [(&str, &str); 5] = [
    ("position", "absolute"),
    ("width", "0"),
    ("height", "0"),
    ("visibility", "hidden"),
    ("display", "none"),
];

/// Callback channel: receives `(width, height)`.
pub type ResizeCallback = Rc<dyn Fn(f64, f64)>;

/// Render channel: receives the current size.
pub type RenderFn = Rc<dyn Fn(ObservedSize) -> Node>;

/// Everything a detector is rendered with.
///
/// Shared as `Rc<DetectorProps>`; [`ResizeDetector::should_update`] compares
/// allocations, not values.
#[derive(Clone)]
pub struct DetectorProps {
    pub config: DetectorConfig,
    pub on_resize: ResizeCallback,
    pub render: Option<RenderFn>,
    pub children: Vec<Child>,
}

impl Default for DetectorProps {
    fn default() -> Self {
        Self::new(DetectorConfig::default())
    }
}

impl fmt::Debug for DetectorProps {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DetectorProps")
            .field("config", &self.config)
            .field("render", &self.render.is_some())
            .field("children", &self.children)
            .finish_non_exhaustive()
    }
}

impl DetectorProps {
    /// Props with the given configuration and no-op consumers.
    pub fn new(config: DetectorConfig) -> Self {
        Self {
            config,
            on_resize: Rc::new(|_, _| {}),
            render: None,
            children: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_on_resize(mut self, f: impl Fn(f64, f64) + 'static) -> Self {
        self.on_resize = Rc::new(f);
        self
    }

    #[must_use]
    pub fn with_render(mut self, f: impl Fn(ObservedSize) -> Node + 'static) -> Self {
        self.render = Some(Rc::new(f));
        self
    }

    #[must_use]
    pub fn with_child(mut self, child: impl Into<Child>) -> Self {
        self.children.push(child.into());
        self
    }

    #[must_use]
    pub fn with_children(mut self, children: impl IntoIterator<Item = Child>) -> Self {
        self.children.extend(children);
        self
    }
}

/// State reachable from observer and frame callbacks.
struct Shared {
    props: RefCell<Rc<DetectorProps>>,
    size: SizeState,
    skip_on_mount: Cell<bool>,
    /// Most recently scheduled apply task.
    frame: Cell<Option<FrameHandle>>,
    frames: Option<Rc<dyn FrameScheduler>>,
}

impl Shared {
    fn handle_entries<E: fmt::Debug>(self: &Rc<Self>, entries: &[ResizeEntry<E>]) {
        let props = self.props.borrow().clone();
        let config = &props.config;
        for entry in entries {
            let ContentRect { width, height } = entry.content_rect;
            let current = self.size.get();
            let notify_width = config.handle_width() && current.width != Some(width);
            let notify_height = config.handle_height() && current.height != Some(height);

            if self.skip_on_mount.get() {
                trace!(element = ?entry.target, width, height, "first notification skipped");
            } else if notify_width || notify_height {
                self.schedule_apply(width, height, Rc::clone(&props.on_resize));
            }
            self.skip_on_mount.set(false);
        }
    }

    fn schedule_apply(self: &Rc<Self>, width: f64, height: f64, on_resize: ResizeCallback) {
        let Some(frames) = &self.frames else {
            trace!(width, height, "no frame scheduler, size change dropped");
            return;
        };
        let weak = Rc::downgrade(self);
        let handle = frames.request_frame(Box::new(move || {
            let Some(shared) = weak.upgrade() else {
                return;
            };
            on_resize(width, height);
            shared.size.apply(ObservedSize::new(width, height));
        }));
        trace!(width, height, ?handle, "size change scheduled");
        if handle.is_some() {
            self.frame.set(handle);
        }
    }
}

/// Observes an element's size and reports changes to its consumers.
pub struct ResizeDetector<E: 'static> {
    shared: Rc<Shared>,
    host: Host<E>,
    handler: RateLimited<Vec<ResizeEntry<E>>>,
    observer: Box<dyn SizeObserver<E>>,
    probe: Option<E>,
    mounted: bool,
    rendered_version: Cell<Option<u64>>,
}

impl<E> ResizeDetector<E>
where
    E: Clone + PartialEq + fmt::Debug + 'static,
{
    /// Build the rate-limited handler and the size observer.
    ///
    /// Both are created exactly once; later prop changes do not rebuild them.
    pub fn new(props: Rc<DetectorProps>, host: Host<E>) -> Self {
        let config = &props.config;
        let shared = Rc::new(Shared {
            props: RefCell::new(Rc::clone(&props)),
            size: SizeState::new(),
            skip_on_mount: Cell::new(config.skip_on_mount),
            frame: Cell::new(None),
            frames: host.frames.clone(),
        });

        let weak = Rc::downgrade(&shared);
        let handler = RateLimited::wrap(
            config.refresh_mode,
            config.refresh_rate,
            Rc::clone(&host.timers),
            move |entries: Vec<ResizeEntry<E>>| {
                if let Some(shared) = weak.upgrade() {
                    shared.handle_entries(&entries);
                }
            },
        );

        let raw = handler.clone();
        let observer = host
            .observers
            .create(Rc::new(move |entries: &[ResizeEntry<E>]| {
                raw.invoke(entries.to_vec());
            }));

        debug!(
            watch = ?config.watch,
            mode = ?config.refresh_mode,
            rate_ms = u64::try_from(config.refresh_rate.as_millis()).unwrap_or(u64::MAX),
            skip_on_mount = config.skip_on_mount,
            target_id = config.target_id(),
            "resize detector created"
        );

        Self {
            shared,
            host,
            handler,
            observer,
            probe: None,
            mounted: false,
            rendered_version: Cell::new(None),
        }
    }

    /// Record the element the host created for the probe node.
    pub fn attach_probe(&mut self, probe: Option<E>) {
        self.probe = probe;
    }

    #[must_use]
    pub fn probe(&self) -> Option<&E> {
        self.probe.as_ref()
    }

    /// Start observing the target. A missing target is tolerated.
    pub fn mount(&mut self) {
        if self.mounted {
            return;
        }
        self.mounted = true;
        match self.resolve_target() {
            Some(target) => {
                debug!(element = ?target, "observing");
                self.observer.observe(&target);
            }
            None => debug!("no target element, observation skipped"),
        }
    }

    /// Stop observing and drop any pending work.
    ///
    /// Unobserving, cancelling the latest frame task and cancelling the rate
    /// limiter are independent; each runs even if another had nothing to do.
    pub fn unmount(&mut self) {
        debug!(
            pending_frame = ?self.shared.frame.get(),
            rate_limited_pending = self.handler.is_pending(),
            "unmounting"
        );
        self.teardown();
    }

    #[must_use]
    pub fn is_mounted(&self) -> bool {
        self.mounted
    }

    #[must_use]
    pub fn props(&self) -> Rc<DetectorProps> {
        self.shared.props.borrow().clone()
    }

    /// Whether rendering with `next` could produce different output.
    ///
    /// True when `next` is a different allocation than the current props, or
    /// the size state changed since the last [`render`](Self::render).
    #[must_use]
    pub fn should_update(&self, next: &Rc<DetectorProps>) -> bool {
        !Rc::ptr_eq(&*self.shared.props.borrow(), next)
            || self.rendered_version.get() != Some(self.shared.size.version())
    }

    /// Install new props. The rate-limiting mode stays as constructed.
    pub fn set_props(&mut self, next: Rc<DetectorProps>) {
        *self.shared.props.borrow_mut() = next;
    }

    #[must_use]
    pub fn size(&self) -> ObservedSize {
        self.shared.size.get()
    }

    /// Number of sizes applied so far.
    #[must_use]
    pub fn version(&self) -> u64 {
        self.shared.size.version()
    }

    /// Get notified after each applied size, e.g. to schedule a re-render.
    pub fn subscribe(&self, listener: impl Fn(&ObservedSize) + 'static) -> Subscription {
        self.shared.size.subscribe(listener)
    }

    /// Handle of the most recently scheduled apply task, if any.
    #[must_use]
    pub fn pending_frame(&self) -> Option<FrameHandle> {
        self.shared.frame.get()
    }

    /// Whether the first notification batch is still to be suppressed.
    #[must_use]
    pub fn skips_next_notification(&self) -> bool {
        self.shared.skip_on_mount.get()
    }

    #[must_use]
    pub fn handler(&self) -> &RateLimited<Vec<ResizeEntry<E>>> {
        &self.handler
    }

    /// Container holding the probe, the render output and the children.
    pub fn render(&self) -> Node {
        let props = self.props();
        let size = self.shared.size.get();
        self.rendered_version.set(Some(self.shared.size.version()));

        let mut root = ElementNode::new("div").with_child(probe_node());
        if let Some(render) = &props.render {
            root.children.push(render(size).keyed(RENDER_KEY));
        }
        root.children.extend(resolve_children(&props.children, size));
        Node::Element(root)
    }
}

impl<E: 'static> ResizeDetector<E> {
    /// Element with the configured id, else the probe's parent.
    #[must_use]
    pub fn resolve_target(&self) -> Option<E> {
        let props = self.shared.props.borrow().clone();
        props
            .config
            .target_id()
            .and_then(|id| self.host.elements.element_by_id(id))
            .or_else(|| {
                self.probe
                    .as_ref()
                    .and_then(|probe| self.host.elements.parent_of(probe))
            })
    }

    fn teardown(&mut self) {
        self.mounted = false;

        if let Some(target) = self.resolve_target() {
            self.observer.unobserve(&target);
        }

        if let (Some(frames), Some(handle)) = (&self.shared.frames, self.shared.frame.take()) {
            frames.cancel_frame(handle);
        }

        if self.handler.has_cancel() {
            self.handler.cancel();
        }
    }
}

impl<E: 'static> Drop for ResizeDetector<E> {
    fn drop(&mut self) {
        if self.mounted {
            self.teardown();
        }
    }
}

impl<E: fmt::Debug + 'static> fmt::Debug for ResizeDetector<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResizeDetector")
            .field("size", &self.shared.size.get())
            .field("mounted", &self.mounted)
            .field("probe", &self.probe)
            .field("handler", &self.handler)
            .finish_non_exhaustive()
    }
}

/// The hidden probe element.
#[must_use]
pub fn probe_node() -> Node {
    PROBE_STYLE
        .iter()
        .fold(ElementNode::new("div").with_key(PROBE_KEY), |el, (k, v)| {
            el.with_style(*k, *v)
        })
        .into()
}
