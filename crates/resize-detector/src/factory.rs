#![forbid(unsafe_code)]

//! Wrap an existing component in a resize detector.
//!
//! [`with_resize_detector`] is pure composition: the wrapper renders the
//! consumer with its own props and hands the result to a detector as an
//! element child, so the consumer receives `width` and `height` as injected
//! properties.

use crate::config::DetectorConfig;
use crate::detector::{DetectorProps, ResizeDetector};
use crate::host::Host;
use crate::node::ElementNode;
use std::fmt;
use std::marker::PhantomData;
use std::rc::Rc;

/// A consumer component: renders an element from its props.
pub trait Component {
    type Props;

    fn render(&self, props: &Self::Props) -> ElementNode;
}

/// Adapts a render closure into a [`Component`].
pub struct FnComponent<P, F> {
    render: F,
    _props: PhantomData<fn(&P)>,
}

impl<P, F> FnComponent<P, F>
where
    F: Fn(&P) -> ElementNode,
{
    pub fn new(render: F) -> Self {
        Self {
            render,
            _props: PhantomData,
        }
    }
}

impl<P, F> Component for FnComponent<P, F>
where
    F: Fn(&P) -> ElementNode,
{
    type Props = P;

    fn render(&self, props: &P) -> ElementNode {
        (self.render)(props)
    }
}

/// A component rendered inside a resize detector with preset options.
pub struct WithResizeDetector<C> {
    component: C,
    config: DetectorConfig,
}

impl<C: fmt::Debug> fmt::Debug for WithResizeDetector<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WithResizeDetector")
            .field("component", &self.component)
            .field("config", &self.config)
            .finish()
    }
}

/// Wrap `component`; `None` options watch both width and height.
pub fn with_resize_detector<C: Component>(
    component: C,
    config: Option<DetectorConfig>,
) -> WithResizeDetector<C> {
    WithResizeDetector {
        component,
        config: config.unwrap_or_else(DetectorConfig::both),
    }
}

impl<C: Component> WithResizeDetector<C> {
    #[must_use]
    pub fn config(&self) -> &DetectorConfig {
        &self.config
    }

    #[must_use]
    pub fn component(&self) -> &C {
        &self.component
    }

    /// Detector props wrapping the consumer's output for `props`.
    pub fn render(&self, props: &C::Props) -> Rc<DetectorProps> {
        Rc::new(
            DetectorProps::new(self.config.clone()).with_child(self.component.render(props)),
        )
    }

    /// Build a detector for `props` on `host`.
    pub fn instantiate<E>(&self, props: &C::Props, host: Host<E>) -> ResizeDetector<E>
    where
        E: Clone + PartialEq + fmt::Debug + 'static,
    {
        ResizeDetector::new(self.render(props), host)
    }
}
