#![forbid(unsafe_code)]

//! Child content of a detector and its per-render resolution.

use crate::geometry::ObservedSize;
use crate::node::{ElementNode, Key, Node};
use std::fmt;
use std::rc::Rc;

/// Function child: receives the current width and height.
pub type SizeFn = Rc<dyn Fn(Option<f64>, Option<f64>) -> Node>;

/// One child of a detector, resolved once per render.
#[derive(Clone)]
pub enum Child {
    /// Invoked with `(width, height)`; its output is rendered.
    Render(SizeFn),
    /// Copied with `width` and `height` injected as properties.
    Element(ElementNode),
    /// Rendered unchanged.
    Node(Node),
}

impl Child {
    pub fn render(f: impl Fn(Option<f64>, Option<f64>) -> Node + 'static) -> Self {
        Self::Render(Rc::new(f))
    }

    /// Whether the child renders nothing and is dropped before keying.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Node(node) if node.is_empty())
    }

    /// Produce this child's output for `size` at position `index`.
    #[must_use]
    pub fn resolve(&self, size: ObservedSize, index: usize) -> Node {
        match self {
            Self::Render(f) => f(size.width, size.height).keyed(index),
            Self::Element(element) => Node::Element(inject_size(element, size, index)),
            Self::Node(node) => node.clone(),
        }
    }
}

impl fmt::Debug for Child {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Render(_) => f.write_str("Render(..)"),
            Self::Element(element) => f.debug_tuple("Element").field(element).finish(),
            Self::Node(node) => f.debug_tuple("Node").field(node).finish(),
        }
    }
}

impl From<ElementNode> for Child {
    fn from(element: ElementNode) -> Self {
        Self::Element(element)
    }
}

impl From<Node> for Child {
    fn from(node: Node) -> Self {
        match node {
            Node::Element(element) => Self::Element(element),
            other => Self::Node(other),
        }
    }
}

/// A copy of `element` carrying the measured size and a positional key.
fn inject_size(element: &ElementNode, size: ObservedSize, index: usize) -> ElementNode {
    element
        .clone()
        .with_prop("width", size.width)
        .with_prop("height", size.height)
        .with_key(Key::Index(index))
}

/// Resolve every non-empty child. Keys index the filtered list.
#[must_use]
pub fn resolve_children(children: &[Child], size: ObservedSize) -> Vec<Node> {
    children
        .iter()
        .filter(|child| !child.is_empty())
        .enumerate()
        .map(|(index, child)| child.resolve(size, index))
        .collect()
}
