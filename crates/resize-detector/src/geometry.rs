#![forbid(unsafe_code)]

//! Measurement types delivered by the size observer.

/// Content-box dimensions of an observed element, in layout units.
///
/// Border and padding are excluded.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ContentRect {
    pub width: f64,
    pub height: f64,
}

impl ContentRect {
    #[must_use]
    pub const fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }
}

/// Last size applied to a detector.
///
/// Both dimensions start out unknown (`None`) and only become known once a
/// resize notification has been applied.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ObservedSize {
    pub width: Option<f64>,
    pub height: Option<f64>,
}

impl ObservedSize {
    /// The initial state: neither dimension has been measured.
    pub const UNKNOWN: Self = Self {
        width: None,
        height: None,
    };

    /// A fully measured size.
    #[must_use]
    pub const fn new(width: f64, height: f64) -> Self {
        Self {
            width: Some(width),
            height: Some(height),
        }
    }

    /// Whether both dimensions are known.
    #[must_use]
    pub const fn is_known(&self) -> bool {
        self.width.is_some() && self.height.is_some()
    }
}

impl From<ContentRect> for ObservedSize {
    fn from(rect: ContentRect) -> Self {
        Self::new(rect.width, rect.height)
    }
}

/// One observation delivered by the host for a single element.
#[derive(Debug, Clone, PartialEq)]
pub struct ResizeEntry<E> {
    pub target: E,
    pub content_rect: ContentRect,
}

impl<E> ResizeEntry<E> {
    #[must_use]
    pub fn new(target: E, width: f64, height: f64) -> Self {
        Self {
            target,
            content_rect: ContentRect::new(width, height),
        }
    }
}
