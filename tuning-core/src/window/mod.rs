//! Passing windows and the top-K ranking kept during a sweep.

use core::fmt;

use heapless::Vec;

use crate::delay::AXIS_END;

/// Number of windows retained by the default ranker.
pub const RANKED_WINDOWS: usize = 3;

/// Ranked windows, widest first.
pub type WindowSet = Vec<Window, RANKED_WINDOWS>;

/// Position hint deciding which candidate codes a window contributes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum WindowType {
    Left,
    #[default]
    Middle,
    Right,
}

impl fmt::Display for WindowType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WindowType::Left => f.write_str("left"),
            WindowType::Middle => f.write_str("middle"),
            WindowType::Right => f.write_str("right"),
        }
    }
}

/// Contiguous run of passing codes `[min, max)`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Window {
    min: u16,
    max: u16,
    kind: WindowType,
}

impl Window {
    /// Creates a window, returning `None` unless `min < max <= 256`.
    #[must_use]
    pub const fn new(min: u16, max: u16, kind: WindowType) -> Option<Self> {
        if min < max && max <= AXIS_END {
            Some(Self { min, max, kind })
        } else {
            None
        }
    }

    #[must_use]
    pub const fn min(&self) -> u16 {
        self.min
    }

    /// Exclusive upper bound.
    #[must_use]
    pub const fn max(&self) -> u16 {
        self.max
    }

    #[must_use]
    pub const fn kind(&self) -> WindowType {
        self.kind
    }

    #[must_use]
    pub const fn width(&self) -> u16 {
        self.max - self.min
    }
}

impl fmt::Display for Window {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}, {}) width={} {}",
            self.min,
            self.max,
            self.width(),
            self.kind
        )
    }
}

/// Assigns a [`WindowType`] to a freshly discovered run.
pub trait WindowClassifier {
    fn classify(&self, min: u16, max: u16) -> WindowType;
}

/// Treats every window as [`WindowType::Middle`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MiddleOnly;

impl WindowClassifier for MiddleOnly {
    fn classify(&self, _min: u16, _max: u16) -> WindowType {
        WindowType::Middle
    }
}

/// Marks windows touching one end of the axis as [`WindowType::Left`] or
/// [`WindowType::Right`]. A window touching both ends is [`WindowType::Middle`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct EdgeAnchored;

impl WindowClassifier for EdgeAnchored {
    fn classify(&self, min: u16, max: u16) -> WindowType {
        match (min == 0, max == AXIS_END) {
            (true, false) => WindowType::Left,
            (false, true) => WindowType::Right,
            _ => WindowType::Middle,
        }
    }
}

/// Runtime-selectable classifier.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ClassifierKind {
    #[default]
    MiddleOnly,
    EdgeAnchored,
}

impl WindowClassifier for ClassifierKind {
    fn classify(&self, min: u16, max: u16) -> WindowType {
        match self {
            ClassifierKind::MiddleOnly => MiddleOnly.classify(min, max),
            ClassifierKind::EdgeAnchored => EdgeAnchored.classify(min, max),
        }
    }
}

impl fmt::Display for ClassifierKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClassifierKind::MiddleOnly => f.write_str("middle"),
            ClassifierKind::EdgeAnchored => f.write_str("edge"),
        }
    }
}

/// Keeps the `K` widest windows seen so far, widest first.
///
/// A window displaces only strictly narrower entries, so among equal widths
/// the one discovered first ranks higher.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct WindowRanker<const K: usize = RANKED_WINDOWS> {
    windows: Vec<Window, K>,
}

impl<const K: usize> WindowRanker<K> {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            windows: Vec::new(),
        }
    }

    /// Offers `window` to the ranking. Returns its rank, or `None` when it
    /// did not make the cut.
    pub fn offer(&mut self, window: Window) -> Option<usize> {
        let rank = self
            .windows
            .iter()
            .position(|existing| existing.width() < window.width())
            .unwrap_or(self.windows.len());

        if rank >= K {
            return None;
        }
        if self.windows.is_full() {
            self.windows.pop();
        }
        self.windows.insert(rank, window).ok()?;
        Some(rank)
    }

    #[must_use]
    pub fn windows(&self) -> &[Window] {
        &self.windows
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.windows.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.windows.is_empty()
    }

    #[must_use]
    pub fn into_windows(self) -> Vec<Window, K> {
        self.windows
    }
}
