//! Delay-code primitives shared by the scanner, selector and host seam.
//!
//! The RX delay line exposes a single 8-bit code, so the axis is the closed
//! range `0..=255` with a step of one. Window bounds are exclusive on the
//! upper side and may reach [`AXIS_END`], which is why axis positions are
//! carried as `u16` while committed codes stay `u8`.

use core::fmt;

/// First probe position on the delay axis.
pub const AXIS_MIN: u16 = 0;
/// Last probe position on the delay axis.
pub const AXIS_MAX: u16 = 255;
/// Exclusive end of the delay axis.
pub const AXIS_END: u16 = AXIS_MAX + 1;

/// Delay line selected when applying a code.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DelayLine {
    Rx,
    Tx,
}

impl fmt::Display for DelayLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DelayLine::Rx => f.write_str("rx"),
            DelayLine::Tx => f.write_str("tx"),
        }
    }
}

/// Sampling delay applied to a delay line.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DelayCode(u8);

impl DelayCode {
    pub const MIN: Self = Self(0);
    pub const MAX: Self = Self(u8::MAX);

    #[must_use]
    pub const fn new(code: u8) -> Self {
        Self(code)
    }

    /// Converts an axis position into a code, rejecting positions past [`AXIS_MAX`].
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub const fn from_axis(position: u16) -> Option<Self> {
        if position > AXIS_MAX {
            None
        } else {
            Some(Self(position as u8))
        }
    }

    /// Reduces an arbitrary signed offset modulo the 8-bit register width.
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub const fn wrapping(value: i32) -> Self {
        Self(value.rem_euclid(256) as u8)
    }

    #[must_use]
    pub const fn value(self) -> u8 {
        self.0
    }

    /// Axis position of this code.
    #[must_use]
    pub const fn position(self) -> u16 {
        self.0 as u16
    }
}

impl From<u8> for DelayCode {
    fn from(code: u8) -> Self {
        Self(code)
    }
}

impl From<DelayCode> for u8 {
    fn from(code: DelayCode) -> Self {
        code.0
    }
}

impl fmt::Display for DelayCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
