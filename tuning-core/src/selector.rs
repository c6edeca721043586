//! Turns ranked windows into candidate delay codes.
//!
//! Each window contributes codes according to its [`WindowType`]. Arithmetic
//! is done in `i32` and reduced modulo 256 on the way out, matching the 8-bit
//! mask of the delay-line register.

use heapless::Vec;

use crate::delay::DelayCode;
use crate::window::{Window, WindowType};

/// Maximum number of candidates kept per session.
pub const MAX_CANDIDATES: usize = 9;

/// Candidate codes in preference order. The first entry is committed.
pub type SelectionList = Vec<DelayCode, MAX_CANDIDATES>;

/// Codes a single window contributes, in emission order.
#[must_use]
pub fn window_candidates(window: &Window) -> Vec<DelayCode, 3> {
    let min = i32::from(window.min());
    let max = i32::from(window.max());
    let width = i32::from(window.width());
    let mid = (min + max - 1) / 2;

    let raw: &[i32] = match window.kind() {
        WindowType::Middle => &[mid, mid + width / 4, mid - width / 4],
        WindowType::Left => &[min + width / 3, min + width / 2],
        // The second term sits below the window and wraps for windows near
        // the bottom of the axis. Kept as the hardware vendor computes it.
        WindowType::Right => &[max - width / 4, min - width / 3],
    };
    raw.iter().map(|&value| DelayCode::wrapping(value)).collect()
}

/// Builds the selection list from `windows`, which must already be ranked.
///
/// Windows narrower than `window_limit` are skipped. Emission stops as soon
/// as [`MAX_CANDIDATES`] codes are collected.
#[must_use]
pub fn select_candidates(windows: &[Window], window_limit: u16) -> SelectionList {
    let mut selection = SelectionList::new();
    for window in windows.iter().filter(|w| w.width() >= window_limit) {
        for code in window_candidates(window) {
            if selection.push(code).is_err() {
                return selection;
            }
        }
    }
    selection
}
