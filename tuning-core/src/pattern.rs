//! Reference tuning blocks and the pattern verifier.
//!
//! A tuning transfer returns a fixed block defined by the bus protocol: 64
//! bytes on a 4-bit bus and 128 bytes on an 8-bit bus. The controller reads it
//! as little-endian 32-bit words, so the references below are stored the same
//! way.

use core::fmt;

/// Data bus width used for the tuning transfer.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BusWidth {
    #[default]
    Four,
    Eight,
}

impl BusWidth {
    /// Maps a data-line count to a bus width. Anything but 8 uses the 4-bit block.
    #[must_use]
    pub const fn from_lines(lines: u8) -> Self {
        if lines == 8 { BusWidth::Eight } else { BusWidth::Four }
    }

    #[must_use]
    pub const fn lines(self) -> u8 {
        match self {
            BusWidth::Four => 4,
            BusWidth::Eight => 8,
        }
    }

    /// Reference block for this width.
    #[must_use]
    pub const fn reference(self) -> &'static [u32] {
        match self {
            BusWidth::Four => &TUNING_BLOCK_4BIT,
            BusWidth::Eight => &TUNING_BLOCK_8BIT,
        }
    }

    /// Number of words a tuning transfer yields on this width.
    #[must_use]
    pub const fn block_words(self) -> usize {
        self.reference().len()
    }
}

impl fmt::Display for BusWidth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-bit", self.lines())
    }
}

/// Largest tuning block across all widths, in words.
pub const MAX_BLOCK_WORDS: usize = TUNING_BLOCK_8BIT.len();

/// Tuning block returned on a 4-bit bus.
pub const TUNING_BLOCK_4BIT: [u32; 16] = [
    0x00ff_0fff, 0xccc3_ccff, 0xffcc_3cc3, 0xeffe_fffe,
    0xddff_dfff, 0xfbff_fbff, 0xff7f_ffbf, 0xefbd_f777,
    0xf0ff_f0ff, 0x3ccc_fc0f, 0xcfcc_33cc, 0xeeff_efff,
    0xfdff_fdff, 0xffbf_ffdf, 0xfff7_ffbb, 0xde7b_7ff7,
];

/// Tuning block returned on an 8-bit bus.
pub const TUNING_BLOCK_8BIT: [u32; 32] = [
    0xff00_ffff, 0x0000_ffff, 0xcccc_ffff, 0xcccc_33cc,
    0xcc33_33cc, 0xffff_cccc, 0xffff_eeff, 0xffee_eeff,
    0xffdd_ffff, 0xdddd_ffff, 0xbbff_ffff, 0xbbff_ffff,
    0xffff_ffbb, 0xffff_ff77, 0x77ff_7777, 0xffee_ddbb,
    0x00ff_ffff, 0x00ff_ffff, 0xccff_ff00, 0xcc33_cccc,
    0x3333_cccc, 0xffcc_cccc, 0xffee_ffff, 0xeeee_ffff,
    0xddff_ffff, 0xddff_ffff, 0xffff_ffdd, 0xffff_ffbb,
    0xffff_bbbb, 0xffff_77ff, 0xff77_77ff, 0xeedd_bb77,
];

/// Counts words in `received` that differ from the reference block for `width`.
///
/// Reference words missing from a short buffer count as mismatches, and words
/// past the end of the reference are ignored. Zero means the sample passed.
#[must_use]
pub fn count_mismatches(received: &[u32], width: BusWidth) -> usize {
    let reference = width.reference();
    let compared = reference
        .iter()
        .zip(received)
        .filter(|(expected, actual)| expected != actual)
        .count();
    compared + reference.len().saturating_sub(received.len())
}

/// Returns `true` when `received` carries the full reference block.
#[must_use]
pub fn matches(received: &[u32], width: BusWidth) -> bool {
    count_mismatches(received, width) == 0
}
