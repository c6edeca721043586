//! Profile-driven controller model.
//!
//! [`SyntheticHost`] keeps the handful of registers the tuning engine touches
//! and answers each tuning transfer by asking a [`ProbeProfile`] how a sample
//! taken at the current RX delay behaves.

use core::fmt;

use heapless::Vec;

use super::{BusMode, IrqMask, TransferError, TransferMode, TuningHost};
use crate::delay::{AXIS_END, DelayCode, DelayLine};
use crate::pattern::{BusWidth, TUNING_BLOCK_4BIT, TUNING_BLOCK_8BIT};

/// Maximum number of pass bands a [`BandProfile`] tracks.
pub const MAX_BANDS: usize = 8;
/// Maximum number of individually overridden codes in a [`BandProfile`].
pub const MAX_OVERRIDES: usize = 8;

/// Behaviour of one sample at a given delay.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SampleResponse {
    /// The block arrives intact.
    Pass,
    /// The transfer completes but the block is damaged.
    Corrupt,
    /// The transfer itself fails.
    Error(TransferError),
}

/// Source of per-delay sample behaviour.
pub trait ProbeProfile {
    fn sample(&self, code: DelayCode) -> SampleResponse;
}

impl<F> ProbeProfile for F
where
    F: Fn(DelayCode) -> SampleResponse,
{
    fn sample(&self, code: DelayCode) -> SampleResponse {
        self(code)
    }
}

/// Errors raised while building a [`BandProfile`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProfileError {
    EmptyBand { start: u16, end: u16 },
    OutOfRange { end: u16 },
    Full,
}

impl fmt::Display for ProfileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProfileError::EmptyBand { start, end } => {
                write!(f, "band {start}..{end} is empty")
            }
            ProfileError::OutOfRange { end } => {
                write!(f, "band end {end} is past the delay axis ({AXIS_END})")
            }
            ProfileError::Full => f.write_str("profile has no room for more entries"),
        }
    }
}

/// Pass bands plus a few codes that misbehave in specific ways.
///
/// Codes inside a band pass, everything else yields a corrupted block.
/// Overrides take precedence over bands.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BandProfile {
    bands: Vec<(u16, u16), MAX_BANDS>,
    overrides: Vec<(DelayCode, SampleResponse), MAX_OVERRIDES>,
}

impl BandProfile {
    /// A profile where no code passes.
    #[must_use]
    pub const fn none() -> Self {
        Self {
            bands: Vec::new(),
            overrides: Vec::new(),
        }
    }

    /// A profile where every code passes.
    #[must_use]
    pub fn all() -> Self {
        let mut profile = Self::none();
        // A single band into an empty profile always fits.
        let _ = profile.bands.push((0, AXIS_END));
        profile
    }

    /// Builds a profile from `[start, end)` pass bands.
    ///
    /// # Errors
    ///
    /// Propagates the first [`ProfileError`] raised by [`Self::push_band`].
    pub fn from_bands(bands: &[(u16, u16)]) -> Result<Self, ProfileError> {
        let mut profile = Self::none();
        for &(start, end) in bands {
            profile.push_band(start, end)?;
        }
        Ok(profile)
    }

    /// Adds a `[start, end)` pass band.
    ///
    /// # Errors
    ///
    /// Rejects empty bands, bands reaching past the axis end, and bands beyond
    /// [`MAX_BANDS`].
    pub fn push_band(&mut self, start: u16, end: u16) -> Result<(), ProfileError> {
        if start >= end {
            return Err(ProfileError::EmptyBand { start, end });
        }
        if end > AXIS_END {
            return Err(ProfileError::OutOfRange { end });
        }
        self.bands.push((start, end)).map_err(|_| ProfileError::Full)
    }

    /// Forces `code` to answer with `response`.
    ///
    /// # Errors
    ///
    /// Returns [`ProfileError::Full`] when [`MAX_OVERRIDES`] codes are already set.
    pub fn set_override(
        &mut self,
        code: DelayCode,
        response: SampleResponse,
    ) -> Result<(), ProfileError> {
        if let Some(slot) = self.overrides.iter_mut().find(|(existing, _)| *existing == code) {
            slot.1 = response;
            return Ok(());
        }
        self.overrides
            .push((code, response))
            .map_err(|_| ProfileError::Full)
    }

    #[must_use]
    pub fn bands(&self) -> &[(u16, u16)] {
        &self.bands
    }

    #[must_use]
    pub fn overrides(&self) -> &[(DelayCode, SampleResponse)] {
        &self.overrides
    }
}

impl ProbeProfile for BandProfile {
    fn sample(&self, code: DelayCode) -> SampleResponse {
        if let Some((_, response)) = self.overrides.iter().find(|(c, _)| *c == code) {
            return *response;
        }
        let position = code.position();
        if self
            .bands
            .iter()
            .any(|&(start, end)| (start..end).contains(&position))
        {
            SampleResponse::Pass
        } else {
            SampleResponse::Corrupt
        }
    }
}

/// Controller model answering tuning transfers from a [`ProbeProfile`].
#[derive(Debug)]
pub struct SyntheticHost<P> {
    profile: P,
    rx_delay: DelayCode,
    tx_delay: DelayCode,
    irq_mask: IrqMask,
    transfer_mode: TransferMode,
    tuned_clock: bool,
    rx_reference: Option<(u8, BusMode)>,
    tx_reference: Option<u8>,
    last_opcode: Option<u8>,
    probes: usize,
    tuned_clock_clears: usize,
}

impl<P: ProbeProfile> SyntheticHost<P> {
    /// Creates a host with all interrupts enabled and DMA transfers selected.
    pub const fn new(profile: P) -> Self {
        Self {
            profile,
            rx_delay: DelayCode::MIN,
            tx_delay: DelayCode::MIN,
            irq_mask: IrqMask::ALL,
            transfer_mode: TransferMode::Dma,
            tuned_clock: false,
            rx_reference: None,
            tx_reference: None,
            last_opcode: None,
            probes: 0,
            tuned_clock_clears: 0,
        }
    }

    #[must_use]
    pub fn profile(&self) -> &P {
        &self.profile
    }

    /// Swaps the profile and clears the probe counters.
    pub fn set_profile(&mut self, profile: P) {
        self.profile = profile;
        self.reset_counters();
    }

    pub fn reset_counters(&mut self) {
        self.probes = 0;
        self.tuned_clock_clears = 0;
    }

    #[must_use]
    pub const fn rx_delay(&self) -> DelayCode {
        self.rx_delay
    }

    #[must_use]
    pub const fn tx_delay(&self) -> DelayCode {
        self.tx_delay
    }

    #[must_use]
    pub const fn tuned_clock(&self) -> bool {
        self.tuned_clock
    }

    #[must_use]
    pub const fn rx_reference(&self) -> Option<(u8, BusMode)> {
        self.rx_reference
    }

    #[must_use]
    pub const fn tx_reference(&self) -> Option<u8> {
        self.tx_reference
    }

    #[must_use]
    pub const fn last_opcode(&self) -> Option<u8> {
        self.last_opcode
    }

    /// Tuning transfers issued since the counters were last reset.
    #[must_use]
    pub const fn probes(&self) -> usize {
        self.probes
    }

    #[must_use]
    pub const fn tuned_clock_clears(&self) -> usize {
        self.tuned_clock_clears
    }
}

impl<P: ProbeProfile> TuningHost for SyntheticHost<P> {
    fn apply_delay(&mut self, line: DelayLine, code: DelayCode) {
        match line {
            DelayLine::Rx => self.rx_delay = code,
            DelayLine::Tx => self.tx_delay = code,
        }
    }

    fn run_tuning_transfer(&mut self, opcode: u8, buffer: &mut [u32]) -> Result<(), TransferError> {
        self.probes += 1;
        self.last_opcode = Some(opcode);

        let block: &[u32] = if buffer.len() >= BusWidth::Eight.block_words() {
            &TUNING_BLOCK_8BIT
        } else {
            &TUNING_BLOCK_4BIT
        };

        match self.profile.sample(self.rx_delay) {
            SampleResponse::Pass => {
                for (slot, word) in buffer.iter_mut().zip(block) {
                    *slot = *word;
                }
                self.tuned_clock = true;
                Ok(())
            }
            SampleResponse::Corrupt => {
                for (slot, word) in buffer.iter_mut().zip(block) {
                    *slot = !*word;
                }
                Ok(())
            }
            SampleResponse::Error(error) => Err(error),
        }
    }

    fn irq_mask(&self) -> IrqMask {
        self.irq_mask
    }

    fn set_irq_mask(&mut self, mask: IrqMask) {
        self.irq_mask = mask;
    }

    fn clear_tuned_clock_status(&mut self) {
        self.tuned_clock = false;
        self.tuned_clock_clears += 1;
    }

    fn transfer_mode(&self) -> TransferMode {
        self.transfer_mode
    }

    fn set_transfer_mode(&mut self, mode: TransferMode) {
        self.transfer_mode = mode;
    }

    fn prepare_rx_delay_line(&mut self, reference_line: u8, mode: BusMode) {
        self.rx_reference = Some((reference_line, mode));
    }

    fn prepare_tx_delay_line(&mut self, reference_line: u8) {
        self.tx_reference = Some(reference_line);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pattern::count_mismatches;

    #[test]
    fn band_profile_passes_inside_bands_only() {
        let profile = BandProfile::from_bands(&[(40, 160)]).unwrap();
        assert_eq!(profile.sample(DelayCode::new(39)), SampleResponse::Corrupt);
        assert_eq!(profile.sample(DelayCode::new(40)), SampleResponse::Pass);
        assert_eq!(profile.sample(DelayCode::new(159)), SampleResponse::Pass);
        assert_eq!(profile.sample(DelayCode::new(160)), SampleResponse::Corrupt);
    }

    #[test]
    fn overrides_win_over_bands() {
        let mut profile = BandProfile::all();
        profile
            .set_override(DelayCode::new(7), SampleResponse::Error(TransferError::DataCrc))
            .unwrap();
        assert_eq!(
            profile.sample(DelayCode::new(7)),
            SampleResponse::Error(TransferError::DataCrc)
        );
        assert_eq!(profile.sample(DelayCode::new(8)), SampleResponse::Pass);
    }

    #[test]
    fn band_validation_rejects_bad_ranges() {
        let mut profile = BandProfile::none();
        assert_eq!(
            profile.push_band(10, 10),
            Err(ProfileError::EmptyBand { start: 10, end: 10 })
        );
        assert_eq!(
            profile.push_band(10, 300),
            Err(ProfileError::OutOfRange { end: 300 })
        );
        for start in 0..8u16 {
            profile.push_band(start * 10, start * 10 + 5).unwrap();
        }
        assert_eq!(profile.push_band(100, 110), Err(ProfileError::Full));
    }

    #[test]
    fn synthetic_host_returns_block_for_current_delay() {
        let mut host = SyntheticHost::new(BandProfile::from_bands(&[(10, 20)]).unwrap());
        let mut buffer = [0u32; 32];

        host.apply_delay(DelayLine::Rx, DelayCode::new(15));
        host.run_tuning_transfer(21, &mut buffer).unwrap();
        assert_eq!(count_mismatches(&buffer, BusWidth::Eight), 0);
        assert!(host.tuned_clock());

        host.apply_delay(DelayLine::Rx, DelayCode::new(25));
        host.run_tuning_transfer(21, &mut buffer).unwrap();
        assert_eq!(count_mismatches(&buffer, BusWidth::Eight), 32);
        assert_eq!(host.probes(), 2);
        assert_eq!(host.last_opcode(), Some(21));
    }

    #[test]
    fn closures_act_as_profiles() {
        let mut host = SyntheticHost::new(|code: DelayCode| {
            if code.value() % 2 == 0 {
                SampleResponse::Pass
            } else {
                SampleResponse::Error(TransferError::DataTimeout)
            }
        });
        let mut buffer = [0u32; 16];
        host.apply_delay(DelayLine::Rx, DelayCode::new(3));
        assert_eq!(
            host.run_tuning_transfer(19, &mut buffer),
            Err(TransferError::DataTimeout)
        );
        host.apply_delay(DelayLine::Rx, DelayCode::new(4));
        assert_eq!(host.run_tuning_transfer(19, &mut buffer), Ok(()));
    }
}
