//! Single-sample tuning probe.

use core::fmt;

use crate::delay::{DelayCode, DelayLine};
use crate::host::{TransferError, TuningHost};
use crate::pattern::{self, BusWidth, MAX_BLOCK_WORDS};

/// Why a sample was rejected.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FailReason {
    /// The block arrived but `words` of it differed from the reference.
    Mismatch { words: usize },
    /// The transfer reported a non-fatal error.
    Transfer(TransferError),
}

/// Result of probing one delay code.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ProbeOutcome {
    Pass,
    Fail(FailReason),
}

impl ProbeOutcome {
    #[must_use]
    pub const fn is_pass(self) -> bool {
        matches!(self, ProbeOutcome::Pass)
    }
}

/// A transfer error that leaves the bus unusable.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct FatalBus {
    pub code: DelayCode,
    pub error: TransferError,
}

impl fmt::Display for FatalBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} while sampling at delay {}", self.error, self.code)
    }
}

/// Applies a delay, runs one tuning transfer and verifies the returned block.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TuningIssuer {
    opcode: u8,
    width: BusWidth,
}

impl TuningIssuer {
    #[must_use]
    pub const fn new(opcode: u8, width: BusWidth) -> Self {
        Self { opcode, width }
    }

    #[must_use]
    pub const fn opcode(&self) -> u8 {
        self.opcode
    }

    #[must_use]
    pub const fn width(&self) -> BusWidth {
        self.width
    }

    /// Samples the bus with the RX delay line set to `code`.
    ///
    /// A failed sample clears the controller's tuned-clock status before
    /// returning.
    ///
    /// # Errors
    ///
    /// Returns [`FatalBus`] when the transfer error is fatal. The tuned-clock
    /// status is left untouched in that case.
    pub fn probe<H>(&self, host: &mut H, code: DelayCode) -> Result<ProbeOutcome, FatalBus>
    where
        H: TuningHost + ?Sized,
    {
        host.apply_delay(DelayLine::Rx, code);

        let mut storage = [0u32; MAX_BLOCK_WORDS];
        let buffer = &mut storage[..self.width.block_words()];

        let outcome = match host.run_tuning_transfer(self.opcode, buffer) {
            Err(error) if error.is_fatal() => {
                log_warn!("tuning: fatal transfer error at delay {}", code);
                return Err(FatalBus { code, error });
            }
            Err(error) => ProbeOutcome::Fail(FailReason::Transfer(error)),
            Ok(()) => match pattern::count_mismatches(buffer, self.width) {
                0 => ProbeOutcome::Pass,
                words => ProbeOutcome::Fail(FailReason::Mismatch { words }),
            },
        };

        if !outcome.is_pass() {
            host.clear_tuned_clock_status();
        }
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::synthetic::{BandProfile, SampleResponse, SyntheticHost};

    fn host_with(profile: BandProfile) -> SyntheticHost<BandProfile> {
        SyntheticHost::new(profile)
    }

    #[test]
    fn passing_code_keeps_tuned_clock() {
        let mut host = host_with(BandProfile::all());
        let issuer = TuningIssuer::new(19, BusWidth::Four);

        let outcome = issuer.probe(&mut host, DelayCode::new(42)).unwrap();

        assert_eq!(outcome, ProbeOutcome::Pass);
        assert_eq!(host.rx_delay(), DelayCode::new(42));
        assert_eq!(host.tuned_clock_clears(), 0);
    }

    #[test]
    fn corrupted_block_fails_and_clears_tuned_clock() {
        let mut host = host_with(BandProfile::none());
        let issuer = TuningIssuer::new(21, BusWidth::Eight);

        let outcome = issuer.probe(&mut host, DelayCode::new(3)).unwrap();

        assert_eq!(
            outcome,
            ProbeOutcome::Fail(FailReason::Mismatch { words: 32 })
        );
        assert_eq!(host.tuned_clock_clears(), 1);
        assert!(!host.tuned_clock());
    }

    #[test]
    fn transfer_error_fails_even_with_good_data() {
        let mut profile = BandProfile::all();
        profile
            .set_override(
                DelayCode::new(9),
                SampleResponse::Error(TransferError::CommandCrc),
            )
            .unwrap();
        let mut host = host_with(profile);
        let issuer = TuningIssuer::new(19, BusWidth::Four);

        let outcome = issuer.probe(&mut host, DelayCode::new(9)).unwrap();

        assert_eq!(
            outcome,
            ProbeOutcome::Fail(FailReason::Transfer(TransferError::CommandCrc))
        );
        assert_eq!(host.tuned_clock_clears(), 1);
    }

    #[test]
    fn fatal_error_is_propagated() {
        let mut profile = BandProfile::all();
        profile
            .set_override(
                DelayCode::new(1),
                SampleResponse::Error(TransferError::BusFault),
            )
            .unwrap();
        let mut host = host_with(profile);
        let issuer = TuningIssuer::new(19, BusWidth::Four);

        let error = issuer.probe(&mut host, DelayCode::new(1)).unwrap_err();

        assert_eq!(
            error,
            FatalBus {
                code: DelayCode::new(1),
                error: TransferError::BusFault,
            }
        );
        assert_eq!(host.tuned_clock_clears(), 0);
    }
}
