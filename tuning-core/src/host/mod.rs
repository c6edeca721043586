//! Controller seam consumed by the tuning engine.
//!
//! [`TuningHost`] is the only way the engine reaches the controller. Real
//! drivers implement it over their register blocks; [`synthetic::SyntheticHost`]
//! implements it over a pass/fail profile for tests and the emulator.

pub mod synthetic;

use core::fmt;

use crate::delay::{DelayCode, DelayLine};

/// `SEND_TUNING_BLOCK`, used by SD cards in UHS modes.
pub const OPCODE_SEND_TUNING_BLOCK: u8 = 19;
/// `SEND_TUNING_BLOCK_HS200`, used by eMMC devices.
pub const OPCODE_SEND_TUNING_BLOCK_HS200: u8 = 21;

/// Interrupt-enable mask as seen by the controller.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct IrqMask(u32);

impl IrqMask {
    pub const NONE: Self = Self(0);
    pub const COMMAND_COMPLETE: Self = Self(1 << 0);
    pub const TRANSFER_COMPLETE: Self = Self(1 << 1);
    pub const DMA_END: Self = Self(1 << 3);
    pub const SPACE_AVAILABLE: Self = Self(1 << 4);
    /// Buffer-read-ready. The only source left enabled during a sweep.
    pub const DATA_AVAILABLE: Self = Self(1 << 5);
    pub const CARD_INSERT: Self = Self(1 << 6);
    pub const CARD_REMOVE: Self = Self(1 << 7);
    pub const ALL: Self = Self(u32::MAX);

    #[must_use]
    pub const fn from_bits(bits: u32) -> Self {
        Self(bits)
    }

    #[must_use]
    pub const fn bits(self) -> u32 {
        self.0
    }

    #[must_use]
    pub const fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }

    #[must_use]
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }
}

impl fmt::Display for IrqMask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#010x}", self.0)
    }
}

/// Data path used for block transfers.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TransferMode {
    #[default]
    Dma,
    Pio,
}

impl fmt::Display for TransferMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransferMode::Dma => f.write_str("dma"),
            TransferMode::Pio => f.write_str("pio"),
        }
    }
}

/// Failure reported by a single tuning transfer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TransferError {
    CommandTimeout,
    CommandCrc,
    DataTimeout,
    DataCrc,
    DataEndBit,
    /// Controller stopped responding; the bus cannot be used any more.
    BusFault,
    /// Card disappeared mid-sweep.
    CardRemoved,
}

impl TransferError {
    /// Fatal errors abort the session instead of counting as a failed sample.
    #[must_use]
    pub const fn is_fatal(self) -> bool {
        matches!(self, TransferError::BusFault | TransferError::CardRemoved)
    }
}

impl fmt::Display for TransferError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            TransferError::CommandTimeout => "command timeout",
            TransferError::CommandCrc => "command crc error",
            TransferError::DataTimeout => "data timeout",
            TransferError::DataCrc => "data crc error",
            TransferError::DataEndBit => "data end-bit error",
            TransferError::BusFault => "bus fault",
            TransferError::CardRemoved => "card removed",
        };
        f.write_str(label)
    }
}

/// Bus timing selected for the link.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BusMode {
    #[default]
    Legacy,
    SdHighSpeed,
    UhsSdr12,
    UhsSdr25,
    UhsSdr50,
    UhsSdr104,
    UhsDdr50,
    MmcHighSpeed,
    Hs200,
    Hs400,
}

impl BusMode {
    pub const ALL: [BusMode; 10] = [
        BusMode::Legacy,
        BusMode::SdHighSpeed,
        BusMode::UhsSdr12,
        BusMode::UhsSdr25,
        BusMode::UhsSdr50,
        BusMode::UhsSdr104,
        BusMode::UhsDdr50,
        BusMode::MmcHighSpeed,
        BusMode::Hs200,
        BusMode::Hs400,
    ];

    /// Modes whose sampling point must be calibrated before use.
    #[must_use]
    pub const fn requires_tuning(self) -> bool {
        matches!(self, BusMode::UhsSdr50 | BusMode::UhsSdr104 | BusMode::Hs200)
    }

    #[must_use]
    pub const fn is_mmc(self) -> bool {
        matches!(self, BusMode::MmcHighSpeed | BusMode::Hs200 | BusMode::Hs400)
    }

    /// Opcode the card expects for a tuning transfer in this mode.
    #[must_use]
    pub const fn tuning_opcode(self) -> u8 {
        if self.is_mmc() {
            OPCODE_SEND_TUNING_BLOCK_HS200
        } else {
            OPCODE_SEND_TUNING_BLOCK
        }
    }

    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            BusMode::Legacy => "legacy",
            BusMode::SdHighSpeed => "sd-hs",
            BusMode::UhsSdr12 => "sdr12",
            BusMode::UhsSdr25 => "sdr25",
            BusMode::UhsSdr50 => "sdr50",
            BusMode::UhsSdr104 => "sdr104",
            BusMode::UhsDdr50 => "ddr50",
            BusMode::MmcHighSpeed => "mmc-hs",
            BusMode::Hs200 => "hs200",
            BusMode::Hs400 => "hs400",
        }
    }

    /// Looks a mode up by its [`label`](Self::label), ignoring ASCII case.
    #[must_use]
    pub fn from_label(label: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|mode| mode.label().eq_ignore_ascii_case(label))
    }
}

impl fmt::Display for BusMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Register-level operations the tuning engine needs from a controller.
///
/// Implementations are held by `&mut` for a whole session, so a single
/// controller can never run two sweeps at once.
pub trait TuningHost {
    /// Programs `code` into the given delay line.
    fn apply_delay(&mut self, line: DelayLine, code: DelayCode);

    /// Issues one tuning command and reads the returned block into `buffer`.
    ///
    /// # Errors
    ///
    /// Returns the controller's view of a failed command or data phase.
    fn run_tuning_transfer(&mut self, opcode: u8, buffer: &mut [u32]) -> Result<(), TransferError>;

    fn irq_mask(&self) -> IrqMask;

    fn set_irq_mask(&mut self, mask: IrqMask);

    /// Drops the controller's "sampling clock tuned" status after a failed sample.
    fn clear_tuned_clock_status(&mut self);

    fn transfer_mode(&self) -> TransferMode;

    fn set_transfer_mode(&mut self, mode: TransferMode);

    /// Powers the RX delay line and selects its reference line for `mode`.
    fn prepare_rx_delay_line(&mut self, reference_line: u8, mode: BusMode);

    /// Powers the TX delay line and selects its reference line.
    fn prepare_tx_delay_line(&mut self, reference_line: u8);
}

impl<T: TuningHost + ?Sized> TuningHost for &mut T {
    fn apply_delay(&mut self, line: DelayLine, code: DelayCode) {
        (**self).apply_delay(line, code);
    }

    fn run_tuning_transfer(&mut self, opcode: u8, buffer: &mut [u32]) -> Result<(), TransferError> {
        (**self).run_tuning_transfer(opcode, buffer)
    }

    fn irq_mask(&self) -> IrqMask {
        (**self).irq_mask()
    }

    fn set_irq_mask(&mut self, mask: IrqMask) {
        (**self).set_irq_mask(mask);
    }

    fn clear_tuned_clock_status(&mut self) {
        (**self).clear_tuned_clock_status();
    }

    fn transfer_mode(&self) -> TransferMode {
        (**self).transfer_mode()
    }

    fn set_transfer_mode(&mut self, mode: TransferMode) {
        (**self).set_transfer_mode(mode);
    }

    fn prepare_rx_delay_line(&mut self, reference_line: u8, mode: BusMode) {
        (**self).prepare_rx_delay_line(reference_line, mode);
    }

    fn prepare_tx_delay_line(&mut self, reference_line: u8) {
        (**self).prepare_tx_delay_line(reference_line);
    }
}
