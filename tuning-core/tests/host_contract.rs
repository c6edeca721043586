use heapless::Vec as HeaplessVec;

use tuning_core::host::{IrqMask, TransferError, TransferMode, TuningHost};
use tuning_core::pattern::TUNING_BLOCK_4BIT;
use tuning_core::{
    BusMode, BusWidth, DelayCode, DelayLine, TuningConfig, TuningError, TuningOrchestrator,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum HostOp {
    Delay(DelayLine, u8),
    Transfer(u8),
    SetIrqMask(IrqMask),
    ClearTunedClock,
    SetTransferMode(TransferMode),
    PrepareRx(u8, BusMode),
    PrepareTx(u8),
}

/// Records every register-level call and answers transfers from a closure.
struct RecordingHost<F> {
    answer: F,
    rx_delay: u8,
    irq_mask: IrqMask,
    transfer_mode: TransferMode,
    ops: HeaplessVec<HostOp, 1024>,
}

impl<F> RecordingHost<F>
where
    F: Fn(u8) -> Result<bool, TransferError>,
{
    fn new(answer: F) -> Self {
        Self {
            answer,
            rx_delay: 0,
            irq_mask: IrqMask::ALL,
            transfer_mode: TransferMode::Dma,
            ops: HeaplessVec::new(),
        }
    }

    fn log(&mut self, op: HostOp) {
        self.ops.push(op).expect("op log overflow");
    }

    fn setup_ops(&self) -> &[HostOp] {
        let end = self
            .ops
            .iter()
            .position(|op| matches!(op, HostOp::Transfer(_)))
            .unwrap_or(self.ops.len());
        &self.ops[..end]
    }

    fn count(&self, predicate: impl Fn(&HostOp) -> bool) -> usize {
        self.ops.iter().filter(|op| predicate(op)).count()
    }
}

impl<F> TuningHost for RecordingHost<F>
where
    F: Fn(u8) -> Result<bool, TransferError>,
{
    fn apply_delay(&mut self, line: DelayLine, code: DelayCode) {
        if line == DelayLine::Rx {
            self.rx_delay = code.value();
        }
        self.log(HostOp::Delay(line, code.value()));
    }

    fn run_tuning_transfer(&mut self, opcode: u8, buffer: &mut [u32]) -> Result<(), TransferError> {
        self.log(HostOp::Transfer(opcode));
        let good = (self.answer)(self.rx_delay)?;
        for (slot, word) in buffer.iter_mut().zip(TUNING_BLOCK_4BIT.iter()) {
            *slot = if good { *word } else { 0 };
        }
        Ok(())
    }

    fn irq_mask(&self) -> IrqMask {
        self.irq_mask
    }

    fn set_irq_mask(&mut self, mask: IrqMask) {
        self.irq_mask = mask;
        self.log(HostOp::SetIrqMask(mask));
    }

    fn clear_tuned_clock_status(&mut self) {
        self.log(HostOp::ClearTunedClock);
    }

    fn transfer_mode(&self) -> TransferMode {
        self.transfer_mode
    }

    fn set_transfer_mode(&mut self, mode: TransferMode) {
        self.transfer_mode = mode;
        self.log(HostOp::SetTransferMode(mode));
    }

    fn prepare_rx_delay_line(&mut self, reference_line: u8, mode: BusMode) {
        self.log(HostOp::PrepareRx(reference_line, mode));
    }

    fn prepare_tx_delay_line(&mut self, reference_line: u8) {
        self.log(HostOp::PrepareTx(reference_line));
    }
}

fn band(start: u8, end: u16) -> impl Fn(u8) -> Result<bool, TransferError> {
    move |code| Ok((u16::from(start)..end).contains(&u16::from(code)))
}

#[test]
fn preparation_masks_irqs_forces_pio_and_configures_delay_lines() {
    let mut host = RecordingHost::new(band(40, 160));
    let mut orchestrator = TuningOrchestrator::new(&mut host, TuningConfig::default());

    orchestrator
        .execute_tuning(19, BusWidth::Four, BusMode::UhsSdr104)
        .unwrap();
    drop(orchestrator);

    assert_eq!(
        host.setup_ops(),
        &[
            HostOp::SetIrqMask(IrqMask::DATA_AVAILABLE),
            HostOp::SetTransferMode(TransferMode::Pio),
            HostOp::PrepareTx(0x00),
            HostOp::Delay(DelayLine::Tx, 127),
            HostOp::PrepareRx(0x09, BusMode::UhsSdr104),
            HostOp::Delay(DelayLine::Rx, 0),
        ]
    );
}

#[test]
fn commit_and_restore_close_the_session() {
    let mut host = RecordingHost::new(band(40, 160));
    let saved = IrqMask::COMMAND_COMPLETE.union(IrqMask::TRANSFER_COMPLETE);
    host.irq_mask = saved;
    let mut orchestrator = TuningOrchestrator::new(&mut host, TuningConfig::default());

    orchestrator
        .execute_tuning(19, BusWidth::Four, BusMode::UhsSdr104)
        .unwrap();
    drop(orchestrator);

    let tail = &host.ops[host.ops.len() - 3..];
    assert_eq!(
        tail,
        &[
            HostOp::Delay(DelayLine::Rx, 99),
            HostOp::SetTransferMode(TransferMode::Dma),
            HostOp::SetIrqMask(saved),
        ]
    );
    assert_eq!(host.count(|op| matches!(op, HostOp::PrepareTx(_))), 1);
}

#[test]
fn every_failed_sample_clears_tuned_clock() {
    let mut host = RecordingHost::new(band(40, 160));
    let mut orchestrator = TuningOrchestrator::new(&mut host, TuningConfig::default());

    orchestrator
        .execute_tuning(19, BusWidth::Four, BusMode::UhsSdr104)
        .unwrap();
    drop(orchestrator);

    let transfers = host.count(|op| matches!(op, HostOp::Transfer(19)));
    let clears = host.count(|op| *op == HostOp::ClearTunedClock);
    assert_eq!(transfers, 256);
    assert_eq!(clears, 256 - 120);
}

#[test]
fn transfer_errors_count_as_failed_samples() {
    let mut host = RecordingHost::new(|code: u8| {
        if code == 100 {
            Err(TransferError::DataCrc)
        } else {
            Ok((40..160).contains(&code))
        }
    });
    let mut orchestrator = TuningOrchestrator::new(&mut host, TuningConfig::default());

    let error = orchestrator
        .execute_tuning(19, BusWidth::Four, BusMode::UhsSdr104)
        .unwrap_err();

    // [40, 100) and [101, 160) are both narrower than 80.
    assert_eq!(error, TuningError::NoWindowFound);
}

#[test]
fn fatal_error_aborts_and_still_restores() {
    let mut host = RecordingHost::new(|code: u8| {
        if code == 50 {
            Err(TransferError::BusFault)
        } else {
            Ok(true)
        }
    });
    let mut orchestrator = TuningOrchestrator::new(&mut host, TuningConfig::default());

    let error = orchestrator
        .execute_tuning(19, BusWidth::Four, BusMode::UhsSdr104)
        .unwrap_err();
    drop(orchestrator);

    let TuningError::FatalBus(fatal) = error else {
        panic!("expected a fatal bus error, got {error:?}");
    };
    assert_eq!(fatal.code, DelayCode::new(50));
    assert_eq!(fatal.error, TransferError::BusFault);
    assert_eq!(host.count(|op| matches!(op, HostOp::Transfer(_))), 51);
    assert_eq!(host.irq_mask, IrqMask::ALL);
    assert_eq!(host.transfer_mode, TransferMode::Dma);
    let last_rx = host.ops.iter().rev().find_map(|op| match op {
        HostOp::Delay(DelayLine::Rx, code) => Some(*code),
        _ => None,
    });
    assert_eq!(last_rx, Some(50));
}

#[test]
fn external_phy_skips_tx_configuration() {
    let mut host = RecordingHost::new(band(0, 256));
    let config = TuningConfig::default().with_phy_module(true);
    let mut orchestrator = TuningOrchestrator::new(&mut host, config);

    orchestrator
        .execute_tuning(21, BusWidth::Four, BusMode::Hs200)
        .unwrap();
    drop(orchestrator);

    assert_eq!(host.count(|op| matches!(op, HostOp::PrepareTx(_))), 0);
    assert_eq!(
        host.count(|op| matches!(op, HostOp::Delay(DelayLine::Tx, _))),
        0
    );
    assert_eq!(host.count(|op| matches!(op, HostOp::Transfer(21))), 256);
}
