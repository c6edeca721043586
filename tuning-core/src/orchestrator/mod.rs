//! Tuning session state machine.
//!
//! [`TuningOrchestrator`] owns the controller handle and runs one session per
//! call: prepare the controller, sweep the RX delay axis, pick candidates,
//! commit the best one, and put the interrupt mask and transfer mode back no
//! matter how the session ended.

use core::fmt;

use crate::config::TuningConfig;
use crate::delay::{DelayCode, DelayLine};
use crate::host::{BusMode, IrqMask, TransferMode, TuningHost};
use crate::issuer::{FatalBus, TuningIssuer};
use crate::pattern::BusWidth;
use crate::scanner::WindowScanner;
use crate::selector::{self, SelectionList};
use crate::telemetry::{FailureKind, TuningEvent, TuningObserver};
use crate::window::{ClassifierKind, WindowClassifier, WindowSet};

/// Lifecycle of a single tuning session.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TuningState {
    #[default]
    Idle,
    Prepare,
    Scanning,
    Selecting,
    Commit,
    Done,
    Failed,
}

impl TuningState {
    /// Returns `true` once the session can no longer move.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, TuningState::Done | TuningState::Failed)
    }

    /// Legal edges of the session graph.
    #[must_use]
    pub const fn can_transition_to(self, next: TuningState) -> bool {
        matches!(
            (self, next),
            (
                TuningState::Idle,
                TuningState::Prepare | TuningState::Done
            ) | (TuningState::Prepare, TuningState::Scanning)
                | (TuningState::Scanning, TuningState::Selecting)
                | (TuningState::Selecting, TuningState::Commit)
                | (TuningState::Commit, TuningState::Done)
                | (
                    TuningState::Prepare
                        | TuningState::Scanning
                        | TuningState::Selecting
                        | TuningState::Commit,
                    TuningState::Failed
                )
        )
    }
}

impl fmt::Display for TuningState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            TuningState::Idle => "idle",
            TuningState::Prepare => "prepare",
            TuningState::Scanning => "scanning",
            TuningState::Selecting => "selecting",
            TuningState::Commit => "commit",
            TuningState::Done => "done",
            TuningState::Failed => "failed",
        };
        f.write_str(label)
    }
}

/// Error returned when the session attempts an illegal state change.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TransitionError {
    pub from: TuningState,
    pub to: TuningState,
}

impl TransitionError {
    #[must_use]
    pub const fn new(from: TuningState, to: TuningState) -> Self {
        Self { from, to }
    }
}

/// Reasons a tuning session can fail.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TuningError {
    /// The bus became unusable mid-sweep.
    FatalBus(FatalBus),
    /// No window met the width limit; fall back to a slower mode.
    NoWindowFound,
    /// Internal sequencing error.
    InvalidTransition(TransitionError),
}

impl TuningError {
    #[must_use]
    pub const fn kind(&self) -> FailureKind {
        match self {
            TuningError::FatalBus(_) => FailureKind::FatalBus,
            TuningError::NoWindowFound => FailureKind::NoWindowFound,
            TuningError::InvalidTransition(_) => FailureKind::InvalidTransition,
        }
    }
}

impl From<FatalBus> for TuningError {
    fn from(error: FatalBus) -> Self {
        TuningError::FatalBus(error)
    }
}

impl From<TransitionError> for TuningError {
    fn from(error: TransitionError) -> Self {
        TuningError::InvalidTransition(error)
    }
}

impl fmt::Display for TuningError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TuningError::FatalBus(error) => write!(f, "fatal bus error: {error}"),
            TuningError::NoWindowFound => f.write_str("no viable window"),
            TuningError::InvalidTransition(TransitionError { from, to }) => {
                write!(f, "invalid session transition {from} -> {to}")
            }
        }
    }
}

/// How a successful session ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TuningOutcome {
    /// A delay was committed to the RX line.
    Tuned,
    /// The selected mode samples reliably without tuning.
    NotRequired,
}

impl fmt::Display for TuningOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TuningOutcome::Tuned => f.write_str("tuned"),
            TuningOutcome::NotRequired => f.write_str("not-required"),
        }
    }
}

/// Summary of a successful session.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TuningReport {
    pub outcome: TuningOutcome,
    pub mode: BusMode,
    pub committed: Option<DelayCode>,
    pub candidates: SelectionList,
    pub windows: WindowSet,
    /// Passing runs seen during the sweep, qualifying or not.
    pub discovered: usize,
    pub probes: usize,
}

impl TuningReport {
    const fn not_required(mode: BusMode) -> Self {
        Self {
            outcome: TuningOutcome::NotRequired,
            mode,
            committed: None,
            candidates: SelectionList::new(),
            windows: WindowSet::new(),
            discovered: 0,
            probes: 0,
        }
    }
}

/// Per-invocation working state.
#[derive(Debug, Default)]
struct TuningSession {
    state: TuningState,
    windows: WindowSet,
    candidates: SelectionList,
    discovered: usize,
    probes: usize,
}

impl TuningSession {
    fn advance(&mut self, next: TuningState) -> Result<(), TransitionError> {
        if !self.state.can_transition_to(next) {
            return Err(TransitionError::new(self.state, next));
        }
        self.state = next;
        Ok(())
    }
}

/// Controller state saved before a sweep and restored afterwards.
#[derive(Clone, Copy, Debug)]
struct SavedContext {
    irq_mask: IrqMask,
    transfer_mode: TransferMode,
}

/// Runs tuning sessions against a single controller.
pub struct TuningOrchestrator<H, C = ClassifierKind> {
    host: H,
    config: TuningConfig,
    classifier: C,
    last_state: TuningState,
}

impl<H: TuningHost> TuningOrchestrator<H> {
    /// Creates an orchestrator that treats every window as centred.
    ///
    /// Switch classifiers through [`Self::classifier_mut`] or
    /// [`Self::with_classifier`].
    pub const fn new(host: H, config: TuningConfig) -> Self {
        Self {
            host,
            config,
            classifier: ClassifierKind::MiddleOnly,
            last_state: TuningState::Idle,
        }
    }
}

impl<H: TuningHost, C: WindowClassifier> TuningOrchestrator<H, C> {
    /// Swaps in a custom classifier.
    pub fn with_classifier<C2: WindowClassifier>(self, classifier: C2) -> TuningOrchestrator<H, C2> {
        TuningOrchestrator {
            host: self.host,
            config: self.config,
            classifier,
            last_state: self.last_state,
        }
    }

    #[must_use]
    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    #[must_use]
    pub fn into_host(self) -> H {
        self.host
    }

    #[must_use]
    pub const fn config(&self) -> &TuningConfig {
        &self.config
    }

    pub fn config_mut(&mut self) -> &mut TuningConfig {
        &mut self.config
    }

    /// Classifier used by the next sweep.
    #[must_use]
    pub const fn classifier(&self) -> &C {
        &self.classifier
    }

    pub fn classifier_mut(&mut self) -> &mut C {
        &mut self.classifier
    }

    /// State the most recent session finished in.
    #[must_use]
    pub const fn last_state(&self) -> TuningState {
        self.last_state
    }

    /// Tunes the RX delay line for `mode` without reporting events.
    ///
    /// # Errors
    ///
    /// See [`Self::execute_tuning_observed`].
    pub fn execute_tuning(
        &mut self,
        opcode: u8,
        width: BusWidth,
        mode: BusMode,
    ) -> Result<TuningReport, TuningError> {
        self.execute_tuning_observed(opcode, width, mode, &mut ())
    }

    /// Tunes the RX delay line for `mode`, reporting each step to `observer`.
    ///
    /// Modes that do not need tuning return [`TuningOutcome::NotRequired`]
    /// without touching the controller.
    ///
    /// # Errors
    ///
    /// - [`TuningError::FatalBus`] when a transfer leaves the bus unusable.
    /// - [`TuningError::NoWindowFound`] when no window meets the width limit.
    /// - [`TuningError::InvalidTransition`] on an internal sequencing fault.
    pub fn execute_tuning_observed<O>(
        &mut self,
        opcode: u8,
        width: BusWidth,
        mode: BusMode,
        observer: &mut O,
    ) -> Result<TuningReport, TuningError>
    where
        O: TuningObserver + ?Sized,
    {
        let mut session = TuningSession::default();

        if !mode.requires_tuning() {
            session.advance(TuningState::Done)?;
            self.last_state = session.state;
            log_info!("tuning: {} does not need tuning", mode);
            observer.record(TuningEvent::SessionSkipped { mode });
            return Ok(TuningReport::not_required(mode));
        }

        log_info!("tuning: start mode={} width={} opcode={}", mode, width, opcode);
        observer.record(TuningEvent::SessionStarted {
            mode,
            width,
            opcode,
        });

        let result = session
            .advance(TuningState::Prepare)
            .map_err(TuningError::from)
            .and_then(|()| {
                let saved = self.prepare(mode, observer);
                let result = self.run(&mut session, TuningIssuer::new(opcode, width), observer);
                self.restore(saved);
                result
            });

        match result {
            Ok(committed) => {
                self.last_state = session.state;
                Ok(TuningReport {
                    outcome: TuningOutcome::Tuned,
                    mode,
                    committed: Some(committed),
                    candidates: session.candidates,
                    windows: session.windows,
                    discovered: session.discovered,
                    probes: session.probes,
                })
            }
            Err(error) => {
                session.state = TuningState::Failed;
                self.last_state = session.state;
                log_warn!("tuning: session failed ({})", error);
                observer.record(TuningEvent::SessionFailed {
                    failure: error.kind(),
                });
                Err(error)
            }
        }
    }

    fn prepare<O>(&mut self, mode: BusMode, observer: &mut O) -> SavedContext
    where
        O: TuningObserver + ?Sized,
    {
        let saved = SavedContext {
            irq_mask: self.host.irq_mask(),
            transfer_mode: self.host.transfer_mode(),
        };
        self.host.set_irq_mask(IrqMask::DATA_AVAILABLE);
        self.host.set_transfer_mode(TransferMode::Pio);

        if self.config.phy_module {
            log_debug!("tuning: external phy owns tx path");
        } else {
            self.host.prepare_tx_delay_line(self.config.tx_reference_line);
            self.host.apply_delay(DelayLine::Tx, self.config.tx_delay);
            observer.record(TuningEvent::TxConfigured {
                code: self.config.tx_delay,
            });
        }

        self.host
            .prepare_rx_delay_line(self.config.rx_reference_line, mode);
        saved
    }

    fn run<O>(
        &mut self,
        session: &mut TuningSession,
        issuer: TuningIssuer,
        observer: &mut O,
    ) -> Result<DelayCode, TuningError>
    where
        O: TuningObserver + ?Sized,
    {
        session.advance(TuningState::Scanning)?;
        let scanner = WindowScanner::new(issuer, &self.classifier, self.config.window_limit);
        let summary = scanner.scan(&mut self.host, observer)?;
        session.windows = summary.windows;
        session.discovered = summary.discovered;
        session.probes = summary.probes;

        session.advance(TuningState::Selecting)?;
        session.candidates = selector::select_candidates(&session.windows, self.config.window_limit);
        let Some(&committed) = session.candidates.first() else {
            log_warn!(
                "tuning: no window of {} codes among {} found",
                self.config.window_limit,
                session.discovered
            );
            return Err(TuningError::NoWindowFound);
        };
        observer.record(TuningEvent::CandidatesSelected {
            count: u8::try_from(session.candidates.len()).unwrap_or(u8::MAX),
            first: committed,
        });

        session.advance(TuningState::Commit)?;
        self.host.apply_delay(DelayLine::Rx, committed);
        log_info!("tuning: committed rx delay {}", committed);
        observer.record(TuningEvent::DelayCommitted { code: committed });

        session.advance(TuningState::Done)?;
        Ok(committed)
    }

    fn restore(&mut self, saved: SavedContext) {
        self.host.set_transfer_mode(saved.transfer_mode);
        self.host.set_irq_mask(saved.irq_mask);
    }
}
