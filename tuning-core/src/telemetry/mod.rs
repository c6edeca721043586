//! Tuning event catalog and the bounded recorder that keeps recent history.
//!
//! Every session step the orchestrator takes is reported to a
//! [`TuningObserver`] as a [`TuningEvent`]. Each event maps to a compact
//! numeric code ([`TuningEventKind::to_raw`]) so host tooling can mirror the
//! history over a diagnostics channel without shipping full payloads.

use core::fmt;

use heapless::HistoryBuf;

use crate::delay::DelayCode;
use crate::host::BusMode;
use crate::pattern::BusWidth;
use crate::window::Window;

/// Total number of records retained by [`TelemetryRecorder`].
pub const TELEMETRY_RING_CAPACITY: usize = 64;

/// Monotonic identifier assigned to each record.
pub type EventId = u32;

/// Coarse reason a session ended in failure.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FailureKind {
    FatalBus,
    NoWindowFound,
    InvalidTransition,
}

impl FailureKind {
    const fn index(self) -> u16 {
        match self {
            FailureKind::FatalBus => 0,
            FailureKind::NoWindowFound => 1,
            FailureKind::InvalidTransition => 2,
        }
    }

    const fn from_index(index: u16) -> Option<Self> {
        match index {
            0 => Some(FailureKind::FatalBus),
            1 => Some(FailureKind::NoWindowFound),
            2 => Some(FailureKind::InvalidTransition),
            _ => None,
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureKind::FatalBus => f.write_str("fatal-bus"),
            FailureKind::NoWindowFound => f.write_str("no-window"),
            FailureKind::InvalidTransition => f.write_str("invalid-transition"),
        }
    }
}

/// Something that happened during a tuning session.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TuningEvent {
    SessionStarted {
        mode: BusMode,
        width: BusWidth,
        opcode: u8,
    },
    /// The mode does not need tuning; hardware was left alone.
    SessionSkipped { mode: BusMode },
    TxConfigured { code: DelayCode },
    WindowObserved { window: Window, qualified: bool },
    WindowRanked { window: Window, rank: u8 },
    CandidatesSelected { count: u8, first: DelayCode },
    DelayCommitted { code: DelayCode },
    SessionFailed { failure: FailureKind },
}

impl TuningEvent {
    #[must_use]
    pub const fn kind(&self) -> TuningEventKind {
        match self {
            TuningEvent::SessionStarted { .. } => TuningEventKind::SessionStarted,
            TuningEvent::SessionSkipped { .. } => TuningEventKind::SessionSkipped,
            TuningEvent::TxConfigured { .. } => TuningEventKind::TxConfigured,
            TuningEvent::WindowObserved { .. } => TuningEventKind::WindowObserved,
            TuningEvent::WindowRanked { .. } => TuningEventKind::WindowRanked,
            TuningEvent::CandidatesSelected { .. } => TuningEventKind::CandidatesSelected,
            TuningEvent::DelayCommitted { .. } => TuningEventKind::DelayCommitted,
            TuningEvent::SessionFailed { failure } => TuningEventKind::SessionFailed(*failure),
        }
    }
}

impl fmt::Display for TuningEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TuningEvent::SessionStarted {
                mode,
                width,
                opcode,
            } => write!(f, "session-started mode={mode} width={width} opcode={opcode}"),
            TuningEvent::SessionSkipped { mode } => write!(f, "session-skipped mode={mode}"),
            TuningEvent::TxConfigured { code } => write!(f, "tx-configured delay={code}"),
            TuningEvent::WindowObserved { window, qualified } => {
                write!(f, "window-observed {window} qualified={qualified}")
            }
            TuningEvent::WindowRanked { window, rank } => {
                write!(f, "window-ranked #{rank} {window}")
            }
            TuningEvent::CandidatesSelected { count, first } => {
                write!(f, "candidates-selected count={count} first={first}")
            }
            TuningEvent::DelayCommitted { code } => write!(f, "delay-committed {code}"),
            TuningEvent::SessionFailed { failure } => write!(f, "session-failed {failure}"),
        }
    }
}

/// Payload-free discriminant of a [`TuningEvent`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TuningEventKind {
    SessionStarted,
    SessionSkipped,
    TxConfigured,
    WindowObserved,
    WindowRanked,
    CandidatesSelected,
    DelayCommitted,
    SessionFailed(FailureKind),
    Custom(u16),
}

impl TuningEventKind {
    const SESSION_STARTED_CODE: u16 = 0x0001;
    const SESSION_SKIPPED_CODE: u16 = 0x0002;
    const TX_CONFIGURED_CODE: u16 = 0x0003;
    const WINDOW_OBSERVED_CODE: u16 = 0x0004;
    const WINDOW_RANKED_CODE: u16 = 0x0005;
    const CANDIDATES_SELECTED_CODE: u16 = 0x0006;
    const DELAY_COMMITTED_CODE: u16 = 0x0007;
    const SESSION_FAILED_BASE: u16 = 0x0010;

    /// Encodes the kind into a compact transport-friendly discriminant.
    #[must_use]
    pub const fn to_raw(self) -> u16 {
        match self {
            TuningEventKind::SessionStarted => Self::SESSION_STARTED_CODE,
            TuningEventKind::SessionSkipped => Self::SESSION_SKIPPED_CODE,
            TuningEventKind::TxConfigured => Self::TX_CONFIGURED_CODE,
            TuningEventKind::WindowObserved => Self::WINDOW_OBSERVED_CODE,
            TuningEventKind::WindowRanked => Self::WINDOW_RANKED_CODE,
            TuningEventKind::CandidatesSelected => Self::CANDIDATES_SELECTED_CODE,
            TuningEventKind::DelayCommitted => Self::DELAY_COMMITTED_CODE,
            TuningEventKind::SessionFailed(failure) => Self::SESSION_FAILED_BASE + failure.index(),
            TuningEventKind::Custom(code) => code,
        }
    }

    /// Decodes a raw discriminant, falling back to [`TuningEventKind::Custom`].
    #[must_use]
    pub const fn from_raw(code: u16) -> Self {
        match code {
            Self::SESSION_STARTED_CODE => TuningEventKind::SessionStarted,
            Self::SESSION_SKIPPED_CODE => TuningEventKind::SessionSkipped,
            Self::TX_CONFIGURED_CODE => TuningEventKind::TxConfigured,
            Self::WINDOW_OBSERVED_CODE => TuningEventKind::WindowObserved,
            Self::WINDOW_RANKED_CODE => TuningEventKind::WindowRanked,
            Self::CANDIDATES_SELECTED_CODE => TuningEventKind::CandidatesSelected,
            Self::DELAY_COMMITTED_CODE => TuningEventKind::DelayCommitted,
            value if value >= Self::SESSION_FAILED_BASE => {
                match FailureKind::from_index(value - Self::SESSION_FAILED_BASE) {
                    Some(failure) => TuningEventKind::SessionFailed(failure),
                    None => TuningEventKind::Custom(value),
                }
            }
            other => TuningEventKind::Custom(other),
        }
    }
}

/// Receives session events as they happen.
pub trait TuningObserver {
    fn record(&mut self, event: TuningEvent);
}

/// Discards every event.
impl TuningObserver for () {
    fn record(&mut self, _event: TuningEvent) {}
}

impl<T: TuningObserver + ?Sized> TuningObserver for &mut T {
    fn record(&mut self, event: TuningEvent) {
        (**self).record(event);
    }
}

/// Record stored in the telemetry ring.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TuningRecord {
    pub id: EventId,
    pub event: TuningEvent,
}

/// Keeps the most recent tuning events in a fixed-size ring.
pub struct TelemetryRecorder<const CAPACITY: usize = TELEMETRY_RING_CAPACITY> {
    ring: HistoryBuf<TuningRecord, CAPACITY>,
    next_event_id: EventId,
}

impl<const CAPACITY: usize> TelemetryRecorder<CAPACITY> {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            ring: HistoryBuf::new(),
            next_event_id: 0,
        }
    }

    /// Iterates over retained records, oldest first.
    pub fn oldest_first(&self) -> impl Iterator<Item = &TuningRecord> + '_ {
        self.ring.oldest_ordered()
    }

    #[must_use]
    pub fn latest(&self) -> Option<&TuningRecord> {
        self.ring.recent()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.ring.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ring.is_empty()
    }

    /// Total events ever recorded, including those the ring has dropped.
    #[must_use]
    pub const fn total_recorded(&self) -> EventId {
        self.next_event_id
    }

    /// Counts retained records of the given kind.
    #[must_use]
    pub fn count(&self, kind: TuningEventKind) -> usize {
        self.ring
            .oldest_ordered()
            .filter(|record| record.event.kind() == kind)
            .count()
    }

    pub fn clear(&mut self) {
        self.ring.clear();
    }

    fn push(&mut self, event: TuningEvent) -> EventId {
        let id = self.next_event_id;
        self.next_event_id = self.next_event_id.wrapping_add(1);
        self.ring.write(TuningRecord { id, event });
        id
    }
}

impl<const CAPACITY: usize> Default for TelemetryRecorder<CAPACITY> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const CAPACITY: usize> TuningObserver for TelemetryRecorder<CAPACITY> {
    fn record(&mut self, event: TuningEvent) {
        self.push(event);
    }
}
