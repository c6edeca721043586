//! Text rendering for the console `status` command and tuning reports.
//!
//! Front-ends write into any [`fmt::Write`] sink so the firmware console and
//! the emulator print identical lines.

use core::fmt;

use crate::config::TuningConfig;
use crate::delay::DelayCode;
use crate::host::BusMode;
use crate::orchestrator::{TuningError, TuningOutcome, TuningReport, TuningState};
use crate::selector::SelectionList;
use crate::window::{ClassifierKind, Window};

/// Result of the most recent `tune` command.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum LastSession {
    #[default]
    None,
    Tuned {
        committed: DelayCode,
        candidates: SelectionList,
        windows: usize,
        probes: usize,
    },
    NotRequired(BusMode),
    Failed(TuningError),
}

impl LastSession {
    #[must_use]
    pub fn from_result(result: &Result<TuningReport, TuningError>) -> Self {
        match result {
            Ok(report) => match (report.outcome, report.committed) {
                (TuningOutcome::Tuned, Some(committed)) => LastSession::Tuned {
                    committed,
                    candidates: report.candidates.clone(),
                    windows: report.windows.len(),
                    probes: report.probes,
                },
                _ => LastSession::NotRequired(report.mode),
            },
            Err(error) => LastSession::Failed(*error),
        }
    }
}

/// Everything the `status` command reports.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StatusSnapshot {
    pub config: TuningConfig,
    pub classifier: ClassifierKind,
    pub state: TuningState,
    pub last: LastSession,
    pub events_recorded: u32,
}

/// Renders a [`StatusSnapshot`] into human-readable lines.
#[derive(Clone, Copy, Debug)]
pub struct StatusFormatter<'a> {
    snapshot: &'a StatusSnapshot,
}

impl<'a> StatusFormatter<'a> {
    #[must_use]
    pub const fn new(snapshot: &'a StatusSnapshot) -> Self {
        Self { snapshot }
    }

    /// Writes the configuration line
    /// (e.g. `config window-limit=80 classifier=middle rx-ref=0x09 tx-ref=0x00 tx-delay=127 phy-module=no`).
    ///
    /// # Errors
    ///
    /// Propagates any error reported by `writer`.
    pub fn write_config_line<W: fmt::Write>(&self, writer: &mut W) -> fmt::Result {
        let config = &self.snapshot.config;
        write!(
            writer,
            "config window-limit={} classifier={} rx-ref={:#04x} tx-ref={:#04x} tx-delay={} phy-module={}",
            config.window_limit,
            self.snapshot.classifier,
            config.rx_reference_line,
            config.tx_reference_line,
            config.tx_delay,
            if config.phy_module { "yes" } else { "no" },
        )
    }

    /// Writes the session line (e.g. `session state=done delay=99 candidates=99,129,69 windows=1 probes=256`).
    ///
    /// # Errors
    ///
    /// Propagates any error reported by `writer`.
    pub fn write_session_line<W: fmt::Write>(&self, writer: &mut W) -> fmt::Result {
        write!(writer, "session state={}", self.snapshot.state)?;
        match &self.snapshot.last {
            LastSession::None => writer.write_str(" last=none")?,
            LastSession::Tuned {
                committed,
                candidates,
                windows,
                probes,
            } => {
                write!(writer, " delay={committed} candidates=")?;
                write_codes(writer, candidates)?;
                write!(writer, " windows={windows} probes={probes}")?;
            }
            LastSession::NotRequired(mode) => write!(writer, " last=not-required mode={mode}")?,
            LastSession::Failed(error) => write!(writer, " error=\"{error}\"")?,
        }
        write!(writer, " events={}", self.snapshot.events_recorded)
    }
}

/// Renders a successful [`TuningReport`].
#[derive(Clone, Copy, Debug)]
pub struct ReportFormatter<'a> {
    report: &'a TuningReport,
}

impl<'a> ReportFormatter<'a> {
    #[must_use]
    pub const fn new(report: &'a TuningReport) -> Self {
        Self { report }
    }

    /// Writes the summary line (e.g. `tuned sdr104 delay=99 candidates=99,129,69 probes=256`).
    ///
    /// # Errors
    ///
    /// Propagates any error reported by `writer`.
    pub fn write_summary_line<W: fmt::Write>(&self, writer: &mut W) -> fmt::Result {
        let report = self.report;
        match (report.outcome, report.committed) {
            (TuningOutcome::Tuned, Some(code)) => {
                write!(writer, "tuned {} delay={code} candidates=", report.mode)?;
                write_codes(writer, &report.candidates)?;
                write!(writer, " probes={}", report.probes)
            }
            _ => write!(writer, "{} {}", report.outcome, report.mode),
        }
    }

    /// Number of window lines [`Self::write_window_line`] can produce.
    #[must_use]
    pub fn window_count(&self) -> usize {
        self.report.windows.len()
    }

    /// Writes one ranked window (e.g. `window #0 [40, 160) width=120 middle`).
    ///
    /// # Errors
    ///
    /// Returns [`fmt::Error`] when `rank` is out of range, and propagates any
    /// error reported by `writer`.
    pub fn write_window_line<W: fmt::Write>(&self, writer: &mut W, rank: usize) -> fmt::Result {
        match self.report.windows.get(rank) {
            Some(&window) => write_window(writer, rank, window),
            None => Err(fmt::Error),
        }
    }
}

fn write_window<W: fmt::Write>(writer: &mut W, rank: usize, window: Window) -> fmt::Result {
    write!(writer, "window #{rank} {window}")
}

fn write_codes<W: fmt::Write>(writer: &mut W, codes: &[DelayCode]) -> fmt::Result {
    if codes.is_empty() {
        return writer.write_str("-");
    }
    for (index, code) in codes.iter().enumerate() {
        if index > 0 {
            writer.write_char(',')?;
        }
        write!(writer, "{code}")?;
    }
    Ok(())
}
