//! Linear sweep of the RX delay axis.
//!
//! Sample quality is not unimodal across the axis, so the sweep visits every
//! code instead of bisecting. Each contiguous run of passing codes becomes a
//! [`Window`]; runs at least `window_limit` wide are offered to the ranker.

use crate::delay::{AXIS_END, AXIS_MIN, DelayCode};
use crate::host::TuningHost;
use crate::issuer::{FatalBus, TuningIssuer};
use crate::telemetry::{TuningEvent, TuningObserver};
use crate::window::{Window, WindowClassifier, WindowRanker, WindowSet};

/// What a completed sweep found.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ScanSummary {
    /// Qualifying windows, widest first.
    pub windows: WindowSet,
    /// Passing runs found, qualifying or not.
    pub discovered: usize,
    /// Tuning transfers issued.
    pub probes: usize,
}

/// Sweeps the axis with a [`TuningIssuer`] and ranks what it finds.
#[derive(Clone, Copy, Debug)]
pub struct WindowScanner<'a, C> {
    issuer: TuningIssuer,
    classifier: &'a C,
    window_limit: u16,
}

impl<'a, C: WindowClassifier> WindowScanner<'a, C> {
    pub const fn new(issuer: TuningIssuer, classifier: &'a C, window_limit: u16) -> Self {
        Self {
            issuer,
            classifier,
            window_limit,
        }
    }

    /// Runs the full sweep.
    ///
    /// Every discovered run is reported to `observer`, followed by a ranking
    /// event when it enters the top windows.
    ///
    /// # Errors
    ///
    /// Stops at the first [`FatalBus`] error; windows found so far are dropped.
    pub fn scan<H, O>(&self, host: &mut H, observer: &mut O) -> Result<ScanSummary, FatalBus>
    where
        H: TuningHost + ?Sized,
        O: TuningObserver + ?Sized,
    {
        let mut ranker = WindowRanker::new();
        let mut discovered = 0;
        let mut probes = 0;
        let mut cursor = AXIS_MIN;

        while let Some(start) = self.find_start(host, &mut cursor, &mut probes)? {
            let end = self.find_end(host, start, &mut probes)?;

            let kind = self.classifier.classify(start, end);
            if let Some(window) = Window::new(start, end, kind) {
                discovered += 1;
                let qualified = window.width() >= self.window_limit;
                log_debug!(
                    "tuning: window [{}, {}) qualified={}",
                    window.min(),
                    window.max(),
                    qualified
                );
                observer.record(TuningEvent::WindowObserved { window, qualified });

                if qualified && let Some(rank) = ranker.offer(window) {
                    observer.record(TuningEvent::WindowRanked {
                        window,
                        rank: u8::try_from(rank).unwrap_or(u8::MAX),
                    });
                }
            }

            // `end` failed (or is past the axis), so resume after it.
            cursor = end + 1;
        }

        Ok(ScanSummary {
            windows: ranker.into_windows(),
            discovered,
            probes,
        })
    }

    /// Probes upward from `cursor` until a code passes. Leaves `cursor` on the
    /// passing code, or past the axis when none passed.
    fn find_start<H>(
        &self,
        host: &mut H,
        cursor: &mut u16,
        probes: &mut usize,
    ) -> Result<Option<u16>, FatalBus>
    where
        H: TuningHost + ?Sized,
    {
        while let Some(code) = DelayCode::from_axis(*cursor) {
            *probes += 1;
            if self.issuer.probe(host, code)?.is_pass() {
                return Ok(Some(*cursor));
            }
            *cursor += 1;
        }
        Ok(None)
    }

    /// Probes upward from `start + 1` until a code fails. Returns the failing
    /// code, or [`AXIS_END`] when the run reaches the end of the axis.
    fn find_end<H>(&self, host: &mut H, start: u16, probes: &mut usize) -> Result<u16, FatalBus>
    where
        H: TuningHost + ?Sized,
    {
        let mut end = start + 1;
        while let Some(code) = DelayCode::from_axis(end) {
            *probes += 1;
            if !self.issuer.probe(host, code)?.is_pass() {
                return Ok(end);
            }
            end += 1;
        }
        Ok(AXIS_END)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::TransferError;
    use crate::host::synthetic::{BandProfile, SampleResponse, SyntheticHost};
    use crate::pattern::BusWidth;
    use crate::window::{EdgeAnchored, MiddleOnly, WindowType};

    fn scan_bands(bands: &[(u16, u16)], limit: u16) -> (ScanSummary, usize) {
        let mut host = SyntheticHost::new(BandProfile::from_bands(bands).unwrap());
        let scanner = WindowScanner::new(TuningIssuer::new(19, BusWidth::Four), &MiddleOnly, limit);
        let summary = scanner.scan(&mut host, &mut ()).unwrap();
        (summary, host.probes())
    }

    fn bounds(summary: &ScanSummary) -> heapless::Vec<(u16, u16), 3> {
        summary
            .windows
            .iter()
            .map(|window| (window.min(), window.max()))
            .collect()
    }

    #[test]
    fn single_band_yields_one_window() {
        let (summary, probes) = scan_bands(&[(40, 160)], 80);
        assert_eq!(bounds(&summary).as_slice(), &[(40, 160)]);
        assert_eq!(summary.discovered, 1);
        // Every code is sampled exactly once.
        assert_eq!(probes, 256);
        assert_eq!(summary.probes, probes);
    }

    #[test]
    fn full_axis_is_one_window() {
        let (summary, probes) = scan_bands(&[(0, 256)], 80);
        assert_eq!(bounds(&summary).as_slice(), &[(0, 256)]);
        assert_eq!(probes, 256);
    }

    #[test]
    fn no_pass_yields_nothing() {
        let (summary, probes) = scan_bands(&[], 80);
        assert!(summary.windows.is_empty());
        assert_eq!(summary.discovered, 0);
        assert_eq!(probes, 256);
    }

    #[test]
    fn narrow_runs_are_discovered_but_not_ranked() {
        let (summary, _) = scan_bands(&[(0, 50), (200, 256)], 80);
        assert!(summary.windows.is_empty());
        assert_eq!(summary.discovered, 2);
    }

    #[test]
    fn single_code_runs_are_windows() {
        let (summary, _) = scan_bands(&[(10, 11), (255, 256)], 1);
        assert_eq!(bounds(&summary).as_slice(), &[(10, 11), (255, 256)]);
    }

    #[test]
    fn code_after_a_window_end_is_skipped() {
        // 100 fails, 101 passes. The sweep resumes at 101 and finds it.
        let (summary, _) = scan_bands(&[(0, 100), (101, 200)], 80);
        assert_eq!(bounds(&summary).as_slice(), &[(0, 100), (101, 200)]);
    }

    #[test]
    fn classifier_types_each_window() {
        let mut host = SyntheticHost::new(BandProfile::from_bands(&[(0, 90), (150, 256)]).unwrap());
        let scanner =
            WindowScanner::new(TuningIssuer::new(19, BusWidth::Four), &EdgeAnchored, 80);
        let summary = scanner.scan(&mut host, &mut ()).unwrap();

        let kinds: heapless::Vec<WindowType, 3> =
            summary.windows.iter().map(Window::kind).collect();
        assert_eq!(kinds.as_slice(), &[WindowType::Right, WindowType::Left]);
    }

    #[test]
    fn fatal_error_aborts_the_sweep() {
        let mut profile = BandProfile::from_bands(&[(0, 256)]).unwrap();
        profile
            .set_override(
                DelayCode::new(120),
                SampleResponse::Error(TransferError::CardRemoved),
            )
            .unwrap();
        let mut host = SyntheticHost::new(profile);
        let scanner = WindowScanner::new(TuningIssuer::new(19, BusWidth::Four), &MiddleOnly, 80);

        let error = scanner.scan(&mut host, &mut ()).unwrap_err();

        assert_eq!(error.code, DelayCode::new(120));
        assert_eq!(host.probes(), 121);
    }
}
