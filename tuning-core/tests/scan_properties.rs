use heapless::Vec as HeaplessVec;

use tuning_core::delay::AXIS_END;
use tuning_core::host::synthetic::{SampleResponse, SyntheticHost};
use tuning_core::issuer::TuningIssuer;
use tuning_core::scanner::WindowScanner;
use tuning_core::selector::{MAX_CANDIDATES, select_candidates};
use tuning_core::telemetry::{TuningEvent, TuningObserver};
use tuning_core::window::{EdgeAnchored, MiddleOnly, Window, WindowClassifier};
use tuning_core::{BusWidth, DelayCode};

const SEEDS: [u32; 6] = [0x1234_5678, 0xdead_beef, 7, 0x0bad_f00d, 42, 0x8000_0001];

/// Deterministic pass table with runs of random length.
fn pass_table(seed: u32) -> [bool; 256] {
    let mut state = seed;
    let mut next = move || {
        state ^= state << 13;
        state ^= state >> 17;
        state ^= state << 5;
        state
    };

    let mut table = [false; 256];
    let mut index = 0usize;
    let mut passing = next() & 1 == 0;
    while index < table.len() {
        let run = 1 + (next() % 120) as usize;
        for slot in table.iter_mut().skip(index).take(run) {
            *slot = passing;
        }
        index += run;
        passing = !passing;
    }
    table
}

fn maximal_runs(table: &[bool; 256]) -> HeaplessVec<(u16, u16), 128> {
    let mut runs = HeaplessVec::new();
    let mut start = None;
    for (code, &pass) in (0u16..).zip(table.iter()) {
        match (pass, start) {
            (true, None) => start = Some(code),
            (false, Some(begin)) => {
                runs.push((begin, code)).unwrap();
                start = None;
            }
            _ => {}
        }
    }
    if let Some(begin) = start {
        runs.push((begin, AXIS_END)).unwrap();
    }
    runs
}

#[derive(Default)]
struct ObservedWindows {
    windows: HeaplessVec<Window, 128>,
}

impl TuningObserver for ObservedWindows {
    fn record(&mut self, event: TuningEvent) {
        if let TuningEvent::WindowObserved { window, .. } = event {
            self.windows.push(window).unwrap();
        }
    }
}

fn scan<C: WindowClassifier>(
    table: [bool; 256],
    classifier: &C,
    limit: u16,
) -> (tuning_core::scanner::ScanSummary, ObservedWindows) {
    let mut host = SyntheticHost::new(move |code: DelayCode| {
        if table[usize::from(code.value())] {
            SampleResponse::Pass
        } else {
            SampleResponse::Corrupt
        }
    });
    let scanner = WindowScanner::new(TuningIssuer::new(19, BusWidth::Four), classifier, limit);
    let mut observed = ObservedWindows::default();
    let summary = scanner.scan(&mut host, &mut observed).unwrap();
    (summary, observed)
}

#[test]
fn discovered_windows_are_the_maximal_passing_runs() {
    for seed in SEEDS {
        let table = pass_table(seed);
        let (summary, observed) = scan(table, &MiddleOnly, 0);

        let found: HeaplessVec<(u16, u16), 128> = observed
            .windows
            .iter()
            .map(|window| (window.min(), window.max()))
            .collect();
        assert_eq!(found, maximal_runs(&table), "seed {seed:#x}");
        assert_eq!(summary.discovered, found.len());
        assert_eq!(summary.probes, 256);
    }
}

#[test]
fn ranked_windows_are_bounded_sorted_and_qualified() {
    for seed in SEEDS {
        for limit in [0u16, 10, 40, 80] {
            let (summary, observed) = scan(pass_table(seed), &EdgeAnchored, limit);

            assert!(summary.windows.len() <= 3);
            assert!(summary.windows.iter().all(|w| w.width() >= limit));
            assert!(
                summary
                    .windows
                    .windows(2)
                    .all(|pair| pair[0].width() >= pair[1].width())
            );

            // Every qualifying window left out is no wider than the narrowest kept.
            let qualifying = observed.windows.iter().filter(|w| w.width() >= limit).count();
            assert_eq!(summary.windows.len(), qualifying.min(3));
            if let Some(narrowest) = summary.windows.last() {
                for window in observed.windows.iter().filter(|w| w.width() >= limit) {
                    if !summary.windows.contains(window) {
                        assert!(window.width() <= narrowest.width());
                    }
                }
            }

            let selection = select_candidates(&summary.windows, limit);
            assert!(selection.len() <= MAX_CANDIDATES);
            assert_eq!(selection.is_empty(), summary.windows.is_empty());
        }
    }
}

#[test]
fn equal_width_windows_keep_discovery_order() {
    let mut table = [false; 256];
    for (start, end) in [(0usize, 30usize), (40, 70), (80, 110), (120, 150)] {
        for slot in &mut table[start..end] {
            *slot = true;
        }
    }
    let (summary, _) = scan(table, &MiddleOnly, 30);
    let mins: HeaplessVec<u16, 3> = summary.windows.iter().map(Window::min).collect();
    assert_eq!(mins.as_slice(), &[0, 40, 80]);
}
