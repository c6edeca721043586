use std::fmt::Write as _;
use std::fs::{self, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant as HostInstant};

use tuning_core::config::{ConfigError, TuningConfig};
use tuning_core::console::commands::{CommandExecutor, CommandOutcome, ConsoleError, help_lines};
use tuning_core::console::status::{ReportFormatter, StatusFormatter, StatusSnapshot};
use tuning_core::host::synthetic::{BandProfile, ProfileError, SyntheticHost};
use tuning_core::orchestrator::{TuningOrchestrator, TuningReport};
use tuning_core::DelayCode;

const TRANSCRIPT_DIR: &str = "transcripts";

/// Sample profile the synthetic controller starts with.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum BoardProfile {
    /// One healthy band in the middle of the axis.
    Nominal,
    /// Every delay samples cleanly.
    Wide,
    /// Two narrow bands at the axis ends.
    Split,
    /// Nothing samples cleanly.
    Dead,
}

impl BoardProfile {
    pub const ALL: [BoardProfile; 4] = [
        BoardProfile::Nominal,
        BoardProfile::Wide,
        BoardProfile::Split,
        BoardProfile::Dead,
    ];

    pub fn tag(self) -> &'static str {
        match self {
            BoardProfile::Nominal => "nominal",
            BoardProfile::Wide => "wide",
            BoardProfile::Split => "split",
            BoardProfile::Dead => "dead",
        }
    }

    pub fn from_tag(tag: &str) -> Result<Self, String> {
        Self::ALL
            .into_iter()
            .find(|profile| profile.tag().eq_ignore_ascii_case(tag))
            .ok_or_else(|| {
                let known: Vec<&str> = Self::ALL.iter().map(|profile| profile.tag()).collect();
                format!(
                    "Unknown board profile `{tag}` (expected one of: {})",
                    known.join(", ")
                )
            })
    }

    pub fn bands(self) -> &'static [(u16, u16)] {
        match self {
            BoardProfile::Nominal => &[(40, 160)],
            BoardProfile::Wide => &[(0, 256)],
            BoardProfile::Split => &[(0, 50), (200, 256)],
            BoardProfile::Dead => &[],
        }
    }

    pub fn sample_profile(self) -> Result<BandProfile, ProfileError> {
        BandProfile::from_bands(self.bands())
    }

    pub fn log_path(self) -> PathBuf {
        Path::new(TRANSCRIPT_DIR).join(format!("emulator-{}.log", self.tag()))
    }

    pub fn header(self) -> String {
        format!("Tuning emulator transcript ({} board)", self.tag())
    }
}

/// Start-up settings collected from the command line.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct SessionOptions {
    pub board: BoardProfile,
    pub window_limit: Option<u16>,
    pub tx_delay: Option<u8>,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            board: BoardProfile::Nominal,
            window_limit: None,
            tx_delay: None,
        }
    }
}

impl SessionOptions {
    pub fn tuning_config(&self) -> Result<TuningConfig, ConfigError> {
        let mut config = TuningConfig::default();
        if let Some(limit) = self.window_limit {
            config = config.with_window_limit(limit);
        }
        if let Some(code) = self.tx_delay {
            config = config.with_tx_delay(DelayCode::new(code));
        }
        config.validate()
    }
}

pub struct Session {
    executor: CommandExecutor<SyntheticHost<BandProfile>>,
    transcript: TranscriptLogger,
    started_at: HostInstant,
}

impl Session {
    pub fn new(options: SessionOptions) -> io::Result<Self> {
        let config = options.tuning_config().map_err(invalid_input)?;
        let profile = options.board.sample_profile().map_err(invalid_input)?;
        let transcript = TranscriptLogger::new(options.board)?;

        let host = SyntheticHost::new(profile);
        let executor = CommandExecutor::new(TuningOrchestrator::new(host, config));

        Ok(Self {
            executor,
            transcript,
            started_at: HostInstant::now(),
        })
    }

    pub fn handle_command(&mut self, line: &str) -> io::Result<Vec<String>> {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            return Ok(Vec::new());
        }

        let elapsed = self.started_at.elapsed();
        self.transcript
            .append_line(elapsed, TranscriptRole::Host, trimmed)?;

        let lines = match self.executor.execute(trimmed) {
            Ok(CommandOutcome::Tuned(report)) => describe_report(&report),
            Ok(CommandOutcome::ProfileLoaded(profile)) => vec![describe_profile(&profile)],
            Ok(CommandOutcome::LimitSet(limit)) => vec![format!("OK limit {limit}")],
            Ok(CommandOutcome::ClassifierSet(kind)) => vec![format!("OK classify {kind}")],
            Ok(CommandOutcome::Status(snapshot)) => describe_status(&snapshot),
            Ok(CommandOutcome::Help(topic)) => {
                let mut lines: Vec<String> = help_lines(topic)
                    .iter()
                    .map(|line| (*line).to_string())
                    .collect();
                if topic.is_none() {
                    lines.push("Type `help <topic>` for a specific command.".to_string());
                }
                lines
            }
            Err(error) => vec![describe_error(&error)],
        };

        self.record_output(elapsed, &lines)?;
        Ok(lines)
    }

    fn record_output(&mut self, elapsed: Duration, lines: &[String]) -> io::Result<()> {
        for line in lines {
            self.transcript
                .append_line(elapsed, TranscriptRole::Emulator, line)?;
        }
        Ok(())
    }
}

fn invalid_input<E: std::fmt::Display>(error: E) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidInput, error.to_string())
}

fn describe_report(report: &TuningReport) -> Vec<String> {
    let formatter = ReportFormatter::new(report);
    let mut lines = Vec::with_capacity(1 + formatter.window_count());

    let mut head = String::from("OK ");
    let _ = formatter.write_summary_line(&mut head);
    lines.push(head);

    for rank in 0..formatter.window_count() {
        let mut line = String::from("  ");
        let _ = formatter.write_window_line(&mut line, rank);
        lines.push(line);
    }
    if report.discovered > report.windows.len() {
        lines.push(format!(
            "  {} narrower window(s) ignored",
            report.discovered - report.windows.len()
        ));
    }
    lines
}

fn describe_profile(profile: &BandProfile) -> String {
    let mut line = String::from("OK profile");
    if profile.bands().is_empty() {
        line.push_str(" pass=none");
    } else {
        line.push_str(" pass=");
        for (index, (start, end)) in profile.bands().iter().enumerate() {
            if index > 0 {
                line.push(',');
            }
            let _ = write!(line, "{start}..{end}");
        }
    }
    for (code, response) in profile.overrides() {
        let _ = write!(line, " override={code}:{response:?}");
    }
    line
}

fn describe_status(snapshot: &StatusSnapshot) -> Vec<String> {
    let formatter = StatusFormatter::new(snapshot);
    let mut config = String::new();
    let _ = formatter.write_config_line(&mut config);
    let mut session = String::new();
    let _ = formatter.write_session_line(&mut session);
    vec![config, session]
}

fn describe_error(error: &ConsoleError<'_>) -> String {
    match error {
        ConsoleError::Parse(error) => format!("ERR syntax {error}"),
        ConsoleError::Profile(error) => format!("ERR profile {error}"),
        ConsoleError::Config(error) => format!("ERR config {error}"),
        ConsoleError::Tuning(error) => format!("ERR tuning {error}"),
    }
}

struct TranscriptLogger {
    writer: BufWriter<std::fs::File>,
}

impl TranscriptLogger {
    fn new(board: BoardProfile) -> io::Result<Self> {
        let path = board.log_path();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(&path)?;

        let mut logger = Self {
            writer: BufWriter::new(file),
        };

        logger.write_header(board)?;
        Ok(logger)
    }

    fn write_header(&mut self, board: BoardProfile) -> io::Result<()> {
        writeln!(self.writer, "# {}", board.header())?;
        writeln!(
            self.writer,
            "# Timestamps are milliseconds since session start"
        )?;
        writeln!(self.writer)?;
        self.writer.flush()
    }

    fn append_line(
        &mut self,
        elapsed: Duration,
        role: TranscriptRole,
        line: &str,
    ) -> io::Result<()> {
        writeln!(
            self.writer,
            "[+{:>6} ms] {} {}",
            elapsed.as_millis(),
            role.prefix(),
            line
        )?;
        self.writer.flush()
    }
}

enum TranscriptRole {
    Host,
    Emulator,
}

impl TranscriptRole {
    fn prefix(&self) -> &'static str {
        match self {
            TranscriptRole::Host => "HOST>",
            TranscriptRole::Emulator => "EMU <",
        }
    }
}
