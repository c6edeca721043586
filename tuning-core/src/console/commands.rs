//! Console command dispatcher.
//!
//! Parsed commands are applied to a [`TuningOrchestrator`]. Every tuning run
//! goes through the shared [`TelemetryRecorder`] so `status` can report how
//! many events the console has seen.

use core::fmt;

use crate::config::ConfigError;
use crate::host::synthetic::{BandProfile, ProfileError, SampleResponse, SyntheticHost};
use crate::host::{BusMode, TransferError, TuningHost};
use crate::orchestrator::{TuningError, TuningOrchestrator, TuningReport};
use crate::pattern::BusWidth;
use crate::telemetry::TelemetryRecorder;
use crate::window::ClassifierKind;

use super::grammar::{self, Command, HelpTopic, ProfileCommand, TuneCommand};
use super::status::{LastSession, StatusSnapshot};

/// Hosts whose sampling behaviour the console can replace.
pub trait ProfileSink {
    fn load_profile(&mut self, profile: BandProfile);
}

impl ProfileSink for SyntheticHost<BandProfile> {
    fn load_profile(&mut self, profile: BandProfile) {
        self.set_profile(profile);
    }
}

/// Command execution successes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CommandOutcome {
    Tuned(TuningReport),
    ProfileLoaded(BandProfile),
    LimitSet(u16),
    ClassifierSet(ClassifierKind),
    Status(StatusSnapshot),
    Help(Option<HelpTopic>),
}

/// Errors surfaced while executing a command.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConsoleError<'a> {
    Parse(grammar::ParseError<'a>),
    Profile(ProfileError),
    Config(ConfigError),
    Tuning(TuningError),
}

impl<'a> From<grammar::ParseError<'a>> for ConsoleError<'a> {
    fn from(error: grammar::ParseError<'a>) -> Self {
        Self::Parse(error)
    }
}

impl From<ProfileError> for ConsoleError<'_> {
    fn from(error: ProfileError) -> Self {
        Self::Profile(error)
    }
}

impl From<ConfigError> for ConsoleError<'_> {
    fn from(error: ConfigError) -> Self {
        Self::Config(error)
    }
}

impl From<TuningError> for ConsoleError<'_> {
    fn from(error: TuningError) -> Self {
        Self::Tuning(error)
    }
}

impl fmt::Display for ConsoleError<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConsoleError::Parse(error) => write!(f, "parse error: {error}"),
            ConsoleError::Profile(error) => write!(f, "profile error: {error}"),
            ConsoleError::Config(error) => write!(f, "config error: {error}"),
            ConsoleError::Tuning(error) => write!(f, "tuning failed: {error}"),
        }
    }
}

/// Usage lines for `help` and `help <topic>`.
#[must_use]
pub const fn help_lines(topic: Option<HelpTopic>) -> &'static [&'static str] {
    match topic {
        None => &[
            "tune [<mode>] [width=4|8] [opcode=<n>]  run a tuning session",
            "profile pass|all|none|fatal ...         replace the sample profile",
            "limit <n>                               set the minimum window width",
            "classify middle|edge                    choose the window classifier",
            "status                                  show configuration and last session",
            "help [topic]                            show this text",
        ],
        Some(HelpTopic::Tune) => &[
            "tune [<mode>] [width=4|8] [opcode=<n>]",
            "  sdr50, sdr104 and hs200 are tuned; other modes report not-required",
            "  opcode defaults to 19 for SD modes and 21 for MMC modes",
        ],
        Some(HelpTopic::Profile) => &[
            "profile pass <a>..<b> [<c>..<d> ...]  codes inside the bands pass",
            "profile all                           every code passes",
            "profile none                          no code passes",
            "profile fatal <code>                  every code passes, <code> kills the bus",
        ],
        Some(HelpTopic::Limit) => &["limit <n>  windows narrower than n codes are ignored (0..=256)"],
        Some(HelpTopic::Classify) => &[
            "classify middle  every window is centred",
            "classify edge    windows touching an axis end lean away from it",
        ],
        Some(HelpTopic::Status) => &["status  show configuration and the last session result"],
    }
}

/// Dispatches console commands into a [`TuningOrchestrator`].
pub struct CommandExecutor<H> {
    orchestrator: TuningOrchestrator<H>,
    telemetry: TelemetryRecorder,
    last: LastSession,
    default_mode: BusMode,
    default_width: BusWidth,
}

impl<H: TuningHost + ProfileSink> CommandExecutor<H> {
    /// Creates an executor tuning `UHS SDR104` on a 4-bit bus by default.
    pub const fn new(orchestrator: TuningOrchestrator<H>) -> Self {
        Self {
            orchestrator,
            telemetry: TelemetryRecorder::new(),
            last: LastSession::None,
            default_mode: BusMode::UhsSdr104,
            default_width: BusWidth::Four,
        }
    }

    /// Overrides the mode and width used by a bare `tune`.
    #[must_use]
    pub const fn with_defaults(mut self, mode: BusMode, width: BusWidth) -> Self {
        self.default_mode = mode;
        self.default_width = width;
        self
    }

    #[must_use]
    pub fn orchestrator(&self) -> &TuningOrchestrator<H> {
        &self.orchestrator
    }

    pub fn orchestrator_mut(&mut self) -> &mut TuningOrchestrator<H> {
        &mut self.orchestrator
    }

    #[must_use]
    pub fn telemetry(&self) -> &TelemetryRecorder {
        &self.telemetry
    }

    #[must_use]
    pub fn last_session(&self) -> &LastSession {
        &self.last
    }

    /// Builds the data reported by `status`.
    #[must_use]
    pub fn snapshot(&self) -> StatusSnapshot {
        StatusSnapshot {
            config: *self.orchestrator.config(),
            classifier: *self.orchestrator.classifier(),
            state: self.orchestrator.last_state(),
            last: self.last.clone(),
            events_recorded: self.telemetry.total_recorded(),
        }
    }

    /// Parses and executes a console line.
    ///
    /// # Errors
    ///
    /// Returns [`ConsoleError`] when the line does not parse, a setting is
    /// rejected, or the tuning session fails.
    pub fn execute<'a>(&mut self, line: &'a str) -> Result<CommandOutcome, ConsoleError<'a>> {
        let command = grammar::parse(line)?;
        self.dispatch(command)
    }

    fn dispatch<'a>(&mut self, command: Command) -> Result<CommandOutcome, ConsoleError<'a>> {
        match command {
            Command::Tune(tune) => self
                .handle_tune(tune)
                .map(CommandOutcome::Tuned)
                .map_err(ConsoleError::from),
            Command::Profile(profile) => self
                .handle_profile(profile)
                .map(CommandOutcome::ProfileLoaded)
                .map_err(ConsoleError::from),
            Command::Limit(limit) => {
                let config = self
                    .orchestrator
                    .config()
                    .with_window_limit(limit)
                    .validate()?;
                *self.orchestrator.config_mut() = config;
                Ok(CommandOutcome::LimitSet(limit))
            }
            Command::Classify(kind) => {
                *self.orchestrator.classifier_mut() = kind;
                Ok(CommandOutcome::ClassifierSet(kind))
            }
            Command::Status => Ok(CommandOutcome::Status(self.snapshot())),
            Command::Help(topic) => Ok(CommandOutcome::Help(topic)),
        }
    }

    fn handle_tune(&mut self, tune: TuneCommand) -> Result<TuningReport, TuningError> {
        let mode = tune.mode.unwrap_or(self.default_mode);
        let width = tune.width.unwrap_or(self.default_width);
        let opcode = tune.opcode.unwrap_or(mode.tuning_opcode());

        let result =
            self.orchestrator
                .execute_tuning_observed(opcode, width, mode, &mut self.telemetry);
        self.last = LastSession::from_result(&result);
        result
    }

    fn handle_profile(&mut self, command: ProfileCommand) -> Result<BandProfile, ProfileError> {
        let profile = match command {
            ProfileCommand::Pass(bands) => BandProfile::from_bands(&bands)?,
            ProfileCommand::All => BandProfile::all(),
            ProfileCommand::None => BandProfile::none(),
            ProfileCommand::Fatal(code) => {
                let mut profile = BandProfile::all();
                profile.set_override(code, SampleResponse::Error(TransferError::BusFault))?;
                profile
            }
        };
        self.orchestrator.host_mut().load_profile(profile.clone());
        Ok(profile)
    }
}
