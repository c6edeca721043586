//! Line grammar for the tuning console.
//!
//! Commands are parsed straight from the input line with `winnow`
//! combinators. Keywords match case-insensitively and tokens are separated by
//! spaces or tabs.

use core::fmt;

use heapless::Vec;
use winnow::ascii::{dec_uint, space0, space1};
use winnow::combinator::{alt, delimited, opt, preceded, repeat, separated_pair};
use winnow::error::{ContextError, ErrMode};
use winnow::prelude::*;
use winnow::token::take_while;

use crate::delay::{AXIS_END, DelayCode};
use crate::host::BusMode;
use crate::host::synthetic::MAX_BANDS;
use crate::pattern::BusWidth;
use crate::window::ClassifierKind;

/// Pass bands parsed from a `profile pass` command.
pub type BandList = Vec<(u16, u16), MAX_BANDS>;

/// Structured commands produced by the parser.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Command {
    Tune(TuneCommand),
    Profile(ProfileCommand),
    Limit(u16),
    Classify(ClassifierKind),
    Status,
    Help(Option<HelpTopic>),
}

/// Optional overrides accepted by `tune`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TuneCommand {
    pub mode: Option<BusMode>,
    pub width: Option<BusWidth>,
    pub opcode: Option<u8>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ProfileCommand {
    Pass(BandList),
    All,
    None,
    /// Every code passes except this one, which kills the bus.
    Fatal(DelayCode),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HelpTopic {
    Tune,
    Profile,
    Limit,
    Classify,
    Status,
}

impl HelpTopic {
    pub const ALL: [HelpTopic; 5] = [
        HelpTopic::Tune,
        HelpTopic::Profile,
        HelpTopic::Limit,
        HelpTopic::Classify,
        HelpTopic::Status,
    ];

    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            HelpTopic::Tune => "tune",
            HelpTopic::Profile => "profile",
            HelpTopic::Limit => "limit",
            HelpTopic::Classify => "classify",
            HelpTopic::Status => "status",
        }
    }

    #[must_use]
    pub fn from_label(label: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|topic| topic.label().eq_ignore_ascii_case(label))
    }
}

/// Input the parser could not accept.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ParseError<'a> {
    pub line: &'a str,
    /// Byte offset of the first rejected character.
    pub offset: usize,
}

impl ParseError<'_> {
    /// Unparsed remainder of the line starting at [`Self::offset`].
    #[must_use]
    pub fn remainder(&self) -> &str {
        self.line.get(self.offset..).unwrap_or_default()
    }
}

impl fmt::Display for ParseError<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rest = self.remainder();
        if rest.is_empty() {
            write!(f, "unexpected end of input at byte {}", self.offset)
        } else {
            write!(f, "unexpected input `{rest}` at byte {}", self.offset)
        }
    }
}

/// Parses one console line. Trailing line terminators are ignored.
///
/// # Errors
///
/// Returns a [`ParseError`] carrying the offset where parsing stopped.
pub fn parse(line: &str) -> Result<Command, ParseError<'_>> {
    let line = line.trim_end_matches(['\r', '\n']);
    command.parse(line).map_err(|error| ParseError {
        line,
        offset: error.offset(),
    })
}

type Input<'i> = &'i str;

fn command(input: &mut Input<'_>) -> ModalResult<Command> {
    delimited(
        space0,
        alt((tune, profile, limit, classify, status, help)),
        space0,
    )
    .parse_next(input)
}

fn ident<'i>(input: &mut Input<'i>) -> ModalResult<&'i str> {
    take_while(1.., |c: char| c.is_ascii_alphanumeric() || c == '-').parse_next(input)
}

fn keyword<'i>(word: &'static str) -> impl Parser<Input<'i>, (), ErrMode<ContextError>> {
    ident
        .verify(move |candidate: &str| candidate.eq_ignore_ascii_case(word))
        .void()
}

fn tune(input: &mut Input<'_>) -> ModalResult<Command> {
    preceded(
        keyword("tune"),
        repeat(0.., preceded(space1, tune_arg)).fold(TuneCommand::default, |mut acc, arg| {
            match arg {
                TuneArg::Mode(mode) => acc.mode = Some(mode),
                TuneArg::Width(width) => acc.width = Some(width),
                TuneArg::Opcode(opcode) => acc.opcode = Some(opcode),
            }
            acc
        }),
    )
    .map(Command::Tune)
    .parse_next(input)
}

#[derive(Clone, Copy)]
enum TuneArg {
    Mode(BusMode),
    Width(BusWidth),
    Opcode(u8),
}

fn tune_arg(input: &mut Input<'_>) -> ModalResult<TuneArg> {
    alt((
        preceded((keyword("width"), '='), dec_uint::<_, u8, _>)
            .verify_map(|lines| match lines {
                4 => Some(BusWidth::Four),
                8 => Some(BusWidth::Eight),
                _ => None,
            })
            .map(TuneArg::Width),
        preceded((keyword("opcode"), '='), dec_uint::<_, u8, _>).map(TuneArg::Opcode),
        ident.verify_map(BusMode::from_label).map(TuneArg::Mode),
    ))
    .parse_next(input)
}

fn profile(input: &mut Input<'_>) -> ModalResult<Command> {
    preceded(
        (keyword("profile"), space1),
        alt((
            keyword("all").value(ProfileCommand::All),
            keyword("none").value(ProfileCommand::None),
            preceded((keyword("fatal"), space1), dec_uint::<_, u8, _>)
                .map(|code| ProfileCommand::Fatal(DelayCode::new(code))),
            preceded(keyword("pass"), bands).map(ProfileCommand::Pass),
        )),
    )
    .map(Command::Profile)
    .parse_next(input)
}

fn bands(input: &mut Input<'_>) -> ModalResult<BandList> {
    repeat(1.., preceded(space1, band))
        .fold(
            || Some(BandList::new()),
            |acc: Option<BandList>, band| {
                acc.and_then(|mut list| list.push(band).ok().map(|()| list))
            },
        )
        .verify_map(|list| list)
        .parse_next(input)
}

fn band(input: &mut Input<'_>) -> ModalResult<(u16, u16)> {
    separated_pair(dec_uint::<_, u16, _>, "..", dec_uint::<_, u16, _>)
        .verify(|&(start, end): &(u16, u16)| start < end && end <= AXIS_END)
        .parse_next(input)
}

fn limit(input: &mut Input<'_>) -> ModalResult<Command> {
    preceded((keyword("limit"), space1), dec_uint::<_, u16, _>)
        .map(Command::Limit)
        .parse_next(input)
}

fn classify(input: &mut Input<'_>) -> ModalResult<Command> {
    preceded(
        (keyword("classify"), space1),
        alt((
            keyword("middle").value(ClassifierKind::MiddleOnly),
            keyword("edge").value(ClassifierKind::EdgeAnchored),
        )),
    )
    .map(Command::Classify)
    .parse_next(input)
}

fn status(input: &mut Input<'_>) -> ModalResult<Command> {
    keyword("status").value(Command::Status).parse_next(input)
}

fn help(input: &mut Input<'_>) -> ModalResult<Command> {
    preceded(
        keyword("help"),
        opt(preceded(space1, ident.verify_map(HelpTopic::from_label))),
    )
    .map(Command::Help)
    .parse_next(input)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_tune_uses_defaults() {
        assert_eq!(parse("tune"), Ok(Command::Tune(TuneCommand::default())));
    }

    #[test]
    fn tune_accepts_mode_and_options_in_any_order() {
        let command = parse("  TUNE width=8 hs200 opcode=21\r\n").unwrap();
        assert_eq!(
            command,
            Command::Tune(TuneCommand {
                mode: Some(BusMode::Hs200),
                width: Some(BusWidth::Eight),
                opcode: Some(21),
            })
        );
    }

    #[test]
    fn tune_rejects_unknown_width() {
        let error = parse("tune width=2").unwrap_err();
        assert_eq!(error.offset, 5);
        assert_eq!(error.remainder(), "width=2");
    }

    #[test]
    fn profile_pass_collects_bands() {
        let Command::Profile(ProfileCommand::Pass(bands)) =
            parse("profile pass 0..50 200..256").unwrap()
        else {
            panic!("expected a pass profile");
        };
        assert_eq!(bands.as_slice(), &[(0, 50), (200, 256)]);
    }

    #[test]
    fn profile_rejects_inverted_or_oversized_bands() {
        assert!(parse("profile pass 50..10").is_err());
        assert!(parse("profile pass 0..257").is_err());
        assert!(parse("profile pass").is_err());
    }

    #[test]
    fn profile_keywords() {
        assert_eq!(parse("profile all"), Ok(Command::Profile(ProfileCommand::All)));
        assert_eq!(parse("profile none"), Ok(Command::Profile(ProfileCommand::None)));
        assert_eq!(
            parse("profile fatal 120"),
            Ok(Command::Profile(ProfileCommand::Fatal(DelayCode::new(120))))
        );
        assert!(parse("profile fatal 300").is_err());
    }

    #[test]
    fn limit_and_classify() {
        assert_eq!(parse("limit 40"), Ok(Command::Limit(40)));
        assert_eq!(
            parse("classify edge"),
            Ok(Command::Classify(ClassifierKind::EdgeAnchored))
        );
        assert!(parse("classify corner").is_err());
    }

    #[test]
    fn help_topics_are_optional() {
        assert_eq!(parse("help"), Ok(Command::Help(None)));
        assert_eq!(
            parse("help profile"),
            Ok(Command::Help(Some(HelpTopic::Profile)))
        );
        assert_eq!(parse("status "), Ok(Command::Status));
    }

    #[test]
    fn unknown_command_reports_offset_zero() {
        let error = parse("reboot now").unwrap_err();
        assert_eq!(error.offset, 0);
    }

    #[test]
    fn keywords_need_a_word_boundary() {
        assert!(parse("statusx").is_err());
        assert!(parse("tunehs200").is_err());
    }
}
