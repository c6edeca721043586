mod session;

use std::env;
use std::io::{self, BufRead, Write};
use std::process;

use session::{BoardProfile, Session, SessionOptions};

const USAGE: &str = "Usage: tuning-emulator [--profile <nominal|wide|split|dead>] \
                     [--window-limit <0-256>] [--tx-delay <0-255>]";

fn main() -> io::Result<()> {
    let options = parse_options(env::args().skip(1)).unwrap_or_else(|err| {
        eprintln!("{err}");
        eprintln!("{USAGE}");
        process::exit(2);
    });

    let stdin = io::stdin();
    let mut reader = stdin.lock();
    let stdout = io::stdout();
    let mut writer = stdout.lock();
    let mut session = Session::new(options).unwrap_or_else(|err| {
        eprintln!("{err}");
        process::exit(2);
    });
    let mut line = String::new();

    writeln!(
        writer,
        "Tuning emulator ready ({} board). Type `help` for commands or `exit` to quit.",
        options.board.tag()
    )?;

    loop {
        line.clear();
        write!(writer, "> ")?;
        writer.flush()?;

        let bytes_read = reader.read_line(&mut line)?;
        if bytes_read == 0 {
            writeln!(writer)?;
            break;
        }

        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        if should_terminate(trimmed) {
            writeln!(writer, "Session closed.")?;
            break;
        }

        let responses = session.handle_command(trimmed)?;
        for response in responses {
            writeln!(writer, "{response}")?;
        }
    }

    Ok(())
}

fn should_terminate(input: &str) -> bool {
    input.eq_ignore_ascii_case("exit") || input.eq_ignore_ascii_case("quit")
}

fn parse_options(mut args: impl Iterator<Item = String>) -> Result<SessionOptions, String> {
    let mut options = SessionOptions::default();

    while let Some(arg) = args.next() {
        let (flag, inline) = match arg.split_once('=') {
            Some((flag, value)) => (flag.to_string(), Some(value.to_string())),
            None => (arg, None),
        };
        let mut value = || {
            inline
                .clone()
                .or_else(|| args.next())
                .ok_or_else(|| format!("Expected value after {flag}"))
        };

        match flag.as_str() {
            "--profile" => options.board = BoardProfile::from_tag(&value()?)?,
            "--window-limit" => options.window_limit = Some(parse_number(&flag, &value()?)?),
            "--tx-delay" => options.tx_delay = Some(parse_number(&flag, &value()?)?),
            other if !other.starts_with('-') => options.board = BoardProfile::from_tag(other)?,
            other => return Err(format!("Unknown option `{other}`")),
        }
    }

    Ok(options)
}

fn parse_number<T: std::str::FromStr>(flag: &str, value: &str) -> Result<T, String> {
    value
        .parse()
        .map_err(|_| format!("Invalid value `{value}` for {flag}"))
}
