use std::io;

#[allow(dead_code)]
#[path = "../session.rs"]
mod session;

use session::{BoardProfile, Session, SessionOptions};

fn main() -> io::Result<()> {
    for board in BoardProfile::ALL {
        record_board(board)?;
    }
    Ok(())
}

fn record_board(board: BoardProfile) -> io::Result<()> {
    let options = SessionOptions {
        board,
        ..SessionOptions::default()
    };
    let mut session = Session::new(options)?;
    match board {
        BoardProfile::Nominal => record_nominal(&mut session),
        BoardProfile::Wide => record_wide(&mut session),
        BoardProfile::Split => record_split(&mut session),
        BoardProfile::Dead => record_dead(&mut session),
    }
}

fn record_nominal(session: &mut Session) -> io::Result<()> {
    let _ = session.handle_command("help")?;
    let _ = session.handle_command("tune")?;
    let _ = session.handle_command("tune sdr25")?;
    let _ = session.handle_command("status")?;
    Ok(())
}

fn record_wide(session: &mut Session) -> io::Result<()> {
    let _ = session.handle_command("tune hs200 width=8")?;
    let _ = session.handle_command("classify edge")?;
    let _ = session.handle_command("profile pass 0..90")?;
    let _ = session.handle_command("tune sdr104")?;
    let _ = session.handle_command("status")?;
    Ok(())
}

fn record_split(session: &mut Session) -> io::Result<()> {
    let _ = session.handle_command("tune")?;
    let _ = session.handle_command("limit 50")?;
    let _ = session.handle_command("tune")?;
    let _ = session.handle_command("limit 300")?;
    let _ = session.handle_command("status")?;
    Ok(())
}

fn record_dead(session: &mut Session) -> io::Result<()> {
    let _ = session.handle_command("tune sdr50")?;
    let _ = session.handle_command("profile fatal 64")?;
    let _ = session.handle_command("tune sdr50")?;
    let _ = session.handle_command("tune width=3")?;
    let _ = session.handle_command("help profile")?;
    let _ = session.handle_command("status")?;
    Ok(())
}
