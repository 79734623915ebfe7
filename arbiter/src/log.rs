//! Game log file writer: leading `#` comment lines, the move sequence
//! wrapped after move 24/49 and then every 16 moves, and a trailing
//! `# Score: ...` summary line.

use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};
use dvonn::State;

/// Inserts a line break after the 24th move, the 49th, and every 16 after that.
fn wraps_after(move_count: usize) -> bool {
    move_count == 24 || move_count == 49 || (move_count > 49 && (move_count - 49) % 16 == 0)
}

/// Writes a complete game log to `w`. `header_lines` are emitted first, each
/// prefixed with `# ` (player identities, e.g. commands or remote
/// addresses); `failure_notes` are any per-player failure markers to mention
/// before the move list.
pub fn write_game_log<W: Write>(
    mut w: W,
    header_lines: &[String],
    failure_notes: &[String],
    state: &State,
    time: (f64, f64),
) -> Result<()> {
    for h in header_lines {
        writeln!(w, "# {h}")?;
    }
    for f in failure_notes {
        writeln!(w, "# {f}")?;
    }

    let mut line = String::new();
    for (i, mv) in state.history().iter().enumerate() {
        if !line.is_empty() {
            line.push(' ');
        }
        line.push_str(&mv.to_string());
        if wraps_after(i + 1) {
            writeln!(w, "{line}")?;
            line.clear();
        }
    }
    if !line.is_empty() {
        writeln!(w, "{line}")?;
    }

    let (s0, s1) = state.scores();
    let winner = match s0.cmp(&s1) {
        std::cmp::Ordering::Greater => "Player 1 won!",
        std::cmp::Ordering::Less => "Player 2 won!",
        std::cmp::Ordering::Equal => "It's a tie!",
    };
    writeln!(w, "# Score: {s0} - {s1}. Time: {0:.3}s - {1:.3}s. {winner}", time.0, time.1)?;
    Ok(())
}

/// Opens `path` with exclusive-create semantics and writes the log, or
/// returns an error (the caller should print it to stderr and move on —
/// filesystem errors here must not affect the game itself).
pub fn write_game_log_to_path(
    path: &Path,
    header_lines: &[String],
    failure_notes: &[String],
    state: &State,
    time: (f64, f64),
) -> Result<()> {
    let file = std::fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(path)
        .with_context(|| format!("failed to create log file '{}'", path.display()))?;
    write_game_log(file, header_lines, failure_notes, state, time)
}

#[cfg(test)]
mod tests {
    use super::*;
    use dvonn::Coord;

    #[test]
    fn wraps_match_spec_breakpoints() {
        assert!(wraps_after(24));
        assert!(wraps_after(49));
        assert!(wraps_after(65));
        assert!(!wraps_after(23));
        assert!(!wraps_after(50));
    }

    #[test]
    fn writes_header_moves_and_summary() {
        let mut state = State::new();
        for c in Coord::all().take(3) {
            state.place(c).unwrap();
        }
        let mut buf = Vec::new();
        write_game_log(
            &mut buf,
            &["Player 1: ./agent_a".to_string(), "Player 2: ./agent_b".to_string()],
            &[],
            &state,
            (1.5, 0.25),
        )
        .unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert!(text.starts_with("# Player 1: ./agent_a\n"));
        assert!(text.contains("A1 B1 C1"));
        assert!(text.contains("# Score: 0 - 0."));
    }
}
