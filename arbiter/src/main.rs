//! `dvonn-arbiter`: spawns two or more agent processes, plays a (possibly
//! repeated, round-robin) series of Dvonn matches between them, and reports
//! the results.

use std::path::PathBuf;
use std::process::exit;

use anyhow::Result;
use arbiter::agent::{ProcessAgent, StderrPolicy};
use arbiter::log::write_game_log_to_path;
use arbiter::tournament::{schedule, standings, PlayedMatch};
use clap::Parser;
use colored::Colorize;
use rand::rngs::ThreadRng;

#[derive(Parser, Debug)]
#[command(author, version, about = "Referee for matches between Dvonn player agents")]
struct Cli {
    /// Number of double round-robin rounds to play.
    #[arg(long, default_value_t = 1)]
    rounds: usize,

    /// Play a single game between exactly two agents, one round.
    #[arg(long)]
    single: bool,

    /// Machine-readable output: one result line per match, nothing else.
    #[arg(long)]
    quiet: bool,

    /// Per-game log path prefix; logs are written to `<PREFIX>NNNN.log`.
    #[arg(long)]
    log: Option<String>,

    /// Per-agent stderr capture prefix (`<PREFIX>NNNN.{1,2}.log`), or `-` to
    /// pass stderr through to this process's own stderr.
    #[arg(long)]
    msg: Option<String>,

    /// Agent commands (at least two), each the path to an executable.
    #[arg(trailing_var_arg = true)]
    players: Vec<String>,
}

fn main() {
    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => exit(0),
        Err(e) => {
            eprintln!("{}", e.to_string().red());
            exit(1)
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    if cli.players.len() < 2 {
        anyhow::bail!("too few player commands passed (need at least 2, got {})", cli.players.len());
    }
    if cli.rounds < 1 {
        anyhow::bail!("invalid number of rounds: {}", cli.rounds);
    }
    if cli.single && (cli.players.len() != 2 || cli.rounds != 1) {
        anyhow::bail!("-single requires exactly two players and exactly one round");
    }

    let rounds = if cli.single { 1 } else { cli.rounds };
    let pairings = if cli.single {
        vec![arbiter::Pairing { side0: 0, side1: 1 }]
    } else {
        schedule(cli.players.len(), rounds)
    };

    let mut rng = ThreadRng::default();
    let mut played = Vec::with_capacity(pairings.len());

    for (game_index, pairing) in pairings.into_iter().enumerate() {
        let cmd0 = &cli.players[pairing.side0];
        let cmd1 = &cli.players[pairing.side1];

        let stderr0 = stderr_policy(&cli.msg, game_index, 1);
        let stderr1 = stderr_policy(&cli.msg, game_index, 2);
        let mut agent0 = ProcessAgent::spawn(cmd0, &[], stderr0)?;
        let mut agent1 = ProcessAgent::spawn(cmd1, &[], stderr1)?;

        let result = arbiter::play_match(&mut agent0, &mut agent1, &mut rng);

        if !cli.quiet {
            println!(
                "{}: {} vs {} -> {} - {} (points {} - {}, failed {} - {})",
                game_index,
                cmd0,
                cmd1,
                result.score.0,
                result.score.1,
                result.points.0,
                result.points.1,
                result.failed.0,
                result.failed.1
            );
        } else {
            println!(
                "{} {} {} {} {} {} {} {} {}",
                game_index,
                pairing.side0,
                pairing.side1,
                result.score.0,
                result.score.1,
                result.points.0,
                result.points.1,
                result.failed.0 as u8,
                result.failed.1 as u8
            );
        }

        if let Some(prefix) = &cli.log {
            let path = PathBuf::from(format!("{prefix}{game_index:04}.log"));
            let headers = vec![format!("Player 1: {cmd0}"), format!("Player 2: {cmd1}")];
            let failures: Vec<String> = [
                result.failed.0.then(|| "Player 1 failed.".to_string()),
                result.failed.1.then(|| "Player 2 failed.".to_string()),
            ]
            .into_iter()
            .flatten()
            .collect();
            if let Err(e) =
                write_game_log_to_path(&path, &headers, &failures, &result.final_state, (result.time.0.as_secs_f64(), result.time.1.as_secs_f64()))
            {
                eprintln!("{}", e.to_string().yellow());
            }
        }

        played.push(PlayedMatch { pairing, result });
    }

    if !cli.quiet {
        let table = standings(cli.players.len(), &played);
        println!("\nStandings:");
        for row in table {
            println!(
                "  agent {}: {} pts ({}W {}T {}L, {} failed, {:.2}s total, {:.2}s max)",
                row.agent,
                row.points,
                row.won,
                row.tied,
                row.lost,
                row.failed,
                row.total_time.as_secs_f64(),
                row.max_time.as_secs_f64()
            );
        }
    }

    Ok(())
}

fn stderr_policy(msg_prefix: &Option<String>, game_index: usize, side: u8) -> StderrPolicy {
    match msg_prefix.as_deref() {
        None => StderrPolicy::Silence,
        Some("-") => StderrPolicy::PassThrough,
        Some(prefix) => StderrPolicy::CaptureTo(PathBuf::from(format!("{prefix}{game_index:04}.{side}.log"))),
    }
}
