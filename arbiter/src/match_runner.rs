//! Drives the referee<->agent dialogue for a single match to completion,
//! on a single thread with no suspension beyond one read, one write, and
//! process reap per turn.

use std::time::{Duration, Instant};

use dvonn::{DvonnMove, Phase, State};
use rand::seq::SliceRandom;

use crate::agent::AgentLink;

/// Outcome of one match.
#[derive(Debug, Clone)]
pub struct MatchResult {
    pub score: (u32, u32),
    pub failed: (bool, bool),
    pub points: (u32, u32),
    pub time: (Duration, Duration),
    pub final_state: State,
}

/// Computes the CodeCup-style point total for one side: `0` if it failed,
/// otherwise its score plus a win/tie/loss bonus.
fn points_for(score: u32, opponent_score: u32, failed: bool) -> u32 {
    if failed {
        return 0;
    }
    let bonus = match score.cmp(&opponent_score) {
        std::cmp::Ordering::Greater => 90,
        std::cmp::Ordering::Equal => 45,
        std::cmp::Ordering::Less => 0,
    };
    score + bonus
}

/// Plays one match between two [`AgentLink`]s to [`Phase::Complete`],
/// isolating each agent's failures and falling back to uniformly random
/// legal moves on its behalf.
pub fn play_match<A: AgentLink, B: AgentLink>(agent0: &mut A, agent1: &mut B, rng: &mut impl rand::Rng) -> MatchResult {
    let mut state = State::new();
    let mut failed = [false, false];
    let mut elapsed = [Duration::ZERO, Duration::ZERO];

    let _ = agent0.write_line("Start");

    while state.phase() != Phase::Complete {
        let p = state.player();
        let idx = p as usize;

        let parsed_move = if failed[idx] {
            random_fallback(&state, rng)
        } else {
            let start = Instant::now();
            let read = if idx == 0 { agent0.read_line() } else { agent1.read_line() };
            elapsed[idx] += start.elapsed();
            match read {
                Err(_) => {
                    failed[idx] = true;
                    random_fallback(&state, rng)
                }
                Ok(line) => match line.parse::<DvonnMove>() {
                    Err(_) => {
                        failed[idx] = true;
                        random_fallback(&state, rng)
                    }
                    Ok(mv) => mv,
                },
            }
        };

        let silent_fallback = failed[idx];
        if !silent_fallback {
            if state.execute(parsed_move).is_err() {
                failed[idx] = true;
                let fallback = random_fallback(&state, rng);
                state.execute(fallback).expect("a move drawn from list_moves is always legal");
            }
        } else {
            state.execute(parsed_move).expect("a move drawn from list_moves is always legal");
        }

        if state.phase() != Phase::Complete {
            let other = 1 - idx;
            if !failed[other] {
                let text = state.history().last().unwrap().to_string();
                let write = if other == 0 { agent0.write_line(&text) } else { agent1.write_line(&text) };
                if write.is_err() {
                    failed[other] = true;
                }
            }
        }
    }

    let (s0, s1) = state.scores();
    let points0 = points_for(s0, s1, failed[0]);
    let points1 = points_for(s1, s0, failed[1]);

    agent0.shutdown();
    agent1.shutdown();

    MatchResult {
        score: (s0, s1),
        failed: (failed[0], failed[1]),
        points: (points0, points1),
        time: (elapsed[0], elapsed[1]),
        final_state: state,
    }
}

/// Picks uniformly at random from the current position's legal moves, used
/// both for a failed agent's turn and to recover from an illegal move.
fn random_fallback(state: &State, rng: &mut impl rand::Rng) -> DvonnMove {
    let moves = state.list_moves();
    *moves.choose(rng).expect("the game only reaches Complete once no side has a legal move")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::FakeAgent;
    use rand::SeedableRng;

    #[test]
    fn malformed_first_move_fails_the_agent_but_game_still_completes() {
        let mut agent0 = FakeAgent::new(vec!["not a move"]);
        // agent 1 never receives a scripted reply either (building a legal
        // placement/movement script by hand for 49+ turns isn't practical in
        // a unit test), so it ends up randomized too; the property under test
        // is that agent 0's very first malformed line marks it failed and the
        // match still reaches Complete with zero points for it.
        let mut agent1 = FakeAgent::new(Vec::new());
        let mut rng = rand::rngs::StdRng::seed_from_u64(7);

        let result = play_match(&mut agent0, &mut agent1, &mut rng);

        assert!(result.failed.0);
        assert_eq!(result.points.0, 0);
        assert_eq!(result.final_state.phase(), Phase::Complete);
    }

    #[test]
    fn points_formula_applies_win_tie_loss_bonus() {
        assert_eq!(points_for(10, 5, false), 100);
        assert_eq!(points_for(5, 5, false), 50);
        assert_eq!(points_for(3, 5, false), 3);
        assert_eq!(points_for(999, 0, true), 0);
    }
}
