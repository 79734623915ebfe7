//! Double round-robin scheduling and result aggregation. Deliberately thin:
//! pretty-printed tables are an external collaborator.

use std::time::Duration;

use crate::match_runner::MatchResult;

/// One scheduled pairing: `side0` plays as player 0 against `side1` as player 1.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct Pairing {
    pub side0: usize,
    pub side1: usize,
}

/// Builds the schedule for `rounds` double round-robin rounds over `num_agents`
/// agents: for each round, every ordered pair `(i, j)` with `i != j` plays once.
pub fn schedule(num_agents: usize, rounds: usize) -> Vec<Pairing> {
    let mut pairings = Vec::with_capacity(rounds * num_agents * num_agents.saturating_sub(1));
    for _ in 0..rounds {
        for i in 0..num_agents {
            for j in 0..num_agents {
                if i != j {
                    pairings.push(Pairing { side0: i, side1: j });
                }
            }
        }
    }
    pairings
}

/// A completed pairing together with the agent indices that produced it, so
/// results can be folded back into per-agent totals regardless of which side
/// an agent played.
pub struct PlayedMatch {
    pub pairing: Pairing,
    pub result: MatchResult,
}

/// Running per-agent totals across a tournament.
#[derive(Debug, Default, Clone)]
pub struct AgentStanding {
    pub agent: usize,
    pub points: u32,
    pub won: u32,
    pub tied: u32,
    pub lost: u32,
    pub failed: u32,
    pub total_time: Duration,
    pub max_time: Duration,
}

/// Folds a set of played matches into sorted per-agent standings. Ranking is
/// by total points descending, ties broken by lower agent index.
pub fn standings(num_agents: usize, played: &[PlayedMatch]) -> Vec<AgentStanding> {
    let mut totals: Vec<AgentStanding> =
        (0..num_agents).map(|agent| AgentStanding { agent, ..Default::default() }).collect();

    for played_match in played {
        let (a0, a1) = (played_match.pairing.side0, played_match.pairing.side1);
        let r = &played_match.result;

        totals[a0].points += r.points.0;
        totals[a1].points += r.points.1;
        totals[a0].total_time += r.time.0;
        totals[a1].total_time += r.time.1;
        totals[a0].max_time = totals[a0].max_time.max(r.time.0);
        totals[a1].max_time = totals[a1].max_time.max(r.time.1);
        if r.failed.0 {
            totals[a0].failed += 1;
        }
        if r.failed.1 {
            totals[a1].failed += 1;
        }
        match r.score.0.cmp(&r.score.1) {
            std::cmp::Ordering::Greater => {
                totals[a0].won += 1;
                totals[a1].lost += 1;
            }
            std::cmp::Ordering::Less => {
                totals[a1].won += 1;
                totals[a0].lost += 1;
            }
            std::cmp::Ordering::Equal => {
                totals[a0].tied += 1;
                totals[a1].tied += 1;
            }
        }
    }

    totals.sort_by(|a, b| b.points.cmp(&a.points).then(a.agent.cmp(&b.agent)));
    totals
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schedule_shape_is_r_times_n_times_n_minus_1() {
        let s = schedule(4, 2);
        assert_eq!(s.len(), 2 * 4 * 3);
        for p in &s {
            assert_ne!(p.side0, p.side1);
        }
    }

    #[test]
    fn ranking_breaks_ties_by_lower_agent_index() {
        let result = MatchResult {
            score: (5, 5),
            failed: (false, false),
            points: (50, 50),
            time: (Duration::ZERO, Duration::ZERO),
            final_state: dvonn::State::new(),
        };
        let played = vec![
            PlayedMatch { pairing: Pairing { side0: 0, side1: 1 }, result: result.clone() },
            PlayedMatch { pairing: Pairing { side0: 1, side1: 0 }, result: result.clone() },
        ];
        let table = standings(2, &played);
        assert_eq!(table[0].agent, 0);
        assert_eq!(table[0].points, table[1].points);
    }
}
