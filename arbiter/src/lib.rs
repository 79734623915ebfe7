//! Local-process match runner and tournament driver. Spawns two agents as
//! child processes, drives the referee<->agent dialogue for each match, and
//! aggregates results across a double round-robin.

pub mod agent;
pub mod log;
pub mod match_runner;
pub mod tournament;

pub use agent::{AgentLink, ProcessAgent, StderrPolicy};
pub use match_runner::{play_match, MatchResult};
pub use tournament::{schedule, standings, AgentStanding, Pairing, PlayedMatch};
