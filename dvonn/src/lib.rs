//! Board representation and rules engine for the game of Dvonn.
//!
//! This crate is the single source of truth for a Dvonn match: board
//! geometry ([`board`]), the [`state::State`] machine that enforces
//! placement/movement legality, the connectivity cull, and scoring. It has
//! no knowledge of agents, processes, or sockets — those live in the
//! `arbiter` and `server` crates built on top of it.

pub mod board;
pub mod error;
pub mod state;

pub use board::Coord;
pub use error::DvonnError;
pub use state::{DvonnMove, Field, Phase, State};
