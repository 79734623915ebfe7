//! Networked session controller for Dvonn: accepts TCP connections, pairs
//! them into games, and serializes all game-state mutation through a single
//! event-dispatch task.

pub mod connection;
pub mod dispatch;
pub mod framing;

pub use dispatch::{Dispatcher, Input};
