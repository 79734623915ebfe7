use thiserror::Error;

/// Errors produced by board-coordinate and move-text parsing, and by
/// rejected [`crate::state::State`] mutations.
#[derive(Debug, Error, Eq, PartialEq, Clone)]
pub enum DvonnError {
    #[error("'{0}' is not a valid board coordinate")]
    BadCoord(String),
    #[error("'{0}' is not a valid move (expected PASS, a 2-char placement or a 4-char move)")]
    BadMove(String),
    #[error("illegal placement")]
    IllegalPlace,
    #[error("illegal move")]
    IllegalMove,
    #[error("illegal pass: the player to move has a legal move and must play it")]
    IllegalPass,
    #[error("the game has already ended")]
    GameOver,
}
