//! The Dvonn game state: phases, stacks, move execution, the connectivity
//! cull and scoring.

use std::fmt;
use std::fmt::{Display, Formatter};
use std::str::FromStr;

use crate::board::{Coord, NUM_CELLS};
use crate::error::DvonnError;

/// The three stages of a Dvonn game.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Phase {
    Placement,
    Movement,
    Complete,
}

/// A single board cell: stack height, owner (`-1` neutral/empty, `0`/`1` a player),
/// and whether the stack carries a red (dvonn) disc.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct Field {
    pub pieces: u32,
    pub owner: i8,
    pub dvonn: bool,
}

impl Field {
    pub const EMPTY: Field = Field { pieces: 0, owner: -1, dvonn: false };

    pub fn is_empty(&self) -> bool {
        self.pieces == 0
    }
}

impl Default for Field {
    fn default() -> Self {
        Field::EMPTY
    }
}

/// A single executed or proposed action, tagged by variant rather than by
/// dynamic dispatch so that [`State::execute`] can match exhaustively.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum DvonnMove {
    Place(Coord),
    Move(Coord, Coord),
    Pass,
}

impl Display for DvonnMove {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            DvonnMove::Place(p) => write!(f, "{p}"),
            DvonnMove::Move(p, q) => write!(f, "{p}{q}"),
            DvonnMove::Pass => write!(f, "PASS"),
        }
    }
}

impl FromStr for DvonnMove {
    type Err = DvonnError;

    /// Tries, in order: `PASS`, a 4-character move, a 2-character placement.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == "PASS" {
            return Ok(DvonnMove::Pass);
        }
        if s.len() == 4 {
            if let (Some(p), Some(q)) = (s.get(0..2), s.get(2..4)) {
                return Ok(DvonnMove::Move(p.parse()?, q.parse()?));
            }
            return Err(DvonnError::BadMove(s.to_string()));
        }
        if s.len() == 2 {
            let p: Coord = s.parse()?;
            return Ok(DvonnMove::Place(p));
        }
        Err(DvonnError::BadMove(s.to_string()))
    }
}

/// The match-global game state. Created fresh, mutated only through
/// [`State::place`], [`State::mov`], [`State::pass`] (or the dispatching
/// [`State::execute`]), and otherwise read-only.
#[derive(Debug, Clone)]
pub struct State {
    phase: Phase,
    player: i8,
    fields: [Field; NUM_CELLS],
    history: Vec<DvonnMove>,
}

impl Default for State {
    fn default() -> Self {
        Self::new()
    }
}

impl State {
    pub fn new() -> Self {
        State { phase: Phase::Placement, player: 0, fields: [Field::EMPTY; NUM_CELLS], history: Vec::new() }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// The side to move, or `-1` once the game has reached [`Phase::Complete`].
    pub fn player(&self) -> i8 {
        self.player
    }

    pub fn fields(&self) -> &[Field; NUM_CELLS] {
        &self.fields
    }

    pub fn field_at(&self, c: Coord) -> Option<Field> {
        c.index().map(|i| self.fields[i])
    }

    pub fn history(&self) -> &[DvonnMove] {
        &self.history
    }

    fn is_mobile(&self, p: Coord) -> bool {
        p.neighbors().iter().any(|&n| match n.index() {
            None => true,
            Some(i) => self.fields[i].is_empty(),
        })
    }

    pub fn can_place(&self, p: Coord) -> bool {
        self.phase == Phase::Placement && p.index().map(|i| self.fields[i].is_empty()).unwrap_or(false)
    }

    pub fn place(&mut self, p: Coord) -> Result<(), DvonnError> {
        if !self.can_place(p) {
            return Err(DvonnError::IllegalPlace);
        }
        let i = p.index().unwrap();
        self.fields[i] = if self.history.len() < 3 {
            Field { pieces: 1, owner: -1, dvonn: true }
        } else {
            Field { pieces: 1, owner: self.player, dvonn: false }
        };
        self.history.push(DvonnMove::Place(p));
        if self.history.len() < NUM_CELLS {
            self.player = 1 - self.player;
        } else {
            self.phase = Phase::Movement;
            self.player = 0;
        }
        Ok(())
    }

    fn can_player_move(&self, player: i8, p: Coord, q: Coord) -> bool {
        let (Some(i), Some(j)) = (p.index(), q.index()) else { return false };
        self.phase == Phase::Movement
            && self.fields[i].pieces > 0
            && self.fields[j].pieces > 0
            && self.fields[i].owner == player
            && self.is_mobile(p)
            && p.colinear(q)
            && p.distance(q) == self.fields[i].pieces as i32
    }

    pub fn can_move(&self, p: Coord, q: Coord) -> bool {
        self.can_player_move(self.player, p, q)
    }

    pub fn mov(&mut self, p: Coord, q: Coord) -> Result<(), DvonnError> {
        if !self.can_move(p, q) {
            return Err(DvonnError::IllegalMove);
        }
        let (i, j) = (p.index().unwrap(), q.index().unwrap());
        self.fields[j].pieces += self.fields[i].pieces;
        self.fields[j].dvonn |= self.fields[i].dvonn;
        self.fields[j].owner = self.player;
        self.fields[i] = Field::EMPTY;
        self.cull();
        self.history.push(DvonnMove::Move(p, q));
        if self.can_play(0) || self.can_play(1) {
            self.player = 1 - self.player;
        } else {
            self.phase = Phase::Complete;
            self.player = -1;
        }
        Ok(())
    }

    fn can_play(&self, player: i8) -> bool {
        Coord::all().any(|p| Coord::all().any(|q| self.can_player_move(player, p, q)))
    }

    pub fn can_pass(&self) -> bool {
        self.phase == Phase::Movement && !self.can_play(self.player)
    }

    pub fn pass(&mut self) -> Result<(), DvonnError> {
        if !self.can_pass() {
            return Err(DvonnError::IllegalPass);
        }
        self.history.push(DvonnMove::Pass);
        self.player = 1 - self.player;
        Ok(())
    }

    /// Dispatches on the move's tag and applies it, rejecting it with a
    /// descriptive error rather than panicking or silently ignoring it.
    pub fn execute(&mut self, mv: DvonnMove) -> Result<(), DvonnError> {
        if self.phase == Phase::Complete {
            return Err(DvonnError::GameOver);
        }
        match mv {
            DvonnMove::Place(p) => self.place(p),
            DvonnMove::Move(p, q) => self.mov(p, q),
            DvonnMove::Pass => self.pass(),
        }
    }

    /// Flood fill seeded from every dvonn-bearing cell, over occupied-cell
    /// adjacency; anything occupied and unreached is cleared. Implemented
    /// with an explicit stack rather than recursion, per the board's small
    /// but fixed 49-cell size.
    fn cull(&mut self) {
        let mut reachable = [false; NUM_CELLS];
        let mut stack = Vec::new();
        for c in Coord::all() {
            let i = c.index().unwrap();
            if self.fields[i].dvonn && !reachable[i] {
                reachable[i] = true;
                stack.push(c);
            }
        }
        while let Some(c) = stack.pop() {
            for n in c.neighbors() {
                if let Some(j) = n.index() {
                    if self.fields[j].pieces > 0 && !reachable[j] {
                        reachable[j] = true;
                        stack.push(n);
                    }
                }
            }
        }
        for (i, r) in reachable.iter().enumerate() {
            if !r && self.fields[i].pieces > 0 {
                self.fields[i] = Field::EMPTY;
            }
        }
    }

    /// Sum of piece counts owned by side 0 and side 1, respectively.
    pub fn scores(&self) -> (u32, u32) {
        let mut s = (0u32, 0u32);
        for f in &self.fields {
            match f.owner {
                0 => s.0 += f.pieces,
                1 => s.1 += f.pieces,
                _ => {}
            }
        }
        s
    }

    /// All legal actions in the current position: placements during
    /// [`Phase::Placement`], or moves (plus `Pass` if applicable) during
    /// [`Phase::Movement`]. Order is stable but unspecified.
    pub fn list_moves(&self) -> Vec<DvonnMove> {
        match self.phase {
            Phase::Placement => Coord::all().filter(|&p| self.can_place(p)).map(DvonnMove::Place).collect(),
            Phase::Movement => {
                let mut moves: Vec<DvonnMove> = Coord::all()
                    .flat_map(|p| Coord::all().map(move |q| (p, q)))
                    .filter(|&(p, q)| self.can_move(p, q))
                    .map(|(p, q)| DvonnMove::Move(p, q))
                    .collect();
                if self.can_pass() {
                    moves.push(DvonnMove::Pass);
                }
                moves
            }
            Phase::Complete => Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::prelude::SliceRandom;
    use rand::SeedableRng;

    fn place_all_cells_in_row_major_order(state: &mut State) {
        for c in Coord::all() {
            state.place(c).unwrap();
        }
    }

    #[test]
    fn p1_first_three_placements_are_dvonn() {
        let mut state = State::new();
        place_all_cells_in_row_major_order(&mut state);
        for (i, c) in Coord::all().enumerate() {
            let f = state.field_at(c).unwrap();
            if i < 3 {
                assert_eq!(f.owner, -1);
                assert!(f.dvonn);
            } else {
                assert!(f.owner == 0 || f.owner == 1);
                assert!(!f.dvonn);
            }
        }
    }

    #[test]
    fn minimal_placement_transitions_to_movement_on_49th() {
        let mut state = State::new();
        for i in 0..48 {
            assert_eq!(state.phase(), Phase::Placement);
            let c = Coord::all().nth(i).unwrap();
            state.place(c).unwrap();
        }
        assert_eq!(state.phase(), Phase::Placement);
        state.place(Coord::all().nth(48).unwrap()).unwrap();
        assert_eq!(state.phase(), Phase::Movement);
        assert_eq!(state.player(), 0);
    }

    #[test]
    fn stack_height_move_p3_scenario() {
        let mut state = State::new();
        state.phase = Phase::Movement;
        let p = Coord::new(2, 2);
        state.fields[p.index().unwrap()] = Field { pieces: 3, owner: 0, dvonn: true };
        state.player = 0;
        // every candidate destination must itself be occupied, as it would be
        // in any real movement-phase position reached from a full board.
        for dest in [Coord::new(5, 2), Coord::new(4, 2), Coord::new(5, 3)] {
            state.fields[dest.index().unwrap()] = Field { pieces: 1, owner: 1, dvonn: false };
        }

        assert!(state.can_move(p, Coord::new(5, 2)));
        assert!(!state.can_move(p, Coord::new(4, 2)));
        assert!(!state.can_move(p, Coord::new(5, 3)));
    }

    #[test]
    fn mobility_blocks_fully_surrounded_stack() {
        let mut state = State::new();
        state.phase = Phase::Movement;
        state.player = 0;
        let p = Coord::new(2, 2);
        state.fields[p.index().unwrap()] = Field { pieces: 1, owner: 0, dvonn: true };
        for n in p.neighbors() {
            state.fields[n.index().unwrap()] = Field { pieces: 1, owner: 1, dvonn: false };
        }
        assert!(!state.is_mobile(p));
        assert!(!state.can_move(p, Coord::new(3, 3)));
    }

    #[test]
    fn cull_removes_disconnected_chain() {
        let mut state = State::new();
        state.phase = Phase::Movement;
        state.player = 1;
        // A red anchor at (0,0), a single-cell chain bridge-far1-far2 extending
        // away from it. Moving the bridge onto far1 vacates (1,0), severing the
        // chain from the anchor; far1 (merged with bridge) and far2 must be culled.
        let anchor = Coord::new(0, 0);
        let bridge = Coord::new(1, 0);
        let far1 = Coord::new(2, 0);
        let far2 = Coord::new(3, 0);
        state.fields[anchor.index().unwrap()] = Field { pieces: 1, owner: 0, dvonn: true };
        state.fields[bridge.index().unwrap()] = Field { pieces: 1, owner: 1, dvonn: false };
        state.fields[far1.index().unwrap()] = Field { pieces: 1, owner: 1, dvonn: false };
        state.fields[far2.index().unwrap()] = Field { pieces: 1, owner: 1, dvonn: false };

        assert!(bridge.colinear(far1));
        assert_eq!(bridge.distance(far1), 1);
        state.mov(bridge, far1).unwrap();

        assert!(state.field_at(bridge).unwrap().is_empty());
        assert!(state.field_at(far1).unwrap().is_empty());
        assert!(state.field_at(far2).unwrap().is_empty());
        assert!(!state.field_at(anchor).unwrap().is_empty());
    }

    #[test]
    fn pass_only_legal_without_a_move() {
        let mut state = State::new();
        state.phase = Phase::Movement;
        state.player = 0;
        let p = Coord::new(2, 2);
        state.fields[p.index().unwrap()] = Field { pieces: 1, owner: 0, dvonn: true };
        let q = Coord::new(3, 2);
        state.fields[q.index().unwrap()] = Field { pieces: 1, owner: 0, dvonn: false };
        assert!(!state.can_pass());
        assert!(state.pass().is_err());

        let mut isolated = State::new();
        isolated.phase = Phase::Movement;
        isolated.player = 0;
        isolated.fields[Coord::new(0, 0).index().unwrap()] = Field { pieces: 1, owner: 0, dvonn: true };
        assert!(isolated.can_pass());
        assert!(isolated.pass().is_ok());
        assert_eq!(isolated.player(), 1);
    }

    #[test]
    fn list_moves_matches_execute_acceptance() {
        let mut state = State::new();
        let mut rng = rand::rngs::StdRng::seed_from_u64(42);
        for _ in 0..49 {
            let mut options = state.list_moves();
            options.shuffle(&mut rng);
            let chosen = options[0];
            assert!(state.execute(chosen).is_ok());
        }
        for _ in 0..40 {
            if state.phase() == Phase::Complete {
                break;
            }
            let options = state.list_moves();
            assert!(!options.is_empty());
            for mv in &options {
                let mut copy = state.clone();
                assert!(copy.execute(*mv).is_ok());
            }
            let mut rng_pick = options.clone();
            rng_pick.shuffle(&mut rng);
            state.execute(rng_pick[0]).unwrap();
        }
    }

    #[test]
    fn scores_ignore_neutral_stacks() {
        let mut state = State::new();
        state.fields[0] = Field { pieces: 2, owner: 0, dvonn: false };
        state.fields[1] = Field { pieces: 3, owner: 1, dvonn: false };
        state.fields[2] = Field { pieces: 1, owner: -1, dvonn: true };
        assert_eq!(state.scores(), (2, 3));
    }

    #[test]
    fn move_syntax_round_trips() {
        assert_eq!("PASS".parse::<DvonnMove>().unwrap(), DvonnMove::Pass);
        assert_eq!("C3".parse::<DvonnMove>().unwrap(), DvonnMove::Place(Coord::new(2, 2)));
        assert_eq!(
            "C3F3".parse::<DvonnMove>().unwrap(),
            DvonnMove::Move(Coord::new(2, 2), Coord::new(5, 2))
        );
        assert!("C".parse::<DvonnMove>().is_err());
        assert!("C3FX".parse::<DvonnMove>().is_err());
        assert_eq!(DvonnMove::Place(Coord::new(2, 2)).to_string(), "C3");
        assert_eq!(DvonnMove::Move(Coord::new(2, 2), Coord::new(5, 2)).to_string(), "C3F3");
    }
}
