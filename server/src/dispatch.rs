//! The single event-dispatch task that owns all game state: one consumer
//! loop over a channel of connection events, pairing waiting connections
//! into games, routing each line through a phase-specific parse/execute
//! step, and ending games on disconnect or rule violation. Every
//! connection is a plain `ConnId` paired with an outbound channel the
//! dispatcher uses to queue lines back to it, so a slow or stuck socket
//! write never blocks this task.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use arbiter::log::write_game_log_to_path;
use chrono::{DateTime, Utc};
use dvonn::{Coord, Phase, State};
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};

/// Identifies one accepted connection for the lifetime of the process.
pub type ConnId = u64;
type GameId = u64;

/// What happened on one connection, as framed by [`crate::framing`] and
/// enriched by [`crate::connection::spawn_connection`].
pub enum InputKind {
    /// A connection was accepted. Carries the address and a sender the
    /// dispatcher can use to queue lines back to it — the dispatcher never
    /// touches the socket directly.
    Open { remote_addr: SocketAddr, outbound: UnboundedSender<String> },
    Line(String),
    Close,
}

/// One event on the dispatcher's single input channel.
pub struct Input {
    pub conn: ConnId,
    pub kind: InputKind,
}

struct ConnHandle {
    outbound: UnboundedSender<String>,
    remote_addr: String,
}

struct Game {
    players: [ConnId; 2],
    addrs: [String; 2],
    state: State,
    begin: DateTime<Utc>,
    /// When the side currently to move was last handed the turn; used to
    /// charge elapsed thinking time the same way the local arbiter does.
    turn_started: Option<Instant>,
    elapsed: [Duration; 2],
}

/// Owns every connection handle, the single `waiting` slot, and every
/// in-progress game. Nothing outside this struct ever mutates a [`State`];
/// all game-state mutation is serialized through this one input channel.
pub struct Dispatcher {
    conns: HashMap<ConnId, ConnHandle>,
    waiting: Option<ConnId>,
    conn_game: HashMap<ConnId, GameId>,
    games: HashMap<GameId, Game>,
    next_game_id: GameId,
    log_dir: Option<PathBuf>,
}

impl Dispatcher {
    pub fn new(log_dir: Option<PathBuf>) -> Self {
        Self {
            conns: HashMap::new(),
            waiting: None,
            conn_game: HashMap::new(),
            games: HashMap::new(),
            next_game_id: 0,
            log_dir,
        }
    }

    /// Consumes events until the channel closes. In practice this runs for
    /// the lifetime of the server, since its sender is never dropped.
    pub async fn run(mut self, mut events: UnboundedReceiver<Input>) {
        while let Some(input) = events.recv().await {
            self.handle(input);
        }
    }

    fn handle(&mut self, input: Input) {
        match input.kind {
            InputKind::Open { remote_addr, outbound } => self.handle_open(input.conn, remote_addr, outbound),
            InputKind::Line(text) => self.handle_line(input.conn, text),
            InputKind::Close => self.handle_close(input.conn),
        }
    }

    /// On `OPEN`: pair with the waiting connection, if any, else become it.
    fn handle_open(&mut self, conn: ConnId, remote_addr: SocketAddr, outbound: UnboundedSender<String>) {
        self.conns.insert(conn, ConnHandle { outbound, remote_addr: remote_addr.to_string() });
        match self.waiting.take() {
            None => self.waiting = Some(conn),
            Some(waiter) => self.begin_game(waiter, conn),
        }
    }

    fn begin_game(&mut self, player1: ConnId, player2: ConnId) {
        let id = self.next_game_id;
        self.next_game_id += 1;
        let addrs = [self.conns[&player1].remote_addr.clone(), self.conns[&player2].remote_addr.clone()];
        let game = Game {
            players: [player1, player2],
            addrs,
            state: State::new(),
            begin: Utc::now(),
            turn_started: Some(Instant::now()),
            elapsed: [Duration::ZERO; 2],
        };
        self.games.insert(id, game);
        self.conn_game.insert(player1, id);
        self.conn_game.insert(player2, id);
        self.send_line(player1, "Start");
    }

    /// On `CLOSE`: end any game the connection was in, clear it if it was
    /// the waiter, then forget it entirely.
    fn handle_close(&mut self, conn: ConnId) {
        if let Some(game_id) = self.conn_game.remove(&conn) {
            let reason = format!("{} disconnected.", self.player_label(game_id, conn));
            self.end_game(game_id, reason);
        }
        if self.waiting == Some(conn) {
            self.waiting = None;
        }
        self.conns.remove(&conn);
    }

    /// On `LINE`: reject if not in a game or not this connection's turn,
    /// otherwise dispatch on phase and either forward the move, end the game
    /// on a violation, or end the game on a natural completion.
    fn handle_line(&mut self, conn: ConnId, text: String) {
        let Some(&game_id) = self.conn_game.get(&conn) else {
            self.send_line(conn, "The game is not in progress!");
            return;
        };

        enum Outcome {
            NotYourTurn,
            Forward(ConnId, String),
            EndGame(String),
        }

        let outcome = {
            let Some(game) = self.games.get_mut(&game_id) else { return };
            let player_idx = usize::from(game.players[1] == conn);

            if game.state.player() < 0 || game.players[game.state.player() as usize] != conn {
                Outcome::NotYourTurn
            } else {
                if let Some(start) = game.turn_started.take() {
                    game.elapsed[player_idx] += start.elapsed();
                }
                let label = player_label_for(player_idx);
                match dispatch_command(&mut game.state, &text, label) {
                    Err(reason) => Outcome::EndGame(reason),
                    Ok(()) if game.state.phase() == Phase::Complete => {
                        let (s0, s1) = game.state.scores();
                        let winner = match s0.cmp(&s1) {
                            std::cmp::Ordering::Greater => "Player 1 won!",
                            std::cmp::Ordering::Less => "Player 2 won!",
                            std::cmp::Ordering::Equal => "It's a tie!",
                        };
                        Outcome::EndGame(format!("Game complete. Score: {s0} - {s1}. {winner}"))
                    }
                    Ok(()) => {
                        game.turn_started = Some(Instant::now());
                        Outcome::Forward(game.players[1 - player_idx], text)
                    }
                }
            }
        };

        match outcome {
            Outcome::NotYourTurn => self.send_line(conn, "It's not your turn!"),
            Outcome::Forward(other, text) => self.send_line(other, &text),
            Outcome::EndGame(reason) => self.end_game(game_id, reason),
        }
    }

    fn player_label(&self, game_id: GameId, conn: ConnId) -> &'static str {
        let idx = self.games.get(&game_id).map(|g| usize::from(g.players[1] == conn)).unwrap_or(0);
        player_label_for(idx)
    }

    fn send_line(&self, conn: ConnId, text: &str) {
        if let Some(handle) = self.conns.get(&conn) {
            let _ = handle.outbound.send(text.to_string());
        }
    }

    /// Sends `Quit` plus `reason` to both players, writes the game log (if
    /// configured and at least one move was made), and drops the game's
    /// bookkeeping entries.
    fn end_game(&mut self, game_id: GameId, reason: String) {
        let Some(game) = self.games.remove(&game_id) else { return };
        for &p in &game.players {
            self.conn_game.remove(&p);
            self.send_line(p, "Quit");
            self.send_line(p, &reason);
        }
        if !game.state.history().is_empty() {
            if let Some(dir) = self.log_dir.clone() {
                if let Err(e) = write_log(&dir, &game, &reason) {
                    eprintln!("{e}");
                }
            }
        }
    }
}

fn player_label_for(idx: usize) -> &'static str {
    if idx == 0 {
        "Player 1"
    } else {
        "Player 2"
    }
}

/// Parses and applies one client command per the phase-specific grammar
/// (`PLACEMENT` takes a bare placement; `MOVEMENT` takes `PASS` or a move),
/// returning a descriptive end-of-game reason on any parse or legality
/// violation.
fn dispatch_command(state: &mut State, text: &str, label: &str) -> Result<(), String> {
    match state.phase() {
        Phase::Placement => match text.parse::<Coord>() {
            Ok(p) => state.place(p).map_err(|_| format!("{label} made an invalid placement: {text}")),
            Err(_) => Err(format!("{label} sent an invalid command: {text}")),
        },
        Phase::Movement => {
            if text == "PASS" {
                state.pass().map_err(|_| format!("{label} cannot pass now"))
            } else if text.len() == 4 {
                match (text.get(0..2), text.get(2..4)) {
                    (Some(p), Some(q)) => match (p.parse::<Coord>(), q.parse::<Coord>()) {
                        (Ok(p), Ok(q)) => {
                            state.mov(p, q).map_err(|_| format!("{label} made an invalid move: {text}"))
                        }
                        _ => Err(format!("{label} sent an invalid command: {text}")),
                    },
                    _ => Err(format!("{label} sent an invalid command: {text}")),
                }
            } else {
                Err(format!("{label} sent an invalid command: {text}"))
            }
        }
        Phase::Complete => Err("the game has already ended".to_string()),
    }
}

/// Writes the game log, reusing the local arbiter's writer so both
/// produce the same file shape. File name is
/// `<ISO8601-begin>-<remote1>-<remote2>.txt`, created with exclusive-create
/// semantics.
fn write_log(dir: &Path, game: &Game, reason: &str) -> anyhow::Result<()> {
    let filename = format!("{}-{}-{}.txt", game.begin.to_rfc3339(), game.addrs[0], game.addrs[1]);
    let path = dir.join(filename);
    let headers = vec![format!("Player 1: {}", game.addrs[0]), format!("Player 2: {}", game.addrs[1])];
    let time = (game.elapsed[0].as_secs_f64(), game.elapsed[1].as_secs_f64());
    let notes = vec![reason.to_string()];
    write_game_log_to_path(&path, &headers, &notes, &game.state, time)
}
