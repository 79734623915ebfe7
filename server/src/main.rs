//! `dvonn-server`: a long-lived TCP server that pairs incoming Dvonn agent
//! connections into matches and referees them to completion.

use std::path::PathBuf;

use clap::Parser;
use colored::Colorize;
use server::dispatch::Input;
use server::{connection::spawn_connection, Dispatcher};
use tokio::net::TcpListener;
use tokio::sync::mpsc;

#[derive(Parser, Debug)]
#[command(author, version, about = "Networked referee for Dvonn player agents")]
struct Cli {
    /// TCP port to listen on.
    #[arg(long, default_value_t = 2727)]
    port: u16,

    /// Directory to write per-game logs to. If omitted, no logs are written.
    #[arg(long)]
    log_dir: Option<PathBuf>,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    if let Some(dir) = &cli.log_dir {
        if let Err(e) = std::fs::create_dir_all(dir) {
            eprintln!("{}", format!("failed to create log directory '{}': {e}", dir.display()).red());
        }
    }

    let listener = match TcpListener::bind(("0.0.0.0", cli.port)).await {
        Ok(l) => l,
        Err(e) => {
            eprintln!("{}", format!("failed to bind port {}: {e}", cli.port).red());
            std::process::exit(1);
        }
    };
    println!("Server listening on port {}", cli.port);

    let (events_tx, events_rx) = mpsc::unbounded_channel::<Input>();
    let dispatcher = Dispatcher::new(cli.log_dir.clone());
    tokio::spawn(dispatcher.run(events_rx));

    let mut next_conn_id: u64 = 0;
    loop {
        match listener.accept().await {
            Ok((stream, addr)) => {
                println!("Accepted connection from {addr}");
                let conn = next_conn_id;
                next_conn_id += 1;
                spawn_connection(conn, stream, addr, events_tx.clone());
            }
            Err(e) => {
                eprintln!("{}", format!("accept error: {e}").yellow());
            }
        }
    }
}
