//! Per-connection setup: splits a freshly accepted socket into a framing
//! reader task and a small writer task fed by an outbound channel, then
//! reports the connection to the dispatcher as an `Open` event carrying
//! everything needed to talk back to it.

use std::net::SocketAddr;

use tokio::io::AsyncWriteExt;
use tokio::net::tcp::OwnedWriteHalf;
use tokio::net::TcpStream;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

use crate::dispatch::{ConnId, Input, InputKind};
use crate::framing::frame_connection;

/// Spawns the reader and writer tasks for one accepted connection and
/// hands it to the dispatcher. The `Open` event is sent before the reader
/// task starts so the dispatcher always sees a connection's `Open` before
/// any `Line` it produces.
pub fn spawn_connection(conn: ConnId, stream: TcpStream, remote_addr: SocketAddr, events: UnboundedSender<Input>) {
    let (read_half, write_half) = stream.into_split();
    let (outbound_tx, outbound_rx) = mpsc::unbounded_channel::<String>();

    tokio::spawn(write_loop(write_half, outbound_rx));

    let _ = events.send(Input { conn, kind: InputKind::Open { remote_addr, outbound: outbound_tx } });

    tokio::spawn(frame_connection(conn, read_half, events.clone()));
}

/// Drains `outbound` and writes each line to the socket, one at a time. A
/// slow or stuck client only ever backs up this channel, never the shared
/// dispatcher.
async fn write_loop(mut write_half: OwnedWriteHalf, mut outbound: UnboundedReceiver<String>) {
    while let Some(line) = outbound.recv().await {
        if write_half.write_all(line.as_bytes()).await.is_err() {
            break;
        }
        if write_half.write_all(b"\n").await.is_err() {
            break;
        }
    }
}
